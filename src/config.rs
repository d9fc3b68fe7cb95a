//! Service configuration: CLI flags with environment fallbacks.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::adapters::artifacts::{load_verifying_key, SignaturePolicy};
use crate::adapters::http::parse_origin;
use crate::domain::AttributionStrategy;
use crate::OvasenseError;

#[derive(Debug, Clone, Parser)]
#[command(name = "ovasense", about = "PCOS risk prediction service", version)]
pub struct ServiceConfig {
    /// Address to listen on.
    #[arg(long, env = "OVASENSE_BIND", default_value = "0.0.0.0:5001")]
    pub bind: SocketAddr,

    /// Directory holding the exported artifact bundle.
    #[arg(long, env = "OVASENSE_ARTIFACT_DIR", default_value = "ml_model")]
    pub artifact_dir: PathBuf,

    /// Attribution strategy: scaled-impact, global-importance or tree-shap.
    #[arg(long, env = "OVASENSE_ATTRIBUTION", default_value = "scaled-impact")]
    pub attribution: AttributionStrategy,

    /// Ranked features returned per prediction (default depends on strategy).
    #[arg(long, env = "OVASENSE_TOP_N")]
    pub top_n: Option<usize>,

    /// Refuse to start unless the bundle carries a valid signature.
    #[arg(long, env = "OVASENSE_REQUIRE_SIGNED_BUNDLE")]
    pub require_signed_bundle: bool,

    /// Base64 Ed25519 public key used to verify `bundle.sig`.
    #[arg(long, env = "OVASENSE_VERIFYING_KEY_FILE")]
    pub verifying_key_file: Option<PathBuf>,

    /// Allowed CORS origin (repeatable). Any origin when none are given.
    #[arg(long = "cors-origin", env = "OVASENSE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "OVASENSE_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl ServiceConfig {
    /// Ranking length: the configured value, or the strategy's default.
    #[must_use]
    pub fn effective_top_n(&self) -> usize {
        self.top_n
            .unwrap_or_else(|| self.attribution.default_top_n())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject combinations that cannot start a working service.
    ///
    /// # Errors
    /// Returns `OvasenseError::Config` describing the first problem.
    pub fn validate(&self) -> Result<(), OvasenseError> {
        if self.top_n == Some(0) {
            return Err(OvasenseError::Config("--top-n must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(OvasenseError::Config(
                "--request-timeout-secs must be at least 1".into(),
            ));
        }
        if self.require_signed_bundle && self.verifying_key_file.is_none() {
            return Err(OvasenseError::Config(
                "--require-signed-bundle needs --verifying-key-file".into(),
            ));
        }
        for origin in &self.cors_origins {
            parse_origin(origin).map_err(OvasenseError::Config)?;
        }
        Ok(())
    }

    /// Bundle verification policy, loading the verifying key if one is set.
    ///
    /// # Errors
    /// Returns an error if the key file cannot be loaded.
    pub fn signature_policy(&self) -> Result<SignaturePolicy, OvasenseError> {
        let Some(path) = &self.verifying_key_file else {
            return Ok(SignaturePolicy::HashesIfPresent);
        };
        let key = load_verifying_key(path)?;
        Ok(if self.require_signed_bundle {
            SignaturePolicy::Require(key)
        } else {
            SignaturePolicy::VerifyIfSigned(key)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> ServiceConfig {
        ServiceConfig::try_parse_from(std::iter::once("ovasense").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn test_command_definition() {
        ServiceConfig::command().debug_assert();
    }

    #[test]
    fn test_top_n_follows_strategy() {
        assert_eq!(parse(&["--attribution", "scaled-impact"]).effective_top_n(), 15);
        assert_eq!(parse(&["--attribution", "tree-shap"]).effective_top_n(), 5);
        assert_eq!(
            parse(&["--attribution", "global-importance", "--top-n", "3"]).effective_top_n(),
            3
        );
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        assert!(ServiceConfig::try_parse_from(["ovasense", "--attribution", "lime"]).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(parse(&["--top-n", "0"]).validate().is_err());
        assert!(parse(&["--request-timeout-secs", "0"]).validate().is_err());
        assert!(parse(&["--require-signed-bundle"]).validate().is_err());
        assert!(parse(&["--cors-origin", "http://localhost:3000"])
            .validate()
            .is_ok());
        assert!(parse(&["--cors-origin", "http://bad\norigin"])
            .validate()
            .is_err());
    }

    #[test]
    fn test_cors_origins_repeat() {
        let config = parse(&[
            "--cors-origin",
            "http://a.example",
            "--cors-origin",
            "http://b.example",
        ]);
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn test_signature_policy_without_key() {
        let policy = parse(&[]).signature_policy().expect("policy");
        assert!(matches!(policy, SignaturePolicy::HashesIfPresent));
    }
}
