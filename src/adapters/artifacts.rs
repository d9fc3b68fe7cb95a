//! Filesystem artifact source with optional signed-manifest verification.
//!
//! A bundle directory holds one JSON file per artifact. It may also carry:
//! - `manifest.json`: SHA-256 of every artifact file
//! - `bundle.sig`: Ed25519 signature over the exact manifest bytes
//!
//! When a manifest is present every artifact must be bound by it, and each
//! file is hashed from the same bytes that are handed to the parser. The
//! signature is checked once, when the source is opened.
//!
//! # Security
//!
//! - Hash comparison is constant-time
//! - A signature, when required, is verified before any artifact is parsed

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{ArtifactError, ArtifactKind};
use crate::ports::ArtifactSource;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "bundle.sig";

/// Hashes of every artifact in a bundle directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub version: u32,
    /// Monotonic bundle serial (a CI build number, or the creation time).
    pub serial: u64,
    /// Unix timestamp (seconds).
    pub created_at: i64,
    /// File name to lowercase hex SHA-256.
    pub files: BTreeMap<String, String>,
}

impl BundleManifest {
    pub const VERSION: u32 = 1;

    /// Hash every artifact file in `dir`.
    ///
    /// # Errors
    /// Returns `ArtifactError::Missing` or `Unreadable` for the first artifact
    /// that cannot be read.
    pub fn from_bundle_dir(dir: &Path, serial: Option<u64>) -> Result<Self, ArtifactError> {
        let mut files = BTreeMap::new();
        for kind in ArtifactKind::LOAD_ORDER {
            let bytes = read_artifact_file(dir, kind)?;
            files.insert(kind.file_name().to_string(), sha256_hex(&bytes));
        }

        let created_at = chrono::Utc::now().timestamp();
        Ok(Self {
            version: Self::VERSION,
            serial: serial.unwrap_or_else(|| u64::try_from(created_at).unwrap_or(1)),
            created_at,
            files,
        })
    }

    /// Expected hash for `kind`, if bound.
    #[must_use]
    pub fn expected_hash(&self, kind: ArtifactKind) -> Option<&str> {
        self.files.get(kind.file_name()).map(String::as_str)
    }
}

/// How strictly a bundle's provenance is checked.
#[derive(Debug, Clone, Default)]
pub enum SignaturePolicy {
    /// Check artifact hashes when a manifest exists; ignore signatures.
    #[default]
    HashesIfPresent,
    /// Verify the signature when `bundle.sig` exists.
    VerifyIfSigned(VerifyingKey),
    /// Manifest and signature must exist and verify.
    Require(VerifyingKey),
}

/// Reads artifacts from a bundle directory.
#[derive(Debug)]
pub struct DirectoryArtifactSource {
    root: PathBuf,
    manifest: Option<BundleManifest>,
}

impl DirectoryArtifactSource {
    /// Open `root`, reading and (per `policy`) verifying its manifest.
    ///
    /// A missing directory is not an error here: the first artifact read
    /// will report it as missing.
    ///
    /// # Errors
    /// Returns `ArtifactError::Integrity` if the manifest or signature is
    /// absent when required, unreadable, or invalid.
    pub fn open(root: impl Into<PathBuf>, policy: &SignaturePolicy) -> Result<Self, ArtifactError> {
        let root = root.into();
        let manifest_bytes = read_optional(&root.join(MANIFEST_FILE))?;
        let signature = read_optional(&root.join(SIGNATURE_FILE))?;

        let key = match policy {
            SignaturePolicy::HashesIfPresent => None,
            SignaturePolicy::VerifyIfSigned(key) => signature.is_some().then_some(key),
            SignaturePolicy::Require(key) => Some(key),
        };

        if let Some(key) = key {
            let manifest_bytes = manifest_bytes.as_deref().ok_or_else(|| {
                ArtifactError::Integrity(format!("{MANIFEST_FILE} is required but missing"))
            })?;
            let signature = signature.as_deref().ok_or_else(|| {
                ArtifactError::Integrity(format!("{SIGNATURE_FILE} is required but missing"))
            })?;
            verify_signature(key, manifest_bytes, signature)?;
            tracing::info!("Bundle signature verified");
        }

        let manifest = manifest_bytes
            .map(|bytes| parse_manifest(&bytes))
            .transpose()?;
        match &manifest {
            Some(m) => tracing::info!(
                "Bundle manifest v{} (serial={}, {} files)",
                m.version,
                m.serial,
                m.files.len()
            ),
            None => tracing::warn!("Loading bundle without a manifest; artifact hashes are not checked"),
        }

        Ok(Self { root, manifest })
    }

    #[must_use]
    pub fn manifest(&self) -> Option<&BundleManifest> {
        self.manifest.as_ref()
    }
}

impl ArtifactSource for DirectoryArtifactSource {
    fn read(&self, artifact: ArtifactKind) -> Result<Vec<u8>, ArtifactError> {
        let bytes = read_artifact_file(&self.root, artifact)?;

        if let Some(manifest) = &self.manifest {
            let expected = manifest
                .expected_hash(artifact)
                .ok_or(ArtifactError::Tampered { artifact })?;
            if !constant_time_eq_str(&sha256_hex(&bytes), expected) {
                return Err(ArtifactError::Tampered { artifact });
            }
        }
        Ok(bytes)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Write `manifest.json` and `bundle.sig` for the bundle in `dir`.
///
/// # Errors
/// Returns `ArtifactError` if an artifact cannot be hashed or an output file
/// cannot be written.
pub fn sign_bundle_dir(
    dir: &Path,
    serial: Option<u64>,
    key: &SigningKey,
) -> Result<BundleManifest, ArtifactError> {
    let manifest = BundleManifest::from_bundle_dir(dir, serial)?;
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| ArtifactError::Integrity(format!("failed to serialize manifest: {e}")))?;
    let signature: Signature = key.sign(&manifest_bytes);

    write_file(&dir.join(MANIFEST_FILE), &manifest_bytes)?;
    write_file(&dir.join(SIGNATURE_FILE), &signature.to_bytes())?;
    Ok(manifest)
}

/// Load a base64-encoded Ed25519 public key.
///
/// # Errors
/// Returns `ArtifactError::Integrity` if the file is unreadable or does not
/// hold a valid 32-byte key.
pub fn load_verifying_key(path: &Path) -> Result<VerifyingKey, ArtifactError> {
    let content = fs::read_to_string(path).map_err(|e| {
        ArtifactError::Integrity(format!("failed to read verifying key {path:?}: {e}"))
    })?;
    let raw = general_purpose::STANDARD
        .decode(content.trim())
        .map_err(|e| ArtifactError::Integrity(format!("invalid base64 in verifying key: {e}")))?;
    let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        ArtifactError::Integrity(format!(
            "verifying key must be 32 bytes after base64 decode (got {})",
            raw.len()
        ))
    })?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|_| ArtifactError::Integrity("invalid Ed25519 verifying key".into()))
}

/// Lowercase hex SHA-256.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn verify_signature(
    key: &VerifyingKey,
    manifest_bytes: &[u8],
    signature: &[u8],
) -> Result<(), ArtifactError> {
    let signature = Signature::from_slice(signature).map_err(|_| {
        ArtifactError::Integrity("invalid signature length (expected 64 bytes)".into())
    })?;
    key.verify(manifest_bytes, &signature)
        .map_err(|_| ArtifactError::Integrity("invalid bundle signature".into()))
}

fn parse_manifest(bytes: &[u8]) -> Result<BundleManifest, ArtifactError> {
    let manifest: BundleManifest = serde_json::from_slice(bytes)
        .map_err(|e| ArtifactError::Integrity(format!("invalid {MANIFEST_FILE}: {e}")))?;
    if manifest.version != BundleManifest::VERSION {
        return Err(ArtifactError::Integrity(format!(
            "unsupported manifest version: {}",
            manifest.version
        )));
    }
    if manifest.files.is_empty() {
        return Err(ArtifactError::Integrity(format!("{MANIFEST_FILE} binds no files")));
    }
    Ok(manifest)
}

fn read_artifact_file(dir: &Path, artifact: ArtifactKind) -> Result<Vec<u8>, ArtifactError> {
    let path = dir.join(artifact.file_name());
    fs::read(&path).map_err(|source| match source.kind() {
        IoErrorKind::NotFound => ArtifactError::Missing { artifact, path },
        _ => ArtifactError::Unreadable { artifact, source },
    })
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, ArtifactError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
        Err(e) => Err(ArtifactError::Integrity(format!("failed to read {path:?}: {e}"))),
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    fs::write(path, bytes)
        .map_err(|e| ArtifactError::Integrity(format!("failed to write {path:?}: {e}")))
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::bundle::tests::abc_source;
    use crate::application::ArtifactBundle;
    use rand::rngs::OsRng;

    fn write_abc_bundle(dir: &Path) {
        for (kind, bytes) in abc_source().0 {
            fs::write(dir.join(kind.file_name()), bytes).expect("write artifact");
        }
    }

    #[test]
    fn test_unsigned_bundle_loads() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_abc_bundle(dir.path());

        let source = DirectoryArtifactSource::open(dir.path(), &SignaturePolicy::default())
            .expect("open");
        assert!(source.manifest().is_none());
        let bundle = ArtifactBundle::load(&source).expect("Bundle should load");
        assert_eq!(bundle.selected_features().len(), 2);
    }

    #[test]
    fn test_missing_file_is_named() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_abc_bundle(dir.path());
        fs::remove_file(dir.path().join("selector.json")).expect("remove");

        let source = DirectoryArtifactSource::open(dir.path(), &SignaturePolicy::default())
            .expect("open");
        let err = ArtifactBundle::load(&source).expect_err("must fail");
        assert!(matches!(
            err,
            ArtifactError::Missing {
                artifact: ArtifactKind::Selector,
                ..
            }
        ));
    }

    #[test]
    fn test_signed_bundle_verifies() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_abc_bundle(dir.path());
        let key = SigningKey::generate(&mut OsRng);
        let manifest = sign_bundle_dir(dir.path(), Some(7), &key).expect("sign");
        assert_eq!(manifest.serial, 7);
        assert_eq!(manifest.files.len(), ArtifactKind::LOAD_ORDER.len());

        let policy = SignaturePolicy::Require(key.verifying_key());
        let source = DirectoryArtifactSource::open(dir.path(), &policy).expect("open");
        assert!(ArtifactBundle::load(&source).is_ok());
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_abc_bundle(dir.path());
        sign_bundle_dir(dir.path(), None, &SigningKey::generate(&mut OsRng)).expect("sign");

        let other = SigningKey::generate(&mut OsRng).verifying_key();
        for policy in [
            SignaturePolicy::Require(other),
            SignaturePolicy::VerifyIfSigned(other),
        ] {
            let err = DirectoryArtifactSource::open(dir.path(), &policy).expect_err("must fail");
            assert!(matches!(err, ArtifactError::Integrity(_)));
        }
    }

    #[test]
    fn test_required_signature_must_exist() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_abc_bundle(dir.path());

        let key = SigningKey::generate(&mut OsRng).verifying_key();
        let err = DirectoryArtifactSource::open(dir.path(), &SignaturePolicy::Require(key))
            .expect_err("must fail");
        assert!(matches!(err, ArtifactError::Integrity(_)));

        // Not required: an unsigned bundle still opens.
        assert!(
            DirectoryArtifactSource::open(dir.path(), &SignaturePolicy::VerifyIfSigned(key)).is_ok()
        );
    }

    #[test]
    fn test_modified_artifact_is_tampered() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_abc_bundle(dir.path());
        let key = SigningKey::generate(&mut OsRng);
        sign_bundle_dir(dir.path(), None, &key).expect("sign");
        fs::write(
            dir.path().join("scaler.json"),
            br#"{"mean": [9.0, 0.0, 0.0], "scale": [1.0, 1.0, 1.0]}"#,
        )
        .expect("overwrite");

        let source =
            DirectoryArtifactSource::open(dir.path(), &SignaturePolicy::Require(key.verifying_key()))
                .expect("manifest itself is intact");
        let err = ArtifactBundle::load(&source).expect_err("must fail");
        assert!(matches!(
            err,
            ArtifactError::Tampered {
                artifact: ArtifactKind::Scaler
            }
        ));
    }

    #[test]
    fn test_unbound_artifact_is_tampered() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_abc_bundle(dir.path());
        let mut manifest = BundleManifest::from_bundle_dir(dir.path(), Some(1)).expect("hash");
        manifest.files.remove("feature_names.json");
        fs::write(
            dir.path().join(MANIFEST_FILE),
            serde_json::to_vec(&manifest).expect("json"),
        )
        .expect("write manifest");

        let source = DirectoryArtifactSource::open(dir.path(), &SignaturePolicy::default())
            .expect("open");
        let err = source.read(ArtifactKind::FeatureNames).expect_err("must fail");
        assert!(matches!(err, ArtifactError::Tampered { .. }));
    }

    #[test]
    fn test_load_verifying_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let key = SigningKey::generate(&mut OsRng).verifying_key();
        let path = dir.path().join("bundle.pub");
        fs::write(
            &path,
            format!("{}\n", general_purpose::STANDARD.encode(key.as_bytes())),
        )
        .expect("write key");
        assert_eq!(load_verifying_key(&path).expect("load"), key);

        fs::write(&path, "c2hvcnQ=").expect("write short key");
        assert!(load_verifying_key(&path).is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq_str("abc", "abc"));
        assert!(!constant_time_eq_str("abc", "abd"));
        assert!(!constant_time_eq_str("abc", "abcd"));
    }
}
