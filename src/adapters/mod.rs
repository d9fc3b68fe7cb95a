//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `artifacts`: bundle directory reader with Ed25519 manifest verification
//! - `http`: axum router for `/predict` and `/health`
//! - `model`: classifier implementations for the exported model parameters
//! - `waterfall`: plotters SVG rendering of local attributions
//! - `sanitize`: redaction for log output

pub mod artifacts;
pub mod http;
pub mod model;
pub mod sanitize;
pub mod waterfall;
