//! Application Layer
//!
//! The sniper controller wires the stream, classifier, enrichment and filter
//! stages together and exposes the host-facing lifecycle.

pub mod controller;

pub use controller::{ControllerState, SniperController, SniperError, SniperSettings};
