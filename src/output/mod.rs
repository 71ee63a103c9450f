//! Pipeline interchange artifacts

pub mod bundle;

pub use bundle::{AppBundle, BundleVersion, ServerConfig, StartCommand};
