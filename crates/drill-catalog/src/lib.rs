//! streamdrill catalogs: YAML exercise definitions compiled into exercise specs.
//!
//! # Example
//!
//! ```ignore
//! use drill_catalog::Catalog;
//!
//! let catalog = Catalog::load("lessons/phase0_streams.yaml")?;
//! for entry in catalog.entries() {
//!     println!("{}", entry.id());
//! }
//! ```

pub mod catalog;
pub mod format;
pub mod lessons;

pub use catalog::{Catalog, CatalogEntry};
pub use format::PLACEHOLDER;
pub use lessons::builtin;

use thiserror::Error;

/// Errors that reject a whole catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog {name}: {source}")]
    Yaml {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Catalog {name} has unsupported version '{version}'")]
    UnsupportedVersion { name: String, version: String },
}
