//! yamlenv-core: load key/value pairs from YAML into the process environment
//!
//! A config file lists `values`, each a `key`/`value` pair. The loader can
//! read and write such files and apply them to an [`Environment`], gated by a
//! sentinel variable (`ENVIRONMENT` by default) that signals an orchestrator
//! has already provided the environment.
//!
//! # Example
//!
//! ```rust
//! use yamlenv_core::{Configuration, Environment, MemoryEnvironment};
//!
//! let yaml = r#"
//! values:
//!   - key: DATABASE_HOST
//!     value: localhost
//!   - key: DATABASE_PORT
//!     value: "5432"
//! "#;
//!
//! let config = Configuration::from_yaml(yaml).unwrap();
//! let mut env = MemoryEnvironment::new();
//! config.apply(&mut env).unwrap();
//!
//! assert_eq!(env.get("DATABASE_PORT"), "5432");
//! ```

pub mod env;
pub mod error;

mod config;
mod loader;

pub use config::{load_config, save_config, Configuration, Entry};
pub use env::{Environment, MemoryEnvironment, SystemEnvironment};
pub use error::{Error, Result};
pub use loader::{InitOutcome, Loader, LoaderOptions, DEFAULT_SENTINEL};
