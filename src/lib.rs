//! A small embeddable configuration language: a tokenizer, a recursive
//! substitution evaluator, a statement dispatcher and a source loader,
//! wrapped in a host-facing [`Config`] facade.
//!
//! ```
//! use cassette_cfg::Config;
//!
//! let mut config = Config::new();
//! config.load_internal("window title \"hello\"\n");
//! config.fetch("window", "title");
//! assert!(config.iterate());
//! assert_eq!(config.resource(), "hello");
//! ```

mod book;
mod color;
mod config;
mod dict;
mod engine;
mod error;
mod token;

pub use config::Config;
pub use engine::ParamValue;
pub use error::ConfigError;
