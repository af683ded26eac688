//! Conversion configuration
//!
//! Every user parameter of a session, its builder, and persistence through a
//! `ConfigStore`.

mod builder;
mod store;
mod types;


pub use builder::ConfigurationBuilder;
pub use store::{ConfigStore, JsonConfigStore};
pub use types::{AutoState, Configuration, OutputDepth};
