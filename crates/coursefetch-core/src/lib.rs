//! Authenticated retrieval of course files from Moodle-style portals.

pub mod config;
pub mod deadline;
pub mod discovery;
pub mod download;
pub mod engine;
pub mod fetch;
pub mod logging;
mod page;
pub mod resolver;
pub mod session;
pub mod url_model;

pub use engine::{Engine, EngineConfig, RunStatus};
pub use session::{Credentials, Session};
