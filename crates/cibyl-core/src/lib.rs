pub mod config;
pub mod error;
pub mod filtering;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod query;
pub mod sources;
pub mod text;
pub mod validator;

pub use error::{CibylError, Result, SourceError};
