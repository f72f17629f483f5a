//! Configuration document loading and schema binding.

pub mod document;
pub mod loader;
pub mod parser;
pub mod schema;

pub use loader::{load_file, load_str, ConnectionStrings, IntegrationConfig};
pub use schema::{Bindable, Property, Schema};
