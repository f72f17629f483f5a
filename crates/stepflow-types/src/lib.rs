//! Shared stepflow record model and error types.
//!
//! Step implementations outside the engine only need this crate and the
//! engine's step contract.

pub mod error;
pub mod record;
pub mod value;

pub use error::{ConfigError, NoRecordsAvailable, StepError};
pub use record::{Record, RecordError};
pub use value::{Value, ValueKind};
