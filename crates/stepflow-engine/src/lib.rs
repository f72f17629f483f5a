//! Configuration-driven record pipeline engine.
//!
//! A job is an ordered chain of steps joined by FIFO connectors. The loader
//! builds jobs from an XML document, binding each step's declared schema;
//! [`Job::run`] then drives every step through its lifecycle, one step at a
//! time.

pub mod config;
pub mod connector;
pub mod errors;
pub mod job;
pub mod multicast;
pub mod registry;
pub mod result;
pub mod step;
pub mod steps;

// Re-export public API for convenience
pub use config::{load_file, load_str, IntegrationConfig};
pub use errors::StepFailure;
pub use job::{Job, JobStep};
pub use registry::{StepCatalog, StepDescriptor, StepRegistry};
pub use result::{JobResult, RunStatus, StepReport};
pub use step::{Capability, Step, StepContext};
