//! Job specs for augur.
//!
//! V1 jobs are JSON documents with initiators and a task list; V2 jobs are
//! TOML documents with a fetcher tree as their observation source. Both are
//! gated by feature flags and validated before they are stored.

mod bridges;
mod error;
mod gate;
mod state;
pub mod v1;
pub mod v2;

pub use bridges::ensure_registered;
pub use error::JobError;
pub use gate::{require_implemented_v1, require_implemented_v2};
pub use state::JobState;
pub use v1::{Initiator, InitiatorParams, InitiatorType, JobId, JobSpec, JobSpecRequest};
pub use v2::{JobSpecV2, JobType};
