//! Augur Job Engine
//!
//! Ties job specs, storage and pipeline execution together.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         JobEngine                           │
//! │  - create / show / list / archive / delete                  │
//! │  - run_job (V1 pipeline), run_job_v2 (V2 fetcher tree)      │
//! └─────────────────────────────────────────────────────────────┘
//!                   │                           │
//!                   ▼                           ▼
//! ┌───────────────────────────┐   ┌───────────────────────────┐
//! │        LegacyJobs         │   │        OracleJobs         │
//! │  V1, UUID ids, archive    │   │  V2, integer ids, delete  │
//! └───────────────────────────┘   └───────────────────────────┘
//!                   │                           │
//!                   └─────────────┬─────────────┘
//!                                 ▼
//!          gate ──▶ validate ──▶ announce ──▶ persist (augur_store::Store)
//! ```
//!
//! Announcing only does work for V1 jobs with `external` initiators, which
//! are posted to their registered initiator before the job is stored.

mod engine;
mod error;
mod external;
mod family;

pub use engine::JobEngine;
pub use error::EngineError;
pub use external::{ACCESS_KEY_HEADER, SECRET_HEADER, notify_external_initiators};
pub use family::{JobFamily, LegacyJobs, OracleJobs, create, remove};
