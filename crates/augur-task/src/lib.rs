//! Pipeline tasks for augur.
//!
//! A [`Task`] is one stage of a job pipeline: fetch a URL, call a bridge
//! (external adapter), aggregate answers with a median, or transform a value.
//! Tasks are decoded from `type`-tagged JSON documents and run against the
//! [`TaskResult`]s of their inputs inside a [`TaskContext`].

mod bridge;
mod context;
pub mod decimal;
pub mod decode;
mod error;
mod http;
mod median;
mod network;
mod registry;
mod result;
mod task;
mod transform;
mod types;

pub use bridge::BridgeTask;
pub use context::{HttpClient, HttpSettings, TaskContext};
pub use error::{DecodeError, RegistryError, TaskError};
pub use http::{HttpTask, RequestData};
pub use median::{MedianTask, median_of};
pub use network::{AddressFilter, RestrictedAddress, is_restricted};
pub use registry::{BridgeRegistry, StaticBridges};
pub use result::{TaskFailure, TaskResult, TaskValue};
pub use task::{BaseTask, Task};
pub use transform::{JsonParseTask, MultiplyTask};
pub use types::{Cardinality, TaskType};
