//! Task graphs and fetcher trees.
//!
//! A [`Pipeline`] is a validated DAG of [`augur_task::Task`]s run by the
//! [`Runner`]. A [`Fetchers`] collection is the tree-shaped observation source
//! of a V2 job: bridge and HTTP leaves, median aggregation nodes, and a
//! [`Transformer`] chain on every node.

mod error;
mod fetcher;
mod graph;
mod notify;
mod owner;
mod pipeline;
mod runner;
mod transformer;

pub use error::PipelineError;
pub use fetcher::{BaseFetcher, BridgeFetcher, Fetcher, Fetchers, HttpFetcher, MedianFetcher};
pub use graph::Graph;
pub use notify::{Notifiee, NotifieeRef, PipelineEvent};
pub use owner::{JobOwner, OwnerKind};
pub use pipeline::{Pipeline, PipelineTask};
pub use runner::{PipelineRun, Runner};
pub use transformer::{JsonParseTransformer, MultiplyTransformer, Transformer, Transformers};
