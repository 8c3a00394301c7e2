//! Request orchestration of the gateway core.
//!
//! - [`FragmentResource`] answers "which fragments does this data source have", sharing one
//!   listing between all segments of a query through the [`FragmentCache`](fedgate_cache::FragmentCache)
//! - [`ReadBridge`] and [`WriteBridge`] move rows between a connector and the query engine
//! - [`ServiceContext`] wires both to the process-wide pieces
//!
//! Connector calls that may hit a transient authentication failure run through the
//! [`FaultTolerantExecutor`](fedgate_retry::FaultTolerantExecutor); a retried call always
//! gets a freshly created connector instance.

mod bridge;
mod context;
mod error;
mod indexer;
mod resource;
mod settings;

pub use bridge::{Bridge, ReadBridge, WriteBridge};
pub use context::ServiceContext;
pub use error::{Error, Result};
pub use indexer::{FragmentIndexer, REPLICA_PLACEHOLDER};
pub use resource::FragmentResource;
pub use settings::{ServiceSettings, SettingsSnapshot};
