//! Capability contracts between the gateway core and pluggable connectors.
//!
//! The core never names a storage system. It asks a factory for an [`Accessor`], [`Resolver`]
//! or [`Fragmenter`] bound to a [`RequestDescriptor`](fedgate_types::RequestDescriptor), and
//! only talks to the result through these traits. [`ConnectorRegistry`] is the production
//! factory: it maps connector names to constructors registered at startup.

mod factory;
mod registry;
pub mod testing;

use std::sync::Arc;

use fedgate_types::{Configuration, DynError, Fragment, OneField, OneRow, RequestDescriptor};

pub use factory::{
    AccessorFactory, ConnectorKind, FactoryError, FragmenterFactory, ResolverFactory,
};
pub use registry::ConnectorRegistry;

/// Returned by the default implementations of optional connector operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connector does not support {operation}")]
pub struct UnsupportedOperation {
    pub operation: &'static str,
}

/// Base contract shared by every connector.
pub trait Plugin: std::fmt::Debug + Send {
    /// Bind this instance to one request. Called by the factory before the instance is handed
    /// out, exactly once per instance.
    ///
    /// A connector may attach metadata for its siblings with
    /// [`RequestDescriptor::set_metadata`].
    fn initialize(&mut self, descriptor: Arc<RequestDescriptor>) -> Result<(), DynError>;

    /// Configuration the connector resolved for this request. The fault-tolerant executor reads
    /// the authentication mode and retry budget from it.
    fn configuration(&self) -> &Configuration;
}

/// Reads (and optionally writes) records of a data source.
pub trait Accessor: Plugin {
    /// Open the underlying source. Returns `false` if there is nothing to read.
    fn open_for_read(&mut self) -> Result<bool, DynError>;

    /// Next record, or `None` at end of data.
    fn read_next(&mut self) -> Result<Option<OneRow>, DynError>;

    fn close_for_read(&mut self) -> Result<(), DynError>;

    fn open_for_write(&mut self) -> Result<bool, DynError> {
        Err(DynError::new(UnsupportedOperation {
            operation: "open_for_write",
        }))
    }

    /// Write one record. Returns `false` if the record was rejected.
    fn write_next(&mut self, _row: OneRow) -> Result<bool, DynError> {
        Err(DynError::new(UnsupportedOperation {
            operation: "write_next",
        }))
    }

    fn close_for_write(&mut self) -> Result<(), DynError> {
        Err(DynError::new(UnsupportedOperation {
            operation: "close_for_write",
        }))
    }
}

/// Converts between connector records and typed fields.
pub trait Resolver: Plugin {
    /// Fields of `row`, in column order.
    fn get_fields(&mut self, row: &OneRow) -> Result<Vec<OneField>, DynError>;

    fn set_fields(&mut self, _fields: &[OneField]) -> Result<OneRow, DynError> {
        Err(DynError::new(UnsupportedOperation {
            operation: "set_fields",
        }))
    }
}

/// Lists the partitions of a data source.
pub trait Fragmenter: Plugin {
    /// Fragments in source order. Indices and replicas are normalized by the caller.
    fn get_fragments(&mut self) -> Result<Vec<Fragment>, DynError>;
}
