//! Shared data model of the gateway core: the per-call [`RequestDescriptor`], the per-request
//! [`Configuration`] snapshot, partition [`Fragment`]s, connector rows and fields, and the
//! type-erased error helpers used at the connector boundary.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod fragment;
pub mod row;

pub use config::{ConfigError, Configuration};
pub use descriptor::{
    ColumnDescriptor, ConnectorMetadata, DataType, RequestDescriptor, RequestDescriptorBuilder,
};
pub use error::{DynError, ErrorChainExt, ErrorChainIter, TransientAuthError};
pub use fragment::{Fragment, FragmentList, FragmentsResponse};
pub use row::{FieldValue, OneField, OneRow};
