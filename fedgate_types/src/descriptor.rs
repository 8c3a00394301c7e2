//! The per-call request descriptor.
use std::{any::Any, sync::Arc};

use parking_lot::RwLock;

use crate::config::Configuration;

/// Opaque value a connector may attach to a descriptor for its sibling connectors.
pub type ConnectorMetadata = Arc<dyn Any + Send + Sync>;

/// Column types understood by the calling query engine, identified on the wire by type oid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Bytea,
    Int8,
    Int2,
    Int4,
    Text,
    Float4,
    Float8,
    Bpchar,
    Varchar,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Numeric,
    Unsupported,
}

impl DataType {
    pub fn oid(&self) -> u32 {
        match self {
            Self::Boolean => 16,
            Self::Bytea => 17,
            Self::Int8 => 20,
            Self::Int2 => 21,
            Self::Int4 => 23,
            Self::Text => 25,
            Self::Float4 => 700,
            Self::Float8 => 701,
            Self::Bpchar => 1042,
            Self::Varchar => 1043,
            Self::Date => 1082,
            Self::Time => 1083,
            Self::Timestamp => 1114,
            Self::TimestampTz => 1184,
            Self::Numeric => 1700,
            Self::Unsupported => u32::MAX,
        }
    }

    /// Unknown oids map to [`DataType::Unsupported`].
    pub fn from_oid(oid: u32) -> Self {
        match oid {
            16 => Self::Boolean,
            17 => Self::Bytea,
            20 => Self::Int8,
            21 => Self::Int2,
            23 => Self::Int4,
            25 => Self::Text,
            700 => Self::Float4,
            701 => Self::Float8,
            1042 => Self::Bpchar,
            1043 => Self::Varchar,
            1082 => Self::Date,
            1083 => Self::Time,
            1114 => Self::Timestamp,
            1184 => Self::TimestampTz,
            1700 => Self::Numeric,
            _ => Self::Unsupported,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean => "bool",
            Self::Bytea => "bytea",
            Self::Int8 => "int8",
            Self::Int2 => "int2",
            Self::Int4 => "int4",
            Self::Text => "text",
            Self::Float4 => "float4",
            Self::Float8 => "float8",
            Self::Bpchar => "bpchar",
            Self::Varchar => "varchar",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamptz",
            Self::Numeric => "numeric",
            Self::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    name: String,
    index: usize,
    data_type: DataType,
    type_name: String,
    type_modifiers: Option<Vec<i32>>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, index: usize, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            index,
            data_type,
            type_name: data_type.type_name().to_owned(),
            type_modifiers: None,
        }
    }

    /// Type modifiers as sent by the query engine, e.g. precision and scale of a numeric.
    pub fn with_type_modifiers(mut self, modifiers: Vec<i32>) -> Self {
        self.type_modifiers = Some(modifiers);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn type_modifiers(&self) -> Option<&[i32]> {
        self.type_modifiers.as_deref()
    }
}

/// Everything the core knows about one call from one worker.
///
/// Built once by the transport layer and shared as `Arc<RequestDescriptor>`. The only state that
/// changes afterwards is the [connector metadata](Self::set_metadata) slot.
#[derive(Debug)]
pub struct RequestDescriptor {
    transaction_id: String,
    segment_id: u32,
    total_segments: u32,
    data_source: String,
    filter_string: Option<String>,
    server_name: String,
    user: String,
    config: Configuration,
    accessor: String,
    resolver: String,
    fragmenter: String,
    columns: Vec<ColumnDescriptor>,
    fragment_metadata: Option<Vec<u8>>,
    user_data: Option<Vec<u8>>,
    metadata: RwLock<Option<ConnectorMetadata>>,
}

impl RequestDescriptor {
    pub fn builder(transaction_id: impl Into<String>) -> RequestDescriptorBuilder {
        RequestDescriptorBuilder::new(transaction_id)
    }

    /// Identifies one logical query across all of its segments.
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn segment_id(&self) -> u32 {
        self.segment_id
    }

    pub fn total_segments(&self) -> u32 {
        self.total_segments
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    /// Serialized predicate pushed down by the query engine, if any.
    pub fn filter_string(&self) -> Option<&str> {
        self.filter_string.as_deref()
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn accessor(&self) -> &str {
        &self.accessor
    }

    pub fn resolver(&self) -> &str {
        &self.resolver
    }

    pub fn fragmenter(&self) -> &str {
        &self.fragmenter
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    /// Metadata of the fragment this segment reads, as returned in the fragments response.
    pub fn fragment_metadata(&self) -> Option<&[u8]> {
        self.fragment_metadata.as_deref()
    }

    /// User data of the fragment this segment reads, as returned in the fragments response.
    pub fn user_data(&self) -> Option<&[u8]> {
        self.user_data.as_deref()
    }

    pub fn metadata(&self) -> Option<ConnectorMetadata> {
        self.metadata.read().clone()
    }

    /// Attach connector-produced metadata, replacing any previous value.
    pub fn set_metadata(&self, metadata: ConnectorMetadata) {
        *self.metadata.write() = Some(metadata);
    }
}

#[derive(Debug, Default)]
pub struct RequestDescriptorBuilder {
    transaction_id: String,
    segment_id: u32,
    total_segments: u32,
    data_source: String,
    filter_string: Option<String>,
    server_name: String,
    user: String,
    config: Configuration,
    accessor: String,
    resolver: String,
    fragmenter: String,
    columns: Vec<ColumnDescriptor>,
    fragment_metadata: Option<Vec<u8>>,
    user_data: Option<Vec<u8>>,
}

impl RequestDescriptorBuilder {
    pub fn new(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            total_segments: 1,
            server_name: "default".to_owned(),
            ..Default::default()
        }
    }

    pub fn segment_id(mut self, segment_id: u32) -> Self {
        self.segment_id = segment_id;
        self
    }

    pub fn total_segments(mut self, total_segments: u32) -> Self {
        self.total_segments = total_segments;
        self
    }

    pub fn data_source(mut self, data_source: impl Into<String>) -> Self {
        self.data_source = data_source.into();
        self
    }

    pub fn filter_string(mut self, filter_string: impl Into<String>) -> Self {
        self.filter_string = Some(filter_string.into());
        self
    }

    pub fn server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = server_name.into();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn config(mut self, config: Configuration) -> Self {
        self.config = config;
        self
    }

    pub fn accessor(mut self, name: impl Into<String>) -> Self {
        self.accessor = name.into();
        self
    }

    pub fn resolver(mut self, name: impl Into<String>) -> Self {
        self.resolver = name.into();
        self
    }

    pub fn fragmenter(mut self, name: impl Into<String>) -> Self {
        self.fragmenter = name.into();
        self
    }

    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    pub fn fragment_metadata(mut self, metadata: Vec<u8>) -> Self {
        self.fragment_metadata = Some(metadata);
        self
    }

    pub fn user_data(mut self, user_data: Vec<u8>) -> Self {
        self.user_data = Some(user_data);
        self
    }

    pub fn build(self) -> RequestDescriptor {
        RequestDescriptor {
            transaction_id: self.transaction_id,
            segment_id: self.segment_id,
            total_segments: self.total_segments,
            data_source: self.data_source,
            filter_string: self.filter_string,
            server_name: self.server_name,
            user: self.user,
            config: self.config,
            accessor: self.accessor,
            resolver: self.resolver,
            fragmenter: self.fragmenter,
            columns: self.columns,
            fragment_metadata: self.fragment_metadata,
            user_data: self.user_data,
            metadata: RwLock::new(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let descriptor = RequestDescriptor::builder("XID-XYZ-123456").build();

        assert_eq!(descriptor.transaction_id(), "XID-XYZ-123456");
        assert_eq!(descriptor.segment_id(), 0);
        assert_eq!(descriptor.total_segments(), 1);
        assert_eq!(descriptor.server_name(), "default");
        assert_eq!(descriptor.filter_string(), None);
        assert!(descriptor.columns().is_empty());
        assert!(descriptor.metadata().is_none());
        assert_eq!(descriptor.user(), "");
        assert!(descriptor.config().is_empty());
        assert_eq!(descriptor.fragment_metadata(), None);
        assert_eq!(descriptor.user_data(), None);
    }

    #[test]
    fn builder_sets_every_field() {
        let config = Configuration::new().with("hadoop.security.authentication", "kerberos");
        let descriptor = RequestDescriptor::builder("XID-XYZ-123456")
            .segment_id(2)
            .total_segments(3)
            .data_source("/tmp/data")
            .filter_string("a1c25s10dfoo")
            .server_name("hdfs-east")
            .user("gpadmin")
            .config(config.clone())
            .accessor("hdfs:text")
            .resolver("hdfs:text:resolver")
            .fragmenter("hdfs:text:fragmenter")
            .fragment_metadata(vec![1, 2, 3])
            .user_data(b"user".to_vec())
            .build();

        assert_eq!(descriptor.segment_id(), 2);
        assert_eq!(descriptor.total_segments(), 3);
        assert_eq!(descriptor.data_source(), "/tmp/data");
        assert_eq!(descriptor.filter_string(), Some("a1c25s10dfoo"));
        assert_eq!(descriptor.server_name(), "hdfs-east");
        assert_eq!(descriptor.user(), "gpadmin");
        assert_eq!(descriptor.config(), &config);
        assert_eq!(descriptor.accessor(), "hdfs:text");
        assert_eq!(descriptor.resolver(), "hdfs:text:resolver");
        assert_eq!(descriptor.fragmenter(), "hdfs:text:fragmenter");
        assert_eq!(descriptor.fragment_metadata(), Some([1, 2, 3].as_slice()));
        assert_eq!(descriptor.user_data(), Some(b"user".as_slice()));
    }

    #[test]
    fn columns_keep_order() {
        let descriptor = RequestDescriptor::builder("XID")
            .column(ColumnDescriptor::new("name", 0, DataType::Text))
            .column(
                ColumnDescriptor::new("amt", 1, DataType::Numeric).with_type_modifiers(vec![10, 2]),
            )
            .build();

        let names: Vec<_> = descriptor.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, ["name", "amt"]);
        let amt = descriptor.column(1).unwrap();
        assert_eq!(amt.type_name(), "numeric");
        assert_eq!(amt.type_modifiers(), Some([10, 2].as_slice()));
        assert!(descriptor.column(2).is_none());
    }

    #[test]
    fn metadata_can_be_attached_after_build() {
        let descriptor = Arc::new(RequestDescriptor::builder("XID").build());
        let shared = Arc::clone(&descriptor);

        shared.set_metadata(Arc::new(String::from("table properties")));

        let metadata = descriptor.metadata().unwrap();
        assert_eq!(
            metadata.downcast_ref::<String>().map(String::as_str),
            Some("table properties")
        );
    }

    #[test]
    fn data_type_oids() {
        for data_type in [DataType::Text, DataType::Float8, DataType::Int8, DataType::Bytea] {
            assert_eq!(DataType::from_oid(data_type.oid()), data_type);
        }
        assert_eq!(DataType::Float8.oid(), 701);
        assert_eq!(DataType::from_oid(4242), DataType::Unsupported);
    }
}
