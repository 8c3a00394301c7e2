//! Partitions of a data source and the fragments response payload.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A published, shared, immutable fragment list.
pub type FragmentList = Arc<Vec<Fragment>>;

/// One splittable unit of an external data source.
///
/// Created by a fragmenter, normalized exactly once (index and replicas) and then shared
/// read-only behind a [`FragmentList`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    source_name: String,
    index: usize,
    replicas: Vec<String>,
    #[serde(with = "base64_bytes")]
    metadata: Option<Vec<u8>>,
    #[serde(with = "base64_bytes")]
    user_data: Option<Vec<u8>>,
}

impl Fragment {
    pub fn new(source_name: impl Into<String>, replicas: Vec<String>) -> Self {
        Self {
            source_name: source_name.into(),
            index: 0,
            replicas,
            metadata: None,
            user_data: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Vec<u8>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_user_data(mut self, user_data: Vec<u8>) -> Self {
        self.user_data = Some(user_data);
        self
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn replicas(&self) -> &[String] {
        &self.replicas
    }

    pub fn metadata(&self) -> Option<&[u8]> {
        self.metadata.as_deref()
    }

    pub fn user_data(&self) -> Option<&[u8]> {
        self.user_data.as_deref()
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn set_replicas(&mut self, replicas: Vec<String>) {
        self.replicas = replicas;
    }
}

/// Fragments returned to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentsResponse {
    fragments: FragmentList,
}

impl FragmentsResponse {
    pub fn new(fragments: FragmentList) -> Self {
        Self { fragments }
    }

    /// The shared list; cached responses hand out the same allocation to every caller.
    pub fn fragments(&self) -> &FragmentList {
        &self.fragments
    }

    pub fn into_fragments(self) -> FragmentList {
        self.fragments
    }
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
