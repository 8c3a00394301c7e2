use fedgate_types::RequestDescriptor;

/// Identity of a fragment list: one data source with one filter, within one query.
///
/// The segment id is deliberately not part of the key so all segments of a query share an
/// entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    transaction_id: String,
    data_source: String,
    filter_string: Option<String>,
}

impl CacheKey {
    pub fn new(
        transaction_id: impl Into<String>,
        data_source: impl Into<String>,
        filter_string: Option<String>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            data_source: data_source.into(),
            filter_string,
        }
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn filter_string(&self) -> Option<&str> {
        self.filter_string.as_deref()
    }
}

impl From<&RequestDescriptor> for CacheKey {
    fn from(descriptor: &RequestDescriptor) -> Self {
        Self::new(
            descriptor.transaction_id(),
            descriptor.data_source(),
            descriptor.filter_string().map(ToOwned::to_owned),
        )
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.transaction_id, self.data_source)?;
        if let Some(filter) = &self.filter_string {
            write!(f, ":{filter}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn descriptor(
        transaction_id: &str,
        segment_id: u32,
        data_source: &str,
        filter: Option<&str>,
    ) -> RequestDescriptor {
        let mut builder = RequestDescriptor::builder(transaction_id)
            .segment_id(segment_id)
            .data_source(data_source);
        if let Some(filter) = filter {
            builder = builder.filter_string(filter);
        }
        builder.build()
    }

    #[test]
    fn segment_id_is_not_part_of_the_key() {
        let a = CacheKey::from(&descriptor("XID-1", 0, "/tmp/foo", Some("a1o2")));
        let b = CacheKey::from(&descriptor("XID-1", 1, "/tmp/foo", Some("a1o2")));

        assert_eq!(a, b);
        assert_eq!(a.to_string(), "XID-1:/tmp/foo:a1o2");
    }

    #[test]
    fn every_other_field_is() {
        let keys: HashSet<_> = [
            descriptor("XID-1", 0, "/tmp/foo", Some("a1o2")),
            descriptor("XID-2", 0, "/tmp/foo", Some("a1o2")),
            descriptor("XID-1", 0, "/tmp/bar", Some("a1o2")),
            descriptor("XID-1", 0, "/tmp/foo", Some("a1o3")),
            descriptor("XID-1", 0, "/tmp/foo", None),
        ]
        .iter()
        .map(CacheKey::from)
        .collect();

        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn missing_filter_differs_from_empty_filter() {
        assert_ne!(
            CacheKey::new("XID-1", "/tmp/foo", None),
            CacheKey::new("XID-1", "/tmp/foo", Some(String::new())),
        );
    }
}
