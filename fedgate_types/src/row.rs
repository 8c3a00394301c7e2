//! Rows read by accessors and the typed fields resolvers produce from them.
use std::any::Any;

use crate::descriptor::DataType;

/// A record as produced by an accessor.
///
/// The payload is connector specific; only the matching resolver knows how to interpret it.
#[derive(Debug)]
pub struct OneRow {
    key: Option<Box<dyn Any + Send>>,
    data: Box<dyn Any + Send>,
}

impl OneRow {
    pub fn new(data: impl Any + Send) -> Self {
        Self {
            key: None,
            data: Box::new(data),
        }
    }

    /// Attach a key, e.g. the byte offset of a line in a text file.
    pub fn with_key(mut self, key: impl Any + Send) -> Self {
        self.key = Some(Box::new(key));
        self
    }

    pub fn key<T: Any>(&self) -> Option<&T> {
        self.key.as_ref().and_then(|k| k.downcast_ref::<T>())
    }

    pub fn data<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    pub fn into_data<T: Any>(self) -> Option<T> {
        self.data.downcast::<T>().ok().map(|b| *b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// A single resolved field, tagged with the column type it was resolved for.
#[derive(Debug, Clone, PartialEq)]
pub struct OneField {
    pub data_type: DataType,
    pub value: FieldValue,
}

impl OneField {
    pub fn new(data_type: DataType, value: FieldValue) -> Self {
        Self { data_type, value }
    }

    pub fn null(data_type: DataType) -> Self {
        Self::new(data_type, FieldValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_payload_is_typed_on_read() {
        let row = OneRow::new(vec!["plain string".to_owned(), "1000".to_owned()]).with_key(42u64);

        assert_eq!(row.key::<u64>(), Some(&42));
        assert_eq!(row.key::<u32>(), None);
        assert_eq!(row.data::<Vec<String>>().map(Vec::len), Some(2));
        assert!(row.data::<String>().is_none());

        let data = row.into_data::<Vec<String>>().unwrap();
        assert_eq!(data[0], "plain string");
    }

    #[test]
    fn null_field() {
        let field = OneField::null(DataType::Float8);
        assert_eq!(field.value, FieldValue::Null);
        assert_eq!(field.data_type.oid(), 701);
    }
}
