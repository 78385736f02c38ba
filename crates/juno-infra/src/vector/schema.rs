//! Arrow schema of the repository chunk table.
//!
//! Arrow versions MUST match lancedb's transitive dependency (57.3 for lancedb 0.26).

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema};

/// Name of the single table holding every chunk of a workspace.
pub const CHUNKS_TABLE: &str = "chunks";

/// Column holding the embedding.
pub const VECTOR_COLUMN: &str = "vector";

/// Schema of the chunk table for vectors of `dimension` floats.
///
/// `seq` increases with every insert and breaks distance ties, so equal
/// distances come back in insertion order.
pub fn chunks_schema(dimension: i32) -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("seq", DataType::Int64, false),
        Field::new("file_path", DataType::Utf8, false),
        Field::new("language_id", DataType::Utf8, false),
        Field::new("chunk_index", DataType::Int32, false),
        Field::new("line_count", DataType::Int32, false),
        Field::new("content_hash", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("embedding_model", DataType::Utf8, false),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimension,
            ),
            false,
        ),
    ])
}

/// Vector length of a stored chunk table, read back from its schema.
pub fn stored_dimension(schema: &Schema) -> Option<usize> {
    match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
        DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_fields() {
        let schema = chunks_schema(1536);
        assert_eq!(schema.fields().len(), 10);
        assert_eq!(schema.field_with_name("seq").unwrap().data_type(), &DataType::Int64);
        assert!(!schema.field_with_name("file_path").unwrap().is_nullable());
    }

    #[test]
    fn test_stored_dimension() {
        assert_eq!(stored_dimension(&chunks_schema(8)), Some(8));
        let other = Schema::new(vec![Field::new("vector", DataType::Utf8, false)]);
        assert_eq!(stored_dimension(&other), None);
    }
}
