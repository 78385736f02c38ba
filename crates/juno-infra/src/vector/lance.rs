//! LanceDB-backed [`VectorIndex`] for one workspace.
//!
//! A workspace gets a LanceDB database directory holding a single `chunks`
//! table. The table is created on first use with the configured vector
//! dimension; reopening it with a different dimension is rejected.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, Int64Array, RecordBatch,
    RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field};
use futures_util::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use tokio::sync::Mutex;
use tracing::{debug, info};

use juno_core::index::VectorIndex;
use juno_core::index::vector::check_dimension;
use juno_types::index::{ChunkMetadata, IndexError, IndexedItem, RankedResult};

use super::schema::{CHUNKS_TABLE, chunks_schema, stored_dimension};

/// Extra rows fetched per query so distance ties at the cut-off can be
/// ordered by insertion sequence. The window doubles while the rows at the
/// cut-off distance run past it.
const TIE_SLACK: usize = 8;

/// Vector index stored in a LanceDB directory.
pub struct LanceVectorIndex {
    db: lancedb::Connection,
    path: PathBuf,
    dimension: usize,
    embedding_model: String,
    /// Next insertion sequence number; loaded from the table on first insert.
    next_seq: Mutex<Option<i64>>,
}

fn storage(context: &str) -> impl FnOnce(lancedb::Error) -> IndexError + '_ {
    move |e| IndexError::Storage(format!("{context}: {e}"))
}

/// SQL string literal for a LanceDB filter.
fn quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl LanceVectorIndex {
    /// Connect to (and create the directory of) the database at `path`.
    ///
    /// The `chunks` table itself is only created by
    /// [`ensure_created`](VectorIndex::ensure_created) or the first insert.
    pub async fn open(
        path: impl AsRef<Path>,
        dimension: usize,
        embedding_model: impl Into<String>,
    ) -> Result<Self, IndexError> {
        let path = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path).map_err(|e| {
            IndexError::Storage(format!("failed to create {}: {e}", path.display()))
        })?;
        let uri = path.to_str().ok_or_else(|| {
            IndexError::Storage(format!("path contains invalid UTF-8: {}", path.display()))
        })?;

        let db = lancedb::connect(uri)
            .execute()
            .await
            .map_err(storage("failed to open vector database"))?;
        debug!(path = %path.display(), dimension, "opened vector database");

        Ok(Self {
            db,
            path,
            dimension,
            embedding_model: embedding_model.into(),
            next_seq: Mutex::new(None),
        })
    }

    /// Directory holding the database.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The chunk table, or `None` when it has not been created yet.
    async fn table(&self) -> Result<Option<lancedb::Table>, IndexError> {
        match self.db.open_table(CHUNKS_TABLE).execute().await {
            Ok(table) => Ok(Some(table)),
            Err(lancedb::Error::TableNotFound { .. }) => Ok(None),
            Err(e) => Err(storage("failed to open chunk table")(e)),
        }
    }

    /// Open the chunk table, creating it when missing, and check its dimension.
    async fn ensure_table(&self) -> Result<lancedb::Table, IndexError> {
        let table = match self.table().await? {
            Some(table) => table,
            None => {
                let dimension = i32::try_from(self.dimension).map_err(|_| {
                    IndexError::InvalidArgument(format!("dimension {} is too large", self.dimension))
                })?;
                info!(path = %self.path.display(), dimension, "creating chunk table");
                self.db
                    .create_empty_table(CHUNKS_TABLE, Arc::new(chunks_schema(dimension)))
                    .execute()
                    .await
                    .map_err(storage("failed to create chunk table"))?
            }
        };

        let stored = Self::table_dimension(&table).await?;
        if stored != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: stored,
                actual: self.dimension,
            });
        }
        Ok(table)
    }

    /// Vector dimension fixed in the table schema.
    async fn table_dimension(table: &lancedb::Table) -> Result<usize, IndexError> {
        let schema = table
            .schema()
            .await
            .map_err(storage("failed to read chunk table schema"))?;
        stored_dimension(&schema).ok_or_else(|| {
            IndexError::Storage("chunk table has no fixed-size vector column".to_string())
        })
    }

    /// The `limit` nearest rows, ordered by distance then insertion sequence.
    async fn nearest(
        table: &lancedb::Table,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<(i64, RankedResult)>, IndexError> {
        let batches: Vec<RecordBatch> = table
            .vector_search(vector)
            .map_err(storage("vector search setup failed"))?
            .distance_type(lancedb::DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(storage("vector search failed"))?
            .try_collect()
            .await
            .map_err(storage("failed to collect search results"))?;

        let mut ranked = Vec::new();
        for batch in &batches {
            ranked.extend(ranked_rows(batch)?);
        }
        ranked.sort_by(|a, b| a.1.distance.total_cmp(&b.1.distance).then(a.0.cmp(&b.0)));
        Ok(ranked)
    }

    /// Highest stored `seq` plus one.
    async fn load_next_seq(table: &lancedb::Table) -> Result<i64, IndexError> {
        let batches: Vec<RecordBatch> = table
            .query()
            .select(Select::columns(&["seq"]))
            .execute()
            .await
            .map_err(storage("failed to scan sequence numbers"))?
            .try_collect()
            .await
            .map_err(storage("failed to scan sequence numbers"))?;

        let mut max = -1;
        for batch in &batches {
            let seq = int64_column(batch, "seq")?;
            for i in 0..seq.len() {
                max = max.max(seq.value(i));
            }
        }
        Ok(max + 1)
    }

    fn build_record_batch(&self, item: &IndexedItem, seq: i64) -> Result<RecordBatch, IndexError> {
        let dimension = i32::try_from(self.dimension)
            .map_err(|_| IndexError::InvalidArgument(format!("dimension {} is too large", self.dimension)))?;
        let meta = &item.metadata;
        let to_i32 = |value: u32, name: &str| {
            i32::try_from(value).map_err(|_| IndexError::InvalidArgument(format!("{name} {value} out of range")))
        };

        let values = Float32Array::from(item.vector.clone());
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector = FixedSizeListArray::new(field, dimension, Arc::new(values), None);

        RecordBatch::try_new(
            Arc::new(chunks_schema(dimension)),
            vec![
                Arc::new(StringArray::from(vec![uuid::Uuid::now_v7().to_string()])),
                Arc::new(Int64Array::from(vec![seq])),
                Arc::new(StringArray::from(vec![meta.file_path.clone()])),
                Arc::new(StringArray::from(vec![meta.language_id.clone()])),
                Arc::new(Int32Array::from(vec![to_i32(meta.chunk_index, "chunk_index")?])),
                Arc::new(Int32Array::from(vec![to_i32(meta.line_count, "line_count")?])),
                Arc::new(StringArray::from(vec![meta.content_hash.clone()])),
                Arc::new(StringArray::from(vec![meta.text.clone()])),
                Arc::new(StringArray::from(vec![self.embedding_model.clone()])),
                Arc::new(vector),
            ],
        )
        .map_err(|e| IndexError::Storage(format!("failed to build record batch: {e}")))
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T, IndexError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| IndexError::Storage(format!("chunk table column '{name}' missing or mistyped")))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, IndexError> {
    column::<StringArray>(batch, name)
}

fn int64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array, IndexError> {
    column::<Int64Array>(batch, name)
}

/// Ranked rows of a vector search, with their sequence numbers.
fn ranked_rows(batch: &RecordBatch) -> Result<Vec<(i64, RankedResult)>, IndexError> {
    if batch.num_rows() == 0 {
        return Ok(Vec::new());
    }
    let seq = int64_column(batch, "seq")?;
    let file_path = string_column(batch, "file_path")?;
    let language_id = string_column(batch, "language_id")?;
    let chunk_index = column::<Int32Array>(batch, "chunk_index")?;
    let line_count = column::<Int32Array>(batch, "line_count")?;
    let content_hash = string_column(batch, "content_hash")?;
    let text = string_column(batch, "text")?;
    let distance = column::<Float32Array>(batch, "_distance")?;

    Ok((0..batch.num_rows())
        .map(|i| {
            let metadata = ChunkMetadata {
                text: text.value(i).to_string(),
                file_path: file_path.value(i).to_string(),
                language_id: language_id.value(i).to_string(),
                chunk_index: u32::try_from(chunk_index.value(i)).unwrap_or_default(),
                line_count: u32::try_from(line_count.value(i)).unwrap_or_default(),
                content_hash: content_hash.value(i).to_string(),
            };
            (
                seq.value(i),
                RankedResult {
                    metadata,
                    distance: distance.value(i),
                },
            )
        })
        .collect())
}

impl VectorIndex for LanceVectorIndex {
    async fn ensure_created(&self) -> Result<(), IndexError> {
        self.ensure_table().await.map(|_| ())
    }

    async fn exists(&self) -> Result<bool, IndexError> {
        let names = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(storage("failed to list tables"))?;
        Ok(names.iter().any(|name| name == CHUNKS_TABLE))
    }

    async fn insert(&self, item: &IndexedItem) -> Result<(), IndexError> {
        check_dimension(self.dimension, &item.vector)?;
        let table = self.ensure_table().await?;

        let mut next_seq = self.next_seq.lock().await;
        let seq = match *next_seq {
            Some(seq) => seq,
            None => Self::load_next_seq(&table).await?,
        };

        let batch = self.build_record_batch(item, seq)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(storage("failed to insert chunk"))?;

        *next_seq = Some(seq + 1);
        Ok(())
    }

    async fn delete_file(&self, file_path: &str) -> Result<usize, IndexError> {
        let Some(table) = self.table().await? else {
            return Ok(0);
        };
        let filter = format!("file_path = {}", quoted(file_path));

        let matching = table
            .count_rows(Some(filter.clone()))
            .await
            .map_err(storage("failed to count chunks"))?;
        if matching == 0 {
            return Ok(0);
        }
        table
            .delete(&filter)
            .await
            .map_err(storage("failed to delete chunks"))?;
        debug!(file_path, removed = matching, "evicted file from index");
        Ok(matching)
    }

    async fn file_hash(&self, file_path: &str) -> Result<Option<String>, IndexError> {
        let Some(table) = self.table().await? else {
            return Ok(None);
        };
        let batches: Vec<RecordBatch> = table
            .query()
            .only_if(format!("file_path = {}", quoted(file_path)))
            .select(Select::columns(&["content_hash"]))
            .limit(1)
            .execute()
            .await
            .map_err(storage("failed to look up file"))?
            .try_collect()
            .await
            .map_err(storage("failed to look up file"))?;

        for batch in &batches {
            if batch.num_rows() > 0 {
                return Ok(Some(string_column(batch, "content_hash")?.value(0).to_string()));
            }
        }
        Ok(None)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RankedResult>, IndexError> {
        if top_k == 0 {
            return Err(IndexError::InvalidArgument("top_k must be at least 1".to_string()));
        }
        let Some(table) = self.table().await? else {
            return Err(IndexError::NotFound);
        };
        // The table may predate a change of embedder; check against what is stored.
        check_dimension(Self::table_dimension(&table).await?, vector)?;

        let mut limit = top_k + TIE_SLACK;
        loop {
            let mut ranked = Self::nearest(&table, vector, limit).await?;
            // Every row tied with the last kept one must be in hand before
            // insertion order can decide between them.
            let tie_group_open = ranked.len() == limit
                && match (ranked.get(top_k - 1), ranked.last()) {
                    (Some(cutoff), Some(last)) => last.1.distance <= cutoff.1.distance,
                    _ => false,
                };
            if !tie_group_open {
                ranked.truncate(top_k);
                return Ok(ranked.into_iter().map(|(_, result)| result).collect());
            }
            debug!(limit, "distance tie at the cut-off, widening search");
            limit *= 2;
        }
    }

    async fn delete_index(&self) -> Result<(), IndexError> {
        let mut next_seq = self.next_seq.lock().await;
        match self.db.drop_table(CHUNKS_TABLE, &[]).await {
            Ok(()) | Err(lancedb::Error::TableNotFound { .. }) => {}
            Err(e) => return Err(storage("failed to drop chunk table")(e)),
        }
        *next_seq = None;
        info!(path = %self.path.display(), "deleted repository index");
        Ok(())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        match self.table().await? {
            Some(table) => table
                .count_rows(None)
                .await
                .map_err(storage("failed to count chunks")),
            None => Ok(0),
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
