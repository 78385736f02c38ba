//! BoxVectorIndex -- shared, type-erased handle to a VectorIndex.
//!
//! The indexing pipeline, the retriever and the `getContext` tool all hold
//! the same index, so the handle wraps an `Arc` and clones cheaply.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use juno_types::index::{IndexError, IndexedItem, RankedResult};

use super::vector::VectorIndex;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, IndexError>> + Send + 'a>>;

/// Object-safe version of [`VectorIndex`] with boxed futures.
pub trait VectorIndexDyn: Send + Sync {
    fn ensure_created_boxed(&self) -> BoxFuture<'_, ()>;

    fn exists_boxed(&self) -> BoxFuture<'_, bool>;

    fn insert_boxed<'a>(&'a self, item: &'a IndexedItem) -> BoxFuture<'a, ()>;

    fn delete_file_boxed<'a>(&'a self, file_path: &'a str) -> BoxFuture<'a, usize>;

    fn file_hash_boxed<'a>(&'a self, file_path: &'a str) -> BoxFuture<'a, Option<String>>;

    fn query_boxed<'a>(&'a self, vector: &'a [f32], top_k: usize)
    -> BoxFuture<'a, Vec<RankedResult>>;

    fn delete_index_boxed(&self) -> BoxFuture<'_, ()>;

    fn count_boxed(&self) -> BoxFuture<'_, usize>;

    fn dimension_dyn(&self) -> usize;
}

impl<T: VectorIndex> VectorIndexDyn for T {
    fn ensure_created_boxed(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.ensure_created())
    }

    fn exists_boxed(&self) -> BoxFuture<'_, bool> {
        Box::pin(self.exists())
    }

    fn insert_boxed<'a>(&'a self, item: &'a IndexedItem) -> BoxFuture<'a, ()> {
        Box::pin(self.insert(item))
    }

    fn delete_file_boxed<'a>(&'a self, file_path: &'a str) -> BoxFuture<'a, usize> {
        Box::pin(self.delete_file(file_path))
    }

    fn file_hash_boxed<'a>(&'a self, file_path: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(self.file_hash(file_path))
    }

    fn query_boxed<'a>(
        &'a self,
        vector: &'a [f32],
        top_k: usize,
    ) -> BoxFuture<'a, Vec<RankedResult>> {
        Box::pin(self.query(vector, top_k))
    }

    fn delete_index_boxed(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.delete_index())
    }

    fn count_boxed(&self) -> BoxFuture<'_, usize> {
        Box::pin(self.count())
    }

    fn dimension_dyn(&self) -> usize {
        self.dimension()
    }
}

/// Type-erased vector index.
#[derive(Clone)]
pub struct BoxVectorIndex {
    inner: Arc<dyn VectorIndexDyn>,
}

impl BoxVectorIndex {
    pub fn new<T: VectorIndex + 'static>(index: T) -> Self {
        Self {
            inner: Arc::new(index),
        }
    }

    pub async fn ensure_created(&self) -> Result<(), IndexError> {
        self.inner.ensure_created_boxed().await
    }

    pub async fn exists(&self) -> Result<bool, IndexError> {
        self.inner.exists_boxed().await
    }

    pub async fn insert(&self, item: &IndexedItem) -> Result<(), IndexError> {
        self.inner.insert_boxed(item).await
    }

    pub async fn delete_file(&self, file_path: &str) -> Result<usize, IndexError> {
        self.inner.delete_file_boxed(file_path).await
    }

    pub async fn file_hash(&self, file_path: &str) -> Result<Option<String>, IndexError> {
        self.inner.file_hash_boxed(file_path).await
    }

    pub async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RankedResult>, IndexError> {
        self.inner.query_boxed(vector, top_k).await
    }

    pub async fn delete_index(&self) -> Result<(), IndexError> {
        self.inner.delete_index_boxed().await
    }

    pub async fn count(&self) -> Result<usize, IndexError> {
        self.inner.count_boxed().await
    }

    pub fn dimension(&self) -> usize {
        self.inner.dimension_dyn()
    }
}

impl std::fmt::Debug for BoxVectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxVectorIndex")
            .field("dimension", &self.inner.dimension_dyn())
            .finish()
    }
}
