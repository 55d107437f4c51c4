//! LanceDB vector database client
//!
//! Each repository gets its own database directory holding a single `chunks` table.
//! A rebuild drops the table and creates it again from the new rows, so a table
//! never mixes chunks from two commits.

use crate::types::{ChunkMetadata, SearchResult};
use crate::vector_db::VectorDatabase;
use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array, types::Float32Type,
};
use arrow_schema::{DataType, Field, Schema};
use futures::stream::TryStreamExt;
use lancedb::Table;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::path::Path;
use std::sync::Arc;

/// Name of the table holding chunk rows
pub const TABLE_NAME: &str = "chunks";

/// LanceDB vector database implementation (embedded, no server required)
pub struct LanceVectorDB {
    connection: Connection,
    table_name: String,
    db_path: String,
}

impl LanceVectorDB {
    /// Connect to (or create) the database at `db_path`
    pub async fn with_path(db_path: &Path) -> Result<Self> {
        let db_path = db_path.to_string_lossy().to_string();
        tracing::debug!("Connecting to LanceDB at: {}", db_path);

        let connection = lancedb::connect(&db_path)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        Ok(Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            db_path,
        })
    }

    /// Whether the chunk table exists
    pub async fn table_exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .context("Failed to list tables")?;
        Ok(table_names.contains(&self.table_name))
    }

    /// Create schema for the chunk table
    fn create_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("id", DataType::Utf8, false),
            Field::new("file_path", DataType::Utf8, false),
            Field::new("start_line", DataType::UInt32, false),
            Field::new("end_line", DataType::UInt32, false),
            Field::new("language", DataType::Utf8, false),
            Field::new("extension", DataType::Utf8, false),
            Field::new("file_hash", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
        ]))
    }

    async fn get_table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .context("Failed to open table")
    }

    /// Convert embeddings and metadata to RecordBatch
    fn create_record_batch(
        embeddings: Vec<Vec<f32>>,
        metadata: &[ChunkMetadata],
        contents: &[String],
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        let dimension = embeddings.first().map(Vec::len).unwrap_or_default();
        if let Some(bad) = embeddings.iter().position(|v| v.len() != dimension) {
            anyhow::bail!(
                "Embedding {} has dimension {}, expected {}",
                bad,
                embeddings[bad].len(),
                dimension
            );
        }

        let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            embeddings
                .into_iter()
                .map(|v| Some(v.into_iter().map(Some))),
            dimension as i32,
        );

        let id_array = StringArray::from(
            metadata
                .iter()
                .map(|m| format!("{}:{}", m.file_path, m.start_line))
                .collect::<Vec<_>>(),
        );
        let file_path_array = StringArray::from(
            metadata
                .iter()
                .map(|m| m.file_path.as_str())
                .collect::<Vec<_>>(),
        );
        let start_line_array = UInt32Array::from(
            metadata
                .iter()
                .map(|m| m.start_line as u32)
                .collect::<Vec<_>>(),
        );
        let end_line_array = UInt32Array::from(
            metadata
                .iter()
                .map(|m| m.end_line as u32)
                .collect::<Vec<_>>(),
        );
        let language_array = StringArray::from(
            metadata
                .iter()
                .map(|m| m.language.as_deref().unwrap_or("Unknown"))
                .collect::<Vec<_>>(),
        );
        let extension_array = StringArray::from(
            metadata
                .iter()
                .map(|m| m.extension.as_deref().unwrap_or(""))
                .collect::<Vec<_>>(),
        );
        let file_hash_array = StringArray::from(
            metadata
                .iter()
                .map(|m| m.file_hash.as_str())
                .collect::<Vec<_>>(),
        );
        let content_array =
            StringArray::from(contents.iter().map(|s| s.as_str()).collect::<Vec<_>>());

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(vector_array),
                Arc::new(id_array),
                Arc::new(file_path_array),
                Arc::new(start_line_array),
                Arc::new(end_line_array),
                Arc::new(language_array),
                Arc::new(extension_array),
                Arc::new(file_hash_array),
                Arc::new(content_array),
            ],
        )
        .context("Failed to create RecordBatch")
    }

    /// Convert search result batches into [`SearchResult`]s
    fn parse_results(batches: &[RecordBatch], min_score: f32) -> Result<Vec<SearchResult>> {
        let mut search_results = Vec::new();

        for batch in batches {
            let file_path_array = string_column(batch, "file_path")?;
            let language_array = string_column(batch, "language")?;
            let content_array = string_column(batch, "content")?;
            let start_line_array = batch
                .column_by_name("start_line")
                .context("Missing start_line column")?
                .as_any()
                .downcast_ref::<UInt32Array>()
                .context("Invalid start_line type")?;
            let end_line_array = batch
                .column_by_name("end_line")
                .context("Missing end_line column")?
                .as_any()
                .downcast_ref::<UInt32Array>()
                .context("Invalid end_line type")?;
            let distance_array = batch
                .column_by_name("_distance")
                .context("Missing _distance column")?
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("Invalid _distance type")?;

            for i in 0..batch.num_rows() {
                let distance = distance_array.value(i);
                let score = 1.0 / (1.0 + distance);

                if score < min_score {
                    continue;
                }

                search_results.push(SearchResult {
                    file_path: file_path_array.value(i).to_string(),
                    content: content_array.value(i).to_string(),
                    score,
                    start_line: start_line_array.value(i) as usize,
                    end_line: end_line_array.value(i) as usize,
                    language: language_array.value(i).to_string(),
                });
            }
        }

        search_results.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(search_results)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Missing {} column", name))?
        .as_any()
        .downcast_ref::<StringArray>()
        .with_context(|| format!("Invalid {} type", name))
}

#[async_trait::async_trait]
impl VectorDatabase for LanceVectorDB {
    async fn replace_all(
        &self,
        embeddings: Vec<Vec<f32>>,
        metadata: Vec<ChunkMetadata>,
        contents: Vec<String>,
    ) -> Result<usize> {
        if embeddings.is_empty() {
            anyhow::bail!("Refusing to create an empty chunk table");
        }
        if embeddings.len() != metadata.len() || embeddings.len() != contents.len() {
            anyhow::bail!(
                "Mismatched input lengths: {} embeddings, {} metadata, {} contents",
                embeddings.len(),
                metadata.len(),
                contents.len()
            );
        }

        if self.table_exists().await? {
            tracing::debug!("Dropping existing table '{}'", self.table_name);
            self.connection
                .drop_table(&self.table_name, &[])
                .await
                .context("Failed to drop table")?;
        }

        let schema = Self::create_schema(embeddings[0].len());
        let batch = Self::create_record_batch(embeddings, &metadata, &contents, schema.clone())?;
        let count = batch.num_rows();

        let batches = RecordBatchIterator::new(vec![batch].into_iter().map(Ok), schema);

        self.connection
            .create_table(&self.table_name, Box::new(batches))
            .execute()
            .await
            .context("Failed to create table")?;

        tracing::info!("Stored {} chunks in {}", count, self.db_path);
        Ok(count)
    }

    async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let table = self.get_table().await?;

        let stream = table
            .vector_search(query_vector)
            .context("Failed to create vector search")?
            .limit(limit)
            .execute()
            .await
            .context("Failed to execute search")?;

        let results: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .context("Failed to collect search results")?;

        Self::parse_results(&results, min_score)
    }

    async fn count(&self) -> Result<usize> {
        let table = self.get_table().await?;
        let rows = table
            .count_rows(None)
            .await
            .context("Failed to count rows")?;
        Ok(rows)
    }
}
