
use super::{ChunkMetadata, EmbeddingRecord};
use crate::{RagError, Result};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Vector database handle. One LanceDB table per committed store, named
/// `embeddings_<store_id>`, so dropping a store is a single table drop.
pub struct VectorStore {
    connection: Connection,
}

/// One hit from a similarity search
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk_metadata: ChunkMetadata,
    pub model_id: String,
    /// Cosine similarity in `[-1, 1]`, higher is better
    pub similarity_score: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Open (or create) the vector database rooted at `db_path`.
    #[inline]
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(db_path).map_err(|e| {
            RagError::Database(format!("Failed to create vector database directory: {e}"))
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to connect to LanceDB: {e}")))?;

        Ok(Self { connection })
    }

    fn table_name(store_id: &str) -> String {
        format!("embeddings_{store_id}")
    }

    /// Create the table backing a new store, sized to `vector_dim`.
    #[inline]
    pub async fn create_store(&self, store_id: &str, vector_dim: usize) -> Result<()> {
        let table_name = Self::table_name(store_id);
        info!("Creating vector table {} ({} dims)", table_name, vector_dim);

        let schema = Self::create_schema(vector_dim);
        self.connection
            .create_empty_table(&table_name, schema)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to create vector table: {e}")))?;

        Ok(())
    }

    /// Whether a table exists for `store_id`.
    #[inline]
    pub async fn store_exists(&self, store_id: &str) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list tables: {e}")))?;
        Ok(table_names.contains(&Self::table_name(store_id)))
    }

    async fn open_table(&self, store_id: &str) -> Result<Table> {
        let table_name = Self::table_name(store_id);
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list tables: {e}")))?;

        if !table_names.contains(&table_name) {
            return Err(RagError::StoreNotFound(store_id.to_string()));
        }

        self.connection
            .open_table(&table_name)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to open table: {e}")))
    }

    /// Read the vector dimension a store's table was created with.
    async fn table_vector_dimension(&self, table: &Table) -> Result<usize> {
        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::Database(format!("Failed to get table schema: {e}")))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(usize::try_from(*size).unwrap_or(0));
                }
            }
        }

        Err(RagError::Database(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    fn create_schema(vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    i32::try_from(vector_dim).unwrap_or(i32::MAX),
                ),
                false,
            ),
            Field::new("model_id", DataType::Utf8, false),
            Field::new("chunk_id", DataType::Utf8, false),
            Field::new("document_id", DataType::Utf8, false),
            Field::new("source_path", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("sequence_index", DataType::UInt32, false),
            Field::new("start_offset", DataType::UInt32, false),
            Field::new("end_offset", DataType::UInt32, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Append a batch of embeddings to a store's table. Every vector in the
    /// batch must match the dimension the table was created with.
    #[inline]
    pub async fn store_embeddings_batch(
        &self,
        store_id: &str,
        records: &[EmbeddingRecord],
    ) -> Result<()> {
        if records.is_empty() {
            debug!("No embeddings to store");
            return Ok(());
        }

        let table = self.open_table(store_id).await?;
        let vector_dim = self.table_vector_dimension(&table).await?;

        for record in records {
            if record.vector.len() != vector_dim {
                return Err(RagError::Database(format!(
                    "Embedding dimension mismatch: table expects {}, got {} for chunk {}",
                    vector_dim,
                    record.vector.len(),
                    record.metadata.chunk_id
                )));
            }
        }

        debug!("Storing batch of {} embeddings in store {}", records.len(), store_id);

        let record_batch = Self::create_record_batch(records, vector_dim)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to insert embeddings: {e}")))?;

        Ok(())
    }

    fn create_record_batch(records: &[EmbeddingRecord], vector_dim: usize) -> Result<RecordBatch> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * vector_dim);
        let mut model_ids = Vec::with_capacity(len);
        let mut chunk_ids = Vec::with_capacity(len);
        let mut document_ids = Vec::with_capacity(len);
        let mut source_paths = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut sequence_indices = Vec::with_capacity(len);
        let mut start_offsets = Vec::with_capacity(len);
        let mut end_offsets = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);

        for record in records {
            ids.push(record.id.as_str());
            flat_values.extend_from_slice(&record.vector);
            model_ids.push(record.model_id.as_str());
            chunk_ids.push(record.metadata.chunk_id.as_str());
            document_ids.push(record.metadata.document_id.as_str());
            source_paths.push(record.metadata.source_path.as_str());
            contents.push(record.metadata.content.as_str());
            sequence_indices.push(record.metadata.sequence_index);
            start_offsets.push(record.metadata.start_offset);
            end_offsets.push(record.metadata.end_offset);
            created_ats.push(record.metadata.created_at.as_str());
        }

        let schema = Self::create_schema(vector_dim);

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            i32::try_from(vector_dim).unwrap_or(i32::MAX),
            Arc::new(values_array),
            None,
        )
        .map_err(|e| RagError::Database(format!("Failed to create vector array: {e}")))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(model_ids)),
            Arc::new(StringArray::from(chunk_ids)),
            Arc::new(StringArray::from(document_ids)),
            Arc::new(StringArray::from(source_paths)),
            Arc::new(StringArray::from(contents)),
            Arc::new(UInt32Array::from(sequence_indices)),
            Arc::new(UInt32Array::from(start_offsets)),
            Arc::new(UInt32Array::from(end_offsets)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| RagError::Database(format!("Failed to create record batch: {e}")))
    }

    /// Cosine similarity search over a store's table, at most `limit` hits.
    #[inline]
    pub async fn search(
        &self,
        store_id: &str,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        debug!("Searching store {} with limit {}", store_id, limit);

        let table = self.open_table(store_id).await?;
        let vector_dim = self.table_vector_dimension(&table).await?;
        if query_vector.len() != vector_dim {
            return Err(RagError::Database(format!(
                "Query vector dimension mismatch: table expects {}, got {}",
                vector_dim,
                query_vector.len()
            )));
        }

        let results = table
            .vector_search(query_vector)
            .map_err(|e| RagError::Database(format!("Failed to create vector search: {e}")))?
            .distance_type(DistanceType::Cosine)
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to execute search: {e}")))?;

        Self::parse_search_results_stream(results).await
    }

    async fn parse_search_results_stream(
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Database(format!("Failed to read result stream: {e}")))?
        {
            hits.extend(Self::parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search hits from stream", hits.len());
        Ok(hits)
    }

    fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
        batch
            .column_by_name(name)
            .ok_or_else(|| RagError::Database(format!("Missing {name} column")))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| RagError::Database(format!("Invalid {name} column type")))
    }

    fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
        batch
            .column_by_name(name)
            .ok_or_else(|| RagError::Database(format!("Missing {name} column")))?
            .as_any()
            .downcast_ref::<UInt32Array>()
            .ok_or_else(|| RagError::Database(format!("Invalid {name} column type")))
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchHit>> {
        let num_rows = batch.num_rows();

        let model_ids = Self::string_column(batch, "model_id")?;
        let chunk_ids = Self::string_column(batch, "chunk_id")?;
        let document_ids = Self::string_column(batch, "document_id")?;
        let source_paths = Self::string_column(batch, "source_path")?;
        let contents = Self::string_column(batch, "content")?;
        let sequence_indices = Self::u32_column(batch, "sequence_index")?;
        let start_offsets = Self::u32_column(batch, "start_offset")?;
        let end_offsets = Self::u32_column(batch, "end_offset")?;
        let created_ats = Self::string_column(batch, "created_at")?;

        let distances = batch
            .column_by_name("_distance")
            .ok_or_else(|| RagError::Database("Missing _distance column".to_string()))?
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| RagError::Database("Invalid _distance column type".to_string()))?;

        let mut hits = Vec::with_capacity(num_rows);
        for row in 0..num_rows {
            let chunk_metadata = ChunkMetadata {
                chunk_id: chunk_ids.value(row).to_string(),
                document_id: document_ids.value(row).to_string(),
                source_path: source_paths.value(row).to_string(),
                content: contents.value(row).to_string(),
                sequence_index: sequence_indices.value(row),
                start_offset: start_offsets.value(row),
                end_offset: end_offsets.value(row),
                created_at: created_ats.value(row).to_string(),
            };

            // Cosine distance caps at 2.0, so a null distance scores as the
            // worst possible hit rather than a perfect one.
            let distance = if distances.is_null(row) {
                2.0
            } else {
                distances.value(row)
            };

            // Cosine distance is 1 - cosine similarity, so invert it back.
            let similarity_score = 1.0 - distance;

            hits.push(SearchHit {
                chunk_metadata,
                model_id: model_ids.value(row).to_string(),
                similarity_score,
                distance,
            });
        }

        Ok(hits)
    }

    /// Number of embeddings in a store's table.
    #[inline]
    pub async fn count_embeddings(&self, store_id: &str) -> Result<u64> {
        let table = self.open_table(store_id).await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Database(format!("Failed to count rows: {e}")))?;
        Ok(count as u64)
    }

    /// Drop a store's table. Dropping a store that does not exist is a no-op;
    /// returns whether a table was actually removed.
    #[inline]
    pub async fn delete_store(&self, store_id: &str) -> Result<bool> {
        let table_name = Self::table_name(store_id);
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list tables: {e}")))?;

        if !table_names.contains(&table_name) {
            debug!("Vector table {} already absent", table_name);
            return Ok(false);
        }

        self.connection
            .drop_table(&table_name)
            .await
            .map_err(|e| RagError::Database(format!("Failed to drop table: {e}")))?;

        info!("Dropped vector table {}", table_name);
        Ok(true)
    }
}
