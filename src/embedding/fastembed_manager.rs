use super::EmbeddingProvider;
use anyhow::{Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::Path;
use std::sync::Mutex;

/// Models selectable by name: (accepted names, model, dimension)
const SUPPORTED_MODELS: &[(&[&str], EmbeddingModel, usize)] = &[
    (
        &["all-MiniLM-L6-v2", "sentence-transformers/all-MiniLM-L6-v2"],
        EmbeddingModel::AllMiniLML6V2,
        384,
    ),
    (
        &["all-MiniLM-L12-v2", "sentence-transformers/all-MiniLM-L12-v2"],
        EmbeddingModel::AllMiniLML12V2,
        384,
    ),
    (
        &["bge-small-en-v1.5", "BAAI/bge-small-en-v1.5"],
        EmbeddingModel::BGESmallENV15,
        384,
    ),
    (
        &["bge-base-en-v1.5", "BAAI/bge-base-en-v1.5"],
        EmbeddingModel::BGEBaseENV15,
        768,
    ),
];

/// Resolve a configured model name to the fastembed model, its dimension and canonical name
///
/// Aliases and case variants resolve to the same canonical name, which is what gets
/// recorded alongside an index.
pub fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize, &'static str)> {
    SUPPORTED_MODELS
        .iter()
        .find(|(names, _, _)| names.iter().any(|n| n.eq_ignore_ascii_case(name.trim())))
        .map(|(names, model, dimension)| (model.clone(), *dimension, names[0]))
        .with_context(|| {
            let known: Vec<&str> = SUPPORTED_MODELS.iter().map(|(names, _, _)| names[0]).collect();
            format!(
                "Unsupported embedding model '{}'; expected one of: {}",
                name,
                known.join(", ")
            )
        })
}

/// FastEmbed-based local embedding provider
pub struct FastEmbedManager {
    model: Mutex<TextEmbedding>,
    dimension: usize,
    model_name: String,
}

impl FastEmbedManager {
    /// Load a model by name, downloading it into `cache_dir` on first use
    pub fn from_model_name(name: &str, cache_dir: &Path) -> Result<Self> {
        let (model, dimension, canonical) = resolve_model(name)?;
        tracing::info!("Initializing FastEmbed model: {:?}", model);

        std::fs::create_dir_all(cache_dir)
            .with_context(|| format!("Failed to create model cache {:?}", cache_dir))?;

        let options = InitOptions::new(model)
            .with_show_download_progress(false)
            .with_cache_dir(cache_dir.to_path_buf());

        let embedding_model =
            TextEmbedding::try_new(options).context("Failed to initialize FastEmbed model")?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            dimension,
            model_name: canonical.to_string(),
        })
    }

    pub fn from_config(config: &crate::config::EmbeddingConfig) -> Result<Self> {
        Self::from_model_name(&config.model_name, &config.cache_dir)
    }
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut model = self
            .model
            .lock()
            .map_err(|_| anyhow::anyhow!("Embedding model lock poisoned"))?;
        model
            .embed(texts, None)
            .context("Failed to generate embeddings")
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
