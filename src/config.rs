//! Engine and catalog configuration files.

use crate::index::HnswParams;
use crate::types::{EngineError, FaqEntry, IngestMode, MergePolicy, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The FAQ catalog file, in the external JSON format
/// (`average_questions`, `faqs`, each with `matched_questions`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaqConfig {
    /// Merge hits of the same entry instead of reporting each question hit.
    #[serde(default)]
    pub average_questions: bool,

    #[serde(default)]
    pub faqs: Vec<FaqEntry>,
}

impl FaqConfig {
    /// Load a catalog file.
    ///
    /// A missing file yields the empty default; malformed JSON is a
    /// `Config` error naming the path.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            EngineError::Config(format!("invalid catalog file {}: {}", path.display(), e))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Which encoder backs the embedding cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EncoderConfig {
    /// Deterministic offline token-hashing encoder.
    Hashing {
        #[serde(default = "default_hashing_dim")]
        dim: usize,
    },
    /// Remote HTTP embedding service.
    Remote { url: String, model: String, dim: usize },
}

fn default_hashing_dim() -> usize {
    crate::embeddings::hashing::DEFAULT_DIM
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::Hashing {
            dim: default_hashing_dim(),
        }
    }
}

/// Engine settings, loaded from a JSON file with defaults for anything
/// absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Index answers instead of questions.
    pub answer_keyed: bool,

    pub merge_policy: MergePolicy,

    pub encoder: EncoderConfig,

    /// Embedding cache directory; `None` keeps the cache in memory.
    /// Supports `~` and `$VAR` expansion.
    pub cache_path: Option<String>,

    pub hnsw: HnswParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            answer_keyed: false,
            merge_policy: MergePolicy::default(),
            encoder: EncoderConfig::default(),
            cache_path: None,
            hnsw: HnswParams::default(),
        }
    }
}

impl EngineConfig {
    /// Load engine settings; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            EngineError::Config(format!("invalid engine config {}: {}", path.display(), e))
        })
    }

    pub fn ingest_mode(&self) -> IngestMode {
        if self.answer_keyed {
            IngestMode::AnswerKeyed
        } else {
            IngestMode::QuestionKeyed
        }
    }

    /// Cache directory with `~`/`$VAR` expanded, if one is configured.
    pub fn expanded_cache_path(&self) -> Result<Option<PathBuf>> {
        match &self.cache_path {
            None => Ok(None),
            Some(raw) => {
                let expanded = shellexpand::full(raw)
                    .map_err(|e| EngineError::Config(format!("bad cache path {:?}: {}", raw, e)))?;
                Ok(Some(PathBuf::from(expanded.as_ref())))
            }
        }
    }
}
