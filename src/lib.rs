//! Semantic FAQ search engine.
//!
//! Answers free-text questions by finding the closest entries of a curated
//! FAQ catalog in embedding space. Three pieces do the work:
//!
//! - [`embeddings`]: the `Encoder` boundary plus a content-addressed cache
//!   over RocksDB, so each distinct text is embedded at most once per model.
//! - [`index`]: a from-scratch hierarchical navigable small world graph for
//!   approximate nearest-neighbor search.
//! - [`faq`]: catalog ingestion, query orchestration and answer ranking with
//!   atomic catalog reloads.
//!
//! # Example
//!
//! ```no_run
//! use faq_rocks::embeddings::{EmbeddingCache, HashingEncoder};
//! use faq_rocks::faq::FaqHandler;
//! use faq_rocks::index::HnswParams;
//! use faq_rocks::storage::MemoryStore;
//! use faq_rocks::types::{FaqEntry, IngestMode, MergePolicy};
//! use std::sync::Arc;
//!
//! # async fn run() -> faq_rocks::types::Result<()> {
//! let cache = Arc::new(EmbeddingCache::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(HashingEncoder::default()),
//! ));
//! let handler = FaqHandler::new(cache, HnswParams::default(), true, MergePolicy::Average);
//!
//! handler
//!     .load(
//!         vec![FaqEntry::new(
//!             "Sensors",
//!             "Connect the sensor via USB.",
//!             vec!["how do I connect my sensor".to_string()],
//!         )],
//!         IngestMode::QuestionKeyed,
//!     )
//!     .await?;
//!
//! let _answers = handler.query("sensor connection help", 3).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod embeddings;
pub mod faq;
pub mod index;
pub mod storage;
pub mod types;

pub use config::{EngineConfig, FaqConfig};
pub use faq::FaqHandler;
pub use types::{Answer, EngineError, FaqEntry, IngestMode, MergePolicy, Result};
