//! Core types and errors.

pub mod error;
pub mod faq;

pub use error::{EngineError, Result};
pub use faq::{Answer, FaqEntry, IngestMode, MergePolicy};
