//! Instruction text sent to the model ahead of the page images.
//!
//! Callers can override the default via [`crate::config::JobConfig::prompt`];
//! the constant here is used only when no override is provided.

/// Default instruction for whole-document analysis.
pub const DEFAULT_ANALYSIS_PROMPT: &str = "Analyze this document and summarize the content.";
