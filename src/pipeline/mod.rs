//! Pipeline stages for one analysis job.
//!
//! Each submodule implements exactly one step and returns
//! `Result<_, JobError>`; [`crate::job::AnalysisJob`] composes them and turns
//! the first error into a FAILED envelope.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ render ──▶ encode ──▶ request ──▶ invoke ──▶ persist
//! (store)   (pdfium)   (base64)   (JSON body)  (model)   (envelope)
//! ```
//!
//! 1. [`fetch`]   — read the PDF bytes from object storage; empty is an error
//! 2. [`render`]  — rasterise every page at the configured DPI; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]  — PNG-encode and base64-wrap each page
//! 4. [`request`] — one user message: instruction text, then every page image
//! 5. [`invoke`]  — the only stage that talks to the model
//! 6. [`persist`] — write the result envelope to its deterministic key

pub mod encode;
pub mod fetch;
pub mod invoke;
pub mod persist;
pub mod render;
pub mod request;
