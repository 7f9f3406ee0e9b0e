//! Request construction: one user turn holding the instruction and every page.
//!
//! ## Message Layout
//!
//! ```json
//! {
//!   "anthropic_version": "bedrock-2023-05-31",
//!   "max_tokens": 2048,
//!   "messages": [{
//!     "role": "user",
//!     "content": [
//!       {"type": "text", "text": "Analyze this document and summarize the content."},
//!       {"type": "image", "source": {"type": "base64", "media_type": "image/png", "data": "..."}},
//!       ...
//!     ]
//!   }]
//! }
//! ```
//!
//! The instruction always comes first, then the pages in document order. The
//! model reads the images as a sequence, so the order carries meaning.

use crate::config::JobConfig;
use crate::error::JobError;
use crate::pipeline::encode::PageImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Protocol marker required by Anthropic models on Bedrock.
pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// The full request body sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub anthropic_version: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImageSource {
    Base64 { media_type: String, data: String },
}

impl InferenceRequest {
    /// Number of image segments across all messages.
    pub fn image_count(&self) -> usize {
        self.images().count()
    }

    /// Base64 payloads of the image segments, in request order.
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|block| match block {
                ContentBlock::Image {
                    source: ImageSource::Base64 { data, .. },
                } => Some(data.as_str()),
                ContentBlock::Text { .. } => None,
            })
    }
}

/// Build the request for `pages`.
///
/// Fails with [`JobError::RequestBuild`] when `pages` is empty: a model call
/// with no visual content is never issued.
pub fn build_request(pages: Vec<PageImage>, config: &JobConfig) -> Result<InferenceRequest, JobError> {
    if pages.is_empty() {
        return Err(JobError::RequestBuild(
            "no page images to analyse (the PDF has no pages)".into(),
        ));
    }

    let mut content = Vec::with_capacity(pages.len() + 1);
    content.push(ContentBlock::Text {
        text: config.prompt_text().to_string(),
    });
    content.extend(pages.into_iter().map(|page| ContentBlock::Image {
        source: ImageSource::Base64 {
            media_type: page.media_type.to_string(),
            data: page.data,
        },
    }));
    debug!("Built request with {} image segments", content.len() - 1);

    Ok(InferenceRequest {
        anthropic_version: ANTHROPIC_VERSION.to_string(),
        max_tokens: config.max_tokens,
        messages: vec![Message {
            role: Role::User,
            content,
        }],
    })
}
