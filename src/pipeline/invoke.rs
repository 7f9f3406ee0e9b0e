//! Model invocation: send the request body, decode the JSON response.
//!
//! This is a single call with no retry. A caller that wants transient-failure
//! tolerance re-runs the whole job; the envelope path is deterministic, so a
//! re-run overwrites the earlier FAILED record.

use crate::error::JobError;
use crate::pipeline::request::InferenceRequest;
use async_trait::async_trait;
use aws_sdk_bedrockruntime::{error::DisplayErrorContext, primitives::Blob, Client};
use std::time::Instant;
use tracing::{debug, info};

/// A hosted model endpoint that takes a JSON body and returns JSON bytes.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Invoke `model_id` with `body`. Failures are [`JobError::Invocation`].
    async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, JobError>;
}

/// Amazon Bedrock `InvokeModel` client.
#[derive(Debug, Clone)]
pub struct BedrockInferenceClient {
    client: Client,
}

impl BedrockInferenceClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from a loaded AWS config.
    pub fn from_sdk_config(shared: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(shared))
    }
}

#[async_trait]
impl InferenceClient for BedrockInferenceClient {
    async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, JobError> {
        let response = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| JobError::Invocation {
                model_id: model_id.to_string(),
                detail: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(response.body().as_ref().to_vec())
    }
}

/// Serialise `request`, call the model, and decode its response verbatim.
pub async fn invoke(
    client: &dyn InferenceClient,
    model_id: &str,
    request: &InferenceRequest,
) -> Result<serde_json::Value, JobError> {
    let invocation_error = |detail: String| JobError::Invocation {
        model_id: model_id.to_string(),
        detail,
    };

    let body = serde_json::to_vec(request)
        .map_err(|e| invocation_error(format!("cannot serialise request: {e}")))?;
    info!(
        "Calling model {} with {} page images ({} byte request)",
        model_id,
        request.image_count(),
        body.len()
    );

    let start = Instant::now();
    let raw = client.invoke(model_id, body).await?;
    let duration = start.elapsed();

    let response: serde_json::Value = serde_json::from_slice(&raw)
        .map_err(|e| invocation_error(format!("response is not valid JSON: {e}")))?;

    log_usage(&response, duration.as_millis());
    Ok(response)
}

/// Report token counts when the response carries a `usage` object.
fn log_usage(response: &serde_json::Value, elapsed_ms: u128) {
    let usage = response.get("usage");
    let tokens = |field: &str| usage.and_then(|u| u.get(field)).and_then(|v| v.as_u64());
    match (tokens("input_tokens"), tokens("output_tokens")) {
        (Some(input), Some(output)) => info!(
            "Model responded in {}ms: {} input tokens, {} output tokens",
            elapsed_ms, input, output
        ),
        _ => debug!("Model responded in {}ms (no usage reported)", elapsed_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobConfig;
    use crate::pipeline::encode::encode_page;
    use crate::pipeline::request::build_request;
    use serde_json::json;
    use std::sync::Mutex;

    struct Canned {
        reply: Vec<u8>,
        seen: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl InferenceClient for Canned {
        async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, JobError> {
            self.seen.lock().unwrap().push((model_id.to_string(), body));
            Ok(self.reply.clone())
        }
    }

    fn request() -> InferenceRequest {
        build_request(vec![encode_page(0, b"png")], &JobConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn decodes_response_verbatim() {
        let reply = json!({"id": "msg_1", "content": [{"type": "text", "text": "A memo."}],
                           "usage": {"input_tokens": 1500, "output_tokens": 40}});
        let client = Canned {
            reply: serde_json::to_vec(&reply).unwrap(),
            seen: Mutex::new(vec![]),
        };

        let value = invoke(&client, "model-x", &request()).await.unwrap();
        assert_eq!(value, reply);

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "model-x");
        let sent: InferenceRequest = serde_json::from_slice(&seen[0].1).unwrap();
        assert_eq!(sent, request());
    }

    #[tokio::test]
    async fn non_json_response_is_invocation_error() {
        let client = Canned {
            reply: b"<html>502</html>".to_vec(),
            seen: Mutex::new(vec![]),
        };
        let err = invoke(&client, "model-x", &request()).await.unwrap_err();
        assert_eq!(err.kind(), "InvocationError");
        assert!(err.to_string().contains("not valid JSON"), "got: {err}");
    }
}
