//! Triggering a fresh idle-instance analysis
//!
//! The analysis job runs as a Lambda function that writes its document to
//! the object store. Invocation is synchronous; once it returns the caller
//! re-reads the document.

use crate::aws_errors::from_sdk_error;
use crate::error::{CostdashError, Result};
use async_trait::async_trait;
use aws_sdk_lambda::types::InvocationType;
use aws_sdk_lambda::Client as LambdaClient;
use tracing::info;

#[async_trait]
pub trait AnalysisTrigger: Send + Sync {
    /// Run the analysis and return its response payload
    async fn trigger(&self, function_name: &str) -> Result<serde_json::Value>;
}

pub struct LambdaTrigger {
    client: LambdaClient,
}

impl LambdaTrigger {
    pub fn new(aws_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: LambdaClient::new(aws_config),
        }
    }
}

#[async_trait]
impl AnalysisTrigger for LambdaTrigger {
    async fn trigger(&self, function_name: &str) -> Result<serde_json::Value> {
        let function_name = function_name.trim();
        if function_name.is_empty() {
            return Err(CostdashError::validation("function_name", "function name is empty"));
        }

        info!("Invoking {}", function_name);
        let response = self
            .client
            .invoke()
            .function_name(function_name)
            .invocation_type(InvocationType::RequestResponse)
            .send()
            .await
            .map_err(|e| from_sdk_error("Invoke", function_name, e))?;

        let payload = response
            .payload()
            .map(|blob| blob.as_ref().to_vec())
            .unwrap_or_default();

        check_invoke(function_name, response.function_error(), &payload)
    }
}

/// Interpret an invoke response. A function-level error (unhandled
/// exception, timeout inside the function) arrives with a 200 status and is
/// only visible through `function_error`.
fn check_invoke(
    function_name: &str,
    function_error: Option<&str>,
    payload: &[u8],
) -> Result<serde_json::Value> {
    if let Some(function_error) = function_error {
        return Err(CostdashError::Aws {
            operation: "Invoke".to_string(),
            message: format!(
                "{} failed ({}): {}",
                function_name,
                function_error,
                String::from_utf8_lossy(payload)
            ),
        });
    }
    parse_payload(function_name, payload)
}

fn parse_payload(function_name: &str, payload: &[u8]) -> Result<serde_json::Value> {
    if payload.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_slice(payload)
        .map_err(|e| CostdashError::parse(format!("{} response payload", function_name), e))
}
