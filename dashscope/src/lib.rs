//! Minimal DashScope text-to-image synthesis client.
//!
//! This crate provides a focused client for the image-synthesis service:
//! - Submitting generation requests (synchronous or async-task responses)
//! - Querying the status of async generation tasks
//! - Typed errors for network, API, and parse failures
//!
//! The service may answer a submission either with finished image URLs or
//! with a task id that must be polled until it reports `SUCCEEDED` or
//! `FAILED`. Polling cadence is the caller's concern.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_BASE: &str = "https://dashscope.aliyuncs.com/api/v1";
const DEFAULT_MODEL: &str = "wanx-v1";
const DEFAULT_SIZE: &str = "1024*1024";

/// Errors that can occur when using the DashScope client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// DashScope API client.
#[derive(Clone)]
pub struct Dashscope {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl Dashscope {
    /// Create a new DashScope client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create a DashScope client from the DASHSCOPE_API_KEY environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("DASHSCOPE_API_KEY").map_err(|_| Error::NoApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Set the generation model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Submit an image-synthesis request.
    ///
    /// Returns finished URLs when the service answers synchronously, or a
    /// task id to poll via [`Dashscope::task_status`].
    pub async fn submit(&self, request: ImageRequest) -> Result<Submission, Error> {
        let api_request = self.build_api_request(&request);
        let headers = self.build_headers(true)?;

        let response = self
            .client
            .post(format!(
                "{API_BASE}/services/aigc/text2image/image-synthesis"
            ))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiSubmitResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        parse_submission(api_response)
    }

    /// Query the status of an async generation task.
    pub async fn task_status(&self, task_id: &str) -> Result<TaskStatus, Error> {
        let headers = self.build_headers(false)?;

        let response = self
            .client
            .get(format!("{API_BASE}/tasks/{task_id}"))
            .headers(headers)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiTaskResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(parse_task_status(api_response))
    }

    fn build_headers(&self, asynchronous: bool) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        if asynchronous {
            headers.insert("X-DashScope-Async", HeaderValue::from_static("enable"));
        }
        Ok(headers)
    }

    fn build_api_request(&self, request: &ImageRequest) -> ApiSubmitRequest {
        ApiSubmitRequest {
            model: self.model.clone(),
            input: ApiInput {
                prompt: request.prompt.clone(),
                negative_prompt: request.negative_prompt.clone(),
                size: request.size.clone(),
                n: request.count,
                seed: request.seed,
                style: request.style.clone(),
            },
            parameters: ApiParameters {
                size: request.size.clone(),
                n: request.count,
            },
        }
    }
}

fn parse_submission(response: ApiSubmitResponse) -> Result<Submission, Error> {
    let output = response
        .output
        .ok_or_else(|| Error::Parse("response contained no output".to_string()))?;

    if let Some(task_id) = output.task_id {
        return Ok(Submission::Accepted { task_id });
    }

    let urls: Vec<String> = output
        .results
        .unwrap_or_default()
        .into_iter()
        .filter_map(|r| r.url)
        .collect();

    if urls.is_empty() {
        return Err(Error::Parse(
            "response contained neither task id nor results".to_string(),
        ));
    }

    Ok(Submission::Completed { urls })
}

fn parse_task_status(response: ApiTaskResponse) -> TaskStatus {
    let Some(output) = response.output else {
        return TaskStatus::Pending;
    };

    match output.task_status.as_deref() {
        Some("SUCCEEDED") => {
            let urls: Vec<String> = output
                .results
                .unwrap_or_default()
                .into_iter()
                .filter_map(|r| r.url)
                .collect();
            TaskStatus::Succeeded { urls }
        }
        Some("FAILED") => TaskStatus::Failed {
            message: output
                .message
                .unwrap_or_else(|| "generation task failed".to_string()),
        },
        _ => TaskStatus::Pending,
    }
}

// ============================================================================
// Public types
// ============================================================================

/// An image-synthesis request.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub size: String,
    pub count: usize,
    pub seed: Option<u64>,
    pub style: Option<String>,
}

impl ImageRequest {
    /// Create a request for one image of the default size.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: None,
            size: DEFAULT_SIZE.to_string(),
            count: 1,
            seed: None,
            style: None,
        }
    }

    pub fn with_negative_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(prompt.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }
}

/// Outcome of a submission.
#[derive(Debug, Clone)]
pub enum Submission {
    /// The service answered with finished image URLs.
    Completed { urls: Vec<String> },
    /// The service accepted an async task; poll for its status.
    Accepted { task_id: String },
}

/// Status of an async generation task.
#[derive(Debug, Clone)]
pub enum TaskStatus {
    Succeeded { urls: Vec<String> },
    Failed { message: String },
    Pending,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiSubmitRequest {
    model: String,
    input: ApiInput,
    parameters: ApiParameters,
}

#[derive(Debug, Serialize)]
struct ApiInput {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<String>,
    size: String,
    n: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiParameters {
    size: String,
    n: usize,
}

#[derive(Debug, Deserialize)]
struct ApiSubmitResponse {
    output: Option<ApiOutput>,
}

#[derive(Debug, Deserialize)]
struct ApiTaskResponse {
    output: Option<ApiOutput>,
}

#[derive(Debug, Deserialize)]
struct ApiOutput {
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    task_status: Option<String>,
    #[serde(default)]
    results: Option<Vec<ApiResult>>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    #[serde(default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Dashscope::new("test-key");
        assert_eq!(client.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_request_builder() {
        let request = ImageRequest::new("a friendly rabbit")
            .with_negative_prompt("scary, dark")
            .with_seed(42)
            .with_style("<cartoon>");

        assert_eq!(request.prompt, "a friendly rabbit");
        assert_eq!(request.negative_prompt.as_deref(), Some("scary, dark"));
        assert_eq!(request.size, DEFAULT_SIZE);
        assert_eq!(request.count, 1);
        assert_eq!(request.seed, Some(42));
    }

    #[test]
    fn test_parse_async_submission() {
        let api: ApiSubmitResponse =
            serde_json::from_str(r#"{"output": {"task_id": "task-123"}}"#).unwrap();

        match parse_submission(api).unwrap() {
            Submission::Accepted { task_id } => assert_eq!(task_id, "task-123"),
            other => panic!("expected Accepted, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_sync_submission() {
        let api: ApiSubmitResponse = serde_json::from_str(
            r#"{"output": {"results": [{"url": "https://img.example/1.png"}]}}"#,
        )
        .unwrap();

        match parse_submission(api).unwrap() {
            Submission::Completed { urls } => {
                assert_eq!(urls, vec!["https://img.example/1.png"]);
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_empty_submission() {
        let api: ApiSubmitResponse = serde_json::from_str(r#"{"output": {}}"#).unwrap();
        assert!(matches!(parse_submission(api), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_task_states() {
        let succeeded: ApiTaskResponse = serde_json::from_str(
            r#"{"output": {"task_status": "SUCCEEDED", "results": [{"url": "https://img.example/2.png"}]}}"#,
        )
        .unwrap();
        assert!(matches!(
            parse_task_status(succeeded),
            TaskStatus::Succeeded { urls } if urls.len() == 1
        ));

        let failed: ApiTaskResponse = serde_json::from_str(
            r#"{"output": {"task_status": "FAILED", "message": "content policy"}}"#,
        )
        .unwrap();
        assert!(matches!(
            parse_task_status(failed),
            TaskStatus::Failed { message } if message == "content policy"
        ));

        let pending: ApiTaskResponse =
            serde_json::from_str(r#"{"output": {"task_status": "RUNNING"}}"#).unwrap();
        assert!(matches!(parse_task_status(pending), TaskStatus::Pending));
    }
}
