//! REST client for the workflow engine's HTTP endpoints
//!
//! Wraps job submission (`POST /prompt`), input upload
//! (`POST /upload/image`), history retrieval (`GET /history/{id}`) and
//! output download (`GET /view`). Transport failures surface as
//! [`AppError::EngineUnreachable`]; error statuses and malformed bodies as
//! [`AppError::EngineProtocol`]. There are no retries: any failure is fatal
//! for the request that triggered it.

use crate::error::AppError;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::collections::HashMap;

/// HTTP client for a single workflow engine deployment.
pub struct EngineApi {
    client: reqwest::Client,
    base_url: String,
}

/// Response returned by the engine's `/prompt` endpoint after queuing a job.
#[derive(Debug, Deserialize)]
struct QueueResponse {
    prompt_id: String,
}

/// History record for one or more jobs, keyed by job identifier.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct History(HashMap<String, HistoryEntry>);

/// History record for a single job.
#[derive(Debug, Deserialize)]
pub struct HistoryEntry {
    /// Outputs keyed by the node-id that produced them.
    #[serde(default)]
    pub outputs: HashMap<String, NodeOutput>,
}

/// Output attachments of a single node.
#[derive(Debug, Deserialize)]
pub struct NodeOutput {
    /// Images the node wrote, if any.
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// Reference to one image stored on the engine.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ImageRef {
    /// Stored filename.
    pub filename: String,
    /// Subfolder within the engine's storage, often empty.
    #[serde(default)]
    pub subfolder: String,
    /// Storage area the file lives in (`output`, `input`, `temp`).
    #[serde(rename = "type")]
    pub folder_type: String,
}

impl History {
    /// Extract the image list attached to `node_id` for job `prompt_id`.
    ///
    /// Errors distinctly when the history has no entry for the job or the
    /// entry carries no outputs for the requested node.
    pub fn images_for(&self, prompt_id: &str, node_id: &str) -> Result<&[ImageRef], AppError> {
        let entry = self.0.get(prompt_id).ok_or_else(|| {
            AppError::EngineProtocol(format!("History has no entry for job {prompt_id}"))
        })?;
        let output = entry.outputs.get(node_id).ok_or_else(|| {
            AppError::EngineProtocol(format!(
                "History for job {prompt_id} has no outputs for node {node_id}"
            ))
        })?;
        Ok(&output.images)
    }
}

impl EngineApi {
    /// Create an API client reusing the shared [`reqwest::Client`]
    /// (connection pooling across requests).
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Submit a job description for execution.
    ///
    /// Sends `POST /prompt` with `{"prompt": job, "client_id": client_id}`
    /// and returns the engine-assigned job identifier.
    pub async fn queue_prompt(
        &self,
        job: &serde_json::Value,
        client_id: &str,
    ) -> Result<String, AppError> {
        let body = serde_json::json!({
            "prompt": job,
            "client_id": client_id,
        });

        let response = self
            .client
            .post(format!("{}/prompt", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(unreachable_err)?;
        let response = ensure_success(response).await?;

        let queued: QueueResponse = response.json().await.map_err(|e| {
            AppError::EngineProtocol(format!("Failed to parse /prompt response: {e}"))
        })?;

        tracing::info!(prompt_id = %queued.prompt_id, client_id = %client_id, "Job queued on engine");
        Ok(queued.prompt_id)
    }

    /// Retrieve the history record for a job.
    pub async fn history(&self, prompt_id: &str) -> Result<History, AppError> {
        let response = self
            .client
            .get(format!("{}/history/{}", self.base_url, prompt_id))
            .send()
            .await
            .map_err(unreachable_err)?;
        let response = ensure_success(response).await?;

        response.json().await.map_err(|e| {
            AppError::EngineProtocol(format!("Failed to parse /history response: {e}"))
        })
    }

    /// Download the bytes of one stored image via `GET /view`.
    pub async fn fetch_image(&self, image: &ImageRef) -> Result<Bytes, AppError> {
        let response = self
            .client
            .get(format!("{}/view", self.base_url))
            .query(&[
                ("filename", image.filename.as_str()),
                ("subfolder", image.subfolder.as_str()),
                ("folder_type", image.folder_type.as_str()),
            ])
            .send()
            .await
            .map_err(unreachable_err)?;
        let response = ensure_success(response).await?;

        response
            .bytes()
            .await
            .map_err(|e| AppError::EngineProtocol(format!("Failed to read image body: {e}")))
    }

    /// Upload an input image to the engine's storage.
    ///
    /// Multipart form with the file under field `image` and `overwrite`
    /// forced to `true`, so re-running with the same source URLs replaces
    /// the stored inputs. Returns the engine's opaque confirmation body.
    pub async fn upload_image(
        &self,
        filename: &str,
        data: Vec<u8>,
        mime: &str,
    ) -> Result<String, AppError> {
        let part = Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(mime)
            .map_err(|e| AppError::EngineProtocol(format!("Invalid MIME type {mime}: {e}")))?;
        let form = Form::new().part("image", part).text("overwrite", "true");

        let response = self
            .client
            .post(format!("{}/upload/image", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(unreachable_err)?;
        let response = ensure_success(response).await?;

        let confirmation = response
            .text()
            .await
            .map_err(|e| AppError::EngineProtocol(format!("Failed to read upload response: {e}")))?;
        tracing::debug!(filename = %filename, "Uploaded input image to engine");
        Ok(confirmation)
    }
}

/// Map a transport-level reqwest failure to the engine-unreachable variant.
fn unreachable_err(e: reqwest::Error) -> AppError {
    AppError::EngineUnreachable(e.to_string())
}

/// Ensure the response has a success status code, or surface status + body
/// as a protocol error.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(AppError::EngineProtocol(format!(
            "Engine returned status {}: {}",
            status.as_u16(),
            body
        )));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serial_test::serial;

    fn api(base_url: &str) -> EngineApi {
        EngineApi::new(reqwest::Client::new(), base_url)
    }

    #[tokio::test]
    #[serial]
    async fn queue_prompt_returns_job_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/prompt")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "client_id": "client-1",
                "prompt": {"15": {"inputs": {}}},
            })))
            .with_status(200)
            .with_body(r#"{"prompt_id": "job-42", "number": 3}"#)
            .create_async()
            .await;

        let job = serde_json::json!({"15": {"inputs": {}}});
        let result = api(&server.url()).queue_prompt(&job, "client-1").await;

        mock.assert_async().await;
        assert_eq!(result.unwrap(), "job-42");
    }

    #[tokio::test]
    #[serial]
    async fn queue_prompt_error_status_is_protocol_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/prompt")
            .with_status(400)
            .with_body(r#"{"error": "invalid prompt"}"#)
            .create_async()
            .await;

        let job = serde_json::json!({});
        let err = api(&server.url())
            .queue_prompt(&job, "client-1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EngineProtocol(_)), "got {err:?}");
        assert!(err.to_string().contains("400"));
    }

    #[tokio::test]
    async fn queue_prompt_unreachable_engine() {
        // Nothing listens on this port.
        let err = api("http://127.0.0.1:9")
            .queue_prompt(&serde_json::json!({}), "client-1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EngineUnreachable(_)), "got {err:?}");
    }

    #[tokio::test]
    #[serial]
    async fn history_extracts_output_images() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/history/job-42")
            .with_status(200)
            .with_body(
                r#"{
                    "job-42": {
                        "outputs": {
                            "132": {
                                "images": [
                                    {"filename": "out_1.png", "subfolder": "", "type": "output"},
                                    {"filename": "out_2.png", "subfolder": "batch", "type": "output"}
                                ]
                            }
                        },
                        "status": {"completed": true}
                    }
                }"#,
            )
            .create_async()
            .await;

        let history = api(&server.url()).history("job-42").await.unwrap();
        let images = history.images_for("job-42", "132").unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].filename, "out_1.png");
        assert_eq!(images[1].subfolder, "batch");
        assert_eq!(images[1].folder_type, "output");
    }

    #[tokio::test]
    #[serial]
    async fn history_missing_entry_and_node_are_distinct_protocol_errors() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/history/job-42")
            .with_status(200)
            .with_body(r#"{"job-42": {"outputs": {}}}"#)
            .create_async()
            .await;

        let history = api(&server.url()).history("job-42").await.unwrap();

        let err = history.images_for("other-job", "132").unwrap_err();
        assert!(err.to_string().contains("no entry for job other-job"));

        let err = history.images_for("job-42", "132").unwrap_err();
        assert!(err.to_string().contains("no outputs for node 132"));
    }

    #[tokio::test]
    #[serial]
    async fn fetch_image_sends_storage_coordinates() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/view")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("filename".into(), "out_1.png".into()),
                Matcher::UrlEncoded("subfolder".into(), "".into()),
                Matcher::UrlEncoded("folder_type".into(), "output".into()),
            ]))
            .with_status(200)
            .with_body(&b"\x89PNG\r\n"[..])
            .create_async()
            .await;

        let image = ImageRef {
            filename: "out_1.png".to_string(),
            subfolder: String::new(),
            folder_type: "output".to_string(),
        };
        let bytes = api(&server.url()).fetch_image(&image).await.unwrap();

        mock.assert_async().await;
        assert_eq!(bytes.as_ref(), b"\x89PNG\r\n");
    }

    #[tokio::test]
    #[serial]
    async fn upload_image_posts_multipart_with_overwrite() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/image")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data.*".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="image"; filename="subject.jpg""#.to_string()),
                Matcher::Regex(r#"name="overwrite""#.to_string()),
                Matcher::Regex("true".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"name": "subject.jpg", "type": "input"}"#)
            .create_async()
            .await;

        let confirmation = api(&server.url())
            .upload_image("subject.jpg", b"fake jpeg data".to_vec(), "image/jpeg")
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(confirmation.contains("subject.jpg"));
    }

    #[tokio::test]
    #[serial]
    async fn upload_image_error_status_is_protocol_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/upload/image")
            .with_status(500)
            .with_body("disk full")
            .create_async()
            .await;

        let err = api(&server.url())
            .upload_image("subject.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EngineProtocol(_)), "got {err:?}");
        assert!(err.to_string().contains("disk full"));
    }
}
