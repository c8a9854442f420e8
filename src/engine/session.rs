//! Per-request WebSocket session and the submit/wait/fetch routine
//!
//! Every try-on request opens its own progress socket with a fresh client
//! identifier, so concurrent requests never observe each other's frames.
//! The completion wait is bounded by the configured deadline instead of
//! blocking forever on a silent engine.

use crate::engine::api::{EngineApi, ImageRef};
use crate::engine::messages::{parse_frame, EngineMessage};
use crate::error::AppError;
use bytes::Bytes;
use futures_util::StreamExt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

/// A live progress-channel connection scoped to one request.
pub struct EngineSession {
    client_id: String,
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl EngineSession {
    /// Open the progress channel at `{ws_base_url}/ws?clientId={id}`.
    ///
    /// The client identifier is a fresh UUID v4 per session, so the engine
    /// only routes this request's frames onto this socket.
    pub async fn connect(ws_base_url: &str) -> Result<Self, AppError> {
        let client_id = Uuid::new_v4().to_string();
        let url = format!("{}/ws?clientId={}", ws_base_url, client_id);

        let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
            AppError::EngineUnreachable(format!(
                "Failed to open progress channel at {ws_base_url}: {e}"
            ))
        })?;

        tracing::info!(client_id = %client_id, "Connected to engine progress channel");
        Ok(Self {
            client_id,
            ws_stream,
        })
    }

    /// Client identifier this session registered with the engine.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Block until the engine reports completion of `prompt_id`, bounded by
    /// `deadline`.
    ///
    /// Discards binary frames, untracked frame types, frames for other
    /// jobs, and `executing` frames with a non-null node. Returns on the
    /// terminal `executing` frame (`node == null`, matching id), fails on
    /// an `execution_error` for this job, a transport error, or deadline
    /// expiry.
    pub async fn wait_for_completion(
        &mut self,
        prompt_id: &str,
        deadline: Duration,
    ) -> Result<(), AppError> {
        tokio::time::timeout(deadline, self.completion_loop(prompt_id))
            .await
            .map_err(|_| {
                AppError::EngineTimeout(format!(
                    "Job {prompt_id} did not complete within {}s",
                    deadline.as_secs()
                ))
            })?
    }

    async fn completion_loop(&mut self, prompt_id: &str) -> Result<(), AppError> {
        while let Some(frame) = self.ws_stream.next().await {
            let frame = frame.map_err(|e| {
                AppError::EngineUnreachable(format!("Progress channel failed: {e}"))
            })?;
            let Message::Text(text) = frame else {
                continue;
            };
            let message = match parse_frame(&text) {
                Ok(message) => message,
                Err(_) => continue,
            };
            match message {
                EngineMessage::Executing(data) => {
                    if data.prompt_id != prompt_id {
                        continue;
                    }
                    match data.node {
                        Some(node) => {
                            tracing::debug!(prompt_id = %prompt_id, node = %node, "Node executing")
                        }
                        None => return Ok(()),
                    }
                }
                EngineMessage::ExecutionError(data) if data.prompt_id == prompt_id => {
                    return Err(AppError::EngineProtocol(format!(
                        "Engine aborted job {} at node {}: {} ({})",
                        data.prompt_id, data.node_id, data.exception_message, data.exception_type
                    )));
                }
                EngineMessage::ExecutionError(_) => continue,
            }
        }
        Err(AppError::EngineUnreachable(format!(
            "Progress channel closed before job {prompt_id} completed"
        )))
    }

    /// Close the progress channel. Failures are logged, not surfaced -- the
    /// outputs are already collected by the time this runs.
    pub async fn close(mut self) {
        if let Err(e) = self.ws_stream.close(None).await {
            tracing::debug!("Progress channel close failed: {e}");
        }
    }
}

/// Run one job to completion and collect its output images.
///
/// Submits the job under the session's client identifier, waits for the
/// terminal progress frame, then reads the history record and downloads
/// every image listed for `output_node`. Exactly one job identifier is in
/// flight per call; any failure aborts the request with no compensating
/// cancellation sent to the engine.
pub async fn execute_job(
    api: &EngineApi,
    session: &mut EngineSession,
    job: &serde_json::Value,
    output_node: &str,
    deadline: Duration,
) -> Result<Vec<Bytes>, AppError> {
    let prompt_id = api.queue_prompt(job, session.client_id()).await?;
    session.wait_for_completion(&prompt_id, deadline).await?;

    let history = api.history(&prompt_id).await?;
    let images: Vec<ImageRef> = history.images_for(&prompt_id, output_node)?.to_vec();

    let mut outputs = Vec::with_capacity(images.len());
    for image in &images {
        outputs.push(api.fetch_image(image).await?);
    }

    tracing::info!(prompt_id = %prompt_id, count = outputs.len(), "Collected job outputs");
    Ok(outputs)
}
