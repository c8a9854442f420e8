//! Try-on API handler
//!
//! The single front-door endpoint: two image URLs in, a list of public
//! result URLs out. The handler walks the whole pipeline sequentially --
//! fetch sources, stage them on the engine, classify the garment, inject
//! parameters, run the job, republish the outputs.

use crate::engine::{execute_job, EngineSession};
use crate::error::AppError;
use crate::state::AppState;
use crate::workflow::{self, RegionFlags};
use axum::{
    extract::{Query, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Query parameters for `GET /output`.
#[derive(Debug, Deserialize)]
pub struct TryOnParams {
    /// URL of the subject photo.
    pub subject_url: String,
    /// URL of the garment photo.
    pub clothes_url: String,
}

/// Response body: public URLs of the generated images.
#[derive(Debug, Serialize)]
pub struct TryOnResponse {
    /// One entry per image the output node produced.
    #[serde(rename = "imageUrl")]
    pub image_url: Vec<String>,
}

/// GET /output - run the full try-on pipeline.
///
/// # Flow
/// 1. Fetch both source images
/// 2. Stage them on the engine under their URL filenames
/// 3. Classify the garment into region flags
/// 4. Clone the template, inject filenames, flags and a fresh seed
/// 5. Submit the job over a per-request progress session, bounded wait
/// 6. Re-upload each output to the public host
///
/// Any failure aborts the whole request with its distinct error code.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TryOnParams>,
) -> Result<Json<TryOnResponse>, AppError> {
    tracing::info!(
        subject_url = %params.subject_url,
        clothes_url = %params.clothes_url,
        "Try-on request started"
    );

    let subject_name = filename_from_url(&params.subject_url)?;
    let clothes_name = filename_from_url(&params.clothes_url)?;

    let subject_bytes = fetch_source_image(&state.http, &params.subject_url).await?;
    let clothes_bytes = fetch_source_image(&state.http, &params.clothes_url).await?;

    let engine = state.engine_api();
    engine
        .upload_image(
            &subject_name,
            subject_bytes.to_vec(),
            mime_for_filename(&subject_name),
        )
        .await?;
    engine
        .upload_image(
            &clothes_name,
            clothes_bytes.to_vec(),
            mime_for_filename(&clothes_name),
        )
        .await?;

    let choices = state.classifier().segments(&params.clothes_url).await?;
    let flags = RegionFlags::from_choices(&choices);

    let seed = workflow::fresh_seed();
    let job = workflow::build_job(
        &state.template,
        &state.nodes,
        &subject_name,
        &clothes_name,
        &flags,
        seed,
    )?;

    let ws_base = state.config.engine.ws_base_url().map_err(AppError::Internal)?;
    let mut session = EngineSession::connect(&ws_base).await?;
    let deadline = Duration::from_secs(state.config.engine.wait_timeout_secs);
    let result = execute_job(
        &engine,
        &mut session,
        &job,
        state.nodes.save_final_image,
        deadline,
    )
    .await;
    session.close().await;
    let images = result?;

    let hosting = state.hosting();
    let mut image_urls = Vec::with_capacity(images.len());
    for image in images {
        image_urls.push(hosting.upload(image).await?);
    }

    tracing::info!(count = image_urls.len(), "Try-on request completed");
    Ok(Json(TryOnResponse {
        image_url: image_urls,
    }))
}

/// Download one source image.
async fn fetch_source_image(client: &reqwest::Client, url: &str) -> Result<Bytes, AppError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::SourceImage(format!("Failed to fetch {url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::SourceImage(format!(
            "Fetching {url} returned status {}",
            status.as_u16()
        )));
    }

    response
        .bytes()
        .await
        .map_err(|e| AppError::SourceImage(format!("Failed to read body of {url}: {e}")))
}

/// The last path segment of the URL, used as the staged filename on the
/// engine (and as the key the image-loader nodes receive).
fn filename_from_url(raw: &str) -> Result<String, AppError> {
    let url =
        Url::parse(raw).map_err(|e| AppError::SourceImage(format!("Invalid URL {raw}: {e}")))?;
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::SourceImage(format!("URL {raw} has no filename")))
}

/// MIME type from the filename extension; the engine only needs a rough hint.
fn mime_for_filename(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
