//! Public image-host client
//!
//! Re-publishes generated images to Cloudinary with an unsigned upload
//! preset and hands back the public `secure_url` for each.

use crate::config::HostingConfig;
use crate::error::AppError;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

/// HTTP client for the image-hosting upload endpoint.
pub struct HostingClient {
    client: reqwest::Client,
    upload_url: String,
    upload_preset: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl HostingClient {
    /// Create a hosting client for the configured Cloudinary account.
    pub fn new(client: reqwest::Client, config: &HostingConfig) -> Self {
        let upload_url = format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            config.cloud_name
        );
        Self::with_upload_url(client, upload_url, config.upload_preset.clone())
    }

    /// Create a hosting client against an explicit upload URL (used by tests).
    pub fn with_upload_url(
        client: reqwest::Client,
        upload_url: String,
        upload_preset: String,
    ) -> Self {
        Self {
            client,
            upload_url,
            upload_preset,
        }
    }

    /// Upload one generated image; returns its public URL.
    pub async fn upload(&self, image: Bytes) -> Result<String, AppError> {
        let part = Part::bytes(image.to_vec()).file_name("result.png");
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone())
            .text("tags", "unsigned, from_script");

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::HostingUploadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AppError::HostingUploadFailed(format!(
                "Host returned status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let uploaded: UploadResponse = response.json().await.map_err(|e| {
            AppError::HostingUploadFailed(format!("Malformed host response: {e}"))
        })?;

        tracing::debug!(url = %uploaded.secure_url, "Result published to image host");
        Ok(uploaded.secure_url)
    }
}
