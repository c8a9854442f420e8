//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. The engine and classifier base URLs have no sane
//! default and fail fast when absent.

use anyhow::{anyhow, Context};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Workflow engine configuration
    pub engine: EngineConfig,
    /// Segmentation classifier base URL
    pub classifier_base_url: String,
    /// Image hosting configuration
    pub hosting: HostingConfig,
    /// Path to the on-disk job-description template
    pub template_path: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Workflow engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// HTTP base URL of the engine, e.g. `https://host`
    pub base_url: String,
    /// Deadline for the completion wait, in seconds
    pub wait_timeout_secs: u64,
}

/// Image hosting (Cloudinary) configuration
#[derive(Debug, Clone)]
pub struct HostingConfig {
    /// Cloudinary cloud name
    pub cloud_name: String,
    /// Unsigned upload preset name
    pub upload_preset: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `ENGINE_BASE_URL` and `CLASSIFIER_BASE_URL` are required; everything
    /// else falls back to a default.
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = env::var("ENGINE_BASE_URL")
            .context("ENGINE_BASE_URL must be set to the workflow engine's base URL")?;
        let classifier_base_url = env::var("CLASSIFIER_BASE_URL")
            .context("CLASSIFIER_BASE_URL must be set to the segmentation classifier's base URL")?;

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8100),
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            },
            engine: EngineConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                wait_timeout_secs: env::var("ENGINE_WAIT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(300),
            },
            classifier_base_url: classifier_base_url.trim_end_matches('/').to_string(),
            hosting: HostingConfig {
                cloud_name: env::var("CLOUDINARY_CLOUD_NAME")
                    .unwrap_or_else(|_| "dukgi26uv".to_string()),
                upload_preset: env::var("CLOUDINARY_UPLOAD_PRESET")
                    .unwrap_or_else(|_| "try-on-not-secure".to_string()),
            },
            template_path: env::var("WORKFLOW_TEMPLATE_PATH")
                .unwrap_or_else(|_| "./workflows/tryon.json".to_string()),
        })
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl EngineConfig {
    /// Derive the WebSocket base URL from the HTTP base URL.
    ///
    /// `https://host` becomes `wss://host`, `http://host` becomes
    /// `ws://host`. A bare host is assumed TLS, matching the engine's
    /// public deployment.
    pub fn ws_base_url(&self) -> anyhow::Result<String> {
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            Ok(format!("wss://{}", rest))
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            Ok(format!("ws://{}", rest))
        } else if self.base_url.contains("://") {
            Err(anyhow!(
                "Unsupported engine base URL scheme: {}",
                self.base_url
            ))
        } else {
            Ok(format!("wss://{}", self.base_url))
        }
    }
}
