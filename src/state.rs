//! Application state management
//!
//! Everything the handlers share: configuration, the pooled HTTP client,
//! the parsed job-description template and the validated node registry.
//! All of it is read-only after startup, so the state sits behind a plain
//! `Arc` with no lock.

use crate::classifier::SegmentationClient;
use crate::config::Config;
use crate::engine::EngineApi;
use crate::hosting::HostingClient;
use crate::workflow::{NodeIds, WorkflowTemplate};
use anyhow::Context;

/// Shared application state, frozen after startup.
pub struct AppState {
    /// Loaded configuration.
    pub config: Config,
    /// Pooled HTTP client shared by every upstream call.
    pub http: reqwest::Client,
    /// Parsed job-description template.
    pub template: WorkflowTemplate,
    /// Validated semantic-role → node-id registry.
    pub nodes: NodeIds,
}

impl AppState {
    /// Build the state: HTTP client, template load, node-id validation.
    ///
    /// A template missing any registered node id aborts startup here
    /// rather than failing lazily mid-request.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        // The engine's front proxy rejects requests without a browser-ish UA.
        let http = reqwest::Client::builder()
            .user_agent("Mozilla/5.0")
            .build()
            .context("Failed to build HTTP client")?;

        let template = WorkflowTemplate::load(&config.template_path)?;
        let nodes = NodeIds::default();
        nodes.validate(&template)?;
        tracing::info!(path = %config.template_path, "Workflow template loaded and validated");

        Ok(Self {
            config,
            http,
            template,
            nodes,
        })
    }

    /// Engine REST client bound to the configured base URL.
    pub fn engine_api(&self) -> EngineApi {
        EngineApi::new(self.http.clone(), self.config.engine.base_url.clone())
    }

    /// Segmentation classifier client.
    pub fn classifier(&self) -> SegmentationClient {
        SegmentationClient::new(self.http.clone(), self.config.classifier_base_url.clone())
    }

    /// Image-hosting client.
    pub fn hosting(&self) -> HostingClient {
        HostingClient::new(self.http.clone(), &self.config.hosting)
    }
}
