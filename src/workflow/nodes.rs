//! Node-id registry
//!
//! The engine's template addresses processing steps by opaque numeric
//! strings. This registry pins the semantic role of each id the service
//! patches or reads, and is validated against the loaded template at
//! startup so a mismatched template fails fast instead of mid-request.

use crate::error::AppError;
use crate::workflow::template::WorkflowTemplate;

/// Mapping from semantic role to the literal node-id used by the template.
#[derive(Debug, Clone)]
pub struct NodeIds {
    /// Image-loader node for the subject photo.
    pub subject_image_loader: &'static str,
    /// Image-loader node for the garment photo.
    pub clothes_image_loader: &'static str,
    /// Segmenter node receiving the garment-region flag set.
    pub region_segmenter: &'static str,
    /// Advanced sampler node receiving the per-request noise seed.
    pub sampler: &'static str,
    /// Save node whose output images the pipeline collects.
    pub save_final_image: &'static str,
}

impl Default for NodeIds {
    fn default() -> Self {
        Self {
            subject_image_loader: "15",
            clothes_image_loader: "14",
            region_segmenter: "76",
            sampler: "30",
            save_final_image: "132",
        }
    }
}

impl NodeIds {
    /// All registered (role, node-id) pairs.
    fn roles(&self) -> [(&'static str, &'static str); 5] {
        [
            ("subject image loader", self.subject_image_loader),
            ("clothes image loader", self.clothes_image_loader),
            ("region segmenter", self.region_segmenter),
            ("sampler", self.sampler),
            ("final image saver", self.save_final_image),
        ]
    }

    /// Check that every registered id exists in the template's key set.
    pub fn validate(&self, template: &WorkflowTemplate) -> Result<(), AppError> {
        for (role, node_id) in self.roles() {
            if !template.contains_node(node_id) {
                return Err(AppError::TemplateInvalid(format!(
                    "Template is missing node {node_id} ({role})"
                )));
            }
        }
        Ok(())
    }
}
