//! Parameter injection
//!
//! Turns the static template into a submittable job description: uploaded
//! filenames into the two image-loader nodes, the garment-region flag set
//! into the segmenter node, and a fresh bounded seed into the sampler.

use crate::classifier::SegmentChoices;
use crate::error::AppError;
use crate::workflow::nodes::NodeIds;
use crate::workflow::template::WorkflowTemplate;
use rand::Rng;
use serde::Serialize;
use serde_json::{Map, Value};

/// Upper bound (inclusive) for the sampler's noise seed.
pub const MAX_NOISE_SEED: u64 = 768_376_246_485_590;

/// The full widget set submitted to the segmenter node.
///
/// Product policy: the try-on only ever replaces clothing, so face, hair,
/// headwear and accessories are pinned off regardless of what the
/// classifier saw, and `belt` rides along with `dress`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RegionFlags {
    /// Always `false`.
    pub face: bool,
    /// Always `false`.
    pub hair: bool,
    /// Always `false`.
    pub hat: bool,
    /// Always `false`.
    pub sunglass: bool,
    /// From the classifier.
    pub left_arm: bool,
    /// From the classifier.
    pub right_arm: bool,
    /// From the classifier.
    pub left_leg: bool,
    /// From the classifier.
    pub right_leg: bool,
    /// From the classifier.
    pub upper_clothes: bool,
    /// From the classifier.
    pub skirt: bool,
    /// From the classifier.
    pub pants: bool,
    /// From the classifier.
    pub dress: bool,
    /// Derived: `true` iff `dress` is `true`.
    pub belt: bool,
    /// Always `false`.
    pub shoe: bool,
    /// Always `false`.
    pub bag: bool,
    /// Always `false`.
    pub scarf: bool,
}

impl RegionFlags {
    /// Apply the fixed product policy to the classifier's choices.
    pub fn from_choices(choices: &SegmentChoices) -> Self {
        Self {
            face: false,
            hair: false,
            hat: false,
            sunglass: false,
            left_arm: choices.left_arm,
            right_arm: choices.right_arm,
            left_leg: choices.left_leg,
            right_leg: choices.right_leg,
            upper_clothes: choices.upper_clothes,
            skirt: choices.skirt,
            pants: choices.pants,
            dress: choices.dress,
            belt: choices.dress,
            shoe: false,
            bag: false,
            scarf: false,
        }
    }
}

/// Draw a fresh sampler seed in `1..=MAX_NOISE_SEED`.
pub fn fresh_seed() -> u64 {
    rand::rng().random_range(1..=MAX_NOISE_SEED)
}

/// Build a submittable job description from the template.
///
/// Clones the template's node graph and patches the three request-specific
/// node inputs. The registry is validated at startup, so a missing node
/// here means the template changed on disk underneath us -- still a
/// template error, never a panic.
pub fn build_job(
    template: &WorkflowTemplate,
    nodes: &NodeIds,
    subject_filename: &str,
    clothes_filename: &str,
    flags: &RegionFlags,
    seed: u64,
) -> Result<Value, AppError> {
    let mut graph = template.instantiate();

    node_inputs_mut(&mut graph, nodes.subject_image_loader)?
        .insert("image".to_string(), Value::String(subject_filename.into()));
    node_inputs_mut(&mut graph, nodes.clothes_image_loader)?
        .insert("image".to_string(), Value::String(clothes_filename.into()));

    let flag_values = serde_json::to_value(flags)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize flags: {e}")))?;
    let segmenter_inputs = node_inputs_mut(&mut graph, nodes.region_segmenter)?;
    if let Value::Object(flag_map) = flag_values {
        for (key, value) in flag_map {
            segmenter_inputs.insert(key, value);
        }
    }

    node_inputs_mut(&mut graph, nodes.sampler)?
        .insert("noise_seed".to_string(), Value::from(seed));

    Ok(Value::Object(graph))
}

/// Borrow the `inputs` object of one node mutably.
fn node_inputs_mut<'a>(
    graph: &'a mut Map<String, Value>,
    node_id: &str,
) -> Result<&'a mut Map<String, Value>, AppError> {
    graph
        .get_mut(node_id)
        .ok_or_else(|| AppError::TemplateInvalid(format!("Template has no node {node_id}")))?
        .get_mut("inputs")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| {
            AppError::TemplateInvalid(format!("Node {node_id} has no inputs object"))
        })
}
