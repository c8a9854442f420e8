//! Job-description template handling
//!
//! Loading the static prompt graph ([`template`]), the semantic-role →
//! node-id registry with startup validation ([`nodes`]), and per-request
//! parameter injection ([`inject`]).

pub mod inject;
pub mod nodes;
pub mod template;

pub use inject::{build_job, fresh_seed, RegionFlags};
pub use nodes::NodeIds;
pub use template::WorkflowTemplate;
