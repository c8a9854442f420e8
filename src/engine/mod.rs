//! Workflow engine client
//!
//! Everything this service knows about the remote generative-image engine:
//! the REST endpoints ([`api`]), the WebSocket progress protocol
//! ([`messages`]) and the per-request submit/wait/fetch routine
//! ([`session`]).

pub mod api;
pub mod messages;
pub mod session;

pub use api::{EngineApi, History, ImageRef};
pub use session::{execute_job, EngineSession};
