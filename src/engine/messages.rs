//! Workflow engine WebSocket message types
//!
//! The engine pushes JSON frames shaped `{"type": "<kind>", "data": {...}}`
//! over the progress socket. Only two kinds matter to this service: the
//! `executing` heartbeat (whose `node` goes `null` when a job finishes) and
//! `execution_error`. Everything else is noise and is skipped by the caller.

use serde::Deserialize;

/// A progress frame from the engine's WebSocket channel.
///
/// Deserialized via the internally-tagged `"type"` field with associated
/// `"data"` content. Unknown types fail to parse; the wait loop treats a
/// parse failure as an ignorable frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EngineMessage {
    /// A node is currently executing; `node == None` means the job finished.
    #[serde(rename = "executing")]
    Executing(ExecutingData),

    /// The engine aborted the job with a node-level error.
    #[serde(rename = "execution_error")]
    ExecutionError(ExecutionErrorData),
}

/// Payload for `executing` frames.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutingData {
    /// Node currently running; `None` once the whole job has completed.
    pub node: Option<String>,
    /// Job identifier the frame belongs to.
    pub prompt_id: String,
}

/// Payload for `execution_error` frames.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionErrorData {
    /// Job identifier the error belongs to.
    pub prompt_id: String,
    /// Node that raised the error.
    pub node_id: String,
    /// Human-readable error message from the engine.
    pub exception_message: String,
    /// Engine-side exception class name.
    pub exception_type: String,
}

/// Parse one WebSocket text frame into a typed message.
///
/// Returns `Err` for malformed JSON or frame types this service does not
/// track (status broadcasts, progress ticks, cached-node lists).
pub fn parse_frame(text: &str) -> Result<EngineMessage, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_executing_with_node() {
        let json = r#"{"type":"executing","data":{"node":"30","prompt_id":"job-1"}}"#;
        match parse_frame(json).unwrap() {
            EngineMessage::Executing(data) => {
                assert_eq!(data.node.as_deref(), Some("30"));
                assert_eq!(data.prompt_id, "job-1");
            }
            other => panic!("Expected Executing, got {other:?}"),
        }
    }

    #[test]
    fn parse_executing_completion() {
        let json = r#"{"type":"executing","data":{"node":null,"prompt_id":"job-1"}}"#;
        match parse_frame(json).unwrap() {
            EngineMessage::Executing(data) => assert!(data.node.is_none()),
            other => panic!("Expected Executing, got {other:?}"),
        }
    }

    #[test]
    fn parse_execution_error() {
        let json = r#"{"type":"execution_error","data":{"prompt_id":"job-1","node_id":"30","exception_message":"out of memory","exception_type":"RuntimeError"}}"#;
        match parse_frame(json).unwrap() {
            EngineMessage::ExecutionError(data) => {
                assert_eq!(data.node_id, "30");
                assert_eq!(data.exception_message, "out of memory");
            }
            other => panic!("Expected ExecutionError, got {other:?}"),
        }
    }

    #[test]
    fn untracked_frame_types_fail_to_parse() {
        let json = r#"{"type":"progress","data":{"value":5,"max":20}}"#;
        assert!(parse_frame(json).is_err());
        let json = r#"{"type":"status","data":{"status":{"exec_info":{"queue_remaining":0}}}}"#;
        assert!(parse_frame(json).is_err());
    }

    #[test]
    fn malformed_json_fails_to_parse() {
        assert!(parse_frame("not json").is_err());
    }
}
