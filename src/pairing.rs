//! Pairing tool-call messages with their asynchronous results.
//!
//! Call/response pairs are adjacent in a single-tool-per-turn model, so a
//! bounded forward scan is cheaper than maintaining an index and cannot
//! pair one response with two calls.

use loom_base::{ActionType, EngineError, Message};

/// Find the response message for a tool call.
///
/// Locates `message` by id (`NotFound` if absent, which should not occur
/// given append-only ordering), then scans forward: the first
/// `ToolResponse` wins; hitting another `ToolCall` first means the call is
/// unresolved and the scan stops with `None`.
pub fn find_response_for<'a>(
    message: &Message,
    thread_messages: &'a [Message],
) -> Result<Option<&'a Message>, EngineError> {
    let index = thread_messages
        .iter()
        .position(|m| m.id == message.id)
        .ok_or_else(|| EngineError::NotFound(format!("message {}", message.id)))?;

    for candidate in &thread_messages[index + 1..] {
        match candidate.action_type {
            ActionType::ToolResponse => return Ok(Some(candidate)),
            ActionType::ToolCall => return Ok(None),
            ActionType::Normal => {}
        }
    }
    Ok(None)
}

/// Status line for a tool-call message: "Calling x" while the response is
/// still in flight, "Called x" once it landed.
pub fn tool_status_label(message: &Message, in_flight: bool) -> Option<String> {
    if message.action_type != ActionType::ToolCall {
        return None;
    }
    let tool_name = message.tool_call_request.as_ref().map(|req| req.tool_name.as_str()).unwrap_or("tool");
    Some(if in_flight { format!("Calling {}", tool_name) } else { format!("Called {}", tool_name) })
}
