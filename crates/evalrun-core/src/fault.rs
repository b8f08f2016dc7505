//! Turning failures into messages safe to hand back to callers.

use std::any::Any;

/// Longest message, in characters, reported to a caller.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Collapse a message to one line and cap its length.
pub fn sanitize_message(message: &str) -> String {
    let single_line = message.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= MAX_MESSAGE_CHARS {
        return single_line;
    }
    let mut truncated: String = single_line.chars().take(MAX_MESSAGE_CHARS).collect();
    truncated.push_str("...");
    truncated
}

/// Best-effort text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
