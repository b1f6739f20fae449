//! Terminal rendering of stream events

use sous_chat::StreamEvent;

/// Where a rendered line goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout(String),
    Stderr(String),
}

/// Render one event for the plain text mode
pub fn render(event: &StreamEvent) -> Option<Output> {
    match event {
        StreamEvent::Status { message } => Some(Output::Stderr(format!("[{}]", message))),
        StreamEvent::RecipeSearch { message } => {
            Some(Output::Stderr(format!("[searching recipes: {}]", message)))
        }
        StreamEvent::ToolUse { message } => Some(Output::Stderr(format!("[{}...]", message))),
        StreamEvent::ToolComplete { message } => {
            Some(Output::Stderr(format!("[done: {}]", message)))
        }
        StreamEvent::Response { content, .. } => Some(Output::Stdout(content.clone())),
        StreamEvent::Error {
            message,
            reauthenticate,
        } => {
            let mut line = format!("Error: {}", message);
            if *reauthenticate {
                line.push_str("\nUpdate session_cookie in your config (sous --init-config shows where).");
            }
            Some(Output::Stderr(line))
        }
        StreamEvent::End => None,
        StreamEvent::Unknown { raw } => {
            tracing::debug!("Unrecognized event: {}", raw);
            Some(Output::Stderr("[unrecognized event]".to_string()))
        }
    }
}

/// Render one event as a single JSON line
pub fn render_json(event: &StreamEvent) -> anyhow::Result<String> {
    Ok(serde_json::to_string(event)?)
}
