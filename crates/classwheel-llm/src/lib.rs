// Gemini question generation: request building, SSE streaming, and recovery
// of question records from free-form model output.

pub mod client;
pub mod extract;
pub mod failure;
pub mod prompt;
pub mod upload;

/// Streaming events from a generation task.
///
/// Every variant carries the generation counter the task was spawned with so
/// the receiver can drop events from superseded requests.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmEvent {
    Token { text: String, generation: u64 },
    Complete { full_text: String, generation: u64 },
    Error { message: String, generation: u64 },
}

impl LlmEvent {
    pub fn generation(&self) -> u64 {
        match self {
            LlmEvent::Token { generation, .. }
            | LlmEvent::Complete { generation, .. }
            | LlmEvent::Error { generation, .. } => *generation,
        }
    }
}
