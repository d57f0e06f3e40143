// Prompt construction for topic and document question generation.

use serde_json::{json, Value};

use crate::upload::{Attachment, AttachmentKind};

const FORMAT_RULE: &str = r#"ĐỊNH DẠNG: Chỉ trả về JSON mảng: [{"q": "...", "options": ["A", "B", "C", "D"], "correct": 0-3}]."#;
const MARKUP_RULE: &str = r"LƯU Ý: Công thức hóa học bọc $\ce{...}$, toán học bọc $...$.";

/// Where the questions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Topic,
    Document,
}

/// One content part of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    InlineData { mime_type: String, data: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub kind: GenerationKind,
    pub parts: Vec<Part>,
    pub temperature: f32,
}

/// Ask for `count` fresh questions about `topic`.
pub fn topic_request(topic: &str, count: usize, language: &str, temperature: f32) -> GenerationRequest {
    let text = format!(
        "Tạo {count} câu hỏi trắc nghiệm {language} về: \"{topic}\".\n{FORMAT_RULE}\n{MARKUP_RULE}",
        topic = topic.trim()
    );
    GenerationRequest {
        kind: GenerationKind::Topic,
        parts: vec![Part::Text(text)],
        temperature,
    }
}

/// Ask for every multiple-choice question found in a document.
pub fn document_request(attachment: &Attachment, temperature: f32) -> GenerationRequest {
    let instructions = format!(
        "BẠN LÀ CHUYÊN GIA TRÍCH XUẤT DỮ LIỆU. Quét toàn bộ câu hỏi trắc nghiệm trong tài liệu.\n{FORMAT_RULE}\n{MARKUP_RULE}"
    );
    let parts = match &attachment.kind {
        AttachmentKind::Text(body) => {
            vec![Part::Text(format!("{instructions}\n\nTÀI LIỆU:\n{body}"))]
        }
        AttachmentKind::Inline { mime_type, data } => vec![
            Part::Text(instructions),
            Part::InlineData {
                mime_type: mime_type.clone(),
                data: data.clone(),
            },
        ],
    };
    GenerationRequest {
        kind: GenerationKind::Document,
        parts,
        temperature,
    }
}

impl GenerationRequest {
    /// Gemini `generateContent` request body.
    pub fn to_body(&self) -> Value {
        let parts: Vec<Value> = self
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => json!({ "text": text }),
                Part::InlineData { mime_type, data } => json!({
                    "inline_data": { "mime_type": mime_type, "data": data }
                }),
            })
            .collect();
        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": self.temperature,
            }
        })
    }
}
