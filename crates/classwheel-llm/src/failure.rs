// Classification of generation failures into user-facing categories.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationFailure {
    #[error("API quota exhausted")]
    Quota,

    #[error("API key rejected")]
    InvalidCredential,

    #[error("no API key configured")]
    MissingCredential,

    #[error("connection error: {0}")]
    Connectivity(String),

    #[error("model output did not contain any usable question")]
    BadFormat,
}

impl GenerationFailure {
    /// The user should be offered to re-enter the key.
    pub fn is_credential_problem(&self) -> bool {
        matches!(
            self,
            GenerationFailure::Quota
                | GenerationFailure::InvalidCredential
                | GenerationFailure::MissingCredential
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            GenerationFailure::Quota => "TÀI KHOẢN HẾT LƯỢT DÙNG: API Key đã vượt quá giới hạn \
                 sử dụng. Hãy đợi 1 phút hoặc đổi Key khác."
                .to_string(),
            GenerationFailure::InvalidCredential => "API KEY KHÔNG HỢP LỆ: Vui lòng kiểm tra lại \
                 Key hoặc tạo Key mới tại Google AI Studio."
                .to_string(),
            GenerationFailure::MissingCredential => {
                "Không tìm thấy API Key. Vui lòng nhập Key lại.".to_string()
            }
            GenerationFailure::Connectivity(detail) => format!("LỖI KẾT NỐI: {detail}"),
            GenerationFailure::BadFormat => "Dữ liệu AI không đúng định dạng.".to_string(),
        }
    }
}

/// Map a raw transport/API error message onto a failure category.
///
/// Quota markers win over credential markers.
pub fn classify_failure(message: &str) -> GenerationFailure {
    if message.contains("429") || message.to_lowercase().contains("quota") {
        GenerationFailure::Quota
    } else if message.contains("400") || message.contains("403") || message.contains("INVALID") {
        GenerationFailure::InvalidCredential
    } else {
        let detail = message.trim();
        GenerationFailure::Connectivity(if detail.is_empty() {
            "Không xác định".to_string()
        } else {
            detail.to_string()
        })
    }
}
