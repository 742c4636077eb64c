use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "Budi Santoso")]
    pub nama: Option<String>,
    #[schema(example = "12345")]
    pub nis: Option<String>,
    /// Checked against the stored password when supplied.
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// `siswa_xirpl.id`
    pub id: i64,
    pub nama: String,
    pub nis: String,
    pub exp: usize,
    pub jti: String,
}

/// Body of every plain acknowledgement and error response.
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Terjadi kesalahan pada server")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A required text field: `None` when absent or only whitespace. The value is
/// returned untouched so that exact lookups see what the client sent.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
