use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_ACTION_NAME: &str = "absensi";

/// Per-day machine flag (`action` row).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 3,
    "nama": "absensi",
    "tanggal": "2025-01-15",
    "status": "Active"
}))]
pub struct Action {
    pub id: i64,
    pub nama: Option<String>,
    #[schema(value_type = String, example = "2025-01-15")]
    pub tanggal: NaiveDate,
    pub status: String,
}
