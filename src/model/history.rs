use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One attendance event (`history` row).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 10,
    "nis": "12345",
    "nama": "Budi Santoso",
    "role": "siswa",
    "rfid": "0A1B2C3D",
    "tanggal": "2025-01-15",
    "waktu": "07:05:12",
    "status": "Hadir"
}))]
pub struct History {
    pub id: i64,
    pub nis: String,
    pub nama: Option<String>,
    pub role: Option<String>,
    pub rfid: Option<String>,
    #[schema(value_type = String, example = "2025-01-15")]
    pub tanggal: NaiveDate,
    #[schema(value_type = String, nullable = true, example = "07:05:12")]
    pub waktu: Option<NaiveTime>,
    pub status: String,
}

/// Values for a new history row.
#[derive(Debug, Clone)]
pub struct NewHistory {
    pub nis: String,
    pub nama: Option<String>,
    pub role: Option<String>,
    pub rfid: Option<String>,
    pub tanggal: NaiveDate,
    pub waktu: NaiveTime,
    pub status: String,
}
