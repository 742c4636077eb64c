use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Full `siswa_xirpl` row, as listed to admins.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "nama": "Budi Santoso",
    "nis": "12345",
    "rfid": "0A1B2C3D",
    "role": "siswa",
    "password": "rahasia"
}))]
pub struct Siswa {
    pub id: i64,
    pub nama: String,
    pub nis: String,
    pub rfid: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

/// Public projection without the password column.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SiswaProfile {
    pub id: i64,
    pub nama: String,
    pub nis: String,
    pub rfid: Option<String>,
    pub role: Option<String>,
}

impl SiswaProfile {
    /// A student can scan only once an RFID tag is registered.
    pub fn has_rfid(&self) -> bool {
        has_rfid(self.rfid.as_deref())
    }

    /// Key used to match a student against history rows of a day.
    pub fn attendance_key(&self) -> (String, String) {
        attendance_key(&self.nis, self.rfid.as_deref())
    }
}

pub fn has_rfid(rfid: Option<&str>) -> bool {
    rfid.is_some_and(|r| !r.trim().is_empty())
}

pub fn is_admin_role(role: Option<&str>) -> bool {
    role.is_some_and(|r| r.eq_ignore_ascii_case("admin"))
}

pub fn attendance_key(nis: &str, rfid: Option<&str>) -> (String, String) {
    (nis.to_string(), rfid.unwrap_or_default().to_string())
}
