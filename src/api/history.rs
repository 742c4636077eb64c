use std::collections::HashMap;

use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    config::Config,
    error::ApiError,
    model::{
        history::{History, NewHistory},
        siswa::{SiswaProfile, has_rfid},
        status::AttendanceStatus,
    },
    models::{MessageResponse, non_blank},
    utils::{
        calendar::{month_bounds, now_time, parse_date},
        db_utils::{HISTORY_COLUMNS, PROFILE_COLUMNS, profile_by_nis},
    },
};

#[derive(Deserialize, IntoParams)]
pub struct HistoryFilter {
    /// Exact day, `YYYY-MM-DD`; wins over `bulan`
    pub tanggal: Option<String>,
    /// Whole month, `YYYY-MM`
    pub bulan: Option<String>,
}

/// History row joined with the owning siswa.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminHistory {
    /// Siswa id when the NIS is known, otherwise the history id
    pub id: i64,
    pub history_id: i64,
    pub siswa_id: Option<i64>,
    #[schema(value_type = String, nullable = true, example = "07:05:12")]
    pub waktu: Option<NaiveTime>,
    #[schema(value_type = String, example = "2025-01-15")]
    pub tanggal: NaiveDate,
    pub status: String,
    pub rfid: Option<String>,
    pub nis: String,
    pub nama: Option<String>,
    pub role: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AdminHistoryListResponse {
    #[schema(example = "Data history berhasil diambil")]
    pub message: String,
    pub history: Vec<AdminHistory>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateHistory {
    #[schema(example = "12345")]
    pub nis: Option<String>,
    /// Defaults to the siswa's registered tag
    #[schema(example = "0A1B2C3D")]
    pub rfid: Option<String>,
    #[schema(example = "2025-01-15")]
    pub tanggal: Option<String>,
    #[schema(example = "Sakit")]
    pub status: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    #[schema(example = "Absen berhasil ditambahkan ke database")]
    pub message: String,
    pub history: History,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateHistoryStatus {
    #[schema(example = "Izin")]
    pub status: Option<String>,
}

fn parse_status(value: Option<&str>) -> Result<AttendanceStatus, ApiError> {
    value
        .and_then(AttendanceStatus::parse_exact)
        .ok_or_else(|| ApiError::bad_request("Status tidak valid"))
}

/// Joins history rows with their siswa; the row's own `nama`/`role` win.
pub fn enrich_history(records: Vec<History>, siswa: &HashMap<String, SiswaProfile>) -> Vec<AdminHistory> {
    records
        .into_iter()
        .map(|record| {
            let owner = siswa.get(&record.nis);
            AdminHistory {
                id: owner.map_or(record.id, |s| s.id),
                history_id: record.id,
                siswa_id: owner.map(|s| s.id),
                waktu: record.waktu,
                tanggal: record.tanggal,
                status: record.status,
                rfid: record.rfid,
                nama: record.nama.or_else(|| owner.map(|s| s.nama.clone())),
                role: record.role.or_else(|| owner.and_then(|s| s.role.clone())),
                nis: record.nis,
            }
        })
        .collect()
}

/// List attendance history
#[utoipa::path(
    get,
    path = "/api/admin/history",
    params(HistoryFilter),
    responses(
        (status = 200, description = "History newest first", body = AdminHistoryListResponse),
        (status = 400, description = "Invalid tanggal or bulan", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "History"
)]
pub async fn list_history(
    pool: web::Data<PgPool>,
    query: web::Query<HistoryFilter>,
) -> Result<HttpResponse, ApiError> {
    let tanggal = query.tanggal.as_deref().filter(|t| !t.trim().is_empty());
    let bulan = query.bulan.as_deref().filter(|b| !b.trim().is_empty());

    let order = "ORDER BY tanggal DESC, waktu DESC NULLS LAST";
    let result = match (tanggal, bulan) {
        (Some(tanggal), _) => {
            let day = parse_date(tanggal).ok_or_else(|| ApiError::bad_request("Parameter tanggal tidak valid"))?;
            sqlx::query_as::<_, History>(&format!(
                "SELECT {HISTORY_COLUMNS} FROM history WHERE tanggal = $1 {order}"
            ))
            .bind(day)
            .fetch_all(pool.get_ref())
            .await
        }
        (None, Some(bulan)) => {
            let (first, last) =
                month_bounds(bulan).ok_or_else(|| ApiError::bad_request("Parameter bulan tidak valid"))?;
            sqlx::query_as::<_, History>(&format!(
                "SELECT {HISTORY_COLUMNS} FROM history WHERE tanggal BETWEEN $1 AND $2 {order}"
            ))
            .bind(first)
            .bind(last)
            .fetch_all(pool.get_ref())
            .await
        }
        (None, None) => {
            sqlx::query_as::<_, History>(&format!("SELECT {HISTORY_COLUMNS} FROM history {order}"))
                .fetch_all(pool.get_ref())
                .await
        }
    };
    let records = result.map_err(|e| ApiError::db(e, "Gagal mengambil data history"))?;

    let mut nis_list: Vec<String> = records
        .iter()
        .map(|r| r.nis.clone())
        .filter(|n| !n.is_empty())
        .collect();
    nis_list.sort();
    nis_list.dedup();

    let mut siswa: HashMap<String, SiswaProfile> = HashMap::new();
    if !nis_list.is_empty() {
        let rows = sqlx::query_as::<_, SiswaProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM siswa_xirpl WHERE nis = ANY($1) ORDER BY id"
        ))
        .bind(&nis_list)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| ApiError::db(e, "Gagal mengambil data siswa"))?;
        for row in rows {
            // first row per NIS wins
            siswa.entry(row.nis.clone()).or_insert(row);
        }
    }

    Ok(HttpResponse::Ok().json(AdminHistoryListResponse {
        message: "Data history berhasil diambil".to_string(),
        history: enrich_history(records, &siswa),
    }))
}

/// Record attendance manually
#[utoipa::path(
    post,
    path = "/api/admin/history",
    request_body = CreateHistory,
    responses(
        (status = 200, description = "Attendance recorded", body = HistoryResponse),
        (status = 400, description = "Missing fields, invalid status or already recorded", body = MessageResponse),
        (status = 404, description = "Unknown NIS", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "History"
)]
pub async fn create_history(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateHistory>,
) -> Result<HttpResponse, ApiError> {
    let (Some(nis), Some(tanggal), Some(status)) = (
        non_blank(payload.nis.as_deref()),
        non_blank(payload.tanggal.as_deref()),
        non_blank(payload.status.as_deref()),
    ) else {
        return Err(ApiError::bad_request("NIS, tanggal, dan status diperlukan"));
    };
    let status = parse_status(Some(status))?;
    let tanggal = parse_date(tanggal).ok_or_else(|| ApiError::bad_request("Parameter tanggal tidak valid"))?;

    let siswa = profile_by_nis(pool.get_ref(), nis)
        .await
        .map_err(|e| ApiError::db(e, "Gagal mengambil data siswa"))?
        .ok_or_else(|| ApiError::not_found("Data siswa tidak ditemukan"))?;

    let rfid = match payload.rfid.as_deref() {
        Some(r) if has_rfid(Some(r)) => Some(r.to_string()),
        _ => siswa.rfid.clone(),
    };

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM history WHERE nis = $1 AND tanggal = $2)",
    )
    .bind(nis)
    .bind(tanggal)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| ApiError::db(e, "Gagal memeriksa data history"))?;

    if exists {
        return Err(ApiError::bad_request(
            "Siswa ini sudah memiliki absen untuk tanggal ini",
        ));
    }

    let new = NewHistory {
        nis: siswa.nis.clone(),
        nama: Some(siswa.nama.clone()).filter(|n| !n.is_empty()),
        role: siswa.role.clone(),
        rfid,
        tanggal,
        waktu: now_time(config.tz_offset),
        status: status.to_string(),
    };

    debug!(nis = %new.nis, tanggal = %new.tanggal, status = %new.status, "Inserting history");

    let history = sqlx::query_as::<_, History>(&format!(
        r#"
        INSERT INTO history (nis, nama, role, rfid, tanggal, waktu, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {HISTORY_COLUMNS}
        "#
    ))
    .bind(&new.nis)
    .bind(&new.nama)
    .bind(&new.role)
    .bind(&new.rfid)
    .bind(new.tanggal)
    .bind(new.waktu)
    .bind(&new.status)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| ApiError::db(e, "Gagal menambahkan absen ke database"))?;

    info!(history_id = history.id, nis = %history.nis, "History created");

    Ok(HttpResponse::Ok().json(HistoryResponse {
        message: "Absen berhasil ditambahkan ke database".to_string(),
        history,
    }))
}

/// Change the status of a history row
#[utoipa::path(
    put,
    path = "/api/admin/history/{id}/status",
    params(("id" = i64, Path, description = "History id")),
    request_body = UpdateHistoryStatus,
    responses(
        (status = 200, description = "Status updated", body = MessageResponse),
        (status = 400, description = "Invalid status", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "History"
)]
pub async fn update_history_status(
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    payload: web::Json<UpdateHistoryStatus>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let status = parse_status(payload.status.as_deref())?;

    sqlx::query("UPDATE history SET status = $1 WHERE id = $2")
        .bind(status.as_ref())
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| ApiError::db(e, "Gagal memperbarui status"))?;

    info!(history_id = id, %status, "History status updated");

    Ok(HttpResponse::Ok().json(MessageResponse::new("Status berhasil diperbarui")))
}

/// Delete a history row
#[utoipa::path(
    delete,
    path = "/api/admin/history/{id}",
    params(("id" = i64, Path, description = "History id")),
    responses(
        (status = 200, description = "Row deleted", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "History"
)]
pub async fn delete_history(
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    sqlx::query("DELETE FROM history WHERE id = $1")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| ApiError::db(e, "Gagal menghapus data"))?;

    info!(history_id = id, "History deleted");

    Ok(HttpResponse::Ok().json(MessageResponse::new("Data berhasil dihapus")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{config, lazy_pool, rejection};

    fn history(id: i64, nis: &str, nama: Option<&str>) -> History {
        History {
            id,
            nis: nis.into(),
            nama: nama.map(String::from),
            role: None,
            rfid: None,
            tanggal: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            waktu: None,
            status: "Hadir".into(),
        }
    }

    #[test]
    fn status_must_be_one_of_four() {
        assert_eq!(parse_status(Some("Alpha")).unwrap(), AttendanceStatus::Alpha);
        assert!(parse_status(Some("alpha")).is_err());
        assert!(parse_status(None).is_err());
    }

    #[test]
    fn enrichment_fills_gaps_from_siswa() {
        let mut siswa = HashMap::new();
        siswa.insert(
            "100".to_string(),
            SiswaProfile {
                id: 9,
                nama: "Andi".into(),
                nis: "100".into(),
                rfid: None,
                role: Some("siswa".into()),
            },
        );

        let rows = enrich_history(
            vec![history(1, "100", None), history(2, "999", Some("Tamu"))],
            &siswa,
        );

        assert_eq!(rows[0].id, 9);
        assert_eq!(rows[0].history_id, 1);
        assert_eq!(rows[0].siswa_id, Some(9));
        assert_eq!(rows[0].nama.as_deref(), Some("Andi"));
        assert_eq!(rows[0].role.as_deref(), Some("siswa"));

        // unknown NIS keeps the history id and its own name
        assert_eq!(rows[1].id, 2);
        assert_eq!(rows[1].siswa_id, None);
        assert_eq!(rows[1].nama.as_deref(), Some("Tamu"));
    }

    fn new_history(nis: Option<&str>, tanggal: Option<&str>, status: Option<&str>) -> web::Json<CreateHistory> {
        web::Json(CreateHistory {
            nis: nis.map(String::from),
            rfid: None,
            tanggal: tanggal.map(String::from),
            status: status.map(String::from),
        })
    }

    #[actix_web::test]
    async fn create_requires_nis_tanggal_and_status() {
        let cases = [
            (None, Some("2025-01-15"), Some("Sakit")),
            (Some("  "), Some("2025-01-15"), Some("Sakit")),
            (Some("100"), None, Some("Sakit")),
            (Some("100"), Some("2025-01-15"), Some("")),
        ];
        for (nis, tanggal, status) in cases {
            let err = rejection(
                create_history(lazy_pool(), config(), new_history(nis, tanggal, status)).await,
            );
            assert_eq!(err.to_string(), "NIS, tanggal, dan status diperlukan");
        }
    }

    #[actix_web::test]
    async fn create_rejects_unknown_status_and_bad_date() {
        let err = rejection(
            create_history(lazy_pool(), config(), new_history(Some("100"), Some("2025-01-15"), Some("Terlambat"))).await,
        );
        assert_eq!(err.to_string(), "Status tidak valid");

        let err = rejection(
            create_history(lazy_pool(), config(), new_history(Some("100"), Some("15/01/2025"), Some("Izin"))).await,
        );
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(err.to_string(), "Parameter tanggal tidak valid");
    }
}
