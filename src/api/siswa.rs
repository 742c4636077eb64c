use std::collections::HashSet;

use actix_web::{HttpResponse, web};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    model::siswa::{Siswa, SiswaProfile, attendance_key},
    utils::{
        calendar::parse_date,
        db_utils::{PROFILE_COLUMNS, SqlUpdate, build_update_sql, execute_update},
    },
};

/// Columns an admin may edit through the bulk update.
const EDITABLE_COLUMNS: &[&str] = &["nama", "nis", "rfid", "role", "password"];

#[derive(Serialize, ToSchema)]
pub struct SiswaListResponse {
    #[schema(example = "Data siswa berhasil diambil")]
    pub message: String,
    pub siswa: Vec<Siswa>,
}

#[derive(Serialize, ToSchema)]
pub struct SiswaProfileListResponse {
    #[schema(example = "Data siswa belum absen berhasil diambil")]
    pub message: String,
    pub siswa: Vec<SiswaProfile>,
}

#[derive(Deserialize, IntoParams)]
pub struct BelumAbsenQuery {
    /// Day to check, `YYYY-MM-DD`
    pub tanggal: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateSiswaRequest {
    /// Rows to update; each needs an `id`, other fields are optional.
    #[schema(value_type = Vec<Object>, example = json!([{ "id": 1, "rfid": "0A1B2C3D" }]))]
    pub siswa: Option<Vec<Map<String, Value>>>,
}

#[derive(Serialize, ToSchema)]
pub struct UpdateSiswaResponse {
    #[schema(example = "Data siswa berhasil diperbarui")]
    pub message: String,
    #[schema(example = 1)]
    pub updated: usize,
}

/// List every siswa
#[utoipa::path(
    get,
    path = "/api/admin/siswa",
    responses(
        (status = 200, description = "All siswa ordered by id", body = SiswaListResponse),
        (status = 403, description = "Not an admin", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Siswa"
)]
pub async fn list_siswa(pool: web::Data<PgPool>) -> Result<HttpResponse, ApiError> {
    let siswa = sqlx::query_as::<_, Siswa>(
        r#"
        SELECT id, COALESCE(nama, '') AS nama, COALESCE(nis, '') AS nis, rfid, role, password
        FROM siswa_xirpl
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| ApiError::db(e, "Gagal mengambil data siswa"))?;

    Ok(HttpResponse::Ok().json(SiswaListResponse {
        message: "Data siswa berhasil diambil".to_string(),
        siswa,
    }))
}

/// Siswa whose `(nis, rfid)` has no history row in `taken`.
pub fn without_attendance(
    siswa: Vec<SiswaProfile>,
    taken: &HashSet<(String, String)>,
) -> Vec<SiswaProfile> {
    siswa
        .into_iter()
        .filter(|s| !taken.contains(&s.attendance_key()))
        .collect()
}

/// Siswa without attendance on a day
#[utoipa::path(
    get,
    path = "/api/admin/siswa/belum-absen",
    params(BelumAbsenQuery),
    responses(
        (status = 200, description = "Siswa ordered by name", body = SiswaProfileListResponse),
        (status = 400, description = "Missing or invalid tanggal", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Siswa"
)]
pub async fn siswa_belum_absen(
    pool: web::Data<PgPool>,
    query: web::Query<BelumAbsenQuery>,
) -> Result<HttpResponse, ApiError> {
    let tanggal = query
        .tanggal
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| ApiError::bad_request("Parameter tanggal diperlukan"))?;

    let all_siswa = sqlx::query_as::<_, SiswaProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM siswa_xirpl ORDER BY nama ASC"
    ))
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| ApiError::db(e, "Gagal mengambil data siswa"))?;

    let taken: HashSet<(String, String)> = sqlx::query_as::<_, (Option<String>, Option<String>)>(
        "SELECT nis, rfid FROM history WHERE tanggal = $1",
    )
    .bind(tanggal)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| ApiError::db(e, "Gagal mengambil data history"))?
    .into_iter()
    .map(|(nis, rfid)| attendance_key(nis.as_deref().unwrap_or_default(), rfid.as_deref()))
    .collect();

    Ok(HttpResponse::Ok().json(SiswaProfileListResponse {
        message: "Data siswa belum absen berhasil diambil".to_string(),
        siswa: without_attendance(all_siswa, &taken),
    }))
}

/// Reads the row id; numeric strings are accepted as well.
fn item_id(item: &Map<String, Value>) -> Option<i64> {
    match item.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

async fn update_one(pool: &PgPool, id: i64, update: SqlUpdate) -> Result<i64, ApiError> {
    execute_update(pool, update).await.map_err(|e| {
        error!(error = %e, siswa_id = id, "Error updating siswa");
        ApiError::internal(format!("Gagal memperbarui data siswa dengan ID {id}"))
    })?;
    Ok(id)
}

/// Bulk update siswa rows
#[utoipa::path(
    post,
    path = "/api/admin/siswa/update",
    request_body = UpdateSiswaRequest,
    responses(
        (status = 200, description = "All rows updated", body = UpdateSiswaResponse),
        (status = 400, description = "Empty list or missing id", body = MessageResponse),
        (status = 500, description = "An update failed", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Siswa"
)]
pub async fn update_siswa(
    pool: web::Data<PgPool>,
    payload: web::Json<UpdateSiswaRequest>,
) -> Result<HttpResponse, ApiError> {
    let items = match &payload.siswa {
        Some(items) if !items.is_empty() => items,
        _ => return Err(ApiError::bad_request("Data siswa tidak valid")),
    };

    // every item is checked before the first UPDATE is sent
    let mut updates = Vec::with_capacity(items.len());
    for item in items {
        let id = item_id(item).ok_or_else(|| ApiError::bad_request("ID siswa tidak boleh kosong"))?;
        if let Some(update) = build_update_sql("siswa_xirpl", item, EDITABLE_COLUMNS, "id", id)? {
            updates.push((id, update));
        }
    }

    let results = join_all(
        updates
            .into_iter()
            .map(|(id, update)| update_one(pool.get_ref(), id, update)),
    )
    .await;

    if let Some(err) = results.into_iter().find_map(Result::err) {
        return Err(err);
    }

    info!(count = items.len(), "Siswa updated");

    Ok(HttpResponse::Ok().json(UpdateSiswaResponse {
        message: "Data siswa berhasil diperbarui".to_string(),
        updated: items.len(),
    }))
}
