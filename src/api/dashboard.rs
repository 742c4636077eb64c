use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    config::Config,
    error::ApiError,
    model::{
        history::History,
        siswa::SiswaProfile,
        status::{AttendanceStatus, MachineStatus},
    },
    utils::{
        aggregate::{
            AnalyticsTotal, MonthAnalytics, MonthHistory, MonthRef, analytics_by_month,
            derive_today_status, group_by_month, machine_status,
        },
        calendar::today,
        db_utils::{HISTORY_COLUMNS, actions_on, fetch_profile},
    },
};

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    #[schema(example = "Data dashboard berhasil diambil")]
    pub message: String,
    pub user: SiswaProfile,
    pub has_rfid: bool,
    pub machine_status: MachineStatus,
    #[schema(nullable = true)]
    pub absen_status: Option<AttendanceStatus>,
    #[schema(value_type = String, nullable = true, example = "07:05:12")]
    pub absen_waktu: Option<NaiveTime>,
    #[schema(value_type = String, example = "2025-01-15")]
    pub tanggal: NaiveDate,
}

#[derive(Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Month to show, `YYYY-MM`
    pub bulan: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPerMonthResponse {
    #[schema(example = "Data history berhasil diambil")]
    pub message: String,
    pub history: Vec<MonthHistory>,
    pub available_months: Vec<MonthRef>,
    #[schema(nullable = true, example = "2025-01")]
    pub selected_month: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AnalyticsResponse {
    #[schema(example = "Data analytics berhasil diambil")]
    pub message: String,
    pub analytics: Vec<MonthAnalytics>,
    pub total: AnalyticsTotal,
}

async fn current_profile(pool: &PgPool, auth: &AuthUser) -> Result<SiswaProfile, ApiError> {
    fetch_profile(pool, auth.id)
        .await
        .map_err(|e| ApiError::db(e, "Terjadi kesalahan pada server"))?
        .ok_or_else(|| ApiError::not_found("Data user tidak ditemukan"))
}

/// Profile with a registered RFID tag, or 400.
async fn profile_with_rfid(
    pool: &PgPool,
    auth: &AuthUser,
) -> Result<(SiswaProfile, String), ApiError> {
    let siswa = current_profile(pool, auth).await?;
    match siswa.rfid.clone().filter(|_| siswa.has_rfid()) {
        Some(rfid) => Ok((siswa, rfid)),
        None => Err(ApiError::bad_request("RFID belum terdaftar")),
    }
}

/// Student dashboard for today
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Today's machine and attendance status", body = DashboardResponse),
        (status = 401, description = "Missing token", body = MessageResponse),
        (status = 403, description = "Invalid or expired token", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn get_dashboard(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let tanggal = today(config.tz_offset);
    let siswa = current_profile(pool.get_ref(), &auth).await?;
    let has_rfid = siswa.has_rfid();

    let actions = actions_on(pool.get_ref(), tanggal)
        .await
        .map_err(|e| ApiError::db(e, "Gagal mengambil data mesin"))?;
    let machine = machine_status(&actions);

    let (absen_status, absen_waktu) = if has_rfid {
        let latest = sqlx::query_as::<_, History>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM history \
             WHERE rfid = $1 AND nis = $2 AND tanggal = $3 \
             ORDER BY waktu DESC NULLS LAST LIMIT 1"
        ))
        .bind(siswa.rfid.as_deref())
        .bind(&siswa.nis)
        .bind(tanggal)
        .fetch_optional(pool.get_ref())
        .await
        .unwrap_or_else(|e| {
            // a failed lookup reads as "not scanned yet"
            error!(error = %e, siswa_id = siswa.id, "Error fetching history");
            None
        });
        derive_today_status(machine, latest.as_ref())
    } else {
        (None, None)
    };

    Ok(HttpResponse::Ok().json(DashboardResponse {
        message: "Data dashboard berhasil diambil".to_string(),
        user: siswa,
        has_rfid,
        machine_status: machine,
        absen_status,
        absen_waktu,
        tanggal,
    }))
}

/// Attendance history grouped per month
#[utoipa::path(
    get,
    path = "/dashboard/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "History grouped per month, newest first", body = HistoryPerMonthResponse),
        (status = 400, description = "RFID not registered", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn history_per_month(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, ApiError> {
    let (siswa, rfid) = profile_with_rfid(pool.get_ref(), &auth).await?;

    let records = sqlx::query_as::<_, History>(&format!(
        "SELECT {HISTORY_COLUMNS} FROM history \
         WHERE rfid = $1 AND nis = $2 \
         ORDER BY tanggal DESC, waktu DESC NULLS LAST"
    ))
    .bind(&rfid)
    .bind(&siswa.nis)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| ApiError::db(e, "Gagal mengambil data history"))?;

    let months = group_by_month(&records);
    let available_months = months.iter().map(MonthHistory::month_ref).collect();

    let selected_month = query
        .bulan
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_owned);

    let history = match &selected_month {
        Some(key) => months.into_iter().filter(|m| &m.bulan_key == key).collect(),
        None => months,
    };

    Ok(HttpResponse::Ok().json(HistoryPerMonthResponse {
        message: "Data history berhasil diambil".to_string(),
        history,
        available_months,
        selected_month,
    }))
}

/// Per-month attendance counters
#[utoipa::path(
    get,
    path = "/dashboard/analytics",
    responses(
        (status = 200, description = "Counters per month and overall", body = AnalyticsResponse),
        (status = 400, description = "RFID not registered", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn analytics(
    auth: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let (siswa, rfid) = profile_with_rfid(pool.get_ref(), &auth).await?;

    let records = sqlx::query_as::<_, (NaiveDate, String)>(
        r#"
        SELECT tanggal, COALESCE(status, '') AS status
        FROM history
        WHERE rfid = $1 AND nis = $2
        ORDER BY tanggal DESC
        "#,
    )
    .bind(&rfid)
    .bind(&siswa.nis)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| ApiError::db(e, "Gagal mengambil data history"))?;

    let (analytics, total) = analytics_by_month(&records);

    Ok(HttpResponse::Ok().json(AnalyticsResponse {
        message: "Data analytics berhasil diambil".to_string(),
        analytics,
        total,
    }))
}
