use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::{
    config::Config,
    error::ApiError,
    utils::{
        calendar::{parse_date, today},
        db_utils::history_on,
        phone::normalize_phone,
    },
    whatsapp::{SendError, WhatsAppClient, format_recap_message},
};

#[derive(Deserialize, ToSchema)]
pub struct SendMessage {
    #[schema(example = "081234567890")]
    pub phone: Option<String>,
    #[schema(example = "Absensi 15 Januari 2025")]
    pub message: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SendRecap {
    #[schema(example = "081234567890")]
    pub phone: Option<String>,
    /// Day to report, `YYYY-MM-DD`; defaults to today
    #[schema(example = "2025-01-15")]
    pub tanggal: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SendResponse {
    #[schema(example = "Pesan WhatsApp berhasil dikirim")]
    pub message: String,
    /// Raw reply of the gateway
    #[schema(value_type = Object)]
    pub result: Value,
}

fn target_phone(phone: Option<&str>) -> Result<String, ApiError> {
    normalize_phone(phone.unwrap_or_default())
        .ok_or_else(|| ApiError::bad_request("Format nomor WhatsApp tidak valid"))
}

async fn deliver(
    client: &WhatsAppClient,
    target: &str,
    message: &str,
) -> Result<HttpResponse, ApiError> {
    let result = client.send(target, message).await.map_err(|e| match e {
        SendError::NotConfigured => {
            ApiError::ServiceUnavailable("Layanan WhatsApp belum dikonfigurasi".to_string())
        }
        other => ApiError::BadGateway {
            message: "Gagal mengirim pesan WhatsApp".to_string(),
            detail: other.to_string(),
        },
    })?;

    info!(to = target, "WhatsApp message sent");

    Ok(HttpResponse::Ok().json(SendResponse {
        message: "Pesan WhatsApp berhasil dikirim".to_string(),
        result,
    }))
}

/// Send a free-form WhatsApp message
#[utoipa::path(
    post,
    path = "/api/admin/whatsapp/send",
    request_body = SendMessage,
    responses(
        (status = 200, description = "Delivered to the gateway", body = SendResponse),
        (status = 400, description = "Missing fields or invalid number", body = MessageResponse),
        (status = 502, description = "Gateway failure"),
        (status = 503, description = "Gateway not configured", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "WhatsApp"
)]
#[instrument(skip_all)]
pub async fn send_whatsapp(
    client: web::Data<WhatsAppClient>,
    payload: web::Json<SendMessage>,
) -> Result<HttpResponse, ApiError> {
    let phone = payload.phone.as_deref().map(str::trim).unwrap_or_default();
    let message = payload.message.as_deref().map(str::trim).unwrap_or_default();
    if phone.is_empty() || message.is_empty() {
        return Err(ApiError::bad_request("Nomor WhatsApp dan pesan wajib diisi"));
    }

    let target = target_phone(Some(phone))?;
    deliver(&client, &target, message).await
}

/// Send a day's attendance recap
#[utoipa::path(
    post,
    path = "/api/admin/whatsapp/recap",
    request_body = SendRecap,
    responses(
        (status = 200, description = "Recap delivered to the gateway", body = SendResponse),
        (status = 400, description = "Missing or invalid number or date", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse),
        (status = 502, description = "Gateway failure"),
        (status = 503, description = "Gateway not configured", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "WhatsApp"
)]
#[instrument(skip_all)]
pub async fn send_recap(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    client: web::Data<WhatsAppClient>,
    payload: web::Json<SendRecap>,
) -> Result<HttpResponse, ApiError> {
    let phone = payload.phone.as_deref().map(str::trim).unwrap_or_default();
    if phone.is_empty() {
        return Err(ApiError::bad_request("Nomor WhatsApp wajib diisi"));
    }
    let target = target_phone(Some(phone))?;

    let tanggal = match payload.tanggal.as_deref().map(str::trim) {
        None | Some("") => today(config.tz_offset),
        Some(raw) => parse_date(raw).ok_or_else(|| ApiError::bad_request("Format tanggal tidak valid"))?,
    };

    let records = history_on(pool.get_ref(), tanggal)
        .await
        .map_err(|e| ApiError::db(e, "Gagal mengambil data history"))?;

    let message = format_recap_message(Some(tanggal), &records);
    deliver(&client, &target, &message).await
}
