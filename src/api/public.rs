use actix_web::{HttpResponse, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{config::Config, error::ApiError, models::MessageResponse};

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    #[schema(example = "https://project.supabase.co")]
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service is up", body = MessageResponse)
    ),
    tag = "Public"
)]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse::new("Backend is running"))
}

/// Realtime settings for the browser dashboards
#[utoipa::path(
    get,
    path = "/api/config",
    responses(
        (status = 200, description = "Realtime client settings", body = PublicConfig),
        (status = 404, description = "Realtime is not configured", body = MessageResponse)
    ),
    tag = "Public"
)]
pub async fn public_config(config: web::Data<Config>) -> Result<HttpResponse, ApiError> {
    match (&config.supabase_url, &config.supabase_anon_key) {
        (Some(url), Some(key)) => Ok(HttpResponse::Ok().json(PublicConfig {
            supabase_url: url.clone(),
            supabase_anon_key: key.clone(),
        })),
        _ => Err(ApiError::not_found("Konfigurasi realtime tidak tersedia")),
    }
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(MessageResponse::new("Route tidak ditemukan"))
}
