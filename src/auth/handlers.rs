use actix_web::{HttpResponse, web};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::{
    auth::jwt::generate_token,
    config::Config,
    error::ApiError,
    model::siswa::{Siswa, SiswaProfile},
    models::{LoginReqDto, non_blank},
};

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = "Login berhasil")]
    pub message: String,
    pub token: String,
    pub siswa: SiswaProfile,
}

/// Login with name and NIS
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Nama or NIS missing", body = MessageResponse),
        (status = 401, description = "Wrong credentials", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(nis = user.nis.as_deref().unwrap_or_default())
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    let (Some(nama), Some(nis)) = (non_blank(user.nama.as_deref()), non_blank(user.nis.as_deref())) else {
        info!("Validation failed: empty nama or nis");
        return Err(ApiError::bad_request("Nama dan NIS wajib diisi"));
    };

    debug!("Fetching siswa from database");

    let siswa = sqlx::query_as::<_, Siswa>(
        r#"
        SELECT id, nama, nis, rfid, role, password
        FROM siswa_xirpl
        WHERE nama = $1 AND nis = $2
        LIMIT 1
        "#,
    )
    .bind(nama)
    .bind(nis)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| ApiError::db(e, "Terjadi kesalahan pada server"))?;

    let Some(siswa) = siswa else {
        info!("Invalid credentials: siswa not found");
        return Err(ApiError::Unauthorized("Nama atau NIS salah".into()));
    };

    // plaintext comparison against the stored value
    if let Some(password) = user.password.as_deref() {
        if siswa.password.as_deref() != Some(password) {
            info!(siswa_id = siswa.id, "Invalid credentials: password mismatch");
            return Err(ApiError::Unauthorized("Nama atau NIS salah".into()));
        }
    }

    let token = generate_token(
        siswa.id,
        siswa.nama.clone(),
        siswa.nis.clone(),
        &config.jwt_secret,
        config.token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign token");
        ApiError::internal("Terjadi kesalahan pada server")
    })?;

    info!(siswa_id = siswa.id, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        message: "Login berhasil".to_string(),
        token,
        siswa: SiswaProfile {
            id: siswa.id,
            nama: siswa.nama,
            nis: siswa.nis,
            rfid: siswa.rfid,
            role: siswa.role,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{config, lazy_pool, rejection};

    fn body(nama: Option<&str>, nis: Option<&str>) -> web::Json<LoginReqDto> {
        web::Json(LoginReqDto {
            nama: nama.map(String::from),
            nis: nis.map(String::from),
            password: None,
        })
    }

    #[actix_web::test]
    async fn blank_nama_or_nis_is_rejected_before_lookup() {
        for (nama, nis) in [(None, Some("12345")), (Some("Budi"), Some("   ")), (Some(""), None)] {
            let err = rejection(login(body(nama, nis), lazy_pool(), config()).await);
            assert!(matches!(err, ApiError::BadRequest(_)));
            assert_eq!(err.to_string(), "Nama dan NIS wajib diisi");
        }
    }
}
