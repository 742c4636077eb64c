use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::web::Data;
use actix_web::{Error, HttpMessage, ResponseError};
use sqlx::PgPool;
use tracing::{debug, error};

use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::siswa::is_admin_role;

fn reject(req: ServiceRequest, err: ApiError) -> Result<ServiceResponse<BoxBody>, Error> {
    Ok(req.into_response(err.error_response()))
}

/// Verifies the bearer token and attaches the [`AuthUser`] to the request.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let Some(config) = req.app_data::<Data<Config>>().cloned() else {
        error!("App config missing");
        return reject(req, ApiError::internal("Konfigurasi server tidak lengkap"));
    };

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(' ').nth(1))
        .filter(|t| !t.is_empty())
        .map(str::to_owned);

    let Some(token) = token else {
        return reject(req, ApiError::Unauthorized("Token tidak ditemukan".into()));
    };

    let claims = match verify_token(&token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "JWT verification failed");
            return reject(
                req,
                ApiError::Forbidden(
                    "Token tidak valid atau telah kedaluwarsa. Silakan login kembali.".into(),
                ),
            );
        }
    };

    req.extensions_mut().insert(AuthUser::from(claims));

    next.call(req)
        .await
        .map(ServiceResponse::map_into_boxed_body)
}

/// Lets the request through only when the user's current role is admin.
/// Runs after [`auth_middleware`].
pub async fn admin_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let user_id = req.extensions().get::<AuthUser>().map(|user| user.id);
    let Some(user_id) = user_id else {
        return reject(req, ApiError::Unauthorized("Token tidak ditemukan".into()));
    };

    let Some(pool) = req.app_data::<Data<PgPool>>().cloned() else {
        error!("Database pool missing");
        return reject(req, ApiError::internal("Konfigurasi server tidak lengkap"));
    };

    // role is re-read so that revoking admin takes effect immediately
    let role = sqlx::query_scalar::<_, Option<String>>("SELECT role FROM siswa_xirpl WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await;

    let role = match role {
        Ok(role) => role,
        Err(e) => {
            error!(error = %e, user_id, "Admin check failed");
            return reject(
                req,
                ApiError::internal("Terjadi kesalahan saat memverifikasi akses admin"),
            );
        }
    };

    match admin_access(role) {
        Ok(()) => next
            .call(req)
            .await
            .map(ServiceResponse::map_into_boxed_body),
        Err(err) => reject(req, err),
    }
}

/// `None` when the user row is gone, `Some(role)` otherwise.
fn admin_access(row: Option<Option<String>>) -> Result<(), ApiError> {
    match row {
        Some(role) if is_admin_role(role.as_deref()) => Ok(()),
        Some(_) => Err(ApiError::Forbidden(
            "Akses ditolak. Hanya admin yang dapat mengakses fitur ini.".into(),
        )),
        None => Err(ApiError::not_found("Data user tidak ditemukan")),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;

    use super::*;

    #[test]
    fn admin_role_passes() {
        assert!(admin_access(Some(Some("admin".into()))).is_ok());
    }

    #[test]
    fn other_roles_are_forbidden() {
        for role in [Some("siswa".to_string()), None] {
            let err = admin_access(Some(role)).unwrap_err();
            assert_eq!(err.error_response().status(), StatusCode::FORBIDDEN);
            assert_eq!(
                err.to_string(),
                "Akses ditolak. Hanya admin yang dapat mengakses fitur ini."
            );
        }
    }

    #[test]
    fn deleted_user_is_not_found() {
        let err = admin_access(None).unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Data user tidak ditemukan");
    }
}
