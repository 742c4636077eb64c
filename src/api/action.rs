use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    config::Config,
    error::ApiError,
    model::{
        action::{Action, DEFAULT_ACTION_NAME},
        status::MachineStatus,
    },
    utils::{
        calendar::today,
        db_utils::{ACTION_COLUMNS, actions_on},
    },
};

#[derive(Serialize, ToSchema)]
pub struct ActionResponse {
    #[schema(example = "Data action berhasil diambil")]
    pub message: String,
    #[schema(nullable = true)]
    pub action: Option<Action>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetAction {
    /// Name for a newly created row, defaults to `absensi`
    #[schema(example = "absensi")]
    pub nama: Option<String>,
    #[schema(example = "Active")]
    pub status: Option<String>,
}

/// Today's machine flag
#[utoipa::path(
    get,
    path = "/api/admin/action",
    responses(
        (status = 200, description = "Today's action row or null", body = ActionResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Action"
)]
pub async fn get_action_today(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let action = actions_on(pool.get_ref(), today(config.tz_offset))
        .await
        .map_err(|e| ApiError::db(e, "Gagal mengambil data action"))?
        .into_iter()
        .next();

    Ok(HttpResponse::Ok().json(ActionResponse {
        message: "Data action berhasil diambil".to_string(),
        action,
    }))
}

/// Turn the machine on or off for today
#[utoipa::path(
    post,
    path = "/api/admin/action",
    request_body = SetAction,
    responses(
        (status = 200, description = "Row created or updated", body = ActionResponse),
        (status = 400, description = "Invalid status", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Action"
)]
pub async fn set_action_today(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    payload: web::Json<SetAction>,
) -> Result<HttpResponse, ApiError> {
    let status: MachineStatus = payload
        .status
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ApiError::bad_request("Status tidak valid"))?;
    let tanggal = today(config.tz_offset);

    let existing = actions_on(pool.get_ref(), tanggal)
        .await
        .map_err(|e| ApiError::db(e, "Gagal memeriksa data action"))?
        .into_iter()
        .next();

    let (action, message) = match existing {
        Some(existing) => {
            let updated = sqlx::query_as::<_, Action>(&format!(
                "UPDATE action SET status = $1 WHERE id = $2 RETURNING {ACTION_COLUMNS}"
            ))
            .bind(status.as_ref())
            .bind(existing.id)
            .fetch_one(pool.get_ref())
            .await
            .map_err(|e| ApiError::db(e, "Gagal memperbarui data action"))?;
            (updated, "Status action berhasil diperbarui")
        }
        None => {
            let nama = payload
                .nama
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(DEFAULT_ACTION_NAME);
            let created = sqlx::query_as::<_, Action>(&format!(
                "INSERT INTO action (nama, tanggal, status) VALUES ($1, $2, $3) \
                 RETURNING {ACTION_COLUMNS}"
            ))
            .bind(nama)
            .bind(tanggal)
            .bind(status.as_ref())
            .fetch_one(pool.get_ref())
            .await
            .map_err(|e| ApiError::db(e, "Gagal membuat data action"))?;
            (created, "Data action berhasil dibuat")
        }
    };

    info!(action_id = action.id, %status, %tanggal, "Machine status set");

    Ok(HttpResponse::Ok().json(ActionResponse {
        message: message.to_string(),
        action: Some(action),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{config, lazy_pool, rejection};

    fn body(status: Option<&str>) -> web::Json<SetAction> {
        web::Json(SetAction {
            nama: None,
            status: status.map(String::from),
        })
    }

    #[actix_web::test]
    async fn only_active_or_nonactive_is_accepted() {
        for status in [None, Some(""), Some("active"), Some("Off")] {
            let err = rejection(set_action_today(lazy_pool(), config(), body(status)).await);
            assert!(matches!(err, ApiError::BadRequest(_)));
            assert_eq!(err.to_string(), "Status tidak valid");
        }
    }
}
