use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::error::ApiError;
use crate::models::Claims;

/// The logged-in siswa, attached to the request by the authenticate middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// `siswa_xirpl.id`; name and role are re-read from the row when needed
    pub id: i64,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser { id: claims.id }
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ApiError::Unauthorized("Token tidak ditemukan".into())),
        )
    }
}
