//! Helpers for handler tests that settle before the first query.

use actix_web::{HttpResponse, web};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;
use crate::error::ApiError;

/// Nothing listens on port 1, so any query that does run fails.
pub const UNREACHABLE_DB: &str = "postgres://absensi@127.0.0.1:1/absensi";

pub fn lazy_pool() -> web::Data<PgPool> {
    web::Data::new(PgPoolOptions::new().connect_lazy(UNREACHABLE_DB).unwrap())
}

pub fn config() -> web::Data<Config> {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some(UNREACHABLE_DB.to_string()),
        "JWT_SECRET" => Some("handler-test-secret".to_string()),
        _ => None,
    })
    .unwrap();
    web::Data::new(config)
}

/// The error a handler answered with; panics when the request was accepted.
pub fn rejection(result: Result<HttpResponse, ApiError>) -> ApiError {
    match result {
        Ok(resp) => panic!("request was accepted with {}", resp.status()),
        Err(e) => e,
    }
}
