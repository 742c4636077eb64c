use crate::{
    api::{action, dashboard, history, public, recap, siswa, whatsapp},
    auth::{
        handlers,
        middleware::{admin_middleware, auth_middleware},
    },
    config::Config,
    error::ApiError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build a per-peer limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let burst = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(burst)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(burst)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("limiter period and burst are non-zero");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Malformed JSON bodies answer with the usual `{message}` shape
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::bad_request(format!("Format data tidak valid: {err}")).into()
    }));

    // Public routes
    cfg.route("/", web::get().to(public::index));
    cfg.service(
        web::resource(format!("{}/config", config.api_prefix))
            .route(web::get().to(public::public_config)),
    );

    cfg.service(
        web::scope("/auth").service(
            web::resource("/login")
                .wrap(login_limiter)
                .route(web::post().to(handlers::login)),
        ),
    );

    // Student dashboard
    cfg.service(
        web::scope("/dashboard")
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter.clone()) // rate limiting
            .service(web::resource("").route(web::get().to(dashboard::get_dashboard)))
            .service(web::resource("/history").route(web::get().to(dashboard::history_per_month)))
            .service(web::resource("/analytics").route(web::get().to(dashboard::analytics))),
    );

    // Admin routes; the last wrap runs first: limiter, authentication, admin check
    cfg.service(
        web::scope(&format!("{}/admin", config.api_prefix))
            .wrap(from_fn(admin_middleware))
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/siswa")
                    // /siswa
                    .service(web::resource("").route(web::get().to(siswa::list_siswa)))
                    // /siswa/belum-absen
                    .service(
                        web::resource("/belum-absen").route(web::get().to(siswa::siswa_belum_absen)),
                    )
                    // /siswa/update
                    .service(web::resource("/update").route(web::post().to(siswa::update_siswa))),
            )
            .service(
                web::scope("/history")
                    // /history
                    .service(
                        web::resource("")
                            .route(web::get().to(history::list_history))
                            .route(web::post().to(history::create_history)),
                    )
                    // /history/{id}
                    .service(
                        web::resource("/{id}").route(web::delete().to(history::delete_history)),
                    )
                    // /history/{id}/status
                    .service(
                        web::resource("/{id}/status")
                            .route(web::put().to(history::update_history_status)),
                    ),
            )
            .service(
                web::resource("/action")
                    .route(web::get().to(action::get_action_today))
                    .route(web::post().to(action::set_action_today))
                    .route(web::put().to(action::set_action_today)),
            )
            .service(web::resource("/recap/today").route(web::get().to(recap::today_recap)))
            .service(
                web::resource("/analysis/students").route(web::get().to(recap::student_analysis)),
            )
            .service(
                web::resource("/statistics/student/{nis}")
                    .route(web::get().to(recap::student_statistics)),
            )
            .service(
                web::scope("/whatsapp")
                    .service(web::resource("/send").route(web::post().to(whatsapp::send_whatsapp)))
                    .service(web::resource("/recap").route(web::post().to(whatsapp::send_recap))),
            ),
    );

    cfg.default_service(web::to(public::not_found));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_token;
    use crate::whatsapp::WhatsAppClient;
    use actix_web::{App, http::StatusCode, test, web::Data};
    use serde_json::{Value, json};
    use sqlx::postgres::PgPoolOptions;

    const SECRET: &str = "route-test-secret";

    fn test_config(extra: &[(&str, &str)]) -> Config {
        let mut pairs = vec![
            ("DATABASE_URL", "postgres://absensi@localhost/absensi"),
            ("JWT_SECRET", SECRET),
        ];
        pairs.extend_from_slice(extra);
        Config::from_lookup(move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    // The pool never connects: every request below settles before a query runs.
    macro_rules! app {
        ($config:expr) => {{
            let config: Config = $config;
            let pool = PgPoolOptions::new()
                .connect_lazy(&config.database_url)
                .unwrap();
            let client = WhatsAppClient::new(config.whatsapp_api_url.clone(), None).unwrap();
            let routes_config = config.clone();
            test::init_service(
                App::new()
                    .app_data(Data::new(pool))
                    .app_data(Data::new(config))
                    .app_data(Data::new(client))
                    .configure(move |cfg| configure(cfg, routes_config.clone())),
            )
            .await
        }};
    }

    fn peer() -> std::net::SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[actix_web::test]
    async fn index_reports_running() {
        let app = app!(test_config(&[]));
        let req = test::TestRequest::get().uri("/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "message": "Backend is running" }));
    }

    #[actix_web::test]
    async fn unknown_route_is_json_404() {
        let app = app!(test_config(&[]));
        let req = test::TestRequest::get().uri("/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Route tidak ditemukan");
    }

    #[actix_web::test]
    async fn public_config_needs_both_values() {
        let app = app!(test_config(&[("SUPABASE_URL", "https://x.supabase.co")]));
        let req = test::TestRequest::get().uri("/api/config").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let app = app!(test_config(&[
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]));
        let req = test::TestRequest::get().uri("/api/config").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body,
            json!({ "supabaseUrl": "https://x.supabase.co", "supabaseAnonKey": "anon" })
        );
    }

    #[actix_web::test]
    async fn login_requires_nama_and_nis() {
        let app = app!(test_config(&[]));
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .peer_addr(peer())
            .set_json(json!({ "nama": "  ", "nis": "123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Nama dan NIS wajib diisi");
    }

    #[actix_web::test]
    async fn malformed_json_gets_message_body() {
        let app = app!(test_config(&[]));
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .peer_addr(peer())
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().starts_with("Format data tidak valid"));
    }

    #[actix_web::test]
    async fn dashboard_without_token_is_401() {
        let app = app!(test_config(&[]));
        let req = test::TestRequest::get()
            .uri("/dashboard")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Token tidak ditemukan");
    }

    #[actix_web::test]
    async fn admin_with_bad_token_is_403() {
        let app = app!(test_config(&[]));
        let req = test::TestRequest::get()
            .uri("/api/admin/siswa")
            .peer_addr(peer())
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn token_signed_with_another_secret_is_403() {
        let app = app!(test_config(&[]));
        let token = generate_token(1, "Budi".into(), "12345".into(), "other-secret", 3600).unwrap();
        let req = test::TestRequest::get()
            .uri("/dashboard/analytics")
            .peer_addr(peer())
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn login_limiter_kicks_in() {
        let app = app!(test_config(&[("RATE_LOGIN_PER_MIN", "1")]));
        let login = || {
            test::TestRequest::post()
                .uri("/auth/login")
                .peer_addr(peer())
                .set_json(json!({}))
                .to_request()
        };
        let first = test::call_service(&app, login()).await;
        assert_eq!(first.status(), StatusCode::BAD_REQUEST);
        let second = test::call_service(&app, login()).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
