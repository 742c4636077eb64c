use std::time::Duration;

use chrono::NaiveDate;
use derive_more::Display;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::model::history::History;
use crate::model::status::AttendanceStatus;
use crate::utils::aggregate::StatusCounts;
use crate::utils::calendar::date_label;

const COUNTRY_CODE: &str = "62";

#[derive(Debug, Display)]
pub enum SendError {
    #[display(fmt = "WhatsApp gateway is not configured")]
    NotConfigured,

    #[display(fmt = "gateway request failed: {}", _0)]
    Transport(reqwest::Error),

    #[display(fmt = "{}", _0)]
    Rejected(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    target: &'a str,
    message: &'a str,
    country_code: &'a str,
}

/// Client for the third-party WhatsApp gateway (Fonnte-compatible `/send`).
#[derive(Clone)]
pub struct WhatsAppClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl WhatsAppClient {
    pub fn new(api_url: String, token: Option<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_url,
            token,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    /// Sends `message` to `target` (already in `62…` form) and returns the gateway's reply.
    pub async fn send(&self, target: &str, message: &str) -> Result<Value, SendError> {
        let token = self.token.as_deref().ok_or(SendError::NotConfigured)?;

        debug!(to = target, chars = message.chars().count(), "Sending WhatsApp message");

        let response = self
            .http
            .post(&self.api_url)
            .header(reqwest::header::AUTHORIZATION, token)
            .json(&SendRequest {
                target,
                message,
                country_code: COUNTRY_CODE,
            })
            .send()
            .await
            .map_err(SendError::Transport)?;

        let status = response.status();
        let body: Value = response.json().await.map_err(SendError::Transport)?;

        if !status.is_success() {
            error!(%status, body = %body, "WhatsApp gateway returned an error status");
            return Err(SendError::Rejected(rejection_reason(&body, status.as_str())));
        }

        // the gateway answers 200 with `status: false` on logical failures
        if body.get("status").and_then(Value::as_bool) == Some(false) {
            error!(body = %body, "WhatsApp gateway rejected the message");
            return Err(SendError::Rejected(rejection_reason(&body, "rejected")));
        }

        Ok(body)
    }
}

fn rejection_reason(body: &Value, fallback: &str) -> String {
    ["reason", "detail", "message"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .unwrap_or(fallback)
        .to_string()
}

/// Renders a day's attendance as a WhatsApp text.
///
/// Counts are listed for non-zero statuses only; names are listed for
/// Sakit, Izin and Alpha.
pub fn format_recap_message(tanggal: Option<NaiveDate>, records: &[History]) -> String {
    if records.is_empty() {
        return "Absensi\n\nTidak ada data absensi untuk ditampilkan.".to_string();
    }

    let day = tanggal.unwrap_or(records[0].tanggal);
    let mut message = format!("Absensi {}\n\n", date_label(day));

    let counts = StatusCounts::from_statuses(
        records
            .iter()
            .filter(|r| AttendanceStatus::parse_exact(&r.status).is_some())
            .map(|r| r.status.as_str()),
    );
    let stats: Vec<String> = [
        ("Hadir", counts.hadir),
        ("Sakit", counts.sakit),
        ("Izin", counts.izin),
        ("Alpha", counts.alpha),
    ]
    .iter()
    .filter(|(_, n)| *n > 0)
    .map(|(label, n)| format!("{label}: {n}"))
    .collect();
    if !stats.is_empty() {
        message.push_str(&stats.join("\n"));
        message.push_str("\n\n");
    }

    for status in [
        AttendanceStatus::Sakit,
        AttendanceStatus::Izin,
        AttendanceStatus::Alpha,
    ] {
        let names: Vec<&str> = records
            .iter()
            .filter(|r| r.status == status.as_ref())
            .map(|r| r.nama.as_deref().unwrap_or("N/A"))
            .collect();
        if names.is_empty() {
            continue;
        }
        message.push_str(&format!("{status}:\n"));
        for name in names {
            message.push_str(name);
            message.push('\n');
        }
        message.push('\n');
    }

    message.trim().to_string()
}
