use chrono::NaiveDate;
use serde_json::{Map, Value};
use sqlx::PgPool;

use crate::error::ApiError;
use crate::model::action::Action;
use crate::model::history::History;
use crate::model::siswa::SiswaProfile;

pub const HISTORY_COLUMNS: &str = "id, COALESCE(nis, '') AS nis, nama, role, rfid, tanggal, waktu, \
     COALESCE(status, '') AS status";
pub const ACTION_COLUMNS: &str = "id, nama, tanggal, COALESCE(status, '') AS status";
pub const PROFILE_COLUMNS: &str =
    "id, COALESCE(nama, '') AS nama, COALESCE(nis, '') AS nis, rfid, role";

/// ===============================
/// Shared lookups
/// ===============================
pub async fn fetch_profile(pool: &PgPool, id: i64) -> Result<Option<SiswaProfile>, sqlx::Error> {
    sqlx::query_as::<_, SiswaProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM siswa_xirpl WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn profile_by_nis(pool: &PgPool, nis: &str) -> Result<Option<SiswaProfile>, sqlx::Error> {
    sqlx::query_as::<_, SiswaProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM siswa_xirpl WHERE nis = $1 ORDER BY id LIMIT 1"
    ))
    .bind(nis)
    .fetch_optional(pool)
    .await
}

pub async fn actions_on(pool: &PgPool, tanggal: NaiveDate) -> Result<Vec<Action>, sqlx::Error> {
    sqlx::query_as::<_, Action>(&format!(
        "SELECT {ACTION_COLUMNS} FROM action WHERE tanggal = $1 ORDER BY id"
    ))
    .bind(tanggal)
    .fetch_all(pool)
    .await
}

pub async fn history_on(pool: &PgPool, tanggal: NaiveDate) -> Result<Vec<History>, sqlx::Error> {
    sqlx::query_as::<_, History>(&format!(
        "SELECT {HISTORY_COLUMNS} FROM history WHERE tanggal = $1 \
         ORDER BY waktu DESC NULLS LAST, id DESC"
    ))
    .bind(tanggal)
    .fetch_all(pool)
    .await
}

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    I64(i64),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Only keys listed in `allowed` are written, in that order; other keys are
/// ignored. Columns are text, so numbers are stored as their decimal form.
/// Returns `None` when the payload names no writable column.
pub fn build_update_sql(
    table: &str,
    payload: &Map<String, Value>,
    allowed: &[&str],
    id_column: &str,
    id_value: i64,
) -> Result<Option<SqlUpdate>, ApiError> {
    let mut columns = Vec::new();
    let mut values = Vec::new();

    for column in allowed {
        let Some(value) = payload.get(*column) else {
            continue;
        };
        let value = match value {
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Number(n) => SqlValue::Text(n.to_string()),
            Value::Null => SqlValue::Null,
            _ => {
                return Err(ApiError::bad_request(format!(
                    "Nilai {column} tidak valid"
                )));
            }
        };
        columns.push(*column);
        values.push(value);
    }

    if columns.is_empty() {
        return Ok(None);
    }

    let set_clause = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ${}", c, i + 1))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        table,
        set_clause,
        id_column,
        columns.len() + 1
    );

    // WHERE id = $n
    values.push(SqlValue::I64(id_value));

    Ok(Some(SqlUpdate { sql, values }))
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &PgPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::Text(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[&str] = &["nama", "nis", "rfid", "role", "password"];

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn writes_only_supplied_allowed_columns() {
        let payload = object(json!({
            "id": 4,
            "rfid": "0A1B",
            "nama": "Budi",
            "is_admin": true
        }));

        let update = build_update_sql("siswa_xirpl", &payload, COLUMNS, "id", 4)
            .unwrap()
            .unwrap();
        assert_eq!(
            update.sql,
            "UPDATE siswa_xirpl SET nama = $1, rfid = $2 WHERE id = $3"
        );
        assert_eq!(
            update.values,
            vec![
                SqlValue::Text("Budi".into()),
                SqlValue::Text("0A1B".into()),
                SqlValue::I64(4)
            ]
        );
    }

    #[test]
    fn null_clears_and_numbers_become_text() {
        let payload = object(json!({ "nis": 12345, "rfid": null }));
        let update = build_update_sql("siswa_xirpl", &payload, COLUMNS, "id", 1)
            .unwrap()
            .unwrap();
        assert_eq!(
            update.values,
            vec![SqlValue::Text("12345".into()), SqlValue::Null, SqlValue::I64(1)]
        );
    }

    #[test]
    fn nothing_to_write_yields_none() {
        let payload = object(json!({ "id": 1 }));
        assert!(build_update_sql("siswa_xirpl", &payload, COLUMNS, "id", 1)
            .unwrap()
            .is_none());
    }

    #[test]
    fn nested_values_are_rejected() {
        let payload = object(json!({ "role": ["admin"] }));
        assert!(build_update_sql("siswa_xirpl", &payload, COLUMNS, "id", 1).is_err());
    }
}
