use std::collections::{HashMap, HashSet};

use actix_web::{HttpResponse, web};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::{
    api::siswa::without_attendance,
    config::Config,
    error::ApiError,
    model::{
        history::History,
        siswa::{SiswaProfile, attendance_key},
        status::{AttendanceStatus, MachineStatus},
    },
    utils::{
        aggregate::{
            MonthStats, StatusCounts, StatusPercentages, TotalStats, machine_status, percent,
            stats_by_month,
        },
        calendar::today,
        db_utils::{PROFILE_COLUMNS, actions_on, history_on, profile_by_nis},
    },
};

/// Window of the per-student statistics.
const STATISTICS_DAYS: u64 = 365;

#[derive(Debug, Serialize, ToSchema)]
pub struct RecapCounts {
    pub hadir: u32,
    pub sakit: u32,
    pub izin: u32,
    pub alpha: u32,
    pub total: u32,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecapResponse {
    #[schema(example = "Rekap hari ini berhasil diambil")]
    pub message: String,
    #[schema(value_type = String, example = "2025-01-15")]
    pub tanggal: NaiveDate,
    pub machine_status: MachineStatus,
    pub total_siswa: usize,
    pub counts: RecapCounts,
    /// Share of all siswa, one decimal
    pub percentages: StatusPercentages,
    pub belum_absen: Vec<SiswaProfile>,
    pub records: Vec<History>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnalysis {
    pub id: i64,
    pub nama: String,
    pub nis: String,
    pub total: u32,
    pub hadir: u32,
    pub sakit: u32,
    pub izin: u32,
    pub alpha: u32,
    /// Hadir over all recorded days, one decimal
    pub persentase_kehadiran: f64,
}

#[derive(Serialize, ToSchema)]
pub struct StudentAnalysisResponse {
    #[schema(example = "Analisis siswa berhasil diambil")]
    pub message: String,
    pub students: Vec<StudentAnalysis>,
}

#[derive(Serialize, ToSchema)]
pub struct StatisticsSiswa {
    pub id: i64,
    pub nama: String,
    pub nis: String,
    pub rfid: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentStatisticsResponse {
    #[schema(example = "Statistik siswa berhasil diambil")]
    pub message: String,
    pub siswa: StatisticsSiswa,
    pub total_stats: TotalStats,
    pub percentages: StatusPercentages,
    pub monthly_stats: Vec<MonthStats>,
}

/// Counts today's rows by exact status.
pub fn count_records(records: &[History]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for status in records
        .iter()
        .filter_map(|r| AttendanceStatus::parse_exact(&r.status))
    {
        counts.add(status);
    }
    counts
}

/// One entry per siswa, lowest attendance first, ties by name.
pub fn analyse_students(siswa: Vec<SiswaProfile>, rows: &[(String, String)]) -> Vec<StudentAnalysis> {
    let mut per_nis: HashMap<&str, StatusCounts> = HashMap::new();
    for (nis, status) in rows {
        if let Some(status) = AttendanceStatus::parse_loose(status) {
            per_nis.entry(nis.as_str()).or_default().add(status);
        }
    }

    let mut students: Vec<StudentAnalysis> = siswa
        .into_iter()
        .map(|s| {
            let counts = per_nis.get(s.nis.as_str()).copied().unwrap_or_default();
            StudentAnalysis {
                id: s.id,
                total: counts.total(),
                hadir: counts.hadir,
                sakit: counts.sakit,
                izin: counts.izin,
                alpha: counts.alpha,
                persentase_kehadiran: percent(counts.hadir, counts.total()),
                nama: s.nama,
                nis: s.nis,
            }
        })
        .collect();

    students.sort_by(|a, b| {
        a.persentase_kehadiran
            .total_cmp(&b.persentase_kehadiran)
            .then_with(|| a.nama.cmp(&b.nama))
    });
    students
}

/// Today's recap for the admin panel
#[utoipa::path(
    get,
    path = "/api/admin/recap/today",
    responses(
        (status = 200, description = "Counts, percentages and missing siswa for today", body = RecapResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Recap"
)]
pub async fn today_recap(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let tanggal = today(config.tz_offset);

    let siswa = sqlx::query_as::<_, SiswaProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM siswa_xirpl ORDER BY nama ASC"
    ))
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| ApiError::db(e, "Gagal mengambil data siswa"))?;

    let records = history_on(pool.get_ref(), tanggal)
        .await
        .map_err(|e| ApiError::db(e, "Gagal mengambil data history"))?;

    let actions = actions_on(pool.get_ref(), tanggal)
        .await
        .map_err(|e| ApiError::db(e, "Gagal mengambil data mesin"))?;

    let counts = count_records(&records);
    let total_siswa = siswa.len();
    let taken: HashSet<(String, String)> = records
        .iter()
        .map(|r| attendance_key(&r.nis, r.rfid.as_deref()))
        .collect();
    let belum_absen = without_attendance(siswa, &taken);

    Ok(HttpResponse::Ok().json(RecapResponse {
        message: "Rekap hari ini berhasil diambil".to_string(),
        tanggal,
        machine_status: machine_status(&actions),
        total_siswa,
        counts: RecapCounts {
            hadir: counts.hadir,
            sakit: counts.sakit,
            izin: counts.izin,
            alpha: counts.alpha,
            total: counts.total(),
        },
        percentages: counts.percentages(u32::try_from(total_siswa).unwrap_or(u32::MAX)),
        belum_absen,
        records,
    }))
}

/// Attendance ranking of every siswa
#[utoipa::path(
    get,
    path = "/api/admin/analysis/students",
    responses(
        (status = 200, description = "Per-siswa counters, lowest attendance first", body = StudentAnalysisResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Recap"
)]
pub async fn student_analysis(pool: web::Data<PgPool>) -> Result<HttpResponse, ApiError> {
    let siswa = sqlx::query_as::<_, SiswaProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM siswa_xirpl ORDER BY id ASC"
    ))
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| ApiError::db(e, "Gagal mengambil data siswa"))?;

    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT COALESCE(nis, '') AS nis, COALESCE(status, '') AS status FROM history",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| ApiError::db(e, "Gagal mengambil data history"))?;

    Ok(HttpResponse::Ok().json(StudentAnalysisResponse {
        message: "Analisis siswa berhasil diambil".to_string(),
        students: analyse_students(siswa, &rows),
    }))
}

/// One year of statistics for a siswa
#[utoipa::path(
    get,
    path = "/api/admin/statistics/student/{nis}",
    params(("nis" = String, Path, description = "Student NIS")),
    responses(
        (status = 200, description = "Totals and per-month counters", body = StudentStatisticsResponse),
        (status = 404, description = "Unknown NIS", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Recap"
)]
pub async fn student_statistics(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let nis = path.into_inner();

    let siswa = profile_by_nis(pool.get_ref(), nis.trim())
        .await
        .map_err(|e| ApiError::db(e, "Gagal mengambil data siswa"))?
        .ok_or_else(|| ApiError::not_found("Data siswa tidak ditemukan"))?;

    let today = today(config.tz_offset);
    let since = today
        .checked_sub_days(Days::new(STATISTICS_DAYS))
        .unwrap_or(NaiveDate::MIN);

    let records = sqlx::query_as::<_, (NaiveDate, String)>(
        r#"
        SELECT tanggal, COALESCE(status, '') AS status
        FROM history
        WHERE nis = $1 AND tanggal >= $2 AND tanggal <= $3
        ORDER BY tanggal DESC
        "#,
    )
    .bind(&siswa.nis)
    .bind(since)
    .bind(today)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| ApiError::db(e, "Gagal mengambil data history"))?;

    let (monthly_stats, total) = stats_by_month(&records);

    Ok(HttpResponse::Ok().json(StudentStatisticsResponse {
        message: "Statistik siswa berhasil diambil".to_string(),
        siswa: StatisticsSiswa {
            id: siswa.id,
            nama: siswa.nama,
            nis: siswa.nis,
            rfid: siswa.rfid,
        },
        total_stats: total.into(),
        percentages: total.percentages(total.total()),
        monthly_stats,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: i64, nama: &str, nis: &str) -> SiswaProfile {
        SiswaProfile {
            id,
            nama: nama.into(),
            nis: nis.into(),
            rfid: None,
            role: None,
        }
    }

    fn row(nis: &str, status: &str) -> (String, String) {
        (nis.to_string(), status.to_string())
    }

    #[test]
    fn analysis_ranks_lowest_attendance_first() {
        let siswa = vec![
            profile(1, "Citra", "100"),
            profile(2, "Andi", "200"),
            profile(3, "Budi", "300"),
        ];
        let rows = vec![
            row("100", "Hadir"),
            row("100", "Hadir"),
            row("200", "Hadir"),
            row("200", "alpha"),
            row("200", "Izin"),
            row("999", "Hadir"),
        ];

        let students = analyse_students(siswa, &rows);
        let order: Vec<_> = students.iter().map(|s| s.nama.as_str()).collect();
        // Budi has no records (0%), Andi 33.3%, Citra 100%
        assert_eq!(order, vec!["Budi", "Andi", "Citra"]);

        let andi = &students[1];
        assert_eq!((andi.total, andi.hadir, andi.izin, andi.alpha), (3, 1, 1, 1));
        assert_eq!(andi.persentase_kehadiran, 33.3);
        assert_eq!(students[2].persentase_kehadiran, 100.0);
    }

    #[test]
    fn ties_are_broken_by_name() {
        let siswa = vec![profile(1, "Zaki", "1"), profile(2, "Ayu", "2")];
        let students = analyse_students(siswa, &[]);
        assert_eq!(students[0].nama, "Ayu");
    }

    #[test]
    fn recap_counts_use_exact_statuses() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let records: Vec<History> = ["Hadir", "Hadir", "Sakit", "hadir"]
            .iter()
            .enumerate()
            .map(|(i, status)| History {
                id: i as i64,
                nis: i.to_string(),
                nama: None,
                role: None,
                rfid: None,
                tanggal: day,
                waktu: None,
                status: status.to_string(),
            })
            .collect();

        let counts = count_records(&records);
        assert_eq!(counts.hadir, 2);
        assert_eq!(counts.sakit, 1);
        assert_eq!(counts.total(), 3);
    }
}
