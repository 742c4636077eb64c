//! Attendance aggregation: month grouping, per-status counters and the
//! daily status shown on the student dashboard.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::action::Action;
use crate::model::history::History;
use crate::model::status::{AttendanceStatus, MachineStatus};
use crate::utils::calendar::{month_key, month_label};

/// Per-status counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCounts {
    pub hadir: u32,
    pub sakit: u32,
    pub izin: u32,
    pub alpha: u32,
}

impl StatusCounts {
    pub fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Hadir => self.hadir += 1,
            AttendanceStatus::Sakit => self.sakit += 1,
            AttendanceStatus::Izin => self.izin += 1,
            AttendanceStatus::Alpha => self.alpha += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.hadir + self.sakit + self.izin + self.alpha
    }

    /// Hadir + Sakit + Izin.
    pub fn recorded(&self) -> u32 {
        self.hadir + self.sakit + self.izin
    }

    pub fn percentages(&self, whole: u32) -> StatusPercentages {
        StatusPercentages {
            hadir: percent(self.hadir, whole),
            sakit: percent(self.sakit, whole),
            izin: percent(self.izin, whole),
            alpha: percent(self.alpha, whole),
        }
    }

    /// Counts records whose status matches loosely; anything else is skipped.
    pub fn from_statuses<'a>(statuses: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts = StatusCounts::default();
        for status in statuses.into_iter().filter_map(AttendanceStatus::parse_loose) {
            counts.add(status);
        }
        counts
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct StatusPercentages {
    pub hadir: f64,
    pub sakit: f64,
    pub izin: f64,
    pub alpha: f64,
}

/// `part / whole` as a percentage rounded to one decimal; zero when `whole` is zero.
pub fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (f64::from(part) * 1000.0 / f64::from(whole)).round() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthRef {
    pub bulan: String,
    pub bulan_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthRecord {
    /// Position within the month, 1 for the newest record.
    pub id: usize,
    #[schema(value_type = String, example = "2025-01-15")]
    pub tanggal: NaiveDate,
    #[schema(value_type = String, nullable = true, example = "07:05:12")]
    pub waktu: Option<NaiveTime>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthHistory {
    pub bulan: String,
    pub bulan_key: String,
    pub records: Vec<MonthRecord>,
}

impl MonthHistory {
    pub fn month_ref(&self) -> MonthRef {
        MonthRef {
            bulan: self.bulan.clone(),
            bulan_key: self.bulan_key.clone(),
        }
    }
}

/// Groups a student's records by month, newest month first. Records inside a
/// month are ordered newest first (missing time sorts as midnight) and
/// numbered from 1.
pub fn group_by_month(records: &[History]) -> Vec<MonthHistory> {
    let mut months: BTreeMap<String, (String, Vec<&History>)> = BTreeMap::new();
    for record in records {
        months
            .entry(month_key(record.tanggal))
            .or_insert_with(|| (month_label(record.tanggal), Vec::new()))
            .1
            .push(record);
    }

    months
        .into_iter()
        .rev()
        .map(|(bulan_key, (bulan, mut rows))| {
            rows.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
            let records = rows
                .into_iter()
                .enumerate()
                .map(|(i, r)| MonthRecord {
                    id: i + 1,
                    tanggal: r.tanggal,
                    waktu: r.waktu,
                    status: r.status.clone(),
                })
                .collect();
            MonthHistory {
                bulan,
                bulan_key,
                records,
            }
        })
        .collect()
}

fn sort_key(record: &History) -> (NaiveDate, NaiveTime) {
    (record.tanggal, record.waktu.unwrap_or(NaiveTime::MIN))
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthAnalytics {
    pub bulan: String,
    pub bulan_key: String,
    pub hadir: u32,
    pub sakit: u32,
    pub izin: u32,
    pub alpha: u32,
    pub absen_tercatat: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsTotal {
    pub absen_tercatat: u32,
    pub hadir: u32,
    pub sakit: u32,
    pub izin: u32,
    pub alpha: u32,
}

impl From<StatusCounts> for AnalyticsTotal {
    fn from(c: StatusCounts) -> Self {
        AnalyticsTotal {
            absen_tercatat: c.recorded(),
            hadir: c.hadir,
            sakit: c.sakit,
            izin: c.izin,
            alpha: c.alpha,
        }
    }
}

/// Per-month counters (newest month first) and the overall counter.
pub fn count_by_month(records: &[(NaiveDate, String)]) -> (Vec<(MonthRef, StatusCounts)>, StatusCounts) {
    let mut months: BTreeMap<String, (String, StatusCounts)> = BTreeMap::new();
    let mut total = StatusCounts::default();

    for (tanggal, status) in records {
        let entry = months
            .entry(month_key(*tanggal))
            .or_insert_with(|| (month_label(*tanggal), StatusCounts::default()));
        if let Some(status) = AttendanceStatus::parse_loose(status) {
            entry.1.add(status);
            total.add(status);
        }
    }

    let months = months
        .into_iter()
        .rev()
        .map(|(bulan_key, (bulan, counts))| (MonthRef { bulan, bulan_key }, counts))
        .collect();
    (months, total)
}

/// Monthly analytics for the student dashboard.
pub fn analytics_by_month(records: &[(NaiveDate, String)]) -> (Vec<MonthAnalytics>, AnalyticsTotal) {
    let (months, total) = count_by_month(records);
    let months = months
        .into_iter()
        .map(|(month, c)| MonthAnalytics {
            bulan: month.bulan,
            bulan_key: month.bulan_key,
            hadir: c.hadir,
            sakit: c.sakit,
            izin: c.izin,
            alpha: c.alpha,
            absen_tercatat: c.recorded(),
        })
        .collect();
    (months, total.into())
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthStats {
    pub bulan: String,
    pub bulan_key: String,
    pub total: u32,
    pub hadir: u32,
    pub sakit: u32,
    pub izin: u32,
    pub alpha: u32,
    pub percentages: StatusPercentages,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct TotalStats {
    pub total: u32,
    pub hadir: u32,
    pub sakit: u32,
    pub izin: u32,
    pub alpha: u32,
}

impl From<StatusCounts> for TotalStats {
    fn from(c: StatusCounts) -> Self {
        TotalStats {
            total: c.total(),
            hadir: c.hadir,
            sakit: c.sakit,
            izin: c.izin,
            alpha: c.alpha,
        }
    }
}

/// Monthly statistics for the admin view of one student.
pub fn stats_by_month(records: &[(NaiveDate, String)]) -> (Vec<MonthStats>, StatusCounts) {
    let (months, total) = count_by_month(records);
    let months = months
        .into_iter()
        .map(|(month, c)| MonthStats {
            bulan: month.bulan,
            bulan_key: month.bulan_key,
            total: c.total(),
            hadir: c.hadir,
            sakit: c.sakit,
            izin: c.izin,
            alpha: c.alpha,
            percentages: c.percentages(c.total()),
        })
        .collect();
    (months, total)
}

/// The machine is active when any of today's action rows says so.
pub fn machine_status(actions: &[Action]) -> MachineStatus {
    if actions
        .iter()
        .any(|a| a.status == MachineStatus::Active.as_ref())
    {
        MachineStatus::Active
    } else {
        MachineStatus::NonActive
    }
}

/// Today's status for a student who has an RFID tag.
///
/// A scan decides the status (unknown values become `None`). Without a scan
/// the student is `Alpha` once the machine is off, otherwise not scanned yet.
pub fn derive_today_status(
    machine: MachineStatus,
    latest: Option<&History>,
) -> (Option<AttendanceStatus>, Option<NaiveTime>) {
    match latest {
        Some(record) => (AttendanceStatus::parse_exact(&record.status), record.waktu),
        None if machine != MachineStatus::Active => (Some(AttendanceStatus::Alpha), None),
        None => (None, None),
    }
}
