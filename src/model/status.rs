use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Attendance status of one student on one day.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
pub enum AttendanceStatus {
    Hadir,
    Sakit,
    Izin,
    Alpha,
}

impl AttendanceStatus {
    /// Exact, case-sensitive parse as stored by the scanner and the admin panel.
    pub fn parse_exact(value: &str) -> Option<Self> {
        value.parse().ok()
    }

    /// Case-insensitive parse used by the analytics counters.
    pub fn parse_loose(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "hadir" => Some(AttendanceStatus::Hadir),
            "sakit" => Some(AttendanceStatus::Sakit),
            "izin" => Some(AttendanceStatus::Izin),
            "alpha" => Some(AttendanceStatus::Alpha),
            _ => None,
        }
    }
}

/// Whether the RFID machine accepts scans today.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
pub enum MachineStatus {
    Active,
    NonActive,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn exact_parse_is_case_sensitive() {
        assert_eq!(AttendanceStatus::parse_exact("Hadir"), Some(AttendanceStatus::Hadir));
        assert_eq!(AttendanceStatus::parse_exact("hadir"), None);
        assert_eq!(AttendanceStatus::parse_exact("Terlambat"), None);
    }

    #[test]
    fn loose_parse_ignores_case_and_padding() {
        assert_eq!(AttendanceStatus::parse_loose(" SAKIT "), Some(AttendanceStatus::Sakit));
        assert_eq!(AttendanceStatus::parse_loose("izin"), Some(AttendanceStatus::Izin));
        assert_eq!(AttendanceStatus::parse_loose(""), None);
    }

    #[test]
    fn statuses_keep_their_stored_spelling() {
        let names: Vec<_> = AttendanceStatus::iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["Hadir", "Sakit", "Izin", "Alpha"]);
    }

    #[test]
    fn machine_status_round_trips_through_text() {
        assert_eq!("Active".parse::<MachineStatus>().unwrap(), MachineStatus::Active);
        assert_eq!(MachineStatus::NonActive.to_string(), "NonActive");
        assert!("active".parse::<MachineStatus>().is_err());
    }
}
