use chrono::{Datelike, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};

const BULAN: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Current date on the school's clock.
pub fn today(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

/// Current time on the school's clock, truncated to whole seconds.
pub fn now_time(offset: FixedOffset) -> NaiveTime {
    let now = Utc::now().with_timezone(&offset).time();
    now.with_nanosecond(0).unwrap_or(now)
}

/// `YYYY-MM`
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

fn month_name(date: NaiveDate) -> &'static str {
    BULAN[date.month0() as usize]
}

/// Indonesian month label, e.g. `Januari 2025`.
pub fn month_label(date: NaiveDate) -> String {
    format!("{} {}", month_name(date), date.year())
}

/// Indonesian long date, e.g. `15 Januari 2025`.
pub fn date_label(date: NaiveDate) -> String {
    format!("{} {} {}", date.day(), month_name(date), date.year())
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// First and last day of a `YYYY-MM` month.
pub fn month_bounds(value: &str) -> Option<(NaiveDate, NaiveDate)> {
    let (year, month) = value.trim().split_once('-')?;
    if month.len() != 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;

    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn labels_are_indonesian() {
        assert_eq!(month_label(date(2025, 1, 15)), "Januari 2025");
        assert_eq!(month_label(date(2024, 8, 1)), "Agustus 2024");
        assert_eq!(date_label(date(2025, 12, 3)), "3 Desember 2025");
    }

    #[test]
    fn month_key_is_zero_padded() {
        assert_eq!(month_key(date(2025, 3, 9)), "2025-03");
    }

    #[test]
    fn month_bounds_cover_the_whole_month() {
        assert_eq!(month_bounds("2024-02"), Some((date(2024, 2, 1), date(2024, 2, 29))));
        assert_eq!(month_bounds("2025-02"), Some((date(2025, 2, 1), date(2025, 2, 28))));
        assert_eq!(month_bounds("2025-12"), Some((date(2025, 12, 1), date(2025, 12, 31))));
    }

    #[test]
    fn malformed_months_are_rejected() {
        assert_eq!(month_bounds("2025-13"), None);
        assert_eq!(month_bounds("2025"), None);
        assert_eq!(month_bounds("2025-1"), None);
        assert_eq!(month_bounds("januari"), None);
    }

    #[test]
    fn parse_date_accepts_iso_only() {
        assert_eq!(parse_date("2025-01-15"), Some(date(2025, 1, 15)));
        assert_eq!(parse_date("15/01/2025"), None);
    }

    #[test]
    fn now_time_has_no_fraction() {
        let offset = FixedOffset::east_opt(7 * 3600).unwrap();
        assert_eq!(now_time(offset).nanosecond(), 0);
    }
}
