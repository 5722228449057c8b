// Chart date windows
//
// The chart endpoints want the previous/current/next day, month and year
// around the client's "today", plus a millisecond cache-buster.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::Serialize;

/// Date context shared by every call of one fetch cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartWindow {
    pub client_date: String,
    pub previous_chart_day: String,
    pub next_chart_day: String,
    pub chart_day: String,
    pub previous_chart_month: String,
    pub next_chart_month: String,
    pub chart_month: String,
    pub previous_chart_year: String,
    pub next_chart_year: String,
    pub chart_year: String,
    #[serde(skip)]
    pub epoch_millis: i64,
}

impl ChartWindow {
    /// Build the window for `today`, stamping it with `now` for the
    /// cache-buster.
    ///
    /// Month arithmetic clamps the day to the target month's length
    /// (Jan 31 − 1 month never lands in an invalid date).
    pub fn new(today: NaiveDate, now: DateTime<Utc>) -> Self {
        let day = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
        let month = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m").to_string()).unwrap_or_default();

        Self {
            client_date: today.format("%Y-%m-%d").to_string(),
            previous_chart_day: day(today.pred_opt()),
            next_chart_day: day(today.succ_opt()),
            chart_day: today.format("%Y-%m-%d").to_string(),
            previous_chart_month: month(today.checked_sub_months(Months::new(1))),
            next_chart_month: month(today.checked_add_months(Months::new(1))),
            chart_month: today.format("%Y-%m").to_string(),
            previous_chart_year: (today.year() - 1).to_string(),
            next_chart_year: (today.year() + 1).to_string(),
            chart_year: today.year().to_string(),
            epoch_millis: now.timestamp_millis(),
        }
    }

    /// Window for the local calendar day, stamped with the current instant.
    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive(), Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn mid_month_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).single().expect("valid instant");
        let w = ChartWindow::new(date(2024, 6, 15), now);

        assert_eq!(w.client_date, "2024-06-15");
        assert_eq!(w.previous_chart_day, "2024-06-14");
        assert_eq!(w.next_chart_day, "2024-06-16");
        assert_eq!(w.previous_chart_month, "2024-05");
        assert_eq!(w.chart_month, "2024-06");
        assert_eq!(w.next_chart_month, "2024-07");
        assert_eq!(w.previous_chart_year, "2023");
        assert_eq!(w.chart_year, "2024");
        assert_eq!(w.next_chart_year, "2025");
        assert_eq!(w.epoch_millis, 1_718_452_800_000);
    }

    #[test]
    fn year_boundaries_roll_over() {
        let w = ChartWindow::new(date(2024, 1, 1), Utc::now());
        assert_eq!(w.previous_chart_day, "2023-12-31");
        assert_eq!(w.previous_chart_month, "2023-12");

        let w = ChartWindow::new(date(2023, 12, 31), Utc::now());
        assert_eq!(w.next_chart_day, "2024-01-01");
        assert_eq!(w.next_chart_month, "2024-01");
    }

    #[test]
    fn month_arithmetic_clamps_day() {
        let w = ChartWindow::new(date(2024, 3, 31), Utc::now());
        assert_eq!(w.previous_chart_month, "2024-02");

        let w = ChartWindow::new(date(2024, 2, 29), Utc::now());
        assert_eq!(w.previous_chart_year, "2023");
        assert_eq!(w.next_chart_year, "2025");
    }
}
