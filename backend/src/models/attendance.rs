use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::config::WorkdayRules;
use crate::utils::time::{average_clock, round2};

/// One employee's presence for one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: String,
    pub employee_id: String,
    pub tenant_id: String,
    pub date: NaiveDate,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub total_hours: Option<f64>,
    pub status: AttendanceStatus,
    pub auto_checkout: bool,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Leave,
    Incomplete,
}

impl Default for AttendanceStatus {
    fn default() -> Self {
        AttendanceStatus::Present
    }
}

impl AttendanceStatus {
    /// Canonical database value; inserts bind this rather than the enum.
    pub fn db_value(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Leave => "leave",
            AttendanceStatus::Incomplete => "incomplete",
        }
    }
}

impl AttendanceRecord {
    /// A fresh record opened by a check-in.
    pub fn checked_in(
        employee_id: String,
        tenant_id: String,
        date: NaiveDate,
        check_in: NaiveDateTime,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            employee_id,
            tenant_id,
            date,
            check_in: Some(check_in),
            check_out: None,
            total_hours: None,
            status: AttendanceStatus::Present,
            auto_checkout: false,
            remark: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A record synthesized without any timestamps (absence backfill or
    /// approved leave).
    pub fn synthesized(
        employee_id: String,
        tenant_id: String,
        date: NaiveDate,
        status: AttendanceStatus,
        remark: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            employee_id,
            tenant_id,
            date,
            check_in: None,
            check_out: None,
            total_hours: Some(0.0),
            status,
            auto_checkout: false,
            remark,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.check_in.is_some() && self.check_out.is_none()
    }

    /// Stamps a check-out and recomputes total hours. `auto` marks batch
    /// close-outs.
    pub fn close_out(&mut self, check_out: NaiveDateTime, auto: bool, now: DateTime<Utc>) {
        self.check_out = Some(check_out);
        self.total_hours = self.computed_hours();
        self.status = AttendanceStatus::Present;
        self.auto_checkout = auto;
        self.updated_at = now;
    }

    /// Hours between the stored timestamps, rounded to two decimals.
    pub fn computed_hours(&self) -> Option<f64> {
        match (self.check_in, self.check_out) {
            (Some(cin), Some(cout)) => {
                let minutes = (cout - cin).num_minutes();
                Some(round2(minutes as f64 / 60.0))
            }
            _ => None,
        }
    }
}

/// Report-time day classification. Never persisted; derived from timestamps
/// and remark text at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DayClass {
    Present,
    Late,
    PresentOvertime,
    LateOvertime,
    Absent,
}

impl DayClass {
    pub fn classify(record: &AttendanceRecord, rules: &WorkdayRules) -> DayClass {
        let Some(check_in) = record.check_in else {
            return DayClass::Absent;
        };

        let remark = record
            .remark
            .as_deref()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let grace_deadline =
            rules.on_time_cutoff + chrono::Duration::minutes(rules.grace_minutes as i64);
        let mut late = check_in.time() > grace_deadline;
        let mut overtime = record
            .check_out
            .map(|out| out.time() > rules.standard_checkout)
            .unwrap_or(false);

        // Textual override wins over the time math.
        if remark.contains("late") {
            late = true;
        }
        if remark.contains("overtime") {
            overtime = true;
        }

        match (late, overtime) {
            (false, false) => DayClass::Present,
            (true, false) => DayClass::Late,
            (false, true) => DayClass::PresentOvertime,
            (true, true) => DayClass::LateOvertime,
        }
    }
}

/// Aggregated statistics for a set of records in a reporting period.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonthlyStats {
    pub total_days: u32,
    pub present_days: u32,
    pub absent_days: u32,
    pub late_days: u32,
    pub overtime_days: u32,
    pub total_hours: f64,
    pub avg_check_in: String,
    pub avg_check_out: String,
    /// present / total, rounded to the nearest integer percent.
    pub attendance_rate: u32,
}

impl MonthlyStats {
    pub fn from_records(records: &[AttendanceRecord], rules: &WorkdayRules) -> Self {
        let total_days = records.len() as u32;
        let present_days = records.iter().filter(|r| r.check_in.is_some()).count() as u32;
        let absent_days = total_days - present_days;

        let mut late_days = 0;
        let mut overtime_days = 0;
        for record in records {
            match DayClass::classify(record, rules) {
                DayClass::Late => late_days += 1,
                DayClass::PresentOvertime => overtime_days += 1,
                DayClass::LateOvertime => {
                    late_days += 1;
                    overtime_days += 1;
                }
                DayClass::Present | DayClass::Absent => {}
            }
        }

        let total_hours = round2(
            records
                .iter()
                .map(|r| r.total_hours.or_else(|| r.computed_hours()).unwrap_or(0.0))
                .sum(),
        );

        let check_in_minutes: Vec<u32> = records
            .iter()
            .filter_map(|r| r.check_in)
            .map(|t| t.time().hour() * 60 + t.time().minute())
            .collect();
        let check_out_minutes: Vec<u32> = records
            .iter()
            .filter_map(|r| r.check_out)
            .map(|t| t.time().hour() * 60 + t.time().minute())
            .collect();

        let attendance_rate = if total_days > 0 {
            ((present_days as f64 / total_days as f64) * 100.0).round() as u32
        } else {
            0
        };

        MonthlyStats {
            total_days,
            present_days,
            absent_days,
            late_days,
            overtime_days,
            total_hours,
            avg_check_in: average_clock(&check_in_minutes),
            avg_check_out: average_clock(&check_out_minutes),
            attendance_rate,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Admin path for creating a record by hand (e.g. retroactive fixes outside
/// the correction-request flow).
#[derive(Debug, Deserialize, ToSchema, validator::Validate)]
pub struct CreateAttendanceManual {
    #[validate(length(min = 1))]
    pub employee_id: String,
    pub date: NaiveDate,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub status: Option<AttendanceStatus>,
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAttendanceManual {
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub status: Option<AttendanceStatus>,
    pub remark: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceDayResponse {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub day_class: DayClass,
}

/// One employee's slice of a role-scoped attendance view.
#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeAttendance {
    pub employee_id: String,
    pub employee_name: String,
    pub records: Vec<AttendanceDayResponse>,
    pub stats: MonthlyStats,
    pub count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleScopedAttendance {
    pub scope: String,
    pub employees: Vec<EmployeeAttendance>,
}

/// Outcome summary returned by the auto-checkout batch entry point.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct AutoCheckoutOutcome {
    pub closed: u32,
    pub absent_marked: u32,
    pub failed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record_for(check_in: Option<(u32, u32)>, check_out: Option<(u32, u32)>) -> AttendanceRecord {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let now = Utc::now();
        let mut record = AttendanceRecord::checked_in(
            "emp-1".to_string(),
            "tenant-1".to_string(),
            date,
            date.and_hms_opt(9, 0, 0).unwrap(),
            now,
        );
        record.check_in = check_in.map(|(h, m)| date.and_hms_opt(h, m, 0).unwrap());
        record.check_out = check_out.map(|(h, m)| date.and_hms_opt(h, m, 0).unwrap());
        record
    }

    #[test]
    fn attendance_status_serde_snake_case() {
        let s: AttendanceStatus = serde_json::from_str("\"leave\"").unwrap();
        assert_eq!(s, AttendanceStatus::Leave);
        let v = serde_json::to_value(AttendanceStatus::Incomplete).unwrap();
        assert_eq!(v, serde_json::json!("incomplete"));
    }

    #[test]
    fn close_out_computes_rounded_hours() {
        let mut record = record_for(Some((9, 0)), None);
        let out = record.date.and_hms_opt(17, 20, 0).unwrap();
        record.close_out(out, false, Utc::now());
        assert_eq!(record.total_hours, Some(8.33));
        assert!(!record.auto_checkout);
        assert!(!record.is_open());
    }

    #[test]
    fn classify_late_after_grace_window() {
        // Scenario: check-in 09:45 with 09:00 cutoff + 30 min grace
        let rules = WorkdayRules::default();
        let record = record_for(Some((9, 45)), Some((17, 0)));
        assert_eq!(DayClass::classify(&record, &rules), DayClass::Late);
    }

    #[test]
    fn classify_within_grace_is_present() {
        let rules = WorkdayRules::default();
        let record = record_for(Some((9, 25)), Some((17, 0)));
        assert_eq!(DayClass::classify(&record, &rules), DayClass::Present);
    }

    #[test]
    fn classify_overtime_past_standard_checkout() {
        let rules = WorkdayRules::default();
        let record = record_for(Some((9, 0)), Some((19, 0)));
        assert_eq!(DayClass::classify(&record, &rules), DayClass::PresentOvertime);

        let late_and_long = record_for(Some((10, 0)), Some((19, 0)));
        assert_eq!(DayClass::classify(&late_and_long, &rules), DayClass::LateOvertime);
    }

    #[test]
    fn classify_remark_override_wins() {
        let rules = WorkdayRules::default();
        let mut record = record_for(Some((8, 30)), Some((17, 0)));
        record.remark = Some("Approved late arrival".to_string());
        assert_eq!(DayClass::classify(&record, &rules), DayClass::Late);
    }

    #[test]
    fn classify_missing_check_in_is_absent() {
        let rules = WorkdayRules::default();
        let record = record_for(None, None);
        assert_eq!(DayClass::classify(&record, &rules), DayClass::Absent);
    }

    #[test]
    fn monthly_stats_empty_input_uses_sentinels() {
        let stats = MonthlyStats::from_records(&[], &WorkdayRules::default());
        assert_eq!(stats.total_days, 0);
        assert_eq!(stats.present_days, 0);
        assert_eq!(stats.absent_days, 0);
        assert_eq!(stats.attendance_rate, 0);
        assert_eq!(stats.total_hours, 0.0);
        assert_eq!(stats.avg_check_in, "--:--");
        assert_eq!(stats.avg_check_out, "--:--");
    }

    #[test]
    fn monthly_stats_counts_and_rate() {
        let rules = WorkdayRules::default();
        let mut present = record_for(Some((9, 0)), Some((17, 30)));
        present.total_hours = Some(8.5);
        let late = record_for(Some((10, 0)), Some((17, 0)));
        let absent = record_for(None, None);

        let stats = MonthlyStats::from_records(&[present, late, absent], &rules);
        assert_eq!(stats.total_days, 3);
        assert_eq!(stats.present_days, 2);
        assert_eq!(stats.absent_days, 1);
        assert_eq!(stats.late_days, 1);
        assert_eq!(stats.attendance_rate, 67);
        // late record has no stored hours, recomputed from timestamps
        assert_eq!(stats.total_hours, 15.5);
        assert_eq!(stats.avg_check_in, "09:30");
    }
}
