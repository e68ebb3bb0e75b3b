use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use validator::Validate;

use crate::config::WorkdayRules;
use crate::error::AppError;
use crate::models::attendance::{
    AttendanceDayResponse, AttendanceRangeQuery, AttendanceRecord, AttendanceStatus,
    AutoCheckoutOutcome, CreateAttendanceManual, DayClass, EmployeeAttendance, MonthlyStats,
    RoleScopedAttendance, UpdateAttendanceManual,
};
use crate::models::viewer::AuthUser;
use crate::repositories::{AttendanceRepositoryTrait, OrganizationDirectoryTrait};
use crate::services::events::{LeaveApproved, LeaveApprovedSink};
use crate::services::scope::VisibilityResolver;
use crate::utils::time::{now_in_timezone, now_utc, today_local};

/// Daily attendance lifecycle: check-in/out, the auto-checkout batch, leave
/// backfill, and role-scoped reporting.
#[derive(Clone)]
pub struct AttendanceTracker {
    db: PgPool,
    repo: Arc<dyn AttendanceRepositoryTrait>,
    directory: Arc<dyn OrganizationDirectoryTrait>,
    resolver: VisibilityResolver,
    time_zone: Tz,
    rules: WorkdayRules,
}

impl AttendanceTracker {
    pub fn new(
        db: PgPool,
        repo: Arc<dyn AttendanceRepositoryTrait>,
        directory: Arc<dyn OrganizationDirectoryTrait>,
        time_zone: Tz,
        rules: WorkdayRules,
    ) -> Self {
        let resolver = VisibilityResolver::new(directory.clone());
        Self {
            db,
            repo,
            directory,
            resolver,
            time_zone,
            rules,
        }
    }

    /// Opens today's attendance record for the employee. Calling it again on
    /// the same day returns the existing record unchanged.
    pub async fn check_in(&self, employee_id: &str) -> Result<AttendanceRecord, AppError> {
        let date = today_local(&self.time_zone);
        let local_now = now_in_timezone(&self.time_zone).naive_local();
        self.check_in_at(employee_id, date, local_now, now_utc(&self.time_zone))
            .await
    }

    pub async fn check_in_at(
        &self,
        employee_id: &str,
        date: NaiveDate,
        check_in: NaiveDateTime,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AppError> {
        let employee = self.directory.resolve_employee(&self.db, employee_id).await?;
        if !employee.is_active() {
            return Err(AppError::BadRequest(
                "Employee is not active".to_string(),
            ));
        }
        if date.weekday() == self.rules.non_working_weekday {
            return Err(AppError::BadRequest(
                "Check-in is not allowed on a non-working day".to_string(),
            ));
        }

        if let Some(existing) = self
            .repo
            .find_by_employee_and_date(&self.db, employee_id, date)
            .await?
        {
            return Ok(existing);
        }

        let record = AttendanceRecord::checked_in(
            employee.id.clone(),
            employee.tenant_id.clone(),
            date,
            check_in,
            now,
        );
        match self.repo.insert(&self.db, &record).await {
            Ok(()) => Ok(record),
            // Lost the unique-constraint race; the winning row is the answer.
            Err(err) if err.is_conflict() => self
                .repo
                .find_by_employee_and_date(&self.db, employee_id, date)
                .await?
                .ok_or(err),
            Err(err) => Err(err),
        }
    }

    /// Closes today's open record. Repeat calls after a successful check-out
    /// return the already-closed record.
    pub async fn check_out(&self, employee_id: &str) -> Result<AttendanceRecord, AppError> {
        let date = today_local(&self.time_zone);
        let local_now = now_in_timezone(&self.time_zone).naive_local();
        self.check_out_at(employee_id, date, local_now, now_utc(&self.time_zone))
            .await
    }

    pub async fn check_out_at(
        &self,
        employee_id: &str,
        date: NaiveDate,
        check_out: NaiveDateTime,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AppError> {
        let mut record = self
            .repo
            .find_by_employee_and_date(&self.db, employee_id, date)
            .await?
            .ok_or_else(|| AppError::NotFound("No check-in found for the day".into()))?;

        if record.check_in.is_none() {
            return Err(AppError::BadRequest(
                "Cannot check out without a check-in".to_string(),
            ));
        }
        if record.check_out.is_some() {
            return Ok(record);
        }

        record.close_out(check_out, false, now);
        self.repo.update(&self.db, &record).await?;
        Ok(record)
    }

    /// End-of-day batch. Closes every open session at the standard checkout
    /// time, then backfills an absent record for each active employee with no
    /// record at all. One employee's failure never stops the walk, and a rerun
    /// after a partial failure only touches what the first run missed.
    pub async fn auto_checkout(&self) -> Result<AutoCheckoutOutcome, AppError> {
        let date = today_local(&self.time_zone);
        let checkout = date.and_time(self.rules.standard_checkout);
        self.auto_checkout_at(date, checkout, now_utc(&self.time_zone))
            .await
    }

    pub async fn auto_checkout_at(
        &self,
        date: NaiveDate,
        checkout: NaiveDateTime,
        now: DateTime<Utc>,
    ) -> Result<AutoCheckoutOutcome, AppError> {
        let mut outcome = AutoCheckoutOutcome::default();
        let tenants = self.directory.list_active_tenants(&self.db).await?;

        for tenant_id in tenants {
            for mut record in self.repo.find_open_for_date(&self.db, &tenant_id, date).await? {
                record.close_out(checkout, true, now);
                match self.repo.update(&self.db, &record).await {
                    Ok(()) => outcome.closed += 1,
                    Err(err) => {
                        outcome.failed += 1;
                        tracing::error!(
                            employee_id = %record.employee_id,
                            %date,
                            error = %err,
                            "auto checkout failed to close session"
                        );
                    }
                }
            }

            // Skip absence backfill on the non-working day.
            if date.weekday() == self.rules.non_working_weekday {
                continue;
            }

            let recorded: HashSet<String> = self
                .repo
                .employee_ids_with_record(&self.db, &tenant_id, date)
                .await?
                .into_iter()
                .collect();
            let employees = self
                .directory
                .list_active_employees(&self.db, &tenant_id)
                .await?;

            for employee in employees {
                if recorded.contains(&employee.id) {
                    continue;
                }
                let record = AttendanceRecord::synthesized(
                    employee.id.clone(),
                    employee.tenant_id.clone(),
                    date,
                    AttendanceStatus::Absent,
                    Some("auto-marked absent".to_string()),
                    now,
                );
                match self.repo.insert(&self.db, &record).await {
                    Ok(()) => outcome.absent_marked += 1,
                    // A concurrent writer created the day; nothing to do.
                    Err(err) if err.is_conflict() => {}
                    Err(err) => {
                        outcome.failed += 1;
                        tracing::error!(
                            employee_id = %employee.id,
                            %date,
                            error = %err,
                            "auto checkout failed to mark absence"
                        );
                    }
                }
            }
        }

        tracing::info!(
            closed = outcome.closed,
            absent_marked = outcome.absent_marked,
            failed = outcome.failed,
            %date,
            "auto checkout batch finished"
        );
        Ok(outcome)
    }

    /// Backfills leave-day records for an approved leave. Days that already
    /// have a record are left alone, so replaying the same event is a no-op.
    pub async fn mark_absent_for_leave(
        &self,
        employee_id: &str,
        dates: &[NaiveDate],
    ) -> Result<u32, AppError> {
        let employee = self.directory.resolve_employee(&self.db, employee_id).await?;
        let now = now_utc(&self.time_zone);
        let mut created = 0;

        for date in dates {
            if self
                .repo
                .find_by_employee_and_date(&self.db, employee_id, *date)
                .await?
                .is_some()
            {
                continue;
            }
            let record = AttendanceRecord::synthesized(
                employee.id.clone(),
                employee.tenant_id.clone(),
                *date,
                AttendanceStatus::Leave,
                Some("Approved leave".to_string()),
                now,
            );
            match self.repo.insert(&self.db, &record).await {
                Ok(()) => created += 1,
                Err(err) if err.is_conflict() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(created)
    }

    /// The viewer's own record for today, if any.
    pub async fn today(
        &self,
        viewer: &AuthUser,
    ) -> Result<Option<AttendanceDayResponse>, AppError> {
        let employee_id = self.viewer_employee_id(viewer).await?;
        let date = today_local(&self.time_zone);
        let record = self
            .repo
            .find_by_employee_and_date(&self.db, &employee_id, date)
            .await?;
        Ok(record.map(|record| self.day_response(record)))
    }

    /// The viewer's own history over a date range, with derived stats.
    pub async fn history(
        &self,
        viewer: &AuthUser,
        query: &AttendanceRangeQuery,
    ) -> Result<EmployeeAttendance, AppError> {
        let employee_id = self.viewer_employee_id(viewer).await?;
        let employee = self.directory.resolve_employee(&self.db, &employee_id).await?;
        let (from, to) = self.range_or_current_month(query);

        let records = self
            .repo
            .find_by_employees_in_range(&self.db, &[employee_id.clone()], from, to)
            .await?;
        Ok(self.employee_view(employee.id, employee.display_name, records))
    }

    /// Attendance for everyone the viewer may see, grouped per employee.
    pub async fn role_scoped_attendance(
        &self,
        viewer: &AuthUser,
        query: &AttendanceRangeQuery,
    ) -> Result<RoleScopedAttendance, AppError> {
        let scope = self.resolver.resolve(&self.db, viewer).await?;
        let (from, to) = self.range_or_current_month(query);

        let ids = scope.employee_ids();
        let records = self
            .repo
            .find_by_employees_in_range(&self.db, &ids, from, to)
            .await?;

        let mut employees = Vec::with_capacity(scope.employees.len());
        for employee in &scope.employees {
            let own: Vec<AttendanceRecord> = records
                .iter()
                .filter(|r| r.employee_id == employee.id)
                .cloned()
                .collect();
            employees.push(self.employee_view(
                employee.id.clone(),
                employee.display_name.clone(),
                own,
            ));
        }

        Ok(RoleScopedAttendance {
            scope: scope.mode.as_str().to_string(),
            employees,
        })
    }

    /// Admin path: create a record by hand, outside the check-in flow.
    pub async fn create_manual(
        &self,
        payload: &CreateAttendanceManual,
    ) -> Result<AttendanceRecord, AppError> {
        payload.validate()?;
        let employee = self
            .directory
            .resolve_employee(&self.db, &payload.employee_id)
            .await?;
        if let (Some(cin), Some(cout)) = (payload.check_in, payload.check_out) {
            if cout <= cin {
                return Err(AppError::BadRequest(
                    "check_out must be after check_in".to_string(),
                ));
            }
        }

        let now = now_utc(&self.time_zone);
        let mut record = AttendanceRecord::synthesized(
            employee.id,
            employee.tenant_id,
            payload.date,
            payload.status.unwrap_or_default(),
            payload.remark.clone(),
            now,
        );
        record.check_in = payload.check_in;
        record.check_out = payload.check_out;
        record.total_hours = record.computed_hours().or(Some(0.0));

        self.repo.insert(&self.db, &record).await?;
        Ok(record)
    }

    pub async fn update_record(
        &self,
        id: &str,
        payload: &UpdateAttendanceManual,
    ) -> Result<AttendanceRecord, AppError> {
        let mut record = self
            .repo
            .find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Attendance record not found".into()))?;

        if let Some(check_in) = payload.check_in {
            record.check_in = Some(check_in);
        }
        if let Some(check_out) = payload.check_out {
            record.check_out = Some(check_out);
        }
        if let (Some(cin), Some(cout)) = (record.check_in, record.check_out) {
            if cout <= cin {
                return Err(AppError::BadRequest(
                    "check_out must be after check_in".to_string(),
                ));
            }
        }
        if let Some(status) = payload.status {
            record.status = status;
        }
        if let Some(remark) = &payload.remark {
            record.remark = Some(remark.clone());
        }
        record.total_hours = record.computed_hours().or(record.total_hours);
        record.updated_at = now_utc(&self.time_zone);

        self.repo.update(&self.db, &record).await?;
        Ok(record)
    }

    pub async fn delete_record(&self, id: &str) -> Result<(), AppError> {
        if !self.repo.delete(&self.db, id).await? {
            return Err(AppError::NotFound("Attendance record not found".into()));
        }
        Ok(())
    }

    /// The viewer's employee id, falling back to a directory lookup when the
    /// token does not carry one.
    pub async fn viewer_employee_id(&self, viewer: &AuthUser) -> Result<String, AppError> {
        if let Some(id) = &viewer.employee_id {
            return Ok(id.clone());
        }
        let employee = self
            .directory
            .find_by_user(&self.db, &viewer.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No employee record for this account".into()))?;
        Ok(employee.id)
    }

    fn range_or_current_month(&self, query: &AttendanceRangeQuery) -> (NaiveDate, NaiveDate) {
        let today = today_local(&self.time_zone);
        let from = query
            .from
            .unwrap_or_else(|| today.with_day(1).unwrap_or(today));
        let to = query.to.unwrap_or(today);
        (from, to)
    }

    fn day_response(&self, record: AttendanceRecord) -> AttendanceDayResponse {
        let day_class = DayClass::classify(&record, &self.rules);
        AttendanceDayResponse { record, day_class }
    }

    fn employee_view(
        &self,
        employee_id: String,
        employee_name: String,
        records: Vec<AttendanceRecord>,
    ) -> EmployeeAttendance {
        let stats = MonthlyStats::from_records(&records, &self.rules);
        let count = records.len();
        let records = records
            .into_iter()
            .map(|record| self.day_response(record))
            .collect();
        EmployeeAttendance {
            employee_id,
            employee_name,
            records,
            stats,
            count,
        }
    }
}

#[async_trait]
impl LeaveApprovedSink for AttendanceTracker {
    async fn leave_approved(&self, event: LeaveApproved) -> Result<(), AppError> {
        let created = self
            .mark_absent_for_leave(&event.employee_id, &event.dates)
            .await?;
        tracing::info!(
            request_id = %event.request_id,
            employee_id = %event.employee_id,
            created,
            "leave days recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::employee::EmployeeRef;
    use crate::repositories::attendance_repository::MockAttendanceRepositoryTrait;
    use crate::repositories::directory::MockOrganizationDirectoryTrait;
    use chrono::NaiveDate;

    fn test_pool() -> PgPool {
        PgPool::connect_lazy("postgres://localhost/unused").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn employee(id: &str, status: &str) -> EmployeeRef {
        let now = Utc::now();
        EmployeeRef {
            id: id.to_string(),
            user_id: format!("user-{}", id),
            tenant_id: "tenant-1".to_string(),
            reporting_to: None,
            display_name: format!("Employee {}", id),
            employment_status: status.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn tracker(
        repo: MockAttendanceRepositoryTrait,
        directory: MockOrganizationDirectoryTrait,
    ) -> AttendanceTracker {
        AttendanceTracker::new(
            test_pool(),
            Arc::new(repo),
            Arc::new(directory),
            chrono_tz::UTC,
            WorkdayRules::default(),
        )
    }

    fn open_record(employee_id: &str, date: NaiveDate) -> AttendanceRecord {
        AttendanceRecord::checked_in(
            employee_id.to_string(),
            "tenant-1".to_string(),
            date,
            date.and_hms_opt(9, 0, 0).unwrap(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn check_in_is_idempotent_for_the_day() {
        let mut repo = MockAttendanceRepositoryTrait::new();
        let mut directory = MockOrganizationDirectoryTrait::new();
        let monday = date(2024, 6, 3);

        directory
            .expect_resolve_employee()
            .returning(|_, id| Ok(employee(id, "active")));
        let existing = open_record("emp-1", monday);
        let existing_id = existing.id.clone();
        repo.expect_find_by_employee_and_date()
            .returning(move |_, _, _| Ok(Some(existing.clone())));
        // no insert expectation: a second check-in must not write

        let tracker = tracker(repo, directory);
        let record = tracker
            .check_in_at("emp-1", monday, monday.and_hms_opt(10, 0, 0).unwrap(), Utc::now())
            .await
            .unwrap();
        assert_eq!(record.id, existing_id);
    }

    #[tokio::test]
    async fn check_in_rejected_on_non_working_day() {
        let repo = MockAttendanceRepositoryTrait::new();
        let mut directory = MockOrganizationDirectoryTrait::new();
        directory
            .expect_resolve_employee()
            .returning(|_, id| Ok(employee(id, "active")));

        let tracker = tracker(repo, directory);
        let sunday = date(2024, 6, 9);
        let err = tracker
            .check_in_at("emp-1", sunday, sunday.and_hms_opt(9, 0, 0).unwrap(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn check_in_rejected_for_inactive_employee() {
        let repo = MockAttendanceRepositoryTrait::new();
        let mut directory = MockOrganizationDirectoryTrait::new();
        directory
            .expect_resolve_employee()
            .returning(|_, id| Ok(employee(id, "terminated")));

        let tracker = tracker(repo, directory);
        let monday = date(2024, 6, 3);
        let err = tracker
            .check_in_at("emp-1", monday, monday.and_hms_opt(9, 0, 0).unwrap(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn check_in_race_loser_returns_winning_row() {
        let mut repo = MockAttendanceRepositoryTrait::new();
        let mut directory = MockOrganizationDirectoryTrait::new();
        let monday = date(2024, 6, 3);

        directory
            .expect_resolve_employee()
            .returning(|_, id| Ok(employee(id, "active")));
        repo.expect_find_by_employee_and_date()
            .times(1)
            .returning(|_, _, _| Ok(None));
        repo.expect_insert()
            .times(1)
            .returning(|_, _| Err(AppError::Conflict("Duplicate record".to_string())));
        let winner = open_record("emp-1", monday);
        let winner_id = winner.id.clone();
        repo.expect_find_by_employee_and_date()
            .times(1)
            .returning(move |_, _, _| Ok(Some(winner.clone())));

        let tracker = tracker(repo, directory);
        let record = tracker
            .check_in_at("emp-1", monday, monday.and_hms_opt(9, 5, 0).unwrap(), Utc::now())
            .await
            .unwrap();
        assert_eq!(record.id, winner_id);
    }

    #[tokio::test]
    async fn check_out_without_check_in_is_not_found() {
        let mut repo = MockAttendanceRepositoryTrait::new();
        let directory = MockOrganizationDirectoryTrait::new();
        repo.expect_find_by_employee_and_date()
            .returning(|_, _, _| Ok(None));

        let tracker = tracker(repo, directory);
        let monday = date(2024, 6, 3);
        let err = tracker
            .check_out_at("emp-1", monday, monday.and_hms_opt(17, 0, 0).unwrap(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn check_out_is_idempotent_once_closed() {
        let mut repo = MockAttendanceRepositoryTrait::new();
        let directory = MockOrganizationDirectoryTrait::new();
        let monday = date(2024, 6, 3);

        let mut closed = open_record("emp-1", monday);
        closed.close_out(monday.and_hms_opt(17, 0, 0).unwrap(), false, Utc::now());
        let stored_hours = closed.total_hours;
        repo.expect_find_by_employee_and_date()
            .returning(move |_, _, _| Ok(Some(closed.clone())));
        // no update expectation: the stored check-out must stand

        let tracker = tracker(repo, directory);
        let record = tracker
            .check_out_at("emp-1", monday, monday.and_hms_opt(19, 0, 0).unwrap(), Utc::now())
            .await
            .unwrap();
        assert_eq!(record.check_out, Some(monday.and_hms_opt(17, 0, 0).unwrap()));
        assert_eq!(record.total_hours, stored_hours);
    }

    #[tokio::test]
    async fn auto_checkout_closes_backfills_and_isolates_failures() {
        let mut repo = MockAttendanceRepositoryTrait::new();
        let mut directory = MockOrganizationDirectoryTrait::new();
        let monday = date(2024, 6, 3);

        directory
            .expect_list_active_tenants()
            .returning(|_| Ok(vec!["tenant-1".to_string()]));
        repo.expect_find_open_for_date().returning(move |_, _, _| {
            Ok(vec![open_record("emp-1", monday), open_record("emp-2", monday)])
        });
        repo.expect_update().times(2).returning(|_, record| {
            if record.employee_id == "emp-2" {
                Err(AppError::InternalServerError(anyhow::anyhow!("db down")))
            } else {
                Ok(())
            }
        });
        repo.expect_employee_ids_with_record()
            .returning(|_, _, _| Ok(vec!["emp-1".to_string(), "emp-2".to_string()]));
        directory.expect_list_active_employees().returning(|_, _| {
            Ok(vec![
                employee("emp-1", "active"),
                employee("emp-2", "active"),
                employee("emp-3", "active"),
            ])
        });
        repo.expect_insert()
            .times(1)
            .withf(|_, record| {
                record.employee_id == "emp-3" && record.status == AttendanceStatus::Absent
            })
            .returning(|_, _| Ok(()));

        let tracker = tracker(repo, directory);
        let outcome = tracker
            .auto_checkout_at(monday, monday.and_hms_opt(17, 30, 0).unwrap(), Utc::now())
            .await
            .unwrap();
        assert_eq!(outcome.closed, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.absent_marked, 1);
    }

    #[tokio::test]
    async fn auto_checkout_skips_backfill_on_non_working_day() {
        let mut repo = MockAttendanceRepositoryTrait::new();
        let mut directory = MockOrganizationDirectoryTrait::new();
        let sunday = date(2024, 6, 9);

        directory
            .expect_list_active_tenants()
            .returning(|_| Ok(vec!["tenant-1".to_string()]));
        repo.expect_find_open_for_date()
            .returning(move |_, _, _| Ok(vec![open_record("emp-1", sunday)]));
        repo.expect_update().times(1).returning(|_, _| Ok(()));
        // no roster walk on the non-working day

        let tracker = tracker(repo, directory);
        let outcome = tracker
            .auto_checkout_at(sunday, sunday.and_hms_opt(17, 30, 0).unwrap(), Utc::now())
            .await
            .unwrap();
        assert_eq!(outcome.closed, 1);
        assert_eq!(outcome.absent_marked, 0);
    }

    #[tokio::test]
    async fn leave_backfill_skips_days_with_records() {
        let mut repo = MockAttendanceRepositoryTrait::new();
        let mut directory = MockOrganizationDirectoryTrait::new();
        let monday = date(2024, 6, 3);
        let tuesday = date(2024, 6, 4);

        directory
            .expect_resolve_employee()
            .returning(|_, id| Ok(employee(id, "active")));
        let taken = open_record("emp-1", monday);
        repo.expect_find_by_employee_and_date()
            .returning(move |_, _, d| {
                if d == monday {
                    Ok(Some(taken.clone()))
                } else {
                    Ok(None)
                }
            });
        repo.expect_insert()
            .times(1)
            .withf(move |_, record| {
                record.date == tuesday && record.status == AttendanceStatus::Leave
            })
            .returning(|_, _| Ok(()));

        let tracker = tracker(repo, directory);
        let created = tracker
            .mark_absent_for_leave("emp-1", &[monday, tuesday])
            .await
            .unwrap();
        assert_eq!(created, 1);
    }
}
