use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::attendance::AttendanceRecord;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttendanceRepositoryTrait: Send + Sync {
    async fn find_by_id(
        &self,
        db: &PgPool,
        id: &str,
    ) -> Result<Option<AttendanceRecord>, AppError>;

    async fn find_by_employee_and_date(
        &self,
        db: &PgPool,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError>;

    /// Inserts a new record. The unique (employee_id, date) constraint is the
    /// concurrency primitive: a duplicate insert surfaces as
    /// `AppError::Conflict` and callers refetch the winning row.
    async fn insert(&self, db: &PgPool, record: &AttendanceRecord) -> Result<(), AppError>;

    async fn update(&self, db: &PgPool, record: &AttendanceRecord) -> Result<(), AppError>;

    /// Records for a date that have a check-in but no check-out yet.
    async fn find_open_for_date(
        &self,
        db: &PgPool,
        tenant_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError>;

    /// Employee ids that already have any record for the date.
    async fn employee_ids_with_record(
        &self,
        db: &PgPool,
        tenant_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<String>, AppError>;

    async fn find_by_employees_in_range(
        &self,
        db: &PgPool,
        employee_ids: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError>;

    async fn delete(&self, db: &PgPool, id: &str) -> Result<bool, AppError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AttendanceRepository;

impl AttendanceRepository {
    pub fn new() -> Self {
        Self
    }
}

const SELECT_COLUMNS: &str = "id, employee_id, tenant_id, date, check_in, check_out, total_hours, status, auto_checkout, remark, created_at, updated_at";

#[async_trait]
impl AttendanceRepositoryTrait for AttendanceRepository {
    async fn find_by_id(
        &self,
        db: &PgPool,
        id: &str,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM attendance_records WHERE id = $1",
            SELECT_COLUMNS
        );
        let record = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(record)
    }

    async fn find_by_employee_and_date(
        &self,
        db: &PgPool,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM attendance_records WHERE employee_id = $1 AND date = $2",
            SELECT_COLUMNS
        );
        let record = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(db)
            .await?;
        Ok(record)
    }

    async fn insert(&self, db: &PgPool, record: &AttendanceRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO attendance_records
                (id, employee_id, tenant_id, date, check_in, check_out, total_hours,
                 status, auto_checkout, remark, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&record.id)
        .bind(&record.employee_id)
        .bind(&record.tenant_id)
        .bind(record.date)
        .bind(record.check_in)
        .bind(record.check_out)
        .bind(record.total_hours)
        .bind(record.status.db_value())
        .bind(record.auto_checkout)
        .bind(&record.remark)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(db)
        .await?;
        Ok(())
    }

    async fn update(&self, db: &PgPool, record: &AttendanceRecord) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance_records
            SET check_in = $1, check_out = $2, total_hours = $3, status = $4,
                auto_checkout = $5, remark = $6, updated_at = $7
            WHERE id = $8
            "#,
        )
        .bind(record.check_in)
        .bind(record.check_out)
        .bind(record.total_hours)
        .bind(record.status.db_value())
        .bind(record.auto_checkout)
        .bind(&record.remark)
        .bind(record.updated_at)
        .bind(&record.id)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Attendance record not found".into()));
        }
        Ok(())
    }

    async fn find_open_for_date(
        &self,
        db: &PgPool,
        tenant_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM attendance_records WHERE tenant_id = $1 AND date = $2 AND check_in IS NOT NULL AND check_out IS NULL",
            SELECT_COLUMNS
        );
        let records = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(tenant_id)
            .bind(date)
            .fetch_all(db)
            .await?;
        Ok(records)
    }

    async fn employee_ids_with_record(
        &self,
        db: &PgPool,
        tenant_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<String>, AppError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT employee_id FROM attendance_records WHERE tenant_id = $1 AND date = $2",
        )
        .bind(tenant_id)
        .bind(date)
        .fetch_all(db)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn find_by_employees_in_range(
        &self,
        db: &PgPool,
        employee_ids: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        if employee_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {} FROM attendance_records WHERE employee_id = ANY($1) AND date >= $2 AND date <= $3 ORDER BY date",
            SELECT_COLUMNS
        );
        let records = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(employee_ids)
            .bind(from)
            .bind(to)
            .fetch_all(db)
            .await?;
        Ok(records)
    }

    async fn delete(&self, db: &PgPool, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM attendance_records WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
