use chrono_tz::Tz;
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::WorkdayRules;
use crate::error::AppError;
use crate::models::request::{
    ChangeStatusPayload, CreateWorkforceRequest, DecisionStatus, RequestDetails,
    RequestListPageInfo, RequestListQuery, RequestListResponse, RequestSummary, WorkflowStatus,
    WorkforceRequest, WorkforceRequestResponse,
};
use crate::models::viewer::AuthUser;
use crate::repositories::{OrganizationDirectoryTrait, RequestFilter, RequestRepositoryTrait};
use crate::services::events::{LeaveApproved, LeaveApprovedSink};
use crate::services::scope::{ScopeMode, VisibilityResolver};
use crate::utils::time::{business_days, expand_range, hour_window, now_utc, parse_hour, round2};

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

/// Creation, decision, and listing of workforce requests.
#[derive(Clone)]
pub struct RequestWorkflow {
    db: PgPool,
    repo: Arc<dyn RequestRepositoryTrait>,
    directory: Arc<dyn OrganizationDirectoryTrait>,
    resolver: VisibilityResolver,
    sink: Arc<dyn LeaveApprovedSink>,
    time_zone: Tz,
    rules: WorkdayRules,
}

impl RequestWorkflow {
    pub fn new(
        db: PgPool,
        repo: Arc<dyn RequestRepositoryTrait>,
        directory: Arc<dyn OrganizationDirectoryTrait>,
        sink: Arc<dyn LeaveApprovedSink>,
        time_zone: Tz,
        rules: WorkdayRules,
    ) -> Self {
        let resolver = VisibilityResolver::new(directory.clone());
        Self {
            db,
            repo,
            directory,
            resolver,
            sink,
            time_zone,
            rules,
        }
    }

    /// Creates a pending request. Derived fields (leave hours, time-window
    /// hours, loan installment) are computed here; whatever the client sent
    /// for them is discarded.
    pub async fn create(
        &self,
        viewer: &AuthUser,
        payload: CreateWorkforceRequest,
    ) -> Result<WorkforceRequest, AppError> {
        let employee = self
            .directory
            .resolve_employee(&self.db, &payload.employee_id)
            .await?;
        if !employee.is_active() {
            return Err(AppError::BadRequest("Employee is not active".to_string()));
        }
        if !viewer.is_admin() && viewer.employee_id.as_deref() != Some(employee.id.as_str()) {
            return Err(AppError::Forbidden(
                "Requests can only be filed for yourself".to_string(),
            ));
        }

        let details = self.derive_details(payload.details)?;

        if let Some((from, to)) = details.leave_range() {
            let overlapping = self
                .repo
                .find_overlapping_leave(&self.db, &employee.id, from, to)
                .await?;
            if !overlapping.is_empty() {
                return Err(AppError::Conflict(
                    "Leave request overlaps an existing one".to_string(),
                ));
            }
        }

        let admin_approval = self.requires_admin_approval(&details);
        let request = WorkforceRequest::new(
            employee.id,
            employee.tenant_id,
            details,
            admin_approval,
            now_utc(&self.time_zone),
        );
        self.repo.insert(&self.db, &request).await?;

        tracing::info!(
            request_id = %request.id,
            kind = request.kind.db_value(),
            admin_approval,
            "workforce request created"
        );
        Ok(request)
    }

    /// Decides a pending request. The transition is guarded in the database,
    /// so two racing approvers cannot both win; the loser gets a conflict and
    /// the stored decision stands.
    pub async fn change_status(
        &self,
        viewer: &AuthUser,
        id: &str,
        payload: &ChangeStatusPayload,
    ) -> Result<WorkforceRequest, AppError> {
        let request = self
            .repo
            .find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Request not found".into()))?;

        self.authorize_decision(viewer, &request).await?;

        let rejection_reason = match payload.status {
            DecisionStatus::Rejected => {
                let reason = payload
                    .rejection_reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| {
                        AppError::BadRequest("A rejection requires a reason".to_string())
                    })?;
                Some(reason.to_string())
            }
            DecisionStatus::Approved => None,
        };

        let status = WorkflowStatus::from(payload.status);
        let transitioned = self
            .repo
            .transition(
                &self.db,
                id,
                status,
                &viewer.user_id,
                rejection_reason.clone(),
            )
            .await?;
        if !transitioned {
            return Err(AppError::Conflict("Request has already been decided".into()));
        }

        let updated = self
            .repo
            .find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Request not found".into()))?;

        if status == WorkflowStatus::Approved {
            if let Some((from, to)) = updated.details.leave_range() {
                let dates: Vec<_> = expand_range(from, to)
                    .into_iter()
                    .filter(|d| chrono::Datelike::weekday(d) != self.rules.non_working_weekday)
                    .collect();
                let event = LeaveApproved {
                    request_id: updated.id.clone(),
                    employee_id: updated.employee_id.clone(),
                    tenant_id: updated.tenant_id.clone(),
                    dates,
                };
                // The decision is already committed; a sink failure leaves
                // attendance out of step until the event is replayed.
                if let Err(err) = self.sink.leave_approved(event).await {
                    tracing::error!(
                        request_id = %updated.id,
                        error = %err,
                        "leave approval side effect failed, reconciliation required"
                    );
                }
            }
        }

        tracing::info!(
            request_id = %updated.id,
            status = status.db_value(),
            action_by = %viewer.user_id,
            "workforce request decided"
        );
        Ok(updated)
    }

    /// Everything the viewer may see, split into their own requests and their
    /// team's. An admin scope has no "mine" side: the whole tenant lands in
    /// the team list, even when the admin also has an employee record.
    /// Summary counts are taken before the name filter so the totals describe
    /// the full visible set, not the filtered page.
    pub async fn role_scoped_requests(
        &self,
        viewer: &AuthUser,
        query: &RequestListQuery,
    ) -> Result<RequestListResponse, AppError> {
        let scope = self.resolver.resolve(&self.db, viewer).await?;
        let filter = RequestFilter {
            kind: query.kind,
            status: query.status,
        };
        let requests = self
            .repo
            .find_for_employees(&self.db, &scope.employee_ids(), &filter)
            .await?;

        let names = self
            .directory
            .display_names(&self.db, &scope.employee_ids())
            .await?;
        let viewer_employee = match scope.mode {
            ScopeMode::Admin => None,
            _ => scope.viewer_employee_id.clone(),
        };

        let mut my_requests = Vec::new();
        let mut team_requests = Vec::new();
        for request in requests {
            let employee_name = names
                .get(&request.employee_id)
                .cloned()
                .unwrap_or_default();
            let response = WorkforceRequestResponse {
                request,
                employee_name,
            };
            if Some(&response.request.employee_id) == viewer_employee.as_ref() {
                my_requests.push(response);
            } else {
                team_requests.push(response);
            }
        }

        let summary = RequestSummary {
            total_requests: my_requests.len() + team_requests.len(),
            my_requests: my_requests.len(),
            team_requests: team_requests.len(),
        };

        if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let needle = name.to_lowercase();
            let matches = |r: &WorkforceRequestResponse| {
                r.employee_name.to_lowercase().contains(&needle)
            };
            my_requests.retain(matches);
            team_requests.retain(matches);
        }

        let page = query.page.unwrap_or(1).max(1);
        let per_page = query
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        let team_requests = paginate(team_requests, page, per_page);

        Ok(RequestListResponse {
            my_requests,
            team_requests,
            summary,
            page_info: RequestListPageInfo { page, per_page },
        })
    }

    pub async fn find_one(
        &self,
        viewer: &AuthUser,
        id: &str,
    ) -> Result<WorkforceRequestResponse, AppError> {
        let request = self
            .repo
            .find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Request not found".into()))?;
        self.authorize_view(viewer, &request).await?;

        let names = self
            .directory
            .display_names(&self.db, &[request.employee_id.clone()])
            .await?;
        let employee_name = names.get(&request.employee_id).cloned().unwrap_or_default();
        Ok(WorkforceRequestResponse {
            request,
            employee_name,
        })
    }

    /// Edits the payload of a still-pending request. Decided requests are
    /// immutable.
    pub async fn update(
        &self,
        viewer: &AuthUser,
        id: &str,
        details: RequestDetails,
    ) -> Result<WorkforceRequest, AppError> {
        let mut request = self
            .repo
            .find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Request not found".into()))?;

        if !viewer.is_admin() && viewer.employee_id.as_deref() != Some(request.employee_id.as_str())
        {
            return Err(AppError::Forbidden(
                "Only the requester can edit a request".to_string(),
            ));
        }
        if !request.is_pending() {
            return Err(AppError::Conflict(
                "Decided requests cannot be edited".to_string(),
            ));
        }

        let details = self.derive_details(details)?;
        if let Some((from, to)) = details.leave_range() {
            let overlapping = self
                .repo
                .find_overlapping_leave(&self.db, &request.employee_id, from, to)
                .await?;
            if overlapping.iter().any(|r| r.id != request.id) {
                return Err(AppError::Conflict(
                    "Leave request overlaps an existing one".to_string(),
                ));
            }
        }

        request.admin_approval = self.requires_admin_approval(&details);
        request.kind = details.kind();
        request.details = details;
        request.updated_at = now_utc(&self.time_zone);
        self.repo.update(&self.db, &request).await?;
        Ok(request)
    }

    /// Withdraws a still-pending request.
    pub async fn remove(&self, viewer: &AuthUser, id: &str) -> Result<(), AppError> {
        let request = self
            .repo
            .find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Request not found".into()))?;

        if !viewer.is_admin() && viewer.employee_id.as_deref() != Some(request.employee_id.as_str())
        {
            return Err(AppError::Forbidden(
                "Only the requester can withdraw a request".to_string(),
            ));
        }
        if !request.is_pending() {
            return Err(AppError::Conflict(
                "Decided requests cannot be withdrawn".to_string(),
            ));
        }

        self.repo.delete(&self.db, id).await?;
        Ok(())
    }

    /// Validates a payload and computes its derived fields.
    fn derive_details(&self, details: RequestDetails) -> Result<RequestDetails, AppError> {
        match details {
            RequestDetails::Leave {
                leave_type,
                reason,
                from,
                to,
                documents,
                ..
            } => {
                if from > to {
                    return Err(AppError::BadRequest(
                        "Leave range start must not be after its end".to_string(),
                    ));
                }
                require_reason(&reason)?;
                let days = business_days(from, to, self.rules.non_working_weekday);
                Ok(RequestDetails::Leave {
                    leave_type,
                    reason,
                    from,
                    to,
                    total_hours: round2(days as f64 * self.rules.workday_hours),
                    documents,
                })
            }
            RequestDetails::TimeOff {
                reason,
                from_hour,
                to_hour,
                ..
            } => {
                require_reason(&reason)?;
                let total_hours = self.window_hours(&from_hour, &to_hour)?;
                Ok(RequestDetails::TimeOff {
                    reason,
                    from_hour,
                    to_hour,
                    total_hours,
                })
            }
            RequestDetails::Overtime {
                reason,
                from_hour,
                to_hour,
                ..
            } => {
                require_reason(&reason)?;
                let total_hours = self.window_hours(&from_hour, &to_hour)?;
                Ok(RequestDetails::Overtime {
                    reason,
                    from_hour,
                    to_hour,
                    total_hours,
                })
            }
            RequestDetails::AttendanceCorrection {
                reason,
                attendance_id,
                proposed_check_in,
                proposed_check_out,
            } => {
                require_reason(&reason)?;
                if proposed_check_out <= proposed_check_in {
                    return Err(AppError::BadRequest(
                        "Proposed check-out must be after the proposed check-in".to_string(),
                    ));
                }
                Ok(RequestDetails::AttendanceCorrection {
                    reason,
                    attendance_id,
                    proposed_check_in,
                    proposed_check_out,
                })
            }
            RequestDetails::Loan {
                amount,
                loan_type,
                duration_months,
                purpose,
                ..
            } => {
                if amount <= 0.0 {
                    return Err(AppError::BadRequest(
                        "Loan amount must be positive".to_string(),
                    ));
                }
                if duration_months == 0 {
                    return Err(AppError::BadRequest(
                        "Loan duration must be at least one month".to_string(),
                    ));
                }
                let installment = round2(amount / duration_months as f64);
                Ok(RequestDetails::Loan {
                    amount,
                    loan_type,
                    duration_months,
                    purpose,
                    installment,
                })
            }
        }
    }

    fn window_hours(&self, from_hour: &str, to_hour: &str) -> Result<f64, AppError> {
        let from = parse_hour(from_hour)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid hour: {}", from_hour)))?;
        let to = parse_hour(to_hour)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid hour: {}", to_hour)))?;
        let hours = hour_window(from, to).ok_or_else(|| {
            AppError::BadRequest("Start and end of the window must differ".to_string())
        })?;
        Ok(round2(hours))
    }

    /// Leave longer than one workday and all loans escalate past the manager.
    fn requires_admin_approval(&self, details: &RequestDetails) -> bool {
        match details {
            RequestDetails::Leave { total_hours, .. } => *total_hours > self.rules.workday_hours,
            RequestDetails::Loan { .. } => true,
            _ => false,
        }
    }

    async fn authorize_decision(
        &self,
        viewer: &AuthUser,
        request: &WorkforceRequest,
    ) -> Result<(), AppError> {
        if viewer.is_admin() {
            return Ok(());
        }
        if request.admin_approval {
            return Err(AppError::Forbidden(
                "This request requires an admin decision".to_string(),
            ));
        }
        let employee = self
            .directory
            .resolve_employee(&self.db, &request.employee_id)
            .await?;
        if employee.reporting_to.as_deref() != Some(viewer.user_id.as_str()) {
            return Err(AppError::Forbidden(
                "Only the employee's manager can decide this request".to_string(),
            ));
        }
        Ok(())
    }

    async fn authorize_view(
        &self,
        viewer: &AuthUser,
        request: &WorkforceRequest,
    ) -> Result<(), AppError> {
        if viewer.is_admin() {
            if viewer.tenant_id.as_deref() != Some(request.tenant_id.as_str()) {
                return Err(AppError::Forbidden(
                    "Request belongs to another tenant".to_string(),
                ));
            }
            return Ok(());
        }
        if viewer.employee_id.as_deref() == Some(request.employee_id.as_str()) {
            return Ok(());
        }
        let employee = self
            .directory
            .resolve_employee(&self.db, &request.employee_id)
            .await?;
        if employee.reporting_to.as_deref() == Some(viewer.user_id.as_str()) {
            return Ok(());
        }
        Err(AppError::Forbidden(
            "Not visible to this account".to_string(),
        ))
    }
}

fn require_reason(reason: &str) -> Result<(), AppError> {
    if reason.trim().is_empty() {
        return Err(AppError::BadRequest(
            "reason must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn paginate<T>(items: Vec<T>, page: i64, per_page: i64) -> Vec<T> {
    let start = ((page - 1) * per_page) as usize;
    items
        .into_iter()
        .skip(start)
        .take(per_page as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::paginate;

    #[test]
    fn paginate_slices_by_page() {
        let items: Vec<i32> = (1..=25).collect();
        assert_eq!(paginate(items.clone(), 1, 10), (1..=10).collect::<Vec<_>>());
        assert_eq!(paginate(items.clone(), 3, 10), (21..=25).collect::<Vec<_>>());
        assert!(paginate(items, 4, 10).is_empty());
    }
}
