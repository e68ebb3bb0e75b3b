use std::sync::Arc;

use crate::{
    config::Config,
    db::connection::DbPool,
    services::{AttendanceTracker, PayrollProjection, RequestWorkflow},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
    pub tracker: Arc<AttendanceTracker>,
    pub workflow: Arc<RequestWorkflow>,
    pub payroll: Arc<PayrollProjection>,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        config: Config,
        tracker: Arc<AttendanceTracker>,
        workflow: Arc<RequestWorkflow>,
        payroll: Arc<PayrollProjection>,
    ) -> Self {
        Self {
            pool,
            config,
            tracker,
            workflow,
            payroll,
        }
    }
}
