//! Domain services: attendance lifecycle, request workflow, visibility, and
//! payroll projections.

pub mod attendance;
pub mod events;
pub mod payroll;
pub mod requests;
pub mod scope;

pub use attendance::AttendanceTracker;
pub use events::{LeaveApproved, LeaveApprovedSink};
pub use payroll::PayrollProjection;
pub use requests::RequestWorkflow;
pub use scope::{ResolvedScope, ScopeMode, VisibilityResolver};
