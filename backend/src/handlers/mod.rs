pub mod attendance;
pub mod payroll;
pub mod requests;
