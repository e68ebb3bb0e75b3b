//! Database access behind mockable traits.

pub mod attendance_repository;
pub mod directory;
pub mod request_repository;

pub use attendance_repository::{AttendanceRepository, AttendanceRepositoryTrait};
pub use directory::{OrganizationDirectory, OrganizationDirectoryTrait};
pub use request_repository::{RequestFilter, RequestRepository, RequestRepositoryTrait};
