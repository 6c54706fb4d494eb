pub mod audit_service;
pub use audit_service::AuditService;
pub mod auth;
pub use auth::AccountService;
pub mod fixture_service;
pub use fixture_service::{FixtureReport, FixtureService};
