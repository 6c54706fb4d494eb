pub mod record;
pub mod auth;
pub mod property;
pub mod tenancy;
pub mod finance;
pub mod maintenance;
pub mod reminder;
pub mod audit;
