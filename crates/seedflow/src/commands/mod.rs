pub mod auth;
pub mod plan;
pub mod report;
pub mod up;
pub mod validate;
