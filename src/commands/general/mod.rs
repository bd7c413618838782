pub mod contribute;
pub mod crash_reports;
pub mod invite;
pub mod ping;
