pub mod attempt_repo;
pub mod failed_repo;
pub mod payment_repo;
pub mod timeline_repo;
