pub mod failed_repo;
pub mod notification_repo;
