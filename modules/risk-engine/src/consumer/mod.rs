pub mod failure_tracker;
pub mod request_consumer;
