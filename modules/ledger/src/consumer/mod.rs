pub mod capture_consumer;
