pub mod authorize_consumer;
