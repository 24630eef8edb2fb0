pub mod terminal_consumer;
