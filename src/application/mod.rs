pub mod batcher;
pub mod breaker;
pub mod manager;
pub mod resources;
