//! Storage layer - concrete storage adapters

pub mod entity;
pub mod mapper;
pub mod memory;
pub mod migrations;
pub mod repositories;

pub use memory::InMemoryStorage;
pub use repositories::SeaOrmStorage;
