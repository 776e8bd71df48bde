pub mod entity;
pub mod manager;
pub mod models;
pub mod repository;
pub mod role_adapter;
pub mod schema;
pub mod search;
pub mod statements;
pub mod value;

pub use manager::{DatabaseError, DatabaseManager};
