// src/lib.rs

pub mod classify;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod export;
pub mod handlers;
pub mod models;
pub mod render;
pub mod repository;
pub mod routes;
pub mod state;
pub mod taxonomy;

// Re-export specific items for convenience if needed
pub use routes::create_router;
