//! API Module
//!
//! HTTP handlers and routing for inspecting and driving a hosted cache.
//!
//! # Endpoints
//! - `PUT /cache` - Store a value
//! - `GET /cache/:key` - Retrieve a value by key
//! - `DELETE /cache/:key` - Remove a key from both tiers
//! - `DELETE /cache` - Clear both tiers and reset statistics
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
