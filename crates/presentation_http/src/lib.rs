//! PiHome dashboard HTTP layer
//!
//! JSON endpoints polled by the home dashboard: solar production, room
//! sensors, node statistics, the quote of the day, unread notifications, and
//! the cached weather and location lookups.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use server::serve_with_drain_timeout;
pub use state::AppState;
