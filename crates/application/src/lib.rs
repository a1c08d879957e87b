//! Application layer - ports and services
//!
//! Declares the ports the infrastructure adapters implement and the services
//! the daemons and the dashboard run on top of them, including the
//! deferred-write path that keeps collectors working through store outages.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
