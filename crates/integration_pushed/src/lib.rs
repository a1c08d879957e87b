//! Pushed.co push notifications
//!
//! Sends a short text to every device subscribed to a Pushed app.

pub mod client;

pub use client::{PushedClient, PushedConfig, PushedCredentials, PushedError, PushedHttpClient};
