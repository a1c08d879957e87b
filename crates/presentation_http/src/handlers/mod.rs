//! HTTP request handlers

pub mod dashboard;
pub mod health;
pub mod notifications;
pub mod weather;
