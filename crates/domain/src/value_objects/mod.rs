//! Value objects

mod location;
mod record;
mod time;

pub use location::{Location, Range, Thresholds, celsius_to_fahrenheit};
pub use record::{Record, SqlValue};
pub use time::{format_uptime, truncate_to_minute};
