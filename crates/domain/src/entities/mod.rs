//! Domain entities
//!
//! Each entity maps to one table and converts to and from a [`Record`](crate::value_objects::Record),
//! except the weather types, which only live in memory.

mod energy;
mod environment;
mod notification;
mod power;
mod quote;
mod system_stats;
mod weather;

pub use energy::EnergyReading;
pub use environment::EnvironmentReading;
pub use notification::{Notification, NotificationKind, NotificationStatus};
pub use power::PowerFlow;
pub use quote::Quote;
pub use system_stats::{CriticalStat, SystemStats};
pub use weather::{DayForecast, GeoLocation, WeatherReport};
