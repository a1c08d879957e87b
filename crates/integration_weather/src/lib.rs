//! Weather and location integration
//!
//! Clients for the OpenWeatherMap One Call API
//! (<https://openweathermap.org/api/one-call-3>) and the ipinfo.io lookup
//! of the caller's own address.

pub mod client;
pub mod location;
mod models;

pub use client::{
    OpenWeatherClient, OpenWeatherCredentials, WeatherClient, WeatherConfig, WeatherError,
    icon_url,
};
pub use location::{IpinfoClient, IpinfoCredentials, LocationClient, LocationConfig};
pub use models::{Conditions, DailyOutlook, IpDetails, OneCall, TempRange, WeatherTag};
