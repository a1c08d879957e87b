//! Local hardware paths read by the sensor and health collectors

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// DHT22 exposed through the Linux IIO subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorDeviceConfig {
    /// IIO device directory holding `in_temp_input` and `in_humidityrelative_input`
    #[serde(default = "default_iio_device")]
    pub iio_device: PathBuf,

    /// Platform driver directory used to rebind the device on reset,
    /// e.g. `/sys/bus/platform/drivers/dht11`
    #[serde(default)]
    pub driver_dir: Option<PathBuf>,

    /// Device name written to the driver's `unbind`/`bind` files
    #[serde(default)]
    pub device_name: Option<String>,
}

fn default_iio_device() -> PathBuf {
    PathBuf::from("/sys/bus/iio/devices/iio:device0")
}

impl Default for SensorDeviceConfig {
    fn default() -> Self {
        Self {
            iio_device: default_iio_device(),
            driver_dir: None,
            device_name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Millidegree CPU temperature file
    #[serde(default = "default_thermal_zone")]
    pub thermal_zone: PathBuf,

    /// Mount point whose usage is reported
    #[serde(default = "default_disk_mount")]
    pub disk_mount: PathBuf,
}

fn default_thermal_zone() -> PathBuf {
    PathBuf::from("/sys/class/thermal/thermal_zone0/temp")
}

fn default_disk_mount() -> PathBuf {
    PathBuf::from("/")
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            thermal_zone: default_thermal_zone(),
            disk_mount: default_disk_mount(),
        }
    }
}
