//! Daily solar energy totals

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::Record;

/// Energy totals in Wh for one day, keyed by `date`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyReading {
    pub date: NaiveDate,
    pub import: f64,
    pub export: f64,
    pub consumption: f64,
    pub self_consumption: f64,
    pub production: f64,
}

impl EnergyReading {
    pub const TABLE: &'static str = "energy";
    pub const KEY_COLUMNS: [&'static str; 1] = ["date"];

    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    /// Assign a meter total by its column name; unknown columns are ignored
    pub fn set_meter(&mut self, column: &str, value: f64) -> bool {
        let slot = match column {
            "import" => &mut self.import,
            "export" => &mut self.export,
            "consumption" => &mut self.consumption,
            "self_consumption" => &mut self.self_consumption,
            "production" => &mut self.production,
            _ => return false,
        };
        *slot = value;
        true
    }

    #[must_use]
    pub fn to_record(&self) -> Record {
        Record::new()
            .with("date", self.date)
            .with("import", self.import)
            .with("export", self.export)
            .with("consumption", self.consumption)
            .with("self_consumption", self.self_consumption)
            .with("production", self.production)
    }

    pub fn from_record(record: &Record) -> Result<Self, DomainError> {
        Ok(Self {
            date: record.date("date")?,
            import: record.float("import")?,
            export: record.float("export")?,
            consumption: record.float("consumption")?,
            self_consumption: record.float("self_consumption")?,
            production: record.float("production")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_meter_assigns_known_columns() {
        let mut e = EnergyReading::new(NaiveDate::from_ymd_opt(2024, 7, 4).unwrap());
        assert!(e.set_meter("export", 1200.0));
        assert!(e.set_meter("self_consumption", 300.0));
        assert!(!e.set_meter("battery", 1.0));
        assert!((e.export - 1200.0).abs() < f64::EPSILON);
        assert!((e.self_consumption - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn record_round_trip() {
        let mut e = EnergyReading::new(NaiveDate::from_ymd_opt(2024, 7, 4).unwrap());
        e.set_meter("production", 15_000.0);
        let back = EnergyReading::from_record(&e.to_record()).unwrap();
        assert_eq!(back, e);
    }
}
