//! Host-side supervisor: stop flag, state logging and sample output

use chrono::{DateTime, Utc};
use oemx_core::driver::{DeviceInfo, Measurement};
use oemx_core::supervisor::{EntityState, Supervisor};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One line of `--json` output
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record<'a> {
    Device {
        timestamp: DateTime<Utc>,
        #[serde(flatten)]
        info: &'a DeviceInfo,
    },
    Sample {
        timestamp: DateTime<Utc>,
        #[serde(flatten)]
        measurement: &'a Measurement,
    },
    State {
        timestamp: DateTime<Utc>,
        state: &'static str,
    },
}

pub struct HostSupervisor {
    stop: Arc<AtomicBool>,
    json: bool,
}

impl HostSupervisor {
    pub fn new(stop: Arc<AtomicBool>, json: bool) -> Self {
        Self { stop, json }
    }

    fn emit(&self, record: &Record<'_>) {
        if !self.json {
            return;
        }
        match serde_json::to_string(record) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("Failed to serialize record: {}", e),
        }
    }
}

impl Supervisor for HostSupervisor {
    fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn set_entity_state(&mut self, state: EntityState) {
        tracing::info!("entity state: {}", state.status());
        self.emit(&Record::State {
            timestamp: Utc::now(),
            state: state.status(),
        });
    }

    fn on_device_info(&mut self, info: &DeviceInfo) {
        self.emit(&Record::Device {
            timestamp: Utc::now(),
            info,
        });
    }

    fn on_measurement(&mut self, measurement: &Measurement) {
        self.emit(&Record::Sample {
            timestamp: Utc::now(),
            measurement,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_record_shape() {
        let measurement = Measurement {
            temperature: 15.0,
            salinity: 35.0,
            pressure: 10.0,
            conductivity: 42.914,
            sound_speed: 1506.7,
        };
        let record = Record::Sample {
            timestamp: Utc::now(),
            measurement: &measurement,
        };
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["kind"], "sample");
        assert_eq!(value["salinity"], 35.0);
        assert_eq!(value["conductivity"], 42.914);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_stop_flag() {
        let stop = Arc::new(AtomicBool::new(false));
        let host = HostSupervisor::new(stop.clone(), false);
        assert!(!host.is_stopping());
        stop.store(true, Ordering::SeqCst);
        assert!(host.is_stopping());
    }
}
