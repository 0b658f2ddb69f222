use crate::configuration::Sensors;
use log::{debug, warn};
use std::error::Error;
use std::path::{Path, PathBuf};

/// Temperatures discovered during a scan, keyed by sensor label.
///
/// Insertion order is preserved so the publish order (and the logs) follow
/// the sensor index order. Inserting an already-present label overwrites its
/// value.
#[derive(Debug, Default, PartialEq)]
pub struct DiscoveredSet(Vec<(String, f64)>);

impl DiscoveredSet {
    /// Records a reading, replacing any previous value for the same label.
    pub fn insert(&mut self, label: String, celsius: f64) {
        match self.0.iter_mut().find(|(known, _)| *known == label) {
            Some((_, value)) => *value = celsius,
            None => self.0.push((label, celsius)),
        }
    }

    /// Returns the recorded temperature for the label, if any.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(known, _)| known == label)
            .map(|(_, value)| *value)
    }

    /// Iterates over the readings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(label, value)| (label.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Scans the hwmon subtree for temperature sensors with a configured route.
///
/// Probes `temp{N}_input` for N in 1..=max-index. Indices without an input
/// file are skipped, as are sensors whose label is missing or has no entry in
/// the route table. A failed read of a matched sensor is logged and the scan
/// continues with the next index.
pub fn scan(sensors: &Sensors) -> DiscoveredSet {
    let mut found = DiscoveredSet::default();

    for index in 1..=sensors.max_index {
        let input = input_path(&sensors.path, index);
        if !input.exists() {
            continue;
        }

        let label = match read_label(&sensors.path, index) {
            Ok(label) => label,
            Err(err) => {
                warn!("Failed to read temp{index} label: {err}");
                continue;
            }
        };

        let Some(label) = label else {
            debug!("Ignoring temp{index} without a label");
            continue;
        };

        if !sensors.topics.contains(&label) {
            debug!("Ignoring temp{index} with unrouted label {label:?}");
            continue;
        }

        match read_temp(&input) {
            Ok(celsius) => {
                debug!("temp{index} ({label}): {celsius:.1}°C");
                found.insert(label, celsius);
            }
            Err(err) => warn!("Failed to read temp{index}: {err}"),
        }
    }

    found
}

fn input_path(root: &Path, index: u32) -> PathBuf {
    root.join(format!("temp{index}_input"))
}

fn label_path(root: &Path, index: u32) -> PathBuf {
    root.join(format!("temp{index}_label"))
}

/// Reads the label of sensor `index`, or `None` if the sensor has none.
fn read_label(root: &Path, index: u32) -> Result<Option<String>, Box<dyn Error>> {
    let path = label_path(root, index);
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(std::fs::read_to_string(path)?.trim().to_string()))
}

/// Reads a `temp{N}_input` file. The kernel reports milli-degrees Celsius.
fn read_temp(path: &Path) -> Result<f64, Box<dyn Error>> {
    Ok(std::fs::read_to_string(path)?.trim().parse::<i64>()? as f64 / 1000.0)
}
