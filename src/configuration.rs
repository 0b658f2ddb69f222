use serde::Deserialize;
use serde_inline_default::serde_inline_default;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;

/// Contains the configuration for communicating with the MQTT broker
#[serde_inline_default]
#[derive(Deserialize)]
pub struct Mqtt {
    /// Hostname or IP address. Default: localhost
    #[serde_inline_default(String::from("localhost"))]
    pub host: String,

    /// Port of the connection to the broker. Default: 1883
    #[serde_inline_default(1883)]
    pub port: u16,

    /// Username for the connection to the broker. Default: empty
    #[serde(default)]
    pub user: String,

    /// Password for the connection to the broker. Default: empty
    #[serde(default)]
    pub password: String,

    /// Keep-alive interval of the connection in seconds. Default: 60
    #[serde_inline_default(60)]
    #[serde(rename = "keep-alive")]
    pub keep_alive: u64,

    /// Name of the device entity, also used as the MQTT client ID. It should
    /// be unique in Home Assistant. Default: machine hostname
    #[serde(default = "hostname")]
    pub entity: String,

    /// Prefix for the registration topic sent to Home Assistant.
    ///
    /// When set, a discovery descriptor is published before the readings so
    /// that Home Assistant creates one temperature entity per configured
    /// topic. When unset, only the readings themselves are published.
    ///
    /// This must match the configuration of the MQTT integration in Home Assistant
    ///
    /// See <https://www.home-assistant.io/integrations/mqtt#discovery-options>
    #[serde(default)]
    #[serde(rename = "registration-prefix")]
    pub registration_prefix: Option<String>,
}

/// Maps sensor label strings to the MQTT topics their readings are published to.
///
/// Lookups are exact string matches; a label without an entry is never
/// published. The table is loaded once from the configuration and not
/// mutated afterwards.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct RouteTable(BTreeMap<String, String>);

impl RouteTable {
    /// Returns the topic configured for the label, if any.
    pub fn resolve(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }

    /// Returns `true` if the label has a configured topic.
    pub fn contains(&self, label: &str) -> bool {
        self.0.contains_key(label)
    }

    /// Iterates over the (label, topic) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(l, t)| (l.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Contains the configuration for the hwmon sensors
#[serde_inline_default]
#[derive(Deserialize)]
pub struct Sensors {
    /// Root of the hwmon sysfs subtree that exposes the `temp{N}_input` and
    /// `temp{N}_label` files. Default: /sys/class/hwmon/hwmon1
    #[serde_inline_default(PathBuf::from("/sys/class/hwmon/hwmon1"))]
    pub path: PathBuf,

    /// Upper bound of the sensor index enumeration. Indices 1..=max-index are
    /// probed; missing indices are skipped. Default: 9
    #[serde_inline_default(9)]
    #[serde(rename = "max-index")]
    pub max_index: u32,

    /// Sensor label to MQTT topic routes. Labels without an entry here are
    /// ignored during the scan.
    #[serde(default)]
    pub topics: RouteTable,
}

/// Contains the configuration for the log output
#[serde_inline_default]
#[derive(Deserialize)]
pub struct Log {
    /// If set, log records are appended to this file, rotated by size.
    /// If unset, log records go to stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Maximum size of the log file before it is rotated, in bytes. Default: 1 MiB
    #[serde_inline_default(1_048_576)]
    #[serde(rename = "max-size")]
    pub max_size: u64,

    /// Number of rotated log files to keep. Default: 3
    #[serde_inline_default(3)]
    pub backups: usize,
}

impl Default for Log {
    fn default() -> Log {
        Log {
            file: None,
            max_size: 1_048_576,
            backups: 3,
        }
    }
}

/// Contains all the configuration for `mqtt-hwmon-temp`
#[serde_inline_default]
#[derive(Deserialize)]
pub struct Configuration {
    /// Contains the configuration for communicating with the MQTT broker
    pub mqtt: Mqtt,

    /// Contains the configuration for the hwmon sensors
    pub sensors: Sensors,

    /// Contains the configuration for the log output
    #[serde(default)]
    pub log: Log,

    /// Sets the verbosity of the logs.
    ///  * 0 => Error
    ///  * 1 => Warning
    ///  * 2 => Info
    ///  * 3 => Debug
    ///  * 4 => Trace
    #[serde_inline_default(2)]
    #[serde(rename = "log-verbosity")]
    pub log_verbosity: usize,
}

fn hostname() -> String {
    sysinfo::System::host_name().expect("Cannot read hostname")
}

impl Configuration {
    /// Load the configuration from a file
    ///
    /// ## Example
    ///
    /// ```
    /// use mqtt_hwmon_temp::Configuration;
    ///
    /// let config = Configuration::load("conf/mqtt-hwmon-temp.conf").expect("Cannot load configuration");
    ///
    /// assert_eq!(config.mqtt.host, "localhost");
    /// ```
    pub fn load(path: &str) -> Result<Configuration, Box<dyn Error>> {
        toml::from_str(std::fs::read_to_string(path)?.as_str()).map_err(|err| err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that we can properly load the default configuration
    #[test]
    fn test_default_config() -> Result<(), Box<dyn Error>> {
        let conf = Configuration::load("conf/mqtt-hwmon-temp.conf")?;

        assert_eq!(conf.mqtt.host, String::from("localhost"));
        assert_eq!(conf.mqtt.port, 1883);
        assert_eq!(conf.mqtt.keep_alive, 60);

        // By default, the entity name will be the hostname of the machine
        assert_eq!(conf.mqtt.entity, hostname());

        // Registration is off by default
        assert_eq!(conf.mqtt.registration_prefix, None);

        assert_eq!(conf.sensors.path, PathBuf::from("/sys/class/hwmon/hwmon1"));
        assert_eq!(conf.sensors.max_index, 9);
        assert_eq!(conf.sensors.topics.len(), 3);

        assert_eq!(conf.log.file, None);
        assert_eq!(conf.log.max_size, 1_048_576);
        assert_eq!(conf.log.backups, 3);

        Ok(())
    }

    /// Test that route lookups are exact matches
    #[test]
    fn test_route_resolution() -> Result<(), Box<dyn Error>> {
        let conf = Configuration::load("conf/mqtt-hwmon-temp.conf")?;
        let topics = &conf.sensors.topics;

        assert_eq!(
            topics.resolve("Composite"),
            Some("puch_rack/nvme/composite")
        );
        assert_eq!(topics.resolve("Sensor 1"), Some("puch_rack/nvme/sensor_1"));

        assert!(!topics.contains("composite"));
        assert!(!topics.contains("Composite "));
        assert_eq!(topics.resolve("Package id 0"), None);

        Ok(())
    }
}
