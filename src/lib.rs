//! # mqtt-hwmon-temp
//!
//! `mqtt-hwmon-temp` publishes hwmon temperature sensors to the MQTT integration of Home Assistant
//!
//!

pub use self::configuration::Configuration;
pub use self::configuration::Mqtt;
pub use self::configuration::RouteTable;
pub use self::configuration::Sensors;
pub use self::home_assistant::DeviceComponent;
pub use self::home_assistant::RegistrationDescriptor;
pub use self::hwmon::DiscoveredSet;
pub use self::publisher::Publisher;

/// Contains the configuration stuff
pub mod configuration;
/// Contains Home Assistant registration data
pub mod home_assistant;
/// Contains the sensor discovery code
pub mod hwmon;
/// Contains the publish session code
pub mod publisher;
