use crate::configuration::RouteTable;
use convert_case::{Case, Casing};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Registration descriptor sent to Home Assistant
///
/// This describes the device and its components (one temperature sensor per
/// configured topic route).
#[derive(Serialize, Debug)]
pub struct RegistrationDescriptor {
    /// Device sent to Home Assistant
    device: Device,

    /// Describes the origin of the messages, in this case `mqtt-hwmon-temp`
    origin: Origin,

    /// One temperature component per configured route, keyed by the
    /// snake-cased sensor label
    components: HashMap<String, DeviceComponent>,
}

/// Device sent to Home Assistant
#[derive(Serialize, Debug)]
pub struct Device {
    /// Name of the device. This corresponds to the `entity` configuration field
    name: String,

    /// Identifier of the device. This corresponds to the `entity` configuration field
    identifiers: String,
}

/// Describes the origin of the messages, in this case `mqtt-hwmon-temp`
#[derive(Serialize, Debug)]
pub struct Origin {
    /// Name of the origin, always `mqtt-hwmon-temp`
    name: &'static str,

    /// Version of `mqtt-hwmon-temp`
    sw_version: &'static str,

    /// URL of `mqtt-hwmon-temp`
    url: &'static str,
}

/// Temperature component registered for one route
#[derive(Serialize, Debug)]
pub struct DeviceComponent {
    /// Name of the component, shown in Home Assistant and converted into the entity ID
    name: String,

    /// Type of platform. Always `sensor`
    platform: &'static str,

    /// Device class helps Home Assistant to know how to interpret the reported values.
    ///
    /// See <https://www.home-assistant.io/integrations/sensor#device-class> for possible values here
    device_class: &'static str,

    /// Describes how Home Assistant stores the data. It is usually `measurement`
    state_class: &'static str,

    /// Unit used in the report
    unit_of_measurement: &'static str,

    /// Unique ID for the component. This is constructed from the entity and the label
    unique_id: String,

    /// Topic the readings for this component are published to. The payload is
    /// the raw state, so no value template is needed.
    state_topic: String,
}

impl RegistrationDescriptor {
    /// Creates a new registration descriptor, with no component configured.
    ///
    /// ## Example
    ///
    /// ```
    /// use mqtt_hwmon_temp::RegistrationDescriptor;
    ///
    /// let mut descriptor = RegistrationDescriptor::new("test_entity");
    /// assert!(!descriptor.has_route("Composite"));
    ///
    /// descriptor.add_route("Composite", "nvme/composite");
    /// assert!(descriptor.has_route("Composite"));
    /// ```
    pub fn new(name: &str) -> RegistrationDescriptor {
        let version = env!("CARGO_PKG_VERSION");
        let package_name = env!("CARGO_PKG_NAME");
        let url = env!("CARGO_PKG_HOMEPAGE");
        let entity = name.to_case(Case::Snake);

        RegistrationDescriptor {
            device: Device {
                name: name.to_string(),
                identifiers: entity,
            },
            origin: Origin {
                name: package_name,
                sw_version: version,
                url,
            },
            components: Default::default(),
        }
    }

    /// Creates a descriptor with one temperature component per route
    pub fn for_routes(name: &str, routes: &RouteTable) -> RegistrationDescriptor {
        let mut descriptor = RegistrationDescriptor::new(name);
        for (label, topic) in routes.iter() {
            descriptor.add_route(label, topic);
        }
        descriptor
    }

    /// Adds a temperature component for a route to the descriptor
    pub fn add_route(&mut self, label: &str, topic: &str) {
        self.components.insert(
            label.to_case(Case::Snake),
            DeviceComponent::temperature(label, topic, self.device.identifiers.as_str()),
        );
    }

    /// Returns `true` if a component is configured for the label
    pub fn has_route(&self, label: &str) -> bool {
        self.components.contains_key(&label.to_case(Case::Snake))
    }

    /// Discovery topic this descriptor is published to
    pub fn discovery_topic(&self, prefix: &str) -> String {
        format!("{prefix}/device/{}/config", self.device.identifiers)
    }
}

impl fmt::Display for RegistrationDescriptor {
    /// Formats the descriptor in JSON format
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Ok(descriptor) = serde_json::to_string(&self) else {
            return Err(fmt::Error);
        };
        write!(f, "{descriptor}")
    }
}

impl DeviceComponent {
    /// Creates a temperature component reporting on the given topic
    pub fn temperature(label: &str, topic: &str, entity: &str) -> DeviceComponent {
        DeviceComponent {
            name: label.to_string(),
            platform: "sensor",
            device_class: "temperature",
            state_class: "measurement",
            unit_of_measurement: "°C",
            unique_id: format!("{entity}_{}", label.to_case(Case::Snake)),
            state_topic: topic.to_string(),
        }
    }
}
