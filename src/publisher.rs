use crate::configuration::Configuration;
use crate::home_assistant::RegistrationDescriptor;
use crate::hwmon::DiscoveredSet;
use log::{debug, error, info, trace, warn};
use rumqttc::{AsyncClient, ClientError, Event, Incoming, MqttOptions, QoS};
use std::error::Error;
use std::time::Duration;
use tokio::task;
use tokio::time::sleep;

/// One-shot publish session that sends the discovered readings to MQTT
pub struct Publisher {
    config: Configuration,
    mqtt_config: MqttOptions,
    registration_descriptor: Option<RegistrationDescriptor>,
}

impl Publisher {
    /// Constructs a publisher from the specified configuration
    ///
    /// ```
    /// use mqtt_hwmon_temp::{Configuration, Publisher};
    ///
    /// let config = Configuration::load("conf/mqtt-hwmon-temp.conf").expect("Cannot load configuration");
    /// let publisher = Publisher::new(config);
    ///
    /// // later, run publisher.run(readings) in an async function
    /// ```
    pub fn new(config: Configuration) -> Publisher {
        let mut mqtt_config =
            MqttOptions::new(&config.mqtt.entity, &config.mqtt.host, config.mqtt.port);
        mqtt_config.set_keep_alive(Duration::from_secs(config.mqtt.keep_alive));
        if !config.mqtt.user.is_empty() {
            mqtt_config.set_credentials(&config.mqtt.user, &config.mqtt.password);
        }

        let registration_descriptor = config.mqtt.registration_prefix.as_ref().map(|_| {
            RegistrationDescriptor::for_routes(&config.mqtt.entity, &config.sensors.topics)
        });

        Publisher {
            mqtt_config,
            registration_descriptor,
            config,
        }
    }

    /// Returns the registration descriptor, if registration is configured
    pub fn registration_descriptor(&self) -> Option<&RegistrationDescriptor> {
        self.registration_descriptor.as_ref()
    }

    /// Runs the publish session for the discovered readings
    pub async fn run(&self, readings: DiscoveredSet) {
        self.session(readings).await.unwrap_or_else(|e| {
            error!("MQTT session failed: {e}");
        });
    }

    /// Connects, publishes every reading, then disconnects
    async fn session(&self, readings: DiscoveredSet) -> Result<(), Box<dyn Error>> {
        info!(
            "Connecting to MQTT broker {}:{}",
            self.config.mqtt.host, self.config.mqtt.port
        );

        let (client, mut event_loop) = AsyncClient::new(self.mqtt_config.clone(), 10);

        // Nothing is published until the broker has acknowledged the
        // connection. A failure here aborts the whole run.
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => break,
                Ok(notification) => trace!("MQTT notification received: {notification:?}"),
                Err(err) => {
                    return Err(format!(
                        "cannot connect to {}:{} - {err}",
                        self.config.mqtt.host, self.config.mqtt.port
                    )
                    .into());
                }
            }
        }

        task::spawn(async move {
            while let Ok(notification) = event_loop.poll().await {
                trace!("MQTT notification received: {notification:?}");
            }
        });

        self.publish_registration(&client).await;

        for (label, celsius) in readings.iter() {
            let Some(topic) = self.config.sensors.topics.resolve(label) else {
                warn!("No topic configured for label {label:?}, skipping");
                continue;
            };

            let payload = payload(celsius);
            match Publisher::publish(&client, topic, &payload).await {
                Ok(()) => info!("Published {payload}°C to {topic}"),
                Err(err) => error!("Failed to publish to {topic}: {err}"),
            }

            // Give the network loop time to send before the next publish
            sleep(Duration::from_millis(100)).await;
        }

        // Give the remaining packets a short moment to go out
        sleep(Duration::from_millis(500)).await;
        client.disconnect().await?;

        Ok(())
    }

    /// Publishes the Home Assistant discovery descriptor when configured.
    ///
    /// A failed registration does not stop the readings from being published.
    async fn publish_registration(&self, client: &AsyncClient) {
        let (Some(prefix), Some(descriptor)) = (
            self.config.mqtt.registration_prefix.as_deref(),
            self.registration_descriptor.as_ref(),
        ) else {
            return;
        };

        let topic = descriptor.discovery_topic(prefix);
        match Publisher::publish(client, topic.as_str(), &descriptor.to_string()).await {
            Ok(()) => info!("Published registration to {topic}"),
            Err(err) => error!("Failed to publish registration to {topic}: {err}"),
        }
    }

    // Publish a retained message to MQTT
    async fn publish<S>(client: &AsyncClient, topic: S, data: &str) -> Result<(), ClientError>
    where
        S: Into<String> + std::fmt::Display,
    {
        debug!("Publishing to topic {topic} : {data}");
        client.publish(topic, QoS::AtMostOnce, true, data).await
    }
}

/// Formats a temperature the way it is published, one fractional digit
fn payload(celsius: f64) -> String {
    format!("{celsius:.1}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_format() {
        assert_eq!(payload(42.0), "42.0");
        assert_eq!(payload(36.54), "36.5");
        assert_eq!(payload(7.0), "7.0");
        assert_eq!(payload(-5.5), "-5.5");
    }

    #[test]
    fn test_registration_off_by_default() {
        let config = Configuration::load("conf/mqtt-hwmon-temp.conf")
            .expect("Failed to load default config");
        let publisher = Publisher::new(config);

        assert!(publisher.registration_descriptor().is_none());
    }

    #[test]
    fn test_registration_descriptor_covers_routes() {
        let mut config = Configuration::load("conf/mqtt-hwmon-temp.conf")
            .expect("Failed to load default config");
        config.mqtt.registration_prefix = Some(String::from("homeassistant"));
        config.mqtt.entity = String::from("test_entity");

        let publisher = Publisher::new(config);
        let descriptor = publisher
            .registration_descriptor()
            .expect("registration descriptor not built");

        assert!(descriptor.has_route("Composite"));
        assert!(descriptor.has_route("Sensor 1"));
        assert!(descriptor.has_route("Sensor 2"));
        assert_eq!(
            descriptor.discovery_topic("homeassistant"),
            "homeassistant/device/test_entity/config"
        );
    }
}
