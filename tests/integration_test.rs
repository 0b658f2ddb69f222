use mqtt_hwmon_temp::configuration::Configuration;
use mqtt_hwmon_temp::hwmon;
use mqtt_hwmon_temp::publisher::Publisher;
use std::error::Error;
use std::fs;
use tempfile::TempDir;

/// Default configuration pointed at a synthetic hwmon tree
fn test_config(dir: &TempDir) -> Result<Configuration, Box<dyn Error>> {
    let mut conf = Configuration::load("conf/mqtt-hwmon-temp.conf")?;
    conf.sensors.path = dir.path().to_path_buf();
    Ok(conf)
}

#[test]
fn test_scan_with_default_routes() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("temp1_input"), "42000\n")?;
    fs::write(dir.path().join("temp1_label"), "Composite\n")?;
    fs::write(dir.path().join("temp2_input"), "36500\n")?;
    fs::write(dir.path().join("temp2_label"), "Sensor 1\n")?;
    fs::write(dir.path().join("temp3_input"), "50000\n")?;
    fs::write(dir.path().join("temp3_label"), "Package id 0\n")?;

    let conf = test_config(&dir)?;
    let readings = hwmon::scan(&conf.sensors);

    println!("Discovered {} readings", readings.len());

    // "Package id 0" has no route in the default configuration
    assert_eq!(readings.len(), 2);
    assert_eq!(readings.get("Composite"), Some(42.0));
    assert_eq!(readings.get("Sensor 1"), Some(36.5));
    assert_eq!(readings.get("Package id 0"), None);

    // Every discovered reading resolves to a topic
    for (label, _) in readings.iter() {
        assert!(conf.sensors.topics.resolve(label).is_some());
    }

    Ok(())
}

#[test]
fn test_empty_scan_short_circuits() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let conf = test_config(&dir)?;

    let readings = hwmon::scan(&conf.sensors);

    // main() exits before any broker connection when nothing was discovered
    assert!(readings.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_connect_failure_aborts_run() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("temp1_input"), "42000")?;
    fs::write(dir.path().join("temp1_label"), "Composite")?;

    let mut conf = test_config(&dir)?;
    // Nothing listens on port 1, the connection is refused immediately
    conf.mqtt.host = String::from("127.0.0.1");
    conf.mqtt.port = 1;

    let readings = hwmon::scan(&conf.sensors);
    assert_eq!(readings.len(), 1);

    // The session logs the connect error and returns without publishing
    Publisher::new(conf).run(readings).await;

    Ok(())
}
