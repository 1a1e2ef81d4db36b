mod common;
use common::*;

use std::io::Write;
use std::time::Duration;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn loads_minimal_config() {
    let file = write_config(
        r#"
devices:
  - host: 192.168.1.50
"#,
    );

    let config = Config::new(file.path().to_string_lossy().to_string()).unwrap();

    assert_eq!(config.loglevel, "info");
    assert_eq!(config.poll_interval(), Duration::from_secs(30));
    assert_eq!(config.devices.len(), 1);

    let device = &config.devices[0];
    assert!(device.enabled());
    assert_eq!(device.port(), 53970);
    assert_eq!(device.name(), "192.168.1.50:53970");
    assert_eq!(device.endpoint(), Endpoint::new("192.168.1.50", 53970));
    assert_eq!(device.transport_settings(), TransportSettings::default());
}

#[test]
fn loads_full_config() {
    let config = Config::from_yaml(
        r#"
loglevel: debug
poll_interval_secs: 10
devices:
  - name: battery-1
    host: 10.0.0.2
    port: 8899
    connect_timeout_ms: 1500
    write_timeout_ms: 700
    read_timeout_ms: 250
    read_attempts: 4
  - name: spare
    host: 10.0.0.3
    enabled: false
"#,
    )
    .unwrap();

    assert_eq!(config.loglevel, "debug");
    assert_eq!(config.poll_interval(), Duration::from_secs(10));

    let enabled = config.enabled_devices();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].name(), "battery-1");
    assert_eq!(
        enabled[0].transport_settings(),
        TransportSettings {
            connect_timeout: Duration::from_millis(1500),
            write_timeout: Duration::from_millis(700),
            read_timeout: Duration::from_millis(250),
            read_attempts: 4,
        }
    );
}

#[test]
fn rejects_bad_values() {
    let cases = [
        "devices:\n  - host: 10.0.0.2\n    port: 0\n",
        "devices:\n  - host: ''\n",
        "devices:\n  - host: 10.0.0.2\n    read_attempts: 0\n",
        "devices:\n  - host: 10.0.0.2\n    read_timeout_ms: 0\n",
        "poll_interval_secs: 0\ndevices:\n  - host: 10.0.0.2\n",
        "devices: nope\n",
    ];

    for case in cases {
        assert!(Config::from_yaml(case).is_err(), "accepted: {}", case);
    }
}

#[test]
fn disabled_devices_are_not_validated() {
    let config = Config::from_yaml("devices:\n  - host: ''\n    enabled: false\n").unwrap();
    assert!(config.enabled_devices().is_empty());
}

#[test]
fn missing_file_is_an_error() {
    let err = Config::new("/nonexistent/felicity.yaml".to_string()).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/felicity.yaml"));
}
