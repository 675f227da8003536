use std::path::PathBuf;
use tabled::{Table, Tabled, settings::Style};
use vanced_bridge::{AdbClient, DeviceBridge};
use vanced_core::AndroidSdk;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "State")]
    state: String,
}

pub fn run(android_sdk: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    // Starting the server is best effort; a running server is enough.
    let adb = android_sdk
        .and_then(|root| AndroidSdk::new(root).ok())
        .map(|sdk| sdk.adb());
    let client = AdbClient::from_env(adb);
    client.start()?;

    let devices = client.devices()?;
    if devices.is_empty() {
        println!("No devices attached");
        return Ok(());
    }

    let rows: Vec<DeviceRow> = devices
        .into_iter()
        .map(|d| DeviceRow {
            serial: d.serial,
            state: d.state.to_string(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}
