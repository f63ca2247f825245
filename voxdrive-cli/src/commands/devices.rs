//! `voxdrive devices` — list audio inputs and serial ports.

use voxdrive_core::{audio::list_input_devices, SerialLink};

pub fn run() -> anyhow::Result<()> {
    let inputs = list_input_devices();
    if inputs.is_empty() {
        println!("no audio input devices found");
    } else {
        println!("audio inputs:");
        for device in inputs {
            let marker = if device.is_default { "  (default)" } else { "" };
            println!("  {}{marker}", device.name);
        }
    }

    let ports = SerialLink::available_ports();
    if ports.is_empty() {
        println!("no serial ports found");
    } else {
        println!("serial ports:");
        for port in ports {
            println!("  {port}");
        }
    }
    Ok(())
}
