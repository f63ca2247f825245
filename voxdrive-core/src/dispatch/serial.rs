//! Serial transport for the single-byte command protocol.

use std::io::Write;
use std::time::Duration;

use tracing::info;

use crate::dispatch::CommandLink;
use crate::error::{Result, VoxdriveError};

/// Dev boards auto-reset when the host opens the port; give the firmware
/// time to come back up before the first command byte.
const BOOT_SETTLE: Duration = Duration::from_secs(2);

const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// One open serial port carrying command bytes to the motor controller.
pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLink {
    /// Open `path` at `baud`, then block through the boot settle window.
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(WRITE_TIMEOUT)
            .open()
            .map_err(|e| VoxdriveError::Serial(format!("cannot open {path}: {e}")))?;
        info!(port = %path, baud, "serial link open, waiting for the controller to boot");
        std::thread::sleep(BOOT_SETTLE);
        Ok(Self { port })
    }

    /// Names of the serial ports visible to the host.
    pub fn available_ports() -> Vec<String> {
        serialport::available_ports()
            .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
            .unwrap_or_default()
    }
}

impl CommandLink for SerialLink {
    fn send(&mut self, code: u8) -> Result<()> {
        self.port
            .write_all(&[code])
            .and_then(|()| self.port.flush())
            .map_err(|e| VoxdriveError::Serial(format!("write failed: {e}")))
    }
}
