//! USB host abstraction for device discovery and control transfers.
//!
//! Provides a trait-based access layer so that the libusb backend and the
//! simulated bus used in tests share the same interface.

use crate::error::Result;
use std::time::Duration;

/// A device as reported by the host bus walk, before any handle is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDevice {
    pub bus: u8,
    pub address: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    /// String descriptor indices. `None` when the device declares index 0.
    pub manufacturer_index: Option<u8>,
    pub product_index: Option<u8>,
    pub serial_index: Option<u8>,
}

impl RawDevice {
    /// Identity key used for deduplication and lookup.
    pub fn identity(&self) -> (u16, u16) {
        (self.vendor_id, self.product_id)
    }

    /// Whether any string descriptor index is declared.
    pub fn has_strings(&self) -> bool {
        self.manufacturer_index.is_some()
            || self.product_index.is_some()
            || self.serial_index.is_some()
    }
}

/// Setup packet fields of a control transfer (everything except the data stage).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSetup {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
}

/// Abstraction over the host USB stack.
pub trait UsbHost {
    /// Walk the bus and return every attached device, in bus order.
    fn devices(&self) -> Result<Vec<RawDevice>>;

    /// Open a handle to a device previously returned by [`UsbHost::devices`].
    fn open(&self, device: &RawDevice) -> Result<Box<dyn UsbHandle + '_>>;
}

/// An open device handle. Dropping it closes the device.
pub trait UsbHandle {
    /// Read a string descriptor by index.
    fn read_string(&self, index: u8) -> Result<String>;

    /// Number of interfaces in the active configuration.
    fn interface_count(&self) -> Result<u8>;

    fn kernel_driver_active(&self, interface: u8) -> Result<bool>;

    fn detach_kernel_driver(&mut self, interface: u8) -> Result<()>;

    fn attach_kernel_driver(&mut self, interface: u8) -> Result<()>;

    /// Make the device adopt its first (default) configuration.
    fn set_default_configuration(&mut self) -> Result<()>;

    /// Host-to-device control transfer. Returns the number of bytes written.
    fn write_control(&self, setup: ControlSetup, data: &[u8], timeout: Duration) -> Result<usize>;
}


#[cfg(test)]
mod tests {
    use super::mock::{Call, MockDevice, MockHost};
    use super::*;

    #[test]
    fn raw_device_identity_and_strings() {
        let plain = MockDevice::new(1, 2, 0x046D, 0xC52B);
        assert_eq!(plain.raw.identity(), (0x046D, 0xC52B));
        assert!(!plain.raw.has_strings());

        let named = plain.with_strings("Logitech", "Receiver", "ABC");
        assert!(named.raw.has_strings());
    }

    #[test]
    fn mock_records_open_and_transfer() {
        let host = MockHost::new(vec![MockDevice::new(1, 4, 0x25A7, 0xFA08)]);
        let raw = host.devices().unwrap().remove(0);
        let handle = host.open(&raw).unwrap();
        let setup = ControlSetup {
            request_type: 0x21,
            request: 0x09,
            value: 0x0300,
            index: 0,
        };
        let n = handle
            .write_control(setup, &[1, 2], Duration::from_millis(10))
            .unwrap();
        assert_eq!(n, 2);
        drop(handle);

        assert_eq!(host.calls()[0], Call::Open { bus: 1, address: 4 });
        assert_eq!(host.control_transfers().len(), 1);
    }

    #[test]
    fn failing_host_reports_access_error() {
        let host = MockHost::failing("permission denied");
        assert!(host.devices().unwrap_err().is_access());
    }
}
