//! libusb-backed [`UsbHost`] implementation.

use crate::error::{Error, Result};
use crate::transport::{ControlSetup, RawDevice, UsbHandle, UsbHost};
use rusb::{Context, Device, DeviceHandle, UsbContext};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Timeout for string descriptor and language ID reads.
const STRING_TIMEOUT: Duration = Duration::from_secs(1);

/// Map a libusb error, keeping permission failures distinguishable.
fn map_usb_error(err: rusb::Error) -> Error {
    match err {
        rusb::Error::Access => Error::Access(err.to_string()),
        _ => Error::Usb(err.to_string()),
    }
}

/// Host USB stack accessed through a libusb context.
pub struct RusbHost {
    context: Context,
}

impl RusbHost {
    /// Initialise a libusb context. Fails with [`Error::Access`] when libusb
    /// itself is unusable on this host.
    pub fn new() -> Result<Self> {
        let context = Context::new().map_err(|e| Error::Access(format!("libusb init: {e}")))?;
        Ok(Self { context })
    }

    fn find(&self, device: &RawDevice) -> Result<Device<Context>> {
        let list = self.context.devices().map_err(|e| Error::Access(e.to_string()))?;
        let found = list
            .iter()
            .find(|d| d.bus_number() == device.bus && d.address() == device.address);
        found.ok_or(Error::DeviceNotFound {
            vendor_id: device.vendor_id,
            product_id: device.product_id,
        })
    }
}

impl UsbHost for RusbHost {
    fn devices(&self) -> Result<Vec<RawDevice>> {
        let list = self
            .context
            .devices()
            .map_err(|e| Error::Access(e.to_string()))?;

        let mut devices = Vec::with_capacity(list.len());
        for device in list.iter() {
            let desc = match device.device_descriptor() {
                Ok(d) => d,
                Err(e) => {
                    warn!(
                        bus = device.bus_number(),
                        address = device.address(),
                        error = %e,
                        "Skipping device with unreadable descriptor"
                    );
                    continue;
                }
            };
            trace!(
                bus = device.bus_number(),
                address = device.address(),
                vid = format_args!("0x{:04X}", desc.vendor_id()),
                pid = format_args!("0x{:04X}", desc.product_id()),
                "Bus entry"
            );
            devices.push(RawDevice {
                bus: device.bus_number(),
                address: device.address(),
                vendor_id: desc.vendor_id(),
                product_id: desc.product_id(),
                manufacturer_index: desc.manufacturer_string_index(),
                product_index: desc.product_string_index(),
                serial_index: desc.serial_number_string_index(),
            });
        }
        Ok(devices)
    }

    fn open(&self, device: &RawDevice) -> Result<Box<dyn UsbHandle + '_>> {
        let found = self.find(device)?;
        let handle = found.open().map_err(|e| match e {
            rusb::Error::NoDevice | rusb::Error::NotFound => Error::DeviceNotFound {
                vendor_id: device.vendor_id,
                product_id: device.product_id,
            },
            // Opening is part of locating the device, so any failure here
            // is reported as an access failure.
            other => Error::Access(other.to_string()),
        })?;
        debug!(
            bus = device.bus,
            address = device.address,
            "Opened device handle"
        );
        Ok(Box::new(RusbHandle {
            device: found,
            handle,
        }))
    }
}

struct RusbHandle {
    device: Device<Context>,
    handle: DeviceHandle<Context>,
}

impl UsbHandle for RusbHandle {
    fn read_string(&self, index: u8) -> Result<String> {
        let languages = self
            .handle
            .read_languages(STRING_TIMEOUT)
            .map_err(map_usb_error)?;
        let language = languages
            .first()
            .copied()
            .ok_or_else(|| Error::Usb("device reports no string languages".into()))?;
        self.handle
            .read_string_descriptor(language, index, STRING_TIMEOUT)
            .map_err(map_usb_error)
    }

    fn interface_count(&self) -> Result<u8> {
        self.device
            .active_config_descriptor()
            .map(|c| c.num_interfaces())
            .map_err(map_usb_error)
    }

    fn kernel_driver_active(&self, interface: u8) -> Result<bool> {
        self.handle
            .kernel_driver_active(interface)
            .map_err(map_usb_error)
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> Result<()> {
        self.handle
            .detach_kernel_driver(interface)
            .map_err(map_usb_error)
    }

    fn attach_kernel_driver(&mut self, interface: u8) -> Result<()> {
        self.handle
            .attach_kernel_driver(interface)
            .map_err(map_usb_error)
    }

    fn set_default_configuration(&mut self) -> Result<()> {
        let config = self
            .device
            .config_descriptor(0)
            .map_err(map_usb_error)?
            .number();
        debug!(config, "Setting active configuration");
        self.handle
            .set_active_configuration(config)
            .map_err(map_usb_error)
    }

    fn write_control(&self, setup: ControlSetup, data: &[u8], timeout: Duration) -> Result<usize> {
        self.handle
            .write_control(
                setup.request_type,
                setup.request,
                setup.value,
                setup.index,
                data,
                timeout,
            )
            .map_err(|e| Error::Transfer(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_errors_stay_access() {
        assert!(map_usb_error(rusb::Error::Access).is_access());
        assert!(!map_usb_error(rusb::Error::Busy).is_access());
        assert!(matches!(map_usb_error(rusb::Error::Pipe), Error::Usb(_)));
    }
}
