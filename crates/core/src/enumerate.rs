//! Device discovery: bus walk, identity deduplication, and defensive
//! string descriptor reads.

use crate::error::Result;
use crate::transport::{RawDevice, UsbHandle, UsbHost};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

/// A string descriptor value as presented to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorString {
    /// The exact string returned by the device.
    Value(String),
    /// The device declares no string at this index, or an empty one.
    Unknown,
    /// The read failed (permissions, I/O, device busy).
    Unavailable,
}

impl DescriptorString {
    pub const UNKNOWN: &'static str = "Unknown";
    pub const UNAVAILABLE: &'static str = "Unavailable";

    pub fn as_str(&self) -> &str {
        match self {
            Self::Value(s) => s,
            Self::Unknown => Self::UNKNOWN,
            Self::Unavailable => Self::UNAVAILABLE,
        }
    }

    fn from_read(text: String) -> Self {
        if text.is_empty() {
            Self::Unknown
        } else {
            Self::Value(text)
        }
    }
}

impl fmt::Display for DescriptorString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DescriptorString {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One deduplicated device from an enumeration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub vendor_id_hex: String,
    pub product_id_hex: String,
    pub product: DescriptorString,
    pub manufacturer: DescriptorString,
    pub serial_number: DescriptorString,
    pub bus: u8,
    pub address: u8,
}

/// Render a 16-bit identifier as `0xABCD`.
pub fn format_id(id: u16) -> String {
    format!("0x{id:04X}")
}

/// How string descriptor read failures are scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescriptorGranularity {
    /// Any failed read marks all three strings `Unavailable`.
    #[default]
    Record,
    /// Each string fails on its own.
    Field,
}

/// Enumeration settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumerateOptions {
    pub granularity: DescriptorGranularity,
}

struct Strings {
    product: DescriptorString,
    manufacturer: DescriptorString,
    serial_number: DescriptorString,
}

impl Strings {
    fn all(value: DescriptorString) -> Self {
        Self {
            product: value.clone(),
            manufacturer: value.clone(),
            serial_number: value,
        }
    }
}

fn read_one(handle: &(dyn UsbHandle + '_), index: Option<u8>) -> Result<DescriptorString> {
    match index {
        None => Ok(DescriptorString::Unknown),
        Some(i) => handle.read_string(i).map(DescriptorString::from_read),
    }
}

fn read_strings(
    host: &dyn UsbHost,
    device: &RawDevice,
    granularity: DescriptorGranularity,
) -> Strings {
    if !device.has_strings() {
        return Strings::all(DescriptorString::Unknown);
    }

    let opened = match host.open(device) {
        Ok(h) => h,
        Err(e) => {
            warn!(
                vid = format_args!("0x{:04X}", device.vendor_id),
                pid = format_args!("0x{:04X}", device.product_id),
                error = %e,
                "Cannot open device to read string descriptors"
            );
            return Strings::all(DescriptorString::Unavailable);
        }
    };
    let handle = &*opened;

    match granularity {
        DescriptorGranularity::Record => {
            let read = || -> Result<Strings> {
                Ok(Strings {
                    product: read_one(handle, device.product_index)?,
                    manufacturer: read_one(handle, device.manufacturer_index)?,
                    serial_number: read_one(handle, device.serial_index)?,
                })
            };
            read().unwrap_or_else(|e| {
                warn!(
                    vid = format_args!("0x{:04X}", device.vendor_id),
                    pid = format_args!("0x{:04X}", device.product_id),
                    error = %e,
                    "String descriptor read failed"
                );
                Strings::all(DescriptorString::Unavailable)
            })
        }
        DescriptorGranularity::Field => {
            let field = |name: &'static str, index: Option<u8>| {
                read_one(handle, index).unwrap_or_else(|e| {
                    warn!(
                        vid = format_args!("0x{:04X}", device.vendor_id),
                        pid = format_args!("0x{:04X}", device.product_id),
                        field = name,
                        error = %e,
                        "String descriptor read failed"
                    );
                    DescriptorString::Unavailable
                })
            };
            Strings {
                product: field("product", device.product_index),
                manufacturer: field("manufacturer", device.manufacturer_index),
                serial_number: field("serial_number", device.serial_index),
            }
        }
    }
}

/// List attached USB devices, one entry per (vendor ID, product ID) pair.
///
/// Only the first physical device with a given identity is reported. Each
/// call walks the bus again. A failed bus walk is the only error.
pub fn list_devices(
    host: &dyn UsbHost,
    options: &EnumerateOptions,
) -> Result<Vec<DeviceDescriptor>> {
    debug!("Starting USB device enumeration");
    let raw_devices = host.devices()?;

    let mut seen = HashSet::new();
    let mut devices = Vec::new();
    for raw in &raw_devices {
        if !seen.insert(raw.identity()) {
            debug!(
                vid = format_args!("0x{:04X}", raw.vendor_id),
                pid = format_args!("0x{:04X}", raw.product_id),
                bus = raw.bus,
                address = raw.address,
                "Skipping duplicate identity"
            );
            continue;
        }

        let strings = read_strings(host, raw, options.granularity);
        info!(
            vid = format_args!("0x{:04X}", raw.vendor_id),
            pid = format_args!("0x{:04X}", raw.product_id),
            product = %strings.product,
            manufacturer = %strings.manufacturer,
            "Found USB device"
        );
        devices.push(DeviceDescriptor {
            vendor_id: raw.vendor_id,
            product_id: raw.product_id,
            vendor_id_hex: format_id(raw.vendor_id),
            product_id_hex: format_id(raw.product_id),
            product: strings.product,
            manufacturer: strings.manufacturer,
            serial_number: strings.serial_number,
            bus: raw.bus,
            address: raw.address,
        });
    }

    debug!(
        count = devices.len(),
        walked = raw_devices.len(),
        "Device enumeration complete"
    );
    Ok(devices)
}
