//! mouse-rebind-core: USB device discovery and HID SET_REPORT dispatch.
//!
//! This crate provides the two halves of the mouse rebind tool: an
//! enumerator that lists attached USB devices by identity, and a dispatcher
//! that prepares one device and sends it a vendor-specific control transfer.

pub mod dispatch;
pub mod enumerate;
pub mod error;
pub mod libusb;
pub mod payload;
pub mod transport;

/// Vendor ID offered by default in the operator shell.
pub const DEFAULT_VENDOR_ID: u16 = 0x25A7;

/// Product ID offered by default in the operator shell.
pub const DEFAULT_PRODUCT_ID: u16 = 0xFA08;
