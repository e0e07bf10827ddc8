//! Command dispatch: locate a device by identity, prepare it, and send one
//! HID SET_REPORT control transfer.
//!
//! The steps run in a fixed order and none of them is retried:
//!
//! 1. **Locate** the first attached device matching (VID, PID).
//! 2. **Detach** kernel drivers from the probed interfaces (best-effort).
//! 3. **Configure** the device's default configuration (best-effort).
//! 4. **Transfer** the payload with `bmRequestType = 0x21`, `bRequest = 0x09`.
//!
//! Only locating/opening and the transfer itself can fail the call. Driver
//! detachment persists after the call returns unless
//! [`DispatchOptions::reattach_drivers`] is set, so the mouse may stop
//! behaving as a standard HID mouse until it is replugged.

use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::transport::{ControlSetup, RawDevice, UsbHandle, UsbHost};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// `bmRequestType`: host-to-device, class request, interface recipient.
pub const SET_REPORT_REQUEST_TYPE: u8 = 0x21;
/// HID class `SET_REPORT` request code.
pub const SET_REPORT: u8 = 0x09;
/// Default `wValue`: report type 0x03 (feature), report ID 0.
pub const DEFAULT_REPORT_TYPE: u16 = 0x0300;
pub const DEFAULT_INTERFACE: u16 = 0;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);
/// Interfaces 0..N probed for a bound kernel driver by default.
pub const DEFAULT_DETACH_PROBE: u8 = 3;

/// What to send, and to whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Sent as `wIndex`.
    pub interface: u16,
    /// Sent as `wValue`.
    pub report_type: u16,
    pub payload: Payload,
}

impl TransferRequest {
    /// Request with default interface (0) and report type (0x0300).
    pub fn new(vendor_id: u16, product_id: u16, payload: Payload) -> Self {
        Self {
            vendor_id,
            product_id,
            interface: DEFAULT_INTERFACE,
            report_type: DEFAULT_REPORT_TYPE,
            payload,
        }
    }

    pub fn with_interface(mut self, interface: u16) -> Self {
        self.interface = interface;
        self
    }

    pub fn with_report_type(mut self, report_type: u16) -> Self {
        self.report_type = report_type;
        self
    }

    /// Setup packet for the SET_REPORT transfer.
    pub fn setup(&self) -> ControlSetup {
        ControlSetup {
            request_type: SET_REPORT_REQUEST_TYPE,
            request: SET_REPORT,
            value: self.report_type,
            index: self.interface,
        }
    }
}

/// Which interfaces to probe for a bound kernel driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachProbe {
    /// Interfaces `0..n`, regardless of what the device declares.
    Fixed(u8),
    /// Every interface of the active configuration, always including 0.
    /// Falls back to the default fixed probe if the descriptor is unreadable.
    ActiveConfiguration,
}

impl Default for DetachProbe {
    fn default() -> Self {
        Self::Fixed(DEFAULT_DETACH_PROBE)
    }
}

/// Dispatch settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    pub detach_probe: DetachProbe,
    /// Rebind kernel drivers detached in step 2 once the transfer is done.
    pub reattach_drivers: bool,
    pub timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            detach_probe: DetachProbe::default(),
            reattach_drivers: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A preparation step that failed without stopping the dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparationWarning {
    /// Querying or detaching a kernel driver failed. `interface` is `None`
    /// when the interface list itself could not be read.
    DriverDetach {
        interface: Option<u8>,
        message: String,
    },
    /// Setting the default configuration failed.
    Configuration { message: String },
    /// Rebinding a detached kernel driver failed.
    DriverReattach { interface: u8, message: String },
}

impl fmt::Display for PreparationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DriverDetach {
                interface: Some(i),
                message,
            } => write!(f, "driver detach on interface {i}: {message}"),
            Self::DriverDetach {
                interface: None,
                message,
            } => write!(f, "driver detach: {message}"),
            Self::Configuration { message } => write!(f, "configuration: {message}"),
            Self::DriverReattach { interface, message } => {
                write!(f, "driver reattach on interface {interface}: {message}")
            }
        }
    }
}

/// Successful dispatch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Bytes the host confirmed as written.
    pub bytes_transferred: usize,
    /// Interfaces whose kernel driver was detached.
    pub detached_interfaces: Vec<u8>,
    pub warnings: Vec<PreparationWarning>,
}

/// Find the first attached device with the given identity.
///
/// When several devices share the identity, the first in bus order wins.
pub fn locate(host: &dyn UsbHost, vendor_id: u16, product_id: u16) -> Result<RawDevice> {
    debug!(
        vid = format_args!("0x{:04X}", vendor_id),
        pid = format_args!("0x{:04X}", product_id),
        "Locating device"
    );
    host.devices()?
        .into_iter()
        .find(|d| d.identity() == (vendor_id, product_id))
        .ok_or(Error::DeviceNotFound {
            vendor_id,
            product_id,
        })
}

fn probe_interfaces(
    handle: &(dyn UsbHandle + '_),
    probe: DetachProbe,
    warnings: &mut Vec<PreparationWarning>,
) -> Vec<u8> {
    match probe {
        DetachProbe::Fixed(n) => (0..n.max(1)).collect(),
        DetachProbe::ActiveConfiguration => match handle.interface_count() {
            Ok(count) => (0..count.max(1)).collect(),
            Err(e) => {
                warn!(error = %e, "Cannot read interface count, using default probe");
                warnings.push(PreparationWarning::DriverDetach {
                    interface: None,
                    message: e.to_string(),
                });
                (0..DEFAULT_DETACH_PROBE).collect()
            }
        },
    }
}

fn detach_drivers(
    handle: &mut (dyn UsbHandle + '_),
    interfaces: &[u8],
    warnings: &mut Vec<PreparationWarning>,
) -> Vec<u8> {
    let mut detached = Vec::new();
    for &interface in interfaces {
        let result = handle.kernel_driver_active(interface).and_then(|active| {
            if active {
                info!(interface, "Detaching kernel driver");
                handle.detach_kernel_driver(interface)?;
            }
            Ok(active)
        });
        match result {
            Ok(true) => detached.push(interface),
            Ok(false) => debug!(interface, "No kernel driver bound"),
            Err(e) => {
                warn!(interface, error = %e, "Kernel driver detach failed, continuing");
                warnings.push(PreparationWarning::DriverDetach {
                    interface: Some(interface),
                    message: e.to_string(),
                });
            }
        }
    }
    detached
}

fn reattach_drivers(
    handle: &mut (dyn UsbHandle + '_),
    interfaces: &[u8],
    warnings: &mut Vec<PreparationWarning>,
) {
    for &interface in interfaces {
        match handle.attach_kernel_driver(interface) {
            Ok(()) => debug!(interface, "Kernel driver reattached"),
            Err(e) => {
                warn!(interface, error = %e, "Kernel driver reattach failed");
                warnings.push(PreparationWarning::DriverReattach {
                    interface,
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Send one SET_REPORT control transfer to the device matching `request`.
///
/// Returns [`Error::DeviceNotFound`] without touching any device when no
/// identity matches, [`Error::Access`] when the device cannot be opened, and
/// [`Error::Transfer`] when the control transfer fails or times out.
/// Detach and configuration failures are reported in
/// [`TransferOutcome::warnings`].
pub fn send_command(
    host: &dyn UsbHost,
    request: &TransferRequest,
    options: &DispatchOptions,
) -> Result<TransferOutcome> {
    let device = locate(host, request.vendor_id, request.product_id)?;
    info!(
        vid = format_args!("0x{:04X}", device.vendor_id),
        pid = format_args!("0x{:04X}", device.product_id),
        bus = device.bus,
        address = device.address,
        "Device found"
    );

    let mut handle = host.open(&device)?;
    let mut warnings = Vec::new();

    let interfaces = probe_interfaces(&*handle, options.detach_probe, &mut warnings);
    let detached = detach_drivers(&mut *handle, &interfaces, &mut warnings);

    debug!("Setting default configuration");
    if let Err(e) = handle.set_default_configuration() {
        warn!(error = %e, "Set configuration failed, continuing");
        warnings.push(PreparationWarning::Configuration {
            message: e.to_string(),
        });
    }

    let setup = request.setup();
    debug!(
        request_type = format_args!("0x{:02X}", setup.request_type),
        request = format_args!("0x{:02X}", setup.request),
        value = format_args!("0x{:04X}", setup.value),
        index = setup.index,
        payload = %request.payload,
        len = request.payload.as_bytes().len(),
        "SET_REPORT TX"
    );
    let result = handle
        .write_control(setup, request.payload.as_bytes(), options.timeout)
        .map_err(|e| match e {
            Error::Transfer(_) => e,
            other => Error::Transfer(other.to_string()),
        });

    if options.reattach_drivers {
        reattach_drivers(&mut *handle, &detached, &mut warnings);
    }

    let bytes_transferred = result?;
    info!(bytes = bytes_transferred, "Command sent");
    Ok(TransferOutcome {
        bytes_transferred,
        detached_interfaces: detached,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{Call, MockDevice, MockHost};

    fn mouse() -> MockDevice {
        MockDevice::new(1, 5, 0x25A7, 0xFA08).with_kernel_drivers(&[true, true])
    }

    fn request() -> TransferRequest {
        TransferRequest::new(0x25A7, 0xFA08, Payload::default())
    }

    #[test]
    fn request_type_matches_class_interface_out() {
        assert_eq!(
            SET_REPORT_REQUEST_TYPE,
            rusb::request_type(
                rusb::Direction::Out,
                rusb::RequestType::Class,
                rusb::Recipient::Interface
            )
        );
    }

    #[test]
    fn request_defaults() {
        let req = request();
        assert_eq!(req.interface, 0);
        assert_eq!(req.report_type, 0x0300);
        let setup = req.with_interface(2).with_report_type(0x0200).setup();
        assert_eq!(setup.index, 2);
        assert_eq!(setup.value, 0x0200);
    }

    #[test]
    fn missing_device_issues_no_transfer() {
        let host = MockHost::new(vec![MockDevice::new(1, 2, 0x046D, 0xC52B)]);
        let err = send_command(&host, &request(), &DispatchOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::DeviceNotFound {
                vendor_id: 0x25A7,
                product_id: 0xFA08
            }
        ));
        assert!(host.calls().is_empty());
    }

    #[test]
    fn sends_exactly_one_set_report() {
        let host = MockHost::new(vec![mouse()]);
        let req = TransferRequest::new(0x25A7, 0xFA08, Payload::new(vec![0x05, 0xAA]).unwrap())
            .with_interface(1)
            .with_report_type(0x0301);
        let outcome = send_command(&host, &req, &DispatchOptions::default()).unwrap();
        assert_eq!(outcome.bytes_transferred, 2);

        assert_eq!(
            host.control_transfers(),
            vec![Call::Control {
                setup: ControlSetup {
                    request_type: 0x21,
                    request: 0x09,
                    value: 0x0301,
                    index: 1,
                },
                data: vec![0x05, 0xAA],
                timeout: Duration::from_millis(1000),
            }]
        );
    }

    #[test]
    fn detaches_bound_drivers_and_warns_on_missing_interface() {
        let host = MockHost::new(vec![mouse()]);
        let outcome = send_command(&host, &request(), &DispatchOptions::default()).unwrap();

        assert_eq!(outcome.detached_interfaces, vec![0, 1]);
        // interface 2 does not exist on this device
        assert_eq!(outcome.warnings.len(), 1);
        assert!(matches!(
            outcome.warnings[0],
            PreparationWarning::DriverDetach {
                interface: Some(2),
                ..
            }
        ));

        let calls = host.calls();
        let detach_pos = calls.iter().position(|c| *c == Call::Detach(0)).unwrap();
        let config_pos = calls
            .iter()
            .position(|c| *c == Call::SetConfiguration)
            .unwrap();
        let control_pos = calls
            .iter()
            .position(|c| matches!(c, Call::Control { .. }))
            .unwrap();
        assert!(detach_pos < config_pos && config_pos < control_pos);
    }

    #[test]
    fn unbound_interfaces_are_left_alone() {
        let host = MockHost::new(vec![mouse().with_kernel_drivers(&[false, false, false])]);
        let outcome = send_command(&host, &request(), &DispatchOptions::default()).unwrap();
        assert!(outcome.detached_interfaces.is_empty());
        assert!(outcome.warnings.is_empty());
        assert!(!host.calls().iter().any(|c| matches!(c, Call::Detach(_))));
    }

    #[test]
    fn preparation_failures_do_not_stop_transfer() {
        let mut dev = mouse();
        dev.detach_error = Some("Resource busy".into());
        dev.configuration_error = Some("Resource busy".into());
        let host = MockHost::new(vec![dev]);

        let outcome = send_command(&host, &request(), &DispatchOptions::default()).unwrap();
        assert_eq!(outcome.bytes_transferred, 3);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, PreparationWarning::Configuration { .. })));
        assert_eq!(host.control_transfers().len(), 1);
    }

    #[test]
    fn transfer_failure_is_terminal_with_diagnostic() {
        let mut dev = mouse();
        dev.transfer_error = Some("Operation timed out".into());
        let host = MockHost::new(vec![dev]);

        let err = send_command(&host, &request(), &DispatchOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Transfer(ref msg) if msg.contains("timed out")));
    }

    #[test]
    fn open_failure_is_access_error() {
        let mut dev = mouse();
        dev.open_error = Some("Access denied (insufficient permissions)".into());
        let host = MockHost::new(vec![dev]);

        let err = send_command(&host, &request(), &DispatchOptions::default()).unwrap_err();
        assert!(err.is_access());
        assert!(host.control_transfers().is_empty());
    }

    #[test]
    fn first_matching_device_wins() {
        let host = MockHost::new(vec![
            MockDevice::new(1, 7, 0x25A7, 0xFA08),
            MockDevice::new(1, 8, 0x25A7, 0xFA08),
        ]);
        let found = locate(&host, 0x25A7, 0xFA08).unwrap();
        assert_eq!(found.address, 7);
    }

    #[test]
    fn active_configuration_probe_follows_interface_count() {
        let host = MockHost::new(vec![mouse().with_kernel_drivers(&[true, false, true, true])]);
        let options = DispatchOptions {
            detach_probe: DetachProbe::ActiveConfiguration,
            ..Default::default()
        };
        let outcome = send_command(&host, &request(), &options).unwrap();
        assert_eq!(outcome.detached_interfaces, vec![0, 2, 3]);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn active_configuration_probe_falls_back() {
        let mut dev = mouse();
        dev.interface_count_error = Some("no active configuration".into());
        let host = MockHost::new(vec![dev]);
        let options = DispatchOptions {
            detach_probe: DetachProbe::ActiveConfiguration,
            ..Default::default()
        };
        let outcome = send_command(&host, &request(), &options).unwrap();
        assert_eq!(outcome.detached_interfaces, vec![0, 1]);
        assert!(matches!(
            outcome.warnings[0],
            PreparationWarning::DriverDetach {
                interface: None,
                ..
            }
        ));
    }

    #[test]
    fn fixed_probe_always_covers_interface_zero() {
        let host = MockHost::new(vec![mouse()]);
        let options = DispatchOptions {
            detach_probe: DetachProbe::Fixed(0),
            ..Default::default()
        };
        let outcome = send_command(&host, &request(), &options).unwrap();
        assert_eq!(outcome.detached_interfaces, vec![0]);
    }

    #[test]
    fn reattach_restores_detached_drivers() {
        let host = MockHost::new(vec![mouse()]);
        let options = DispatchOptions {
            reattach_drivers: true,
            ..Default::default()
        };
        send_command(&host, &request(), &options).unwrap();

        let calls = host.calls();
        let control_pos = calls
            .iter()
            .position(|c| matches!(c, Call::Control { .. }))
            .unwrap();
        assert_eq!(calls[control_pos + 1], Call::Attach(0));
        assert_eq!(calls[control_pos + 2], Call::Attach(1));
    }

    #[test]
    fn custom_timeout_reaches_transfer() {
        let host = MockHost::new(vec![mouse()]);
        let options = DispatchOptions {
            timeout: Duration::from_millis(250),
            ..Default::default()
        };
        send_command(&host, &request(), &options).unwrap();
        assert!(matches!(
            host.control_transfers()[0],
            Call::Control { timeout, .. } if timeout == Duration::from_millis(250)
        ));
    }
}
