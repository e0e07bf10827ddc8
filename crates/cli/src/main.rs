//! mouse-rebind CLI: list USB devices and send a SET_REPORT command to a mouse.

mod messages;
mod prompt;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use messages::Language;
use mouse_rebind_core::dispatch::{
    self, DetachProbe, DispatchOptions, PreparationWarning, TransferOutcome, TransferRequest,
    DEFAULT_INTERFACE, DEFAULT_REPORT_TYPE,
};
use mouse_rebind_core::enumerate::{self, format_id, DescriptorGranularity, EnumerateOptions};
use mouse_rebind_core::error::Error;
use mouse_rebind_core::libusb::RusbHost;
use mouse_rebind_core::payload::{self, PayloadPolicy, PayloadWarning};
use mouse_rebind_core::{DEFAULT_PRODUCT_ID, DEFAULT_VENDOR_ID};
use prompt::{Interrupted, Prompter};
use std::io::{self, StdinLock, Stdout, Write};
use std::time::Duration;
use tracing::debug;

const RULE_WIDTH: usize = 60;

fn parse_u16_arg(text: &str) -> std::result::Result<u16, String> {
    payload::parse_u16(text).map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(
    name = "mouse-rebind",
    version,
    about = "Find USB devices and reprogram a mouse with a HID SET_REPORT command"
)]
struct Cli {
    /// Language for all messages.
    #[arg(long, value_enum, default_value_t = Language::English, global = true)]
    lang: Language,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List attached USB devices, one entry per VID/PID.
    List {
        /// Print the device list as JSON.
        #[arg(long)]
        json: bool,
        /// Mark only the failing string as unavailable instead of the whole device.
        #[arg(long)]
        per_field: bool,
    },
    /// Send a SET_REPORT command. Values not given as flags are prompted for.
    Send(SendArgs),
}

#[derive(Args)]
struct SendArgs {
    /// Vendor ID (decimal or 0x hex).
    #[arg(long, value_parser = parse_u16_arg)]
    vid: Option<u16>,
    /// Product ID (decimal or 0x hex).
    #[arg(long, value_parser = parse_u16_arg)]
    pid: Option<u16>,
    /// Interface number, sent as wIndex.
    #[arg(long, value_parser = parse_u16_arg)]
    interface: Option<u16>,
    /// Report type, sent as wValue.
    #[arg(long, value_parser = parse_u16_arg)]
    report_type: Option<u16>,
    /// Payload bytes, e.g. "0x01 0x00 0x04".
    #[arg(long, allow_hyphen_values = true)]
    payload: Option<String>,
    /// Reject payload tokens that are not a byte instead of sending 0.
    #[arg(long)]
    strict: bool,
    /// Probe every interface of the active configuration for kernel drivers
    /// instead of interfaces 0-2.
    #[arg(long)]
    probe_active_config: bool,
    /// Reattach detached kernel drivers after the transfer.
    #[arg(long)]
    reattach: bool,
    /// Control transfer timeout in milliseconds.
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: u64,
    /// Skip the confirmation prompt.
    #[arg(short, long)]
    yes: bool,
}

impl SendArgs {
    fn options(&self) -> DispatchOptions {
        DispatchOptions {
            detach_probe: if self.probe_active_config {
                DetachProbe::ActiveConfiguration
            } else {
                DetachProbe::default()
            },
            reattach_drivers: self.reattach,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }

    fn policy(&self) -> PayloadPolicy {
        if self.strict {
            PayloadPolicy::Strict
        } else {
            PayloadPolicy::Lenient
        }
    }
}

fn heading(title: &str, rule: char) {
    let line = rule.to_string().repeat(RULE_WIDTH);
    println!("\n{line}");
    println!("{title}");
    println!("{line}");
}

fn list(lang: Language, json: bool, per_field: bool) -> Result<()> {
    let options = EnumerateOptions {
        granularity: if per_field {
            DescriptorGranularity::Field
        } else {
            DescriptorGranularity::Record
        },
    };

    if !json {
        println!("\n{}", lang.searching());
    }
    let devices = match RusbHost::new().and_then(|host| enumerate::list_devices(&host, &options)) {
        Ok(d) => d,
        Err(e) => {
            println!("\n{}", lang.list_error(&e));
            for line in lang.access_hint() {
                println!("{line}");
            }
            return Ok(());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("\n{}", lang.no_devices());
    } else {
        heading(lang.devices_found_title(), '=');
        for (i, dev) in devices.iter().enumerate() {
            println!("\n[{}] {} - {}", i + 1, dev.product, dev.manufacturer);
            println!(
                "    VID: {} ({}), PID: {} ({})",
                dev.vendor_id, dev.vendor_id_hex, dev.product_id, dev.product_id_hex
            );
            println!("    {}: {}", lang.serial_number(), dev.serial_number);
            println!("{}", "-".repeat(RULE_WIDTH));
        }
    }
    println!("\n{}", lang.total_found(devices.len()));
    println!();
    for line in lang.list_footer() {
        println!("{line}");
    }
    Ok(())
}

fn print_payload_warnings(lang: Language, warnings: &[PayloadWarning]) {
    for w in warnings {
        match w {
            PayloadWarning::OutOfRange { token } => {
                println!("{}", lang.payload_out_of_range(token))
            }
            PayloadWarning::Invalid { token } => println!("{}", lang.payload_invalid(token)),
            PayloadWarning::EmptyDefault => println!("{}", lang.payload_empty()),
        }
    }
}

fn print_outcome(
    out: &mut impl Write,
    lang: Language,
    request: &TransferRequest,
    outcome: &TransferOutcome,
) -> io::Result<()> {
    writeln!(out, "{}", lang.device_found())?;
    for &interface in &outcome.detached_interfaces {
        writeln!(out, "{}", lang.released_driver(interface))?;
    }
    for w in &outcome.warnings {
        if let PreparationWarning::DriverDetach { .. } = w {
            writeln!(out, "{}", lang.detach_warning(w))?;
        }
    }

    writeln!(out, "{}", lang.configuring())?;
    for w in &outcome.warnings {
        if let PreparationWarning::Configuration { message } = w {
            for line in lang.configuration_warning(message) {
                writeln!(out, "{line}")?;
            }
        }
    }

    writeln!(out, "{}", lang.sending(&request.payload))?;
    writeln!(out, "{}", lang.sent(outcome.bytes_transferred))?;
    for w in &outcome.warnings {
        if let PreparationWarning::DriverReattach { .. } = w {
            writeln!(out, "{}", lang.reattach_warning(w))?;
        }
    }
    Ok(())
}

/// Print the dispatch result. Returns whether the command went through.
fn report(
    out: &mut impl Write,
    lang: Language,
    request: &TransferRequest,
    result: mouse_rebind_core::error::Result<TransferOutcome>,
) -> io::Result<bool> {
    match result {
        Ok(outcome) => {
            print_outcome(out, lang, request, &outcome)?;
            Ok(true)
        }
        Err(Error::DeviceNotFound { .. }) => {
            writeln!(
                out,
                "{}",
                lang.not_found(&format_id(request.vendor_id), &format_id(request.product_id))
            )?;
            Ok(false)
        }
        Err(Error::Transfer(detail)) => {
            writeln!(out, "{}", lang.device_found())?;
            writeln!(out, "{}", lang.sending(&request.payload))?;
            writeln!(out, "{}", lang.usb_error(&detail))?;
            Ok(false)
        }
        Err(e @ Error::Access(_)) => {
            writeln!(out, "{}", lang.general_error(&e))?;
            for line in lang.access_hint() {
                writeln!(out, "{line}")?;
            }
            Ok(false)
        }
        Err(e) => {
            writeln!(out, "{}", lang.general_error(&e))?;
            Ok(false)
        }
    }
}

fn send(lang: Language, args: &SendArgs) -> Result<()> {
    let mut prompter: Prompter<StdinLock<'static>, Stdout> =
        Prompter::new(io::stdin().lock(), io::stdout());

    heading(lang.send_title(), '=');
    println!();
    for line in lang.send_intro() {
        println!("{line}");
    }
    heading(lang.device_config_title(), '-');

    let vid = match args.vid {
        Some(v) => v,
        None => prompter.number(
            lang.prompt_vid(),
            DEFAULT_VENDOR_ID,
            &DEFAULT_VENDOR_ID.to_string(),
            lang.invalid_number(),
        )?,
    };
    let pid = match args.pid {
        Some(v) => v,
        None => prompter.number(
            lang.prompt_pid(),
            DEFAULT_PRODUCT_ID,
            &DEFAULT_PRODUCT_ID.to_string(),
            lang.invalid_number(),
        )?,
    };
    println!("\nVID: {vid} ({})", format_id(vid));
    println!("PID: {pid} ({})", format_id(pid));

    let interface = match args.interface {
        Some(v) => v,
        None => prompter.number(
            lang.prompt_interface(),
            DEFAULT_INTERFACE,
            &DEFAULT_INTERFACE.to_string(),
            lang.invalid_number(),
        )?,
    };
    let report_type = match args.report_type {
        Some(v) => v,
        None => prompter.number(
            lang.prompt_report_type(),
            DEFAULT_REPORT_TYPE,
            &format_id(DEFAULT_REPORT_TYPE),
            lang.invalid_number(),
        )?,
    };

    let payload_line = match &args.payload {
        Some(line) => line.clone(),
        None => {
            println!();
            for line in lang.payload_help() {
                println!("{line}");
            }
            prompter.line("Payload: ")?
        }
    };
    let parsed = match payload::parse_payload_line(&payload_line, args.policy()) {
        Ok(p) => p,
        Err(e) => {
            println!("{}", lang.general_error(&e));
            return Ok(());
        }
    };
    print_payload_warnings(lang, &parsed.warnings);

    let request = TransferRequest::new(vid, pid, parsed.payload)
        .with_interface(interface)
        .with_report_type(report_type);

    heading(lang.summary_title(), '-');
    println!("VID: {vid} ({})", format_id(vid));
    println!("PID: {pid} ({})", format_id(pid));
    println!("Interface: {interface}");
    println!(
        "{}: {report_type} ({})",
        lang.report_type_label(),
        format_id(report_type)
    );
    println!("Payload: {}", request.payload);

    if !args.yes {
        println!();
        if !prompter.confirm(lang.confirm_prompt(), lang.confirm_token())? {
            println!("{}", lang.cancelled());
            return Ok(());
        }
    }

    let options = args.options();
    debug!(?options, "Dispatch options");
    println!("\n{}", lang.finding(&format_id(vid), &format_id(pid)));
    let result =
        RusbHost::new().and_then(|host| dispatch::send_command(&host, &request, &options));

    if report(&mut io::stdout(), lang, &request, result)? {
        println!("\n{}", lang.processed());
    } else {
        println!("\n{}", lang.failed());
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let lang = cli.lang;

    let result = match &cli.command {
        Commands::List { json, per_field } => list(lang, *json, *per_field),
        Commands::Send(args) => send(lang, args),
    };

    // Every failure ends here; the process still exits 0.
    if let Err(e) = result {
        if e.downcast_ref::<Interrupted>().is_some() {
            println!("\n\n{}", lang.interrupted());
        } else {
            println!("\n{}", lang.unexpected_error(&format_args!("{e:#}")));
        }
    }

    if !matches!(cli.command, Commands::List { json: true, .. }) {
        println!("\n{}", lang.finished());
    }
}
