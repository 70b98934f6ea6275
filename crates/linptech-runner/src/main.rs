//! `linptech` command line tool.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use linptech_metrics::describe_metrics;
use linptech_model::load_devices;
use linptech_runner::{
    decode_and_record, decode_hex, encode_frame, init_logging, load_capture, EncodeRequest, FrameReport,
    Replayer, RunnerError, RunnerResult,
};
use mibeacon_packet::{Advertisement, BindKey, MacAddress, MiBeaconDecoder};
use serde::Serialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "linptech", author, version, about = "Decode Linptech MiBeacon advertisements", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode hex service data from one device
    Decode(DecodeArgs),
    /// Replay a capture file against a devices file
    Replay(ReplayArgs),
    /// Encode sensor values as hex service data
    Encode(EncodeArgs),
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Device address
    #[arg(short, long)]
    address: MacAddress,

    /// Bindkey for encrypted frames (32 hex digits)
    #[arg(short, long)]
    bindkey: Option<BindKey>,

    /// Accepted product id (repeatable; defaults to every supported product)
    #[arg(long = "product-id", value_parser = parse_u16)]
    product_ids: Vec<u16>,

    /// Signal strength to attach to readings
    #[arg(long, allow_hyphen_values = true)]
    rssi: Option<i16>,

    /// Service data frames as hex
    #[arg(required = true)]
    frames: Vec<String>,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Devices file
    #[arg(short, long)]
    config: PathBuf,

    /// Capture file
    capture: PathBuf,

    /// Print outcome counts after the reports
    #[arg(long)]
    summary: bool,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    #[arg(long = "product-id", value_parser = parse_u16, default_value = "0x3F4C")]
    product_id: u16,

    /// Frame counter
    #[arg(long, default_value_t = 0)]
    counter: u8,

    /// Protocol version nibble
    #[arg(long = "frame-version", default_value_t = 5)]
    frame_version: u8,

    /// Device address, required with --bindkey or --mac-echo
    #[arg(long)]
    address: Option<MacAddress>,

    /// Encrypt the objects with this bindkey
    #[arg(long)]
    bindkey: Option<BindKey>,

    /// Three trailer bytes as hex
    #[arg(long, value_parser = parse_trailer, default_value = "000000")]
    trailer: [u8; 3],

    /// Echo the address in the frame
    #[arg(long)]
    mac_echo: bool,

    /// Capability byte
    #[arg(long, value_parser = parse_u8)]
    capability: Option<u8>,

    #[arg(long)]
    pressure_present: Option<bool>,

    /// Battery level in percent
    #[arg(long)]
    battery: Option<u8>,

    #[arg(long)]
    present_duration: Option<u32>,

    #[arg(long)]
    absent_duration: Option<u32>,

    #[arg(long)]
    present_threshold: Option<u32>,

    #[arg(long)]
    absent_threshold: Option<u32>,
}

fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid id '{}': {}", s, e))
}

fn parse_u8(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid byte '{}': {}", s, e))
}

fn parse_trailer(s: &str) -> Result<[u8; 3], String> {
    let bytes = decode_hex(s)?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| format!("trailer must be 3 bytes, got {}", bytes.len()))
}

fn print_json<T: Serialize>(value: &T) -> RunnerResult<()> {
    let line = serde_json::to_string(value)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line).map_err(|source| RunnerError::Io {
        path: PathBuf::from("<stdout>"),
        source,
    })
}

fn run_decode(args: DecodeArgs) -> RunnerResult<()> {
    let decoder = if args.product_ids.is_empty() {
        MiBeaconDecoder::default()
    } else {
        MiBeaconDecoder::new(args.product_ids)
    };

    for frame in &args.frames {
        let service_data = decode_hex(frame).map_err(RunnerError::invalid_argument)?;
        let advertisement = Advertisement {
            address: args.address,
            rssi: args.rssi,
            service_data: &service_data,
        };
        let result = decode_and_record(&decoder, &advertisement, args.bindkey.as_ref());
        print_json(&FrameReport::new(result))?;
    }
    Ok(())
}

fn run_replay(args: ReplayArgs) -> RunnerResult<()> {
    let devices = load_devices(&args.config)?;
    let capture = load_capture(&args.capture)?;

    let mut replayer = Replayer::new(&devices);
    for report in replayer.run(&capture) {
        print_json(&report)?;
    }
    if args.summary {
        print_json(replayer.summary())?;
    }
    Ok(())
}

fn run_encode(args: EncodeArgs) -> RunnerResult<()> {
    let request = EncodeRequest {
        product_id: args.product_id,
        frame_counter: args.counter,
        version: args.frame_version,
        address: args.address,
        bindkey: args.bindkey,
        trailer: args.trailer,
        mac_echo: args.mac_echo,
        capability: args.capability,
        pressure_present: args.pressure_present,
        battery_percent: args.battery,
        present_duration_s: args.present_duration,
        absent_duration_s: args.absent_duration,
        present_threshold_s: args.present_threshold,
        absent_threshold_s: args.absent_threshold,
    };
    let frame = encode_frame(&request)?;
    info!("Encoded {} byte frame", frame.len());
    println!("{}", hex::encode(frame));
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }
    describe_metrics();

    let result = match cli.command {
        Command::Decode(args) => run_decode(args),
        Command::Replay(args) => run_replay(args),
        Command::Encode(args) => run_encode(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
