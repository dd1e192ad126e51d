use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Arg, ArgMatches, Command};

use ubxbase::{
    base::config::BAUD_RATES,
    cli::{
        logging,
        setrate::{self, MsgSelector},
    },
    protocol::transport,
};

fn setrate_command() -> Command {
    Command::new("ubxsetrate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Set the output rate of UBX/NMEA messages on a u-blox receiver")
        .arg(
            Arg::new("port")
                .long("port")
                .short('P')
                .required(true)
                .help("Serial port"),
        )
        .arg(
            Arg::new("baudrate")
                .long("baudrate")
                .help("Serial baud rate (4800-460800)")
                .value_parser(clap::value_parser!(u32))
                .default_value("9600"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Serial timeout in seconds")
                .value_parser(clap::value_parser!(f64))
                .default_value("3.0"),
        )
        .arg(
            Arg::new("msgClass")
                .long("msgClass")
                .required(true)
                .help("Message class (decimal or 0x-hex), or one of allubx, minubx, allnmea, minnmea"),
        )
        .arg(
            Arg::new("msgID")
                .long("msgID")
                .help("Message id (decimal or 0x-hex), required with a numeric class"),
        )
        .arg(
            Arg::new("rate")
                .long("rate")
                .help("Message rate per navigation solution (0-255)")
                .value_parser(clap::value_parser!(u16))
                .default_value("1"),
        )
        .arg(
            Arg::new("verbosity")
                .long("verbosity")
                .help("Log verbosity: -1 = off, 0 = error, 1 = warning, 2 = info, 3 = debug")
                .value_parser(clap::value_parser!(i8).range(-1..=3))
                .default_value("2")
                .allow_negative_numbers(true),
        )
        .arg(
            Arg::new("logtofile")
                .long("logtofile")
                .help("Log file path, or omit to log to stderr"),
        )
}

fn main() {
    let matches = setrate_command().get_matches();

    let verbosity = *matches.get_one::<i8>("verbosity").unwrap_or(&2);
    if let Err(err) = logging::init(verbosity, matches.get_one::<String>("logtofile")) {
        eprintln!("ubxsetrate: {err:#}");
        std::process::exit(1);
    }

    if let Err(err) = run(&matches) {
        eprintln!("ubxsetrate: {err:#}");
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let port = matches.get_one::<String>("port").expect("required arg");
    let baud = *matches.get_one::<u32>("baudrate").unwrap_or(&9600);
    if !BAUD_RATES.contains(&baud) {
        bail!("unsupported baud rate {baud}, choose one of {BAUD_RATES:?}");
    }
    let timeout = *matches.get_one::<f64>("timeout").unwrap_or(&3.0);
    if !timeout.is_finite() || timeout <= 0.0 {
        bail!("timeout {timeout} must be a positive number of seconds");
    }

    let selector = MsgSelector::parse(
        matches.get_one::<String>("msgClass").expect("required arg"),
        matches.get_one::<String>("msgID"),
    )?;
    let rate = *matches.get_one::<u16>("rate").unwrap_or(&1);

    log::info!("Opening serial port {port} @ {baud} baud ...");
    let mut serial = transport::open_serial(port, baud, Duration::from_secs_f64(timeout))?;
    let written = setrate::apply(selector, rate, &mut serial)?;
    log::info!("{written} configuration message(s) sent.");
    Ok(())
}
