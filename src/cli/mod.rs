pub mod config_file;
pub mod logging;
pub mod setrate;

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::base::config::{
    BaseConfig, PortType, PosType, TimeMode, BAUD_RATES, DEFAULT_ACC_LIMIT_CM,
    DEFAULT_DURATION_S, DEFAULT_WAIT_TIME_S,
};
use self::config_file::FileConfig;

/// Build the `ubxbase` argument parser.
pub fn base_command() -> Command {
    Command::new("ubxbase")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Configure a u-blox RTK GNSS receiver as a base station")
        .arg(
            Arg::new("port")
                .long("port")
                .short('P')
                .help("Serial port")
                .value_name("PORT"),
        )
        .arg(
            Arg::new("baudrate")
                .long("baudrate")
                .help("Serial baud rate (4800-460800)")
                .value_parser(clap::value_parser!(u32))
                .default_value("38400"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Serial timeout in seconds")
                .value_parser(clap::value_parser!(f64))
                .default_value("3.0"),
        )
        .arg(
            Arg::new("portype")
                .long("portype")
                .help("Serial port type (USB, UART1, UART2, I2C)")
                .default_value("USB"),
        )
        .arg(
            Arg::new("timemode")
                .long("timemode")
                .help("Timing mode: 0 = disabled, 1 = survey-in, 2 = fixed")
                .value_parser(clap::value_parser!(u8))
                .default_value("1"),
        )
        .arg(
            Arg::new("acclimit")
                .long("acclimit")
                .help("Accuracy limit in cm")
                .value_parser(clap::value_parser!(f64))
                .default_value("100"),
        )
        .arg(
            Arg::new("duration")
                .long("duration")
                .help("Survey-in duration in seconds (1-3600)")
                .value_parser(clap::value_parser!(u32))
                .default_value("60"),
        )
        .arg(
            Arg::new("postype")
                .long("postype")
                .help("Fixed position reference type: 0 = ECEF, 1 = LLH")
                .value_parser(clap::value_parser!(u8))
                .default_value("1"),
        )
        .arg(
            Arg::new("fixedpos")
                .long("fixedpos")
                .help("Fixed reference position, three comma-separated values: lat,lon,height (deg, deg, cm) or X,Y,Z (cm)")
                .default_value("0.0,0.0,0.0"),
        )
        .arg(
            Arg::new("waittime")
                .long("waittime")
                .help("Response wait time in seconds")
                .value_parser(clap::value_parser!(f64))
                .default_value("5"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('C')
                .help("Path to TOML configuration file (defaults to the UBXBASE_CONF environment variable)"),
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
                .help("Log file path, or omit to log to stderr")
                .action(ArgAction::Set),
        )
}

/// Resolve CLI arguments and the optional config file into a validated
/// [`BaseConfig`]. Anything out of range is a fatal parameter error,
/// reported before any device I/O is attempted.
pub fn resolve_base_config(matches: &ArgMatches) -> Result<BaseConfig> {
    let file = FileConfig::load_for(matches.get_one::<String>("config"), "UBXBASE_CONF")?;

    let port = file
        .port
        .clone()
        .or_else(|| matches.get_one::<String>("port").cloned())
        .ok_or_else(|| anyhow!("no serial port specified (use --port)"))?;
    let baud = file
        .baudrate
        .unwrap_or_else(|| *matches.get_one::<u32>("baudrate").unwrap_or(&38400));
    if !BAUD_RATES.contains(&baud) {
        bail!("unsupported baud rate {baud}, choose one of {BAUD_RATES:?}");
    }
    let timeout = file
        .timeout
        .unwrap_or_else(|| *matches.get_one::<f64>("timeout").unwrap_or(&3.0));
    if !timeout.is_finite() || timeout <= 0.0 {
        bail!("timeout {timeout} must be a positive number of seconds");
    }

    let port_type: PortType = file
        .portype
        .clone()
        .unwrap_or_else(|| {
            matches
                .get_one::<String>("portype")
                .cloned()
                .unwrap_or_else(|| "USB".into())
        })
        .parse()
        .map_err(|_| anyhow!("port type must be one of USB, UART1, UART2, I2C"))?;

    let timemode = file
        .timemode
        .unwrap_or_else(|| *matches.get_one::<u8>("timemode").unwrap_or(&1));
    let mode = TimeMode::try_from(timemode)
        .map_err(|_| anyhow!("timing mode {timemode} must be 0 (disabled), 1 (survey-in) or 2 (fixed)"))?;

    let postype = file
        .postype
        .unwrap_or_else(|| *matches.get_one::<u8>("postype").unwrap_or(&1));
    let pos_type = PosType::try_from(postype)
        .map_err(|_| anyhow!("position type {postype} must be 0 (ECEF) or 1 (LLH)"))?;

    let fixedpos_raw = file.fixedpos.clone().unwrap_or_else(|| {
        matches
            .get_one::<String>("fixedpos")
            .cloned()
            .unwrap_or_else(|| "0.0,0.0,0.0".into())
    });
    let fixed_pos = parse_fixed_pos(&fixedpos_raw)?;

    let cfg = BaseConfig {
        port,
        baud,
        timeout: Duration::from_secs_f64(timeout),
        port_type,
        mode,
        acc_limit_cm: file
            .acclimit
            .unwrap_or_else(|| *matches.get_one::<f64>("acclimit").unwrap_or(&DEFAULT_ACC_LIMIT_CM)),
        svin_duration_s: file
            .duration
            .unwrap_or_else(|| *matches.get_one::<u32>("duration").unwrap_or(&DEFAULT_DURATION_S)),
        pos_type,
        fixed_pos,
        wait_time: Duration::from_secs_f64(
            file.waittime
                .unwrap_or_else(|| *matches.get_one::<f64>("waittime").unwrap_or(&DEFAULT_WAIT_TIME_S)),
        ),
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Parse a "v1,v2,v3" triple of decimal coordinates.
pub fn parse_fixed_pos(raw: &str) -> Result<(f64, f64, f64)> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<f64>()
                .with_context(|| format!("invalid coordinate {:?}", p.trim()))
        })
        .collect::<Result<_>>()?;
    match parts.as_slice() {
        [a, b, c] => Ok((*a, *b, *c)),
        _ => bail!("fixed position {raw:?} must be three comma-separated values (lat,lon,height) or (X,Y,Z)"),
    }
}
