use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{Context, Result};
use clap::ArgMatches;

use ubxbase::{base::runner::BaseRunner, cli, protocol::transport};

fn main() {
    let matches = cli::base_command().get_matches();

    let verbosity = *matches.get_one::<i8>("verbosity").unwrap_or(&2);
    if let Err(err) = cli::logging::init(verbosity, matches.get_one::<String>("logtofile")) {
        eprintln!("ubxbase: {err:#}");
        std::process::exit(0);
    }

    // exit code contract: 1 = success, 0 = failure
    match run(&matches) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("ubxbase: {err:#}");
            std::process::exit(0);
        }
    }
}

fn run(matches: &ArgMatches) -> Result<i32> {
    let cfg = cli::resolve_base_config(matches)?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.store(true, Ordering::Release))
            .context("failed to install interrupt handler")?;
    }

    let reader = transport::open_serial(&cfg.port, cfg.baud, cfg.timeout)?;
    let writer = reader
        .try_clone()
        .context("failed to clone serial handle for writing")?;

    let report = BaseRunner::new(cfg, cancel).run(reader, writer)?;
    Ok(report.exit_code())
}
