//! Run Controller: orchestrates one configuration run end to end.
//!
//! Starts the monitor, enqueues the transactions for the selected mode,
//! waits with progress reporting until the deadline or cancellation,
//! stops the monitor and evaluates the accumulated evidence.

use std::{
    io::{Read, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::{anyhow, Result};

use crate::{
    base::{
        config::{BaseConfig, TimeMode},
        counters::{self, ProgressCounters},
        monitor::{run_monitor, WRITE_GAP},
        transaction::{mode_transaction, output_transaction},
    },
    utils::progress::progbar,
};

const PROGBAR_WIDTH: usize = 50;

/// How one run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    /// Interrupted by the user before the deadline; the configuration may
    /// be incomplete, so no success/failure judgement is made.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: Outcome,
    pub counters: ProgressCounters,
}

impl RunReport {
    /// Process exit code: 1 = success, 0 = failure (the CLI contract
    /// inherited from the original tool suite).
    pub fn exit_code(&self) -> i32 {
        (self.outcome == Outcome::Success) as i32
    }
}

/// Success heuristic over the final counter snapshot.
///
/// The confirmation threshold for active modes is strictly more than one:
/// the first RTCM 1006 frame after a mode switch may still carry the
/// previous state, so a single sighting is not taken as proof. This is an
/// inherited policy choice, kept as-is.
pub fn evaluate(mode: TimeMode, c: &ProgressCounters) -> bool {
    c.acked == c.sent
        && if mode.is_active_base() {
            c.rtcm_1006 > 1
        } else {
            c.rtcm_1006 == 0
        }
}

/// Actionable hints for a failed run.
pub fn failure_hints(cfg: &BaseConfig, c: &ProgressCounters) -> Vec<String> {
    let mut hints = Vec::new();
    if c.rtcm_1006 == 0 {
        hints.push(format!(
            "Consider increasing accuracy limit to >{}cm or increasing survey duration to >{} seconds.",
            cfg.acc_limit_cm, cfg.svin_duration_s
        ));
    }
    if c.naked > 0 {
        hints.push("Check device supports base station configuration.".to_string());
    }
    hints
}

pub struct BaseRunner {
    cfg: BaseConfig,
    cancel: Arc<AtomicBool>,
}

impl BaseRunner {
    /// `cancel` is the run-wide cancellation flag, typically set from the
    /// process interrupt handler.
    pub fn new(cfg: BaseConfig, cancel: Arc<AtomicBool>) -> Self {
        Self { cfg, cancel }
    }

    /// Run the configuration sequence over an already-opened transport.
    /// `reader` and `writer` are the two directions of the same serial
    /// link; both are handed to the monitor, which is the only task that
    /// touches them.
    pub fn run<R, W>(&self, reader: R, writer: W) -> Result<RunReport>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let cfg = &self.cfg;
        if cfg.mode.is_active_base() {
            println!(
                "Configuring device at port {} as base station using {} timing mode",
                cfg.port, cfg.mode
            );
        } else {
            println!(
                "Configuring device at port {} to disable base station",
                cfg.port
            );
        }
        if cfg.mode == TimeMode::SurveyIn {
            println!(
                "Survey-in duration {}s, accuracy limit {}cm",
                cfg.svin_duration_s, cfg.acc_limit_cm
            );
        } else if cfg.mode == TimeMode::Fixed {
            println!(
                "Fixed position format {}, {:?}, accuracy limit {}cm",
                cfg.pos_type, cfg.fixed_pos, cfg.acc_limit_cm
            );
        }

        // survey time counts against the deadline on top of the ack wait
        let wait_time = cfg.wait_time
            + if cfg.mode == TimeMode::SurveyIn {
                Duration::from_secs(cfg.svin_duration_s as u64)
            } else {
                Duration::ZERO
            };

        let counters = counters::shared();
        let stop = Arc::new(AtomicBool::new(false));
        let (outbound_tx, outbound_rx) = flume::unbounded();

        let monitor = {
            let counters = counters.clone();
            let stop = stop.clone();
            let mode = cfg.mode;
            std::thread::Builder::new()
                .name("ubx-monitor".into())
                .spawn(move || {
                    run_monitor(reader, writer, mode, outbound_rx, counters, stop, WRITE_GAP)
                })?
        };

        // the output toggle is only enqueued once the mode transaction
        // built cleanly
        let result = mode_transaction(cfg).and_then(|txn| {
            outbound_tx
                .send(txn)
                .map_err(|err| anyhow!("outbound queue closed: {err}"))?;
            println!(
                "{} output messages",
                if cfg.mode.is_active_base() {
                    "Enabling"
                } else {
                    "Disabling"
                }
            );
            outbound_tx
                .send(output_transaction(cfg, cfg.mode.is_active_base()))
                .map_err(|err| anyhow!("outbound queue closed: {err}"))
        });
        if let Err(err) = result {
            stop.store(true, Ordering::Release);
            let _ = monitor.join();
            return Err(err);
        }

        let cancelled = self.wait_for_deadline(wait_time, &counters);

        stop.store(true, Ordering::Release);
        monitor
            .join()
            .map_err(|_| anyhow!("monitor thread panicked"))?;

        let snapshot = counters.read().clone();
        let outcome = if cancelled {
            println!("\nTerminated by user. Configuration may be incomplete.");
            Outcome::Cancelled
        } else if evaluate(cfg.mode, &snapshot) {
            println!(
                "\nConfiguration successful. {} configuration messages acknowledged. \
                 {} RTCM 1006 (active base) messages confirmed.",
                snapshot.acked, snapshot.rtcm_1006
            );
            Outcome::Success
        } else {
            println!(
                "\nConfiguration unsuccessful. {} configuration messages sent, \
                 {} acknowledged, {} rejected, {} RTCM 1006 (active base) messages received.",
                snapshot.sent, snapshot.acked, snapshot.naked, snapshot.rtcm_1006
            );
            for hint in failure_hints(cfg, &snapshot) {
                println!("{hint}");
            }
            Outcome::Failure
        };

        Ok(RunReport {
            outcome,
            counters: snapshot,
        })
    }

    /// 1 Hz wait loop with progress display. Returns true when cancelled.
    fn wait_for_deadline(
        &self,
        wait_time: Duration,
        counters: &counters::SharedCounters,
    ) -> bool {
        let start = Instant::now();
        let deadline = start + wait_time;
        let mut ticks = 0u64;
        while Instant::now() < deadline {
            if self.cancel.load(Ordering::Acquire) {
                return true;
            }
            if self.cfg.mode == TimeMode::SurveyIn {
                // driven by the device's own survey progress reports
                let elapsed = counters.read().svin_elapsed_s as u64;
                progbar(elapsed, self.cfg.svin_duration_s as u64, PROGBAR_WIDTH);
            } else {
                ticks += 1;
                progbar(ticks, wait_time.as_secs().max(1), PROGBAR_WIDTH);
            }
            std::thread::sleep(Duration::from_secs(1));
        }
        self.cancel.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(sent: u32, acked: u32, naked: u32, rtcm_1006: u32) -> ProgressCounters {
        ProgressCounters {
            sent,
            acked,
            naked,
            rtcm_1006,
            ..Default::default()
        }
    }

    #[test]
    fn test_survey_in_success() {
        assert!(evaluate(TimeMode::SurveyIn, &snapshot(2, 2, 0, 2)));
    }

    #[test]
    fn test_single_confirmation_is_not_enough() {
        // the first 1006 may be a leftover of the previous state
        assert!(!evaluate(TimeMode::SurveyIn, &snapshot(2, 2, 0, 1)));
        assert!(!evaluate(TimeMode::Fixed, &snapshot(2, 2, 0, 1)));
    }

    #[test]
    fn test_survey_in_missing_ack_fails() {
        assert!(!evaluate(TimeMode::SurveyIn, &snapshot(2, 1, 0, 0)));
    }

    #[test]
    fn test_disabled_requires_zero_confirmations() {
        assert!(evaluate(TimeMode::Disabled, &snapshot(2, 2, 0, 0)));
        assert!(!evaluate(TimeMode::Disabled, &snapshot(2, 2, 0, 1)));
    }

    fn hint_config() -> BaseConfig {
        use crate::base::config::{PortType, PosType};
        BaseConfig {
            port: "/dev/ttyACM0".into(),
            baud: 38400,
            timeout: Duration::from_secs(3),
            port_type: PortType::Usb,
            mode: TimeMode::SurveyIn,
            acc_limit_cm: 100.0,
            svin_duration_s: 60,
            pos_type: PosType::Llh,
            fixed_pos: (0.0, 0.0, 0.0),
            wait_time: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_no_confirmation_hint_names_accuracy_and_duration() {
        let hints = failure_hints(&hint_config(), &snapshot(2, 1, 0, 0));
        assert_eq!(hints.len(), 1);
        assert_eq!(
            hints[0],
            "Consider increasing accuracy limit to >100cm or increasing survey duration to >60 seconds."
        );
    }

    #[test]
    fn test_rejection_hint_flags_device_support() {
        let hints = failure_hints(&hint_config(), &snapshot(2, 1, 1, 2));
        assert_eq!(
            hints,
            vec!["Check device supports base station configuration.".to_string()]
        );
    }

    #[test]
    fn test_both_hints_when_rejected_and_unconfirmed() {
        let hints = failure_hints(&hint_config(), &snapshot(2, 1, 1, 0));
        assert_eq!(hints.len(), 2);
        assert!(hints[0].contains("accuracy limit"));
        assert!(hints[1].contains("device supports"));
    }

    #[test]
    fn test_no_hints_when_counts_do_not_warrant_them() {
        // confirmations seen and nothing rejected: the summary alone has
        // to explain the failure
        assert!(failure_hints(&hint_config(), &snapshot(2, 1, 0, 2)).is_empty());
    }
}
