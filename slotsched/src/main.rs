/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use slotsched::bus::TracingBus;
use slotsched::config::SchedulerConfig;
use slotsched::scheduler::Scheduler;
use slotsched::table::{LoadType, ManagedTable};
use slotsched::tick::TickClock;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Table-driven slot scheduler.
///
/// Example:
///   slotsched -c demos/scheduler.yaml -m demos/msg_tbl.json \
///             -s demos/sch_tbl.json -n 500 --dump
#[derive(Debug, Parser)]
#[command(
    name = "slotsched",
    about = "Table-driven slot scheduler",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML scheduler configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Message Table file; overrides tables.message_table_file.
    #[arg(short = 'm', long = "msgtbl")]
    message_table: Option<PathBuf>,

    /// Schedule Table file; overrides tables.schedule_table_file.
    #[arg(short = 's', long = "schtbl")]
    schedule_table: Option<PathBuf>,

    /// Stop after this many ticks (0 runs until Ctrl-C).
    #[arg(short = 'n', long = "ticks", default_value_t = 0)]
    ticks: u64,

    /// Dump both tables on exit (to tables.dump_dir, or the current directory).
    #[arg(short = 'd', long = "dump", default_value_t = false)]
    dump: bool,
}

// ── Major-frame signal ────────────────────────────────────────────────────────

/// Synthesizes the external major-frame signal from the wall clock.
struct MajorFrameSignal {
    period: Duration,
    slack: Duration,
    next: Instant,
}

impl MajorFrameSignal {
    fn new(period: Duration, minor_frame: Duration, start: Instant) -> Self {
        Self {
            period,
            slack: minor_frame / 2,
            next: start,
        }
    }

    /// `true` once per major frame, on the first tick within half a slot of
    /// the boundary.
    fn poll(&mut self, now: Instant) -> bool {
        if now + self.slack < self.next {
            return false;
        }
        while self.next <= now + self.slack {
            self.next += self.period;
        }
        true
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("slotsched starting up...");

    // ── Parse CLI arguments ───────────────────────────────────────────────────
    let cli = Cli::parse();

    info!(
        config         = ?cli.config,
        message_table  = ?cli.message_table,
        schedule_table = ?cli.schedule_table,
        ticks          = cli.ticks,
        dump           = cli.dump,
        "Command line"
    );

    // ── Load configuration ────────────────────────────────────────────────────
    let config = match &cli.config {
        Some(path) => match SchedulerConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load scheduler configuration: {:#}", e);
                process::exit(1);
            }
        },
        None => {
            warn!("No configuration file provided, using default scheduler settings");
            SchedulerConfig::default()
        }
    };

    let mut scheduler = Scheduler::new(&config, TracingBus::new());

    // ── Load tables ───────────────────────────────────────────────────────────
    let msg_path = cli
        .message_table
        .clone()
        .or_else(|| config.tables.message_table_file.clone());
    let sch_path = cli
        .schedule_table
        .clone()
        .or_else(|| config.tables.schedule_table_file.clone());

    if let Some(path) = &msg_path {
        if !scheduler
            .message_table_mut()
            .load_callback(path, LoadType::Replace)
        {
            process::exit(1);
        }
    } else {
        warn!("No Message Table file, every scheduled activity will fail to resolve");
    }

    if let Some(path) = &sch_path {
        if !scheduler
            .schedule_table_mut()
            .load_callback(path, LoadType::Replace)
        {
            process::exit(1);
        }
    } else {
        warn!("No Schedule Table file, all activities disabled");
    }

    // ── Tick loop ─────────────────────────────────────────────────────────────
    let minor_frame = config.minor_frame();
    let major_period = minor_frame * u32::from(config.frame.slots_per_major_frame);

    let mut interval = time::interval(minor_frame);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut clock = TickClock::new(minor_frame);
    let mut signal = MajorFrameSignal::new(major_period, minor_frame, Instant::now());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        minor_frame_us = config.frame.minor_frame_us,
        slots = config.frame.slots_per_major_frame,
        "Scheduler running"
    );

    let mut ticks: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut shutdown => {
                info!("Interrupted, stopping");
                break;
            }
        }

        let now = Instant::now();
        let major_frame = signal.poll(now);
        let tick = clock.tick_at(now, major_frame);

        if !scheduler.process_tick(&tick) {
            debug!(tick = ticks, "Tick completed with dispatch failures");
        }

        if major_frame {
            match serde_json::to_string(&scheduler.housekeeping()) {
                Ok(hk) => info!(housekeeping = %hk, "Housekeeping"),
                Err(e) => warn!("Failed to encode housekeeping: {}", e),
            }
        }

        ticks += 1;
        if cli.ticks > 0 && ticks >= cli.ticks {
            break;
        }
    }

    let diag = scheduler.diagnostics();
    info!(
        ticks,
        slots_processed = diag.counters.slots_processed,
        success = diag.counters.activity_success,
        failure = diag.counters.activity_failure,
        sync_state = ?diag.sync_state,
        "Scheduler stopped"
    );

    // ── Dump tables ───────────────────────────────────────────────────────────
    if cli.dump {
        let dir = config
            .tables
            .dump_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        if !dump_tables(&scheduler, &dir) {
            process::exit(1);
        }
    }
}

fn dump_tables(scheduler: &Scheduler<TracingBus>, dir: &Path) -> bool {
    if let Err(e) = std::fs::create_dir_all(dir) {
        error!("Cannot create dump directory {}: {}", dir.display(), e);
        return false;
    }
    let msg_ok = scheduler
        .message_table()
        .dump_callback(&dir.join("msg_tbl_dump.json"));
    let sch_ok = scheduler
        .schedule_table()
        .dump_callback(&dir.join("sch_tbl_dump.json"));
    msg_ok && sch_ok
}
