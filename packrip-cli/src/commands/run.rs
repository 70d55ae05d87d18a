use crate::config::CliContext;
use clap::Args;
use packrip_window::{
    parse_entry, EnrollOutcome, ResultBroadcaster, WindowError, WindowSchedule, WindowScheduler,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Args)]
pub struct RunArgs {
    /// Only open and resolve windows on `/open [secs]` and `/resolve` lines
    #[arg(short, long)]
    pub manual: bool,

    /// Window length in seconds, overrides the service config
    #[arg(long)]
    pub duration: Option<u64>,

    /// Seconds between window openings, overrides the service config
    #[arg(long)]
    pub period: Option<u64>,
}

pub async fn handle_run_command(args: RunArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let mut service = ctx.service.clone();
    if let Some(duration) = args.duration {
        service.window.duration_secs = duration;
    }
    if let Some(period) = args.period {
        service.window.period_secs = period;
    }
    service.validate()?;

    let broadcaster = match &service.broadcast {
        Some(settings) => Some(Arc::new(ResultBroadcaster::from_settings(settings)?)),
        None => {
            tracing::warn!("No broadcast settings configured, results will not reach the overlay");
            None
        }
    };

    let scheduler = Arc::new(WindowScheduler::new(
        service.channel_id.clone(),
        ctx.configs.clone(),
        ctx.ledger.clone(),
        broadcaster,
    ));
    let schedule = WindowSchedule::from(&service.window);

    let autonomous = if args.manual {
        println!("Manual mode: '/open [secs]', '/resolve' and '/status' control the window");
        None
    } else {
        println!(
            "Opening a {}s window every {}s for channel '{}'",
            schedule.duration.as_secs(),
            schedule.period.as_secs(),
            service.channel_id
        );
        Some(scheduler.spawn_autonomous(schedule))
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => handle_line(&scheduler, &line, schedule, args.manual).await,
                None => {
                    if autonomous.is_some() {
                        // chat feed ended; keep awarding whatever is in flight until interrupted
                        tracing::info!("Entry feed closed, press Ctrl-C to stop");
                        tokio::signal::ctrl_c().await?;
                    }
                    break;
                }
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    tracing::info!("Shutting down");
    if let Some(handle) = autonomous {
        handle.abort();
    }
    scheduler.flush_broadcasts().await;

    Ok(())
}

async fn handle_line(scheduler: &WindowScheduler, line: &str, schedule: WindowSchedule, manual: bool) {
    let line = line.trim();

    if manual && line.starts_with('/') {
        handle_control(scheduler, line, schedule).await;
        return;
    }

    let Some(entry) = parse_entry(line) else {
        return;
    };

    match scheduler.enroll(&entry.viewer_id) {
        Ok(EnrollOutcome::Enrolled) => {
            tracing::info!("{} entered the rip window", entry.viewer_id)
        }
        Ok(EnrollOutcome::AlreadyEnrolled) => {
            tracing::debug!("{} is already in the rip window", entry.viewer_id)
        }
        Err(WindowError::WindowClosed { .. }) => {
            tracing::debug!("Ignoring entry from {}: window closed", entry.viewer_id)
        }
        Err(e) => tracing::warn!("Failed to enroll {}: {}", entry.viewer_id, e),
    }
}

async fn handle_control(scheduler: &WindowScheduler, line: &str, schedule: WindowSchedule) {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("/open") => {
            let duration = match parts.next().map(str::parse::<u64>) {
                Some(Ok(secs)) if secs > 0 => Duration::from_secs(secs),
                Some(_) => {
                    println!("Usage: /open [seconds]");
                    return;
                }
                None => schedule.duration,
            };

            match scheduler.open(duration) {
                Ok(cycle_id) => {
                    println!("Rip window {} open", cycle_id);
                    if let Some(announcement) = scheduler.info().announcement() {
                        println!("{}", announcement);
                    }
                }
                Err(e) => println!("Could not open window: {}", e),
            }
        }

        Some("/resolve") => match scheduler.resolve().await {
            Ok(report) => {
                println!("{}", report.summary());
                for failure in &report.failures {
                    println!("  {} missed out: {}", failure.viewer_id, failure.message);
                }
            }
            Err(e) => println!("Could not resolve window: {}", e),
        },

        Some("/status") => {
            let info = scheduler.info();
            println!("Window: {:?}", info.state);
            println!("  Participants: {}", info.participant_count);
            if let Some(closes_at) = info.closes_at {
                println!("  Closes at: {}", closes_at.format("%Y-%m-%d %H:%M:%S"));
            }
            if let Some(last) = scheduler.last_rip_at() {
                println!("  Last rip: {}", last.format("%Y-%m-%d %H:%M:%S"));
            }
        }

        _ => println!("Unknown command: {}", line),
    }
}
