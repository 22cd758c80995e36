use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;

use sat_pointer::config::Config;
use sat_pointer::control::{run_server, ControlHandle};
use sat_pointer::predict::{
    compute_sky_path, find_next_pass, load_tle_file, parse_multi_tle, topocentric,
    ObserverFrame, OrbitalElements, PassEvents, Satellite, SkyPath, TleSet,
};
use sat_pointer::runner::{self, Context};
use sat_pointer::time::{Epoch, Monotonic, SystemMonotonic};

#[derive(Parser)]
#[command(name = "sat-pointer")]
#[command(about = "Autonomous satellite tracking mount")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control loop and the control surface
    Run {
        #[arg(long)]
        config: PathBuf,
        /// Drive a simulated mount instead of hardware
        #[arg(long)]
        simulate: bool,
    },
    /// Print the next pass of every element set in a file
    Predict {
        #[arg(long)]
        tle: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, default_value_t = 0.0)]
        alt: f64,
        /// Search from this time instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        #[arg(long)]
        json: bool,
    },
    /// Validate every element set in a file
    CheckTle { file: PathBuf },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, simulate } => run(&config, simulate),
        Commands::Predict {
            tle,
            lat,
            lon,
            alt,
            at,
            json,
        } => predict(&tle, ObserverFrame::new(lat, lon, alt), at.unwrap_or_else(Utc::now), json),
        Commands::CheckTle { file } => check_tle(&file),
    }
}

fn run(path: &Path, simulate: bool) -> ExitCode {
    let mut config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    config.simulate |= simulate;

    let clock = SystemMonotonic::new();
    let ctx = match Context::from_config(&config, clock.millis()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error setting up station: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async move {
        let (tx, rx) = mpsc::channel(16);
        let bind = config.control.bind.clone();
        tokio::spawn(async move {
            if let Err(e) = run_server(&bind, ControlHandle::new(tx)).await {
                log::error!("Control surface stopped: {}", e);
            }
        });
        runner::run(ctx, clock, config.control.tick, rx).await;
    });

    ExitCode::SUCCESS
}

#[derive(Serialize)]
struct EventSummary {
    time: Option<String>,
    azimuth_deg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    elevation_deg: Option<f64>,
}

#[derive(Serialize)]
struct PassSummary {
    name: String,
    catalog_number: u64,
    rise: Option<EventSummary>,
    transit: Option<EventSummary>,
    set: Option<EventSummary>,
    sky_path: SkyPath,
}

impl PassSummary {
    fn new(elements: &OrbitalElements, events: &PassEvents, sky_path: SkyPath) -> Self {
        let time = |t: Epoch| t.to_datetime().map(|dt| dt.and_utc().to_rfc3339());
        Self {
            name: elements.name.clone(),
            catalog_number: elements.catalog_number,
            rise: events.rise.map(|e| EventSummary {
                time: time(e.time),
                azimuth_deg: e.azimuth_deg,
                elevation_deg: None,
            }),
            transit: events.transit.map(|e| EventSummary {
                time: time(e.time),
                azimuth_deg: e.azimuth_deg,
                elevation_deg: Some(e.elevation_deg),
            }),
            set: events.set.map(|e| EventSummary {
                time: time(e.time),
                azimuth_deg: e.azimuth_deg,
                elevation_deg: None,
            }),
            sky_path,
        }
    }
}

fn predict(path: &Path, observer: ObserverFrame, at: DateTime<Utc>, json: bool) -> ExitCode {
    let sets = match load_tle_file(path) {
        Ok(sets) => sets,
        Err(e) => {
            eprintln!("Error reading element sets: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let now = match Epoch::from_datetime(at.naive_utc()) {
        Ok(now) => now,
        Err(e) => {
            eprintln!("Unsupported time: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut summaries = Vec::new();
    for (_, elements) in sets {
        let sat = Satellite::new(elements);
        let result = sat.predict(now).and_then(|state| {
            let events = find_next_pass(&sat, &observer, now)?;
            let elevation = topocentric(&state, &observer).elevation_deg;
            let path = compute_sky_path(&sat, &observer, now, elevation, &events)?;
            Ok((events, path))
        });
        match result {
            Ok((events, path)) => summaries.push(PassSummary::new(sat.elements(), &events, path)),
            Err(e) => eprintln!("{}: {}", sat.elements().name, e),
        }
    }

    if json {
        match serde_json::to_string_pretty(&summaries) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error encoding JSON: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    for s in &summaries {
        println!("{} ({})", s.name, s.catalog_number);
        for (label, event) in [("rise", &s.rise), ("transit", &s.transit), ("set", &s.set)] {
            match event {
                Some(e) => println!(
                    "  {:<8} {}  az {:6.1}{}",
                    label,
                    e.time.as_deref().unwrap_or("?"),
                    e.azimuth_deg,
                    e.elevation_deg
                        .map(|el| format!("  el {:4.1}", el))
                        .unwrap_or_default()
                ),
                None => println!("  {:<8} none within two days", label),
            }
        }
        if !s.sky_path.is_empty() {
            let points: Vec<String> = s
                .sky_path
                .iter()
                .map(|p| format!("{:.1},{:.1}", p.azimuth_deg, p.elevation_deg))
                .collect();
            println!("  path     {}", points.join(" "));
        }
    }
    ExitCode::SUCCESS
}

fn check_tle(path: &Path) -> ExitCode {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let sets = parse_multi_tle(&content);
    let mut failures = 0;
    for (i, (name, line1, line2)) in sets.iter().enumerate() {
        let label = name.as_deref().unwrap_or("unnamed");
        let parsed = TleSet::new(label, line1, line2)
            .and_then(|tle| OrbitalElements::from_tle(&tle));
        match parsed {
            Ok(elements) => println!(
                "  {}: {} ({}) epoch {:?}",
                i + 1,
                label,
                elements.catalog_number,
                elements.epoch.to_datetime()
            ),
            Err(e) => {
                failures += 1;
                println!("  {}: {} INVALID: {}", i + 1, label, e);
            }
        }
    }

    if failures > 0 || sets.is_empty() {
        eprintln!("{} of {} element sets invalid", failures, sets.len());
        return ExitCode::FAILURE;
    }
    println!("All {} element sets valid", sets.len());
    ExitCode::SUCCESS
}
