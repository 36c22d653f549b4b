use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use eggtimer_core::history::local_date;
use eggtimer_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "eggtimer")]
#[command(about = "Period tracking with cycle statistics and predictions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the configured user
    #[arg(long, global = true)]
    user: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a flow event
    Log {
        /// When it happened (RFC 3339 or YYYY-MM-DD in the user's timezone)
        #[arg(long)]
        at: String,

        /// Mark as the first day of a period
        #[arg(long)]
        first_day: bool,

        /// spotting, light, medium, heavy
        #[arg(long)]
        level: Option<String>,

        /// pink, light_red, red, dark_red, brown, black
        #[arg(long)]
        color: Option<String>,

        /// small, medium, large
        #[arg(long)]
        clots: Option<String>,

        /// slight, moderate, severe
        #[arg(long)]
        cramps: Option<String>,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Delete one of the user's flow events by id
    Remove { id: uuid::Uuid },

    /// Show cycle statistics and projections
    Stats {
        /// Reference instant (defaults to now)
        #[arg(long)]
        now: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show the cycle day for a calendar date
    Reference {
        #[arg(long)]
        at: String,

        #[arg(long)]
        json: bool,
    },

    /// Show the upcoming-period notice for today
    Notify {
        /// Date to treat as today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// List each cycle's start date and length
    History,

    /// Count how often each cycle length occurs
    Frequency,

    /// Export data to CSV
    Export {
        /// Write cycle start dates and lengths here
        #[arg(long, required_unless_present = "events")]
        cycles: Option<PathBuf>,

        /// Write this user's flow events here
        #[arg(long)]
        events: Option<PathBuf>,
    },

    /// Import flow events from CSV
    Import { path: PathBuf },
}

struct Paths {
    events: PathBuf,
    statistics: PathBuf,
}

impl Paths {
    fn new(data_dir: &Path) -> Self {
        Self {
            events: data_dir.join("events.jsonl"),
            statistics: data_dir.join("statistics.json"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        eggtimer_core::logging::init_with_level("debug");
    } else {
        eggtimer_core::logging::init();
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let user_id = cli.user.unwrap_or_else(|| config.user.id.clone());
    let params = EngineParams::from_config(&config)?;

    std::fs::create_dir_all(&data_dir)?;
    let paths = Paths::new(&data_dir);
    tracing::debug!("User {} with data in {:?}", user_id, data_dir);
    let mut service = StatisticsService::new(JsonlEventLog::new(&paths.events), params)
        .with_statistics_file(&paths.statistics);

    match cli.command {
        Commands::Log {
            at,
            first_day,
            level,
            color,
            clots,
            cramps,
            comment,
        } => {
            let mut event = FlowEvent::new(&user_id, parse_instant(&at, params.timezone)?, first_day);
            if let Some(level) = level {
                event.level = level.parse()?;
            }
            if let Some(color) = color {
                event.color = color.parse()?;
            }
            event.clots = clots.map(|c| c.parse()).transpose()?;
            event.cramps = cramps.map(|c| c.parse()).transpose()?;
            event.set_comment(comment);
            cmd_log(&mut service, &event)
        }
        Commands::Remove { id } => cmd_remove(&mut service, &user_id, id),
        Commands::Stats { now, json } => {
            let now = match now {
                Some(s) => parse_instant(&s, params.timezone)?,
                None => Utc::now(),
            };
            cmd_stats(&mut service, &user_id, now, json)
        }
        Commands::Reference { at, json } => {
            let at = parse_instant(&at, params.timezone)?;
            cmd_reference(&mut service, &user_id, at, json)
        }
        Commands::Notify { today } => {
            let today = today.unwrap_or_else(|| local_date(Utc::now(), params.timezone));
            cmd_notify(&mut service, &user_id, today)
        }
        Commands::History => cmd_history(&mut service, &user_id),
        Commands::Frequency => cmd_frequency(&mut service, &user_id),
        Commands::Export { cycles, events } => cmd_export(&mut service, &user_id, cycles, events),
        Commands::Import { path } => cmd_import(&mut service, &user_id, &path),
    }
}

type Service = StatisticsService<JsonlEventLog>;

fn cmd_log(service: &mut Service, event: &FlowEvent) -> Result<()> {
    let stats = service.record_event(event)?;

    println!("✓ Flow event logged!");
    println!("  Id: {}", event.id);
    if event.first_day {
        println!("  First day of period");
    }
    println!("  Average cycle length: {} days", stats.average_cycle_length);
    Ok(())
}

fn cmd_remove(service: &mut Service, user_id: &str, id: uuid::Uuid) -> Result<()> {
    let removed = service.remove_event(user_id, id)?;
    println!("✓ Removed flow event {} ({})", removed.id, removed.timestamp);
    Ok(())
}

fn cmd_stats(service: &mut Service, user_id: &str, now: DateTime<Utc>, json: bool) -> Result<()> {
    let result = service.statistics(user_id, now)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "Average cycle length: {} days (all time: {} days)",
        result.average_cycle_length, result.all_time_average_cycle_length
    );
    match result.current_cycle_length {
        Some(days) => println!("Current cycle length: {} days", days),
        None => println!("Current cycle length: no periods recorded"),
    }
    println!("Minimum: {}", show(result.cycle_length_minimum));
    println!("Maximum: {}", show(result.cycle_length_maximum));
    println!("Mean: {}", show(result.cycle_length_mean));
    println!("Median: {}", show(result.cycle_length_median));
    println!("Mode: {}", show(result.cycle_length_mode));
    println!(
        "Standard deviation: {}",
        show(result.cycle_length_standard_deviation)
    );

    if result.predicted_events.is_empty() {
        println!("\nNo projections yet - log the first day of a period.");
    } else {
        println!("\nProjected:");
        for event in &result.predicted_events {
            println!("  {}  {}", event.date, event.event_type);
        }
    }
    Ok(())
}

fn cmd_reference(
    service: &mut Service,
    user_id: &str,
    at: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    let reference = service.reference(user_id, at)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reference)?);
        return Ok(());
    }

    match reference {
        Some(r) => println!("{}: cycle day {}", r.first_date, r.first_day),
        None => println!("No periods recorded."),
    }
    Ok(())
}

fn cmd_notify(service: &mut Service, user_id: &str, today: NaiveDate) -> Result<()> {
    let result = service.statistics(user_id, Utc::now())?;
    let luteal = service.params().luteal_phase_length;

    match classify(&result, today, luteal) {
        Some(notice) => println!("{}", notice),
        None => println!("No periods recorded."),
    }
    Ok(())
}

fn cmd_history(service: &mut Service, user_id: &str) -> Result<()> {
    let history = service.history(user_id)?;
    let rows = history.length_history();

    if rows.is_empty() {
        println!("No complete cycles recorded.");
        return Ok(());
    }
    for (start, length) in rows {
        println!("{}  {} days", start, length);
    }
    Ok(())
}

fn cmd_frequency(service: &mut Service, user_id: &str) -> Result<()> {
    let history = service.history(user_id)?;
    let counts = history.frequency();

    if counts.is_empty() {
        println!("No complete cycles recorded.");
        return Ok(());
    }
    for (length, count) in counts {
        println!("{:>3} days: {}", length, count);
    }
    Ok(())
}

fn cmd_export(
    service: &mut Service,
    user_id: &str,
    cycles: Option<PathBuf>,
    events: Option<PathBuf>,
) -> Result<()> {
    if let Some(path) = cycles {
        let history = service.history(user_id)?;
        let count = csv_io::export_cycle_history(&history, &path)?;
        println!("✓ Exported {} cycles to {}", count, path.display());
    }

    if let Some(path) = events {
        let mut all = service.store().events_for(user_id)?;
        all.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let count = csv_io::export_events(&all, &path)?;
        println!("✓ Exported {} flow events to {}", count, path.display());
    }
    Ok(())
}

fn cmd_import(service: &mut Service, user_id: &str, path: &Path) -> Result<()> {
    let mut events = csv_io::import_events(path)?;
    for event in &mut events {
        if event.user_id.is_empty() {
            event.user_id = user_id.to_string();
        }
    }

    let summary = service.import_events(&events)?;
    println!("✓ Imported {} flow events", summary.imported);
    if summary.skipped > 0 {
        println!("  Skipped {} already stored", summary.skipped);
    }
    Ok(())
}

/// Parse RFC 3339, or a bare date taken as midnight in the user's timezone
fn parse_instant(s: &str, timezone: FixedOffset) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::Other(format!("Invalid date or timestamp '{}': {}", s, e)))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::Other(format!("Invalid date '{}'", s)))?;
    timezone
        .from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::Other(format!("Ambiguous local time for '{}'", s)))
}

fn show<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
