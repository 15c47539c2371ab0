mod cli;
mod config;
mod datasources;
mod db;
mod error;
mod logic;
mod models;

use clap::Parser;
use cli::{AddPlotArgs, Cli, Commands, PlotCommand};
use config::Config;
use db::Database;
use error::{AgroError, Result};
use logic::{MonitorService, PlotReport};
use models::{AlertRecord, Plot, UserAction, WeatherRecord};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        if matches!(e, AgroError::Config(_)) {
            eprintln!("Run `agrowatch init` or copy config/config.yaml.example to config/config.yaml");
        }
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let data_dir = cli.data_dir.as_ref();

    match cli.command {
        Commands::Init => {
            Config::setup_interactive(cli.config)?;
        }
        Commands::Check => check(cli.config, data_dir).await?,
        Commands::Plot(command) => plot_command(command, &Database::open(data_dir)?)?,
        Commands::Recommend {
            temperature,
            humidity,
            rain,
        } => {
            let rec = logic::recommend(temperature, humidity, rain);
            println!("[{}] {}", rec.band(), rec.message);
        }
        Commands::Refresh { plot_id } => {
            let config = Config::load(cli.config)?;
            let db = Database::open(data_dir)?;
            let plot = db.require_plot(plot_id)?;
            let report = MonitorService::new(&config, db)?.refresh_plot(&plot).await?;
            print_report(&report)?;
        }
        Commands::Sweep => {
            let config = Config::load(cli.config)?;
            let db = Database::open(data_dir)?;
            let summary = MonitorService::new(&config, db)?.sweep().await?;
            println!("Sweep complete: {}", summary);
        }
        Commands::Alerts { plot, open } => {
            let alerts = Database::open(data_dir)?.list_alerts(plot, open)?;
            if alerts.is_empty() {
                println!("No alerts");
            }
            for alert in &alerts {
                print_alert(alert);
            }
        }
        Commands::Resolve { alert_id, response } => {
            let coordinator = logic::AlertCoordinator::new(Database::open(data_dir)?);
            let alert = coordinator.resolve(alert_id, &response)?;
            print_alert(&alert);
        }
        Commands::Respond { plot_id, action } => {
            let db = Database::open(data_dir)?;
            let plot = db.require_plot(plot_id)?;
            let action = UserAction::from(action);
            let alert = logic::AlertCoordinator::new(db).resolve_latest_or_create(&plot, action)?;
            println!("Recorded '{}' for {}", action, plot.name);
            print_alert(&alert);
        }
        Commands::History { plot_id, limit } => {
            let db = Database::open(data_dir)?;
            let plot = db.require_plot(plot_id)?;
            let records = db.recent_weather_records(plot_id, limit)?;
            println!("{} - {} samples", plot, records.len());
            for record in &records {
                print_weather_record(record);
            }
        }
    }

    Ok(())
}

async fn check(config_path: Option<PathBuf>, data_dir: Option<&PathBuf>) -> Result<()> {
    let config = Config::load(config_path)?;
    println!("Config: OK");

    let db = Database::open(data_dir)?;
    println!("Database: OK ({})", db.path().display());

    let status = logic::check_connections(&config).await?;
    println!(
        "WeatherAPI: {}",
        if status.weather { "OK" } else { "OFFLINE" }
    );
    match status.ai {
        Some(true) => println!("Gemini: OK"),
        Some(false) => println!("Gemini: OFFLINE"),
        None => println!("Gemini: not configured"),
    }
    println!(
        "Mail relay: {}",
        if status.mail_configured {
            "configured"
        } else {
            "not configured"
        }
    );

    Ok(())
}

fn plot_command(command: PlotCommand, db: &Database) -> Result<()> {
    match command {
        PlotCommand::Add(args) => {
            let plot = plot_from_args(args);
            let id = db.create_plot(&plot)?;
            println!("Created plot {}: {}", id, plot);
        }
        PlotCommand::List => {
            let plots = db.list_plots()?;
            if plots.is_empty() {
                println!("No plots registered");
            }
            for plot in &plots {
                println!(
                    "{:>4}  {}  <{}>",
                    plot.id.unwrap_or_default(),
                    plot,
                    plot.owner_email
                );
            }
        }
        PlotCommand::Remove { plot_id } => {
            if !db.delete_plot(plot_id)? {
                return Err(AgroError::NotFound(format!("plot {}", plot_id)));
            }
            println!("Removed plot {}", plot_id);
        }
    }
    Ok(())
}

fn plot_from_args(args: AddPlotArgs) -> Plot {
    let mut plot = Plot::new(args.name, args.email);
    plot.owner_name = args.owner;
    plot.country_code = args.country;
    plot.description = args.description;
    if let (Some(lat), Some(lon)) = (args.latitude, args.longitude) {
        plot = plot.with_coordinates(lat, lon);
    }
    plot
}

fn print_report(report: &PlotReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn print_alert(alert: &AlertRecord) {
    let status = if alert.resolved {
        format!("resolved ({})", alert.user_response)
    } else if alert.notified {
        "open, notified".to_string()
    } else {
        "open".to_string()
    };
    println!(
        "{:>4}  {}  {:<10}  {:<20}  {}",
        alert.id.unwrap_or_default(),
        alert.created_at.format("%Y-%m-%d %H:%M"),
        alert.alert_type.as_str(),
        status,
        alert.message
    );
}

fn print_weather_record(record: &WeatherRecord) {
    let value = |v: Option<f64>| v.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".into());
    println!(
        "{}  temp {:>5}°C  hum {:>5}%  rain {:>5}mm  {}",
        record.timestamp.format("%Y-%m-%d %H:%M"),
        value(record.temperature_c),
        value(record.humidity_percent),
        value(record.rain_mm),
        record.recommendation
    );
}
