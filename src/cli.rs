use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::models::UserAction;

#[derive(Parser)]
#[command(
    name = "agrowatch",
    version,
    about = "Weather-driven irrigation advice and alerts for farm plots"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override SQLite data directory
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Re-run interactive setup
    Init,
    /// Validate config and test connections
    Check,
    /// Manage registered plots
    #[command(subcommand)]
    Plot(PlotCommand),
    /// Run the advisory rules on given readings (no network)
    Recommend {
        /// Air temperature in °C
        #[arg(long, allow_negative_numbers = true)]
        temperature: Option<f64>,
        /// Relative humidity in %
        #[arg(long)]
        humidity: Option<f64>,
        /// Accumulated rain in mm
        #[arg(long)]
        rain: Option<f64>,
    },
    /// Fetch weather for one plot, record it and raise alerts
    Refresh { plot_id: i64 },
    /// Check every plot with coordinates and notify owners
    Sweep,
    /// List alerts
    Alerts {
        /// Only alerts for this plot
        #[arg(long)]
        plot: Option<i64>,
        /// Only unresolved alerts
        #[arg(long)]
        open: bool,
    },
    /// Mark an alert resolved
    Resolve {
        alert_id: i64,
        #[arg(long, default_value = "resolved")]
        response: String,
    },
    /// Record a grower's action against a plot's latest alert
    Respond {
        plot_id: i64,
        #[arg(value_enum)]
        action: ActionArg,
    },
    /// Show recent weather samples for a plot
    History {
        plot_id: i64,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum PlotCommand {
    /// Register a plot
    Add(AddPlotArgs),
    /// List registered plots
    List,
    /// Delete a plot with its alerts and history
    Remove { plot_id: i64 },
}

#[derive(Args)]
pub struct AddPlotArgs {
    pub name: String,
    /// Owner's email, used for notifications
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub owner: Option<String>,
    #[arg(long, allow_negative_numbers = true, requires = "longitude")]
    pub latitude: Option<f64>,
    #[arg(long, allow_negative_numbers = true, requires = "latitude")]
    pub longitude: Option<f64>,
    #[arg(long, default_value = "SV")]
    pub country: String,
    #[arg(long, default_value = "")]
    pub description: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ActionArg {
    #[value(alias = "abono_aplicado")]
    Applied,
    #[value(alias = "no_aplicado")]
    NotApplied,
}

impl From<ActionArg> for UserAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Applied => UserAction::Applied,
            ActionArg::NotApplied => UserAction::NotApplied,
        }
    }
}
