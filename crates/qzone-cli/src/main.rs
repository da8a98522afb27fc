mod app;
mod geo;
mod nearby;
mod surveys;
mod wallet;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "qzone")]
#[command(about = "Qzone nearby survey client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Local database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Refresh and list nearby locations
    #[command(allow_negative_numbers = true)]
    Nearby {
        /// Search radius in meters (defaults to `QZONE_DEFAULT_RADIUS_METERS`)
        #[arg(long)]
        radius: Option<f64>,
        #[arg(long, requires = "lng")]
        lat: Option<f64>,
        #[arg(long, requires = "lat")]
        lng: Option<f64>,
        /// Read the local cache instead of calling the backend
        #[arg(long)]
        offline: bool,
    },
    /// Print device location fixes as they arrive
    Track {
        #[arg(long, default_value_t = 3)]
        fixes: usize,
    },
    /// List surveys and their progress
    Surveys,
    /// Show one survey and its questions
    Survey { id: String },
    /// Answer a survey question
    Answer {
        survey_id: String,
        question_id: String,
        #[arg(required = true, num_args = 1..)]
        answers: Vec<String>,
    },
    /// Complete a survey and collect its points
    Complete { survey_id: String },
    /// List rewards
    Rewards {
        /// Only rewards the current balance covers
        #[arg(long)]
        affordable: bool,
    },
    /// Redeem a reward with points
    Redeem { reward_id: String },
    /// Show the user profile
    Profile,
    /// Sign in with a third-party identity token
    Login {
        #[arg(long, env = "QZONE_THIRD_PARTY_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Sign out and forget cached session data
    Logout,
    /// Haversine distance between two points, in meters
    #[command(allow_negative_numbers = true)]
    Distance {
        lat1: f64,
        lng1: f64,
        lat2: f64,
        lng2: f64,
    },
    /// Convert a coordinate between WGS-84 and GCJ-02
    #[command(allow_negative_numbers = true)]
    Convert {
        lat: f64,
        lng: f64,
        #[arg(long, value_enum, default_value_t = Datum::Wgs84ToGcj02)]
        direction: Datum,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Datum {
    Wgs84ToGcj02,
    Gcj02ToWgs84,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("qzone: no command given; see --help");
        return Ok(());
    };

    // Pure geometry needs neither config nor storage.
    match command {
        Commands::Distance {
            lat1,
            lng1,
            lat2,
            lng2,
        } => {
            geo::run_distance(lat1, lng1, lat2, lng2);
            return Ok(());
        }
        Commands::Convert {
            lat,
            lng,
            direction,
        } => {
            geo::run_convert(lat, lng, direction);
            return Ok(());
        }
        _ => {}
    }

    let config = qzone_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Commands::Db { command } = &command {
        return app::run_db(&config, command).await;
    }

    let app = app::App::bootstrap(config).await?;
    match command {
        Commands::Nearby {
            radius,
            lat,
            lng,
            offline,
        } => {
            let center = lat.zip(lng).map(|(lat, lng)| qzone_core::Coordinate::new(lat, lng));
            nearby::run_nearby(&app, center, radius, offline).await
        }
        Commands::Track { fixes } => nearby::run_track(&app, fixes).await,
        Commands::Surveys => {
            surveys::run_list(&app);
            Ok(())
        }
        Commands::Survey { id } => surveys::run_show(&app, &id),
        Commands::Answer {
            survey_id,
            question_id,
            answers,
        } => surveys::run_answer(&app, &survey_id, &question_id, answers).await,
        Commands::Complete { survey_id } => surveys::run_complete(&app, &survey_id).await,
        Commands::Rewards { affordable } => {
            wallet::run_rewards(&app, affordable);
            Ok(())
        }
        Commands::Redeem { reward_id } => wallet::run_redeem(&app, &reward_id).await,
        Commands::Profile => {
            wallet::run_profile(&app);
            Ok(())
        }
        Commands::Login { token } => wallet::run_login(&app, &token).await,
        Commands::Logout => wallet::run_logout(&app).await,
        Commands::Db { .. } | Commands::Distance { .. } | Commands::Convert { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests;
