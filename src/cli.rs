use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::rewards::{Badge, Streak};
use crate::services::analysis_pipeline::AnalysisPipeline;
use crate::services::collaborators::{
    JsonLandmarkDetector, JsonTranscriber, LandmarkDetector, SpeechTranscriber,
};
use crate::services::plan_service::PlanService;
use crate::services::progress_service::ProgressService;
use crate::services::recording_fetcher::HttpRecordingFetcher;
use crate::services::reward_service::RewardService;
use crate::services::session_service::SessionService;
use crate::services::settings_service::SettingsService;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value = "oratoria.sqlite")]
    pub db: PathBuf,

    /// YAML settings file (defaults to $ORATORIA_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for the rolling log file
    #[arg(long, global = true, default_value = "logs")]
    pub log_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a session, analyze a recording and store the result
    Analyze {
        #[arg(long)]
        user: i64,
        /// URL or local path of the recording
        #[arg(long)]
        source: String,
        /// Landmark detector output (defaults to `<recording>.landmarks.json`)
        #[arg(long)]
        landmarks: Option<PathBuf>,
        /// Transcriber output (defaults to `<recording>.transcript.json`)
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
    /// Trends, average tier and weaknesses across a user's sessions
    Progress {
        #[arg(long)]
        user: i64,
    },
    /// Generate this week's practice plan
    Plan {
        #[arg(long)]
        user: i64,
        /// Fixed seed for a reproducible plan
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Badges earned and the current streak
    Rewards {
        #[arg(long)]
        user: i64,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RewardsView {
    badges: Vec<Badge>,
    streak: Streak,
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn execute(cli: Cli) -> AppResult<()> {
    let settings = Arc::new(SettingsService::resolve(cli.config));
    let db = DbPool::new(&cli.db)?;

    match cli.command {
        Command::Analyze {
            user,
            source,
            landmarks,
            transcript,
        } => {
            let analysis_settings = settings.get()?;
            let fetcher = Arc::new(HttpRecordingFetcher::new(&analysis_settings.fetch)?);
            let detector: Arc<dyn LandmarkDetector> = Arc::new(
                landmarks.map_or_else(JsonLandmarkDetector::new, JsonLandmarkDetector::with_path),
            );
            let transcriber: Arc<dyn SpeechTranscriber> = Arc::new(
                transcript.map_or_else(JsonTranscriber::new, JsonTranscriber::with_path),
            );
            let pipeline = AnalysisPipeline::new(analysis_settings, fetcher, detector, transcriber)?;
            let sessions = SessionService::new(db, pipeline);

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let record = sessions.start(user)?;
            let finalized = runtime.block_on(sessions.finalize(&record.id, &source))?;
            print_json(&finalized)
        }
        Command::Progress { user } => {
            let summary = ProgressService::new(db, settings).summary(user)?;
            print_json(&summary)
        }
        Command::Plan { user, seed } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let plan = PlanService::new(db, settings).plan_for(user, Utc::now(), &mut rng)?;
            print_json(&plan)
        }
        Command::Rewards { user } => {
            let rewards = RewardService::new(db);
            print_json(&RewardsView {
                badges: rewards.badges(user)?,
                streak: rewards.streak(user)?,
            })
        }
    }
}

pub fn run_from_args() -> AppResult<()> {
    let cli = Cli::parse();
    crate::utils::logger::init_logging(&cli.log_dir)?;
    info!(target: "app::session", command = ?cli.command, "oratoria starting");
    execute(cli)
}
