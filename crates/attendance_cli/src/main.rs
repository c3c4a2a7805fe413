//! Development harness for the attendance core.
//!
//! # Responsibility
//! - Wire the core workflow to a SQLite record store and the simulated
//!   biometric/location capabilities.
//! - Keep output line-oriented so runs can be diffed in scripts.
//!
//! ```bash
//! attendance register liz@gmail.com --name Liz
//! attendance check-in liz@gmail.com            # first call enrolls
//! attendance check-in liz@gmail.com --lat 37.78 --lon -122.41
//! attendance status liz@gmail.com
//! ```

use attendance_core::{
    default_log_level, init_logging, AttendanceKind, AttendanceOutcome, AttendanceWorkflow,
    BiometricAuthenticator, Coordinate, LocationAuthorization, LocationProvider, OutcomeKind,
    RecordStore, SimulatedBiometric, SimulatedBiometricSensor, SimulatedLocationService,
    SqliteRecordStore, User, WorkflowConfig,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

const ENV_DB_PATH: &str = "ATTENDANCE_DB_PATH";
const DEFAULT_DB_FILE: &str = "attendance.db";

#[derive(Parser)]
#[command(name = "attendance")]
#[command(about = "Biometric, geofenced attendance (simulated sensors)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database file (falls back to ATTENDANCE_DB_PATH, then the temp dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory for rolling log files; logging is off when omitted
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Create a user record (stand-in for the sign-up flow)
    Register {
        email: String,
        #[arg(long)]
        name: String,
    },
    CheckIn(MarkArgs),
    CheckOut(MarkArgs),
    /// Print today's check-in/check-out flags
    Status { email: String },
}

#[derive(Args)]
struct MarkArgs {
    email: String,

    /// Simulated device latitude (defaults to the office)
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Simulated device longitude (defaults to the office)
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    #[arg(long, value_enum, default_value_t = BiometricMode::Pass)]
    biometric: BiometricMode,

    #[arg(long, value_enum, default_value_t = LocationMode::Granted)]
    location: LocationMode,
}

#[derive(Clone, Copy, ValueEnum)]
enum BiometricMode {
    Pass,
    Fail,
    Unavailable,
}

#[derive(Clone, Copy, ValueEnum)]
enum LocationMode {
    Granted,
    Denied,
    PromptGrant,
    PromptDeny,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, String> {
    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, &absolute(log_dir)?)?;
    }

    let config = WorkflowConfig::from_env().map_err(|err| err.to_string())?;
    let db_path = resolve_db_path(cli.db);
    let store = Arc::new(SqliteRecordStore::open(&db_path).map_err(|err| err.to_string())?);
    info!(
        "event=cli_start module=cli status=ok db_path={}",
        db_path.display()
    );

    match cli.command {
        Command::Register { email, name } => register(&store, &email, name),
        Command::Status { email } => {
            // Status never touches the sensors.
            let location = simulated_location(None, LocationMode::Denied);
            let workflow = workflow(store, config, BiometricMode::Pass, location);
            let status = workflow.day_status(&email).map_err(|err| err.to_string())?;
            println!(
                "checked_in={} checked_out={}",
                status.has_checked_in, status.has_checked_out
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::CheckIn(args) => mark(store, config, args, AttendanceKind::CheckIn).await,
        Command::CheckOut(args) => mark(store, config, args, AttendanceKind::CheckOut).await,
    }
}

fn register(store: &SqliteRecordStore, email: &str, name: String) -> Result<ExitCode, String> {
    if store
        .find_user(email)
        .map_err(|err| err.to_string())?
        .is_some()
    {
        println!("already registered");
        return Ok(ExitCode::SUCCESS);
    }

    let user = User::new(email, name);
    store.save_user(&user).map_err(|err| err.to_string())?;
    println!("registered uuid={}", user.uuid);
    Ok(ExitCode::SUCCESS)
}

async fn mark(
    store: Arc<SqliteRecordStore>,
    config: WorkflowConfig,
    args: MarkArgs,
    kind: AttendanceKind,
) -> Result<ExitCode, String> {
    let office = config.geofence.office;
    let position = Coordinate::new(
        args.lat.unwrap_or(office.latitude),
        args.lon.unwrap_or(office.longitude),
    );
    let location = simulated_location(Some(position), args.location);

    let workflow = workflow(store, config, args.biometric, location);
    let outcome = workflow.mark(&args.email, kind).await;
    Ok(report(&outcome))
}

fn workflow(
    store: Arc<SqliteRecordStore>,
    config: WorkflowConfig,
    biometric: BiometricMode,
    location: SimulatedLocationService,
) -> AttendanceWorkflow<SqliteRecordStore> {
    let sensor = SimulatedBiometricSensor::new(match biometric {
        BiometricMode::Pass => SimulatedBiometric::Match,
        BiometricMode::Fail => SimulatedBiometric::Mismatch,
        BiometricMode::Unavailable => {
            SimulatedBiometric::Unavailable("no biometric hardware".to_string())
        }
    });
    AttendanceWorkflow::new(
        store,
        BiometricAuthenticator::new(Arc::new(sensor)),
        LocationProvider::new(Arc::new(location)),
        config,
    )
}

fn simulated_location(
    position: Option<Coordinate>,
    mode: LocationMode,
) -> SimulatedLocationService {
    let service = match mode {
        LocationMode::Granted => SimulatedLocationService::new(LocationAuthorization::Authorized),
        LocationMode::Denied => SimulatedLocationService::new(LocationAuthorization::Denied),
        LocationMode::PromptGrant | LocationMode::PromptDeny => {
            SimulatedLocationService::new(LocationAuthorization::NotDetermined)
        }
    };
    service.set_position(position);
    if matches!(mode, LocationMode::PromptDeny) {
        service.set_prompt_answer(LocationAuthorization::Denied);
    }
    service
}

fn report(outcome: &AttendanceOutcome) -> ExitCode {
    println!("{}: {}", outcome.kind.as_str(), outcome.message);
    if let Some(event) = &outcome.event {
        println!(
            "event uuid={} kind={} recorded_at_ms={} location={}",
            event.uuid,
            event.kind.as_str(),
            event.recorded_at_ms,
            event.location
        );
    }
    match outcome.kind {
        OutcomeKind::Success | OutcomeKind::Info => ExitCode::SUCCESS,
        OutcomeKind::Rejected => ExitCode::FAILURE,
    }
}

fn resolve_db_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(ENV_DB_PATH).map(PathBuf::from))
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE))
}

fn absolute(path: &Path) -> Result<String, String> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|err| format!("cannot resolve current directory: {err}"))?
            .join(path)
    };
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| format!("log directory `{}` is not valid UTF-8", path.display()))
}
