use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use ridenow::config::ConfigError;
use ridenow::net::types::{PageRequest, PaymentMethod, Point, RideBooking, Role};
use ridenow::state::auth::{NoticeLevel, SessionEvent};
use ridenow::{ApiError, ClientConfig, GuardDecision, LoginOutcome, RouteGuard, SessionContext};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
    #[error("not logged in; run `ridenow login`")]
    NotLoggedIn,
    #[error("this command requires the {0} role")]
    Forbidden(Role),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "ridenow", about = "RideNow rider and driver CLI")]
struct Cli {
    /// Backend base URL; overrides `RIDENOW_API_BASE_URL`.
    #[arg(long, env = "RIDENOW_API_BASE_URL")]
    base_url: Option<String>,

    /// Where the session is persisted between invocations.
    #[arg(long, env = "RIDENOW_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "RIDENOW_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Signup(SignupArgs),
    Logout,
    /// Print the cached profile of the logged-in user.
    Whoami,
    Roles {
        #[arg(long)]
        email: String,
    },
    Rider(RiderCommand),
    Driver(DriverCommand),
    Admin(AdminCommand),
}

#[derive(Args, Debug)]
struct SignupArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, env = "RIDENOW_PASSWORD", hide_env_values = true)]
    password: String,
    /// Repeat to request several roles.
    #[arg(long = "role", default_value = "rider")]
    roles: Vec<Role>,
}

#[derive(Args, Debug)]
struct PageArgs {
    #[arg(long, default_value_t = 0)]
    page: u32,
    #[arg(long, default_value_t = 10)]
    size: u32,
}

impl From<PageArgs> for PageRequest {
    fn from(args: PageArgs) -> Self {
        Self { page: args.page, size: args.size }
    }
}

#[derive(Args, Debug)]
struct RatingArgs {
    ride_id: i64,
    #[arg(long)]
    rating: u8,
    #[arg(long)]
    feedback: Option<String>,
}

#[derive(Args, Debug)]
struct RiderCommand {
    #[command(subcommand)]
    command: RiderSubcommand,
}

#[derive(Subcommand, Debug)]
enum RiderSubcommand {
    Request {
        #[arg(long, allow_negative_numbers = true)]
        pickup_lng: f64,
        #[arg(long, allow_negative_numbers = true)]
        pickup_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        drop_lng: f64,
        #[arg(long, allow_negative_numbers = true)]
        drop_lat: f64,
        #[arg(long, default_value = "cash")]
        payment: PaymentMethod,
    },
    Rides(PageArgs),
    Profile,
    Cancel {
        ride_id: i64,
    },
    Rate(RatingArgs),
}

#[derive(Args, Debug)]
struct DriverCommand {
    #[command(subcommand)]
    command: DriverSubcommand,
}

#[derive(Subcommand, Debug)]
enum DriverSubcommand {
    Available,
    Accept {
        ride_request_id: i64,
    },
    Start {
        ride_id: i64,
        #[arg(long)]
        otp: String,
    },
    End {
        ride_id: i64,
    },
    Cancel {
        ride_id: i64,
    },
    Rate(RatingArgs),
    Rides(PageArgs),
    Profile,
}

#[derive(Args, Debug)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminSubcommand {
    OnboardDriver {
        user_id: i64,
        #[arg(long)]
        vehicle_id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    if let Some(path) = cli.session_file {
        config = config.with_session_file(path);
    }
    tracing::debug!(base_url = %config.base_url, session_file = %config.session_file.display(), "starting");

    let ctx = SessionContext::from_config(&config)?;
    let mut events = ctx.session().events();
    ctx.hydrate();

    let result = dispatch(&ctx, cli.command).await;
    report(&mut events);
    result
}

async fn dispatch(ctx: &SessionContext, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { email, password } => match ctx.login(&email, &password).await? {
            LoginOutcome::Authenticated(user) => print_json(&user),
            LoginOutcome::Degraded(error) => {
                tracing::debug!(%error, "logged in without profile");
                Ok(())
            }
        },
        Command::Signup(args) => {
            let roles: BTreeSet<Role> = args.roles.into_iter().collect();
            let created = ctx.signup(&args.name, &args.email, &args.phone, &args.password, roles).await?;
            match created {
                Some(user) => print_json(&user),
                None => Ok(()),
            }
        }
        Command::Logout => {
            ctx.logout();
            Ok(())
        }
        Command::Whoami => match ctx.session().user() {
            Some(user) if ctx.session().is_authenticated() => print_json(&user),
            _ => Err(CliError::NotLoggedIn),
        },
        Command::Roles { email } => print_json(&ctx.auth().roles(&email).await?),
        Command::Rider(rider) => {
            require(ctx, Role::Rider).await?;
            run_rider(ctx, rider).await
        }
        Command::Driver(driver) => {
            require(ctx, Role::Driver).await?;
            run_driver(ctx, driver).await
        }
        Command::Admin(admin) => {
            require(ctx, Role::Admin).await?;
            match admin.command {
                AdminSubcommand::OnboardDriver { user_id, vehicle_id } => {
                    print_json(&ctx.auth().onboard_driver(user_id, &vehicle_id).await?)
                }
            }
        }
    }
}

async fn run_rider(ctx: &SessionContext, rider: RiderCommand) -> Result<(), CliError> {
    let api = ctx.rider();
    match rider.command {
        RiderSubcommand::Request { pickup_lng, pickup_lat, drop_lng, drop_lat, payment } => {
            let booking = RideBooking {
                pickup_location: Point::new(pickup_lng, pickup_lat),
                drop_off_location: Point::new(drop_lng, drop_lat),
                payment_method: payment,
            };
            print_json(&api.request_ride(&booking).await?)
        }
        RiderSubcommand::Rides(page) => print_json(&api.my_rides(page.into()).await?),
        RiderSubcommand::Profile => print_json(&api.my_profile().await?),
        RiderSubcommand::Cancel { ride_id } => print_json(&api.cancel_ride(ride_id).await?),
        RiderSubcommand::Rate(args) => print_json(&api.rate_driver(args.ride_id, args.rating, args.feedback).await?),
    }
}

async fn run_driver(ctx: &SessionContext, driver: DriverCommand) -> Result<(), CliError> {
    let api = ctx.driver();
    match driver.command {
        DriverSubcommand::Available => print_json(&api.available_rides().await?),
        DriverSubcommand::Accept { ride_request_id } => print_json(&api.accept_ride(ride_request_id).await?),
        DriverSubcommand::Start { ride_id, otp } => print_json(&api.start_ride(ride_id, &otp).await?),
        DriverSubcommand::End { ride_id } => print_json(&api.end_ride(ride_id).await?),
        DriverSubcommand::Cancel { ride_id } => print_json(&api.cancel_ride(ride_id).await?),
        DriverSubcommand::Rate(args) => print_json(&api.rate_rider(args.ride_id, args.rating, args.feedback).await?),
        DriverSubcommand::Rides(page) => print_json(&api.my_rides(page.into()).await?),
        DriverSubcommand::Profile => print_json(&api.my_profile().await?),
    }
}

async fn require(ctx: &SessionContext, role: Role) -> Result<(), CliError> {
    let decision = RouteGuard::new(role).resolve(ctx.session().subscribe()).await;
    tracing::debug!(?decision, %role, "route guard");
    match decision {
        GuardDecision::Render => Ok(()),
        GuardDecision::RedirectUnauthorized => Err(CliError::Forbidden(role)),
        GuardDecision::RedirectLogin | GuardDecision::Pending => Err(CliError::NotLoggedIn),
    }
}

/// Print pending notices to stderr. An invalidated session points the user at `login`.
fn report(events: &mut broadcast::Receiver<SessionEvent>) {
    loop {
        match events.try_recv() {
            Ok(SessionEvent::Notice(notice)) => {
                let label = match notice.level {
                    NoticeLevel::Success => "ok",
                    NoticeLevel::Warning => "warning",
                    NoticeLevel::Error => "failed",
                };
                eprintln!("{label}: {}", notice.message);
            }
            Ok(SessionEvent::Invalidated) => {
                eprintln!("session expired; run `ridenow login` to sign in again");
            }
            Ok(_) => {}
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "missed session events");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
