use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use events::{Envelope, encode_envelope_json};
use portal::PortalConfig;
use portal::config::ConfigError;
use portal::net::push::CHAT_CHANNEL;
use portal::net::{ApiClient, ApiError, ChannelAuthorizer, PushConnection, PushError, PushHub};
use portal::state::booking::{BookingError, BookingWizard, SubmitError, SubmitOutcome};
use portal::state::chat::{ChatError, ChatGateway, ChatRoom};
use portal::state::kiosk::{KioskError, KioskGateway, KioskSession, PaymentMethod, PaymentPrompt};
use portal::state::schedule::{self, TimeRange};
use portal::state::table::{SortKey, TableQuery};
use portal::validation::files::{ImageField, MediaUpload, UploadFile, VerificationUpload};
use portal::validation::forms::{ApprovalDecision, AppointmentReview};
use portal::validation::{Validate, Violations};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Push(#[from] PushError),
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Kiosk(#[from] KioskError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Invalid(#[from] Violations),
    #[error("no trip {0} between the selected terminals")]
    TripNotFound(i64),
    #[error("timed out waiting for payment confirmation")]
    PaymentTimeout,
    #[error("read {path} failed: {source}")]
    ReadFile { path: String, source: std::io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "portal-cli", about = "Maternity and shuttle portal client")]
struct Cli {
    #[arg(long, env = "PORTAL_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "PORTAL_PUSH_URL")]
    push_url: Option<String>,

    #[arg(long, env = "PORTAL_SESSION_TOKEN")]
    session_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a paginated resource.
    List(ListArgs),
    /// Show one doctor with their booking window.
    Doctor { id: i64 },
    /// Trips between two terminals.
    Trips { from: i64, to: i64 },
    /// Book an appointment through the four-step wizard.
    Book(BookArgs),
    /// Sell a walk-in shuttle ticket.
    Kiosk(KioskArgs),
    /// Print push events from a channel.
    Listen {
        #[arg(default_value = CHAT_CHANNEL)]
        channel: String,
    },
    /// Show or extend a chat conversation.
    Chat(ChatArgs),
    /// Upload media files (PNG, JPEG, PDF).
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Submit doctor verification images.
    Verify {
        doctor_id: i64,
        #[arg(long)]
        doctor_id_img: PathBuf,
        #[arg(long)]
        valid_id_img: PathBuf,
    },
    /// Confirm or reject a pending request.
    Approve(ApproveArgs),
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Resource {
    Doctors,
    PendingDoctors,
    Appointments,
    AppointmentApprovals,
    Bookings,
    Kiosks,
    Trips,
    Terminals,
    Payments,
    Inboxes,
    MediaFiles,
    Videos,
    Mothers,
}

#[derive(Args, Debug)]
struct ListArgs {
    resource: Resource,

    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = 10)]
    page_size: u32,

    #[arg(long, default_value = "")]
    search: String,

    #[arg(long = "sort", allow_hyphen_values = true, help = "Sort column, prefix with - for descending")]
    sort: Vec<String>,
}

impl ListArgs {
    fn query(&self) -> TableQuery {
        let mut query = TableQuery::new(self.page_size);
        query.set_search(&self.search);
        query.set_sorting(self.sort.iter().filter_map(|raw| SortKey::parse(raw)).collect());
        query.go_to(self.page.saturating_sub(1));
        query
    }
}

#[derive(Args, Debug)]
struct BookArgs {
    doctor_id: i64,

    #[arg(long, help = "YYYY-MM-DD")]
    date: String,

    #[arg(long, help = "HH:mm or hh:mmAM")]
    start: String,

    #[arg(long)]
    end: String,

    #[arg(long)]
    reference: String,

    #[arg(long)]
    message: Option<String>,
}

#[derive(Args, Debug)]
struct KioskArgs {
    #[arg(long)]
    from: i64,

    #[arg(long)]
    to: i64,

    #[arg(long)]
    trip: i64,

    #[arg(long)]
    name: String,

    #[arg(long)]
    email: String,

    #[arg(long)]
    phone: String,

    #[arg(long, default_value = "cash")]
    method: PaymentMethod,

    #[arg(long, default_value_t = 600)]
    wait_secs: u64,
}

#[derive(Args, Debug)]
struct ChatArgs {
    recipient_id: i64,

    #[arg(long)]
    send: Option<String>,

    #[arg(long, default_value_t = false, help = "Keep printing as messages arrive")]
    follow: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ApproveTarget {
    /// Admin decision on a doctor's verification request.
    Verification,
    /// Doctor decision on an appointment.
    Appointment,
    /// Mother confirmation of an approved appointment.
    Approval,
}

#[derive(Args, Debug)]
struct ApproveArgs {
    target: ApproveTarget,
    id: i64,

    #[arg(long, conflicts_with = "reject")]
    reference: Option<String>,

    #[arg(long, help = "Reject with this reason")]
    reject: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let api = Arc::new(ApiClient::new(&config)?);

    match cli.command {
        Command::List(args) => run_list(&api, &args).await,
        Command::Doctor { id } => run_doctor(&api, id).await,
        Command::Trips { from, to } => print_json(&api.trips_between(from, to).await?),
        Command::Book(args) => run_book(&api, args).await,
        Command::Kiosk(args) => run_kiosk(&config, api, args).await,
        Command::Listen { channel } => run_listen(&config, api, &channel).await,
        Command::Chat(args) => run_chat(&config, api, args).await,
        Command::Upload { files } => run_upload(&api, &files).await,
        Command::Verify { doctor_id, doctor_id_img, valid_id_img } => {
            run_verify(&api, doctor_id, &doctor_id_img, &valid_id_img).await
        }
        Command::Approve(args) => run_approve(&api, args).await,
    }
}

fn build_config(cli: &Cli) -> Result<PortalConfig, CliError> {
    let mut config = match &cli.base_url {
        Some(base_url) => PortalConfig::new(base_url)?,
        None => PortalConfig::from_env()?,
    };
    if let Some(push_url) = &cli.push_url {
        config = config.with_push_url(push_url)?;
    }
    if let Some(token) = &cli.session_token {
        config = config.with_session_token(token.clone());
    }
    Ok(config)
}

async fn run_list(api: &ApiClient, args: &ListArgs) -> Result<(), CliError> {
    let query = args.query();
    let page = match args.resource {
        Resource::Doctors => to_value(&api.doctors_list(&query).await?)?,
        Resource::PendingDoctors => to_value(&api.pending_doctors(&query).await?)?,
        Resource::Appointments => to_value(&api.appointments(&query).await?)?,
        Resource::AppointmentApprovals => to_value(&api.appointment_approvals(&query).await?)?,
        Resource::Bookings => to_value(&api.bookings(&query).await?)?,
        Resource::Kiosks => to_value(&api.kiosks(&query).await?)?,
        Resource::Trips => to_value(&api.trips(&query).await?)?,
        Resource::Terminals => to_value(&api.terminals(&query).await?)?,
        Resource::Payments => to_value(&api.payments(&query).await?)?,
        Resource::Inboxes => to_value(&api.inboxes(&query).await?)?,
        Resource::MediaFiles => to_value(&api.media_files(&query).await?)?,
        Resource::Videos => to_value(&api.informative_videos(&query).await?)?,
        Resource::Mothers => to_value(&api.mothers(&query).await?)?,
    };
    print_json(&page)
}

async fn run_doctor(api: &ApiClient, id: i64) -> Result<(), CliError> {
    let doctor = api.doctor(id).await?;
    let wizard = BookingWizard::for_doctor(&doctor);
    print_json(&doctor)?;
    let availability = wizard.availability();
    let upcoming: Vec<String> = availability
        .upcoming_dates(schedule::today(), 5)
        .into_iter()
        .map(schedule::format_date)
        .collect();
    println!("hours: {}", availability.window_label().unwrap_or_else(|| "any".to_owned()));
    println!("next open days: {}", upcoming.join(", "));
    Ok(())
}

async fn run_book(api: &ApiClient, args: BookArgs) -> Result<(), CliError> {
    let doctor = api.doctor(args.doctor_id).await?;
    let range = TimeRange::parse(&args.start, &args.end).map_err(BookingError::from)?;
    let date = schedule::parse_date(&args.date).map_err(BookingError::from)?;

    let wizard = BookingWizard::for_doctor(&doctor)
        .with_message(args.message.as_deref())
        .next()
        .map_err(BookingError::from)?
        .select_date(date)
        .map_err(BookingError::from)?
        .select_time(range)
        .map_err(BookingError::from)?
        .next()
        .map_err(BookingError::from)?;

    let review = wizard.review(&doctor);
    println!("doctor:  {}", review.doctor_name);
    println!("mode:    {}", review.mode);
    println!("date:    {}", review.date.unwrap_or_default());
    println!("time:    {}", review.time.unwrap_or_default());
    if let Some(fee) = review.fee {
        println!("fee:     {fee:.2}");
    }

    let wizard = wizard.next().map_err(BookingError::from)?.with_reference(&args.reference);
    match wizard.submit(api).await? {
        SubmitOutcome::NavigateBack { message, .. } => {
            println!("{}", message.unwrap_or_else(|| "Appointment booked.".to_owned()));
        }
        SubmitOutcome::Rejected { message } => println!("rejected: {message}"),
    }
    Ok(())
}

async fn run_kiosk(config: &PortalConfig, api: Arc<ApiClient>, args: KioskArgs) -> Result<(), CliError> {
    let trips = api.trips_between(args.from, args.to).await?;
    let trip = trips
        .iter()
        .find(|trip| trip.id == Some(args.trip))
        .ok_or(CliError::TripNotFound(args.trip))?;

    let hub = PushHub::new();
    let gateway: Arc<dyn KioskGateway> = api.clone();
    let mut session = KioskSession::new(gateway, &hub);
    session.update(|wizard| {
        wizard
            .with_passenger(&args.name, &args.email, &args.phone)
            .select_from_terminal(Some(args.from))
            .select_to_terminal(Some(args.to))
            .select_trip(trip)?
            .next()
    })?;

    // Connect before opening the checkout so the confirmation cannot be missed.
    let _connection = if args.method.is_electronic() {
        let authorizer: Arc<dyn ChannelAuthorizer> = api.clone();
        Some(PushConnection::connect(&config.push_url, hub.clone(), authorizer).await?)
    } else {
        None
    };

    let receipt = match session.choose_payment(args.method).await? {
        PaymentPrompt::ConfirmCash => session.confirm_cash().await?,
        PaymentPrompt::Checkout { url, payment_intent_id } => {
            println!("open to pay: {url}");
            info!(intent = %payment_intent_id, "waiting for payment confirmation");
            tokio::time::timeout(Duration::from_secs(args.wait_secs), session.wait_for_payment())
                .await
                .map_err(|_| CliError::PaymentTimeout)??
        }
    };

    if receipt.accepted {
        println!("ticket created");
    } else {
        println!("ticket not accepted: {}", receipt.message.unwrap_or_default());
    }
    if let Some(ticket) = receipt.ticket {
        print_json(&ticket)?;
    }
    Ok(())
}

async fn run_listen(config: &PortalConfig, api: Arc<ApiClient>, channel: &str) -> Result<(), CliError> {
    let hub = PushHub::new();
    let mut subscription = hub.subscribe(channel);
    let authorizer: Arc<dyn ChannelAuthorizer> = api;
    let connection = PushConnection::connect(&config.push_url, hub.clone(), authorizer).await?;
    eprintln!("listening on {channel} as {}", connection.socket_id());

    while let Some(envelope) = subscription.recv().await {
        print_envelope(&envelope)?;
    }
    Ok(())
}

async fn run_chat(config: &PortalConfig, api: Arc<ApiClient>, args: ChatArgs) -> Result<(), CliError> {
    let hub = PushHub::new();
    let gateway: Arc<dyn ChatGateway> = api.clone();
    let mut room = ChatRoom::new(args.recipient_id, gateway, &hub);

    if let Some(content) = &args.send {
        room.send(content).await?;
    } else {
        room.refresh().await?;
    }
    print_json(&room.messages())?;

    if !args.follow {
        return Ok(());
    }
    let authorizer: Arc<dyn ChannelAuthorizer> = api;
    let _connection = PushConnection::connect(&config.push_url, hub.clone(), authorizer).await?;
    loop {
        let messages = room.next_update().await?;
        if let Some(latest) = messages.last() {
            print_json(latest)?;
        }
    }
}

async fn run_upload(api: &ApiClient, paths: &[PathBuf]) -> Result<(), CliError> {
    let files = paths.iter().map(|path| read_upload(path)).collect::<Result<Vec<_>, _>>()?;
    let upload = MediaUpload { files };
    upload.validate()?;
    let response = api.upload_media_files(&upload).await?.accepted()?;
    print_json(&response)
}

async fn run_verify(api: &ApiClient, doctor_id: i64, doctor_id_img: &Path, valid_id_img: &Path) -> Result<(), CliError> {
    let upload = VerificationUpload {
        doctor_id_img: ImageField::New(read_upload(doctor_id_img)?),
        valid_id_img: ImageField::New(read_upload(valid_id_img)?),
    };
    upload.validate()?;
    let response = api.request_verification(doctor_id, &upload).await?.accepted()?;
    print_json(&response)
}

async fn run_approve(api: &ApiClient, args: ApproveArgs) -> Result<(), CliError> {
    let response = match args.target {
        ApproveTarget::Verification | ApproveTarget::Appointment => {
            let decision = match &args.reject {
                Some(remarks) => ApprovalDecision::reject(remarks),
                None => ApprovalDecision::confirm(),
            };
            decision.validate()?;
            if matches!(args.target, ApproveTarget::Verification) {
                api.update_verification_status(args.id, &decision).await?
            } else {
                api.update_appointment_status(args.id, &decision).await?
            }
        }
        ApproveTarget::Approval => {
            let review = match (&args.reject, &args.reference) {
                (Some(reason), _) => AppointmentReview::reject(reason),
                (None, reference) => AppointmentReview::confirm(reference.as_deref().unwrap_or_default()),
            };
            review.validate()?;
            api.update_appointment_approval(args.id, &review).await?
        }
    };
    print_json(&response.accepted()?)
}

fn read_upload(path: &Path) -> Result<UploadFile, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::ReadFile { path: path.display().to_string(), source })?;
    let name = path.file_name().map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
    Ok(UploadFile::new(&name, bytes))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, CliError> {
    Ok(serde_json::to_value(value)?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

fn print_envelope(envelope: &Envelope) -> Result<(), CliError> {
    let rendered = encode_envelope_json(envelope).map_err(PushError::from)?;
    println!("{rendered}");
    Ok(())
}
