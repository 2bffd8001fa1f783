use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use canvas::document::{DocumentError, DocumentLoader};
use canvas::headless::{DrawOp, HeadlessLoader, RecordingTarget, UniformDocument};
use canvas::replay::{RenderError, RenderOutcome};
use canvas::view::ViewState;
use canvas::viewer::{PageView, Viewer};
use clap::{Args, Parser, Subcommand};
use commands::{PageNumber, Size, decode_command};
use slidecast::config::{ClientConfig, ConfigError};
use slidecast::controller::{Input, SessionController, SessionEvent};
use slidecast::info::{InfoError, SessionInfoClient};
use slidecast::session::{Role, Session, SessionError};
use slidecast::transport::{ConnectError, WsConnector};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Size every headless page is laid out at.
const PAGE_SIZE: Size = Size { width: 800.0, height: 600.0 };

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Info(#[from] InfoError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error("document failed to open: {0}")]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("session {0} is owned by this client; use `present`")]
    Owner(String),
    #[error("session {0} is read-only for this client")]
    NotOwner(String),
    #[error("timed out waiting for the relay")]
    Timeout,
    #[error("failed to read input: {0}")]
    Input(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "slidecast", about = "Live presentation sync client")]
struct Cli {
    /// Overrides `SLIDECAST_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides `SLIDECAST_SESSION_COOKIE`.
    #[arg(long)]
    session_cookie: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print what the service knows about a session.
    Info { session_id: String },
    /// Render one page of a session headlessly and list the draw calls.
    Replay(ReplayArgs),
    /// Follow a session as a viewer and print every change.
    Watch(WatchArgs),
    /// Present a session, reading commands as JSON lines.
    Present(PresentArgs),
}

#[derive(Args, Debug)]
struct ReplayArgs {
    session_id: String,

    /// Page to render; defaults to the session's current page.
    #[arg(long)]
    page: Option<i64>,

    #[arg(long, default_value_t = 100)]
    pages: u32,
}

#[derive(Args, Debug)]
struct WatchArgs {
    session_id: String,

    #[arg(long, default_value_t = 100)]
    pages: u32,
}

#[derive(Args, Debug)]
struct PresentArgs {
    session_id: String,

    #[arg(long, default_value = "-", help = "Input file path, or - for stdin")]
    input: String,

    #[arg(long, default_value_t = 100)]
    pages: u32,

    #[arg(long, default_value_t = 10)]
    ready_timeout_secs: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!(error = %e, "ignoring unreadable .env");
        }
    }

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    if cli.session_cookie.is_some() {
        config.session_cookie = cli.session_cookie;
    }

    match cli.command {
        Command::Info { session_id } => run_info(&config, &session_id).await,
        Command::Replay(args) => run_replay(&config, args).await,
        Command::Watch(args) => run_watch(&config, args).await,
        Command::Present(args) => run_present(&config, args).await,
    }
}

async fn join(config: &ClientConfig, session_id: &str) -> Result<Session, CliError> {
    let info = SessionInfoClient::new(config.clone())?.fetch(session_id).await?;
    Ok(Session::joined(session_id, info)?)
}

async fn open_viewer(session: &Session, pages: u32) -> Result<Viewer<UniformDocument, RecordingTarget>, CliError> {
    let loader = HeadlessLoader::new(pages, PAGE_SIZE);
    let document = loader
        .open(session.document_id(), &mut |progress| debug!(percent = progress.percent(), "loading document"))
        .await?;
    Ok(Viewer::new(document, ViewState::new(PAGE_SIZE), RecordingTarget::new(PAGE_SIZE)))
}

async fn run_info(config: &ClientConfig, session_id: &str) -> Result<(), CliError> {
    let info = SessionInfoClient::new(config.clone())?.fetch(session_id).await?;
    println!("title:     {}", info.title);
    println!("document:  {}", info.document_id);
    println!("owner:     {}", info.is_owner);
    println!("page:      {}", info.current_page.map_or_else(|| "-".to_owned(), |page| page.to_string()));
    println!("commands:  {}", info.commands.len());
    println!("ended:     {}", info.ended_at.map_or_else(|| "-".to_owned(), |at| at.to_string()));
    Ok(())
}

async fn run_replay(config: &ClientConfig, args: ReplayArgs) -> Result<(), CliError> {
    let session = join(config, &args.session_id).await?;
    let page = match args.page {
        Some(page) => PageNumber::new(page).map_err(SessionError::from)?,
        None => session.current_page(),
    };

    let mut viewer = open_viewer(&session, args.pages).await?;
    let outcome = viewer.render_page(session.log(), page).await?;

    if let RenderOutcome::Rendered { viewport, strokes, .. } = outcome {
        println!("page {page}: {}x{} at scale {:.2}, {strokes} strokes", viewport.width, viewport.height, viewport.scale);
    }
    for op in viewer.target().ops() {
        match op {
            DrawOp::Resize(size) => println!("resize {}x{}", size.width, size.height),
            DrawOp::FillRect { size, color, .. } => println!("fill {}x{} {color}", size.width, size.height),
            DrawOp::Stroke { points, style } => {
                println!("stroke {} points {} width {:.1}", points.len(), style.color, style.width);
            }
        }
    }
    Ok(())
}

async fn run_watch(config: &ClientConfig, args: WatchArgs) -> Result<(), CliError> {
    let session = join(config, &args.session_id).await?;
    if session.role() == Role::Master {
        return Err(CliError::Owner(args.session_id));
    }
    let viewer = open_viewer(&session, args.pages).await?;
    let connector = WsConnector::new(config.relay_url(), config.session_cookie.clone());
    let mut controller = SessionController::new(session, connector, viewer, config.reconnect);
    let mut events = controller.subscribe();

    controller.start().await?;
    let (_input, rx) = mpsc::unbounded_channel();
    tokio::select! {
        () = controller.run(rx) => {}
        () = print_events(&mut events) => {}
    }
    drain_events(&mut events);
    info!(commands = controller.session().log().len(), "session over");
    Ok(())
}

async fn run_present(config: &ClientConfig, args: PresentArgs) -> Result<(), CliError> {
    let session = join(config, &args.session_id).await?;
    if session.role() != Role::Master {
        return Err(CliError::NotOwner(args.session_id));
    }
    let reader: Box<dyn BufRead + Send> = if args.input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&args.input)?))
    };

    let viewer = open_viewer(&session, args.pages).await?;
    let connector = WsConnector::new(config.relay_url(), config.session_cookie.clone());
    let mut controller = SessionController::new(session, connector, viewer, config.reconnect);
    let mut events = controller.subscribe();

    controller.start().await?;
    tokio::time::timeout(Duration::from_secs(args.ready_timeout_secs), controller.wait_until_ready())
        .await
        .map_err(|_| CliError::Timeout)?;
    drain_events(&mut events);

    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || read_commands(reader, &tx));
    tokio::select! {
        () = controller.run(rx) => {}
        () = print_events(&mut events) => {}
    }
    drain_events(&mut events);
    info!(commands = controller.session().log().len(), "presentation finished");
    Ok(())
}

/// Forward one command per input line; blank and invalid lines are skipped.
fn read_commands(reader: Box<dyn BufRead + Send>, tx: &mpsc::UnboundedSender<Input>) {
    let mut skipped = 0_usize;
    for (index, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "input read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match decode_command(&line) {
            Ok(command) => {
                if tx.send(Input::Command(command)).is_err() {
                    break;
                }
            }
            Err(e) => {
                skipped = skipped.saturating_add(1);
                warn!(line = index + 1, error = %e, "skipping input line");
            }
        }
    }
    debug!(skipped, "input finished");
}

async fn print_events(events: &mut broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => print_event(&event),
            Err(broadcast::error::RecvError::Lagged(missed)) => warn!(missed, "event printer lagging"),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn drain_events(events: &mut broadcast::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Link(status) => println!("link      {status:?}"),
        SessionEvent::TransportError(reason) => println!("error     {reason}"),
        SessionEvent::CommandApplied(kind) => println!("command   {kind}"),
        SessionEvent::PageChanged(page) => println!("page      {page}"),
        SessionEvent::RenderFailed { page, reason } => println!("render    page {page} failed: {reason}"),
        SessionEvent::Rejected(reason) => println!("rejected  {reason}"),
        SessionEvent::Ended(at) => println!("ended     {at}"),
    }
}
