use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::Command as ProcessCommand;
use std::sync::{mpsc, Arc, Mutex};
use std::{io, time::Duration};
use tracing_subscriber::EnvFilter;

use bucketpr::config::{self, Config};
use bucketpr::services::{
    ChannelActionMenu, ChannelNavigator, HttpBitbucketClient, StaticAccount, TerminalMarkdown,
};
use bucketpr::utils::get_current_repo;
use bucketpr::{
    ui, update, Action, App, Command, Confirm, Message, PullRequestKey, PullRequestViewModel,
    ViewModelServices,
};

/// A TUI for a single Bitbucket pull request
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pull request id, optionally preceded by OWNER/REPO (defaults to the origin remote)
    #[arg(value_name = "[OWNER/REPO] ID", num_args = 1..=2, required = true)]
    target: Vec<String>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref())?;
    init_logging(&config, cli.verbose)?;
    let key = resolve_key(&cli.target)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let (menu_tx, menu_rx) = mpsc::channel();
    let (screen_tx, screen_rx) = mpsc::channel();

    let services = ViewModelServices {
        api: Arc::new(HttpBitbucketClient::new(&config)?),
        markdown: Arc::new(TerminalMarkdown),
        account: Arc::new(StaticAccount::new(config.username.clone())),
        navigator: Arc::new(ChannelNavigator::new(screen_tx)),
        menu: Arc::new(ChannelActionMenu::new(menu_tx)),
    };
    let vm = Arc::new(PullRequestViewModel::new(key, services));
    tracing::info!(key = %vm.key(), "opening pull request");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(
        Arc::clone(&vm),
        config.web_url.clone(),
        runtime.handle().clone(),
        menu_rx,
        screen_rx,
    );
    app.start_action(Action::Load);

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Results of commands still in flight are discarded.
    vm.dispose();
    runtime.shutdown_background();

    if let Err(err) = res {
        tracing::error!(error = ?err, "terminal loop failed");
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging(config: &Config, verbose: bool) -> Result<()> {
    let Some(path) = config.log_path() else {
        return Ok(());
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// `[OWNER/REPO] ID` to a pull request key, falling back to the origin remote.
fn resolve_key(target: &[String]) -> Result<PullRequestKey> {
    let (repo, id) = match target {
        [id] => (None, id),
        [repo, id] => (Some(repo.as_str()), id),
        _ => bail!("expected [OWNER/REPO] ID"),
    };
    let id: u64 = id
        .trim_start_matches('#')
        .parse()
        .with_context(|| format!("invalid pull request id: {}", id))?;

    let (owner, repo) = match repo {
        Some(repo) => match repo.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                (owner.to_string(), name.to_string())
            }
            _ => bail!("repository must be OWNER/REPO, got {}", repo),
        },
        None => get_current_repo()
            .context("not in a Bitbucket repository; pass OWNER/REPO explicitly")?,
    };
    Ok(PullRequestKey::new(owner, repo, id))
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // Check for finished background commands
        if let Some(outcome) = app.check_outcome() {
            if let Some(cmd) = update(app, Message::CommandFinished(outcome)) {
                if handle_command(app, cmd) {
                    return Ok(());
                }
            }
        }

        // Check for menus the view-model wants shown
        if let Some(request) = app.check_menu_request() {
            if let Some(cmd) = update(app, Message::MenuRequested(request)) {
                if handle_command(app, cmd) {
                    return Ok(());
                }
            }
        }

        // Check for navigation requests
        if let Some(screen) = app.check_navigation() {
            if let Some(cmd) = update(app, Message::Navigate(screen)) {
                if handle_command(app, cmd) {
                    return Ok(());
                }
            }
        }

        // Sync comments and update spinner
        if let Some(cmd) = update(app, Message::Tick) {
            if handle_command(app, cmd) {
                return Ok(());
            }
        }

        // Draw UI
        app.viewport = terminal.size()?;
        terminal.draw(|f| ui(f, app))?;

        // Handle input
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.status = None;
                    let msg = key_to_message(app, key.code, key.modifiers);
                    if let Some(msg) = msg {
                        if let Some(cmd) = update(app, msg) {
                            if handle_command(app, cmd) {
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Handle a command returned from update
fn handle_command(app: &mut App, cmd: Command) -> bool {
    match cmd {
        Command::Quit => true,
        Command::Spawn(action) => {
            app.start_action(action);
            false
        }
        Command::OpenUrl(url) => {
            open_url(app, &url);
            false
        }
    }
}

/// Open a page in the system browser
fn open_url(app: &mut App, url: &str) {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    tracing::debug!(url, opener, "opening in browser");
    if let Err(e) = ProcessCommand::new(opener).arg(url).spawn() {
        tracing::warn!(url, error = %e, "failed to open browser");
        app.status = Some(format!("Open {} manually: {}", url, e));
    }
}

/// Convert a key press to a message based on current app state
fn key_to_message(app: &App, key: KeyCode, modifiers: KeyModifiers) -> Option<Message> {
    // Help popup - any key dismisses
    if app.show_help_popup {
        return Some(Message::DismissHelp);
    }

    // Error popup
    if app.show_error_popup {
        return match key {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => Some(Message::DismissError),
            _ => None,
        };
    }

    // Action menu
    if app.menu.is_some() {
        return match key {
            KeyCode::Esc | KeyCode::Char('q') => Some(Message::MenuDismiss),
            KeyCode::Enter => Some(Message::MenuSelect),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MenuNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MenuPrevious),
            _ => None,
        };
    }

    // Merge/decline confirmation
    if app.confirm.is_some() {
        return match key {
            KeyCode::Char('y') | KeyCode::Enter => Some(Message::ConfirmAction),
            KeyCode::Char('n') | KeyCode::Esc => Some(Message::CancelConfirm),
            KeyCode::Tab => Some(Message::ToggleCloseSourceBranch),
            _ => None,
        };
    }

    // Comment composition
    if app.show_comment_popup {
        return match key {
            KeyCode::Esc => Some(Message::CloseCommentPopup),
            KeyCode::Enter => Some(Message::SubmitComment),
            KeyCode::Backspace => Some(Message::CommentBackspace),
            KeyCode::Char(c) => Some(Message::CommentInput(c)),
            _ => None,
        };
    }

    // Approvals popup
    if app.show_approvals_popup {
        return match key {
            KeyCode::Esc | KeyCode::Char('q') => Some(Message::CloseApprovalsPopup),
            KeyCode::Enter => Some(Message::OpenSelectedApproval),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::ApprovalsNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::ApprovalsPrevious),
            _ => None,
        };
    }

    // Search mode
    if app.search_mode {
        return match key {
            KeyCode::Esc => Some(Message::ExitSearchMode { clear: true }),
            KeyCode::Enter => Some(Message::ExitSearchMode { clear: false }),
            KeyCode::Backspace => Some(Message::SearchBackspace),
            KeyCode::Char(c) => Some(Message::SearchInput(c)),
            KeyCode::Down => Some(Message::ScrollDown),
            KeyCode::Up => Some(Message::ScrollUp),
            _ => None,
        };
    }

    // Handle Ctrl+D and Ctrl+U for half-page scrolling
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match key {
            KeyCode::Char('d') => Some(Message::PageDown),
            KeyCode::Char('u') => Some(Message::PageUp),
            KeyCode::Char('c') => Some(Message::Quit),
            _ => None,
        };
    }

    // Normal mode
    match key {
        KeyCode::Char('q') => Some(Message::Quit),
        KeyCode::Char('/') => Some(Message::EnterSearchMode),
        KeyCode::Esc => {
            if !app.search_query.is_empty() {
                Some(Message::ExitSearchMode { clear: true })
            } else {
                None
            }
        }
        KeyCode::Char('j') | KeyCode::Down => Some(Message::ScrollDown),
        KeyCode::Char('k') | KeyCode::Up => Some(Message::ScrollUp),
        KeyCode::Char('g') => Some(Message::GoToTop),
        KeyCode::Char('G') => Some(Message::GoToBottom),
        KeyCode::Char('r') => Some(Message::Refresh),
        KeyCode::Char('a') => Some(Message::ToggleApprove),
        KeyCode::Char('m') => Some(Message::PromptConfirm(Confirm::Merge)),
        KeyCode::Char('x') => Some(Message::PromptConfirm(Confirm::Decline)),
        KeyCode::Char('c') => Some(Message::OpenCommentPopup),
        KeyCode::Char('o') => Some(Message::OpenCommits),
        KeyCode::Char('u') => Some(Message::OpenAuthor),
        KeyCode::Char('v') => Some(Message::OpenApprovalsPopup),
        KeyCode::Enter => Some(Message::ShowMenu),
        KeyCode::Char('?') => Some(Message::ToggleHelp),
        _ => None,
    }
}
