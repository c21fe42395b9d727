use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use taskboard::backend::{LocalBackend, RemoteBackend, TaskBackend};
use taskboard::config::{BackendKind, Config};
use taskboard::data;
use taskboard::details::row_values;
use taskboard::logging;
use taskboard::login::LoginFlow;
use taskboard::server::MockServer;
use taskboard::session::SessionStorage;
use taskboard::task::TaskStatus;
use taskboard::task_board::TaskBoard;
use taskboard::tasks_view::TasksView;
use taskboard::ui::{self, App};
use taskboard::user::{Credentials, UserStore};

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(version, about = "Log in and manage your tasks")]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where users and tasks come from
    #[arg(long, value_enum, global = true)]
    backend: Option<BackendKind>,

    /// Base URL of the REST backend
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session storage file
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the terminal UI (default)
    Ui,
    /// Serve the REST endpoints over seed data
    Serve {
        #[arg(long, default_value = "127.0.0.1:4300")]
        addr: SocketAddr,
    },
    #[command(flatten)]
    Session(SessionCommands),
}

/// Commands that run against the session user and then exit.
#[derive(Subcommand)]
enum SessionCommands {
    /// Log in and store the user in the session
    Login {
        #[arg(long, default_value = "jonnygold@gmail.com")]
        email: String,
        #[arg(long, default_value = "1234")]
        password: String,
    },
    /// Forget the session user
    Logout,
    /// Show the session user
    Whoami,
    /// Work with the session user's tasks
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// List tasks, optionally only one status
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Show every field of one task
    Show { task_id: u32 },
    Add {
        #[arg(long, default_value = "New Task")]
        name: String,
        #[arg(long, default_value = "My new task description")]
        description: String,
        #[arg(long, default_value = "do")]
        status: TaskStatus,
    },
    Edit {
        task_id: u32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    Delete { task_id: u32 },
    /// Move a task one status step forward (or back with --back)
    Move {
        task_id: u32,
        #[arg(long)]
        back: bool,
    },
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref()).context("Failed to load config")?;
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        if let Some(path) = &self.session_file {
            config.session_file = path.clone();
        }
        Ok(config)
    }
}

fn build_backend(config: &Config) -> Result<Arc<dyn TaskBackend>> {
    let users = UserStore::new(data::seed_users());
    let backend: Arc<dyn TaskBackend> = match (config.backend, &config.tasks_file) {
        (BackendKind::Remote, _) => Arc::new(RemoteBackend::connect(config.api_url.clone())?),
        (BackendKind::Local, Some(path)) => Arc::new(
            LocalBackend::with_tasks_file(users, data::seed_tasks(), path.clone())
                .context("Failed to open tasks file")?,
        ),
        (BackendKind::Local, None) => {
            Arc::new(LocalBackend::new(users, TaskBoard::new(data::seed_tasks())))
        }
    };
    Ok(backend)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;

    match cli.command.unwrap_or(Commands::Ui) {
        Commands::Ui => {
            let _guard = logging::init_file(&config.log_file, cli.verbose)?;
            run_ui(&config).await
        }
        Commands::Serve { addr } => {
            logging::init_stderr(cli.verbose);
            serve(addr).await
        }
        Commands::Session(command) => {
            logging::init_stderr(cli.verbose);
            run_command(&config, command).await
        }
    }
}

async fn run_ui(config: &Config) -> Result<()> {
    let backend = build_backend(config)?;
    let session = SessionStorage::open(&config.session_file)?;
    let mut app = App::new(backend, session, config.app_version.clone()).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result.context("Terminal UI failed")
}

async fn serve(addr: SocketAddr) -> Result<()> {
    let mut server = MockServer::new(
        UserStore::new(data::seed_users()),
        TaskBoard::new(data::seed_tasks()),
    );
    let url = server.start(addr).await?;
    println!("Serving task API at {url} (Ctrl-C to stop)");
    tokio::signal::ctrl_c().await?;
    server.stop();
    Ok(())
}

async fn run_command(config: &Config, command: SessionCommands) -> Result<()> {
    let backend = build_backend(config)?;
    let mut session = SessionStorage::open(&config.session_file)?;

    match command {
        SessionCommands::Login { email, password } => {
            let flow = LoginFlow::new(backend);
            match flow.login(&mut session, &Credentials::new(email, password)).await? {
                Some(user) => println!("{} logged in", user.user_name),
                None => bail!("No user matches those credentials"),
            }
        }
        SessionCommands::Logout => {
            LoginFlow::logout(&mut session)?;
            println!("Logged out");
        }
        SessionCommands::Whoami => match session.user() {
            Some(user) => println!("{} <{}>", user.user_name, user.email),
            None => println!("Not logged in (session {})", session.path().display()),
        },
        SessionCommands::Tasks { command } => {
            let mut view = TasksView::open(backend, &session)
                .await
                .context("Log in first with `taskboard login`")?;
            run_task_command(&mut view, command).await?;
        }
    }
    Ok(())
}

async fn run_task_command(view: &mut TasksView, command: TaskCommands) -> Result<()> {
    match command {
        TaskCommands::List { status } => {
            let tasks = match status {
                Some(status) => view.tasks_by_status(status),
                None => view.table_data().iter().collect(),
            };
            for task in tasks {
                println!(
                    "[#{}] {:<6} {} - {} (added {}, updated {})",
                    task.task_id,
                    task.status,
                    task.name,
                    task.description,
                    task.added.format("%Y-%m-%d %H:%M"),
                    task.updated.format("%Y-%m-%d %H:%M"),
                );
            }
        }
        TaskCommands::Show { task_id } => {
            let task = view
                .find(task_id)
                .with_context(|| format!("Task {task_id} not found"))?;
            for row in row_values(task, "task")? {
                println!("{}: {}", row.key, row.value);
            }
        }
        TaskCommands::Add {
            name,
            description,
            status,
        } => {
            let mut form = view.add_form();
            form.values.name = name;
            form.values.description = description;
            form.values.status = status;
            report(view.submit(&form).await?, "Task added")?;
        }
        TaskCommands::Edit {
            task_id,
            name,
            description,
            status,
        } => {
            let mut form = view.edit_form(task_id)?;
            if let Some(name) = name {
                form.values.name = name;
            }
            if let Some(description) = description {
                form.values.description = description;
            }
            if let Some(status) = status {
                form.values.status = status;
            }
            report(view.submit(&form).await?, "Task updated")?;
        }
        TaskCommands::Delete { task_id } => {
            report(view.delete(task_id).await?, "Task deleted")?;
        }
        TaskCommands::Move { task_id, back } => {
            let direction = if back { -1 } else { 1 };
            report(view.move_task(task_id, direction).await?, "Task moved")?;
            if let Some(task) = view.find(task_id) {
                println!("#{} is now {}", task.task_id, task.status);
            }
        }
    }
    Ok(())
}

fn report(changed: bool, message: &str) -> Result<()> {
    if !changed {
        bail!("The backend made no change");
    }
    println!("{message}");
    Ok(())
}
