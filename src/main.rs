mod apply;
mod config;
mod editor;
mod flow;
mod github;
mod protection;
mod report;
mod templates;
mod tui;

use clap::Parser;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use flow::{Controller, StartMode};

/// branch-guard — review GitHub branch protection, edit it, preview the
/// change and roll it out to several repositories at once.
#[derive(Parser, Debug)]
#[command(name = "branch-guard", version, about)]
struct Cli {
    /// Start from the repository in the current directory (its `origin` remote)
    #[arg(long)]
    local: bool,

    /// Write the session's apply results as markdown instead of printing them
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::Config::load()?;
    init_logging(&config.log_file());

    let _main_span = info_span!("session", local = cli.local).entered();
    info!("starting branch-guard");

    let github = Arc::new(github::GitHubClient::new(&config)?);
    let templates = Arc::new(templates::FileTemplateStore::new(config.templates_dir()));
    debug!(dir = %templates.dir().display(), "using template directory");

    let mode = if cli.local {
        StartMode::Local(github::detect_local_repository().await)
    } else {
        StartMode::Browse
    };
    let mut controller = Controller::new(github, templates);
    let start = controller.start(mode);

    let mut terminal = ratatui::init();
    let result = tui::run(&mut terminal, &mut controller, start, config.editor.wrap_focus).await;
    ratatui::restore();
    result?;

    info!(results = controller.session_results().len(), "session finished");
    report::output(controller.session_results(), cli.report.as_deref())?;
    Ok(())
}

/// The terminal belongs to the UI, so logs go to a file. When the file
/// cannot be opened they are dropped.
fn init_logging(path: &Path) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_ansi(false);
    match open_log_file(path) {
        Ok(file) => builder.with_writer(Mutex::new(file)).init(),
        Err(_) => builder.with_writer(std::io::sink).init(),
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
