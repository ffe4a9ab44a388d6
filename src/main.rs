use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use gigacommit::cli_args::Cli;
use gigacommit::config::Config;
use gigacommit::git::{self, GitCli};
use gigacommit::logging::init_logger;
use gigacommit::session::SessionState;
use gigacommit::setup::build_backend;
use gigacommit::suggest::{Outcome, Suggester};
use gigacommit::terminal::Terminal;
use gigacommit::vcs::Vcs;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let cfg = Config::from_sources(&cli)?;
    let backend = build_backend(&cfg)?;
    let work_dir = std::env::current_dir().context("failed to read the current directory")?;

    let terminal = Arc::new(Terminal::new());
    let vcs = GitCli::locate(&work_dir, terminal.clone()).map(|g| Arc::new(g) as Arc<dyn Vcs>);
    let suggester = Arc::new(Suggester::new(
        cfg.suggest_settings(),
        backend,
        vcs,
        terminal.clone(),
    ));

    // Ctrl-C is the "invoke again" gesture: it offers to cancel the running request.
    let interrupts = {
        let suggester = Arc::clone(&suggester);
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if suggester.state() == SessionState::Idle {
                    std::process::exit(130);
                }
                suggester.invoke().await;
            }
        })
    };

    let outcome = suggester.invoke().await;
    interrupts.abort();
    terminal.finish();

    let code = match outcome {
        Outcome::Suggested(message) => {
            println!();
            if cfg.apply {
                let path = git::write_commit_editmsg(&work_dir, &message).await?;
                eprintln!("Commit message written to {}", path.display());
            }
            0
        }
        Outcome::Cancelled => 130,
        Outcome::Failed(_) => 1,
        Outcome::Busy { .. } => 0,
    };

    // A pending confirmation prompt must not keep the process alive.
    std::process::exit(code);
}
