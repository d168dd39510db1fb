use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use wizard_flow::cli::{CliHost, Command, HELP, parse_command};
use wizard_flow::config::EngineConfig;
use wizard_flow::error::Error;
use wizard_flow::flow::{AdvanceOutcome, Draft, FlowHost, FlowManager};
use wizard_flow::store::{InMemoryRunStore, LibSqlRunStore, RunStore};
use wizard_flow::submit::{HttpSubmitter, InMemorySubmitter, Submitter};
use wizard_flow::wizards;

/// The run being driven plus the values staged for its current step.
#[derive(Default)]
struct Session {
    run_id: Option<Uuid>,
    staged: Draft,
}

impl Session {
    fn run_id(&self) -> anyhow::Result<Uuid> {
        self.run_id
            .context("no active run; `start <flow>` or `resume <run_id>` first")
    }

    fn switch_to(&mut self, run_id: Option<Uuid>) {
        self.run_id = run_id;
        self.staged = Draft::new();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = EngineConfig::from_env()?;

    let store: Arc<dyn RunStore> = match &config.db_path {
        Some(path) => Arc::new(
            LibSqlRunStore::new_local(path)
                .await
                .with_context(|| format!("failed to open run store at {}", path.display()))?,
        ),
        None => Arc::new(InMemoryRunStore::new()),
    };
    let submitter: Arc<dyn Submitter> = match &config.submit_url {
        Some(url) => Arc::new(HttpSubmitter::new(url.clone(), config.submit_timeout)?),
        None => Arc::new(InMemorySubmitter::new()),
    };
    let manager = FlowManager::new(wizards::default_registry()?, store, submitter);

    eprintln!("wizard-cli v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Store: {}",
        config
            .db_path
            .as_ref()
            .map_or("in-memory".to_string(), |p| p.display().to_string())
    );
    eprintln!(
        "   Submit: {}",
        config.submit_url.as_deref().unwrap_or("local (not sent)")
    );
    eprintln!("   Type `help` for commands.\n");

    let mut host = CliHost::new();
    let mut session = Session::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprint!("> ");
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => {
                if let Err(e) = execute(&manager, &mut host, &mut session, command).await {
                    eprintln!("error: {e:#}");
                    if e.downcast_ref::<Error>().is_some_and(Error::is_retryable) {
                        eprintln!("   (temporary failure, try the same command again)");
                    }
                }
            }
            Ok(None) => {}
            Err(usage) => eprintln!("{usage}"),
        }
        eprint!("> ");
    }

    if let Some(run_id) = session.run_id {
        eprintln!("\nSaving run {run_id} before exit...");
        match manager.save_and_exit(run_id).await {
            Ok(_) => eprintln!("Saved. `resume {run_id}` to continue."),
            Err(e) => eprintln!("Could not save: {e}"),
        }
    }
    Ok(())
}

async fn execute(
    manager: &FlowManager,
    host: &mut CliHost,
    session: &mut Session,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Help => println!("{HELP}"),
        Command::Flows => {
            for id in manager.registry().ids() {
                println!("  {id}");
            }
        }
        Command::Start(flow_id) => {
            let view = manager.start(&flow_id).await?;
            session.switch_to(Some(view.run_id));
            eprintln!("run {}", view.run_id);
            host.render(&view);
        }
        Command::Set { field, value } => {
            session.run_id()?;
            session.staged = session.staged.merge(&Draft::new().with(field, value));
        }
        Command::Next => {
            let run_id = session.run_id()?;
            let outcome = manager.advance(run_id, &session.staged).await?;
            if !matches!(outcome, AdvanceOutcome::Rejected { .. }) {
                session.staged = Draft::new();
            }
            host.present(&outcome);
        }
        Command::Back => {
            let view = manager.retreat(session.run_id()?).await?;
            session.staged = Draft::new();
            host.render(&view);
        }
        Command::Jump(step) => {
            let view = manager.jump_to(session.run_id()?, &step).await?;
            session.staged = Draft::new();
            host.render(&view);
        }
        Command::Reset(fields) => {
            let view = manager.reset(session.run_id()?, &fields).await?;
            session.staged = session.staged.reset(&fields);
            host.render(&view);
        }
        Command::Show => {
            let view = manager.view(session.run_id()?).await?;
            host.render(&view);
        }
        Command::Save => {
            let run_id = session.run_id()?;
            manager.save_and_exit(run_id).await?;
            session.switch_to(None);
            println!("Saved. `resume {run_id}` to continue.");
        }
        Command::Suspended => {
            for run in manager.list_suspended(None).await? {
                println!(
                    "  {}  {} at {} ({})",
                    run.run_id,
                    run.flow_id,
                    run.current_step,
                    run.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Resume(raw) => {
            let run_id = Uuid::parse_str(&raw).with_context(|| format!("invalid run id: {raw}"))?;
            let view = manager.resume(run_id).await?;
            session.switch_to(Some(run_id));
            host.render(&view);
        }
        Command::Submit => {
            let run_id = session.run_id()?;
            let id = manager.submit(run_id).await?;
            session.switch_to(None);
            println!("Submitted as {id}.");
        }
        Command::Discard(raw) => {
            let run_id = match raw {
                Some(raw) => {
                    Uuid::parse_str(&raw).with_context(|| format!("invalid run id: {raw}"))?
                }
                None => session.run_id()?,
            };
            manager.discard(run_id).await?;
            if session.run_id == Some(run_id) {
                session.switch_to(None);
            }
            println!("Discarded run {run_id}.");
        }
        Command::Quit => {}
    }
    Ok(())
}
