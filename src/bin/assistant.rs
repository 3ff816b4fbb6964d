//! Command-line entry point.
//!
//! One-shot mode with `--task`, otherwise an interactive prompt loop.

use anyhow::Context;
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use ops_assistant::{Assistant, AssistantConfig, TaskOutcome};

#[derive(Parser, Debug)]
#[command(name = "assistant", about = "AI operations assistant", version)]
struct Args {
    /// Run a single task and exit.
    #[arg(long)]
    task: Option<String>,

    /// Optional TOML config file; environment variables override it.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ops_assistant=info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AssistantConfig::load(path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => AssistantConfig::from_env(),
    };
    let assistant = Assistant::from_config(&config).context("failed to initialize assistant")?;

    match args.task {
        Some(task) => {
            let outcome = assistant.process_task(&task).await;
            print_outcome(&outcome);
            if !outcome.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        None => interactive(&assistant).await,
    }
}

async fn interactive(assistant: &Assistant) -> anyhow::Result<()> {
    println!("AI Operations Assistant — type a task, or 'quit' to exit.");
    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("task> ") {
            Ok(line) => {
                let task = line.trim();
                if task.is_empty() {
                    continue;
                }
                if matches!(task, "quit" | "exit" | "q") {
                    break;
                }
                let _ = editor.add_history_entry(task);
                let outcome = assistant.process_task(task).await;
                print_outcome(&outcome);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn print_outcome(outcome: &TaskOutcome) {
    if let TaskOutcome::Completed { response, metadata } = outcome {
        println!("\n{response}\n");
        println!("{}", metadata.execution_summary);
        return;
    }
    if let Some(message) = outcome.failure_message() {
        eprintln!("\n{message}");
    }
    if let TaskOutcome::Rejected {
        issues,
        partial_results,
        needs_retry,
    } = outcome
    {
        for issue in issues {
            eprintln!("- {issue}");
        }
        if let Some(partial) = partial_results {
            eprintln!("({} step(s) did succeed)", partial.len());
        }
        if *needs_retry {
            eprintln!("The task may succeed if retried.");
        }
    }
}
