//! # taskchat CLI
//!
//! Usage:
//!   taskchat                         interactive chat (same as `taskchat chat`)
//!   taskchat run [--jobs N] <TASK>...
//!   taskchat datasets
//!   taskchat download [DATASET]
//!   taskchat files [DIR]
//!
//! Examples:
//!   OPENAI_API_KEY=sk-... taskchat
//!   taskchat run "echo hello" "false" "echo world"
//!   taskchat run --jobs 4 --json "ls -l" "uname -a"
//!   taskchat download 1

mod logging;

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use taskchat_agent::ChatLoop;
use taskchat_core::{
    catalog, list_data_files, resolve, run_parallel, KaggleClient, KaggleCredentials,
    OpenAIProvider, Result, Settings, SystemLauncher, TaskResult, TaskRunner,
};
use tracing::warn;

#[derive(Parser)]
#[command(name = "taskchat")]
#[command(author, version, about = "taskchat - chat with a model, run shell tasks")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (the default)
    Chat,
    /// Run shell tasks one after another and print each result
    Run {
        /// Task lines, one per argument
        #[arg(required = true)]
        tasks: Vec<String>,

        /// Run up to N tasks at once (results keep submission order)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Print results as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// List the built-in dataset catalog
    Datasets,
    /// Download and unpack a dataset into the data directory
    Download {
        /// Catalog number or `owner/dataset`; asked for when omitted
        dataset: Option<String>,
    },
    /// List files in the data directory
    Files {
        /// Directory to list (defaults to the configured data directory)
        dir: Option<PathBuf>,
    },
}

async fn chat(settings: &Settings) -> Result<()> {
    if settings.uses_placeholder_key() {
        warn!("OPENAI_API_KEY is not set; requests will be rejected by the API");
    }
    let provider = OpenAIProvider::new(settings.provider_config())?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    ChatLoop::new(&provider).run(stdin.lock(), stdout.lock()).await?;
    Ok(())
}

fn print_result(result: &TaskResult) {
    println!("$ {}  [exit {}]", result.task(), result.returncode());
    print!("{}", result.stdout());
    if !result.stderr().is_empty() {
        eprint!("{}", result.stderr());
    }
}

/// Keep every finished result; report the first failure in submission order.
fn split_outcomes(outcomes: Vec<Result<TaskResult>>) -> (Vec<TaskResult>, Result<()>) {
    let mut results = Vec::with_capacity(outcomes.len());
    let mut first_error = None;
    for outcome in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    (results, first_error.map_or(Ok(()), Err))
}

async fn run_tasks(tasks: &[String], jobs: Option<usize>, json: bool) -> Result<()> {
    let (results, outcome) = match jobs {
        Some(workers) => {
            let outcomes = run_parallel(Arc::new(SystemLauncher::new()), tasks, workers).await?;
            split_outcomes(outcomes)
        }
        None => {
            let mut runner = TaskRunner::system();
            let outcome = runner.run_all(tasks).map(|_| ());
            (runner.into_results(), outcome)
        }
    };

    if json {
        let rendered = serde_json::to_string_pretty(&results).map_err(|e| {
            taskchat_core::Error::unexpected(format!("failed to encode results: {}", e))
                .with_operation("cli::run")
                .set_source(e)
        })?;
        println!("{}", rendered);
    } else {
        for result in &results {
            print_result(result);
        }
    }
    outcome
}

fn show_catalog() {
    println!("Available datasets:");
    for entry in catalog() {
        println!("  {}. {} - {}", entry.key, entry.name, entry.description);
    }
}

fn ask_for_dataset() -> Result<String> {
    show_catalog();
    print!("Enter a number or 'owner/dataset': ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn download(settings: &Settings, dataset: Option<String>) -> Result<()> {
    let choice = match dataset {
        Some(d) => d,
        None => ask_for_dataset()?,
    };
    let name = resolve(&choice)?;
    let client = KaggleClient::new(KaggleCredentials::discover()?);

    println!("Downloading {} into {} ...", name, settings.data_dir.display());
    let extracted = client.download(&name, &settings.data_dir).await?;
    println!("Extracted {} files", extracted.len());
    show_files(&settings.data_dir)
}

fn show_files(dir: &std::path::Path) -> Result<()> {
    let files = list_data_files(dir)?;
    if files.is_empty() {
        println!("No files in {}", dir.display());
        return Ok(());
    }
    println!("Files in {}:", dir.display());
    for file in files {
        println!("  {:>12}  {}", file.size_bytes, file.name);
    }
    Ok(())
}

async fn dispatch(cli: Cli, settings: Settings) -> Result<()> {
    match cli.command {
        None | Some(Commands::Chat) => chat(&settings).await,
        Some(Commands::Run { tasks, jobs, json }) => run_tasks(&tasks, jobs, json).await,
        Some(Commands::Datasets) => {
            show_catalog();
            Ok(())
        }
        Some(Commands::Download { dataset }) => download(&settings, dataset).await,
        Some(Commands::Files { dir }) => show_files(dir.as_deref().unwrap_or(&settings.data_dir)),
    }
}

#[tokio::main]
async fn main() {
    logging::init();
    let cli = Cli::parse();
    let settings = Settings::from_env();

    if let Err(e) = dispatch(cli, settings).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_arguments_means_chat() {
        let cli = Cli::try_parse_from(["taskchat"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from(["taskchat", "run", "-j", "2", "echo hi", "false"]).unwrap();
        match cli.command {
            Some(Commands::Run { tasks, jobs, json }) => {
                assert_eq!(tasks, vec!["echo hi", "false"]);
                assert_eq!(jobs, Some(2));
                assert!(!json);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_requires_a_task() {
        assert!(Cli::try_parse_from(["taskchat", "run"]).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_reports_spawn_failure() {
        let tasks = vec!["echo ok".to_string(), "definitely-not-a-program-xyz".to_string()];
        for jobs in [None, Some(2)] {
            let err = run_tasks(&tasks, jobs, true).await.unwrap_err();
            assert_eq!(err.kind(), taskchat_core::ErrorKind::SpawnFailed);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_parallel_outcomes_keep_finished_results() {
        let tasks = ["echo a", "definitely-not-a-program-xyz", "echo b"];
        let outcomes = run_parallel(Arc::new(SystemLauncher::new()), &tasks, 2)
            .await
            .unwrap();

        let (results, outcome) = split_outcomes(outcomes);
        let stdout: Vec<&str> = results.iter().map(|r| r.stdout()).collect();
        assert_eq!(stdout, vec!["a\n", "b\n"]);
        let err = outcome.unwrap_err();
        assert_eq!(err.kind(), taskchat_core::ErrorKind::SpawnFailed);
        assert_eq!(err.context_value("index"), Some("1"));
    }
}
