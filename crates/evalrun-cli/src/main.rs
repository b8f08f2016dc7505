//! evalrun CLI - run browser automation evals from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use evalrun_core::{AvailableModel, EvalCategory};
use evalrun_driver::BridgeLauncher;
use evalrun_tasks::{
    all, lookup, tasks_with_tag, EvalRunner, EvalSummary, TaskDefinition, DEFAULT_CONCURRENCY,
};

/// evalrun CLI - Browser automation eval runner
#[derive(Parser)]
#[command(name = "evalrun")]
#[command(about = "Run browser automation evals", long_about = None)]
struct Cli {
    /// Command line that starts the automation bridge
    #[arg(long, env = "EVALRUN_BRIDGE", default_value = "node bridge/index.js")]
    bridge: String,

    /// Maximum log level
    #[arg(long, env = "EVALRUN_LOG_LEVEL", default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered tasks
    List {
        /// Only tasks with this category
        #[arg(short, long)]
        tag: Option<EvalCategory>,
    },

    /// Run tasks and score them
    Run {
        /// Task names to run
        names: Vec<String>,

        /// Run every registered task
        #[arg(long, conflicts_with = "names")]
        all: bool,

        /// Run every task with this category
        #[arg(short, long, conflicts_with_all = ["names", "all"])]
        tag: Option<EvalCategory>,

        /// Model to evaluate; repeat for several
        #[arg(short, long = "model")]
        models: Vec<AvailableModel>,

        /// Testcases run at once
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,

        /// Extract from page text instead of the DOM
        #[arg(long)]
        text_extract: bool,

        /// Observe through the accessibility tree
        #[arg(long)]
        accessibility_tree: bool,

        /// Run browsers headless
        #[arg(long)]
        headless: bool,

        /// Write the run summary as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::List { tag } => {
            list_tasks(tag);
        }
        Commands::Run {
            names,
            all,
            tag,
            models,
            concurrency,
            text_extract,
            accessibility_tree,
            headless,
            output,
        } => {
            let tasks = select_tasks(&names, all, tag)?;
            let launcher = BridgeLauncher::from_command_line(&cli.bridge)
                .ok_or("--bridge must name a program")?;

            let runner = EvalRunner::new(Arc::new(launcher))
                .with_models(models)
                .with_concurrency(concurrency)
                .with_text_extract(text_extract)
                .with_accessibility_tree(accessibility_tree)
                .with_headless(headless);

            let summary = runner.run(&tasks).await;
            print_summary(&summary);

            if let Some(path) = output {
                summary.write_json(&path).await?;
                println!("Summary written to {}", path.display());
            }
        }
    }

    Ok(())
}

/// Tasks named on the command line, or every task matching `--all`/`--tag`.
fn select_tasks(
    names: &[String],
    all_tasks: bool,
    tag: Option<EvalCategory>,
) -> Result<Vec<&'static TaskDefinition>, Box<dyn std::error::Error>> {
    let tasks = if all_tasks {
        all().iter().collect()
    } else if let Some(tag) = tag {
        tasks_with_tag(tag)
    } else {
        names
            .iter()
            .map(|name| lookup(name))
            .collect::<Result<Vec<_>, _>>()?
    };

    if tasks.is_empty() {
        return Err("no tasks selected; name tasks or pass --all or --tag".into());
    }
    Ok(tasks)
}

fn list_tasks(tag: Option<EvalCategory>) {
    let tasks = match tag {
        Some(tag) => tasks_with_tag(tag),
        None => all().iter().collect(),
    };

    println!("Tasks ({}):", tasks.len());
    println!("{:<28}  {:<24}  {}", "NAME", "TAGS", "START URL");
    println!("{}", "-".repeat(80));

    for task in tasks {
        let tags: Vec<&str> = task.tags.iter().map(|t| t.as_str()).collect();
        println!("{:<28}  {:<24}  {}", task.name, tags.join(", "), task.start_url);
    }
}

fn print_summary(summary: &EvalSummary) {
    println!("Run {}:", summary.run_id);
    println!("{:<40}  {:<6}  {:<12}  {:<10}  {}", "TESTCASE", "PASS", "EXACT MATCH", "ERROR RATE", "MS");
    println!("{}", "-".repeat(84));

    for outcome in &summary.results {
        let score = |name: &str| {
            outcome
                .scores
                .iter()
                .find(|s| s.name == name)
                .map(|s| format!("{:.0}", s.score))
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "{:<40}  {:<6}  {:<12}  {:<10}  {}",
            outcome.testcase.metadata.test,
            if outcome.passed() { "yes" } else { "no" },
            score("Exact match"),
            score("Error rate"),
            outcome.duration_ms
        );
    }

    println!();
    for (category, rate) in &summary.category_success {
        println!("  {:<16} {:>6.1}%", category.as_str(), rate * 100.0);
    }
    for (model, rate) in &summary.model_success {
        println!("  {:<16} {:>6.1}%", model, rate * 100.0);
    }
    println!(
        "Passed {}/{} ({:.1}%)",
        summary.passed(),
        summary.results.len(),
        summary.overall_success * 100.0
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_named_tasks() {
        let tasks = select_tasks(&["wikipedia".to_string(), "vanta".to_string()], false, None).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].name, "vanta");
    }

    #[test]
    fn test_select_unknown_task() {
        let err = select_tasks(&["no_such_task".to_string()], false, None).unwrap_err();
        assert!(err.to_string().contains("no_such_task"));
    }

    #[test]
    fn test_select_requires_something() {
        assert!(select_tasks(&[], false, None).is_err());
        assert_eq!(select_tasks(&[], true, None).unwrap().len(), all().len());
        assert!(select_tasks(&[], false, Some(EvalCategory::Extract))
            .unwrap()
            .iter()
            .all(|t| t.has_tag(EvalCategory::Extract)));
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "evalrun",
            "run",
            "--tag",
            "observe",
            "--model",
            "gpt-4o-mini",
            "--model",
            "claude-3-5-sonnet-latest",
            "--concurrency",
            "2",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                tag, models, concurrency, ..
            } => {
                assert_eq!(tag, Some(EvalCategory::Observe));
                assert_eq!(models, vec![AvailableModel::Gpt4oMini, AvailableModel::Claude35SonnetLatest]);
                assert_eq!(concurrency, 2);
            }
            Commands::List { .. } => panic!("expected run"),
        }
    }
}
