// crates/blockcli/src/main.rs

use anyhow::{Context, Result};
use blockcore::{BlockDescription, BlockEvent, ExecutionEvent, WorkflowDescription};
use blockruntime::{BlockRuntime, RuntimeConfig, WorkerCommand};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blockflow")]
#[command(about = "Block workflow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Write the annotated run report (JSON) here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Runtime configuration (JSON); flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory that file properties are relative to
        #[arg(long)]
        data_root: Option<PathBuf>,

        /// Directory for external worker request/response files
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Seconds before a worker process is killed
        #[arg(long)]
        worker_timeout: Option<u64>,

        /// Run external blocks in-process instead of in a worker
        #[arg(long)]
        in_process: bool,

        /// Stop starting blocks after the first failure
        #[arg(long)]
        cancel_on_failure: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List available block types
    Blocks {
        /// Only blocks declared by this module
        #[arg(short, long)]
        module: Option<String>,

        /// Print the designer catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },

    /// Run one block out of process (invoked by the engine)
    Worker {
        request: PathBuf,
        response: PathBuf,
        block_type: String,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            output,
            config,
            data_root,
            work_dir,
            worker_timeout,
            in_process,
            cancel_on_failure,
            verbose,
        } => {
            init_tracing(verbose);

            let mut config = match config {
                Some(path) => RuntimeConfig::from_file(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => RuntimeConfig::default(),
            };
            if let Some(data_root) = data_root {
                config.data_root = data_root;
            }
            if let Some(work_dir) = work_dir {
                config.work_dir = work_dir;
            }
            if let Some(secs) = worker_timeout {
                config.worker_timeout_secs = secs;
            }
            config.cancel_on_failure |= cancel_on_failure;
            if in_process {
                config.worker = None;
            } else if config.worker.is_none() {
                let exe = std::env::current_exe().context("locating blockflow executable")?;
                config.worker = Some(WorkerCommand::new(exe).arg("worker"));
            }

            run_workflow(file, output, config).await?;
        }

        Commands::Validate { file } => {
            init_tracing(false);
            validate_workflow(file)?;
        }

        Commands::Blocks { module, json } => {
            list_blocks(module, json)?;
        }

        Commands::Init { output } => {
            create_example_workflow(output)?;
        }

        Commands::Worker {
            request,
            response,
            block_type,
        } => {
            init_tracing(false);
            let registry = Arc::new(blocknodes::standard_registry());
            blockruntime::run_worker(registry, &request, &response, &block_type)
                .await
                .with_context(|| format!("worker failed for block type {}", block_type))?;
        }
    }

    Ok(())
}

fn load_workflow(file: &Path) -> Result<WorkflowDescription> {
    let workflow_json = std::fs::read_to_string(file)
        .with_context(|| format!("reading workflow {}", file.display()))?;
    let workflow: WorkflowDescription = serde_json::from_str(&workflow_json)
        .with_context(|| format!("parsing workflow {}", file.display()))?;
    Ok(workflow)
}

async fn run_workflow(file: PathBuf, output: Option<PathBuf>, config: RuntimeConfig) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let workflow = load_workflow(&file)?;

    println!("📋 Workflow: {}", workflow.name);
    println!("   Blocks: {}", workflow.blocks.len());
    println!("   Edges: {}", workflow.edges.len());
    println!();

    tracing::debug!("Runtime config: {:?}", config);
    let runtime = BlockRuntime::with_registry(Arc::new(blocknodes::standard_registry()), config);

    // Subscribe to events for real-time output
    let mut events = runtime.subscribe_events();

    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::RunStarted { block_count, .. } => {
                    println!("▶️  Workflow started ({} blocks)", block_count);
                }
                ExecutionEvent::BlockStarted {
                    block_id,
                    block_type,
                    external,
                    ..
                } => {
                    let mode = if external { "worker" } else { "native" };
                    println!("  ⚡ Starting block {}: {} [{}]", block_id, block_type, mode);
                }
                ExecutionEvent::BlockCompleted {
                    block_id,
                    duration_ms,
                    ..
                } => {
                    println!("  ✅ Block {} completed in {}ms", block_id, duration_ms);
                }
                ExecutionEvent::BlockFailed {
                    block_id,
                    block_type,
                    error,
                    ..
                } => {
                    println!("  ❌ Block {} ({}) failed: {}", block_id, block_type, error);
                }
                ExecutionEvent::BlockEvent {
                    block_id, event, ..
                } => match event {
                    BlockEvent::Info { message } => {
                        println!("     ℹ️  [{}] {}", block_id, message);
                    }
                    BlockEvent::Warning { message } => {
                        println!("     ⚠️  [{}] {}", block_id, message);
                    }
                    BlockEvent::Progress { percent, message } => match message {
                        Some(msg) => println!("     📊 [{}] {}% - {}", block_id, percent, msg),
                        None => println!("     📊 [{}] {}%", block_id, percent),
                    },
                    BlockEvent::Data { .. } => {}
                },
                ExecutionEvent::RunCompleted {
                    success,
                    duration_ms,
                    ..
                } => {
                    if success {
                        println!("✨ Workflow completed successfully in {}ms", duration_ms);
                    } else {
                        println!("💥 Workflow failed after {}ms", duration_ms);
                    }
                }
            }
        }
    });

    let outcome = runtime.execute(&workflow).await?;

    // Blocks on other branches may still be running after a failure.
    let report = outcome.drain().await;

    // Wait for events to finish printing
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    println!();
    println!("📊 Execution Summary:");
    println!("   Execution ID: {}", report.execution_id);
    println!("   Status: {:?}", report.status);
    for block in &report.blocks {
        println!("   Block {} ({}): {:?}", block.id, block.block_type, block.state);
        for (port, value) in &block.outputs {
            println!("     {}: {:?}", port, value);
        }
        if let Some(error) = &block.error {
            println!("     error: {}", error);
        }
    }

    if let Some(output) = output {
        std::fs::write(&output, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing report {}", output.display()))?;
        println!();
        println!("📝 Report written to {}", output.display());
    }

    if !report.is_success() {
        let failed: Vec<String> = report.failed_blocks().map(|b| b.id.to_string()).collect();
        anyhow::bail!("workflow failed (blocks: {})", failed.join(", "));
    }

    Ok(())
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow = load_workflow(&file)?;
    let runtime = BlockRuntime::with_registry(
        Arc::new(blocknodes::standard_registry()),
        RuntimeConfig::default(),
    );
    let graph = runtime.build(&workflow)?;

    let entry: Vec<String> = graph.entry_nodes().iter().map(|id| id.to_string()).collect();

    println!("✅ Workflow is valid:");
    println!("   Name: {}", workflow.name);
    println!("   Blocks: {}", graph.len());
    println!("   Edges: {}", workflow.edges.len());
    println!("   Entry blocks: {}", entry.join(", "));

    Ok(())
}

fn list_blocks(module: Option<String>, json: bool) -> Result<()> {
    let registry = blocknodes::standard_registry();
    let catalog = registry.catalog(module.as_deref());

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    println!("📦 Available Block Types:");
    println!();

    for entry in catalog {
        println!("  • {} ({}, module {})", entry.name, entry.family, entry.module);
        println!("    {}", entry.description);
        for field in entry.fields {
            println!("      {:?} {}: {}", field.role, field.name, field.value_type);
        }
    }

    Ok(())
}

fn create_example_workflow(output: PathBuf) -> Result<()> {
    let mut workflow = WorkflowDescription::new("Example Arithmetic Workflow");
    workflow.description = Some("Increments a constant twice, doubles it in a worker and logs the sum".to_string());

    let start = workflow.add_block(BlockDescription::new(1, "math.constant").with_value("value", 5));
    let first = workflow.add_block(BlockDescription::new(2, "math.increment"));
    let second = workflow.add_block(BlockDescription::new(3, "math.increment").with_value("step", "1"));
    let doubled = workflow.add_block(BlockDescription::new(4, "math.multiply").with_value("factor", 2));
    let sum = workflow.add_block(BlockDescription::new(5, "math.sum"));
    let log = workflow.add_block(BlockDescription::new(6, "debug.log").with_value("label", "total"));

    workflow.connect(start, "value", first, "value");
    workflow.connect(first, "value", second, "value");
    workflow.connect(start, "value", doubled, "value");
    workflow.connect(second, "value", sum, "values");
    workflow.connect(doubled, "value", sum, "values");
    workflow.connect(sum, "sum", log, "value");

    let json = serde_json::to_string_pretty(&workflow)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  blockflow run --file {}", output.display());

    Ok(())
}
