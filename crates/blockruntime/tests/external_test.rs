// crates/blockruntime/tests/external_test.rs
#![cfg(unix)]

mod common;

use blockcore::{BlockDescription, Value, WorkflowDescription};
use blockruntime::{BlockState, RunReport, RuntimeConfig, WorkerCommand};
use common::{runtime_with, source};
use tempfile::TempDir;

/// `source(21) -> external_double`
fn external_workflow() -> WorkflowDescription {
    let mut workflow = WorkflowDescription::new("external");
    workflow.add_block(source(1, 21));
    workflow.add_block(BlockDescription::new(2, "test.external_double"));
    workflow.connect(1, "value", 2, "value");
    workflow
}

fn config(worker: WorkerCommand, work_dir: &TempDir, timeout_secs: u64) -> RuntimeConfig {
    RuntimeConfig {
        worker: Some(worker),
        work_dir: work_dir.path().to_path_buf(),
        worker_timeout_secs: timeout_secs,
        ..RuntimeConfig::default()
    }
}

async fn run(worker: WorkerCommand, timeout_secs: u64) -> (RunReport, TempDir) {
    let work_dir = TempDir::new().unwrap();
    let runtime = runtime_with(config(worker, &work_dir, timeout_secs));
    let outcome = runtime.execute(&external_workflow()).await.unwrap();
    (outcome.drain().await, work_dir)
}

fn sh(script: &str) -> WorkerCommand {
    // `sh -c script sh req resp type` binds $1..$3
    WorkerCommand::new("sh").arg("-c").arg(script).arg("sh")
}

#[tokio::test]
async fn test_without_worker_external_blocks_run_in_process() {
    let runtime = runtime_with(RuntimeConfig::default());
    let outcome = runtime.execute(&external_workflow()).await.unwrap();

    assert!(outcome.is_success());
    let report = outcome.report();
    assert_eq!(report.block(2).unwrap().outputs["value"], Value::Integer(42));
}

#[tokio::test]
async fn test_worker_nonzero_exit_fails_block() {
    let (report, _dir) = run(sh("echo starting; echo broken >&2; exit 3"), 30).await;

    let block = report.block(2).unwrap();
    assert_eq!(block.state, BlockState::Failed);
    assert!(block.error.as_deref().unwrap().contains("code 3"));
    assert_eq!(block.stdout.trim(), "starting");
    assert_eq!(block.stderr.trim(), "broken");

    // Upstream is unaffected
    assert_eq!(report.block(1).unwrap().state, BlockState::Done);
}

#[tokio::test]
async fn test_worker_without_response_fails_block() {
    let (report, _dir) = run(sh("exit 0"), 30).await;

    let block = report.block(2).unwrap();
    assert_eq!(block.state, BlockState::Failed);
    assert!(block.error.as_deref().unwrap().contains("no response"));
}

#[tokio::test]
async fn test_worker_garbage_response_fails_block() {
    let (report, _dir) = run(sh("echo 'not json' > \"$2\""), 30).await;

    let block = report.block(2).unwrap();
    assert_eq!(block.state, BlockState::Failed);
    assert!(block.error.as_deref().unwrap().contains("unreadable response"));
}

#[tokio::test]
async fn test_worker_timeout_kills_process() {
    let start = std::time::Instant::now();
    let (report, _dir) = run(sh("sleep 10"), 1).await;

    assert!(start.elapsed() < std::time::Duration::from_secs(5));
    let block = report.block(2).unwrap();
    assert_eq!(block.state, BlockState::Failed);
    assert!(block.error.as_deref().unwrap().contains("timeout"));
}

#[tokio::test]
async fn test_worker_missing_program_fails_block() {
    let (report, _dir) = run(WorkerCommand::new("/nonexistent/blockflow-worker"), 30).await;

    let block = report.block(2).unwrap();
    assert_eq!(block.state, BlockState::Failed);
    assert!(block.error.as_deref().unwrap().contains("spawn"));
}

#[tokio::test]
async fn test_worker_echo_round_trips_request() {
    // Copying the request back as the response yields no outputs
    let (report, work_dir) = run(sh("test \"$3\" = test.external_double && cp \"$1\" \"$2\""), 30).await;

    let block = report.block(2).unwrap();
    assert_eq!(block.state, BlockState::Done, "error: {:?}", block.error);
    assert!(block.outputs.is_empty());
    assert_eq!(block.result, Some(Value::Null));

    // Request and response files are cleaned up
    let leftovers = std::fs::read_dir(work_dir.path()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_worker_response_supplies_outputs() {
    let script = r#"printf '%s' '{"blockType":"test.external_double","outputs":{"value":{"type":"Integer","value":99}},"computedResult":{"type":"Integer","value":99}}' > "$2""#;
    let (report, _dir) = run(sh(script), 30).await;

    let block = report.block(2).unwrap();
    assert_eq!(block.state, BlockState::Done, "error: {:?}", block.error);
    assert_eq!(block.outputs["value"], Value::Integer(99));
    assert_eq!(block.result, Some(Value::Integer(99)));
}
