use crate::graph::{BlockInstance, WorkflowGraph};
use crate::registry::BlockRegistry;
use blockcore::{
    BlockContext, BlockError, BlockOutput, Cardinality, EventEmitter, ExternalExecutionRequest,
    ExternalExecutionResponse, Value, WorkerFailure,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Program (plus leading arguments) that runs one block out of process.
///
/// It is invoked as `program args.. <request> <response> <block-type>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerCommand {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Successful block execution plus whatever the block printed
#[derive(Debug, Clone)]
pub struct Execution {
    pub output: BlockOutput,
    pub stdout: String,
    pub stderr: String,
}

/// Runs the compute step of a single block
pub struct BlockExecutor {
    registry: Arc<BlockRegistry>,
    worker: Option<WorkerCommand>,
    work_dir: PathBuf,
    worker_timeout: Duration,
}

impl BlockExecutor {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self {
            registry,
            worker: None,
            work_dir: std::env::temp_dir(),
            worker_timeout: Duration::from_secs(300),
        }
    }

    /// Enable out-of-process execution for blocks whose schema asks for it
    pub fn with_worker(
        mut self,
        worker: WorkerCommand,
        work_dir: impl Into<PathBuf>,
        worker_timeout: Duration,
    ) -> Self {
        self.worker = Some(worker);
        self.work_dir = work_dir.into();
        self.worker_timeout = worker_timeout;
        self
    }

    /// Whether this block would be handed to the worker process
    pub fn runs_external(&self, node: &BlockInstance) -> bool {
        node.schema().external && self.worker.is_some()
    }

    /// Collect a block's inputs from its predecessors' outputs.
    ///
    /// List ports receive every bound value in edge declaration order;
    /// single ports receive their one bound value.
    pub fn gather_inputs(
        &self,
        graph: &WorkflowGraph,
        node: &BlockInstance,
    ) -> Result<HashMap<String, Value>, BlockError> {
        let mut inputs = HashMap::new();

        for (port, sources) in node.bindings() {
            let mut values = Vec::with_capacity(sources.len());
            for source in sources {
                let value = graph
                    .node(source.block_id)
                    .and_then(|n| n.output(&source.port))
                    .ok_or_else(|| BlockError::MissingSourceOutput {
                        block_id: source.block_id,
                        port: source.port.clone(),
                    })?;
                values.push(value.clone());
            }

            let cardinality = node
                .schema()
                .input_port(port)
                .map(|p| p.cardinality)
                .unwrap_or(Cardinality::Single);

            let value = match cardinality {
                Cardinality::List => Value::Array(values),
                Cardinality::Single => values.into_iter().next().unwrap_or(Value::Null),
            };
            inputs.insert(port.clone(), value);
        }

        Ok(inputs)
    }

    pub async fn run_node(
        &self,
        graph: &WorkflowGraph,
        node: &BlockInstance,
        events: EventEmitter,
        cancellation: CancellationToken,
    ) -> Result<Execution, BlockError> {
        let inputs = self.gather_inputs(graph, node)?;
        let properties = node.properties().clone();

        tracing::info!("Processing block {} ({})", node.id(), node.block_type());

        match &self.worker {
            Some(worker) if node.schema().external => {
                let request = ExternalExecutionRequest {
                    block_type: node.block_type().to_string(),
                    module: node.module().to_string(),
                    properties,
                    inputs,
                };
                self.run_external(node, worker, request, cancellation).await
            }
            _ => {
                if node.schema().external {
                    tracing::debug!(
                        "No worker configured, running external block {} in-process",
                        node.id()
                    );
                }
                let ctx = BlockContext {
                    block_id: node.id(),
                    block_type: node.block_type().to_string(),
                    properties,
                    inputs,
                    events,
                    cancellation,
                };
                self.run_in_process(ctx).await
            }
        }
    }

    /// Invoke the block's compute entry point on its own task, so a panic
    /// inside a block fails that block instead of the whole run.
    pub async fn run_in_process(&self, ctx: BlockContext) -> Result<Execution, BlockError> {
        let block = self
            .registry
            .create_block(&ctx.block_type)
            .map_err(|e| BlockError::Configuration(e.to_string()))?;

        tracing::debug!("Executing block {} ({}) natively", ctx.block_id, ctx.block_type);

        let start = Instant::now();
        let mut output = tokio::spawn(async move { block.compute(ctx).await })
            .await
            .map_err(|e| BlockError::compute(format!("block task aborted: {}", e)))??;
        output.metadata.execution_time_ms = start.elapsed().as_millis() as u64;

        Ok(Execution {
            output,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    async fn run_external(
        &self,
        node: &BlockInstance,
        worker: &WorkerCommand,
        request: ExternalExecutionRequest,
        cancellation: CancellationToken,
    ) -> Result<Execution, BlockError> {
        tracing::info!(
            "Executing block {} ({}) in worker {}",
            node.id(),
            node.block_type(),
            worker.program.display()
        );

        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| worker_failure(WorkerFailure::Io(e.to_string()), "", ""))?;

        let stem = format!("block_{}_{}", node.id(), Uuid::new_v4().simple());
        let request_path = self.work_dir.join(format!("{}.in.json", stem));
        let response_path = self.work_dir.join(format!("{}.out.json", stem));

        let payload = serde_json::to_vec(&request)
            .map_err(|e| worker_failure(WorkerFailure::Io(e.to_string()), "", ""))?;
        tokio::fs::write(&request_path, payload)
            .await
            .map_err(|e| worker_failure(WorkerFailure::Io(e.to_string()), "", ""))?;

        let result = self
            .invoke_worker(
                worker,
                &request_path,
                &response_path,
                node.block_type(),
                cancellation,
            )
            .await;

        let _ = tokio::fs::remove_file(&request_path).await;
        let _ = tokio::fs::remove_file(&response_path).await;

        result
    }

    async fn invoke_worker(
        &self,
        worker: &WorkerCommand,
        request_path: &Path,
        response_path: &Path,
        block_type: &str,
        cancellation: CancellationToken,
    ) -> Result<Execution, BlockError> {
        let start = Instant::now();

        let mut cmd = Command::new(&worker.program);
        cmd.args(&worker.args)
            .arg(request_path)
            .arg(response_path)
            .arg(block_type)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| worker_failure(WorkerFailure::Spawn(e.to_string()), "", ""))?;

        // Dropping the wait future drops the child, which kills it.
        let output = tokio::select! {
            waited = tokio::time::timeout(self.worker_timeout, child.wait_with_output()) => {
                match waited {
                    Ok(Ok(output)) => output,
                    Ok(Err(e)) => {
                        return Err(worker_failure(WorkerFailure::Io(e.to_string()), "", ""));
                    }
                    Err(_) => {
                        return Err(worker_failure(
                            WorkerFailure::Timeout { seconds: self.worker_timeout.as_secs() },
                            "",
                            "",
                        ));
                    }
                }
            }
            _ = cancellation.cancelled() => return Err(BlockError::Cancelled),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !stdout.is_empty() {
            tracing::info!("Worker stdout for {}: {}", block_type, stdout.trim_end());
        }
        if !stderr.is_empty() {
            tracing::warn!("Worker stderr for {}: {}", block_type, stderr.trim_end());
        }

        if !output.status.success() {
            return Err(worker_failure(
                WorkerFailure::Exit(output.status.code()),
                &stdout,
                &stderr,
            ));
        }

        let bytes = match tokio::fs::read(response_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(worker_failure(WorkerFailure::MissingResponse, &stdout, &stderr));
            }
            Err(e) => {
                return Err(worker_failure(WorkerFailure::Io(e.to_string()), &stdout, &stderr));
            }
        };

        let response: ExternalExecutionResponse = serde_json::from_slice(&bytes).map_err(|e| {
            worker_failure(WorkerFailure::Decode(e.to_string()), &stdout, &stderr)
        })?;

        let mut block_output = BlockOutput::new().with_result(response.computed_result);
        block_output.outputs = response.outputs;
        block_output.metadata.execution_time_ms = start.elapsed().as_millis() as u64;

        Ok(Execution {
            output: block_output,
            stdout,
            stderr,
        })
    }
}

fn worker_failure(reason: WorkerFailure, stdout: &str, stderr: &str) -> BlockError {
    BlockError::ExternalWorker {
        reason,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}
