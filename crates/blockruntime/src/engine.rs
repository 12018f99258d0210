use crate::context::RunContext;
use crate::executor::{BlockExecutor, Execution};
use crate::graph::{BlockInstance, BlockState, WorkflowGraph};
use crate::report::{RunReport, RunStatus};
use blockcore::{BlockError, BlockId, EventBus, ExecutionEvent, ExecutionId};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Drives a workflow graph to completion.
///
/// Every block that becomes ready gets its own tokio task; a block becomes
/// ready when its last predecessor finishes. There is no central scheduling
/// loop: finishing blocks release their successors themselves.
pub struct ExecutionEngine {
    executor: Arc<BlockExecutor>,
    event_bus: Arc<EventBus>,
    cancel_on_failure: bool,
}

impl ExecutionEngine {
    pub fn new(executor: Arc<BlockExecutor>, event_bus: Arc<EventBus>) -> Self {
        Self {
            executor,
            event_bus,
            cancel_on_failure: false,
        }
    }

    /// Stop starting new blocks once any block has failed
    pub fn cancel_on_failure(mut self, cancel_on_failure: bool) -> Self {
        self.cancel_on_failure = cancel_on_failure;
        self
    }

    /// Run the graph until every block finished or one failed.
    ///
    /// On failure this returns without waiting for blocks still running on
    /// other branches; use [`RunOutcome::drain`] to wait for them.
    pub async fn execute(&self, graph: WorkflowGraph) -> RunOutcome {
        let execution_id = ExecutionId::new_v4();
        let start_time = Instant::now();
        let graph = Arc::new(graph);
        let context = Arc::new(RunContext::new(graph.len()));

        self.event_bus.emit(ExecutionEvent::RunStarted {
            execution_id,
            workflow_name: graph.name().to_string(),
            block_count: graph.len(),
            timestamp: Utc::now(),
        });

        tracing::info!(
            "Starting workflow execution {} ('{}', {} blocks)",
            execution_id,
            graph.name(),
            graph.len()
        );

        let run = Arc::new(Run {
            execution_id,
            graph: Arc::clone(&graph),
            context: Arc::clone(&context),
            executor: Arc::clone(&self.executor),
            event_bus: Arc::clone(&self.event_bus),
            cancel_on_failure: self.cancel_on_failure,
        });

        for id in graph.entry_nodes() {
            if let Some(node) = graph.node(*id) {
                if node.advance(BlockState::Ready) {
                    tracing::debug!("Starting entry block {} ({})", id, node.block_type());
                    run.dispatch(*id);
                }
            }
        }

        context.wait_drained_or_failed().await;

        let success = !context.is_failed();
        let duration_ms = start_time.elapsed().as_millis() as u64;

        if success {
            tracing::info!(
                "Workflow execution {} completed successfully in {}ms",
                execution_id,
                duration_ms
            );
        } else {
            tracing::error!("Workflow execution {} failed after {}ms", execution_id, duration_ms);
        }

        self.event_bus.emit(ExecutionEvent::RunCompleted {
            execution_id,
            success,
            duration_ms,
            timestamp: Utc::now(),
        });

        RunOutcome {
            execution_id,
            graph,
            context,
            status: if success {
                RunStatus::Success
            } else {
                RunStatus::PartialFailure
            },
        }
    }
}

/// Result of [`ExecutionEngine::execute`]
pub struct RunOutcome {
    pub execution_id: ExecutionId,
    pub status: RunStatus,
    pub graph: Arc<WorkflowGraph>,
    pub context: Arc<RunContext>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Snapshot of the graph as it is now
    pub fn report(&self) -> RunReport {
        RunReport {
            execution_id: self.execution_id,
            name: self.graph.name().to_string(),
            status: self.status,
            remaining: self.context.remaining(),
            blocks: self.graph.reports(),
        }
    }

    /// Wait for every dispatched block to finish, then report
    pub async fn drain(&self) -> RunReport {
        self.context.wait_idle().await;
        self.report()
    }
}

/// State shared by every block task of one run
struct Run {
    execution_id: ExecutionId,
    graph: Arc<WorkflowGraph>,
    context: Arc<RunContext>,
    executor: Arc<BlockExecutor>,
    event_bus: Arc<EventBus>,
    cancel_on_failure: bool,
}

impl Run {
    fn dispatch(self: &Arc<Self>, id: BlockId) {
        self.context.task_started();
        let run = Arc::clone(self);
        tokio::spawn(async move {
            run.run_block(id).await;
            run.context.task_finished();
        });
    }

    async fn run_block(self: &Arc<Self>, id: BlockId) {
        let Some(node) = self.graph.node(id) else {
            return;
        };

        if self.context.cancellation().is_cancelled() {
            tracing::debug!("Not starting block {}: run cancelled", id);
            node.record().error = Some("not started: run cancelled".to_string());
            return;
        }

        if !node.advance(BlockState::Running) {
            tracing::warn!("Block {} dispatched in state {:?}", id, node.state());
            return;
        }
        node.record().started_at = Some(Utc::now());

        let external = self.executor.runs_external(node);
        self.event_bus.emit(ExecutionEvent::BlockStarted {
            execution_id: self.execution_id,
            block_id: id,
            block_type: node.block_type().to_string(),
            external,
            timestamp: Utc::now(),
        });

        let start = Instant::now();
        let events = self.event_bus.create_emitter(self.execution_id, id);
        let cancellation = self.context.cancellation().child_token();

        match self
            .executor
            .run_node(&self.graph, node, events, cancellation)
            .await
        {
            Ok(execution) => self.complete(node, execution, start),
            Err(error) => self.fail(node, error),
        }
    }

    fn complete(self: &Arc<Self>, node: &BlockInstance, execution: Execution, start: Instant) {
        let duration_ms = start.elapsed().as_millis() as u64;
        let Execution {
            output,
            stdout,
            stderr,
        } = execution;

        {
            let mut record = node.record();
            record.result = Some(output.result);
            record.stdout = stdout;
            record.stderr = stderr;
            record.finished_at = Some(Utc::now());
        }

        self.event_bus.emit(ExecutionEvent::BlockCompleted {
            execution_id: self.execution_id,
            block_id: node.id(),
            outputs: output.outputs.clone(),
            duration_ms,
            timestamp: Utc::now(),
        });

        if !node.set_outputs(output.outputs) {
            tracing::warn!("Outputs of block {} were already set", node.id());
        }
        node.advance(BlockState::Done);
        tracing::info!(
            "Block {} ({}) completed in {}ms",
            node.id(),
            node.block_type(),
            duration_ms
        );

        for succ in node.successors() {
            let Some(next) = self.graph.node(*succ) else {
                continue;
            };
            if next.predecessor_done() && next.advance(BlockState::Ready) {
                self.dispatch(*succ);
            }
        }

        self.context.complete_one();
    }

    fn fail(&self, node: &BlockInstance, error: BlockError) {
        tracing::error!(
            block_id = node.id(),
            block_type = node.block_type(),
            "Block {} ({}) failed: {:?}",
            node.id(),
            node.block_type(),
            error
        );

        {
            let mut record = node.record();
            if let BlockError::ExternalWorker { stdout, stderr, .. } = &error {
                record.stdout = stdout.clone();
                record.stderr = stderr.clone();
            } else {
                record.stderr = format!("{}\n{:#?}", error, error);
            }
            record.error = Some(error.to_string());
            record.finished_at = Some(Utc::now());
        }

        node.advance(BlockState::Failed);

        if self.context.mark_failed() {
            tracing::warn!("First failure in run {} at block {}", self.execution_id, node.id());
            if self.cancel_on_failure {
                self.context.cancel();
            }
        }

        self.event_bus.emit(ExecutionEvent::BlockFailed {
            execution_id: self.execution_id,
            block_id: node.id(),
            block_type: node.block_type().to_string(),
            error: error.to_string(),
            timestamp: Utc::now(),
        });

        self.context.complete_one();
    }
}
