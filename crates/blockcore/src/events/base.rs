use crate::{BlockId, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Events emitted during a workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStarted {
        execution_id: ExecutionId,
        workflow_name: String,
        block_count: usize,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        execution_id: ExecutionId,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    BlockStarted {
        execution_id: ExecutionId,
        block_id: BlockId,
        block_type: String,
        external: bool,
        timestamp: DateTime<Utc>,
    },
    BlockCompleted {
        execution_id: ExecutionId,
        block_id: BlockId,
        outputs: HashMap<String, Value>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    BlockFailed {
        execution_id: ExecutionId,
        block_id: BlockId,
        block_type: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    BlockEvent {
        execution_id: ExecutionId,
        block_id: BlockId,
        event: BlockEvent,
        timestamp: DateTime<Utc>,
    },
}

/// Events a block reports about itself while computing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum BlockEvent {
    Info { message: String },
    Warning { message: String },
    Progress { percent: f64, message: Option<String> },
    Data { port: String, value: Value },
}

/// Event emitter handed to a block for real-time updates
#[derive(Clone)]
pub struct EventEmitter {
    execution_id: ExecutionId,
    block_id: BlockId,
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    pub fn new(
        execution_id: ExecutionId,
        block_id: BlockId,
        sender: broadcast::Sender<ExecutionEvent>,
    ) -> Self {
        Self {
            execution_id,
            block_id,
            sender,
        }
    }

    /// An emitter nobody listens to, for running a block on its own
    pub fn detached(block_id: BlockId) -> Self {
        let (sender, _) = broadcast::channel(1);
        Self::new(Uuid::nil(), block_id, sender)
    }

    /// Emit a block event. Dropped silently when nobody is subscribed.
    pub fn emit(&self, event: BlockEvent) {
        let _ = self.sender.send(ExecutionEvent::BlockEvent {
            execution_id: self.execution_id,
            block_id: self.block_id,
            event,
            timestamp: Utc::now(),
        });
    }

    /// Emit info message
    pub fn info(&self, message: impl Into<String>) {
        self.emit(BlockEvent::Info {
            message: message.into(),
        });
    }

    /// Emit warning message
    pub fn warn(&self, message: impl Into<String>) {
        self.emit(BlockEvent::Warning {
            message: message.into(),
        });
    }

    /// Emit progress update (0.0 - 100.0)
    pub fn progress(&self, percent: f64, message: Option<String>) {
        self.emit(BlockEvent::Progress { percent, message });
    }

    /// Emit data on a specific port (for streaming)
    pub fn data(&self, port: impl Into<String>, value: Value) {
        self.emit(BlockEvent::Data {
            port: port.into(),
            value,
        });
    }
}

/// Run-wide broadcast bus. Sending never blocks; events without
/// subscribers are dropped.
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }

    /// Emitter bound to one block of one run
    pub fn create_emitter(&self, execution_id: ExecutionId, block_id: BlockId) -> EventEmitter {
        EventEmitter::new(execution_id, block_id, self.sender.clone())
    }
}
