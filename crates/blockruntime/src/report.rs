use crate::graph::BlockState;
use blockcore::{BlockId, ExecutionId, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Success,
    PartialFailure,
}

/// Final view of one block after a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockReport {
    pub id: BlockId,
    pub block_type: String,
    pub state: BlockState,
    pub outputs: HashMap<String, Value>,
    pub result: Option<Value>,
    pub stdout: String,
    pub stderr: String,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// The completed graph, annotated per block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub execution_id: ExecutionId,
    pub name: String,
    pub status: RunStatus,
    /// Blocks that had not reached a terminal state when the report was taken
    pub remaining: usize,
    pub blocks: Vec<BlockReport>,
}

impl RunReport {
    pub fn block(&self, id: BlockId) -> Option<&BlockReport> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn failed_blocks(&self) -> impl Iterator<Item = &BlockReport> {
        self.blocks.iter().filter(|b| b.state == BlockState::Failed)
    }
}
