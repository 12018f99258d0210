use crate::registry::BlockRegistry;
use crate::report::BlockReport;
use blockcore::{
    BlockDescription, BlockId, BlockSchema, Cardinality, EdgeDescription, Value,
    WorkflowDescription, WorkflowError,
};
use chrono::{DateTime, Utc};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// Execution state of one block. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockState {
    Pending = 0,
    Ready = 1,
    Running = 2,
    Done = 3,
    Failed = 4,
}

impl BlockState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => BlockState::Pending,
            1 => BlockState::Ready,
            2 => BlockState::Running,
            3 => BlockState::Done,
            _ => BlockState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BlockState::Done | BlockState::Failed)
    }

    fn can_advance_to(self, next: BlockState) -> bool {
        matches!(
            (self, next),
            (BlockState::Pending, BlockState::Ready)
                | (BlockState::Ready, BlockState::Running)
                | (BlockState::Running, BlockState::Done)
                | (BlockState::Running, BlockState::Failed)
        )
    }
}

/// One bound source of an input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSource {
    pub block_id: BlockId,
    pub port: String,
}

/// Per-run bookkeeping that is not part of the data flow
#[derive(Debug, Clone, Default)]
pub(crate) struct BlockRecord {
    pub result: Option<Value>,
    pub stdout: String,
    pub stderr: String,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// A node of one workflow graph
pub struct BlockInstance {
    id: BlockId,
    schema: Arc<BlockSchema>,
    module: String,
    properties: HashMap<String, Value>,
    bindings: BTreeMap<String, Vec<InputSource>>,
    predecessors: BTreeSet<BlockId>,
    successors: BTreeSet<BlockId>,
    state: AtomicU8,
    unfinished_predecessors: AtomicUsize,
    outputs: OnceLock<HashMap<String, Value>>,
    record: Mutex<BlockRecord>,
}

impl BlockInstance {
    fn new(id: BlockId, schema: Arc<BlockSchema>, module: String) -> Self {
        Self {
            id,
            schema,
            module,
            properties: HashMap::new(),
            bindings: BTreeMap::new(),
            predecessors: BTreeSet::new(),
            successors: BTreeSet::new(),
            state: AtomicU8::new(BlockState::Pending as u8),
            unfinished_predecessors: AtomicUsize::new(0),
            outputs: OnceLock::new(),
            record: Mutex::new(BlockRecord::default()),
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn schema(&self) -> &Arc<BlockSchema> {
        &self.schema
    }

    pub fn block_type(&self) -> &str {
        &self.schema.type_name
    }

    /// Module named by the description, falling back to the schema's
    pub fn module(&self) -> &str {
        if self.module.is_empty() {
            &self.schema.module
        } else {
            &self.module
        }
    }

    pub fn properties(&self) -> &HashMap<String, Value> {
        &self.properties
    }

    /// Sources bound to each input port, in edge declaration order
    pub fn bindings(&self) -> &BTreeMap<String, Vec<InputSource>> {
        &self.bindings
    }

    pub fn predecessors(&self) -> &BTreeSet<BlockId> {
        &self.predecessors
    }

    pub fn successors(&self) -> &BTreeSet<BlockId> {
        &self.successors
    }

    pub fn state(&self) -> BlockState {
        BlockState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `next` if that is a legal forward step from the current
    /// state. Returns false (and changes nothing) otherwise.
    pub(crate) fn advance(&self, next: BlockState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if !BlockState::from_u8(current).can_advance_to(next) {
                return false;
            }
            match self.state.compare_exchange(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Outputs, readable once the block is `Done`
    pub fn outputs(&self) -> Option<&HashMap<String, Value>> {
        self.outputs.get()
    }

    pub fn output(&self, port: &str) -> Option<&Value> {
        self.outputs.get().and_then(|o| o.get(port))
    }

    /// Store the outputs. Write-once: a second call is refused.
    pub(crate) fn set_outputs(&self, outputs: HashMap<String, Value>) -> bool {
        self.outputs.set(outputs).is_ok()
    }

    /// Count one finished predecessor; true when it was the last one.
    pub(crate) fn predecessor_done(&self) -> bool {
        self.unfinished_predecessors
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map(|previous| previous == 1)
            .unwrap_or(false)
    }

    pub(crate) fn record(&self) -> MutexGuard<'_, BlockRecord> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn report(&self) -> BlockReport {
        let record = self.record().clone();
        BlockReport {
            id: self.id,
            block_type: self.schema.type_name.clone(),
            state: self.state(),
            outputs: self.outputs().cloned().unwrap_or_default(),
            result: record.result,
            stdout: record.stdout,
            stderr: record.stderr,
            error: record.error,
            started_at: record.started_at,
            finished_at: record.finished_at,
        }
    }
}

/// Fully wired block graph for one run. Structure is fixed after build.
pub struct WorkflowGraph {
    name: String,
    nodes: BTreeMap<BlockId, BlockInstance>,
    entry_nodes: BTreeSet<BlockId>,
}

impl WorkflowGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self, id: BlockId) -> Option<&BlockInstance> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &BlockInstance> {
        self.nodes.values()
    }

    /// Blocks without predecessors; execution starts here
    pub fn entry_nodes(&self) -> &BTreeSet<BlockId> {
        &self.entry_nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn reports(&self) -> Vec<BlockReport> {
        self.nodes.values().map(BlockInstance::report).collect()
    }
}

/// Turns a workflow description into a [`WorkflowGraph`]
pub struct GraphBuilder<'a> {
    registry: &'a BlockRegistry,
    data_root: PathBuf,
    detect_cycles: bool,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(registry: &'a BlockRegistry) -> Self {
        Self {
            registry,
            data_root: PathBuf::from("."),
            detect_cycles: true,
        }
    }

    /// Root that `file` properties are resolved against
    pub fn data_root(mut self, data_root: impl Into<PathBuf>) -> Self {
        self.data_root = data_root.into();
        self
    }

    /// With detection off, a cyclic workflow builds and then never drains
    pub fn detect_cycles(mut self, detect_cycles: bool) -> Self {
        self.detect_cycles = detect_cycles;
        self
    }

    pub fn build(&self, description: &WorkflowDescription) -> Result<WorkflowGraph, WorkflowError> {
        let mut nodes = BTreeMap::new();

        for block in &description.blocks {
            if nodes.contains_key(&block.id) {
                return Err(WorkflowError::DuplicateBlockId(block.id));
            }
            let instance = self.instantiate(block)?;
            nodes.insert(block.id, instance);
        }

        for edge in &description.edges {
            bind_edge(&mut nodes, edge)?;
        }

        for node in nodes.values_mut() {
            *node.unfinished_predecessors.get_mut() = node.predecessors.len();
        }

        let entry_nodes: BTreeSet<BlockId> = nodes
            .values()
            .filter(|n| n.predecessors.is_empty())
            .map(|n| n.id)
            .collect();

        if self.detect_cycles {
            check_acyclic(&nodes)?;
        }

        tracing::info!(
            "Built workflow graph '{}': {} blocks, {} edges, {} entry blocks",
            description.name,
            nodes.len(),
            description.edges.len(),
            entry_nodes.len()
        );

        Ok(WorkflowGraph {
            name: description.name.clone(),
            nodes,
            entry_nodes,
        })
    }

    fn instantiate(&self, block: &BlockDescription) -> Result<BlockInstance, WorkflowError> {
        let schema = self.registry.resolve(&block.block_type).map_err(|e| {
            tracing::error!("No block type '{}' for block {}", block.block_type, block.id);
            e
        })?;

        let mut instance = BlockInstance::new(block.id, Arc::clone(&schema), block.module.clone());

        for key in block.values.keys() {
            if !schema.properties.contains_key(key) {
                tracing::warn!(
                    "Block {} ({}) ignores undeclared property '{}'",
                    block.id,
                    schema.type_name,
                    key
                );
            }
        }

        for spec in schema.properties.values() {
            let raw = match block.values.get(&spec.name) {
                Some(raw) => raw.clone(),
                None => match &spec.default_value {
                    Some(default) if !default.is_empty() => {
                        serde_json::Value::String(default.clone())
                    }
                    _ => continue,
                },
            };

            let value = spec
                .value_type
                .coerce(&raw, &self.data_root)
                .map_err(|actual| WorkflowError::PropertyTypeMismatch {
                    block_id: block.id,
                    property: spec.name.clone(),
                    expected: spec.value_type.to_string(),
                    actual,
                })?;

            tracing::debug!("Block {} property {} = {:?}", block.id, spec.name, value);
            instance.properties.insert(spec.name.clone(), value);
        }

        Ok(instance)
    }
}

fn bind_edge(
    nodes: &mut BTreeMap<BlockId, BlockInstance>,
    edge: &EdgeDescription,
) -> Result<(), WorkflowError> {
    let unresolved = |block_id: BlockId, port: &str| WorkflowError::UnresolvedInputSource {
        block_id,
        port: port.to_string(),
    };

    let source = nodes
        .get(&edge.source_block_id)
        .ok_or_else(|| unresolved(edge.source_block_id, &edge.source_output_port))?;
    if source.schema.output_port(&edge.source_output_port).is_none() {
        return Err(unresolved(edge.source_block_id, &edge.source_output_port));
    }

    let dest = nodes
        .get_mut(&edge.dest_block_id)
        .ok_or_else(|| unresolved(edge.dest_block_id, &edge.dest_input_port))?;
    let cardinality = dest
        .schema
        .input_port(&edge.dest_input_port)
        .map(|port| port.cardinality)
        .ok_or_else(|| unresolved(edge.dest_block_id, &edge.dest_input_port))?;

    let bound = dest.bindings.entry(edge.dest_input_port.clone()).or_default();
    if cardinality == Cardinality::Single && !bound.is_empty() {
        return Err(WorkflowError::PortCardinalityViolation {
            block_id: edge.dest_block_id,
            port: edge.dest_input_port.clone(),
        });
    }
    bound.push(InputSource {
        block_id: edge.source_block_id,
        port: edge.source_output_port.clone(),
    });
    dest.predecessors.insert(edge.source_block_id);

    if let Some(source) = nodes.get_mut(&edge.source_block_id) {
        source.successors.insert(edge.dest_block_id);
    }

    tracing::debug!(
        "Bound {}.{} -> {}.{}",
        edge.source_block_id,
        edge.source_output_port,
        edge.dest_block_id,
        edge.dest_input_port
    );

    Ok(())
}

fn check_acyclic(nodes: &BTreeMap<BlockId, BlockInstance>) -> Result<(), WorkflowError> {
    let mut graph = DiGraph::<BlockId, ()>::new();
    let index: HashMap<BlockId, _> = nodes.keys().map(|id| (*id, graph.add_node(*id))).collect();

    for node in nodes.values() {
        for succ in &node.successors {
            graph.add_edge(index[&node.id], index[succ], ());
        }
    }

    if toposort(&graph, None).is_err() {
        return Err(WorkflowError::CyclicDependency);
    }
    Ok(())
}
