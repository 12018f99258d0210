//! Worker-process side of external block execution

use crate::executor::BlockExecutor;
use crate::registry::BlockRegistry;
use blockcore::{
    BlockContext, BlockError, EventEmitter, ExternalExecutionRequest, ExternalExecutionResponse,
    FlowError,
};
use std::path::Path;
use std::sync::Arc;

/// Read a request, compute the block in this process, write the response.
///
/// `block_type` must match the request; a mismatch means the engine and
/// worker disagree about what to run and is reported as a configuration
/// error.
pub async fn run_worker(
    registry: Arc<BlockRegistry>,
    request_path: &Path,
    response_path: &Path,
    block_type: &str,
) -> Result<ExternalExecutionResponse, FlowError> {
    tracing::info!(
        "Worker reading request {} for {}",
        request_path.display(),
        block_type
    );

    let bytes = tokio::fs::read(request_path).await?;
    let request: ExternalExecutionRequest = serde_json::from_slice(&bytes)?;

    if request.block_type != block_type {
        return Err(BlockError::Configuration(format!(
            "request is for '{}' but worker was asked to run '{}'",
            request.block_type, block_type
        ))
        .into());
    }

    let ctx = BlockContext::new(0, block_type, EventEmitter::detached(0))
        .with_properties(request.properties.clone())
        .with_inputs(request.inputs.clone());

    let execution = BlockExecutor::new(registry).run_in_process(ctx).await?;
    let response = ExternalExecutionResponse::from_request(request, execution.output);

    if let Some(parent) = response_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(response_path, serde_json::to_vec_pretty(&response)?).await?;

    tracing::info!("Worker wrote response {}", response_path.display());
    Ok(response)
}
