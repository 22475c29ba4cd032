//! Run the background workers.

use agentwallet_ops::spawn_workers;
use tracing::{info, warn};

use crate::config::CliConfig;
use crate::context::OperatorContext;
use crate::error::CliResult;
use crate::output::{OutputFormat, Render, WorkersOutput};
use crate::signals::shutdown_signal;

/// Execute the workers command. Blocks until SIGINT or SIGTERM, then waits
/// for every worker to finish its current tick.
pub async fn workers(config: CliConfig, format: OutputFormat) -> CliResult<String> {
    let ctx = OperatorContext::open(config)?;
    let workers = ctx.platform.workers();
    let names: Vec<String> = workers.iter().map(|w| w.name().to_string()).collect();

    info!(workers = ?names, "Starting workers");
    let handles = spawn_workers(workers, shutdown_signal());

    let mut stopped = 0;
    for (name, handle) in names.iter().zip(handles) {
        match handle.await {
            Ok(()) => stopped += 1,
            Err(e) => warn!(worker = %name, error = %e, "Worker task ended abnormally"),
        }
    }
    info!(stopped, "Workers stopped");

    Ok(WorkersOutput { workers: names, stopped }.render(format))
}
