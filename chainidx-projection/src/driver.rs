use std::time::Duration;

use chainidx_core::ProjectionError;
use chainidx_datastore::Datastore;
use tracing::warn;

use crate::engine::{log_resume_point, resume_from, ProjectionEngine};
use crate::source::ConsensusSource;

const TRANSIENT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Drives `source` to completion against `engine`: resumes from the last
/// persisted change, re-delivers a change on a transient error, and aborts
/// on the first fatal error (the operator restarts the process, which
/// resumes from the last successfully persisted `currentChangeId`).
pub async fn run_to_completion<D: Datastore>(
    engine: &ProjectionEngine<D>,
    source: &mut dyn ConsensusSource,
) -> Result<(), ProjectionError> {
    let state = engine.current_state().await?;
    log_resume_point(&state);
    source.subscribe(resume_from(&state)).await?;

    while let Some(change) = source.next_change().await? {
        loop {
            match engine.process_change(&change).await {
                Ok(()) => break,
                Err(err) if !err.is_fatal() => {
                    warn!(error = %err, change_id = %change.id, "transient error, retrying change");
                    tokio::time::sleep(TRANSIENT_RETRY_BACKOFF).await;
                    continue;
                }
                Err(err) => return Err(err),
            }
        }
    }
    Ok(())
}
