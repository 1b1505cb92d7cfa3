//! Long-running mode: poll and autosave until Ctrl-C.

use tracing::info;

use slotwatch_core::Mirror;

use crate::error::CliError;

pub async fn handle(mirror: &Mirror) -> Result<(), CliError> {
    let tracked = mirror.registry().len();
    if tracked == 0 {
        info!("no entities registered yet; add some with `slotwatch register`");
    }

    mirror.start().await;
    info!(entities = tracked, "serving, press Ctrl-C to stop");

    let signal = tokio::signal::ctrl_c().await;
    info!("shutting down");
    // Stop background work even if the signal handler failed to install.
    mirror.shutdown().await?;
    signal?;
    Ok(())
}
