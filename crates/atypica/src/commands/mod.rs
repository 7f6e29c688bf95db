use async_trait::async_trait;
use eyre::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub mod interview;
pub mod persona;
pub mod scout;
pub mod session;
pub mod topic;

#[async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// A token cancelled by Ctrl-C. Abort the handle once the work is done.
pub(crate) fn cancel_on_interrupt() -> (CancellationToken, JoinHandle<()>) {
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        }
    });
    (cancel, handle)
}
