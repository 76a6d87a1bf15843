use anyhow::{anyhow, Result};
use log::info;
use tokio::select;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Turns SIGTERM/SIGINT/SIGHUP into a [CancellationToken]. Batch jobs check the token
/// before submitting more work, files already in flight are allowed to finish.
pub struct SignalHandler {
    tok: CancellationToken,
}

pub fn new() -> SignalHandler {
    SignalHandler {
        tok: CancellationToken::new(),
    }
}

impl SignalHandler {
    pub fn subscribe_stop(&self) -> CancellationToken {
        self.tok.clone()
    }

    pub async fn wait_for_signal(self) -> Result<()> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sighup = signal(SignalKind::hangup())?;

        select! {
            _ = sigterm.recv() => info!("Terminated; no further files will be submitted..."),
            _ = sigint.recv() => info!("Interrupted; no further files will be submitted..."),
            _ = sighup.recv() => info!("Hangup received; no further files will be submitted..."), // used by tmux apparently
            _ = self.tok.cancelled() => return Ok(()),
        }
        self.tok.cancel();
        Ok(())
    }
}

pub async fn flatten<T>(handle: JoinHandle<Result<T>>) -> Result<T> {
    match handle.await {
        Ok(Ok(it)) => Ok(it),
        Ok(Err(err)) => Err(err),
        Err(err) => Err(anyhow!(err)),
    }
}
