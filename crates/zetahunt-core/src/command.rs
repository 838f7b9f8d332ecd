//! Controller channel
//!
//! External controllers post discrete commands into a bounded inbox;
//! the scan engine drains it only at suspension points, never
//! mid-evaluation.

use tokio::sync::mpsc;
use zetahunt_types::Command;

/// Default inbox capacity; controllers are slow, human-driven sources.
const INBOX_CAPACITY: usize = 64;

/// Create a connected controller/inbox pair.
#[must_use]
pub fn command_channel() -> (Controller, CommandInbox) {
    let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
    (Controller { tx }, CommandInbox { rx })
}

/// Sending half, held by external controllers (CLI signal handler,
/// future remote control surfaces).
#[derive(Debug, Clone)]
pub struct Controller {
    tx: mpsc::Sender<Command>,
}

impl Controller {
    /// Post a command; takes effect at the engine's next suspension
    /// point. Returns `false` if the engine is gone.
    pub async fn send(&self, command: Command) -> bool {
        self.tx.send(command).await.is_ok()
    }

    /// Request a prompt, ledger-safe shutdown.
    pub async fn shutdown(&self) -> bool {
        self.send(Command::Shutdown).await
    }

    /// Pause scanning at the next suspension point.
    pub async fn pause(&self) -> bool {
        self.send(Command::Pause).await
    }

    /// Resume a paused scan.
    pub async fn resume(&self) -> bool {
        self.send(Command::Resume).await
    }
}

/// Receiving half, owned by the scan engine.
#[derive(Debug)]
pub struct CommandInbox {
    rx: mpsc::Receiver<Command>,
}

impl CommandInbox {
    /// Drain every command already queued, without waiting.
    pub fn try_drain(&mut self) -> Vec<Command> {
        let mut drained = Vec::new();
        while let Ok(command) = self.rx.try_recv() {
            drained.push(command);
        }
        drained
    }

    /// Wait for the next command. Returns `None` once every controller
    /// handle has been dropped.
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }
}
