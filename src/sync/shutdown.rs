use log::{error, info};
use std::future::Future;
use std::io;
use tokio::sync::watch;

pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (sender, receiver) = watch::channel(false);

    (ShutdownTrigger { sender }, Shutdown { receiver })
}

#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Triggers shutdown once `signal` resolves. A listener that fails to
    /// install triggers it as well.
    pub async fn trigger_on<F>(self, signal: F)
    where
        F: Future<Output = io::Result<()>>,
    {
        match signal.await {
            Ok(()) => info!("Received interrupt, shutting down"),
            Err(err) => error!("Failed to listen for interrupt, shutting down: {}", err),
        }

        self.trigger();
    }
}

/// Cancellation handle shared by the polling loop and the running cycle.
#[derive(Debug, Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once shutdown is triggered. Never resolves if the trigger is
    /// dropped without firing.
    pub async fn triggered(&self) {
        let mut receiver = self.receiver.clone();

        loop {
            if *receiver.borrow_and_update() {
                return;
            }

            if receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
