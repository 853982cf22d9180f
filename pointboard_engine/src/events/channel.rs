//! Simple stateless pub-sub event handler
//!
//! Components subscribe to order events and react to them without any access to the engine's internal state. All a
//! handler receives is the event itself. Handlers can be async, and each event is handled on its own task.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    name: &'static str,
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(name: &'static str, buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { name, listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.name, self.sender.clone())
    }

    /// Runs until every producer has been dropped, then waits for in-flight handlers to finish.
    pub async fn start_handler(mut self) {
        let name = self.name;
        debug!("📬️ Starting {name} event handler");
        // Drop our own sender, so that the loop ends when the last producer goes away
        drop(self.sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling {name} event");
            let handler = Arc::clone(&self.handler);
            jobs.spawn(async move { (handler)(ev).await });
            // Reap whatever has already finished so the set doesn't grow without bound
            while let Some(res) = jobs.try_join_next() {
                log_join_result(name, res);
            }
        }
        debug!("📬️ All {name} producers have gone away. Waiting for {} job(s) to complete", jobs.len());
        while let Some(res) = jobs.join_next().await {
            log_join_result(name, res);
        }
        debug!("📬️ {name} event handler has shut down");
    }
}

fn log_join_result(name: &str, res: Result<(), tokio::task::JoinError>) {
    match res {
        Ok(()) => trace!("📬️ {name} event handled"),
        Err(e) => warn!("📬️ A {name} event handler failed: {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    name: &'static str,
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(name: &'static str, sender: mpsc::Sender<E>) -> Self {
        Self { name, sender }
    }

    /// Publishes the event. Failures are logged and otherwise ignored.
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send {} event: {e}", self.name);
        }
    }
}
