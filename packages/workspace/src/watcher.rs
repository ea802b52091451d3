//! File system watcher for local projects.
//!
//! Raw notify events are forwarded into a tokio channel and merged into
//! batches: a batch closes once no event arrived for the debounce period.
//! Each batch is one reload of the project.

use crate::errors::WorkspaceResult;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

/// Changes merged over one debounce window
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChangeBatch {
    pub paths: BTreeSet<PathBuf>,
    pub events: usize,
}

impl ChangeBatch {
    fn record(&mut self, res: notify::Result<Event>) {
        match res {
            Ok(event) if event.kind.is_access() => {}
            Ok(event) => {
                self.events += 1;
                self.paths.extend(event.paths);
            }
            Err(e) => tracing::warn!(error = %e, "watch error"),
        }
    }
}

pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: UnboundedReceiver<notify::Result<Event>>,
    debounce: Duration,
}

impl FileWatcher {
    pub fn new(path: PathBuf, debounce: Duration) -> WorkspaceResult<Self> {
        let (tx, rx) = unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        watcher.watch(&path, RecursiveMode::Recursive)?;
        tracing::info!(path = %path.display(), debounce_ms = debounce.as_millis() as u64, "watching project");

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            debounce,
        })
    }

    /// Wait for the next batch of changes; `None` once the watcher stopped
    pub async fn next_batch(&mut self) -> Option<ChangeBatch> {
        let mut batch = ChangeBatch::default();
        while batch.events == 0 {
            batch.record(self.receiver.recv().await?);
        }

        loop {
            match tokio::time::timeout(self.debounce, self.receiver.recv()).await {
                Ok(Some(res)) => batch.record(res),
                Ok(None) | Err(_) => break,
            }
        }
        tracing::debug!(events = batch.events, paths = batch.paths.len(), "change batch");
        Some(batch)
    }
}
