use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration};

use crate::models::LeaseEvent;
use crate::services::lease_handler::{on_lease_event, Delivery};
use crate::services::LeaseProcessor;

/// EventSpool follows a JSON-lines file of lease events written by the
/// DHCP server hooks and feeds new lines to the processor in file order.
pub struct EventSpool {
    spool_path: String,
    poll_interval: Duration,
    processor: Arc<LeaseProcessor>,
    offset: Arc<Mutex<u64>>,
    stop_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

/// Result of one pass over the spool file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpoolPass {
    pub applied: usize,
    pub rejected: usize,
    pub unparsable: usize,
    /// Events left for the next pass by a backend failure
    pub deferred: usize,
}

impl EventSpool {
    pub fn new(spool_path: String, poll_interval: Duration, processor: Arc<LeaseProcessor>) -> Self {
        Self {
            spool_path,
            poll_interval,
            processor,
            offset: Arc::new(Mutex::new(0)),
            stop_tx: None,
        }
    }

    /// Start following the spool file
    pub fn start(&mut self) {
        let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel();
        self.stop_tx = Some(stop_tx);

        let spool_path = self.spool_path.clone();
        let processor = self.processor.clone();
        let offset = self.offset.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let mut ticker = interval(poll_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let mut offset = offset.lock().await;
                        if let Err(e) = check_spool(&spool_path, &mut offset, &processor).await {
                            tracing::warn!("Error reading event spool: {}", e);
                        }
                    }
                    _ = &mut stop_rx => {
                        tracing::info!("Event spool watcher stopped");
                        break;
                    }
                }
            }
        });
    }

    /// Stop following the spool file
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Run a single pass now, outside the polling loop
    pub async fn poll_once(&self) -> Result<SpoolPass> {
        let mut offset = self.offset.lock().await;
        check_spool(&self.spool_path, &mut offset, &self.processor).await
    }
}

/// Apply every complete line after `offset`, one at a time, advancing it
/// past each line handled. A backend failure ends the pass with `offset` still
/// before the failed line, so the next pass delivers it again.
pub async fn check_spool(spool_path: &str, offset: &mut u64, processor: &LeaseProcessor) -> Result<SpoolPass> {
    let mut pass = SpoolPass::default();
    for (line, end) in read_new_lines(spool_path, offset).await? {
        if line.is_empty() || line.starts_with('#') {
            *offset = end;
            continue;
        }
        match serde_json::from_str::<LeaseEvent>(&line) {
            Ok(event) => match on_lease_event(processor, &event).await {
                Delivery::Applied => pass.applied += 1,
                Delivery::Rejected => pass.rejected += 1,
                Delivery::Retry => {
                    pass.deferred += 1;
                    break;
                }
            },
            Err(e) => {
                tracing::warn!("Skipping unparsable spool line: {}", e);
                pass.unparsable += 1;
            }
        }
        *offset = end;
    }

    if pass != SpoolPass::default() {
        tracing::info!(
            "Spool pass: {} applied, {} rejected, {} unparsable, {} deferred",
            pass.applied,
            pass.rejected,
            pass.unparsable,
            pass.deferred
        );
    }
    Ok(pass)
}

/// Read complete lines past `offset`, each with the offset just past its
/// newline. A trailing line without a newline is left for the next pass. A
/// file shorter than `offset` was rotated, so reading restarts from the top.
async fn read_new_lines(spool_path: &str, offset: &mut u64) -> Result<Vec<(String, u64)>> {
    let content = match tokio::fs::read(spool_path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    if (content.len() as u64) < *offset {
        tracing::info!("Event spool {} was truncated, rereading", spool_path);
        *offset = 0;
    }

    let mut end = *offset;
    let mut lines = Vec::new();
    for line in content[*offset as usize..].split_inclusive(|b| *b == b'\n') {
        if line.last() != Some(&b'\n') {
            break;
        }
        end += line.len() as u64;
        lines.push((String::from_utf8_lossy(line).trim().to_string(), end));
    }
    Ok(lines)
}
