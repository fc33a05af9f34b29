//! Background conversion
//!
//! [`Converter::spawn`] runs the pipeline on a dedicated thread and streams
//! [`WorkerEvent`]s back over a channel. The busy gate is taken on the
//! caller's thread, so a rejected request never starts a thread.

use super::progress::ProgressUpdate;
use super::request::{ConversionOutput, ConversionRequest};
use super::{run_conversion, Converter};
use crate::utils::error::{IcoError, Result};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

/// Message from a running worker. Exactly one `Done` or `Failed` ends the stream.
#[derive(Debug)]
pub enum WorkerEvent {
    Progress(ProgressUpdate),
    Done(ConversionOutput),
    Failed(IcoError),
}

/// Handle to a conversion running on a worker thread.
#[derive(Debug)]
pub struct ConversionTask {
    events: Receiver<WorkerEvent>,
    handle: Option<JoinHandle<()>>,
}

impl ConversionTask {
    /// Block for the next event. `None` once the worker has gone away.
    pub fn recv(&self) -> Option<WorkerEvent> {
        self.events.recv().ok()
    }

    /// Next event if one is already queued.
    pub fn try_recv(&self) -> Option<WorkerEvent> {
        self.events.try_recv().ok()
    }

    /// Block until the conversion finishes, skipping progress events.
    pub fn wait(mut self) -> Result<ConversionOutput> {
        let outcome = loop {
            match self.events.recv() {
                Ok(WorkerEvent::Progress(_)) => continue,
                Ok(WorkerEvent::Done(output)) => break Ok(output),
                Ok(WorkerEvent::Failed(err)) => break Err(err),
                Err(_) => {
                    break Err(IcoError::Encoding(
                        "Conversion worker stopped without a result".to_string(),
                    ))
                }
            }
        };
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Conversion worker panicked");
            }
        }
        outcome
    }
}

impl Converter {
    /// Run a conversion on a worker thread.
    ///
    /// `on_progress` runs on the worker; the same updates are also queued as
    /// [`WorkerEvent::Progress`]. The gate is released before the final event
    /// is sent, so a caller that sees `Done` can start the next conversion.
    ///
    /// # Errors
    /// * `IcoError::Busy` - another conversion holds the gate
    /// * `IcoError::Io` - the worker thread could not be started
    pub fn spawn<F>(&self, request: ConversionRequest, on_progress: F) -> Result<ConversionTask>
    where
        F: FnMut(&ProgressUpdate) + Send + 'static,
    {
        let guard = self.gate.try_acquire()?;
        let limits = self.limits;
        let (sender, events) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("icosmith-worker".to_string())
            .spawn(move || {
                let mut on_progress = on_progress;
                let progress_sender = sender.clone();
                let result = run_conversion(&request, &limits, |update| {
                    on_progress(update);
                    let _ = progress_sender.send(WorkerEvent::Progress(update.clone()));
                });
                drop(guard);

                let event = match result {
                    Ok(output) => WorkerEvent::Done(output),
                    Err(err) => {
                        tracing::warn!("Conversion failed: {}", err);
                        WorkerEvent::Failed(err)
                    }
                };
                if sender.send(event).is_err() {
                    tracing::debug!("Conversion result dropped: task handle is gone");
                }
            })?;

        Ok(ConversionTask {
            events,
            handle: Some(handle),
        })
    }
}
