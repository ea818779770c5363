use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::app::{ProgressEvent, ProgressSink};
use crate::archive::ResultArchive;
use crate::domain::{Identifier, IdentifierRange};
use crate::error::MinerError;
use crate::itasser::ResultsClient;
use crate::ledger::Ledger;
use crate::store::Workspace;
use crate::structure;

/// Longest uninterrupted stretch of the throttle sleep.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub can_download: bool,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    Completed(BTreeMap<Identifier, String>),
    /// Stopped by the user; holds whatever was gathered so far.
    Interrupted(BTreeMap<Identifier, String>),
}

/// Walks a range of job identifiers and turns each finished job into a
/// sequence, remembering failures in the ledger.
pub struct Collector<'a, C: ResultsClient> {
    workspace: &'a Workspace,
    client: &'a C,
    ledger: &'a mut Ledger,
    options: CollectOptions,
    cancel: &'a AtomicBool,
    sink: &'a dyn ProgressSink,
}

impl<'a, C: ResultsClient> Collector<'a, C> {
    pub fn new(
        workspace: &'a Workspace,
        client: &'a C,
        ledger: &'a mut Ledger,
        options: CollectOptions,
        cancel: &'a AtomicBool,
        sink: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            workspace,
            client,
            ledger,
            options,
            cancel,
            sink,
        }
    }

    /// Downloads the archive for `id` unless downloading is disabled.
    ///
    /// An HTTP status failure lands in the ledger (flushed straight away);
    /// transport failures are only warned about. Nothing propagates.
    pub fn fetch(&mut self, id: &Identifier) {
        if !self.options.can_download {
            return;
        }
        let destination = self.workspace.archive_path(id);
        match self.client.download(id, &destination) {
            Ok(()) => tracing::debug!(%id, path = %destination, "archive stored"),
            Err(err @ MinerError::ItasserStatus { .. }) => {
                tracing::warn!(%id, "{err}");
                self.ledger.record(id, err.to_string());
                self.flush_ledger();
            }
            Err(err) => tracing::warn!(%id, "{err}"),
        }
    }

    /// Opens the local archive for `id`, fetching it first when absent.
    ///
    /// Ledgered identifiers are skipped before any network or disk access.
    /// A file that does not open as a tar.bz2 is deleted and ledgered.
    pub fn open_archive(&mut self, id: &Identifier) -> Option<ResultArchive> {
        if self.ledger.contains(id) {
            self.note("\tpreviously excluded.");
            return None;
        }
        let path = self.workspace.archive_path(id);
        if !path.as_std_path().is_file() {
            self.fetch(id);
        }
        if self.ledger.contains(id) {
            self.note("\tpreviously excluded.");
            return None;
        }
        if !path.as_std_path().is_file() {
            self.note("\tFile absent.");
            return None;
        }
        match ResultArchive::open(&path) {
            Ok(archive) => Some(archive),
            Err(err) => {
                tracing::warn!(%id, "{err}");
                if let Err(remove_err) = std::fs::remove_file(path.as_std_path()) {
                    tracing::warn!(%id, path = %path, "could not delete bad archive: {remove_err}");
                }
                self.ledger.record(id, err.to_string());
                self.flush_ledger();
                None
            }
        }
    }

    pub fn sequence_for(&mut self, id: &Identifier) -> Option<String> {
        let archive = self.open_archive(id)?;
        let sequence = structure::sequence_from_archive(archive, &id.to_string());
        if sequence.is_none() {
            self.note("IO Stream is None from tarball.");
        }
        sequence
    }

    /// Collects sequences for every identifier in `range`, sleeping the
    /// configured delay after each one whether or not it yielded anything.
    pub fn collect(&mut self, range: &IdentifierRange) -> CollectOutcome {
        let mut data = BTreeMap::new();
        for id in range.iter() {
            if self.cancelled() {
                return CollectOutcome::Interrupted(data);
            }
            self.note(&id.to_string());
            let sequence = self.sequence_for(&id);
            if !self.throttle() {
                return CollectOutcome::Interrupted(data);
            }
            if let Some(sequence) = sequence.filter(|seq| !seq.is_empty()) {
                data.insert(id, sequence);
                self.note("\thas sequence.");
            }
        }
        CollectOutcome::Completed(data)
    }

    pub fn flush_ledger(&self) {
        if let Err(err) = self.ledger.flush() {
            tracing::warn!(path = %self.ledger.path(), "{err}");
        }
    }

    /// Sleeps the inter-request delay. Returns `false` if cancelled while
    /// waiting.
    fn throttle(&self) -> bool {
        let started = Instant::now();
        while started.elapsed() < self.options.delay {
            if self.cancelled() {
                return false;
            }
            let remaining = self.options.delay.saturating_sub(started.elapsed());
            thread::sleep(remaining.min(SLEEP_SLICE));
        }
        !self.cancelled()
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn note(&self, message: &str) {
        self.sink.event(ProgressEvent {
            message: message.to_string(),
            elapsed: None,
        });
    }
}
