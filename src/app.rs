use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::blast::{self, AlignmentMatch, AlignmentTool, MATCHED_HEADER};
use crate::collector::{CollectOptions, CollectOutcome, Collector};
use crate::config::ResolvedConfig;
use crate::domain::IdentifierRange;
use crate::error::MinerError;
use crate::itasser::ResultsClient;
use crate::ledger::Ledger;
use crate::store::{Workspace, fasta_record, write_csv};
use crate::tabulate::{self, DATA_EXTRA_HEADER, DATA_HEADER, EnrichedRecord, SequenceRecord};

#[derive(Debug, Clone, Serialize)]
pub struct CollectResult {
    pub first: String,
    pub last: String,
    pub scanned: u64,
    pub sequences: usize,
    pub excluded: usize,
    pub interrupted: bool,
    pub data_csv: Option<String>,
    pub started_at: String,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TabulateResult {
    pub rows: usize,
    pub data_extra_csv: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlignResult {
    pub queries: usize,
    pub matched: usize,
    pub failed: Vec<String>,
    pub matched_csv: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// The three pipeline stages over one workspace.
pub struct App<C: ResultsClient, A: AlignmentTool> {
    workspace: Workspace,
    config: ResolvedConfig,
    client: C,
    aligner: A,
}

impl<C: ResultsClient, A: AlignmentTool> App<C, A> {
    pub fn new(workspace: Workspace, config: ResolvedConfig, client: C, aligner: A) -> Self {
        Self {
            workspace,
            config,
            client,
            aligner,
        }
    }

    /// Runs the batch collector over the configured range and, unless the
    /// run was interrupted, writes `data.csv` plus one FASTA per sequence.
    /// The ledger is flushed either way.
    pub fn collect(
        &self,
        cancel: &AtomicBool,
        sink: &dyn ProgressSink,
    ) -> Result<CollectResult, MinerError> {
        let started_at = chrono::Utc::now().to_rfc3339();
        let clock = Instant::now();
        let range: IdentifierRange = self.config.range;
        self.workspace.ensure_layout()?;
        let mut ledger = Ledger::load(&self.workspace.ledger_path())?;

        let options = CollectOptions {
            can_download: self.config.can_download,
            delay: self.config.delay,
        };
        let outcome = Collector::new(
            &self.workspace,
            &self.client,
            &mut ledger,
            options,
            cancel,
            sink,
        )
        .collect(&range);
        ledger.flush()?;
        sink.event(ProgressEvent {
            message: format!("scanned {range}"),
            elapsed: Some(clock.elapsed()),
        });

        let (data, interrupted) = match outcome {
            CollectOutcome::Completed(data) => (data, false),
            CollectOutcome::Interrupted(data) => (data, true),
        };

        let mut data_csv = None;
        if !interrupted {
            let rows = data
                .iter()
                .map(|(id, sequence)| SequenceRecord {
                    identifier: id.to_string(),
                    sequence: sequence.clone(),
                })
                .collect::<Vec<_>>();
            let path = self.workspace.data_csv();
            write_csv(&path, &DATA_HEADER, &rows)?;
            for (id, sequence) in &data {
                Workspace::write_bytes_atomic(
                    &self.workspace.fasta_path(id),
                    fasta_record(id, sequence).as_bytes(),
                )?;
            }
            data_csv = Some(path.to_string());
        } else {
            tracing::info!(gathered = data.len(), "interrupted, discarding partial batch");
        }

        Ok(CollectResult {
            first: range.first.to_string(),
            last: range.last.to_string(),
            scanned: range.len(),
            sequences: data.len(),
            excluded: ledger.len(),
            interrupted,
            data_csv,
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Adds length and secondary-structure fractions to every row of
    /// `data.csv`, writing `data_extra.csv`.
    pub fn tabulate(&self, sink: &dyn ProgressSink) -> Result<TabulateResult, MinerError> {
        let records = tabulate::read_sequences(&self.workspace.data_csv())?;
        let rows = records
            .into_iter()
            .map(|record| {
                sink.event(ProgressEvent {
                    message: record.identifier.clone(),
                    elapsed: None,
                });
                tabulate::enrich(record)
            })
            .collect::<Vec<EnrichedRecord>>();
        let path = self.workspace.data_extra_csv();
        write_csv(&path, &DATA_EXTRA_HEADER, &rows)?;
        Ok(TabulateResult {
            rows: rows.len(),
            data_extra_csv: path.to_string(),
        })
    }

    /// Aligns every FASTA query against the reference database and writes
    /// the best hit of each to `matched.csv`. A failing query is logged and
    /// skipped. When the tool cannot run at all, a header-only table is
    /// written and the error returned.
    pub fn align(&self, sink: &dyn ProgressSink) -> Result<AlignResult, MinerError> {
        let path = self.workspace.matched_csv();
        if let Err(err) = self.aligner.check() {
            write_csv(&path, &MATCHED_HEADER, &[] as &[AlignmentMatch])?;
            return Err(err);
        }
        let queries = self.workspace.fasta_queries()?;
        let mut matches: Vec<AlignmentMatch> = Vec::new();
        let mut failed = Vec::new();

        for (stem, query) in &queries {
            sink.event(ProgressEvent {
                message: stem.clone(),
                elapsed: None,
            });
            match self.align_one(stem, query.as_std_path()) {
                Ok(Some(found)) => {
                    sink.event(ProgressEvent {
                        message: format!("\tmatched {}", found.title),
                        elapsed: None,
                    });
                    matches.push(found);
                }
                Ok(None) => sink.event(ProgressEvent {
                    message: "\tno match.".to_string(),
                    elapsed: None,
                }),
                Err(err) => {
                    tracing::warn!(file = %query, "{err}");
                    failed.push(query.to_string());
                }
            }
        }

        write_csv(&path, &MATCHED_HEADER, &matches)?;
        Ok(AlignResult {
            queries: queries.len(),
            matched: matches.len(),
            failed,
            matched_csv: path.to_string(),
        })
    }

    fn align_one(
        &self,
        stem: &str,
        query: &std::path::Path,
    ) -> Result<Option<AlignmentMatch>, MinerError> {
        let report = self.workspace.blast_report_path(stem);
        self.aligner.align(query, report.as_std_path())?;
        let xml = std::fs::read_to_string(report.as_std_path())
            .map_err(|err| MinerError::Filesystem(format!("read {report}: {err}")))?;
        let hits = blast::parse_report(&xml)?;
        Ok(blast::best_match(stem, &hits))
    }
}
