use std::path::{Path, PathBuf};
use std::process::Command;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

use crate::config::BlastSettings;
use crate::error::MinerError;

/// Longest hit title kept in the match table.
pub const TITLE_LIMIT: usize = 80;

/// Value written to the `sequence` column of the match table.
pub const SEQUENCE_PLACEHOLDER: &str = "x";

pub const MATCHED_HEADER: [&str; 7] = [
    "identifier",
    "sequence",
    "match",
    "match_score",
    "match_start",
    "match_length",
    "match_identity",
];

pub trait AlignmentTool {
    /// Fails when the tool cannot run at all, before any query is tried.
    fn check(&self) -> Result<(), MinerError> {
        Ok(())
    }

    /// Aligns the query FASTA at `query` against the reference database and
    /// leaves an XML report at `report`.
    fn align(&self, query: &Path, report: &Path) -> Result<(), MinerError>;
}

/// `blastp` (or a compatible program) looked up on `PATH`.
#[derive(Debug, Clone)]
pub struct SystemBlast {
    name: String,
    program: Option<PathBuf>,
    database: String,
    threads: usize,
}

impl SystemBlast {
    pub fn new(settings: &BlastSettings) -> Self {
        Self {
            name: settings.program.clone(),
            program: resolve_program(&settings.program),
            database: settings.database.clone(),
            threads: settings.threads.max(1),
        }
    }

    fn program(&self) -> Result<&Path, MinerError> {
        self.program
            .as_deref()
            .ok_or_else(|| MinerError::MissingTool(self.name.clone()))
    }

    fn args(&self, query: &Path, report: &Path) -> Vec<String> {
        vec![
            "-query".to_string(),
            query.to_string_lossy().to_string(),
            "-db".to_string(),
            self.database.clone(),
            "-outfmt".to_string(),
            "5".to_string(),
            "-out".to_string(),
            report.to_string_lossy().to_string(),
            "-num_threads".to_string(),
            self.threads.to_string(),
        ]
    }
}

impl AlignmentTool for SystemBlast {
    fn check(&self) -> Result<(), MinerError> {
        self.program().map(|_| ())
    }

    fn align(&self, query: &Path, report: &Path) -> Result<(), MinerError> {
        let program = self.program()?;
        let output = Command::new(program)
            .args(self.args(query, report))
            .output()
            .map_err(|err| MinerError::Alignment(err.to_string()))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("command failed: {}", program.display())
        } else {
            stderr
        };
        Err(MinerError::Alignment(message))
    }
}

fn resolve_program(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return direct.exists().then(|| direct.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hsp {
    pub score: f64,
    pub query_start: u64,
    pub align_length: u64,
    pub identities: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hit {
    pub id: String,
    pub def: String,
    pub hsps: Vec<Hsp>,
}

impl Hit {
    pub fn title(&self) -> String {
        format!("{} {}", self.id, self.def).trim().to_string()
    }
}

/// Row of `matched.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentMatch {
    pub identifier: String,
    pub sequence: String,
    #[serde(rename = "match")]
    pub title: String,
    pub match_score: f64,
    pub match_start: u64,
    pub match_length: u64,
    pub match_identity: f64,
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    HitId,
    HitDef,
    Score,
    QueryFrom,
    AlignLen,
    Identity,
}

/// Hits reported for the first query of a BLAST XML (`-outfmt 5`) report,
/// in report order.
pub fn parse_report(xml: &str) -> Result<Vec<Hit>, MinerError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut hits = Vec::new();
    let mut iterations = 0usize;
    let mut hit: Option<Hit> = None;
    let mut hsp: Option<Hsp> = None;
    let mut field: Option<Field> = None;
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| MinerError::BlastReport(err.to_string()))?;
        match event {
            Event::Start(ref e) => match e.name().as_ref() {
                b"Iteration" => iterations += 1,
                b"Hit" if iterations <= 1 => hit = Some(Hit::default()),
                b"Hsp" if hit.is_some() => hsp = Some(Hsp::default()),
                b"Hit_id" => field = Some(Field::HitId),
                b"Hit_def" => field = Some(Field::HitDef),
                b"Hsp_score" => field = Some(Field::Score),
                b"Hsp_query-from" => field = Some(Field::QueryFrom),
                b"Hsp_align-len" => field = Some(Field::AlignLen),
                b"Hsp_identity" => field = Some(Field::Identity),
                _ => field = None,
            },
            Event::Text(ref e) => {
                if let Some(current) = field {
                    let text = e
                        .unescape()
                        .map_err(|err| MinerError::BlastReport(err.to_string()))?;
                    assign(current, &text, hit.as_mut(), hsp.as_mut())?;
                }
            }
            Event::End(ref e) => {
                field = None;
                match e.name().as_ref() {
                    b"Hsp" => {
                        if let (Some(done), Some(hit)) = (hsp.take(), hit.as_mut()) {
                            hit.hsps.push(done);
                        }
                    }
                    b"Hit" => {
                        if let Some(done) = hit.take() {
                            hits.push(done);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if iterations == 0 {
        return Err(MinerError::BlastReport("no Iteration element".to_string()));
    }
    Ok(hits)
}

fn assign(
    field: Field,
    text: &str,
    hit: Option<&mut Hit>,
    hsp: Option<&mut Hsp>,
) -> Result<(), MinerError> {
    match (field, hit, hsp) {
        (Field::HitId, Some(hit), _) => hit.id = text.to_string(),
        (Field::HitDef, Some(hit), _) => hit.def = text.to_string(),
        (Field::Score, _, Some(hsp)) => hsp.score = parse_number(text, "Hsp_score")?,
        (Field::QueryFrom, _, Some(hsp)) => {
            hsp.query_start = parse_number(text, "Hsp_query-from")?
        }
        (Field::AlignLen, _, Some(hsp)) => {
            hsp.align_length = parse_number(text, "Hsp_align-len")?
        }
        (Field::Identity, _, Some(hsp)) => hsp.identities = parse_number(text, "Hsp_identity")?,
        _ => {}
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(text: &str, element: &str) -> Result<T, MinerError> {
    text.trim()
        .parse()
        .map_err(|_| MinerError::BlastReport(format!("bad {element} value: {text}")))
}

/// Match record built from the first HSP of the first hit, or `None` when
/// the query hit nothing.
pub fn best_match(identifier: &str, hits: &[Hit]) -> Option<AlignmentMatch> {
    let hit = hits.first()?;
    let hsp = hit.hsps.first()?;
    let identity = if hsp.align_length == 0 {
        0.0
    } else {
        hsp.identities as f64 / hsp.align_length as f64
    };
    Some(AlignmentMatch {
        identifier: identifier.to_string(),
        sequence: SEQUENCE_PLACEHOLDER.to_string(),
        title: hit.title().chars().take(TITLE_LIMIT).collect(),
        match_score: hsp.score,
        match_start: hsp.query_start,
        match_length: hsp.align_length,
        match_identity: identity,
    })
}
