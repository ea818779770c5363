#![allow(dead_code)]

use std::fs::{self, File};
use std::sync::Mutex;

use bzip2::Compression;
use bzip2::write::BzEncoder;
use camino::{Utf8Path, Utf8PathBuf};

use itasser_miner::app::{ProgressEvent, ProgressSink};
use itasser_miner::domain::Identifier;
use itasser_miner::error::MinerError;
use itasser_miner::itasser::ResultsClient;
use itasser_miner::store::Workspace;

pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

pub enum MockResponse {
    Body(Vec<u8>),
    Status(u16, &'static str),
    Transport,
}

pub struct MockClient {
    pub response: MockResponse,
    pub calls: Mutex<Vec<Identifier>>,
}

impl MockClient {
    pub fn new(response: MockResponse) -> Self {
        Self {
            response,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self::new(MockResponse::Transport)
    }

    pub fn calls(&self) -> Vec<Identifier> {
        self.calls.lock().unwrap().clone()
    }
}

impl ResultsClient for MockClient {
    fn download(&self, id: &Identifier, destination: &Utf8Path) -> Result<(), MinerError> {
        self.calls.lock().unwrap().push(*id);
        match &self.response {
            MockResponse::Body(bytes) => {
                fs::write(destination.as_std_path(), bytes)
                    .map_err(|err| MinerError::Filesystem(err.to_string()))?;
                Ok(())
            }
            MockResponse::Status(status, message) => Err(MinerError::ItasserStatus {
                status: *status,
                message: message.to_string(),
            }),
            MockResponse::Transport => {
                Err(MinerError::ItasserHttp("connection reset by peer".to_string()))
            }
        }
    }
}

pub fn temp_workspace() -> (tempfile::TempDir, Workspace) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let workspace = Workspace::new_with_root(root);
    workspace.ensure_layout().unwrap();
    (temp, workspace)
}

pub fn id(raw: &str) -> Identifier {
    raw.parse().unwrap()
}

fn atom_line(serial: usize, name: &str, residue: &str, chain: char, seq: usize, pos: [f64; 3]) -> String {
    let element = &name[..1];
    format!(
        "ATOM  {serial:>5} {:<4} {residue:>3} {chain}{seq:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {element:>2}",
        format!(" {name}"),
        pos[0],
        pos[1],
        pos[2],
        1.0,
        0.0,
    )
}

/// PDB text with backbone atoms for each chain. Residues within a chain sit
/// 3.8 Å apart along x, so consecutive C and N atoms are 1.3 Å apart.
pub fn model_pdb(chains: &[(char, &[&str])]) -> String {
    let mut lines = Vec::new();
    let mut serial = 1;
    for (chain_index, (chain, residues)) in chains.iter().enumerate() {
        let y = chain_index as f64 * 30.0;
        for (index, residue) in residues.iter().enumerate() {
            let x = index as f64 * 3.8;
            for (name, offset) in [("N", 0.0), ("CA", 1.46), ("C", 2.5)] {
                lines.push(atom_line(serial, name, residue, *chain, index + 1, [x + offset, y, 0.0]));
                serial += 1;
            }
            lines.push(atom_line(serial, "O", residue, *chain, index + 1, [x + 2.5, y + 1.23, 0.0]));
            serial += 1;
        }
    }
    lines.push("END".to_string());
    lines.join("\n") + "\n"
}

pub fn archive_bytes(members: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = BzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Same members as [`archive_bytes`], but the tar stream is compressed as
/// two concatenated bzip2 streams, split after the first `split_after`
/// members.
pub fn multistream_archive_bytes(members: &[(&str, &[u8])], split_after: usize) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut split_at = 0;
    for (index, (name, data)) in members.iter().enumerate() {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        builder.append_data(&mut header, name, *data).unwrap();
        if index + 1 == split_after {
            split_at = builder.get_ref().len();
        }
    }
    let raw = builder.into_inner().unwrap();

    let mut compressed = Vec::new();
    for part in [&raw[..split_at], &raw[split_at..]] {
        let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
        std::io::Write::write_all(&mut encoder, part).unwrap();
        compressed.extend(encoder.finish().unwrap());
    }
    compressed
}

pub fn write_archive(path: &Utf8Path, members: &[(&str, &[u8])]) {
    let bytes = archive_bytes(members);
    let mut file = File::create(path.as_std_path()).unwrap();
    std::io::Write::write_all(&mut file, &bytes).unwrap();
}

pub fn mvk_archive() -> Vec<u8> {
    let pdb = model_pdb(&[('A', &["MET", "VAL", "LYS"])]);
    archive_bytes(&[("model1.pdb", pdb.as_bytes())])
}
