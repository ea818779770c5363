use std::io::BufReader;
use std::ops::Range;

use pdbtbx::{Context, PDB, StrictnessLevel};

use crate::archive::ResultArchive;
use crate::error::MinerError;

/// The archive member holding the top-ranked model.
pub const MODEL_MEMBER: &str = "model1.pdb";

/// Longest C–N distance, in Ångström, still treated as a peptide bond.
pub const MAX_PEPTIDE_BOND: f64 = 1.8;

/// Width of a fully populated coordinate record.
const RECORD_WIDTH: usize = 80;

/// Parses a PDB byte stream into a structure. `label` only names the stream
/// in errors.
///
/// Coordinate records are run through [`normalize_record`] first, so files
/// that stop after the coordinates (or omit the chain or element) still
/// parse.
pub fn parse_model(bytes: &[u8], label: &str) -> Result<PDB, MinerError> {
    let text = String::from_utf8_lossy(bytes);
    let normalized = text
        .lines()
        .map(normalize_record)
        .collect::<Vec<_>>()
        .join("\n");
    let reader = BufReader::new(normalized.as_bytes());
    match pdbtbx::open_pdb_raw(reader, Context::None, StrictnessLevel::Loose) {
        Ok((pdb, warnings)) => {
            if !warnings.is_empty() {
                tracing::debug!(label, warnings = warnings.len(), "structure parsed with warnings");
            }
            Ok(pdb)
        }
        Err(errors) => Err(MinerError::Structure {
            label: label.to_string(),
            message: errors
                .iter()
                .map(|err| err.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        }),
    }
}

/// Fills the optional columns of an `ATOM`/`HETATM` record and pads it to
/// 80 columns. A blank chain becomes `A`, a blank occupancy `1.00`, a blank
/// B-factor `0.00`, and a blank element is taken from the atom name. Other
/// records, and coordinate records cut before the z coordinate, come back
/// unchanged.
pub fn normalize_record(line: &str) -> String {
    let line = line.trim_end_matches('\r');
    if !(line.starts_with("ATOM") || line.starts_with("HETATM")) {
        return line.to_string();
    }
    let mut columns: Vec<char> = line.chars().collect();
    if columns.len() < 54 {
        return line.to_string();
    }
    columns.resize(RECORD_WIDTH.max(columns.len()), ' ');

    if blank(&columns, 21..22) {
        columns[21] = 'A';
    }
    if blank(&columns, 54..60) {
        fill(&mut columns, 54, "  1.00");
    }
    if blank(&columns, 60..66) {
        fill(&mut columns, 60, "  0.00");
    }
    if blank(&columns, 76..78) {
        let name: String = columns[12..16].iter().collect();
        fill(&mut columns, 76, &format!("{:>2}", element_from_atom_name(&name)));
    }
    columns.into_iter().collect()
}

fn blank(columns: &[char], range: Range<usize>) -> bool {
    columns[range].iter().all(|ch| ch.is_whitespace())
}

fn fill(columns: &mut [char], start: usize, value: &str) {
    for (offset, ch) in value.chars().enumerate() {
        columns[start + offset] = ch;
    }
}

/// Element symbol implied by a four-column atom name. Names starting in the
/// first column are two-letter elements (`FE`, `CL`) except for long
/// hydrogen names; names starting in the second column are one letter.
fn element_from_atom_name(name: &str) -> String {
    let letters = name
        .chars()
        .filter(|ch| ch.is_ascii_alphabetic())
        .collect::<Vec<_>>();
    let Some(&first) = letters.first() else {
        return String::new();
    };
    let leading = name.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic());
    let long_hydrogen = first == 'H' && name.trim_end().chars().count() == 4;
    if leading && !long_hydrogen && letters.len() > 1 {
        letters[..2].iter().collect()
    } else {
        first.to_string()
    }
}

/// The bits of a residue the peptide builder looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueView {
    pub name: String,
    pub n: Option<[f64; 3]>,
    pub c: Option<[f64; 3]>,
}

/// A run of standard amino acids joined by peptide bonds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peptide {
    residues: Vec<char>,
}

impl Peptide {
    pub fn sequence(&self) -> String {
        self.residues.iter().collect()
    }
}

/// Residues of the first model, grouped by chain in file order.
pub fn chains_of_first_model(pdb: &PDB) -> Vec<Vec<ResidueView>> {
    let Some(model) = pdb.models().next() else {
        return Vec::new();
    };
    model
        .chains()
        .map(|chain| {
            chain
                .residues()
                .map(|residue| {
                    let mut view = ResidueView {
                        name: residue.name().unwrap_or_default().to_string(),
                        n: None,
                        c: None,
                    };
                    for atom in residue.atoms() {
                        let (x, y, z) = atom.pos();
                        match atom.name() {
                            "N" if view.n.is_none() => view.n = Some([x, y, z]),
                            "C" if view.c.is_none() => view.c = Some([x, y, z]),
                            _ => {}
                        }
                    }
                    view
                })
                .collect()
        })
        .collect()
}

/// Splits chains into peptides. Only standard amino acids are accepted; a
/// peptide continues while the previous residue's C is within
/// [`MAX_PEPTIDE_BOND`] of the next residue's N.
pub fn build_peptides(chains: &[Vec<ResidueView>]) -> Vec<Peptide> {
    let mut peptides = Vec::new();
    for chain in chains {
        let mut current: Vec<char> = Vec::new();
        let mut previous: Option<&ResidueView> = None;
        for residue in chain {
            let Some(code) = one_letter_code(&residue.name) else {
                flush(&mut peptides, &mut current);
                previous = None;
                continue;
            };
            let joined = previous.is_some_and(|prev| is_connected(prev, residue));
            if !joined {
                flush(&mut peptides, &mut current);
            }
            current.push(code);
            previous = Some(residue);
        }
        flush(&mut peptides, &mut current);
    }
    peptides
}

fn flush(peptides: &mut Vec<Peptide>, current: &mut Vec<char>) {
    if !current.is_empty() {
        peptides.push(Peptide {
            residues: std::mem::take(current),
        });
    }
}

fn is_connected(previous: &ResidueView, next: &ResidueView) -> bool {
    match (previous.c, next.n) {
        (Some(c), Some(n)) => distance(c, n) < MAX_PEPTIDE_BOND,
        _ => false,
    }
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

pub fn one_letter_code(residue_name: &str) -> Option<char> {
    let code = match residue_name.trim().to_ascii_uppercase().as_str() {
        "ALA" => 'A',
        "ARG" => 'R',
        "ASN" => 'N',
        "ASP" => 'D',
        "CYS" => 'C',
        "GLN" => 'Q',
        "GLU" => 'E',
        "GLY" => 'G',
        "HIS" => 'H',
        "ILE" => 'I',
        "LEU" => 'L',
        "LYS" => 'K',
        "MET" => 'M',
        "PHE" => 'F',
        "PRO" => 'P',
        "SER" => 'S',
        "THR" => 'T',
        "TRP" => 'W',
        "TYR" => 'Y',
        "VAL" => 'V',
        _ => return None,
    };
    Some(code)
}

/// Sequence of the first peptide in a PDB stream, or `None` when the model
/// holds no standard amino acids.
///
/// Later peptides (further chains, or fragments after a chain break) are
/// dropped, so multi-chain targets come back incomplete.
pub fn sequence_from_model(bytes: &[u8], label: &str) -> Result<Option<String>, MinerError> {
    let pdb = parse_model(bytes, label)?;
    let peptides = build_peptides(&chains_of_first_model(&pdb));
    if peptides.len() > 1 {
        tracing::debug!(label, peptides = peptides.len(), "keeping the first peptide only");
    }
    Ok(peptides.first().map(Peptide::sequence))
}

/// Pulls [`MODEL_MEMBER`] out of an opened archive and derives its
/// sequence. A missing or unparsable member is warned about and yields
/// `None`. The archive is consumed.
pub fn sequence_from_archive(archive: ResultArchive, label: &str) -> Option<String> {
    let stream = match archive.member(MODEL_MEMBER) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!(archive = %archive.path(), "{err}");
            return None;
        }
    };
    match sequence_from_model(stream, label) {
        Ok(sequence) => sequence,
        Err(err) => {
            tracing::warn!(archive = %archive.path(), "{err}");
            None
        }
    }
}
