use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::MinerError;

const HELIX_RESIDUES: &str = "VIYFWL";
const TURN_RESIDUES: &str = "NPGS";
const SHEET_RESIDUES: &str = "EMAL";

/// Row of `data.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub identifier: String,
    pub sequence: String,
}

/// Row of `data_extra.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub identifier: String,
    pub sequence: String,
    pub len: usize,
    pub sheet: f64,
    pub turn: f64,
    pub helix: f64,
}

/// Residue-propensity estimate of secondary-structure content.
///
/// Leucine counts toward both helix and sheet, so the three fractions do
/// not have to add up to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondaryStructure {
    pub helix: f64,
    pub turn: f64,
    pub sheet: f64,
}

pub fn secondary_structure_fraction(sequence: &str) -> SecondaryStructure {
    let total = sequence.chars().count();
    if total == 0 {
        return SecondaryStructure {
            helix: 0.0,
            turn: 0.0,
            sheet: 0.0,
        };
    }
    let fraction = |residues: &str| {
        let hits = sequence
            .chars()
            .filter(|ch| residues.contains(ch.to_ascii_uppercase()))
            .count();
        hits as f64 / total as f64
    };
    SecondaryStructure {
        helix: fraction(HELIX_RESIDUES),
        turn: fraction(TURN_RESIDUES),
        sheet: fraction(SHEET_RESIDUES),
    }
}

pub fn enrich(record: SequenceRecord) -> EnrichedRecord {
    let estimate = secondary_structure_fraction(&record.sequence);
    EnrichedRecord {
        len: record.sequence.chars().count(),
        identifier: record.identifier,
        sequence: record.sequence,
        sheet: estimate.sheet,
        turn: estimate.turn,
        helix: estimate.helix,
    }
}

pub fn read_sequences(path: &Utf8Path) -> Result<Vec<SequenceRecord>, MinerError> {
    let mut reader = csv::Reader::from_path(path.as_std_path())
        .map_err(|err| MinerError::Csv(format!("{path}: {err}")))?;
    reader
        .deserialize()
        .collect::<Result<Vec<SequenceRecord>, _>>()
        .map_err(|err| MinerError::Csv(format!("{path}: {err}")))
}

pub const DATA_HEADER: [&str; 2] = ["identifier", "sequence"];
pub const DATA_EXTRA_HEADER: [&str; 6] = ["identifier", "sequence", "len", "sheet", "turn", "helix"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_follow_residue_classes() {
        let estimate = secondary_structure_fraction("VLNE");
        assert_eq!(estimate.helix, 0.5);
        assert_eq!(estimate.turn, 0.25);
        assert_eq!(estimate.sheet, 0.5);
    }

    #[test]
    fn lowercase_counts_too() {
        let estimate = secondary_structure_fraction("gggg");
        assert_eq!(estimate.turn, 1.0);
    }

    #[test]
    fn empty_sequence_is_all_zero() {
        let record = enrich(SequenceRecord {
            identifier: "S1".to_string(),
            sequence: String::new(),
        });
        assert_eq!(record.len, 0);
        assert_eq!(record.helix, 0.0);
        assert_eq!(record.turn, 0.0);
        assert_eq!(record.sheet, 0.0);
    }
}
