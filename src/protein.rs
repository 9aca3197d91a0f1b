use std::fmt::{Display, Formatter};

/// Input record for one simulated protein.
#[derive(Clone, Debug, PartialEq)]
pub struct ProteinRecord {
    name: String,
    sequence: Vec<char>,
    temperature: f64, // Kelvin
    ph: f64,
    ionic_strength: f64, // molar
}

/// Drops every whitespace character so multi-line sequence literals read as one chain.
pub fn normalize_sequence(fasta: &str) -> Vec<char> {
    fasta.chars().filter(|c| !c.is_whitespace()).collect()
}

impl ProteinRecord {
    pub fn new(
        name: impl Into<String>,
        fasta: &str,
        temperature: f64,
        ph: f64,
        ionic_strength: f64,
    ) -> ProteinRecord {
        ProteinRecord {
            name: name.into(),
            sequence: normalize_sequence(fasta),
            temperature,
            ph,
            ionic_strength,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence(&self) -> &[char] {
        &self.sequence
    }

    pub fn sequence_string(&self) -> String {
        self.sequence.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn ph(&self) -> f64 {
        self.ph
    }

    pub fn ionic_strength(&self) -> f64 {
        self.ionic_strength
    }
}

impl Display for ProteinRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} residues, {} K, pH {}, {} M)",
            self.name,
            self.sequence.len(),
            self.temperature,
            self.ph,
            self.ionic_strength
        )
    }
}
