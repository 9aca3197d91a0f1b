use crate::error::{Result, SubmitError};
use crate::protein::ProteinRecord;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const FASTA_A1: &str = "GSMASASSSQRGRSGSGNFGGGRGGGFGGNDNFGRGGNFSGRGGFGGSRGGGGYGGSGDGYNGFGNDGSNFGGGGSYNDFGNYNNQ
SSNFGPMKGGNFGGRSSGGSGGGGQYFAKPRNQGGYGGSSSSSSYGSGRRF";

const FASTA_A1NLS: &str = "GSMASASSSQRGRSGSGNFGGGRGGGFGGNDNFGRGGNFSGRGGFGGSRGGGGYGGSGDGYNGFGNDGSNFGGGGSYNDFGNYNNQ
SSNFGPMKGGNFGGRSSGPYGGGGQYFAKPRNQGGYGGSSSSSSYGSGRRF";

const FASTA_NEWSEQ: &str = "INSERT YOUR SEQUENCE HERE";

pub const DEFAULT_TEMPERATURE: f64 = 298.0;
pub const DEFAULT_PH: f64 = 7.0;
pub const DEFAULT_IONIC_STRENGTH: f64 = 0.15;

/// One line of the serialized record file. The column names are read by the simulation driver.
#[derive(Debug, Serialize, Deserialize)]
struct RecordRow {
    name: String,
    temp: f64,
    #[serde(rename = "pH")]
    ph: f64,
    ionic: f64,
    fasta: String,
}

impl From<&ProteinRecord> for RecordRow {
    fn from(record: &ProteinRecord) -> Self {
        RecordRow {
            name: record.name().to_string(),
            temp: record.temperature(),
            ph: record.ph(),
            ionic: record.ionic_strength(),
            fasta: record.sequence_string(),
        }
    }
}

impl From<RecordRow> for ProteinRecord {
    fn from(row: RecordRow) -> Self {
        ProteinRecord::new(row.name, &row.fasta, row.temp, row.ph, row.ionic)
    }
}

/// Protein records keyed by their unique name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProteinTable {
    records: BTreeMap<String, ProteinRecord>,
}

impl ProteinTable {
    pub fn new() -> ProteinTable {
        ProteinTable {
            records: BTreeMap::new(),
        }
    }

    /// The hnRNPA1 low-complexity domain constructs plus a placeholder slot for a new sequence.
    pub fn builtin() -> ProteinTable {
        let mut table = ProteinTable::new();
        for (name, fasta) in [
            ("A1", FASTA_A1),
            ("A1NLS", FASTA_A1NLS),
            ("NEWSEQ", FASTA_NEWSEQ),
        ] {
            table.insert(ProteinRecord::new(
                name,
                fasta,
                DEFAULT_TEMPERATURE,
                DEFAULT_PH,
                DEFAULT_IONIC_STRENGTH,
            ));
        }
        table
    }

    /// Inserts a record, replacing and returning any record with the same name.
    pub fn insert(&mut self, record: ProteinRecord) -> Option<ProteinRecord> {
        let previous = self.records.insert(record.name().to_string(), record);
        if let Some(ref replaced) = previous {
            warn!("replacing record for protein {}", replaced.name());
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<&ProteinRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProteinRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes the table as CSV, replacing whatever file is at `path`.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if path.exists() {
            warn!("overwriting existing record file {}", path.display());
        }
        let mut writer = csv::Writer::from_path(path)?;
        for record in self.records.values() {
            writer.serialize(RecordRow::from(record))?;
        }
        writer.flush().map_err(|e| SubmitError::io(path, e))?;
        info!(
            "wrote {} protein records to {}",
            self.records.len(),
            path.display()
        );
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<ProteinTable> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut table = ProteinTable::new();
        for row in reader.deserialize::<RecordRow>() {
            table.insert(ProteinRecord::from(row?));
        }
        debug!("read {} protein records from {}", table.len(), path.display());
        Ok(table)
    }
}

impl Extend<ProteinRecord> for ProteinTable {
    fn extend<T: IntoIterator<Item = ProteinRecord>>(&mut self, iter: T) {
        for record in iter {
            self.insert(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn builtin_sequence_lengths_match_literals() {
        let table = ProteinTable::builtin();
        for (name, fasta) in [
            ("A1", FASTA_A1),
            ("A1NLS", FASTA_A1NLS),
            ("NEWSEQ", FASTA_NEWSEQ),
        ] {
            let expected = fasta.chars().filter(|c| !c.is_whitespace()).count();
            assert_eq!(table.get(name).unwrap().len(), expected, "{}", name);
        }
        assert_eq!(table.get("A1").unwrap().len(), 137);
    }

    #[test]
    fn insert_replaces_existing_name() {
        let mut table = ProteinTable::builtin();
        let previous = table.insert(ProteinRecord::new("NEWSEQ", "MKV", 310.0, 7.4, 0.1));
        assert_eq!(previous.unwrap().sequence_string(), "INSERTYOURSEQUENCEHERE");
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("NEWSEQ").unwrap().temperature(), 310.0);
    }

    #[test]
    fn csv_has_stable_schema_and_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("proteins.csv");
        let table = ProteinTable::builtin();
        table.write_csv(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("name,temp,pH,ionic,fasta"));
        assert_eq!(lines.count(), 3);

        let read = ProteinTable::read_csv(&path).unwrap();
        assert_eq!(read, table);
    }

    #[test]
    fn csv_write_overwrites_previous_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("proteins.csv");
        fs::write(&path, "stale content that is much longer than a single record\n".repeat(50))
            .unwrap();

        let mut table = ProteinTable::new();
        table.insert(ProteinRecord::new("P", "MK", 298.0, 7.0, 0.15));
        table.write_csv(&path).unwrap();

        let read = ProteinTable::read_csv(&path).unwrap();
        assert_eq!(read.len(), 1);
        assert!(read.contains("P"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let result = ProteinTable::read_csv(&dir.path().join("absent.csv"));
        assert!(matches!(result, Err(SubmitError::Csv(_))));
    }
}
