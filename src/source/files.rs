//! File-backed scoring inputs: finance CSV/JSON, health JSON directories

use super::ProposalSource;
use crate::error::SourceError;
use crate::input::{FinanceInput, HealthProposal};
use csv::Reader;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Raw CSV row; every column is optional text
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    proposal_number: Option<String>,
    #[serde(default)]
    proposer_id: Option<String>,
    #[serde(default)]
    annual_income: Option<String>,
    #[serde(default)]
    premium: Option<String>,
    #[serde(default)]
    sum_assured: Option<String>,
    #[serde(default)]
    other_insurance_sum_assured: Option<String>,
    #[serde(default)]
    occupation: Option<String>,
}

impl CsvRow {
    fn into_input(self) -> FinanceInput {
        let text = |v: Option<String>| v.filter(|s| !s.trim().is_empty()).map(Value::String);
        FinanceInput {
            proposal_number: self.proposal_number.unwrap_or_default().trim().to_string(),
            proposer_id: self.proposer_id.filter(|s| !s.trim().is_empty()),
            annual_income: text(self.annual_income),
            premium: text(self.premium),
            sum_assured: text(self.sum_assured),
            other_insurance_sum_assured: text(self.other_insurance_sum_assured),
            occupation: self.occupation,
        }
    }
}

fn read_text(path: &Path) -> Result<String, SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.display().to_string()));
    }
    fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_json<T: DeserializeOwned>(path: &Path, text: &str) -> Result<T, SourceError> {
    serde_json::from_str(text).map_err(|source| SourceError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Finance records read from one input location
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinanceLoad {
    pub inputs: Vec<FinanceInput>,
    /// Records or files that could not be read; the rest are kept
    pub failures: usize,
}

impl FinanceLoad {
    fn merge(&mut self, other: FinanceLoad) {
        self.inputs.extend(other.inputs);
        self.failures += other.failures;
    }
}

/// Load finance inputs from a CSV file with a header row.
/// A malformed row is logged and skipped.
pub fn load_finance_csv<P: AsRef<Path>>(path: P) -> Result<FinanceLoad, SourceError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SourceError::NotFound(path.display().to_string()));
    }
    let mut reader = Reader::from_path(path)?;
    let mut load = FinanceLoad::default();
    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        match result {
            Ok(row) => load.inputs.push(row.into_input()),
            Err(err) => {
                log::warn!("{}: skipping row {}: {}", path.display(), line + 1, err);
                load.failures += 1;
            }
        }
    }
    Ok(load)
}

/// Load finance inputs from a JSON file holding one object or an array.
/// An unreadable file fails; a malformed record in an array is logged and skipped.
pub fn load_finance_json<P: AsRef<Path>>(path: P) -> Result<FinanceLoad, SourceError> {
    let path = path.as_ref();
    let text = read_text(path)?;
    let value: Value = parse_json(path, &text)?;
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    let mut load = FinanceLoad::default();
    for (position, item) in items.into_iter().enumerate() {
        match serde_json::from_value(item) {
            Ok(input) => load.inputs.push(input),
            Err(err) => {
                log::warn!("{}: skipping record {}: {}", path.display(), position + 1, err);
                load.failures += 1;
            }
        }
    }
    Ok(load)
}

/// `*.json` files directly inside `dir`, sorted by name
pub fn json_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, SourceError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(SourceError::NotFound(dir.display().to_string()));
    }
    let entries = fs::read_dir(dir).map_err(|source| SourceError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

/// Load finance inputs from a CSV file, a JSON file, or a directory of JSON
/// files. In a directory an unreadable file counts as one failure.
pub fn load_finance_inputs<P: AsRef<Path>>(path: P) -> Result<FinanceLoad, SourceError> {
    let path = path.as_ref();
    if path.is_dir() {
        let mut load = FinanceLoad::default();
        for file in json_files(path)? {
            match load_finance_json(&file) {
                Ok(part) => load.merge(part),
                Err(err) => {
                    log::error!("skipping {}: {}", file.display(), err);
                    load.failures += 1;
                }
            }
        }
        return Ok(load);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => load_finance_csv(path),
        _ => load_finance_json(path),
    }
}

/// Read one health proposal payload
pub fn read_health_proposal<P: AsRef<Path>>(path: P) -> Result<HealthProposal, SourceError> {
    let path = path.as_ref();
    let text = read_text(path)?;
    parse_json(path, &text)
}

/// Health proposals stored one per JSON file; entity ids are the file paths
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    files: Vec<PathBuf>,
}

impl JsonDirSource {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, SourceError> {
        Ok(Self {
            files: json_files(dir)?,
        })
    }
}

impl ProposalSource<HealthProposal> for JsonDirSource {
    fn entity_ids(&self) -> Vec<String> {
        self.files.iter().map(|p| p.display().to_string()).collect()
    }

    fn fetch(&self, entity_id: &str) -> Result<HealthProposal, SourceError> {
        read_health_proposal(entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_csv() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "finance.csv",
            "proposal_number,proposer_id,annual_income,premium,sum_assured,other_insurance_sum_assured,occupation\n\
             P1,C1,\"1,000,000\",50000,5000000,0,Engineer\n\
             P2,,,1200,,,\n",
        );
        let load = load_finance_inputs(&path).unwrap();
        assert_eq!(load.failures, 0);
        let inputs = load.inputs;
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].annual_income, Some(Value::String("1,000,000".into())));
        assert_eq!(inputs[0].occupation.as_deref(), Some("Engineer"));
        assert_eq!(inputs[1].proposer_id, None);
        assert!(!inputs[1].has_field("annual_income"));
        assert!(inputs[1].has_field("premium"));
    }

    #[test]
    fn test_load_json_object_array_and_dir() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.json", r#"[{"proposal_number": 2}, {"proposal_number": 3}]"#);
        write(&dir, "a.json", r#"{"proposal_number": "1", "premium": 10}"#);
        write(&dir, "notes.txt", "ignored");

        let load = load_finance_inputs(dir.path()).unwrap();
        let ids: Vec<&str> = load.inputs.iter().map(|i| i.proposal_number.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_bad_records_do_not_drop_siblings() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.json", r#"{"proposal_number": "A1", "annual_income": 100}"#);
        write(
            &dir,
            "b.json",
            r#"[{"proposal_number": "B1", "premium": 10}, {"annual_income": 5}, 42]"#,
        );
        write(&dir, "c.json", "{oops");

        let load = load_finance_inputs(dir.path()).unwrap();
        let ids: Vec<&str> = load.inputs.iter().map(|i| i.proposal_number.as_str()).collect();
        // The record without a proposal number is kept with a blank id
        assert_eq!(ids, vec!["A1", "B1", ""]);
        // `42` in b.json and the whole of c.json
        assert_eq!(load.failures, 2);
    }

    #[test]
    fn test_malformed_csv_row_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "finance.csv",
            "proposal_number,annual_income\nP1,100\nP2,200,extra\nP3,300\n",
        );
        let load = load_finance_csv(&path).unwrap();
        let ids: Vec<&str> = load.inputs.iter().map(|i| i.proposal_number.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P3"]);
        assert_eq!(load.failures, 1);
    }

    #[test]
    fn test_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_finance_inputs(dir.path().join("nope.csv")),
            Err(SourceError::NotFound(_))
        ));
        let bad = write(&dir, "bad.json", "{oops");
        assert!(matches!(read_health_proposal(&bad), Err(SourceError::Json { .. })));
    }

    #[test]
    fn test_json_dir_source() {
        let dir = TempDir::new().unwrap();
        write(&dir, "p2.json", r#"{"proposal": {"proposal_number": "H2"}}"#);
        write(&dir, "p1.json", r#"{"proposal": {"proposal_number": "H1"}, "insured_members": []}"#);
        let source = JsonDirSource::open(dir.path()).unwrap();
        let ids = source.entity_ids();
        assert_eq!(ids.len(), 2);
        assert_eq!(source.fetch(&ids[0]).unwrap().entity_id(), "H1");
        assert_eq!(source.fetch(&ids[1]).unwrap().entity_id(), "H2");
    }
}
