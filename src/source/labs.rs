//! Lab values from matched documents
//!
//! Each document may carry a JSON payload of extracted fields, either as a
//! JSON string or an already-parsed object. Recognised marker keys are copied
//! into one flat map; later documents override earlier ones.

use super::LabSource;
use crate::input::{Document, HealthProposal, LabValues};
use serde_json::Value;

/// Keys copied out of an extracted-data payload
pub const LAB_KEYS: &[&str] = &[
    "hemoglobin",
    "hb",
    "wbc",
    "white_blood_cell",
    "platelets",
    "mcv",
    "hb_low_flag",
    "mcv_low_flag",
    "rdw_high_flag",
];

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// The document's payload: `extracted_data`, else `processed_extracted_data`
fn payload(doc: &Document) -> Option<Result<Value, serde_json::Error>> {
    let raw = [&doc.extracted_data, &doc.processed_extracted_data]
        .into_iter()
        .flatten()
        .find(|v| !is_blank(v))?;
    match raw {
        Value::String(text) => Some(serde_json::from_str(text)),
        other => Some(Ok(other.clone())),
    }
}

/// Merge lab values from all documents, in order
pub fn labs_from_documents(documents: &[Document]) -> LabValues {
    let mut labs = LabValues::new();
    for (index, doc) in documents.iter().enumerate() {
        let data = match payload(doc) {
            None => continue,
            Some(Ok(Value::Object(map))) => map,
            Some(Ok(_)) => {
                log::warn!("document {}: extracted data is not an object, skipped", index);
                continue;
            }
            Some(Err(err)) => {
                log::warn!("document {}: malformed extracted data skipped: {}", index, err);
                continue;
            }
        };
        for key in LAB_KEYS {
            if let Some(value) = data.get(*key).filter(|v| !v.is_null()) {
                labs.insert(key.to_string(), value.clone());
            }
        }
    }
    labs
}

/// Lab source reading the proposal's own documents
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentLabs;

impl LabSource for DocumentLabs {
    fn lab_values(&self, proposal: &HealthProposal) -> LabValues {
        labs_from_documents(&proposal.documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(extracted: Value) -> Document {
        Document {
            extracted_data: Some(extracted),
            ..Default::default()
        }
    }

    #[test]
    fn test_string_and_object_payloads() {
        let docs = vec![
            doc(json!("{\"hb\": 12.1, \"mcv\": 85, \"patient\": \"x\"}")),
            doc(json!({"platelets": "310", "hb_low_flag": true})),
        ];
        let labs = labs_from_documents(&docs);
        assert_eq!(labs.get("hb"), Some(&json!(12.1)));
        assert_eq!(labs.get("platelets"), Some(&json!("310")));
        assert_eq!(labs.get("hb_low_flag"), Some(&json!(true)));
        assert!(!labs.contains_key("patient"));
    }

    #[test]
    fn test_later_documents_override() {
        let docs = vec![doc(json!({"wbc": 5.0})), doc(json!({"wbc": 9.5, "mcv": null}))];
        let labs = labs_from_documents(&docs);
        assert_eq!(labs.get("wbc"), Some(&json!(9.5)));
        assert!(!labs.contains_key("mcv"));
    }

    #[test]
    fn test_malformed_and_fallback_payloads() {
        let docs = vec![
            doc(json!("{not json")),
            doc(json!([1, 2, 3])),
            Document {
                extracted_data: Some(json!("")),
                processed_extracted_data: Some(json!("{\"mcv\": 77}")),
                ..Default::default()
            },
            Document::default(),
        ];
        let labs = labs_from_documents(&docs);
        assert_eq!(labs.len(), 1);
        assert_eq!(labs.get("mcv"), Some(&json!(77)));
    }
}
