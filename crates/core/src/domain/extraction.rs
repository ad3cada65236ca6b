use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::tool::ToolKind;

/// Candidate field values recovered for the chosen tool, with extraction
/// metadata. Created once per run by the extraction stage; the missing
/// list is overwritten once by the validator, which is authoritative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterBundle {
    pub tool: ToolKind,
    /// All candidate values, explicit and inferred merged.
    pub fields: BTreeMap<String, Value>,
    /// Fields that were inferred rather than stated, with the rendered
    /// value they were given.
    pub inferred: BTreeMap<String, String>,
    pub confidence: f64,
    pub missing_required: Vec<String>,
}

impl ParameterBundle {
    pub fn new(
        tool: ToolKind,
        fields: BTreeMap<String, Value>,
        inferred: BTreeMap<String, String>,
        confidence: f64,
        missing_required: Vec<String>,
    ) -> Self {
        Self { tool, fields, inferred, confidence: clamp_confidence(confidence), missing_required }
    }

    /// Fallback bundle when extraction produced no usable signal:
    /// confidence 0.0 and every required field reported missing, so the
    /// run is routed to clarification.
    pub fn no_signal(tool: ToolKind, missing_required: Vec<String>) -> Self {
        Self {
            tool,
            fields: BTreeMap::new(),
            inferred: BTreeMap::new(),
            confidence: 0.0,
            missing_required,
        }
    }

    /// Values taken verbatim from the learner's text, i.e. the candidate
    /// map minus inferred keys. Used for the extraction audit record.
    pub fn explicit_fields(&self) -> BTreeMap<String, Value> {
        self.fields
            .iter()
            .filter(|(name, _)| !self.inferred.contains_key(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::ParameterBundle;
    use crate::domain::tool::ToolKind;

    #[test]
    fn confidence_is_clamped_into_unit_interval() {
        let bundle = ParameterBundle::new(
            ToolKind::NoteMaker,
            BTreeMap::new(),
            BTreeMap::new(),
            1.7,
            Vec::new(),
        );
        assert_eq!(bundle.confidence, 1.0);

        let bundle = ParameterBundle::new(
            ToolKind::NoteMaker,
            BTreeMap::new(),
            BTreeMap::new(),
            f64::NAN,
            Vec::new(),
        );
        assert_eq!(bundle.confidence, 0.0);
    }

    #[test]
    fn no_signal_bundle_has_zero_confidence_and_empty_fields() {
        let bundle = ParameterBundle::no_signal(
            ToolKind::FlashcardGenerator,
            vec!["topic".to_string(), "count".to_string()],
        );
        assert_eq!(bundle.confidence, 0.0);
        assert!(bundle.fields.is_empty());
        assert_eq!(bundle.missing_required, vec!["topic", "count"]);
    }

    #[test]
    fn explicit_fields_exclude_inferred_keys() {
        let mut fields = BTreeMap::new();
        fields.insert("topic".to_string(), json!("photosynthesis"));
        fields.insert("subject".to_string(), json!("Biology"));
        let mut inferred = BTreeMap::new();
        inferred.insert("subject".to_string(), "Biology".to_string());

        let bundle =
            ParameterBundle::new(ToolKind::NoteMaker, fields, inferred, 0.9, Vec::new());

        let explicit = bundle.explicit_fields();
        assert!(explicit.contains_key("topic"));
        assert!(!explicit.contains_key("subject"));
    }
}
