use thiserror::Error;

/// Faults raised by individual workflow stages. The engine never
/// propagates these to the caller; each variant has a documented
/// fallback that lets the run continue to a user-facing outcome.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StageFault {
    #[error("intent classification failed: {0}")]
    Classification(String),
    #[error("parameter extraction failed: {0}")]
    Extraction(String),
    #[error("parameter validation failed: {0}")]
    Validation(String),
    #[error("tool invocation failed: {0}")]
    ToolInvocation(String),
    #[error("clarification generation failed: {0}")]
    Clarification(String),
}

impl StageFault {
    /// Stage name for structured log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Classification(_) => "classify_intent",
            Self::Extraction(_) => "extract_parameters",
            Self::Validation(_) => "validate",
            Self::ToolInvocation(_) => "execute_tool",
            Self::Clarification(_) => "clarify",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StageFault;

    #[test]
    fn display_includes_stage_context_and_cause() {
        let fault = StageFault::Extraction("gateway returned malformed JSON".to_string());
        assert_eq!(
            fault.to_string(),
            "parameter extraction failed: gateway returned malformed JSON"
        );
        assert_eq!(fault.stage(), "extract_parameters");
    }

    #[test]
    fn every_variant_maps_to_a_stage_name() {
        let faults = [
            StageFault::Classification(String::new()),
            StageFault::Extraction(String::new()),
            StageFault::Validation(String::new()),
            StageFault::ToolInvocation(String::new()),
            StageFault::Clarification(String::new()),
        ];
        let stages: Vec<_> = faults.iter().map(StageFault::stage).collect();
        assert_eq!(
            stages,
            vec!["classify_intent", "extract_parameters", "validate", "execute_tool", "clarify"]
        );
    }
}
