use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LearnerId(pub String);

/// Preferred teaching approach, chosen by the learner or their teacher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeachingStyle {
    #[default]
    Direct,
    Socratic,
    Visual,
    FlippedClassroom,
}

impl TeachingStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Socratic => "socratic",
            Self::Visual => "visual",
            Self::FlippedClassroom => "flipped_classroom",
        }
    }
}

/// Learner profile supplied by the caller. Read-only for the duration of
/// a run; the free-text summaries feed the extraction heuristics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub learner_id: LearnerId,
    pub name: String,
    pub grade_level: String,
    pub learning_style_summary: String,
    pub emotional_state_summary: String,
    pub mastery_level_summary: String,
    #[serde(default)]
    pub teaching_style: TeachingStyle,
}

#[cfg(test)]
mod tests {
    use super::{LearnerId, LearnerProfile, TeachingStyle};

    #[test]
    fn teaching_style_defaults_to_direct() {
        assert_eq!(TeachingStyle::default(), TeachingStyle::Direct);
    }

    #[test]
    fn profile_deserializes_without_teaching_style() {
        let profile: LearnerProfile = serde_json::from_str(
            r#"{
                "learner_id": "learner-1",
                "name": "Ada",
                "grade_level": "9",
                "learning_style_summary": "prefers worked examples",
                "emotional_state_summary": "focused",
                "mastery_level_summary": "level 6 of 10"
            }"#,
        )
        .expect("deserialize profile");

        assert_eq!(profile.learner_id, LearnerId("learner-1".to_string()));
        assert_eq!(profile.teaching_style, TeachingStyle::Direct);
    }
}
