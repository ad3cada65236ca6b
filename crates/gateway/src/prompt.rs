//! Prompt builders for the three gateway calls. Each prompt carries the
//! learner profile, a bounded slice of recent history, and a strict
//! instruction about the reply shape so the parsers stay simple.

use std::fmt::Write;

use mentor_core::{ChatMessage, LearnerProfile, ToolKind};

/// Turns of history forwarded with a classification call.
pub const CLASSIFY_HISTORY_WINDOW: usize = 5;
/// Turns of history forwarded with an extraction call.
pub const EXTRACT_HISTORY_WINDOW: usize = 10;

pub fn classification_prompt(
    message: &str,
    history: &[ChatMessage],
    profile: &LearnerProfile,
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are an educational assistant. Decide which tool the student needs."
    );
    push_profile(&mut prompt, profile);
    push_history(&mut prompt, history, CLASSIFY_HISTORY_WINDOW);
    let _ = writeln!(prompt, "\nCurrent message: \"{message}\"\n");
    let _ = writeln!(
        prompt,
        "Available tools:\n\
         1. note_maker - study notes, summaries, study guides\n\
         2. flashcard_generator - practice questions, flashcards, quiz material\n\
         3. concept_explainer - explanations, \"what is\" or \"how does\" questions\n\n\
         Rules:\n\
         - \"notes\", \"summary\", \"study guide\", \"write down\" -> note_maker\n\
         - \"flashcards\", \"questions\", \"quiz\", \"practice\", \"test me\" -> flashcard_generator\n\
         - \"explain\", \"what is\", \"how does\", \"why\", \"understand\", \"confused about\" -> concept_explainer\n\n\
         Reply with ONLY the tool name (note_maker, flashcard_generator, or concept_explainer)."
    );
    prompt
}

pub fn extraction_prompt(
    tool: ToolKind,
    message: &str,
    history: &[ChatMessage],
    profile: &LearnerProfile,
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You extract structured request fields for the {} tool.",
        tool.display_name()
    );
    push_profile(&mut prompt, profile);
    push_history(&mut prompt, history, EXTRACT_HISTORY_WINDOW);
    let _ = writeln!(prompt, "\nCurrent message: \"{message}\"\n");

    match tool {
        ToolKind::NoteMaker => push_note_maker_fields(&mut prompt),
        ToolKind::FlashcardGenerator => push_flashcard_fields(&mut prompt),
        ToolKind::ConceptExplainer => push_concept_explainer_fields(&mut prompt),
    }

    let _ = writeln!(
        prompt,
        "\nBesides the field values, the JSON object must contain:\n\
         - \"inferred\": array with the names of fields you inferred rather than read\n\
         - \"missing\": array with the names of required fields you could not resolve\n\
         - \"confidence\": number between 0.0 and 1.0\n\n\
         Reply with ONLY valid JSON, no explanation and no code fences."
    );
    prompt
}

pub fn clarification_prompt(missing: &[String], tool: ToolKind, message: &str) -> String {
    format!(
        "A student asked: \"{message}\"\n\
         We want to run the {} tool but still need: {}.\n\n\
         Write one short, friendly question asking for exactly that information.\n\
         Stay conversational; do not use technical words like \"parameters\" or field names.\n\
         Reply with ONLY the question.",
        tool.display_name(),
        missing.join(", "),
    )
}

fn push_profile(prompt: &mut String, profile: &LearnerProfile) {
    let _ = writeln!(
        prompt,
        "\nStudent profile:\n\
         - Name: {}\n\
         - Grade: {}\n\
         - Learning style: {}\n\
         - Emotional state: {}\n\
         - Mastery level: {}\n\
         - Teaching style: {}",
        profile.name,
        profile.grade_level,
        profile.learning_style_summary,
        profile.emotional_state_summary,
        profile.mastery_level_summary,
        profile.teaching_style.as_str(),
    );
}

fn push_history(prompt: &mut String, history: &[ChatMessage], window: usize) {
    let _ = writeln!(prompt, "\nRecent conversation:");
    let start = history.len().saturating_sub(window);
    if history[start..].is_empty() {
        let _ = writeln!(prompt, "(none)");
    }
    for message in &history[start..] {
        let _ = writeln!(prompt, "{}: {}", message.role.as_str(), message.content);
    }
}

fn push_note_maker_fields(prompt: &mut String) {
    let _ = writeln!(
        prompt,
        "Required fields:\n\
          1. topic - main topic for the notes\n\
          2. subject - academic subject (e.g. Biology, Math, History)\n\
          3. note_taking_style - one of: outline, bullet_points, narrative, structured\n\
         Optional fields:\n\
          4. include_examples - true/false (default true)\n\
          5. include_analogies - true/false (default false)\n\n\
         Inference rules:\n\
         - learning style mentions \"visual\" or \"imagery\" -> include_analogies: true\n\
         - emotional state \"confused\" or \"anxious\" -> note_taking_style: bullet_points (simpler)\n\
         - low mastery (tiers 1-3) -> include_examples: true and include_analogies: true\n\
         - subject not stated -> infer it from the topic (e.g. photosynthesis -> Biology)"
    );
}

fn push_flashcard_fields(prompt: &mut String) {
    let _ = writeln!(
        prompt,
        "Required fields:\n\
          1. topic - topic for the flashcards\n\
          2. count - number of flashcards, integer 1-20\n\
          3. difficulty - one of: easy, medium, hard\n\
          4. subject - academic subject\n\
         Optional fields:\n\
          5. include_examples - true/false (default true)\n\n\
         Inference rules:\n\
         - \"struggling\", \"confused\", \"don't understand\" -> difficulty: easy\n\
         - \"confident\", \"challenge me\", \"ready\" -> difficulty: hard\n\
         - \"few\", \"quick\", \"some\" -> count: 5; \"many\", \"lots\", \"thorough\" -> count: 15\n\
         - mastery tiers 1-3 -> easy; 4-6 -> medium; 7-10 -> medium or hard from message tone\n\
         - emotional state \"anxious\" or \"confused\" -> reduce difficulty by one level\n\
         - subject not stated -> infer it from the topic"
    );
}

fn push_concept_explainer_fields(prompt: &mut String) {
    let _ = writeln!(
        prompt,
        "Required fields:\n\
          1. concept_to_explain - the specific concept to explain\n\
          2. current_topic - broader topic or subject context\n\
          3. desired_depth - one of: basic, intermediate, advanced, comprehensive\n\n\
         Inference rules:\n\
         - mastery tiers 1-3 -> basic; 4-6 -> intermediate; 7-9 -> advanced; 10 -> comprehensive\n\
         - emotional state \"confused\" or \"anxious\" -> reduce depth by one level\n\
         - emotional state \"focused\" or \"motivated\" -> increase depth by one level\n\
         - question words carry the concept: \"what is X\" -> concept_to_explain: X\n\
         - infer current_topic from history context or from the concept itself"
    );
}

#[cfg(test)]
mod tests {
    use mentor_core::{ChatMessage, LearnerId, LearnerProfile, TeachingStyle, ToolKind};

    use super::{classification_prompt, clarification_prompt, extraction_prompt};

    fn profile() -> LearnerProfile {
        LearnerProfile {
            learner_id: LearnerId("learner-1".to_string()),
            name: "Ada".to_string(),
            grade_level: "9".to_string(),
            learning_style_summary: "visual learner".to_string(),
            emotional_state_summary: "confused".to_string(),
            mastery_level_summary: "level 4".to_string(),
            teaching_style: TeachingStyle::Visual,
        }
    }

    #[test]
    fn classification_prompt_lists_all_three_tools() {
        let prompt = classification_prompt("make me notes", &[], &profile());
        for name in ["note_maker", "flashcard_generator", "concept_explainer"] {
            assert!(prompt.contains(name), "prompt should mention {name}");
        }
        assert!(prompt.contains("make me notes"));
    }

    #[test]
    fn history_is_bounded_to_the_window() {
        let history: Vec<ChatMessage> =
            (0..12).map(|index| ChatMessage::user(format!("turn {index}"))).collect();

        let prompt = classification_prompt("hello", &history, &profile());

        assert!(!prompt.contains("turn 6"), "older turns should be dropped");
        assert!(prompt.contains("turn 7"));
        assert!(prompt.contains("turn 11"));
    }

    #[test]
    fn extraction_prompt_demands_machine_parseable_reply() {
        for tool in ToolKind::ALL {
            let prompt = extraction_prompt(tool, "help me", &[], &profile());
            assert!(prompt.contains("\"confidence\""));
            assert!(prompt.contains("\"missing\""));
            assert!(prompt.contains("\"inferred\""));
            assert!(prompt.contains("ONLY valid JSON"));
        }
    }

    #[test]
    fn clarification_prompt_forbids_internal_vocabulary() {
        let prompt = clarification_prompt(
            &["current_topic".to_string()],
            ToolKind::ConceptExplainer,
            "explain entropy",
        );
        assert!(prompt.contains("current_topic"));
        assert!(prompt.contains("do not use technical words"));
    }
}
