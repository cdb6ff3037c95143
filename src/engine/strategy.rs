//! Strategy derivation for adaptive question and hint generation.
//!
//! Derivation is a pure function of a profile snapshot: a fixed profile
//! always yields the same strategy. Only the provider call downstream is
//! effectful.

use crate::engine::types::{
    ContextualFraming, DifficultyProgression, GeneratedQuestion, HintStrategy, LearningState,
    LearningStyle, QuestionStrategy, UserBehaviorProfile,
};

const DEFAULT_TARGET_DOMAIN: &str = "mathematical_reasoning";
const DEFAULT_HINT_TYPE: &str = "conceptual";

pub fn learning_state(profile: &UserBehaviorProfile, domain: &str) -> LearningState {
    let mastery = profile.domain_preference(domain).unwrap_or(0.5);
    LearningState {
        current_mastery: mastery,
        fatigue_level: profile.cognitive_patterns.fatigue_indicators.performance_decline,
        motivation_level: profile.motivational_profile.feedback_sensitivity,
        optimal_difficulty: mastery + 0.2,
    }
}

/// Derive the generation strategy for one question. A caller-requested
/// domain overrides the weakest-domain targeting; everything else is a pure
/// function of the profile snapshot.
pub fn derive_strategy(
    profile: &UserBehaviorProfile,
    requested_domain: Option<&str>,
) -> QuestionStrategy {
    QuestionStrategy {
        target_weakness: requested_domain
            .filter(|domain| !domain.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| target_weakness(profile)),
        difficulty_progression: if profile.motivational_profile.challenge_preference
            == crate::engine::types::ChallengePreference::Steep
        {
            DifficultyProgression::Exponential
        } else {
            DifficultyProgression::AdaptiveSpiral
        },
        contextual_framing: optimal_framing(profile),
        multimodal_approach: profile.learning_style == LearningStyle::Mixed,
        real_world_application: profile.metacognitive_awareness.reflective_thinking > 0.7,
        collaborative_elements: profile.motivational_profile.gamification_response > 0.6,
    }
}

/// Domain with the lowest preference score; ties break on first encounter
/// in insertion-independent order, so candidates are scanned sorted by name
/// to keep the result deterministic across runs.
fn target_weakness(profile: &UserBehaviorProfile) -> String {
    let mut domains: Vec<(&String, &f64)> = profile
        .cognitive_patterns
        .domain_preferences
        .iter()
        .collect();
    domains.sort_by(|a, b| a.0.cmp(b.0));

    let mut weakest: Option<(&str, f64)> = None;
    for (domain, score) in domains {
        match weakest {
            Some((_, lowest)) if *score >= lowest => {}
            _ => weakest = Some((domain, *score)),
        }
    }

    weakest
        .map(|(domain, _)| domain.to_string())
        .unwrap_or_else(|| DEFAULT_TARGET_DOMAIN.to_string())
}

fn optimal_framing(profile: &UserBehaviorProfile) -> ContextualFraming {
    if profile.metacognitive_awareness.reflective_thinking > 0.7 {
        ContextualFraming::AnalyticalFramework
    } else if profile.motivational_profile.gamification_response > 0.6 {
        ContextualFraming::GamifiedScenario
    } else {
        ContextualFraming::PracticalApplication
    }
}

pub fn derive_hint_strategy(profile: &UserBehaviorProfile) -> HintStrategy {
    HintStrategy {
        hint_type: profile
            .cognitive_patterns
            .hint_usage_patterns
            .preferred_hint_types
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_HINT_TYPE.to_string()),
        complexity: if profile.metacognitive_awareness.self_regulation_skills > 0.6 {
            "high".to_string()
        } else {
            "moderate".to_string()
        },
        timing: if profile
            .cognitive_patterns
            .response_time_distribution
            .is_empty()
        {
            "delayed".to_string()
        } else {
            "immediate".to_string()
        },
    }
}

pub fn question_prompt(
    strategy: &QuestionStrategy,
    state: &LearningState,
    profile: &UserBehaviorProfile,
) -> String {
    format!(
        r#"Generate an adaptive assessment question based on the following behavioral profile:

Learning Style: {style}
Challenge Preference: {challenge}
Target Weakness: {weakness}
Current Mastery: {mastery:.2}
Optimal Difficulty: {difficulty:.2}
Difficulty Progression: {progression}
Contextual Framing: {framing}

Requirements:
- Create a question that matches the user's learning style
- Include appropriate difficulty level based on their progression preference
- Provide multiple choice options
- Include explanation and learning objectives
- Suggest follow-up questions for deeper assessment

Return as JSON with fields:
{{
  "questionText": "...",
  "options": ["A", "B", "C", "D"],
  "correctAnswer": "...",
  "explanation": "...",
  "targetedDomains": [...],
  "estimatedDifficulty": number,
  "learningObjectives": [...],
  "followUpSuggestions": [...]
}}"#,
        style = profile.learning_style.as_str(),
        challenge = profile.motivational_profile.challenge_preference.as_str(),
        weakness = strategy.target_weakness,
        mastery = state.current_mastery,
        difficulty = state.optimal_difficulty,
        progression = strategy.difficulty_progression.as_str(),
        framing = strategy.contextual_framing.as_str(),
    )
}

pub fn hint_prompt(
    strategy: &HintStrategy,
    question_id: Option<&str>,
    context: &serde_json::Value,
) -> String {
    format!(
        "Generate personalized learning hints based on:\n\
         Hint Type: {}\n\
         Complexity Level: {}\n\
         Question: {}\n\
         Context: {}\n\n\
         Provide 3 progressive hints that guide without giving away the answer.",
        strategy.hint_type,
        strategy.complexity,
        question_id.unwrap_or("unspecified"),
        context
    )
}

/// Parse the provider's reply. Anything that is not the expected JSON shape
/// counts as a generation failure.
pub fn parse_generated_question(raw: &str) -> Result<GeneratedQuestion, serde_json::Error> {
    let trimmed = strip_code_fences(raw);
    let question: GeneratedQuestion = serde_json::from_str(trimmed)?;
    Ok(question)
}

/// Split provider hint text into exactly 3 non-empty lines; fewer than 3
/// usable lines counts as a failed generation.
pub fn parse_hints(raw: &str) -> Option<[String; 3]> {
    let hints: Vec<String> = raw
        .lines()
        .map(|line| line.trim().trim_start_matches(['-', '*', ' ']).to_string())
        .filter(|line| !line.is_empty())
        .take(3)
        .collect();
    let [a, b, c] = hints.try_into().ok()?;
    Some([a, b, c])
}

/// Providers wrap JSON in markdown fences often enough to handle it here.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|inner| inner.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Well-formed static question served when the provider is unreachable or
/// returns garbage, so the adaptive surface never fails outward.
pub fn fallback_question(strategy: &QuestionStrategy) -> GeneratedQuestion {
    GeneratedQuestion {
        question_text: "A sequence doubles at every step starting from 3: 3, 6, 12, 24, ... \
             What is the 6th term?"
            .to_string(),
        options: vec![
            "48".to_string(),
            "96".to_string(),
            "72".to_string(),
            "128".to_string(),
        ],
        correct_answer: "96".to_string(),
        explanation: "Each term is twice the previous one, so the 6th term is 3 × 2^5 = 96."
            .to_string(),
        targeted_domains: vec![strategy.target_weakness.clone()],
        estimated_difficulty: 0.5,
        learning_objectives: vec!["Recognize geometric growth patterns".to_string()],
        follow_up_suggestions: vec!["Try the same sequence with a tripling rule".to_string()],
    }
}

pub fn fallback_hints() -> [String; 3] {
    [
        "Consider the key concepts involved".to_string(),
        "Break the problem into smaller steps".to_string(),
        "Think about similar problems you've solved".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{ChallengePreference, UserBehaviorProfile};

    fn profile_with_domains(domains: &[(&str, f64)]) -> UserBehaviorProfile {
        let mut profile = UserBehaviorProfile::new("u1");
        for (domain, score) in domains {
            profile
                .cognitive_patterns
                .domain_preferences
                .insert(domain.to_string(), *score);
        }
        profile
    }

    #[test]
    fn strategy_is_deterministic_for_a_fixed_profile() {
        let profile = profile_with_domains(&[("algebra", 0.4), ("verbal", -0.2)]);
        let first = derive_strategy(&profile, None);
        let second = derive_strategy(&profile, None);
        assert_eq!(first, second);
        assert_eq!(first.target_weakness, "verbal");
    }

    #[test]
    fn empty_profile_targets_the_default_domain() {
        let profile = UserBehaviorProfile::new("u1");
        let strategy = derive_strategy(&profile, None);
        assert_eq!(strategy.target_weakness, "mathematical_reasoning");
        assert_eq!(
            strategy.difficulty_progression,
            DifficultyProgression::AdaptiveSpiral
        );
    }

    #[test]
    fn requested_domain_overrides_weakness_targeting() {
        let profile = profile_with_domains(&[("algebra", 0.4), ("verbal", -0.2)]);
        let strategy = derive_strategy(&profile, Some("spatial_reasoning"));
        assert_eq!(strategy.target_weakness, "spatial_reasoning");

        let blank = derive_strategy(&profile, Some("  "));
        assert_eq!(blank.target_weakness, "verbal");
    }

    #[test]
    fn steep_preference_selects_exponential_progression() {
        let mut profile = UserBehaviorProfile::new("u1");
        profile.motivational_profile.challenge_preference = ChallengePreference::Steep;
        let strategy = derive_strategy(&profile, None);
        assert_eq!(
            strategy.difficulty_progression,
            DifficultyProgression::Exponential
        );
    }

    #[test]
    fn framing_threshold_rules() {
        let mut profile = UserBehaviorProfile::new("u1");
        profile.metacognitive_awareness.reflective_thinking = 0.8;
        assert_eq!(
            derive_strategy(&profile, None).contextual_framing,
            ContextualFraming::AnalyticalFramework
        );

        profile.metacognitive_awareness.reflective_thinking = 0.5;
        profile.motivational_profile.gamification_response = 0.7;
        assert_eq!(
            derive_strategy(&profile, None).contextual_framing,
            ContextualFraming::GamifiedScenario
        );

        profile.motivational_profile.gamification_response = 0.3;
        assert_eq!(
            derive_strategy(&profile, None).contextual_framing,
            ContextualFraming::PracticalApplication
        );
    }

    #[test]
    fn learning_state_defaults_mastery_to_midpoint() {
        let profile = UserBehaviorProfile::new("u1");
        let state = learning_state(&profile, "unknown_domain");
        assert_eq!(state.current_mastery, 0.5);
        assert!((state.optimal_difficulty - 0.7).abs() < 1e-9);
    }

    #[test]
    fn hint_strategy_uses_preferred_type_and_regulation() {
        let mut profile = UserBehaviorProfile::new("u1");
        assert_eq!(derive_hint_strategy(&profile).hint_type, "conceptual");
        assert_eq!(derive_hint_strategy(&profile).complexity, "moderate");

        profile
            .cognitive_patterns
            .hint_usage_patterns
            .preferred_hint_types = vec!["step-by-step".to_string()];
        profile.metacognitive_awareness.self_regulation_skills = 0.7;
        let strategy = derive_hint_strategy(&profile);
        assert_eq!(strategy.hint_type, "step-by-step");
        assert_eq!(strategy.complexity, "high");
    }

    #[test]
    fn question_prompt_embeds_the_learning_state() {
        let profile = profile_with_domains(&[("algebra", 0.4)]);
        let strategy = derive_strategy(&profile, None);
        let state = learning_state(&profile, &strategy.target_weakness);
        let prompt = question_prompt(&strategy, &state, &profile);

        assert!(prompt.contains("Current Mastery: 0.40"));
        assert!(prompt.contains("Optimal Difficulty: 0.60"));
        assert!(prompt.contains("Target Weakness: algebra"));
    }

    #[test]
    fn parse_generated_question_accepts_fenced_json() {
        let raw = r#"```json
        {
          "questionText": "2+2?",
          "options": ["3", "4", "5", "6"],
          "correctAnswer": "4",
          "explanation": "basic addition",
          "targetedDomains": ["arithmetic"],
          "estimatedDifficulty": 0.1,
          "learningObjectives": [],
          "followUpSuggestions": []
        }
        ```"#;
        let question = parse_generated_question(raw).unwrap();
        assert_eq!(question.correct_answer, "4");
        assert_eq!(question.options.len(), 4);
    }

    #[test]
    fn parse_hints_requires_three_lines() {
        assert!(parse_hints("one\ntwo").is_none());
        let hints = parse_hints("- one\n- two\n- three\n- four").unwrap();
        assert_eq!(hints[2], "three");
    }

    #[test]
    fn fallbacks_are_well_formed() {
        let strategy = derive_strategy(&UserBehaviorProfile::new("u1"), None);
        let question = fallback_question(&strategy);
        assert_eq!(question.options.len(), 4);
        assert!(question.options.contains(&question.correct_answer));
        assert_eq!(fallback_hints().len(), 3);
    }
}
