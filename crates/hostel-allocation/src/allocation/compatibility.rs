use serde::Serialize;

use super::domain::PersonalityTraits;

/// Points awarded per matched trait dimension.
pub const DIMENSION_WEIGHT: u32 = 15;
/// Bonus points per shared hobby.
pub const HOBBY_BONUS: u32 = 5;
/// Shared hobbies counted toward the bonus.
pub const MAX_SHARED_HOBBIES: usize = 3;
/// Scores are capped here regardless of matches.
pub const MAX_SCORE: u32 = 100;

/// The comparable trait dimensions, reported back so callers can display
/// which traits lined up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TraitDimension {
    SleepSchedule,
    StudyHabits,
    SocialPreference,
    NoisePreference,
    Cleanliness,
    VisitorFrequency,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityScore {
    pub score: u8,
    pub matched_traits: Vec<TraitDimension>,
    pub shared_hobbies: Vec<String>,
}

/// Score two trait records on a 0-100 scale.
///
/// Each of the six dimensions contributes `DIMENSION_WEIGHT` on an exact
/// match (cleanliness within one level); shared hobbies add a capped bonus.
/// Pure and deterministic: the same pair always yields the same score, and
/// `score(a, b) == score(b, a)`.
pub fn score(a: &PersonalityTraits, b: &PersonalityTraits) -> CompatibilityScore {
    let mut matched = Vec::new();

    if a.sleep_schedule == b.sleep_schedule {
        matched.push(TraitDimension::SleepSchedule);
    }
    if a.study_habits == b.study_habits {
        matched.push(TraitDimension::StudyHabits);
    }
    if a.social_preference == b.social_preference {
        matched.push(TraitDimension::SocialPreference);
    }
    if a.noise_preference == b.noise_preference {
        matched.push(TraitDimension::NoisePreference);
    }
    if a.cleanliness_level.abs_diff(b.cleanliness_level) <= 1 {
        matched.push(TraitDimension::Cleanliness);
    }
    if a.visitor_frequency == b.visitor_frequency {
        matched.push(TraitDimension::VisitorFrequency);
    }

    let shared_hobbies = shared_hobbies(a, b);
    let bonus = shared_hobbies.len().min(MAX_SHARED_HOBBIES) as u32 * HOBBY_BONUS;
    let total = (matched.len() as u32 * DIMENSION_WEIGHT + bonus).min(MAX_SCORE);

    CompatibilityScore {
        score: total as u8,
        matched_traits: matched,
        shared_hobbies,
    }
}

/// Case-insensitive hobby intersection, reported in `a`'s spelling and order.
fn shared_hobbies(a: &PersonalityTraits, b: &PersonalityTraits) -> Vec<String> {
    let theirs: Vec<String> = b
        .hobbies
        .iter()
        .map(|hobby| hobby.trim().to_lowercase())
        .collect();

    let mut seen: Vec<String> = Vec::new();
    let mut shared = Vec::new();
    for hobby in &a.hobbies {
        let folded = hobby.trim().to_lowercase();
        if folded.is_empty() || seen.contains(&folded) {
            continue;
        }
        if theirs.contains(&folded) {
            seen.push(folded);
            shared.push(hobby.trim().to_string());
        }
    }
    shared
}
