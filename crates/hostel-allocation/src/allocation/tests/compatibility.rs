use super::common::*;
use crate::allocation::compatibility::{score, TraitDimension, MAX_SCORE};

#[test]
fn identical_traits_hit_the_cap() {
    let mut traits = quiet_traits();
    traits.hobbies = vec![
        "Reading".to_string(),
        "Art".to_string(),
        "Cooking".to_string(),
    ];

    let result = score(&traits, &traits);
    // 6 dimensions * 15 + 3 hobbies * 5 = 105, capped.
    assert_eq!(result.score as u32, MAX_SCORE);
    assert_eq!(result.matched_traits.len(), 6);
    assert_eq!(result.shared_hobbies.len(), 3);
}

#[test]
fn disjoint_traits_score_zero() {
    let mut a = quiet_traits();
    a.cleanliness_level = 5;
    let mut b = lively_traits();
    b.cleanliness_level = 1;

    let result = score(&a, &b);
    assert_eq!(result.score, 0);
    assert!(result.matched_traits.is_empty());
    assert!(result.shared_hobbies.is_empty());
}

#[test]
fn repeated_calls_are_deterministic() {
    let a = quiet_traits();
    let b = lively_traits();
    let first = score(&a, &b);
    for _ in 0..10 {
        assert_eq!(score(&a, &b), first);
    }
}

#[test]
fn score_is_symmetric() {
    let a = quiet_traits();
    let mut b = lively_traits();
    b.sleep_schedule = a.sleep_schedule;
    b.hobbies = vec!["reading".to_string(), "Chess".to_string()];

    assert_eq!(score(&a, &b).score, score(&b, &a).score);
}

#[test]
fn cleanliness_matches_within_one_level() {
    let a = quiet_traits();

    let mut near = quiet_traits();
    near.cleanliness_level = a.cleanliness_level - 1;
    assert!(score(&a, &near)
        .matched_traits
        .contains(&TraitDimension::Cleanliness));

    let mut far = quiet_traits();
    far.cleanliness_level = a.cleanliness_level - 2;
    assert!(!score(&a, &far)
        .matched_traits
        .contains(&TraitDimension::Cleanliness));
}

#[test]
fn hobby_comparison_ignores_case_and_whitespace() {
    let mut a = quiet_traits();
    a.hobbies = vec!["Reading".to_string(), "Gaming".to_string()];
    let mut b = lively_traits();
    b.hobbies = vec![" reading ".to_string(), "GAMING".to_string()];

    let result = score(&a, &b);
    assert_eq!(result.shared_hobbies, vec!["Reading", "Gaming"]);
}

#[test]
fn hobby_bonus_is_capped_at_three() {
    let mut a = quiet_traits();
    let mut b = quiet_traits();
    let hobbies: Vec<String> = ["Reading", "Gaming", "Sports", "Music", "Art"]
        .iter()
        .map(|hobby| hobby.to_string())
        .collect();
    a.hobbies = hobbies.clone();
    b.hobbies = hobbies;
    // Make one dimension differ so the cap itself is observable.
    b.visitor_frequency = crate::allocation::domain::VisitorFrequency::Often;

    let result = score(&a, &b);
    // 5 matched dimensions * 15 + capped bonus 15 = 90.
    assert_eq!(result.score, 90);
    assert_eq!(result.shared_hobbies.len(), 5);
}

#[test]
fn partial_overlap_adds_up() {
    let mut a = quiet_traits();
    a.hobbies = vec!["Reading".to_string()];
    let mut b = lively_traits();
    b.study_habits = a.study_habits;
    b.cleanliness_level = a.cleanliness_level;
    b.hobbies = vec!["Reading".to_string()];

    let result = score(&a, &b);
    // study habits + cleanliness = 30, one shared hobby = 5.
    assert_eq!(result.score, 35);
    assert_eq!(
        result.matched_traits,
        vec![TraitDimension::StudyHabits, TraitDimension::Cleanliness]
    );
}
