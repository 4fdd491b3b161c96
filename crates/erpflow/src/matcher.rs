//! Fuzzy selection of dropdown options.
//!
//! Searchable dropdowns on the estimation screen return free-form option
//! labels ("120 GSM Art Paper Gloss") for a free-form target taken from the
//! request ("Real Art Paper"). Scoring is pure and deterministic: the same
//! target and candidate list always yield the same choice.

use std::ops::RangeInclusive;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const EXACT_MATCH_SCORE: i32 = 1000;
const FULL_WORD_SCORE: i32 = 100;
const PARTIAL_WORD_SCORE: i32 = 50;
const ALL_WORDS_BONUS: i32 = 200;
const PREFERRED_WEIGHT_BONUS: i32 = 150;
const ACCEPTABLE_WEIGHT_BONUS: i32 = 75;
/// Added on top of the range bonus when the candidate carries the exact
/// weight the target asks for.
const REQUESTED_WEIGHT_BONUS: i32 = 100;
const DOMAIN_TERM_BONUS: i32 = 40;
const LONG_CANDIDATE_PENALTY: i32 = 20;
const SHORT_CANDIDATE_BONUS: i32 = 10;

const LONG_CANDIDATE_CHARS: usize = 40;
const SHORT_CANDIDATE_CHARS: usize = 20;

/// Basis weights (gsm) commonly stocked for commercial print jobs.
const PREFERRED_GSM: RangeInclusive<u32> = 100..=170;
const ACCEPTABLE_GSM: RangeInclusive<u32> = 60..=350;

const MATERIAL_TERMS: &[&str] = &[
    "art", "paper", "board", "gloss", "matt", "duplex", "maplitho", "chromo", "coated", "bond",
];
const FINISH_TERMS: &[&str] = &["gloss", "matt", "silk", "uncoated", "coated"];
const COATING_TERMS: &[&str] = &["uv", "varnish", "aqueous", "lamination", "spot"];

/// Dropdown rows that are status text rather than selectable values.
const PLACEHOLDER_OPTIONS: &[&str] = &[
    "no results found",
    "no matches found",
    "searching...",
    "loading...",
    "select",
    "-- select --",
];

/// The kind of value a dropdown holds. Controls the domain-specific
/// bonuses applied on top of word matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    #[default]
    Generic,
    Client,
    Material,
    BasisWeight,
    Mill,
    Finish,
    Coating,
}

impl MatchKind {
    fn domain_terms(&self) -> &'static [&'static str] {
        match self {
            MatchKind::Material => MATERIAL_TERMS,
            MatchKind::Finish => FINISH_TERMS,
            MatchKind::Coating => COATING_TERMS,
            _ => &[],
        }
    }

    fn weighs_paper(&self) -> bool {
        matches!(self, MatchKind::Material | MatchKind::BasisWeight)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchCandidate {
    pub text: String,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchDecision {
    /// A candidate equals the target (case-insensitive, trimmed).
    Exact(MatchCandidate),
    /// Highest positive score; ties resolve to the earliest candidate.
    Best(MatchCandidate),
    /// No candidate scored above zero, so the first option is taken.
    FirstCandidate(String),
    NoCandidates,
}

impl MatchDecision {
    pub fn chosen(&self) -> Option<&str> {
        match self {
            MatchDecision::Exact(c) | MatchDecision::Best(c) => Some(&c.text),
            MatchDecision::FirstCandidate(text) => Some(text),
            MatchDecision::NoCandidates => None,
        }
    }

    pub fn score(&self) -> Option<i32> {
        match self {
            MatchDecision::Exact(c) | MatchDecision::Best(c) => Some(c.score),
            _ => None,
        }
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn unit_weight_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)\b(\d{2,3})\s*(?:gsm|gm|g)\b").ok())
        .as_ref()
}

fn bare_number_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\b(\d{2,3})\b").ok())
        .as_ref()
}

fn capture_number(pattern: Option<&Regex>, text: &str) -> Option<u32> {
    pattern?
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extracts a basis weight. Material labels must carry a unit; a basis
/// weight dropdown may list bare numbers.
fn basis_weight(text: &str, kind: MatchKind) -> Option<u32> {
    capture_number(unit_weight_pattern(), text).or_else(|| {
        if kind == MatchKind::BasisWeight {
            capture_number(bare_number_pattern(), text)
        } else {
            None
        }
    })
}

/// Range bonus for the candidate's basis weight, plus a bonus when it is
/// the weight named in the target.
fn weight_bonus(target: &str, candidate: &str, kind: MatchKind) -> i32 {
    if !kind.weighs_paper() {
        return 0;
    }
    let Some(weight) = basis_weight(candidate, kind) else {
        return 0;
    };

    let mut bonus = if PREFERRED_GSM.contains(&weight) {
        PREFERRED_WEIGHT_BONUS
    } else if ACCEPTABLE_GSM.contains(&weight) {
        ACCEPTABLE_WEIGHT_BONUS
    } else {
        0
    };

    let wanted = capture_number(unit_weight_pattern(), target)
        .or_else(|| capture_number(bare_number_pattern(), target));
    if wanted == Some(weight) {
        bonus += REQUESTED_WEIGHT_BONUS;
    }
    bonus
}

/// Words of the target that take part in word matching. For paper weights
/// the "130gsm" token is scored by [`weight_bonus`] instead.
fn matchable_words(target: &str, kind: MatchKind) -> Vec<String> {
    match unit_weight_pattern() {
        Some(pattern) if kind.weighs_paper() => words(&pattern.replace_all(target, " ")),
        _ => words(target),
    }
}

fn is_exact(target: &str, candidate: &str) -> bool {
    target.trim().to_lowercase() == candidate.trim().to_lowercase()
}

/// Scores one candidate against the target.
pub fn score_candidate(target: &str, candidate: &str, kind: MatchKind) -> i32 {
    if is_exact(target, candidate) {
        return EXACT_MATCH_SCORE;
    }

    let candidate = candidate.trim();
    let candidate_lower = candidate.to_lowercase();
    let candidate_words = words(candidate);
    let target_words = matchable_words(target, kind);

    let mut score = 0;
    let mut all_present = !target_words.is_empty();

    for word in &target_words {
        if candidate_words.contains(word) {
            score += FULL_WORD_SCORE;
        } else if candidate_lower.contains(word.as_str()) {
            score += PARTIAL_WORD_SCORE;
        } else {
            all_present = false;
        }
    }
    if all_present {
        score += ALL_WORDS_BONUS;
    }

    score += weight_bonus(target, candidate, kind);

    for term in kind.domain_terms() {
        if target_words.iter().any(|w| w == term) && candidate_lower.contains(term) {
            score += DOMAIN_TERM_BONUS;
        }
    }

    let length = candidate.chars().count();
    if length > LONG_CANDIDATE_CHARS {
        score -= LONG_CANDIDATE_PENALTY;
    } else if length <= SHORT_CANDIDATE_CHARS && score > 0 {
        score += SHORT_CANDIDATE_BONUS;
    }

    score
}

fn is_placeholder(option: &str) -> bool {
    let normalized = option.trim().to_lowercase();
    normalized.is_empty() || PLACEHOLDER_OPTIONS.contains(&normalized.as_str())
}

/// Picks the option that best represents `target`.
pub fn select_best_match<S: AsRef<str>>(
    target: &str,
    candidates: &[S],
    kind: MatchKind,
) -> MatchDecision {
    let options: Vec<&str> = candidates
        .iter()
        .map(|c| c.as_ref().trim())
        .filter(|c| !is_placeholder(c))
        .collect();

    let Some(first) = options.first() else {
        return MatchDecision::NoCandidates;
    };

    if let Some(exact) = options.iter().find(|c| is_exact(target, c)) {
        return MatchDecision::Exact(MatchCandidate {
            text: exact.to_string(),
            score: EXACT_MATCH_SCORE,
        });
    }

    let mut best: Option<MatchCandidate> = None;
    for option in &options {
        let score = score_candidate(target, option, kind);
        if score > best.as_ref().map_or(0, |b| b.score) {
            best = Some(MatchCandidate {
                text: option.to_string(),
                score,
            });
        }
    }

    match best {
        Some(candidate) => MatchDecision::Best(candidate),
        None => MatchDecision::FirstCandidate(first.to_string()),
    }
}
