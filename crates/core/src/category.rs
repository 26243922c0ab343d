use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{CategorySource, CrisisCategory};

/// One deterministic category rule. Rules are kept in ordered tables so each
/// can be unit-tested and reordered without touching control flow.
pub struct CategoryRule {
    pub name: &'static str,
    pub category: CrisisCategory,
    pub applies: fn(&str) -> bool,
}

/// Rules that outrank the statistical model entirely.
pub static PRE_MODEL_RULES: &[CategoryRule] = &[
    CategoryRule {
        name: "flood_lexical",
        category: CrisisCategory::Flood,
        applies: flood_lexical,
    },
    CategoryRule {
        name: "smoke_only",
        category: CrisisCategory::Fire,
        applies: smoke_only,
    },
];

/// Keyword sweep consulted only after the model declined to commit.
pub static POST_MODEL_RULES: &[CategoryRule] = &[
    CategoryRule {
        name: "flood_sweep",
        category: CrisisCategory::Flood,
        applies: flood_sweep,
    },
    CategoryRule {
        name: "earthquake_sweep",
        category: CrisisCategory::Earthquake,
        applies: earthquake_sweep,
    },
    CategoryRule {
        name: "fire_sweep",
        category: CrisisCategory::Fire,
        applies: fire_sweep,
    },
];

#[derive(Debug, Clone)]
pub struct CategoryResolution {
    pub category: CrisisCategory,
    pub source: CategorySource,
    pub rule: Option<&'static str>,
}

/// Resolve the final category from text and a raw model label, in strict
/// precedence order: pre-model overrides, then the model (when it names a
/// specific category inside the closed set), then the keyword sweep, then
/// `other`. There is no failure path.
pub fn resolve_category(text: &str, model_label: &str) -> CategoryResolution {
    let lowered = text.to_lowercase();

    for rule in PRE_MODEL_RULES {
        if (rule.applies)(&lowered) {
            return CategoryResolution {
                category: rule.category,
                source: CategorySource::KeywordOverride,
                rule: Some(rule.name),
            };
        }
    }

    if let Some(category) = CrisisCategory::from_label(model_label) {
        if category != CrisisCategory::Other {
            return CategoryResolution {
                category,
                source: CategorySource::Model,
                rule: None,
            };
        }
    }

    for rule in POST_MODEL_RULES {
        if (rule.applies)(&lowered) {
            return CategoryResolution {
                category: rule.category,
                source: CategorySource::KeywordOverride,
                rule: Some(rule.name),
            };
        }
    }

    CategoryResolution {
        category: CrisisCategory::Other,
        source: CategorySource::Fallback,
        rule: None,
    }
}

static WATER_THEN_BASEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bwater\b.*\bbasement\b").expect("valid water/basement regex"));
static BASEMENT_THEN_WATER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bbasement\b.*\bwater\b").expect("valid basement/water regex"));

fn flood_lexical(lowered: &str) -> bool {
    if contains_any(lowered, &["flood", "flooded", "flooding"]) {
        return true;
    }
    if WATER_THEN_BASEMENT.is_match(lowered) || BASEMENT_THEN_WATER.is_match(lowered) {
        return true;
    }
    lowered.contains("water") && contains_any(lowered, &["house", "home", "apartment"])
}

fn smoke_only(lowered: &str) -> bool {
    contains_any(
        lowered,
        &[
            "heavy smoke",
            "thick smoke",
            "smoke in my apartment",
            "smoke everywhere",
            "smoke in the building",
            "smoke coming from",
        ],
    )
}

fn flood_sweep(lowered: &str) -> bool {
    contains_any(
        lowered,
        &[
            "flood",
            "flooding",
            "water is rising",
            "water rising",
            "river overflow",
        ],
    )
}

fn earthquake_sweep(lowered: &str) -> bool {
    contains_any(
        lowered,
        &["earthquake", "tremor", "strong shaking", "ground shaking"],
    )
}

fn fire_sweep(lowered: &str) -> bool {
    contains_any(lowered, &["fire", "burning", "wildfire", "smoke everywhere"])
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
