use crate::models::{CrisisCategory, Severity};

/// Life-threatening cues that pin the base severity to high.
const HIGH_CUES: &[&str] = &[
    "trapped",
    "cannot breathe",
    "can't breathe",
    "can\u{2019}t breathe",
    "unconscious",
    "house destroyed",
    "building collapsed",
    "roof collapsed",
    "severe bleeding",
    "heart attack",
    "no pulse",
];

/// Serious-but-survivable cues that raise the base severity to medium.
const MEDIUM_CUES: &[&str] = &[
    "water rising",
    "water is rising",
    "rising water",
    "road blocked",
    "roads are blocked",
    "cars are stuck",
    "car is stuck",
    "injured",
    "injuries",
    "need help",
    "need assistance",
    "cannot leave the building",
    "can't leave the building",
];

/// Violence, severe medical and entrapment language that forces high severity
/// no matter what category the classifier settled on.
const UNIVERSAL_HIGH_CUES: &[&str] = &[
    "gunshot",
    "gunshots",
    "shots fired",
    "active shooter",
    "shooter",
    "armed",
    "stabbing",
    "stabbed",
    "knife",
    "attack",
    "bleeding heavily",
    "heavy bleeding",
    "blood everywhere",
    "not breathing",
    "no pulse",
    "doing cpr",
    "trying cpr",
    "fire inside",
    "smoke is filling",
    "smoke filling",
    "cannot reach the exit",
    "can't reach the exit",
    "can\u{2019}t reach the exit",
    "hallway is burning",
    "trapped inside",
    "can't get out",
    "cannot get out",
    "can\u{2019}t get out",
];

const FLOOD_WATER_CUES: &[&str] = &[
    "flood",
    "flooding",
    "water is rising",
    "water rising",
    "water rising quickly",
];

const SWEPT_OR_TRAPPED_CUES: &[&str] = &[
    "trapped",
    "swept",
    "swept away",
    "cannot breathe",
    "can't breathe",
    "can\u{2019}t breathe",
    "unconscious",
];

// Mobile keyboards emit U+2019 for the apostrophe, so each "can't" phrase
// carries both spellings.
const TRAPPED_CUES: &[&str] = &[
    "stuck",
    "trapped",
    "cannot get out",
    "can't get out",
    "can\u{2019}t get out",
    "cannot exit",
    "can't exit",
    "can\u{2019}t exit",
    "we can't leave",
    "we can\u{2019}t leave",
];

const DEPENDENT_CUES: &[&str] = &[
    "my son",
    "my daughter",
    "my kid",
    "my child",
    "children",
    "people are trapped",
];

const SMOKE_BREATHING_CUES: &[&str] = &[
    "heavy smoke",
    "thick smoke",
    "dense smoke",
    "hard to breathe",
    "cant breathe",
    "can't breathe",
    "can\u{2019}t breathe",
    "struggling to breathe",
    "coughing badly",
    "choking on smoke",
];

/// First pass: severity from the rule lexicons alone.
pub fn base_severity(text: &str) -> Severity {
    let lowered = text.to_lowercase();
    if contains_any(&lowered, HIGH_CUES) {
        Severity::High
    } else if contains_any(&lowered, MEDIUM_CUES) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// One named escalation rule. Each rule may only propose a severity; the
/// results combine by `max`, so no rule can lower what another asserted.
pub struct EscalationRule {
    pub name: &'static str,
    pub applies: fn(CrisisCategory, &str) -> Option<Severity>,
}

pub static ESCALATION_RULES: &[EscalationRule] = &[
    EscalationRule {
        name: "universal_high_risk",
        applies: |_, lowered| contains_any(lowered, UNIVERSAL_HIGH_CUES).then_some(Severity::High),
    },
    EscalationRule {
        name: "flood_rising_water",
        applies: |category, lowered| {
            if category != CrisisCategory::Flood || !contains_any(lowered, FLOOD_WATER_CUES) {
                return None;
            }
            if contains_any(lowered, SWEPT_OR_TRAPPED_CUES) {
                Some(Severity::High)
            } else {
                Some(Severity::Medium)
            }
        },
    },
    EscalationRule {
        name: "flood_trapped_dependents",
        applies: |category, lowered| {
            (category == CrisisCategory::Flood
                && contains_any(lowered, TRAPPED_CUES)
                && contains_any(lowered, DEPENDENT_CUES))
            .then_some(Severity::High)
        },
    },
    EscalationRule {
        name: "smoke_breathing_difficulty",
        applies: |_, lowered| {
            contains_any(lowered, SMOKE_BREATHING_CUES).then_some(Severity::High)
        },
    },
];

/// Second pass: apply the domain escalation rules on top of a base value.
/// Monotonically non-decreasing by construction.
pub fn escalate_severity(category: CrisisCategory, base: Severity, text: &str) -> Severity {
    let lowered = text.to_lowercase();
    ESCALATION_RULES
        .iter()
        .filter_map(|rule| (rule.applies)(category, &lowered))
        .fold(base, Severity::max)
}

/// Merge an independently obtained estimate. Escalation only: the estimate
/// can raise the current value but never lower it.
pub fn merge_severity(current: Severity, estimate: Severity) -> Severity {
    current.max(estimate)
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trapped_is_life_threatening() {
        assert_eq!(base_severity("we are trapped on the roof"), Severity::High);
    }

    #[test]
    fn rising_water_is_medium() {
        assert_eq!(
            base_severity("water is rising and cars are stuck"),
            Severity::Medium
        );
    }

    #[test]
    fn calm_report_is_low() {
        assert_eq!(base_severity("a tree fell in the garden"), Severity::Low);
    }

    #[test]
    fn violence_forces_high_for_any_category() {
        let severity = escalate_severity(
            CrisisCategory::Other,
            Severity::Low,
            "gunshots, someone is bleeding heavily, we are trapped inside",
        );
        assert_eq!(severity, Severity::High);
    }

    #[test]
    fn flood_with_rising_water_raises_low_to_medium() {
        let severity = escalate_severity(
            CrisisCategory::Flood,
            Severity::Low,
            "the street is flooding slowly",
        );
        assert_eq!(severity, Severity::Medium);
    }

    #[test]
    fn flood_with_swept_away_language_is_high() {
        let severity = escalate_severity(
            CrisisCategory::Flood,
            Severity::Medium,
            "flooding everywhere and my neighbor was swept away",
        );
        assert_eq!(severity, Severity::High);
    }

    #[test]
    fn curly_apostrophe_spelling_still_escalates() {
        let severity = escalate_severity(
            CrisisCategory::Flood,
            Severity::Low,
            "flooding downstairs, we can\u{2019}t leave with my daughter",
        );
        assert_eq!(severity, Severity::High);

        assert_eq!(
            base_severity("i can\u{2019}t breathe in here"),
            Severity::High
        );
    }

    #[test]
    fn flood_trapped_child_combination_is_high() {
        let severity = escalate_severity(
            CrisisCategory::Flood,
            Severity::Low,
            "we are stuck upstairs with my daughter and the flood is outside",
        );
        assert_eq!(severity, Severity::High);
    }

    #[test]
    fn smoke_breathing_is_high_regardless_of_category() {
        let severity = escalate_severity(
            CrisisCategory::Other,
            Severity::Low,
            "thick smoke, struggling to breathe",
        );
        assert_eq!(severity, Severity::High);
    }

    #[test]
    fn estimate_never_downgrades() {
        assert_eq!(merge_severity(Severity::High, Severity::Low), Severity::High);
        assert_eq!(
            merge_severity(Severity::High, Severity::Medium),
            Severity::High
        );
        assert_eq!(
            merge_severity(Severity::Low, Severity::Medium),
            Severity::Medium
        );
        assert_eq!(merge_severity(Severity::Low, Severity::High), Severity::High);
    }

    #[test]
    fn unknown_severity_label_normalizes_to_medium() {
        assert_eq!(Severity::normalize_label("catastrophic"), Severity::Medium);
        assert_eq!(Severity::normalize_label("HIGH"), Severity::High);
    }
}
