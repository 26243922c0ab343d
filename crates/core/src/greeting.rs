const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good evening",
    "good afternoon",
];

const EMERGENCY_KEYWORDS: &[&str] = &[
    "fire",
    "smoke",
    "flood",
    "water rising",
    "earthquake",
    "gunshot",
    "bleeding",
    "not breathing",
    "no pulse",
    "trapped",
    "accident",
    "explosion",
    "storm",
    "landslide",
];

/// A bare greeting short-circuits the decision pipeline. A greeting that also
/// mentions an emergency keyword ("hi, there is a fire") does not.
pub fn is_bare_greeting(text: &str) -> bool {
    let trimmed = text.trim().to_lowercase();
    if trimmed.is_empty() {
        return false;
    }

    let greets = GREETINGS
        .iter()
        .any(|g| trimmed == *g || trimmed.starts_with(&format!("{g} ")));
    if !greets {
        return false;
    }

    !EMERGENCY_KEYWORDS.iter().any(|k| trimmed.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_greeting_is_detected() {
        assert!(is_bare_greeting("hi"));
        assert!(is_bare_greeting("Hello there"));
        assert!(is_bare_greeting("good morning "));
    }

    #[test]
    fn greeting_with_emergency_keyword_is_not_bare() {
        assert!(!is_bare_greeting("hi, my house is on fire"));
        assert!(!is_bare_greeting("hello we are trapped"));
    }

    #[test]
    fn non_greetings_are_rejected() {
        assert!(!is_bare_greeting("the basement is flooding"));
        assert!(!is_bare_greeting(""));
        assert!(!is_bare_greeting("   "));
    }
}
