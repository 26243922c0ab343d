use once_cell::sync::Lazy;
use regex::Regex;

static ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,5}\s+[A-Za-z][A-Za-z ]*\s+(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Lane|Ln|Drive|Dr))\b",
    )
    .expect("valid street address regex")
});

/// Prepositional phrases tried in priority order; the capture is only
/// accepted when it contains a geographic token.
static PREPOSITION_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"\bnear ([^.,;]+)").expect("valid near regex"),
        Regex::new(r"\bat ([^.,;]+)").expect("valid at regex"),
        Regex::new(r"\bin ([^.,;]+)").expect("valid in regex"),
    ]
});

const GEO_TOKENS: &[&str] = &[
    "street",
    "st ",
    "st.",
    "avenue",
    "ave",
    "road",
    "rd",
    "boulevard",
    "blvd",
    "lane",
    "ln",
    "drive",
    "dr",
    "downtown",
    "city",
    "center",
    "centre",
    "plaza",
    "square",
    "park",
    "town",
    "mall",
    "station",
    "airport",
];

/// Pull an address or landmark hint out of free text. Cascade, first success
/// wins; no match at any stage yields an empty string, which callers treat as
/// "location unknown" rather than an error.
pub fn extract_location(text: &str) -> String {
    if let Some(captures) = ADDRESS.captures(text) {
        if let Some(address) = captures.get(1) {
            return address.as_str().trim().to_string();
        }
    }

    let lowered = text.to_lowercase();

    for (keyword, landmark) in [
        ("mall", "the mall"),
        ("station", "the station"),
        ("airport", "the airport"),
    ] {
        if lowered.contains(keyword) {
            return landmark.to_string();
        }
    }

    let candidate = PREPOSITION_PATTERNS
        .iter()
        .find_map(|pattern| pattern.find(&lowered).map(|m| m.as_str().to_string()));

    let Some(candidate) = candidate else {
        return String::new();
    };

    // The geo-token filter suppresses false positives like "in danger".
    if GEO_TOKENS.iter().any(|token| candidate.contains(token)) {
        candidate.trim().to_string()
    } else {
        String::new()
    }
}
