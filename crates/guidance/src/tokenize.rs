use regex::Regex;

pub fn tokenize(input: &str) -> Vec<String> {
    let cleaner = Regex::new(r"[^\p{Latin}\p{Nd}\s]+").expect("valid tokenizer regex");
    let normalized = cleaner.replace_all(input, " ").to_lowercase();

    normalized
        .split_whitespace()
        .map(str::trim)
        .filter(|token| token.chars().count() > 1)
        .map(|token| token.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_short_tokens() {
        let tokens = tokenize("Water's rising, fast! A lot.");
        assert!(tokens.iter().any(|t| t == "rising"));
        assert!(tokens.iter().any(|t| t == "fast"));
        assert!(!tokens.iter().any(|t| t == "a"));
    }
}
