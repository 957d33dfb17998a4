//! Sensitive value classification
//!
//! Heuristic, not cryptographic. Two layers:
//! 1. format signatures for secrets with a known shape (JWTs, cloud keys, ...)
//! 2. normalized Shannon entropy for random-looking strings nobody wrote a
//!    signature for
//!
//! Both pattern lists are evaluated with short-circuit OR. Order only
//! affects how quickly a match is found.

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Strings shorter than this are never treated as secrets
pub const MIN_SECRET_LEN: usize = 8;

/// Entropy scoring only applies to strings longer than this
pub const ENTROPY_MIN_LEN: usize = 16;

/// Normalized entropy above which a string counts as random
pub const ENTROPY_THRESHOLD: f64 = 0.65;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static sensitive-data pattern must compile"))
        .collect()
}

static KEY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        // authentication
        r"(?i)pass(word|wd|phrase|code)",
        r"(?i)token",
        // not "author"
        r"(?i:auth)($|[^a-z]|(?i:orization|entic))",
        r"(?i)credential",
        r"(?i)bearer",
        r"(?i)jwt",
        r"(?i)(csrf|xsrf)",
        r"(?i)(^|[^a-z])otp($|[^a-z])",
        // personal identifiers
        r"(?i)(ssn|social.?security)",
        r"(?i)passport",
        r"(?i)driver.?licen[cs]e",
        r"(?i)(birth.?date|date.?of.?birth|(^|[^a-z])dob($|[^a-z]))",
        r"(?i)tax.?id",
        // financial
        r"(?i)(credit.?card|card.?(number|num|no)|cc.?num)",
        r"(?i)(cvv|cvc|csc)",
        r"(?i)iban",
        r"(?i)(account.?(number|num|no)|routing.?(number|num|no))",
        r"(?i)(^|[^a-z])pin($|[^a-z])",
        // generic
        r"(?i)secret",
        r"(?i)private",
        // key as its own word or camelCase segment: not "monkey", "keyboard"
        r"((^|[^A-Za-z])[Kk]eys?|[a-z0-9]Keys?|KEYS?)($|[^a-z])",
        r"(?i)signature",
    ])
});

static VALUE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        // JWT
        r"^eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*$",
        // AWS access key id
        r"^(AKIA|ASIA)[0-9A-Z]{16}$",
        // AWS secret access key
        r"^[A-Za-z0-9/+=]{40}$",
        // vendor API keys: Stripe, GitHub, Slack, Google, OpenAI-style
        r"^(sk|pk|rk)_(test|live)_[0-9A-Za-z]{16,}$",
        r"^gh[pousr]_[A-Za-z0-9]{36,}$",
        r"^xox[abposr]-[A-Za-z0-9-]{10,}$",
        r"^AIza[0-9A-Za-z_-]{35}$",
        r"^sk-[A-Za-z0-9_-]{20,}$",
        // UUID
        r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
        // bearer token
        r"(?i)^bearer\s+[A-Za-z0-9._~+/-]+=*$",
        // payment card: Visa, Mastercard, Amex, Discover
        r"^(4[0-9]{12}([0-9]{3})?|5[1-5][0-9]{14}|3[47][0-9]{13}|6(011|5[0-9]{2})[0-9]{12})$",
        // US social security number
        r"^[0-9]{3}-[0-9]{2}-[0-9]{4}$",
        // email
        r"^[^\s@]+@[^\s@]+\.[^\s@]+$",
        // generic high-entropy shapes
        r"^[A-Za-z0-9]{32,}$",
        r"^[A-Za-z0-9+/_-]{24,}={0,2}$",
    ])
});

/// Does this key name suggest the value behind it is sensitive?
pub fn is_sensitive_key(key: &str) -> bool {
    KEY_PATTERNS.iter().any(|re| re.is_match(key))
}

/// Does this value look like a secret? Non-strings never do.
pub fn is_sensitive_value(value: &Value) -> bool {
    match value {
        Value::String(s) => is_sensitive_str(s),
        _ => false,
    }
}

/// String form of [`is_sensitive_value`]
pub fn is_sensitive_str(value: &str) -> bool {
    let len = value.chars().count();
    if len < MIN_SECRET_LEN {
        return false;
    }

    if VALUE_PATTERNS.iter().any(|re| re.is_match(value)) {
        return true;
    }

    len > ENTROPY_MIN_LEN
        && normalized_entropy(value).is_some_and(|entropy| entropy > ENTROPY_THRESHOLD)
}

/// Shannon entropy of the character distribution divided by the maximum
/// entropy for the number of distinct characters seen.
///
/// `None` for strings with fewer than two distinct characters, where the
/// normalization is undefined.
pub fn normalized_entropy(value: &str) -> Option<f64> {
    let mut histogram: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in value.chars() {
        *histogram.entry(c).or_insert(0) += 1;
        total += 1;
    }

    let distinct = histogram.len();
    if distinct < 2 {
        return None;
    }

    let total = total as f64;
    let entropy: f64 = histogram
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();

    Some(entropy / (distinct as f64).log2())
}
