//! Single-cell checks and value transformers.
//!
//! Everything here is stateless and works on one trimmed cell string. The
//! rule sets in [`super::worker`] compose these into column rules.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Date layouts accepted in input files, tried in order.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d.%m.%Y"];

const TRUE_TOKENS: &[&str] = &["true", "yes", "y", "1", "on", "active", "oui"];
const FALSE_TOKENS: &[&str] = &["false", "no", "n", "0", "off", "inactive", "non"];

/// Mail providers used as references for look-alike domain detection.
pub const KNOWN_MAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "live.com",
    "icloud.com",
    "aol.com",
    "protonmail.com",
    "mail.com",
    "gmx.com",
    "yahoo.fr",
    "hotmail.fr",
    "orange.fr",
    "free.fr",
    "laposte.net",
];

/// Real providers that sit one or two edits away from a reference domain.
/// Never reported as look-alikes.
pub const LEGITIMATE_MAIL_DOMAINS: &[&str] = &[
    "email.com",
    "ymail.com",
    "rocketmail.com",
    "mail.ru",
    "gmx.de",
    "gmx.net",
    "gmx.fr",
    "me.com",
    "mac.com",
    "msn.com",
    "aim.com",
    "live.fr",
    "live.de",
    "yahoo.de",
    "yahoo.es",
    "yahoo.it",
    "yahoo.ca",
    "hotmail.de",
    "hotmail.it",
    "hotmail.es",
    "outlook.fr",
    "outlook.de",
    "orange.es",
    "free.de",
    "web.de",
    "sfr.fr",
    "neuf.fr",
    "proton.me",
];

pub const MAX_TAG_LENGTH: usize = 50;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email regex")
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9 ().\-/]{6,24}$").expect("phone regex"));

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._\-]{1,64}$").expect("identifier regex"));

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N} _\-./&+#',]+$").expect("tag regex"));

// =============================================================================
// Format checks
// =============================================================================

pub fn is_email(value: &str) -> bool {
    let value = value.trim();
    EMAIL_RE.is_match(value) && !value.contains("..")
}

/// Phone numbers: digits with common separators, 7 to 15 digits overall.
pub fn is_phone(value: &str) -> bool {
    let value = value.trim();
    if !PHONE_RE.is_match(value) {
        return false;
    }
    let digits = value.chars().filter(char::is_ascii_digit).count();
    (7..=15).contains(&digits)
}

pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value.trim())
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub fn is_date(value: &str) -> bool {
    parse_date(value).is_some()
}

pub fn parse_bool(value: &str) -> Option<bool> {
    let token = value.trim().to_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

pub fn is_bool(value: &str) -> bool {
    parse_bool(value).is_some()
}

/// Canonical enumeration code: lower-case, spaces and hyphens folded to `_`.
///
/// `"Full-Time"` and `"full time"` both become `"full_time"`.
pub fn normalize_code(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

pub fn is_one_of(value: &str, allowed: &[&str]) -> bool {
    let code = normalize_code(value);
    allowed.iter().any(|a| *a == code)
}

/// Parse a decimal number, accepting a comma as decimal separator.
pub fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim();
    let normalized = if value.contains(',') && !value.contains('.') {
        value.replace(',', ".")
    } else {
        value.to_string()
    };
    normalized
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

pub fn parse_integer(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

// =============================================================================
// Tag lists
// =============================================================================

/// Split a comma-separated tag list, honouring double-quoted items.
///
/// `night shift, "first aid, level 2"` yields two tags. Quotes must be
/// balanced; every non-empty item must match the tag alphabet and stay
/// under [`MAX_TAG_LENGTH`] characters.
pub fn split_tags(value: &str) -> Result<Vec<String>, String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in value.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' | ';' if !in_quotes => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err("unbalanced quotes in tag list".to_string());
    }
    items.push(current);

    let tags: Vec<String> = items
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    for tag in &tags {
        if tag.chars().count() > MAX_TAG_LENGTH {
            return Err(format!("tag '{}' is longer than {} characters", tag, MAX_TAG_LENGTH));
        }
        if !TAG_RE.is_match(tag) {
            return Err(format!("tag '{}' contains unsupported characters", tag));
        }
    }

    Ok(tags)
}

// =============================================================================
// Normalization
// =============================================================================

pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Keep digits and a leading `+`, drop every separator.
pub fn normalize_phone(value: &str) -> String {
    let value = value.trim();
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if value.starts_with('+') {
        format!("+{}", digits)
    } else {
        digits
    }
}

// =============================================================================
// Typo detection
// =============================================================================

/// Optimal string alignment distance (Levenshtein plus adjacent transpositions).
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    let mut d = vec![vec![0usize; m + 1]; n + 1];

    for (i, row) in d.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=m {
        d[0][j] = j;
    }

    for i in 1..=n {
        for j in 1..=m {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            d[i][j] = (d[i - 1][j] + 1)
                .min(d[i][j - 1] + 1)
                .min(d[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                d[i][j] = d[i][j].min(d[i - 2][j - 2] + 1);
            }
        }
    }

    d[n][m]
}

/// Closest well-known domain for a look-alike, or `None` if `domain` is fine.
pub fn closest_mail_domain(domain: &str) -> Option<&'static str> {
    let domain = domain.trim().to_lowercase();
    if KNOWN_MAIL_DOMAINS.contains(&domain.as_str())
        || LEGITIMATE_MAIL_DOMAINS.contains(&domain.as_str())
    {
        return None;
    }

    let tld = |d: &str| d.rsplit('.').next().map(str::to_string);

    KNOWN_MAIL_DOMAINS
        .iter()
        .map(|known| (*known, edit_distance(&domain, known)))
        .filter(|(known, dist)| {
            *dist == 1 || (*dist == 2 && known.len() >= 9 && tld(known) == tld(&domain))
        })
        .min_by_key(|(_, dist)| *dist)
        .map(|(known, _)| known)
}

/// Corrected address when the domain looks like a misspelled provider.
pub fn suggest_email(email: &str) -> Option<String> {
    let (local, domain) = email.trim().rsplit_once('@')?;
    closest_mail_domain(domain).map(|fixed| format!("{}@{}", local, fixed))
}
