//! Name normalization.
//!
//! Produces the matching key used for exact-match clustering. The key is a
//! clustering device only; it is never persisted as an identity.
//!
//! Transformations, in order:
//! 1. lowercase
//! 2. strip the `du precedent` back-reference, then relational prefixes
//!    (`femme`, `veuve`, `fils`, `fille`, `wife of`, `widow of`, `son of`,
//!    `daughter of`) with an optional possessive (`de`, `du`, `d'`)
//! 3. strip trailing location clauses (`de X ...`, `du X ...`, `d'X ...`,
//!    `of X ...`)
//! 4. strip trailing age and occupation clauses
//! 5. strip archive reference tokens (`B 123 ...;`, `case 12,`, `witch 40`)
//! 6. collapse whitespace and trim separators
//!
//! The pipeline is repeated until the key stops changing, so normalizing a
//! key again is a no-op.

use std::sync::OnceLock;

use regex::Regex;

struct Patterns {
    relation: Regex,
    preceding: Regex,
    location: Regex,
    location_en: Regex,
    age_clause: Regex,
    trailing_number: Regex,
    occupation: Regex,
    archive_box: Regex,
    archive_case: Regex,
    archive_witch: Regex,
    whitespace: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static normalization pattern compiles")
}

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        relation: compile(
            r"\b(?:(?:femme|veuve|fils|fille)\s+(?:(?:de|du)\s+|d'\s*)?|(?:wife|widow|son|daughter)\s+of\s+)",
        ),
        preceding: compile(r"\bdu\s+pr[eé]c[eé]dent\b"),
        location: compile(r"(?:,\s*|\s+)(?:(?:de|du)\s+|d')\s*[\p{L}\-]+.*$"),
        location_en: compile(r"(?:,\s*|\s+)of\s+[\p{L}\-]+.*$"),
        age_clause: compile(r",?\s*\b(?:âg[ée]e?|aged?)\s+(?:de\s+)?\d+.*$"),
        trailing_number: compile(r",?\s*\d+\s*(?:ans)?\s*$"),
        occupation: compile(r",?\s*\b(?:laboureur|manoeuvrier|manouvrier)\b.*$"),
        archive_box: compile(r"^b\s+\d+.*?;\s*"),
        archive_case: compile(r"^case\s+\d+[,;]?\s*"),
        archive_witch: compile(r"\bwitch\s+\d+[,;]?\s*"),
        whitespace: compile(r"\s+"),
    })
}

fn normalize_once(name: &str) -> String {
    let p = patterns();

    let name = name.to_lowercase();
    let name = p.preceding.replace_all(&name, "");
    let name = p.relation.replace_all(&name, "");
    let name = p.location.replace(&name, "");
    let name = p.location_en.replace(&name, "");
    let name = p.age_clause.replace(&name, "");
    let name = p.trailing_number.replace(&name, "");
    let name = p.occupation.replace(&name, "");
    let name = p.archive_box.replace(&name, "");
    let name = p.archive_case.replace(&name, "");
    let name = p.archive_witch.replace_all(&name, "");
    let name = p.whitespace.replace_all(&name, " ");

    name.trim_matches(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .to_string()
}

/// Normalizes a raw name into its matching key.
///
/// Empty or whitespace-only input yields the empty key, which never takes
/// part in clustering.
///
/// # Examples
///
/// ```
/// use personae::normalize::normalize;
///
/// assert_eq!(normalize("Jean Petit, de Nancy"), "jean petit");
/// assert_eq!(normalize("Odille femme Claudin Thieriat"), "odille claudin thieriat");
/// assert_eq!(normalize("   "), "");
/// ```
#[must_use]
pub fn normalize(raw_name: &str) -> String {
    let mut key = normalize_once(raw_name);
    // Every pass after the first can only remove text, so this terminates.
    loop {
        let next = normalize_once(&key);
        if next == key {
            return key;
        }
        key = next;
    }
}

/// First token of a key, taken as the given name.
#[must_use]
pub fn given_name(key: &str) -> &str {
    key.split_whitespace().next().unwrap_or("")
}

/// Last token of a key, taken as the family name.
#[must_use]
pub fn family_name(key: &str) -> &str {
    key.split_whitespace().next_back().unwrap_or("")
}
