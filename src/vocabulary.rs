//! Keyword tables driving column selection, pattern composition and the
//! per-column replacement strategy, plus the token matcher they share.
//!
//! Text is split into lowercase words on non-alphanumeric characters and on
//! camelCase boundaries. Keywords of three characters or fewer (`ip`, `id`,
//! `url`, ...) only match a whole word or its plural so that `zip` never reads
//! as `ip`. Longer keywords match any substring of a word (`emails`,
//! `telephone`, `firstname`); in prose a few common words that merely contain
//! a keyword (`rename`, `update`, `capacity`) are excluded. Multi-word
//! keywords match as a phrase. `address` directly after another category's
//! keyword (`email address`, `IP addresses`) belongs to that category.

use std::borrow::Cow;

#[derive(Debug)]
pub struct Category {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    /// Engine-native regex literal; `None` for categories used only to pick columns.
    pub pattern: Option<&'static str>,
    pub label: &'static str,
}

pub const CATEGORIES: &[Category] = &[
    Category {
        name: "email",
        keywords: &["email", "e-mail"],
        pattern: Some(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,7}\b"),
        label: "email addresses",
    },
    Category {
        name: "name",
        keywords: &["name", "surname"],
        pattern: Some(r"\b[A-Z][a-z]+(?:[ '-][A-Z][a-z]+)+\b"),
        label: "person names",
    },
    Category {
        name: "phone",
        keywords: &["phone", "mobile", "tel", "fax"],
        pattern: Some(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b"),
        label: "phone numbers",
    },
    Category {
        name: "address",
        keywords: &["address", "street", "city", "zip", "postal"],
        pattern: None,
        label: "postal addresses",
    },
    Category {
        name: "date",
        keywords: &["date", "dob", "birthday", "timestamp"],
        pattern: Some(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{4}\b"),
        label: "dates (MM/DD/YYYY)",
    },
    Category {
        name: "url",
        keywords: &["url", "uri", "link", "website"],
        pattern: Some(r"https?://[^\s]+"),
        label: "URLs",
    },
    Category {
        name: "ip",
        keywords: &["ip", "ipv4", "ipv6", "ipaddr"],
        pattern: Some(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b"),
        label: "IP addresses",
    },
    Category {
        name: "id",
        keywords: &["id", "uuid", "guid", "identifier"],
        pattern: None,
        label: "identifiers",
    },
    Category {
        name: "ssn",
        keywords: &["ssn", "social security"],
        pattern: Some(r"\b\d{3}-?\d{2}-?\d{4}\b"),
        label: "social security numbers",
    },
    Category {
        name: "credit card",
        keywords: &["credit card", "creditcard", "card number", "cardnumber"],
        pattern: Some(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b"),
        label: "credit card numbers",
    },
];

/// Order in which matched categories contribute alternation branches.
pub const PATTERN_ORDER: &[&str] = &[
    "email",
    "phone",
    "name",
    "url",
    "date",
    "ip",
    "ssn",
    "credit card",
];

/// Words that ask for every textual column when nothing more specific matched.
pub const TOTALITY_WORDS: &[&str] = &["all", "everything", "any"];

/// Pattern used when the description names no known category.
pub const GENERIC_PATTERN: &str = r"\S+";

/// Column names that suggest the whole cell is one sensitive value.
pub const DEDICATED_COLUMN_KEYWORDS: &[&str] = &[
    "email",
    "e-mail",
    "phone",
    "mobile",
    "tel",
    "fax",
    "ip",
    "ipv4",
    "ipv6",
    "ipaddr",
    "ssn",
    "social security",
    "credit card",
    "creditcard",
    "card number",
    "iban",
    "account",
    "passport",
    "id",
    "uuid",
    "guid",
];

/// Column names that suggest free text with sensitive values embedded in it.
pub const MIXED_COLUMN_KEYWORDS: &[&str] = &[
    "description",
    "comment",
    "note",
    "message",
    "body",
    "summary",
    "detail",
    "text",
    "remark",
    "feedback",
    "content",
    "bio",
    "review",
    "reason",
];

/// Prose words that contain a keyword without meaning it.
const PROSE_FALSE_FRIENDS: &[&str] = &[
    "rename",
    "unname",
    "update",
    "outdate",
    "candidate",
    "validate",
    "mandate",
    "accommodate",
    "consolidate",
    "liquidate",
    "automobile",
    "icity",
    "acity",
    "ocity",
];

/// Keywords that name another category's data when that category's keyword
/// comes right before them.
const QUALIFIED_KEYWORDS: &[&str] = &["address"];

pub fn category(name: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|category| category.name == name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchMode {
    Prose,
    Identifier,
}

/// Tokenised text ready for keyword lookups.
#[derive(Debug, Clone)]
pub struct Tokens {
    words: Vec<String>,
    joined: String,
    mode: MatchMode,
}

impl Tokens {
    /// Tokens of a free-text description.
    pub fn prose(text: &str) -> Self {
        Self::build(text, MatchMode::Prose)
    }

    /// Tokens of a column name.
    pub fn identifier(text: &str) -> Self {
        Self::build(text, MatchMode::Identifier)
    }

    fn build(text: &str, mode: MatchMode) -> Self {
        let words = split_words(text);
        let joined = format!(" {} ", words.join(" "));
        Self {
            words,
            joined,
            mode,
        }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn matches(&self, keyword: &str) -> bool {
        let parts = split_words(keyword);
        match parts.as_slice() {
            [] => false,
            [single] => self
                .words
                .iter()
                .any(|word| word_matches(word, single, self.mode)),
            phrase => self.joined.contains(&format!(" {}", phrase.join(" "))),
        }
    }

    pub fn matches_any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|keyword| self.matches(keyword))
    }

    pub fn mentions_category(&self, category: &Category) -> bool {
        category.keywords.iter().any(|keyword| {
            if QUALIFIED_KEYWORDS.contains(keyword) {
                self.matches_unqualified(keyword, category)
            } else {
                self.matches(keyword)
            }
        })
    }

    fn matches_unqualified(&self, keyword: &str, owner: &Category) -> bool {
        self.words.iter().enumerate().any(|(idx, word)| {
            word_matches(word, keyword, self.mode) && !self.qualified_at(idx, owner)
        })
    }

    /// True when a keyword of a category other than `owner` ends right before `idx`.
    fn qualified_at(&self, idx: usize, owner: &Category) -> bool {
        CATEGORIES
            .iter()
            .filter(|category| category.name != owner.name)
            .flat_map(|category| category.keywords.iter())
            .any(|keyword| {
                let parts = split_words(keyword);
                idx >= parts.len()
                    && self.words[idx - parts.len()..idx]
                        .iter()
                        .zip(&parts)
                        .all(|(word, part)| word_matches(word, part, self.mode))
            })
    }
}

fn word_matches(word: &str, keyword: &str, mode: MatchMode) -> bool {
    if keyword.len() <= 3 {
        return word == keyword || word.strip_suffix('s') == Some(keyword);
    }
    if !word.contains(keyword) {
        return false;
    }
    match mode {
        MatchMode::Prose => !PROSE_FALSE_FRIENDS
            .iter()
            .any(|stem| stem.contains(keyword) && word.contains(stem)),
        MatchMode::Identifier => true,
    }
}

/// Lowercase words split on non-alphanumerics and lower-to-upper case changes.
fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for ch in text.chars() {
        if !ch.is_alphanumeric() {
            flush(&mut words, &mut current);
            previous_lower = false;
            continue;
        }
        if ch.is_uppercase() && previous_lower {
            flush(&mut words, &mut current);
        }
        previous_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    flush(&mut words, &mut current);
    words
}

fn flush(words: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        words.push(std::mem::take(current));
    }
}

/// Lowercased description used for literal column-name lookups.
pub fn fold_case(text: &str) -> Cow<'_, str> {
    if text.chars().any(char::is_uppercase) {
        Cow::Owned(text.to_lowercase())
    } else {
        Cow::Borrowed(text)
    }
}
