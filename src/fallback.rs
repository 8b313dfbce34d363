//! Deterministic analysis used whenever the oracle is absent or its reply is
//! rejected. Total: it never fails and never calls out.

use std::sync::LazyLock;

use itertools::Itertools;
use log::{debug, info, warn};
use regex::Regex;

use crate::{
    pattern::{self, Analysis, PatternSource},
    vocabulary::{self, CATEGORIES, Category, GENERIC_PATTERN, PATTERN_ORDER, TOTALITY_WORDS, Tokens},
};

static GENERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(GENERIC_PATTERN).expect("generic pattern compiles"));

const GENERIC_EXPLANATION: &str =
    "Generic pattern - matches any non-whitespace token (fallback pattern)";

#[derive(Debug, Clone)]
pub struct ComposedPattern {
    pub regex: Regex,
    pub categories: Vec<&'static str>,
    pub explanation: String,
}

pub fn analyze(description: &str, textual_columns: &[String]) -> Analysis {
    let target_columns = match_columns(description, textual_columns);
    let composed = compose_pattern(description);
    info!(
        "Fallback analysis: columns {:?}, pattern {:?}",
        target_columns,
        composed.regex.as_str()
    );
    Analysis {
        target_columns,
        pattern: composed.regex,
        explanation: composed.explanation,
        source: PatternSource::Fallback,
    }
}

/// Pattern-bearing categories the description asks for, in composition order.
pub fn requested_categories(description: &str) -> Vec<&'static Category> {
    let tokens = Tokens::prose(description);
    PATTERN_ORDER
        .iter()
        .filter_map(|name| vocabulary::category(name))
        .filter(|category| category.pattern.is_some() && tokens.mentions_category(category))
        .collect()
}

pub fn compose_pattern(description: &str) -> ComposedPattern {
    let categories = requested_categories(description);
    if categories.is_empty() {
        debug!("No known data category in '{description}'; using generic pattern");
        return generic();
    }
    let joined = categories
        .iter()
        .filter_map(|category| category.pattern)
        .join("|");
    match pattern::compile(&joined) {
        Ok(regex) => ComposedPattern {
            regex,
            categories: categories.iter().map(|category| category.name).collect(),
            explanation: format!(
                "Matches {} (fallback pattern)",
                categories.iter().map(|category| category.label).join(", ")
            ),
        },
        Err(err) => {
            warn!("Built-in patterns failed to compile ({err}); using generic pattern");
            generic()
        }
    }
}

fn generic() -> ComposedPattern {
    ComposedPattern {
        regex: GENERIC.clone(),
        categories: Vec::new(),
        explanation: GENERIC_EXPLANATION.to_string(),
    }
}

/// Columns named literally in the description, plus columns whose name
/// shares a category with it. Every textual column when neither matched and
/// the description asks for "all"/"everything"/"any".
pub fn match_columns(description: &str, textual_columns: &[String]) -> Vec<String> {
    let lowered = vocabulary::fold_case(description);
    let tokens = Tokens::prose(description);
    let mentioned = CATEGORIES
        .iter()
        .filter(|category| tokens.mentions_category(category))
        .collect_vec();

    let selected = textual_columns
        .iter()
        .filter(|column| {
            let name = column.trim().to_lowercase();
            if !name.is_empty() && lowered.contains(name.as_str()) {
                debug!("Column '{column}' is named in the description");
                return true;
            }
            let column_tokens = Tokens::identifier(column);
            match mentioned
                .iter()
                .find(|category| column_tokens.mentions_category(category))
            {
                Some(category) => {
                    debug!("Column '{column}' matches category '{}'", category.name);
                    true
                }
                None => false,
            }
        })
        .cloned()
        .collect_vec();

    if selected.is_empty() && tokens.matches_any(TOTALITY_WORDS) {
        debug!("Description asks for every column");
        return textual_columns.to_vec();
    }
    selected
}
