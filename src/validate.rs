//! Turns an oracle candidate into a trustworthy [`Analysis`].
//!
//! The result is either the candidate with validated columns and a compiling
//! pattern, the candidate's columns with the deterministic pattern (when its
//! own pattern does not compile or matches the empty string), or a full
//! fallback analysis. Nothing
//! partially invalid leaves this module.

use itertools::Itertools;
use log::{debug, info, warn};

use crate::{
    fallback,
    oracle::AnalysisCandidate,
    pattern::{self, Analysis, PatternSource},
};

pub fn resolve(
    candidate: Option<AnalysisCandidate>,
    textual_columns: &[String],
    description: &str,
) -> Analysis {
    let Some(candidate) = candidate else {
        info!("No oracle suggestion; using fallback analysis");
        return fallback::analyze(description, textual_columns);
    };

    let transport = pattern::normalize_transport(&candidate.pattern);
    if transport != candidate.pattern.as_str() {
        debug!("Doubled single-escaped metacharacters in oracle pattern");
    }
    let native = pattern::to_native(&transport);

    let (kept, dropped): (Vec<String>, Vec<String>) = candidate
        .target_columns
        .into_iter()
        .unique()
        .partition(|column| textual_columns.contains(column));
    if !dropped.is_empty() {
        warn!("Dropped oracle columns not in the dataset's text columns: {dropped:?}");
    }
    if kept.is_empty() {
        warn!("No oracle target column survived validation; using fallback analysis");
        return fallback::analyze(description, textual_columns);
    }

    let requested = fallback::requested_categories(description).len();
    let branches = pattern::branch_count(&native);
    if requested > branches {
        warn!(
            "Oracle pattern has {branches} branch(es) but the description asks for {requested} kind(s) of data; using fallback analysis"
        );
        return fallback::analyze(description, textual_columns);
    }

    let rejection = match pattern::compile(&native) {
        Ok(regex) if !regex.is_match("") => {
            let explanation = if candidate.explanation.trim().is_empty() {
                format!("Generated pattern for: {description}")
            } else {
                candidate.explanation
            };
            return Analysis {
                target_columns: kept,
                pattern: regex,
                explanation,
                source: PatternSource::Oracle,
            };
        }
        Ok(_) => "matches the empty string".to_string(),
        Err(err) => format!("does not compile ({err})"),
    };
    warn!("Oracle pattern {rejection}; substituting deterministic pattern");
    let composed = fallback::compose_pattern(description);
    Analysis {
        target_columns: kept,
        pattern: composed.regex,
        explanation: composed.explanation,
        source: PatternSource::Repaired,
    }
}
