//! The `process` operation: load, infer, validate, replace, assemble.
//!
//! `process` never returns an error and never panics on bad input. Fatal
//! conditions (unreadable file, no textual column, missing credential)
//! produce a failed [`ProcessingOutcome`] with every data field empty.
//! Oracle trouble and per-column failures are absorbed along the way.

use log::{error, info, warn};
use serde::Serialize;

use crate::{
    columns::{sample_columns, textual_columns},
    data::Dataset,
    error::ProcessError,
    loader::{TabularSource, load_dataset},
    oracle::{self, GenerativeClient, OracleSettings, TextOracle},
    pattern::PatternSource,
    strategy::{self, ReplacementStats},
    validate,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    pub description: String,
    pub replacement: String,
    /// Restricts the run to one textual column when set.
    pub column: Option<String>,
}

impl ProcessRequest {
    pub fn new(description: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            replacement: replacement.into(),
            column: None,
        }
    }

    pub fn with_column(mut self, column: Option<String>) -> Self {
        self.column = column;
        self
    }
}

/// How the run reaches the pattern oracle.
#[derive(Clone, Copy)]
pub enum OracleBinding<'a> {
    /// No oracle call; the deterministic engine decides everything.
    Offline,
    /// HTTP oracle using a credential supplied for this call only.
    Remote {
        settings: &'a OracleSettings,
        credential: Option<&'a str>,
    },
    /// Caller-provided oracle.
    Custom(&'a dyn TextOracle),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub original_data: Dataset,
    pub processed_data: Dataset,
    pub regex_pattern: String,
    pub explanation: String,
    pub pattern_source: Option<PatternSource>,
    pub target_columns: Vec<String>,
    pub replacement_stats: ReplacementStats,
    pub columns: Vec<String>,
    pub text_columns: Vec<String>,
}

impl ProcessingOutcome {
    pub fn failed(err: &ProcessError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            ..Self::default()
        }
    }
}

pub fn process(
    source: &TabularSource,
    request: &ProcessRequest,
    binding: OracleBinding<'_>,
) -> ProcessingOutcome {
    match run(source, request, binding) {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("Processing {:?} failed: {err}", source.path);
            ProcessingOutcome::failed(&err)
        }
    }
}

fn run(
    source: &TabularSource,
    request: &ProcessRequest,
    binding: OracleBinding<'_>,
) -> Result<ProcessingOutcome, ProcessError> {
    let remote_client;
    let oracle: Option<&dyn TextOracle> = match binding {
        OracleBinding::Offline => None,
        OracleBinding::Remote {
            settings,
            credential,
        } => {
            let credential = credential
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .ok_or(ProcessError::MissingCredential)?;
            remote_client = GenerativeClient::new(settings.clone(), credential);
            Some(&remote_client)
        }
        OracleBinding::Custom(custom) => Some(custom),
    };

    let dataset = load_dataset(source)?;
    let text_columns = textual_columns(&dataset);
    if text_columns.is_empty() {
        return Err(ProcessError::NoTextualColumns);
    }
    info!("Text columns: {text_columns:?}");

    let explicit_column = request
        .column
        .as_deref()
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .and_then(|column| {
            if text_columns.iter().any(|candidate| candidate == column) {
                Some(column.to_string())
            } else {
                warn!("Ignoring column '{column}': not a text column of this file");
                None
            }
        });
    let grounding = match &explicit_column {
        Some(column) => vec![column.clone()],
        None => text_columns.clone(),
    };

    let candidate = oracle.and_then(|oracle| {
        let samples = sample_columns(&dataset, &grounding);
        oracle::analyze(oracle, &request.description, &grounding, &samples)
    });
    let mut analysis = validate::resolve(candidate, &text_columns, &request.description);
    if let Some(column) = explicit_column {
        analysis.target_columns = vec![column];
    } else if analysis.target_columns.is_empty() {
        info!("No column matched the description; targeting every text column");
        analysis.target_columns = text_columns.clone();
    }

    let replaced = strategy::apply_replacements(
        &dataset,
        &analysis.pattern,
        &request.replacement,
        &analysis.target_columns,
    );
    info!(
        "Replaced values using {:?} pattern {:?}",
        analysis.source,
        analysis.pattern_str()
    );

    Ok(ProcessingOutcome {
        success: true,
        error: None,
        regex_pattern: analysis.pattern_str().to_string(),
        explanation: analysis.explanation,
        pattern_source: Some(analysis.source),
        target_columns: analysis.target_columns,
        replacement_stats: replaced.stats,
        columns: dataset.columns().to_vec(),
        text_columns,
        original_data: dataset,
        processed_data: replaced.dataset,
    })
}
