use std::{fs::File, io::BufWriter, path::Path, time::Duration};

use anyhow::{Context, Result, anyhow, bail};
use log::info;

use crate::{
    cli::RedactArgs,
    data::Dataset,
    io_utils,
    oracle::OracleSettings,
    pattern::PatternSource,
    pipeline::{self, OracleBinding, ProcessRequest, ProcessingOutcome},
    table,
};

pub fn execute(args: &RedactArgs) -> Result<()> {
    let source = crate::source_from_args(&args.input)?;
    let output_path = args.output.as_deref();
    let writing_to_stdout = output_path.is_none_or(io_utils::is_dash);
    if args.table && !writing_to_stdout {
        bail!("--table cannot be combined with --output");
    }

    let settings = OracleSettings {
        endpoint: args.oracle_url.clone(),
        model: args.model.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
        max_output_tokens: args.max_output_tokens,
        temperature: args.temperature,
    };
    let binding = if args.offline {
        OracleBinding::Offline
    } else {
        OracleBinding::Remote {
            settings: &settings,
            credential: args.api_key.as_deref(),
        }
    };
    info!(
        "Redacting '{}' ({}) with {}",
        source.path.display(),
        source.format,
        if args.offline {
            "offline rules".to_string()
        } else {
            format!("model '{}'", settings.model)
        }
    );

    let request = ProcessRequest::new(&args.description, &args.replacement)
        .with_column(args.column.clone());
    let outcome = pipeline::process(&source, &request, binding);
    if !outcome.success {
        let message = outcome.error.unwrap_or_else(|| "unknown failure".to_string());
        return Err(anyhow!(message)).with_context(|| format!("Redacting {:?}", source.path));
    }

    info!(
        "Pattern {:?} ({}) applied to {:?}",
        outcome.regex_pattern,
        outcome
            .pattern_source
            .map(PatternSource::as_str)
            .unwrap_or("unknown"),
        outcome.target_columns
    );

    if args.json {
        write_json(&outcome, output_path.filter(|path| !io_utils::is_dash(path)))
    } else if args.table {
        print_summary(&outcome);
        Ok(())
    } else {
        let delimiter = args
            .output_delimiter
            .unwrap_or(io_utils::DEFAULT_CSV_DELIMITER);
        write_csv(&outcome.processed_data, output_path, delimiter)
    }
}

fn write_json(outcome: &ProcessingOutcome, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
            serde_json::to_writer_pretty(BufWriter::new(file), outcome)
                .with_context(|| format!("Writing JSON to {path:?}"))?;
            info!("Wrote processing outcome to {path:?}");
        }
        None => {
            let rendered =
                serde_json::to_string_pretty(outcome).context("Serializing processing outcome")?;
            println!("{rendered}");
        }
    }
    Ok(())
}

fn write_csv(dataset: &Dataset, path: Option<&Path>, delimiter: u8) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path, delimiter)?;
    writer
        .write_record(dataset.columns())
        .context("Writing output headers")?;
    for (idx, row) in dataset.display_rows().iter().enumerate() {
        writer
            .write_record(row)
            .with_context(|| format!("Writing output row {}", idx + 2))?;
    }
    writer.flush().context("Flushing output")?;
    info!(
        "Wrote {} row(s) with delimiter '{}'",
        dataset.row_count(),
        crate::printable_delimiter(delimiter)
    );
    Ok(())
}

fn print_summary(outcome: &ProcessingOutcome) {
    println!("Pattern: {}", outcome.regex_pattern);
    println!("Explanation: {}", outcome.explanation);
    println!();
    let headers = vec!["column".to_string(), "changed".to_string()];
    let rows = outcome
        .replacement_stats
        .iter()
        .map(|(column, changed)| vec![column.clone(), changed.to_string()])
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    println!();
    table::print_table(
        outcome.processed_data.columns(),
        &outcome.processed_data.display_rows(),
    );
}
