//! Top-level conversion API.
//!
//! [`convert`] runs the whole pipeline for a PDF on disk; [`convert_records`]
//! is the same pipeline entered after extraction, for callers that already
//! hold raw records (tests, batch front-ends, alternative extractors);
//! [`convert_to_file`] additionally writes the artifacts with deterministic
//! names.

use crate::config::ConversionConfig;
use crate::error::SiproquimError;
use crate::model::RawRecord;
use crate::output::{self, ConversionOutput, ConversionStats};
use crate::pipeline::{encode, extract, filter, input};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Paths of the artifacts a [`convert_to_file`] run produced.
#[derive(Debug, Clone)]
pub struct WrittenArtifacts {
    /// The positional map file.
    pub map_path: PathBuf,
    /// The exclusion report; `None` when no record was excluded.
    pub exclusion_path: Option<PathBuf>,
}

/// Convert a PDF into positional file text and an exclusion list.
pub fn convert(
    pdf: &Path,
    config: &ConversionConfig,
) -> Result<ConversionOutput, SiproquimError> {
    let started = Instant::now();
    let resolved = input::resolve_pdf(pdf)?;
    let records = extract::extract_records(&resolved)?;
    finish(records, config, started)
}

/// Convert pre-extracted records, skipping the PDF stages.
pub fn convert_records(
    records: Vec<RawRecord>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, SiproquimError> {
    finish(records, config, Instant::now())
}

/// Filter and encode, assembling the final output value.
fn finish(
    records: Vec<RawRecord>,
    config: &ConversionConfig,
    started: Instant,
) -> Result<ConversionOutput, SiproquimError> {
    let extracted = records.len();
    let outcome = filter::filter_records(&records, config);

    if outcome.accepted.is_empty() {
        // A header-only file is structurally valid, but uploading one is
        // almost never what the operator wants.
        warn!("no record passed validation; the map file will carry only its header");
    }

    let lines = encode::encode_batch(&outcome.accepted, config)?;
    let file_text = encode::render_file(&lines);

    let stats = ConversionStats {
        extracted,
        duplicates: outcome.duplicates,
        accepted: outcome.accepted.len(),
        excluded: outcome.exclusions.len(),
        corrected: outcome.corrected,
        lines: lines.len(),
        duration_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        accepted = stats.accepted,
        excluded = stats.excluded,
        lines = stats.lines,
        "conversion complete"
    );

    Ok(ConversionOutput {
        file_text,
        lines,
        exclusions: outcome.exclusions,
        stats,
    })
}

/// Convert a PDF and write the map file (and, when needed, the exclusion
/// report) into `output_dir` under their deterministic names.
pub fn convert_to_file(
    pdf: &Path,
    output_dir: &Path,
    config: &ConversionConfig,
) -> Result<(ConversionOutput, WrittenArtifacts), SiproquimError> {
    let output = convert(pdf, config)?;

    let map_path = output_dir.join(output::map_file_name(config, pdf));
    output::write_atomic(&map_path, &output.file_text)?;

    let exclusion_path = match output.exclusion_report(config) {
        Some(report) => {
            let path = output_dir.join(output::exclusion_file_name(config, pdf));
            output::write_atomic(&path, &report)?;
            Some(path)
        }
        None => None,
    };

    Ok((
        output,
        WrittenArtifacts {
            map_path,
            exclusion_path,
        },
    ))
}
