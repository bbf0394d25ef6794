//! Error types for the pdf2siproquim library.
//!
//! Two disjoint failure classes, and they must never be conflated:
//!
//! * [`SiproquimError`] — **Fatal, structural**: the run cannot produce a
//!   trustworthy file at all (unreadable input, invalid configuration, or a
//!   rendered line whose length disagrees with its declared layout width —
//!   which means the encoder itself is buggy, not the data). Returned as
//!   `Err` from the top-level `convert*` functions.
//!
//! * [`RejectionReason`] — **Per-record, recoverable**: one invoice fails a
//!   business rule (bad checksum, malformed date, unclassifiable
//!   identifier). This is *not* an error type propagated with `?`; it is a
//!   plain value carried inside [`crate::model::ExclusionEntry`]. The filter
//!   records it and moves on — a rejection never aborts the batch, and
//!   callers branch on data, never on catching.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2siproquim library.
///
/// Record-level rejections use [`RejectionReason`] and are collected in the
/// exclusion report rather than propagated here.
#[derive(Debug, Error)]
pub enum SiproquimError {
    // ── Input errors ─────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The PDF text layer could not be extracted at all.
    #[error("Failed to extract text from '{path}': {detail}\nScanned-image PDFs have no text layer; run OCR first.")]
    ExtractionFailed { path: PathBuf, detail: String },

    /// Extraction completed but no invoice records were recognised.
    #[error("No invoice records recognised in '{path}'\nThe document may use an unsupported layout.")]
    NoRecordsFound { path: PathBuf },

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Layout defects (encoder bugs, not bad data) ──────────────────────
    /// A rendered line's length does not match its type's declared width
    /// after all padding/truncation rules were applied. Indicates a defect
    /// in the field-width constants or the encoding logic.
    #[error(
        "Layout defect in {line_kind} line for record '{record}': \
         rendered {actual} characters, layout declares {expected}.\n\
         This is an internal encoder bug, not a data problem — please report it."
    )]
    LayoutDefect {
        line_kind: &'static str,
        record: String,
        expected: usize,
        actual: usize,
    },

    // ── I/O errors ───────────────────────────────────────────────────────
    /// Could not create or write an output artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a single record was excluded from the output file.
///
/// Stored in [`crate::model::ExclusionEntry`]; the `Display` text is what
/// lands in the human-readable exclusion report.
// `field` members are `&'static str`, so this serialises (for `--json`) but
// does not round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
pub enum RejectionReason {
    /// Identifier is neither 11 nor 14 digits — unclassifiable.
    #[error("{field} identifier '{value}' has {len} digits; expected 11 (CPF) or 14 (CNPJ)")]
    InvalidIdentifierFormat {
        field: &'static str,
        value: String,
        len: usize,
    },

    /// An 11-digit identifier failed the CPF check digits.
    #[error("{field} CPF '{value}' fails the Modulo-11 check digits")]
    InvalidCpf { field: &'static str, value: String },

    /// A 14-digit identifier failed the CNPJ check digits and the party name
    /// carries a legal-entity marker, so the individual-name waiver does not
    /// apply.
    #[error("{field} CNPJ '{value}' fails the Modulo-11 check digits")]
    InvalidCnpj { field: &'static str, value: String },

    /// A valid CPF whose zero-padded 14-digit rendering fails the CNPJ
    /// checksum that the downstream validator applies to the rendered field.
    #[error(
        "{field} CPF '{cpf}' is valid, but its 14-digit rendering '{padded}' \
         fails the CNPJ check the SIPROQUIM validator applies to the field"
    )]
    CpfUnrenderable {
        field: &'static str,
        cpf: String,
        padded: String,
    },

    /// A mandatory identifier field was empty.
    #[error("{field} identifier is missing")]
    MissingIdentifier { field: &'static str },

    /// The invoice date is absent or not a well-formed dd/mm/yyyy date.
    #[error("invoice date '{value}' is not a well-formed dd/mm/yyyy date")]
    MalformedInvoiceDate { value: String },

    /// Carriage-note data is present but internally inconsistent.
    #[error("carriage note is inconsistent: {detail}")]
    InconsistentCarriageNote { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_defect_display_names_both_widths() {
        let e = SiproquimError::LayoutDefect {
            line_kind: "TN",
            record: "NF 4521".into(),
            expected: 276,
            actual: 275,
        };
        let msg = e.to_string();
        assert!(msg.contains("276"), "got: {msg}");
        assert!(msg.contains("275"), "got: {msg}");
        assert!(msg.contains("NF 4521"), "got: {msg}");
    }

    #[test]
    fn unrenderable_cpf_display_names_both_forms() {
        let r = RejectionReason::CpfUnrenderable {
            field: "contractor",
            cpf: "41303082896".into(),
            padded: "00041303082896".into(),
        };
        let msg = r.to_string();
        assert!(msg.contains("41303082896"));
        assert!(msg.contains("00041303082896"));
    }

    #[test]
    fn format_rejection_display() {
        let r = RejectionReason::InvalidIdentifierFormat {
            field: "origin",
            value: "12345".into(),
            len: 5,
        };
        assert!(r.to_string().contains("5 digits"));
    }
}
