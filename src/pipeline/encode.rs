//! The positional encoder: validated records to fixed-width lines.
//!
//! Output is a line-oriented positional text file. Field identity is carried
//! by offset and width alone, so a line of the wrong length corrupts every
//! field after the defect — silently, because there are no delimiters for a
//! consumer to resynchronise on. Every constructor here therefore measures
//! the rendered line against its declared width and returns
//! [`SiproquimError::LayoutDefect`] on any disagreement. That error is fatal
//! and names the encoder, not the data: by the time a record reaches this
//! stage every value has been validated, so a bad width can only mean the
//! constants in [`layout`] and the rendering code have drifted apart.
//!
//! Line types:
//!
//! | Tag  | Width | Cardinality            |
//! |------|-------|------------------------|
//! | `EM` | 31    | exactly one, first     |
//! | `TN` | 276   | one per record         |
//! | `CC` | 103   | one per carriage note  |

use crate::config::ConversionConfig;
use crate::error::SiproquimError;
use crate::model::{CarriageNote, ValidatedRecord};
use crate::pipeline::layout;
use crate::sanitize;

/// The three positional line types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Company/period header.
    Em,
    /// National transport record.
    Tn,
    /// Carriage-note complement.
    Cc,
}

impl LineKind {
    /// Two-character type tag, the first field of every line.
    pub fn tag(self) -> &'static str {
        match self {
            LineKind::Em => layout::EM_TYPE,
            LineKind::Tn => layout::TN_TYPE,
            LineKind::Cc => layout::CC_TYPE,
        }
    }

    /// Declared total width for this line type.
    pub fn width(self) -> usize {
        match self {
            LineKind::Em => layout::EM_TOTAL,
            LineKind::Tn => layout::TN_TOTAL,
            LineKind::Cc => layout::CC_TOTAL,
        }
    }
}

/// A rendered line whose length has been checked against its type's width.
///
/// The only way to obtain one is through the constructors in this module, so
/// holding a `PositionalLine` is proof the width invariant held at build
/// time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalLine {
    kind: LineKind,
    text: String,
}

impl PositionalLine {
    /// Seal a rendered line, enforcing the width invariant.
    ///
    /// `record_label` identifies the source record in the defect message
    /// (invoice number, or the file header).
    fn sealed(kind: LineKind, text: String, record_label: &str) -> Result<Self, SiproquimError> {
        // Sanitised fields are pure ASCII, so byte length equals column
        // count.
        if text.len() != kind.width() {
            return Err(SiproquimError::LayoutDefect {
                line_kind: kind.tag(),
                record: record_label.to_string(),
                expected: kind.width(),
                actual: text.len(),
            });
        }
        Ok(Self { kind, text })
    }

    pub fn kind(&self) -> LineKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Render the EM header for a conversion run.
pub fn header_line(config: &ConversionConfig) -> Result<PositionalLine, SiproquimError> {
    let text = format!(
        "{}{}{}{}{}",
        layout::EM_TYPE,
        sanitize::numeric_field(Some(&config.issuer_id), layout::EM_CNPJ_W),
        config.period.month_code(),
        config.period.year,
        layout::EM_FLAGS_TRANSPORT,
    );
    PositionalLine::sealed(LineKind::Em, text, "file header")
}

/// Render the TN line for one validated record.
pub fn transport_line(record: &ValidatedRecord) -> Result<PositionalLine, SiproquimError> {
    let text = format!(
        "{}{}{}{}{}{}{}{}{}{}{}",
        layout::TN_TYPE,
        sanitize::numeric_field(Some(record.contractor_id()), layout::TN_CNPJ_W),
        sanitize::text_field(Some(record.contractor_name()), layout::TN_NAME_W),
        sanitize::alnum_field(Some(record.invoice_number()), layout::TN_NF_NUMBER_W),
        sanitize::text_field(Some(record.invoice_date()), layout::TN_NF_DATE_W),
        sanitize::numeric_field(Some(record.origin_id()), layout::TN_CNPJ_W),
        sanitize::text_field(Some(record.origin_name()), layout::TN_NAME_W),
        sanitize::numeric_field(Some(record.destination_id()), layout::TN_CNPJ_W),
        sanitize::text_field(Some(record.destination_name()), layout::TN_NAME_W),
        sanitize::text_field(Some(record.pickup_site()), layout::TN_SITE_W),
        sanitize::text_field(Some(record.delivery_site()), layout::TN_SITE_W),
    );
    PositionalLine::sealed(LineKind::Tn, text, record.invoice_number())
}

/// Render the CC line for a record's carriage note.
pub fn carriage_line(
    record: &ValidatedRecord,
    note: &CarriageNote,
) -> Result<PositionalLine, SiproquimError> {
    let text = format!(
        "{}{}{}{}{}{}",
        layout::CC_TYPE,
        sanitize::numeric_field(Some(&note.number), layout::CC_NOTE_NUMBER_W),
        sanitize::text_field(Some(&note.note_date), layout::CC_DATE_W),
        sanitize::text_field(Some(&note.receipt_date), layout::CC_DATE_W),
        sanitize::text_field(Some(&note.receiver_name), layout::CC_RECEIVER_W),
        layout::CC_MODAL_ROAD,
    );
    PositionalLine::sealed(LineKind::Cc, text, record.invoice_number())
}

/// Encode a whole batch: one EM header, then a TN line per record, each
/// followed by its CC line when a carriage note is present. Record order is
/// preserved.
///
/// Any `Err` here aborts the run — partial positional files are worse than
/// no file.
pub fn encode_batch(
    records: &[ValidatedRecord],
    config: &ConversionConfig,
) -> Result<Vec<PositionalLine>, SiproquimError> {
    let mut lines = Vec::with_capacity(1 + records.len() * 2);
    lines.push(header_line(config)?);
    for record in records {
        lines.push(transport_line(record)?);
        if let Some(note) = record.carriage_note() {
            lines.push(carriage_line(record, note)?);
        }
    }
    Ok(lines)
}

/// Assemble the final file text: `\n`-separated lines with a trailing
/// newline.
pub fn render_file(lines: &[PositionalLine]) -> String {
    let mut out = String::with_capacity(lines.iter().map(|l| l.as_str().len() + 1).sum());
    for line in lines {
        out.push_str(line.as_str());
        out.push('\n');
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────────────
