//! Data model for the extract → filter → encode pipeline.
//!
//! Three record shapes, one per trust level:
//!
//! * [`RawRecord`] — whatever extraction scraped out of the PDF. Untrimmed,
//!   unnormalised, optionally missing anything. The string-keyed dynamic
//!   shape of the extraction boundary is converted to this typed struct in
//!   exactly one place ([`RawRecord::from_fields`]) so the "open mapping"
//!   risk never leaks past the seam.
//! * [`ValidatedRecord`] — produced only by the record filter after
//!   classification, checksum validation and normalisation. Fields are
//!   private and read-only: once a record is validated nothing downstream
//!   may edit it, only render it.
//! * [`ExclusionEntry`] — one per rejected record, never mutated afterwards;
//!   the exclusion report is these entries printed in input order.

use crate::error::RejectionReason;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One invoice's worth of raw extracted fields.
///
/// Every value is the literal text the extractor found: accents, mixed case,
/// stray whitespace and extraction noise included. Normalisation belongs to
/// the filter, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// CNPJ or CPF of the party contracting the transport.
    pub contractor_id: Option<String>,
    pub contractor_name: Option<String>,
    /// NF (nota fiscal) number — the dedup key.
    pub invoice_number: Option<String>,
    /// Invoice issue date, dd/mm/yyyy.
    pub invoice_date: Option<String>,
    /// CNPJ of the issuing (origin) party. Always organisational.
    pub origin_id: Option<String>,
    pub origin_name: Option<String>,
    /// CNPJ or CPF of the receiving (destination) party.
    pub destination_id: Option<String>,
    pub destination_name: Option<String>,
    /// CTe (carriage note) number, when the invoice travels with one.
    pub note_number: Option<String>,
    /// CTe issue date, dd/mm/yyyy.
    pub note_date: Option<String>,
    /// Goods receipt date, dd/mm/yyyy; defaults to the note date downstream.
    pub receipt_date: Option<String>,
    /// Person or company that signed for the goods.
    pub receiver_name: Option<String>,
    /// Pickup location code (single character, defaults to own premises).
    pub pickup_site: Option<String>,
    /// Delivery location code (single character, defaults to own premises).
    pub delivery_site: Option<String>,
}

impl RawRecord {
    /// Convert a string-keyed field mapping (the extraction collaborators'
    /// interchange format) into the typed record.
    ///
    /// Unknown keys are ignored; blank values become `None`. This is the
    /// single point where dynamic shape enters the core.
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        fn get(fields: &HashMap<String, String>, key: &str) -> Option<String> {
            fields
                .get(key)
                .map(|v| v.to_string())
                .filter(|v| !v.trim().is_empty())
        }
        Self {
            contractor_id: get(fields, "contractor_id"),
            contractor_name: get(fields, "contractor_name"),
            invoice_number: get(fields, "invoice_number"),
            invoice_date: get(fields, "invoice_date"),
            origin_id: get(fields, "origin_id"),
            origin_name: get(fields, "origin_name"),
            destination_id: get(fields, "destination_id"),
            destination_name: get(fields, "destination_name"),
            note_number: get(fields, "note_number"),
            note_date: get(fields, "note_date"),
            receipt_date: get(fields, "receipt_date"),
            receiver_name: get(fields, "receiver_name"),
            pickup_site: get(fields, "pickup_site"),
            delivery_site: get(fields, "delivery_site"),
        }
    }

    /// Invoice number for log/report messages; `"N/A"` when absent.
    pub fn invoice_display(&self) -> &str {
        self.invoice_number.as_deref().unwrap_or("N/A")
    }
}

/// Carriage-note (CTe) data carried by a validated record.
///
/// Existence implies internal consistency: a non-blank number and two
/// well-formed dates; the filter rejects records that have note data but
/// cannot satisfy that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarriageNote {
    pub number: String,
    pub note_date: String,
    pub receipt_date: String,
    pub receiver_name: String,
}

/// Non-fatal observations the filter attaches to an accepted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Annotation {
    /// A 14-digit identifier failed its checksum but the party name shows no
    /// legal-entity marker: treated as a personal identifier miscoded into
    /// 14 digits and accepted as-is.
    UncheckedCnpjAccepted { field: &'static str, value: String },
    /// Contractor and destination carry the same identifier.
    SamePartyBothEnds { value: String },
    /// A blank party name was filled in from the branch directory.
    NameFilledFromDirectory { field: &'static str, value: String },
    /// A party name is still blank after directory lookup.
    MissingPartyName { field: &'static str },
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::UncheckedCnpjAccepted { field, value } => write!(
                f,
                "{field} CNPJ '{value}' fails its checksum but the name has no \
                 legal-entity marker; accepted as a miscoded personal identifier"
            ),
            Annotation::SamePartyBothEnds { value } => write!(
                f,
                "contractor and destination share the identifier '{value}'"
            ),
            Annotation::NameFilledFromDirectory { field, value } => {
                write!(f, "{field} name was blank; filled from directory: '{value}'")
            }
            Annotation::MissingPartyName { field } => {
                write!(f, "{field} name is blank and unknown to the directory")
            }
        }
    }
}

/// A record every identifier of which has been classified, checksum-checked
/// and normalised. Created only by the record filter; immutable once built;
/// consumed only by the positional encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedRecord {
    contractor_id: String,
    contractor_name: String,
    invoice_number: String,
    invoice_date: String,
    origin_id: String,
    origin_name: String,
    destination_id: String,
    destination_name: String,
    pickup_site: String,
    delivery_site: String,
    carriage_note: Option<CarriageNote>,
    annotations: Vec<Annotation>,
}

impl ValidatedRecord {
    /// Assemble a validated record. Filter-internal; everything handed in is
    /// already normalised and checksum-checked.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        contractor_id: String,
        contractor_name: String,
        invoice_number: String,
        invoice_date: String,
        origin_id: String,
        origin_name: String,
        destination_id: String,
        destination_name: String,
        pickup_site: String,
        delivery_site: String,
        carriage_note: Option<CarriageNote>,
        annotations: Vec<Annotation>,
    ) -> Self {
        Self {
            contractor_id,
            contractor_name,
            invoice_number,
            invoice_date,
            origin_id,
            origin_name,
            destination_id,
            destination_name,
            pickup_site,
            delivery_site,
            carriage_note,
            annotations,
        }
    }

    pub fn contractor_id(&self) -> &str {
        &self.contractor_id
    }
    pub fn contractor_name(&self) -> &str {
        &self.contractor_name
    }
    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }
    pub fn invoice_date(&self) -> &str {
        &self.invoice_date
    }
    pub fn origin_id(&self) -> &str {
        &self.origin_id
    }
    pub fn origin_name(&self) -> &str {
        &self.origin_name
    }
    pub fn destination_id(&self) -> &str {
        &self.destination_id
    }
    pub fn destination_name(&self) -> &str {
        &self.destination_name
    }
    pub fn pickup_site(&self) -> &str {
        &self.pickup_site
    }
    pub fn delivery_site(&self) -> &str {
        &self.delivery_site
    }
    pub fn carriage_note(&self) -> Option<&CarriageNote> {
        self.carriage_note.as_ref()
    }
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

/// One rejected record: what it was, which identifier offended, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusionEntry {
    /// Invoice number as extracted (may itself be `N/A` when missing).
    pub invoice_number: String,
    /// Name of the party owning the offending field, as extracted.
    pub party_name: String,
    /// The offending identifier, digits only.
    pub identifier: String,
    /// The business rule that excluded the record.
    pub reason: RejectionReason,
}

impl fmt::Display for ExclusionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NF {} | {} | {} | {}",
            self.invoice_number, self.party_name, self.identifier, self.reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fields_maps_known_keys_and_drops_blanks() {
        let mut fields = HashMap::new();
        fields.insert("invoice_number".to_string(), "4521".to_string());
        fields.insert("contractor_id".to_string(), "  ".to_string());
        fields.insert("unknown_key".to_string(), "ignored".to_string());

        let r = RawRecord::from_fields(&fields);
        assert_eq!(r.invoice_number.as_deref(), Some("4521"));
        assert_eq!(r.contractor_id, None, "blank values become None");
        assert_eq!(r.origin_id, None);
    }

    #[test]
    fn exclusion_entry_display_is_one_line() {
        let e = ExclusionEntry {
            invoice_number: "4521".into(),
            party_name: "ACME LTDA".into(),
            identifier: "12345678901234".into(),
            reason: RejectionReason::InvalidCnpj {
                field: "origin",
                value: "12345678901234".into(),
            },
        };
        let line = e.to_string();
        assert!(line.contains("NF 4521"));
        assert!(line.contains("ACME LTDA"));
        assert!(!line.contains('\n'));
    }
}
