//! The record filter: business-rule validation between extraction and
//! encoding.
//!
//! Every record the encoder ever sees has passed through [`filter_records`].
//! The contract is all-or-nothing per record and never-fatal per batch: a
//! record either becomes an immutable [`ValidatedRecord`] or contributes one
//! [`ExclusionEntry`] and disappears — the filter always runs to completion
//! and returns whatever survived, in input order.
//!
//! ## Why validate before formatting?
//!
//! The downstream SIPROQUIM validator checks the *rendered* 14-character
//! identifier field with the CNPJ algorithm, whatever the identifier's true
//! type. A valid CPF zero-padded to 14 digits almost never passes that
//! check, so a file containing one bounces after upload with a message that
//! points nowhere near the real cause. The filter therefore simulates the
//! rendering (`zero-pad → CNPJ checksum`) for every CPF *before* a single
//! line exists, and excludes the record with a reason naming both forms.
//!
//! Rule order per record:
//! 1. batch dedup by invoice number (first occurrence wins, silent)
//! 2. normalise all text fields; repair blank names from the branch directory
//! 3. classify identifiers by length; unknown on a mandatory field rejects
//! 4. CPF fields: own checksum, then the padded-rendering check
//! 5. origin: always validated as CNPJ, no waiver
//! 6. contractor/destination CNPJ failing checksum: waived with a warning
//!    when the name shows no whole-word legal-entity marker
//! 7. structural checks: invoice date, carriage-note consistency

use crate::config::ConversionConfig;
use crate::error::RejectionReason;
use crate::identifier::{self, TaxIdKind};
use crate::model::{Annotation, CarriageNote, ExclusionEntry, RawRecord, ValidatedRecord};
use crate::pipeline::layout;
use crate::sanitize;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Everything the filter produced for one batch.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Records cleared for encoding, in input order.
    pub accepted: Vec<ValidatedRecord>,
    /// One entry per rejected record, in input order.
    pub exclusions: Vec<ExclusionEntry>,
    /// Blank party names filled in from the branch directory.
    pub corrected: usize,
    /// Records silently dropped as in-batch duplicates.
    pub duplicates: usize,
}

/// Validate and normalise a batch of raw records.
///
/// Pure with respect to its inputs: same records + same config always yield
/// identical accepted and exclusion sequences, so re-running is safe and
/// cheap.
pub fn filter_records(records: &[RawRecord], config: &ConversionConfig) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    let mut seen_invoices: HashSet<String> = HashSet::new();

    for raw in records {
        // Safety-net dedup: extraction already deduplicates across pages,
        // but first-occurrence-wins must hold within this batch regardless
        // of where the records came from.
        if let Some(number) = &raw.invoice_number {
            let key = sanitize::flatten(number);
            if !key.is_empty() && !seen_invoices.insert(key) {
                debug!(invoice = raw.invoice_display(), "duplicate invoice dropped");
                outcome.duplicates += 1;
                continue;
            }
        }

        match validate_record(raw, config) {
            Ok((record, corrections)) => {
                for a in record.annotations() {
                    warn!(invoice = record.invoice_number(), "{a}");
                }
                outcome.corrected += corrections;
                outcome.accepted.push(record);
            }
            Err(entry) => {
                warn!(
                    invoice = %entry.invoice_number,
                    reason = %entry.reason,
                    "record excluded"
                );
                outcome.exclusions.push(entry);
            }
        }
    }

    info!(
        accepted = outcome.accepted.len(),
        excluded = outcome.exclusions.len(),
        duplicates = outcome.duplicates,
        corrected = outcome.corrected,
        "filter complete"
    );
    outcome
}

/// How a party identifier field is validated.
#[derive(Clone, Copy, PartialEq)]
enum IdRule {
    /// Contractor/destination: CPF or CNPJ; CPF must survive rendering;
    /// checksum-failing CNPJ is waived for individual-looking names.
    Relaxed,
    /// Origin: CNPJ only, checksum always enforced, no waiver.
    OrganisationalOnly,
}

/// Validate one record. `Ok` carries the validated record plus the number of
/// directory corrections applied; `Err` carries the finished exclusion
/// entry. Callers branch on the variant — rejection is data, not a panic or
/// a thrown error.
fn validate_record(
    raw: &RawRecord,
    config: &ConversionConfig,
) -> Result<(ValidatedRecord, usize), ExclusionEntry> {
    let invoice_number = sanitize::flatten(raw.invoice_number.as_deref().unwrap_or(""));
    let invoice_display = if invoice_number.is_empty() {
        "N/A".to_string()
    } else {
        invoice_number.clone()
    };

    let mut annotations: Vec<Annotation> = Vec::new();
    let mut corrections = 0usize;

    // ── Normalise names, repairing blanks from the directory ─────────────
    let mut name_of = |field: &'static str, name: Option<&str>, id: Option<&str>| -> String {
        let normalised = sanitize::flatten(name.unwrap_or(""));
        if !normalised.is_empty() {
            return normalised;
        }
        if let Some(known) = id.and_then(|id| config.branches.name_for(id)) {
            let filled = sanitize::flatten(known);
            annotations.push(Annotation::NameFilledFromDirectory {
                field,
                value: filled.clone(),
            });
            corrections += 1;
            return filled;
        }
        annotations.push(Annotation::MissingPartyName { field });
        String::new()
    };

    let contractor_name = name_of(
        "contractor",
        raw.contractor_name.as_deref(),
        raw.contractor_id.as_deref(),
    );
    let origin_name = name_of(
        "origin",
        raw.origin_name.as_deref(),
        raw.origin_id.as_deref(),
    );
    let destination_name = name_of(
        "destination",
        raw.destination_name.as_deref(),
        raw.destination_id.as_deref(),
    );

    // ── Identifiers ──────────────────────────────────────────────────────
    let reject = |party_name: &str, identifier: String, reason: RejectionReason| ExclusionEntry {
        invoice_number: invoice_display.clone(),
        party_name: party_name.to_string(),
        identifier,
        reason,
    };

    let contractor_id = check_party_id(
        "contractor",
        raw.contractor_id.as_deref(),
        &contractor_name,
        IdRule::Relaxed,
        config,
        &mut annotations,
    )
    .map_err(|(id, reason)| reject(&contractor_name, id, reason))?;

    let origin_id = check_party_id(
        "origin",
        raw.origin_id.as_deref(),
        &origin_name,
        IdRule::OrganisationalOnly,
        config,
        &mut annotations,
    )
    .map_err(|(id, reason)| reject(&origin_name, id, reason))?;

    let destination_id = check_party_id(
        "destination",
        raw.destination_id.as_deref(),
        &destination_name,
        IdRule::Relaxed,
        config,
        &mut annotations,
    )
    .map_err(|(id, reason)| reject(&destination_name, id, reason))?;

    if contractor_id == destination_id && contractor_id.chars().any(|c| c != '0') {
        annotations.push(Annotation::SamePartyBothEnds {
            value: contractor_id.clone(),
        });
    }

    // ── Structural checks ────────────────────────────────────────────────
    let invoice_date = match well_formed_date(raw.invoice_date.as_deref()) {
        Some(d) => d,
        None => {
            return Err(reject(
                &contractor_name,
                contractor_id,
                RejectionReason::MalformedInvoiceDate {
                    value: raw.invoice_date.clone().unwrap_or_default(),
                },
            ))
        }
    };

    let carriage_note = match build_carriage_note(
        raw,
        &destination_name,
        &contractor_name,
        &origin_name,
    ) {
        Ok(note) => note,
        Err(detail) => {
            return Err(reject(
                &contractor_name,
                contractor_id,
                RejectionReason::InconsistentCarriageNote { detail },
            ))
        }
    };

    let record = ValidatedRecord::new(
        contractor_id,
        contractor_name,
        invoice_number,
        invoice_date,
        origin_id,
        origin_name,
        destination_id,
        destination_name,
        site_code(raw.pickup_site.as_deref()),
        site_code(raw.delivery_site.as_deref()),
        carriage_note,
        annotations,
    );
    Ok((record, corrections))
}

/// Classify and checksum-check one identifier field.
///
/// Returns the cleaned digit string on success; on failure returns the
/// cleaned digits together with the reason, so the exclusion entry can name
/// the offending value.
fn check_party_id(
    field: &'static str,
    raw_id: Option<&str>,
    normalised_name: &str,
    rule: IdRule,
    config: &ConversionConfig,
    annotations: &mut Vec<Annotation>,
) -> Result<String, (String, RejectionReason)> {
    let id = identifier::digits(raw_id.unwrap_or(""));
    if id.is_empty() {
        return Err((id, RejectionReason::MissingIdentifier { field }));
    }

    match identifier::classify(&id) {
        TaxIdKind::Cpf if rule == IdRule::OrganisationalOnly => {
            // Origin is always organisational, whoever the name suggests.
            let len = id.len();
            Err((
                id.clone(),
                RejectionReason::InvalidIdentifierFormat {
                    field,
                    value: id,
                    len,
                },
            ))
        }
        TaxIdKind::Cpf => {
            if !identifier::is_valid_cpf(&id) {
                return Err((
                    id.clone(),
                    RejectionReason::InvalidCpf { field, value: id },
                ));
            }
            // The formatting-rejection rule: a CPF that cannot survive its
            // own 14-digit rendering must be stopped here, before any output
            // exists.
            if config.reject_unrenderable_cpf && !identifier::cpf_survives_cnpj_rendering(&id) {
                let padded = identifier::pad_to_cnpj_width(&id);
                return Err((
                    id.clone(),
                    RejectionReason::CpfUnrenderable {
                        field,
                        cpf: id,
                        padded,
                    },
                ));
            }
            Ok(id)
        }
        TaxIdKind::Cnpj => {
            if identifier::is_valid_cnpj(&id) {
                return Ok(id);
            }
            // Relaxed fields tolerate a checksum-failing CNPJ when the name
            // shows no legal-entity marker: a personal identifier miscoded
            // into 14 digits. No re-padding check — the field is already 14
            // wide, nothing gets reformatted.
            if rule == IdRule::Relaxed && !config.name_has_entity_marker(normalised_name) {
                annotations.push(Annotation::UncheckedCnpjAccepted {
                    field,
                    value: id.clone(),
                });
                return Ok(id);
            }
            Err((
                id.clone(),
                RejectionReason::InvalidCnpj { field, value: id },
            ))
        }
        TaxIdKind::Unknown => {
            let len = id.len();
            Err((
                id.clone(),
                RejectionReason::InvalidIdentifierFormat {
                    field,
                    value: id,
                    len,
                },
            ))
        }
    }
}

/// Parse and canonicalise a dd/mm/yyyy date; `None` when absent or
/// structurally malformed.
fn well_formed_date(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    let parsed = NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok()?;
    Some(parsed.format("%d/%m/%Y").to_string())
}

/// Assemble the carriage note, or `Err(detail)` when note data is present
/// but inconsistent. Absent note data is `Ok(None)` — the record simply gets
/// no CC line.
fn build_carriage_note(
    raw: &RawRecord,
    destination_name: &str,
    contractor_name: &str,
    origin_name: &str,
) -> Result<Option<CarriageNote>, String> {
    let number = match &raw.note_number {
        Some(n) if !n.trim().is_empty() => identifier::digits(n),
        _ => return Ok(None),
    };
    if number.is_empty() || number.chars().all(|c| c == '0') {
        return Err(format!(
            "note number '{}' has no usable digits",
            raw.note_number.as_deref().unwrap_or("")
        ));
    }

    let note_date = well_formed_date(raw.note_date.as_deref()).ok_or_else(|| {
        format!(
            "note date '{}' is not a well-formed dd/mm/yyyy date",
            raw.note_date.as_deref().unwrap_or("")
        )
    })?;

    // Receipt date defaults to the note date when the PDF had none.
    let receipt_date = match raw.receipt_date.as_deref() {
        None => note_date.clone(),
        Some(r) if r.trim().is_empty() => note_date.clone(),
        Some(r) => well_formed_date(Some(r))
            .ok_or_else(|| format!("receipt date '{r}' is not a well-formed dd/mm/yyyy date"))?,
    };

    // Receiver is mandatory downstream; fall back through the parties that
    // plausibly signed for the goods.
    let receiver_name = [
        sanitize::flatten(raw.receiver_name.as_deref().unwrap_or("")),
        destination_name.to_string(),
        contractor_name.to_string(),
        origin_name.to_string(),
    ]
    .into_iter()
    .find(|name| name.trim().len() >= 3)
    .unwrap_or_else(|| layout::RECEIVER_UNKNOWN.to_string());

    Ok(Some(CarriageNote {
        number,
        note_date,
        receipt_date,
        receiver_name,
    }))
}

/// Single-character site code, defaulting to own premises.
fn site_code(raw: Option<&str>) -> String {
    let flat = sanitize::flatten(raw.unwrap_or(""));
    match flat.chars().next() {
        Some(c) => c.to_string(),
        None => layout::TN_SITE_OWN.to_string(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
