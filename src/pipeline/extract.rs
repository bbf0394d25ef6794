//! Text extraction: PDF bytes to raw invoice records.
//!
//! Transport PDFs are produced by several ERP versions and no two lay the
//! page out identically, so extraction is anchored on *labels*, never on
//! positions: the text layer is cut into blocks at `EMITENTE`/`NCM:`
//! markers, and within each block the party sections, NF rows and CTe data
//! are located by their own labels. A block without a recognisable NF is
//! skipped with a debug log; extraction never fails a run over one
//! unreadable block — the batch is worth more than any single page.
//!
//! Everything scraped here is deliberately raw. No normalisation, no
//! checksum checks, no defaults: that is the filter's job, and doing it
//! twice is how the two stages drift apart.
//!
//! [`records_from_text`] is the pure core (text in, records out) so the
//! scraping rules are testable without a PDF; [`extract_records`] is the
//! thin I/O wrapper around it.

use crate::error::SiproquimError;
use crate::model::RawRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

// Block and section anchors. The regex crate has no lookahead, so blocks are
// cut at match *starts* by hand below.
static RE_BLOCK_ANCHOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"NCM:|EMITENTE").unwrap());
static RE_SECTION_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)EMITENTE|DESTINAT[AÁ]RIO|CONTRATANTE|CONTRANTE|RECEBEDOR").unwrap()
});

static RE_LABEL_ORIGIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)EMITENTE").unwrap());
static RE_LABEL_DESTINATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)DESTINAT[AÁ]RIO").unwrap());
static RE_LABEL_CONTRACTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)CONTRATANTE|CONTRANTE").unwrap());

// Identifier strategies, strongest first.
static RE_ID_LABELLED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)CNPJ/CPF:\s*([\d./-]+)").unwrap());
static RE_CNPJ_FORMATTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{2}\.\d{3}\.\d{3}/\d{4}-?\d{0,2}").unwrap());
static RE_CPF_FORMATTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{3}\.\d{3}\.\d{3}-\d{2}").unwrap());
static RE_BARE_CNPJ: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{14}").unwrap());

// NF rows and CTe data.
static RE_NF_LABELLED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)NF\s*:?\s*(\d{4,6})").unwrap());
static RE_NOTE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)N[º°]?\s*CT-?E\s*:?\s*(\d+)").unwrap());
static RE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,2}/\d{1,2}/\d{4}").unwrap());
static RE_NOTE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)DATA\s*:?\s*(\d{1,2}/\d{1,2}/\d{4})").unwrap());
static RE_RECEIPT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)DATA\s*ENTREGA\s*:?\s*(\d{1,2}/\d{1,2}/\d{4})").unwrap());
static RE_DATE_WITH_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2}/\d{1,2}/\d{4})\s+\d{1,2}:\d{2}").unwrap());
static RE_RECEIVER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)RECEBEDOR\s*:?\s*([^\n]+)").unwrap());
static RE_RECEIVER_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*DATA\s*ENTREGA\s*:?.*$").unwrap());

// Name clean-up.
static RE_NAME_LABEL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(EMITENTE|DESTINAT[AÁ]RIO|CONTRATANTE|CONTRANTE)\s*:?\s*").unwrap()
});
static RE_CNPJ_FRAGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2}\.\d{3}\.\d{3}").unwrap());
static RE_NAME_TRAILING_PIPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\|.*$").unwrap());
static RE_NAME_TRAILING_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+\d{4}-\d{2}.*$|\s+\d+$").unwrap());
static RE_ONLY_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\s./-]+$").unwrap());

/// Pull raw invoice records out of an extracted text layer.
///
/// Pure: same text in, same records out, in document order. NF numbers seen
/// on an earlier page win over later repeats (multi-page invoices repeat
/// their header block on every page).
pub fn records_from_text(text: &str) -> Vec<RawRecord> {
    let mut records = Vec::new();
    let mut seen_invoices: HashSet<String> = HashSet::new();

    for block in blocks(text) {
        let origin = party_section(block, &RE_LABEL_ORIGIN);
        let destination = party_section(block, &RE_LABEL_DESTINATION);
        // Invoices without an explicit contracting party are contracted by
        // their issuer.
        let contractor = party_section(block, &RE_LABEL_CONTRACTOR).or_else(|| origin.clone());

        let note_number = RE_NOTE_NUMBER
            .captures(block)
            .map(|c| c[1].to_string());
        let note_date = note_number
            .as_ref()
            .and_then(|_| RE_NOTE_DATE.captures(block).map(|c| c[1].to_string()));
        let receipt_date = receipt_date_in(block);
        let receiver_name = receiver_in(block);

        let invoices = invoice_rows(block);
        if invoices.is_empty() {
            debug!("block without a recognisable NF skipped");
            continue;
        }

        for (number, date) in invoices {
            if !seen_invoices.insert(number.clone()) {
                continue;
            }
            records.push(RawRecord {
                contractor_id: contractor.as_ref().and_then(|p| p.id.clone()),
                contractor_name: contractor.as_ref().and_then(|p| p.name.clone()),
                invoice_number: Some(number),
                invoice_date: date,
                origin_id: origin.as_ref().and_then(|p| p.id.clone()),
                origin_name: origin.as_ref().and_then(|p| p.name.clone()),
                destination_id: destination.as_ref().and_then(|p| p.id.clone()),
                destination_name: destination.as_ref().and_then(|p| p.name.clone()),
                note_number: note_number.clone(),
                note_date: note_date.clone(),
                receipt_date: receipt_date.clone(),
                receiver_name: receiver_name.clone(),
                pickup_site: None,
                delivery_site: None,
            });
        }
    }

    records
}

/// Extract records from a PDF file on disk.
///
/// Fatal only when the text layer is unreadable or yields zero records;
/// individual malformed blocks are skipped, not raised.
pub fn extract_records(path: &Path) -> Result<Vec<RawRecord>, SiproquimError> {
    let text =
        pdf_extract::extract_text(path).map_err(|e| SiproquimError::ExtractionFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let records = records_from_text(&text);
    if records.is_empty() {
        return Err(SiproquimError::NoRecordsFound {
            path: path.to_path_buf(),
        });
    }
    info!(records = records.len(), path = %path.display(), "extraction complete");
    Ok(records)
}

// ── Block and section slicing ────────────────────────────────────────────

/// Cut the text into logical blocks, one per operation, at anchor starts.
fn blocks(text: &str) -> Vec<&str> {
    let starts: Vec<usize> = RE_BLOCK_ANCHOR.find_iter(text).map(|m| m.start()).collect();
    if starts.is_empty() {
        return vec![text];
    }
    let mut out = Vec::with_capacity(starts.len() + 1);
    if starts[0] > 0 {
        out.push(&text[..starts[0]]);
    }
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        out.push(&text[start..end]);
    }
    out
}

#[derive(Debug, Clone)]
struct PartySection {
    id: Option<String>,
    name: Option<String>,
}

/// The text from a party label up to the next section label, scraped for an
/// identifier and a name.
fn party_section(block: &str, label: &Regex) -> Option<PartySection> {
    let m = label.find(block)?;
    let rest = &block[m.end()..];
    let end = RE_SECTION_LABEL
        .find(rest)
        .map(|n| n.start())
        .unwrap_or(rest.len());
    let section = &block[m.start()..m.end() + end];
    Some(PartySection {
        id: identifier_in(section),
        name: name_in(section),
    })
}

// ── Field scrapers ───────────────────────────────────────────────────────

/// Find a CNPJ/CPF in a section, strongest pattern first: explicit
/// `CNPJ/CPF:` label, formatted CNPJ, formatted CPF, then a bare 14-digit
/// run as a last resort (rejecting all-zero and `00…`-prefixed candidates,
/// which are padding noise rather than identifiers).
fn identifier_in(section: &str) -> Option<String> {
    if let Some(c) = RE_ID_LABELLED.captures(section) {
        let d = digits(&c[1]);
        if d.len() == 11 || d.len() == 14 {
            return Some(d);
        }
    }
    if let Some(m) = RE_CNPJ_FORMATTED.find(section) {
        let d = digits(m.as_str());
        if d.len() == 14 {
            return Some(d);
        }
    }
    if let Some(m) = RE_CPF_FORMATTED.find(section) {
        return Some(digits(m.as_str()));
    }
    let flat = digits(section);
    if let Some(m) = RE_BARE_CNPJ.find(&flat) {
        let candidate = m.as_str();
        if candidate.chars().any(|c| c != '0') && !candidate.starts_with("00") {
            return Some(candidate.to_string());
        }
    }
    None
}

/// Find the company name in a party section: the first line that is not an
/// address, phone, date or identifier, with label prefixes and trailing
/// codes cut off.
fn name_in(section: &str) -> Option<String> {
    for line in section.lines() {
        let line = RE_NAME_LABEL_PREFIX.replace(line.trim(), "");
        let line = line.trim();
        if line.is_empty() || looks_like_non_name(line) {
            continue;
        }

        // Cut anything from an embedded identifier or label onwards, then
        // trailing branch codes.
        let mut name = line;
        if let Some(m) = RE_CNPJ_FRAGMENT.find(name) {
            name = &name[..m.start()];
        }
        for label in ["CNPJ", "CPF"] {
            // ASCII-only uppercasing keeps byte offsets valid for slicing.
            let upper: String = name.chars().map(|c| c.to_ascii_uppercase()).collect();
            if let Some(pos) = upper.find(label) {
                name = &name[..pos];
            }
        }
        let name = RE_NAME_TRAILING_PIPE.replace(name, "");
        let name = RE_NAME_TRAILING_CODE.replace(name.trim(), "");
        let name = name.trim();

        if name.len() >= 3 && !RE_ONLY_NOISE.is_match(name) {
            return Some(name.to_string());
        }
    }
    None
}

/// Lines that belong to a party section but are not the party's name.
fn looks_like_non_name(line: &str) -> bool {
    let upper = line.to_uppercase();
    const NOISE: &[&str] = &[
        "CNPJ/CPF", "CPF:", "FONE", "END", "ROD.", "RUA", "AV.", "AVENIDA", "CEP", "CIDADE",
        "CT-E", "CTE", "Nº CT", "DATA", "RECEBEDOR",
    ];
    NOISE.iter().any(|n| upper.contains(n))
        || RE_DATE.is_match(&upper)
        || upper.chars().all(|c| c.is_ascii_digit())
        || RE_CNPJ_FRAGMENT.is_match(&upper)
}

/// `(number, date)` pairs for every NF row in the block, in order.
///
/// The DATA NF column precedes the NF column on a product row, so the date
/// is looked up on the row's own line, not after the match.
fn invoice_rows(block: &str) -> Vec<(String, Option<String>)> {
    let mut rows = Vec::new();
    for c in RE_NF_LABELLED.captures_iter(block) {
        let number = c[1].to_string();
        // Year-shaped four-digit values next to DATA labels are not NFs.
        if number.len() == 4 && number.starts_with("20") {
            continue;
        }
        let match_start = c.get(0).map(|m| m.start()).unwrap_or(0);
        let line_start = block[..match_start].rfind('\n').map(|p| p + 1).unwrap_or(0);
        let line_end = block[match_start..]
            .find('\n')
            .map(|p| match_start + p)
            .unwrap_or(block.len());
        let date = RE_DATE
            .find(&block[line_start..line_end])
            .map(|m| m.as_str().to_string());
        if !rows.iter().any(|(n, _)| n == &number) {
            rows.push((number, date));
        }
    }
    rows
}

fn receipt_date_in(block: &str) -> Option<String> {
    if let Some(c) = RE_RECEIPT_DATE.captures(block) {
        return Some(c[1].to_string());
    }
    RE_DATE_WITH_TIME.captures(block).map(|c| c[1].to_string())
}

fn receiver_in(block: &str) -> Option<String> {
    let c = RE_RECEIVER.captures(block)?;
    let name = RE_RECEIVER_TAIL.replace(c[1].trim(), "");
    let name = name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case("none") || name.eq_ignore_ascii_case("null") {
        return None;
    }
    Some(name.to_string())
}

fn digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "\
EMITENTE
DALGA LOGISTICA E TRANSPORTES LTDA
CNPJ/CPF: 04.547.874/0001-14
ROD. ANHANGUERA KM 30
DESTINATARIO
ACUCAR & CIA LTDA | CAJAMAR
CNPJ/CPF: 60.960.473/0006-77
CONTRATANTE
RODOGARCIA TRANSPORTES RODOVIARIOS
CNPJ/CPF: 60.960.473/0006-77
Nº CT-E: 123456 DATA: 16/03/2025
RECEBEDOR: Joao Batista DATA ENTREGA: 17/03/2025 18:26
QUANTIDADE UNIDADE DATA NF NF
2.0 PC 15/03/2025 NF: 4521
";

    #[test]
    fn full_page_scrapes_every_field() {
        let records = records_from_text(PAGE);
        assert_eq!(records.len(), 1);
        let r = &records[0];

        assert_eq!(r.origin_id.as_deref(), Some("04547874000114"));
        assert_eq!(
            r.origin_name.as_deref(),
            Some("DALGA LOGISTICA E TRANSPORTES LTDA")
        );
        assert_eq!(r.destination_id.as_deref(), Some("60960473000677"));
        // The pipe-suffixed city must not survive into the name.
        assert_eq!(r.destination_name.as_deref(), Some("ACUCAR & CIA LTDA"));
        assert_eq!(r.contractor_id.as_deref(), Some("60960473000677"));
        assert_eq!(r.invoice_number.as_deref(), Some("4521"));
        assert_eq!(r.invoice_date.as_deref(), Some("15/03/2025"));
        assert_eq!(r.note_number.as_deref(), Some("123456"));
        assert_eq!(r.note_date.as_deref(), Some("16/03/2025"));
        assert_eq!(r.receipt_date.as_deref(), Some("17/03/2025"));
        assert_eq!(r.receiver_name.as_deref(), Some("Joao Batista"));
    }

    #[test]
    fn missing_contractor_falls_back_to_origin() {
        let text = "\
EMITENTE
DALGA LOGISTICA SA
CNPJ/CPF: 04.547.874/0001-14
NF: 11288
";
        let records = records_from_text(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].contractor_id.as_deref(), Some("04547874000114"));
        assert_eq!(
            records[0].contractor_name.as_deref(),
            Some("DALGA LOGISTICA SA")
        );
    }

    #[test]
    fn identifier_strategies_degrade_gracefully() {
        assert_eq!(
            identifier_in("CNPJ/CPF: 92.660.406/0076-36"),
            Some("92660406007636".to_string())
        );
        // Formatted but unlabelled.
        assert_eq!(
            identifier_in("EMPRESA X 92.660.406/0076-36 FONE 11"),
            Some("92660406007636".to_string())
        );
        // Formatted CPF.
        assert_eq!(
            identifier_in("CPF 413.030.828-96"),
            Some("41303082896".to_string())
        );
        // Bare digit run, broken formatting.
        assert_eq!(
            identifier_in("CNPJ 92660406 007636"),
            Some("92660406007636".to_string())
        );
        // Labelled CPF keeps 11 digits, never zero-padded here.
        assert_eq!(
            identifier_in("CNPJ/CPF: 413.030.828-96"),
            Some("41303082896".to_string())
        );
        assert_eq!(identifier_in("no identifier here"), None);
    }

    #[test]
    fn name_scraper_skips_addresses_and_fragments() {
        let section = "\
EMITENTE
CNPJ/CPF: 92.660.406/0076-36
ROD. ANHANGUERA KM 30
EMPRESA EXEMPLO LTDA 0076-36
";
        assert_eq!(name_in(section), Some("EMPRESA EXEMPLO LTDA".to_string()));
        assert_eq!(name_in("123456\n92.660.406"), None);
    }

    #[test]
    fn repeated_header_pages_do_not_duplicate_invoices() {
        let two_pages = format!("{PAGE}\n{PAGE}");
        let records = records_from_text(&two_pages);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn multiple_nf_rows_share_the_block_header() {
        let text = "\
EMITENTE
DALGA LOGISTICA SA
CNPJ/CPF: 04.547.874/0001-14
NF: 4521
NF: 4522
";
        let records = records_from_text(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].invoice_number.as_deref(), Some("4521"));
        assert_eq!(records[1].invoice_number.as_deref(), Some("4522"));
        assert_eq!(records[1].origin_id, records[0].origin_id);
    }

    #[test]
    fn block_without_nf_is_skipped() {
        assert!(records_from_text("EMITENTE\nEMPRESA X LTDA\n").is_empty());
        assert!(records_from_text("").is_empty());
    }
}
