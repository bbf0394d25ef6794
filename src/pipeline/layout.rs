//! SIPROQUIM positional layout constants.
//!
//! Field identity in the output file is carried entirely by byte offset and
//! width — there are no delimiters. Every width and offset in the EM
//! (layout 3.1.1), TN (3.1.9) and CC (3.1.9.1) sections of the technical
//! manual lives here and nowhere else, so a layout revision is a one-file
//! change and the encoder/decoder can never disagree about a column.
//!
//! Offsets below are 0-based byte offsets into the rendered line (the manual
//! numbers columns from 1; subtract one).

use std::ops::Range;

// ── EM: company/period header, one per file ──────────────────────────────

pub const EM_TOTAL: usize = 31;
pub const EM_TYPE: &str = "EM";

pub const EM_TYPE_W: usize = 2;
pub const EM_CNPJ_W: usize = 14;
pub const EM_MONTH_W: usize = 3;
pub const EM_YEAR_W: usize = 4;
pub const EM_FLAGS_W: usize = 8;

/// Activity flags, columns 24–31: commercialisation national/international,
/// production, transformation, consumption, manufacture, transport, storage.
/// Transport maps declare only the transport activity.
pub const EM_FLAGS_TRANSPORT: &str = "00000010";

// ── TN: one national-transport line per invoice ──────────────────────────

pub const TN_TOTAL: usize = 276;
pub const TN_TYPE: &str = "TN";

pub const TN_TYPE_W: usize = 2;
pub const TN_CNPJ_W: usize = 14;
pub const TN_NAME_W: usize = 70;
pub const TN_NF_NUMBER_W: usize = 10;
pub const TN_NF_DATE_W: usize = 10;
pub const TN_SITE_W: usize = 1;

/// Pickup/delivery at a party's own premises.
pub const TN_SITE_OWN: &str = "P";

pub const TN_CONTRACTOR_ID: Range<usize> = 2..16;
pub const TN_CONTRACTOR_NAME: Range<usize> = 16..86;
pub const TN_NF_NUMBER: Range<usize> = 86..96;
pub const TN_NF_DATE: Range<usize> = 96..106;
pub const TN_ORIGIN_ID: Range<usize> = 106..120;
pub const TN_ORIGIN_NAME: Range<usize> = 120..190;
pub const TN_DESTINATION_ID: Range<usize> = 190..204;
pub const TN_DESTINATION_NAME: Range<usize> = 204..274;
pub const TN_PICKUP_SITE: Range<usize> = 274..275;
pub const TN_DELIVERY_SITE: Range<usize> = 275..276;

// ── CC: zero-or-one carriage-note line per invoice ───────────────────────

pub const CC_TOTAL: usize = 103;
pub const CC_TYPE: &str = "CC";

pub const CC_TYPE_W: usize = 2;
pub const CC_NOTE_NUMBER_W: usize = 9;
pub const CC_DATE_W: usize = 10;
pub const CC_RECEIVER_W: usize = 70;
pub const CC_MODAL_W: usize = 2;

/// Road transport modal code.
pub const CC_MODAL_ROAD: &str = "RO";

pub const CC_NOTE_NUMBER: Range<usize> = 2..11;
pub const CC_NOTE_DATE: Range<usize> = 11..21;
pub const CC_RECEIPT_DATE: Range<usize> = 21..31;
pub const CC_RECEIVER_NAME: Range<usize> = 31..101;
pub const CC_MODAL: Range<usize> = 101..103;

// ── Shared ───────────────────────────────────────────────────────────────

/// Placeholder receiver when no fallback produced a usable name.
pub const RECEIVER_UNKNOWN: &str = "NAO INFORMADO";

/// Three-letter month codes, January first (Portuguese abbreviations per the
/// manual).
pub const MONTH_CODES: [&str; 12] = [
    "JAN", "FEV", "MAR", "ABR", "MAI", "JUN", "JUL", "AGO", "SET", "OUT", "NOV", "DEZ",
];

/// Month number (1–12) to its three-letter code.
pub fn month_code(month: u32) -> Option<&'static str> {
    MONTH_CODES.get(month.checked_sub(1)? as usize).copied()
}

/// Slice a fixed column range out of a rendered line.
///
/// Decoding counterpart of the encoder, used by round-trip tests and by
/// anyone post-inspecting a generated file.
pub fn column(line: &str, range: Range<usize>) -> &str {
    &line[range]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tn_ranges_tile_the_line_exactly() {
        let ranges = [
            0..2,
            TN_CONTRACTOR_ID,
            TN_CONTRACTOR_NAME,
            TN_NF_NUMBER,
            TN_NF_DATE,
            TN_ORIGIN_ID,
            TN_ORIGIN_NAME,
            TN_DESTINATION_ID,
            TN_DESTINATION_NAME,
            TN_PICKUP_SITE,
            TN_DELIVERY_SITE,
        ];
        let mut cursor = 0;
        for r in ranges {
            assert_eq!(r.start, cursor, "gap or overlap before offset {cursor}");
            cursor = r.end;
        }
        assert_eq!(cursor, TN_TOTAL);
    }

    #[test]
    fn cc_ranges_tile_the_line_exactly() {
        let ranges = [
            0..2,
            CC_NOTE_NUMBER,
            CC_NOTE_DATE,
            CC_RECEIPT_DATE,
            CC_RECEIVER_NAME,
            CC_MODAL,
        ];
        let mut cursor = 0;
        for r in ranges {
            assert_eq!(r.start, cursor);
            cursor = r.end;
        }
        assert_eq!(cursor, CC_TOTAL);
    }

    #[test]
    fn em_widths_sum_to_total() {
        assert_eq!(
            EM_TYPE_W + EM_CNPJ_W + EM_MONTH_W + EM_YEAR_W + EM_FLAGS_W,
            EM_TOTAL
        );
    }

    #[test]
    fn month_codes() {
        assert_eq!(month_code(1), Some("JAN"));
        assert_eq!(month_code(12), Some("DEZ"));
        assert_eq!(month_code(0), None);
        assert_eq!(month_code(13), None);
    }
}
