//! CPF/CNPJ classification and Modulo-11 check-digit validation.
//!
//! This is the leaf module of the pipeline: pure functions, no I/O, no
//! dependencies on any other stage. Everything downstream (the record filter,
//! the positional encoder) builds on two facts established here:
//!
//! 1. A tax identifier is classified **by digit count alone** — 11 digits is
//!    a CPF, 14 is a CNPJ, anything else is unknown. Content sniffing is how
//!    the wrong checksum ends up applied to the right number; dispatching on
//!    length eliminates that defect class by construction.
//! 2. Validators fail closed. Wrong length, stray letters, all-identical
//!    digit sequences — all return `false`, never panic, never `Err`.
//!
//! ## The padding trap
//!
//! SIPROQUIM's TN layout has a single 14-character slot shared by CPFs and
//! CNPJs. A CPF is rendered into it by zero-left-padding, but the downstream
//! validator checks the *rendered* 14 digits with the CNPJ algorithm. A
//! mathematically valid CPF almost never survives that.
//! [`cpf_survives_cnpj_rendering`] is the preventive check the filter runs
//! before any output exists; it is deliberately a single function so the rule
//! can be swapped once the downstream acceptance behaviour is confirmed.

/// CPF length in digits.
pub const CPF_LEN: usize = 11;
/// CNPJ length in digits.
pub const CNPJ_LEN: usize = 14;

/// Tax identifier kind, decided by digit count alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TaxIdKind {
    /// 11 digits — personal identifier (Cadastro de Pessoas Físicas).
    Cpf,
    /// 14 digits — organisational identifier (Cadastro Nacional da Pessoa Jurídica).
    Cnpj,
    /// Any other digit count. A terminal rejection signal, not an error.
    Unknown,
}

/// Strip everything that is not an ASCII digit.
///
/// Extraction hands us identifiers in whatever shape the PDF had them:
/// `92.660.406/0076-36`, `413.030.828-96`, or already bare.
pub fn digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Classify a raw identifier by the number of digits it contains.
pub fn classify(raw: &str) -> TaxIdKind {
    match digits(raw).len() {
        CPF_LEN => TaxIdKind::Cpf,
        CNPJ_LEN => TaxIdKind::Cnpj,
        _ => TaxIdKind::Unknown,
    }
}

/// Validate a CPF with the official Modulo-11 algorithm.
///
/// Weights are 10..2 over the first 9 digits for the first check digit and
/// 11..2 over the first 10 for the second; a remainder of 0 or 1 maps to
/// check digit 0. Returns `false` for anything that is not exactly 11 digits
/// after cleaning, and for the known-invalid all-identical sequences
/// (`00000000000`, `11111111111`, …) which satisfy the arithmetic but are
/// rejected by every registry.
pub fn is_valid_cpf(raw: &str) -> bool {
    let d = digits(raw);
    if d.len() != CPF_LEN || all_identical(&d) {
        return false;
    }
    let n: Vec<u32> = d.chars().filter_map(|c| c.to_digit(10)).collect();

    let dv1 = mod11_digit(n[..9].iter().zip((2..=10).rev()).map(|(d, w)| d * w).sum());
    if n[9] != dv1 {
        return false;
    }
    let dv2 = mod11_digit(n[..10].iter().zip((2..=11).rev()).map(|(d, w)| d * w).sum());
    n[10] == dv2
}

/// Validate a CNPJ with the official Modulo-11 algorithm.
///
/// The weight ladder runs 5,4,3,2,9,8,7,6,5,4,3,2 for the first check digit
/// (one more leading 6 for the second): starting at `len - 7` and wrapping
/// back to 9 whenever it would drop below 2. Same remainder rule as the CPF.
pub fn is_valid_cnpj(raw: &str) -> bool {
    let d = digits(raw);
    if d.len() != CNPJ_LEN || all_identical(&d) {
        return false;
    }
    let n: Vec<u32> = d.chars().filter_map(|c| c.to_digit(10)).collect();

    let dv1 = mod11_digit(weighted_cnpj_sum(&n[..12]));
    if n[12] != dv1 {
        return false;
    }
    let dv2 = mod11_digit(weighted_cnpj_sum(&n[..13]));
    n[13] == dv2
}

/// Zero-left-pad a cleaned identifier to the 14-character CNPJ field width.
///
/// This is the exact rendering the positional encoder will perform; the
/// filter uses it to test the rendered form *before* any line is built.
pub fn pad_to_cnpj_width(raw: &str) -> String {
    let d = digits(raw);
    format!("{:0>width$}", d, width = CNPJ_LEN)
}

/// Will a CPF, once zero-padded into the 14-character field, be accepted by
/// a consumer that validates the rendered field as a CNPJ?
///
/// Best-known preventive rule for the downstream validator's undocumented
/// behaviour: the padded form must independently pass the CNPJ checksum.
/// Callers must treat a `false` here as a rejection before encoding, never
/// as a reaction to a downstream failure.
pub fn cpf_survives_cnpj_rendering(cpf: &str) -> bool {
    is_valid_cnpj(&pad_to_cnpj_width(cpf))
}

// ── Internals ────────────────────────────────────────────────────────────

/// Modulo-11 remainder to check digit: 0 or 1 ⇒ 0, otherwise 11 − remainder.
fn mod11_digit(sum: u32) -> u32 {
    let rem = sum % 11;
    if rem < 2 {
        0
    } else {
        11 - rem
    }
}

/// CNPJ weighted sum: weight starts at `len - 7`, decrements, resets to 9
/// below 2.
fn weighted_cnpj_sum(digits: &[u32]) -> u32 {
    let mut weight = (digits.len() as u32) - 7;
    let mut sum = 0;
    for &d in digits {
        sum += d * weight;
        weight -= 1;
        if weight < 2 {
            weight = 9;
        }
    }
    sum
}

fn all_identical(d: &str) -> bool {
    let mut chars = d.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => true,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // Fixtures: identifiers whose check digits were computed by hand with
    // the official algorithm.
    const VALID_CPF: &str = "41303082896";
    const VALID_CNPJ: &str = "60960473000677";

    #[test]
    fn classify_by_length_only() {
        assert_eq!(classify("41303082896"), TaxIdKind::Cpf);
        assert_eq!(classify("413.030.828-96"), TaxIdKind::Cpf);
        assert_eq!(classify("60960473000677"), TaxIdKind::Cnpj);
        assert_eq!(classify("60.960.473/0006-77"), TaxIdKind::Cnpj);
        assert_eq!(classify(""), TaxIdKind::Unknown);
        assert_eq!(classify("123456"), TaxIdKind::Unknown);
        assert_eq!(classify("123456789012345"), TaxIdKind::Unknown);
        // Length of the digit content decides, not the byte length.
        assert_eq!(classify("cpf: 413.030.828-96"), TaxIdKind::Cpf);
    }

    #[test]
    fn valid_cpf_fixture() {
        assert!(is_valid_cpf(VALID_CPF));
        assert!(is_valid_cpf("413.030.828-96"));
    }

    #[test]
    fn altering_any_single_cpf_digit_invalidates() {
        for pos in 0..CPF_LEN {
            let mut bytes = VALID_CPF.as_bytes().to_vec();
            bytes[pos] = if bytes[pos] == b'9' {
                b'0'
            } else {
                bytes[pos] + 1
            };
            let mutated = String::from_utf8(bytes).unwrap();
            assert!(
                !is_valid_cpf(&mutated),
                "mutation at {pos} still validates: {mutated}"
            );
        }
    }

    #[test]
    fn cpf_fails_closed() {
        assert!(!is_valid_cpf(""));
        assert!(!is_valid_cpf("4130308289")); // 10 digits
        assert!(!is_valid_cpf("413030828961")); // 12 digits
        assert!(!is_valid_cpf("4130308289a")); // letter stripped -> 10 digits
        assert!(!is_valid_cpf("11111111111")); // all identical
        assert!(!is_valid_cpf("00000000000"));
    }

    #[test]
    fn valid_cnpj_fixture() {
        assert!(is_valid_cnpj(VALID_CNPJ));
        assert!(is_valid_cnpj("60.960.473/0006-77"));
    }

    #[test]
    fn altering_any_single_cnpj_digit_invalidates() {
        for pos in 0..CNPJ_LEN {
            let mut bytes = VALID_CNPJ.as_bytes().to_vec();
            bytes[pos] = if bytes[pos] == b'9' {
                b'0'
            } else {
                bytes[pos] + 1
            };
            let mutated = String::from_utf8(bytes).unwrap();
            assert!(
                !is_valid_cnpj(&mutated),
                "mutation at {pos} still validates: {mutated}"
            );
        }
    }

    #[test]
    fn cnpj_fails_closed() {
        assert!(!is_valid_cnpj(""));
        assert!(!is_valid_cnpj("6096047300067")); // 13 digits
        assert!(!is_valid_cnpj("609604730006771")); // 15 digits
        assert!(!is_valid_cnpj("00000000000000"));
        assert!(!is_valid_cnpj("99999999999999"));
    }

    #[test]
    fn padding_preserves_digits() {
        assert_eq!(pad_to_cnpj_width("41303082896"), "00041303082896");
        assert_eq!(pad_to_cnpj_width("413.030.828-96"), "00041303082896");
        assert_eq!(pad_to_cnpj_width("60960473000677"), "60960473000677");
    }

    #[test]
    fn valid_cpf_padded_fails_cnpj_checksum() {
        // The central scenario: a perfectly valid CPF whose zero-padded
        // 14-digit rendering does not satisfy the CNPJ check digits.
        assert!(is_valid_cpf("41303082896"));
        assert!(!is_valid_cnpj("00041303082896"));
        assert!(!cpf_survives_cnpj_rendering("41303082896"));
    }

    #[test]
    fn survival_check_is_exactly_the_rendered_form() {
        // Whatever cpf_survives_cnpj_rendering decides must agree with
        // validating the padded form directly.
        for cpf in ["41303082896", "11144477735", "52998224725"] {
            assert_eq!(
                cpf_survives_cnpj_rendering(cpf),
                is_valid_cnpj(&pad_to_cnpj_width(cpf))
            );
        }
    }
}
