//! Configuration types for PDF-to-SIPROQUIM conversion.
//!
//! All behaviour is controlled through [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`]. Keeping every knob in one immutable struct
//! makes runs reproducible: the filter receives its branch directory and
//! legal-entity markers as explicit values, never as ambient globals, so
//! tests can substitute tables and two runs with equal configs and equal
//! input are guaranteed to produce identical accepted/excluded sets.

use crate::error::SiproquimError;
use crate::identifier;
use crate::pipeline::layout;
use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A reporting period: calendar month and year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// 1–12.
    pub month: u32,
    /// Four digits, 2000–2100.
    pub year: i32,
}

impl Period {
    pub fn new(month: u32, year: i32) -> Result<Self, SiproquimError> {
        if !(1..=12).contains(&month) {
            return Err(SiproquimError::InvalidConfig(format!(
                "month must be 1-12, got {month}"
            )));
        }
        if !(2000..=2100).contains(&year) {
            return Err(SiproquimError::InvalidConfig(format!(
                "year must be 2000-2100, got {year}"
            )));
        }
        Ok(Self { month, year })
    }

    /// The calendar month before today — the month a map is normally filed
    /// for.
    pub fn previous_month() -> Self {
        let today = Local::now().date_naive();
        match today.month() {
            1 => Self {
                month: 12,
                year: today.year() - 1,
            },
            m => Self {
                month: m - 1,
                year: today.year(),
            },
        }
    }

    /// Three-letter month code used by the EM header (`JAN`…`DEZ`).
    pub fn month_code(&self) -> &'static str {
        // Range is enforced at construction.
        layout::month_code(self.month).unwrap_or("???")
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.month_code(), self.year)
    }
}

/// Immutable CNPJ → canonical-name lookup used to repair blank party names.
///
/// Populated from whatever registry the operator maintains (company branches,
/// recurring customers). Empty by default; the filter only consults it, never
/// extends it mid-run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchDirectory {
    names: HashMap<String, String>,
}

impl BranchDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(identifier, name)` pairs; identifiers are reduced to
    /// digits on the way in so formatted and bare forms collide correctly.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let names = entries
            .into_iter()
            .map(|(k, v)| (identifier::digits(k.as_ref()), v.into()))
            .collect();
        Self { names }
    }

    /// Canonical name for an identifier, if known.
    pub fn name_for(&self, id: &str) -> Option<&str> {
        self.names.get(&identifier::digits(id)).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// Legal-suffix tokens whose whole-word presence in a party name implies an
/// organisational entity. Matched against the normalised (upper-cased,
/// de-accented) name, word by word — `ME` must not fire inside `ALMEIDA`.
pub const DEFAULT_ENTITY_MARKERS: &[&str] = &[
    "LTDA",
    "EIRELI",
    "SA",
    "S.A.",
    "S/A",
    "SOCIEDADE",
    "EMPRESA",
    "COMERCIO",
    "ME",
    "EPP",
];

/// Configuration for one conversion run.
///
/// Built via [`ConversionConfig::builder()`].
///
/// # Example
/// ```rust
/// use pdf2siproquim::{ConversionConfig, Period};
///
/// let config = ConversionConfig::builder("60.960.473/0006-77")
///     .period(Period::new(3, 2025).unwrap())
///     .build()
///     .unwrap();
/// assert_eq!(config.issuer_id, "60960473000677");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// CNPJ of the company filing the map (EM header). Stored digits-only;
    /// validated against the CNPJ check digits at build time.
    pub issuer_id: String,

    /// Reporting period for the EM header. Default: the previous calendar
    /// month.
    pub period: Period,

    /// Whole-word legal-entity markers for the individual-name waiver
    /// (§ relaxed contractor/destination rule). Default:
    /// [`DEFAULT_ENTITY_MARKERS`].
    pub entity_markers: Vec<String>,

    /// Identifier → canonical-name directory for blank-name repair.
    /// Default: empty.
    pub branches: BranchDirectory,

    /// Reject records whose valid CPF does not survive zero-padded rendering
    /// as a 14-digit CNPJ field. Default: true.
    ///
    /// The downstream validator's acceptance rule for personal identifiers
    /// in the 14-character field is not fully documented; this flag is the
    /// single switch for the best-known preventive rule, kept isolated so it
    /// can be relaxed once the real behaviour is confirmed. Leave it on.
    pub reject_unrenderable_cpf: bool,
}

impl ConversionConfig {
    /// Create a builder. `issuer_id` is the filing company's CNPJ, with or
    /// without formatting.
    pub fn builder(issuer_id: impl Into<String>) -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            issuer_id: issuer_id.into(),
            period: None,
            entity_markers: None,
            branches: BranchDirectory::default(),
            reject_unrenderable_cpf: true,
        }
    }

    /// Whole-word test for a legal-entity marker in an already-normalised
    /// name.
    pub fn name_has_entity_marker(&self, normalised_name: &str) -> bool {
        normalised_name
            .split_whitespace()
            .any(|word| self.entity_markers.iter().any(|m| m == word))
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    issuer_id: String,
    period: Option<Period>,
    entity_markers: Option<Vec<String>>,
    branches: BranchDirectory,
    reject_unrenderable_cpf: bool,
}

impl ConversionConfigBuilder {
    pub fn period(mut self, period: Period) -> Self {
        self.period = Some(period);
        self
    }

    pub fn entity_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity_markers = Some(markers.into_iter().map(Into::into).collect());
        self
    }

    pub fn branches(mut self, branches: BranchDirectory) -> Self {
        self.branches = branches;
        self
    }

    pub fn reject_unrenderable_cpf(mut self, v: bool) -> Self {
        self.reject_unrenderable_cpf = v;
        self
    }

    /// Build the configuration, validating the issuer CNPJ and period.
    pub fn build(self) -> Result<ConversionConfig, SiproquimError> {
        let issuer_id = identifier::digits(&self.issuer_id);
        if !identifier::is_valid_cnpj(&issuer_id) {
            return Err(SiproquimError::InvalidConfig(format!(
                "issuer CNPJ '{}' is not a valid 14-digit CNPJ",
                self.issuer_id
            )));
        }
        Ok(ConversionConfig {
            issuer_id,
            period: self.period.unwrap_or_else(Period::previous_month),
            entity_markers: self
                .entity_markers
                .unwrap_or_else(|| DEFAULT_ENTITY_MARKERS.iter().map(|s| s.to_string()).collect()),
            branches: self.branches,
            reject_unrenderable_cpf: self.reject_unrenderable_cpf,
        })
    }
}
