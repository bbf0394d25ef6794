//! # pdf2siproquim
//!
//! Convert semi-structured transport/invoice PDFs into the fixed-width
//! positional text file the SIPROQUIM 2 portal ("Mapas" upload) accepts.
//!
//! The pipeline has three stages with owned values between them:
//!
//! 1. **Extract** — pull raw invoice records out of the PDF text layer,
//!    anchored on labels rather than positions.
//! 2. **Filter** — classify and checksum-check every CPF/CNPJ, normalise
//!    text, deduplicate, and split the batch into validated records and
//!    exclusion entries. Rejection is a value, never a panic.
//! 3. **Encode** — render validated records into EM/TN/CC fixed-width
//!    lines, enforcing each line type's declared width.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use pdf2siproquim::{convert_to_file, ConversionConfig, Period};
//! use std::path::Path;
//!
//! fn main() -> Result<(), pdf2siproquim::SiproquimError> {
//!     let config = ConversionConfig::builder("60.960.473/0006-77")
//!         .period(Period::new(3, 2025)?)
//!         .build()?;
//!
//!     let (output, artifacts) =
//!         convert_to_file(Path::new("relatorio.pdf"), Path::new("out"), &config)?;
//!
//!     println!("{} records accepted, {} excluded", output.stats.accepted, output.stats.excluded);
//!     println!("map written to {}", artifacts.map_path.display());
//!     Ok(())
//! }
//! ```
//!
//! Pre-extracted records can enter the pipeline directly through
//! [`convert_records`], which is also how the filter and encoder are tested
//! without a PDF.

pub mod config;
pub mod convert;
pub mod error;
pub mod identifier;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod sanitize;

pub use config::{BranchDirectory, ConversionConfig, ConversionConfigBuilder, Period};
pub use convert::{convert, convert_records, convert_to_file, WrittenArtifacts};
pub use error::{RejectionReason, SiproquimError};
pub use identifier::TaxIdKind;
pub use model::{Annotation, CarriageNote, ExclusionEntry, RawRecord, ValidatedRecord};
pub use output::{ConversionOutput, ConversionStats};

/// Library version, from Cargo.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
