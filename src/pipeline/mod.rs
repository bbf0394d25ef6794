//! The three-stage conversion pipeline.
//!
//! ```text
//! PDF path ── input ──▶ text ── extract ──▶ Vec<RawRecord>
//!                                               │
//!                                            filter
//!                                               │
//!                           ┌───────────────────┴──────────────┐
//!                           ▼                                  ▼
//!                 Vec<ValidatedRecord>              Vec<ExclusionEntry>
//!                           │                                  │
//!                        encode                          exclusion report
//!                           │
//!                           ▼
//!                 positional lines (EM, TN, CC)
//! ```
//!
//! Stages communicate only through the owned values above; no stage reaches
//! back into an earlier one. `layout` holds the positional constants both
//! the encoder and the decoding test helpers share.

pub mod encode;
pub mod extract;
pub mod filter;
pub mod input;
pub mod layout;
