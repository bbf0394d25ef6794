//! End-to-end pipeline tests: extracted text in, positional artifacts out.
//!
//! These enter the pipeline through `records_from_text` and
//! `convert_records`, so they exercise every stage except the PDF text
//! layer itself.

use pdf2siproquim::pipeline::{extract, layout};
use pdf2siproquim::{
    convert, convert_records, BranchDirectory, ConversionConfig, Period, RawRecord,
    RejectionReason, SiproquimError,
};
use std::path::Path;

const ISSUER: &str = "60.960.473/0006-77";

fn config() -> ConversionConfig {
    ConversionConfig::builder(ISSUER)
        .period(Period::new(3, 2025).unwrap())
        .build()
        .unwrap()
}

fn record(invoice: &str, destination_id: &str, destination_name: &str) -> RawRecord {
    RawRecord {
        contractor_id: Some("60960473000677".into()),
        contractor_name: Some("Rodogarcia Transportes Rodoviários Ltda".into()),
        invoice_number: Some(invoice.into()),
        invoice_date: Some("15/03/2025".into()),
        origin_id: Some("04547874000114".into()),
        origin_name: Some("Dalga Logística e Transportes Ltda".into()),
        destination_id: Some(destination_id.into()),
        destination_name: Some(destination_name.into()),
        ..RawRecord::default()
    }
}

#[test]
fn text_layer_to_positional_file() {
    let page = "\
EMITENTE
DALGA LOGISTICA E TRANSPORTES LTDA
CNPJ/CPF: 04.547.874/0001-14
DESTINATARIO
ACUCAR & CIA LTDA
CNPJ/CPF: 60.960.473/0006-77
CONTRATANTE
RODOGARCIA TRANSPORTES RODOVIARIOS
CNPJ/CPF: 60.960.473/0006-77
Nº CT-E: 123456 DATA: 16/03/2025
RECEBEDOR: Joao Batista
QUANTIDADE UNIDADE DATA NF NF
2.0 PC 15/03/2025 NF: 4521
";
    let records = extract::records_from_text(page);
    let output = convert_records(records, &config()).unwrap();

    assert_eq!(output.stats.accepted, 1);
    assert_eq!(output.stats.excluded, 0);

    let lines: Vec<&str> = output.file_text.lines().collect();
    assert_eq!(lines.len(), 3, "EM + TN + CC");

    // EM header first, exactly 31 characters.
    assert_eq!(lines[0].len(), 31);
    assert_eq!(&lines[0][..2], "EM");
    assert_eq!(&lines[0][2..16], "60960473000677");
    assert_eq!(&lines[0][16..23], "MAR2025");

    // TN decodes back to the validated values.
    let tn = lines[1];
    assert_eq!(tn.len(), 276);
    assert_eq!(layout::column(tn, layout::TN_ORIGIN_ID), "04547874000114");
    assert_eq!(
        layout::column(tn, layout::TN_DESTINATION_NAME).trim_end(),
        "ACUCAR & CIA LTDA"
    );
    assert_eq!(layout::column(tn, layout::TN_NF_NUMBER).trim_end(), "4521");
    assert_eq!(layout::column(tn, layout::TN_NF_DATE), "15/03/2025");

    // CC carries the carriage note.
    let cc = lines[2];
    assert_eq!(cc.len(), 103);
    assert_eq!(layout::column(cc, layout::CC_NOTE_NUMBER), "000123456");
    assert_eq!(
        layout::column(cc, layout::CC_RECEIVER_NAME).trim_end(),
        "JOAO BATISTA"
    );
    assert_eq!(layout::column(cc, layout::CC_MODAL), "RO");
}

#[test]
fn conversion_is_deterministic_and_idempotent() {
    let records = vec![
        record("1001", "60960473000677", "Açúcar & Cia Ltda"),
        record("1002", "41303082897000", "Whoever"), // 14 digits, bad checksum, no marker
        record("1003", "12345", "Too Short SA"),     // unclassifiable
    ];

    let a = convert_records(records.clone(), &config()).unwrap();
    let b = convert_records(records, &config()).unwrap();

    assert_eq!(a.file_text, b.file_text);
    assert_eq!(a.exclusions, b.exclusions);
    assert_eq!(a.stats.accepted, 2);
    assert_eq!(a.stats.excluded, 1);
}

#[test]
fn duplicate_invoices_first_wins_exactly_once() {
    let mut first = record("2001", "60960473000677", "Primeira Ltda");
    first.origin_name = Some("FIRST ORIGIN SA".into());
    let mut second = record("2001", "60960473000677", "Segunda Ltda");
    second.origin_name = Some("SECOND ORIGIN SA".into());

    let output = convert_records(vec![first, second], &config()).unwrap();

    assert_eq!(output.stats.extracted, 2);
    assert_eq!(output.stats.duplicates, 1);
    assert_eq!(output.stats.accepted + output.stats.excluded, 1);
    assert!(output.file_text.contains("FIRST ORIGIN SA"));
    assert!(!output.file_text.contains("SECOND ORIGIN SA"));
}

#[test]
fn valid_cpf_with_unrenderable_padding_is_excluded_before_output() {
    // 41303082896 passes the CPF check digits; 00041303082896 fails the
    // CNPJ check the portal applies to the rendered 14-digit field.
    let records = vec![
        record("3001", "413.030.828-96", "Maria Sabrina"),
        record("3002", "60960473000677", "Açúcar & Cia Ltda"),
    ];
    let output = convert_records(records, &config()).unwrap();

    assert_eq!(output.stats.accepted, 1);
    assert_eq!(output.stats.excluded, 1);
    assert!(
        !output.file_text.contains("00041303082896"),
        "the padded form must never reach the file"
    );
    match &output.exclusions[0].reason {
        RejectionReason::CpfUnrenderable { cpf, padded, .. } => {
            assert_eq!(cpf, "41303082896");
            assert_eq!(padded, "00041303082896");
        }
        other => panic!("wrong reason: {other:?}"),
    }
}

#[test]
fn entity_marker_decides_the_checksum_waiver() {
    // Same failing 14-digit identifier, two names: the individual-looking
    // one is waived, the entity-marked one is excluded.
    let records = vec![
        record("4001", "60960473000678", "Almeida e Filhos"),
        record("4002", "60960473000678", "Almeida e Filhos Ltda"),
    ];
    let output = convert_records(records, &config()).unwrap();

    assert_eq!(output.stats.accepted, 1);
    assert_eq!(output.stats.excluded, 1);
    assert_eq!(output.exclusions[0].invoice_number, "4002");
    assert!(matches!(
        output.exclusions[0].reason,
        RejectionReason::InvalidCnpj { .. }
    ));
}

#[test]
fn origin_is_always_strictly_organisational() {
    let mut r = record("5001", "60960473000677", "Açúcar & Cia Ltda");
    r.origin_id = Some("60960473000678".into()); // bad checksum
    r.origin_name = Some("Jose da Silva".into()); // would earn the waiver elsewhere

    let output = convert_records(vec![r], &config()).unwrap();
    assert_eq!(output.stats.accepted, 0);
    assert!(matches!(
        output.exclusions[0].reason,
        RejectionReason::InvalidCnpj { field: "origin", .. }
    ));
}

#[test]
fn exclusion_report_only_when_something_was_excluded() {
    let clean = convert_records(
        vec![record("6001", "60960473000677", "Açúcar & Cia Ltda")],
        &config(),
    )
    .unwrap();
    assert!(clean.exclusion_report(&config()).is_none());

    let dirty = convert_records(
        vec![record("6002", "123", "Broken SA")],
        &config(),
    )
    .unwrap();
    let report = dirty.exclusion_report(&config()).unwrap();
    assert!(report.contains("Registros excluidos: 1"));
    assert!(report.contains("NF 6002"));
}

#[test]
fn branch_directory_repairs_blank_names_end_to_end() {
    let cfg = ConversionConfig::builder(ISSUER)
        .period(Period::new(3, 2025).unwrap())
        .branches(BranchDirectory::from_entries([(
            "04.547.874/0001-14",
            "SPO - DALGA LOGISTICA E TRANSPORTES LTDA",
        )]))
        .build()
        .unwrap();

    let mut r = record("7001", "60960473000677", "Açúcar & Cia Ltda");
    r.origin_name = None;
    let output = convert_records(vec![r], &cfg).unwrap();

    assert_eq!(output.stats.corrected, 1);
    assert!(output
        .file_text
        .contains("SPO - DALGA LOGISTICA E TRANSPORTES LTDA"));
}

#[test]
fn every_line_matches_its_declared_width() {
    let mut records = Vec::new();
    for i in 0..20 {
        let mut r = record(
            &format!("80{i:02}"),
            "60960473000677",
            &format!("Destinatário Número {i} Ltda"),
        );
        if i % 3 == 0 {
            r.note_number = Some(format!("{}", 1000 + i));
            r.note_date = Some("16/03/2025".into());
        }
        records.push(r);
    }
    let output = convert_records(records, &config()).unwrap();

    for line in output.file_text.lines() {
        let expected = match &line[..2] {
            "EM" => 31,
            "TN" => 276,
            "CC" => 103,
            tag => panic!("unknown line tag {tag}"),
        };
        assert_eq!(line.len(), expected, "line: {line}");
    }
}

#[test]
fn missing_and_non_pdf_inputs_fail_with_specific_errors() {
    let err = convert(Path::new("/no/such/file.pdf"), &config()).unwrap_err();
    assert!(matches!(err, SiproquimError::FileNotFound { .. }));

    let dir = tempfile::TempDir::new().unwrap();
    let fake = dir.path().join("report.pdf");
    std::fs::write(&fake, b"<html>not a pdf</html>").unwrap();
    let err = convert(&fake, &config()).unwrap_err();
    assert!(matches!(err, SiproquimError::NotAPdf { .. }));
}

#[test]
fn empty_batch_still_yields_a_valid_header_only_file() {
    let output = convert_records(vec![], &config()).unwrap();
    assert_eq!(output.stats.accepted, 0);
    assert_eq!(output.file_text.lines().count(), 1);
    assert!(output.file_text.starts_with("EM"));
}
