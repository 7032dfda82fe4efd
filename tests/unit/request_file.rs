//! Loading export requests from JSON request files

use chrono::NaiveDate;
use finam_exporter::export::format::{DateTimeFormat, TimeFormat};
use finam_exporter::{ExportError, ExportRequest, Granularity};

#[test]
fn request_file_with_explicit_range() {
    let json = r#"{
        "code": "SBER",
        "em": "3",
        "period": 7,
        "from": "01.02.2024",
        "to": "29.02.2024",
        "dtf": 1,
        "tmf": 3,
        "merge": true,
        "mergeAll": true,
        "outputDir": "/tmp/exports"
    }"#;

    let request: ExportRequest = serde_json::from_str(json).unwrap();
    assert_eq!(request.period, Granularity::OneHour);
    assert_eq!(request.from, NaiveDate::from_ymd_opt(2024, 2, 1));
    assert_eq!(request.to, NaiveDate::from_ymd_opt(2024, 2, 29));
    assert_eq!(request.dtf, Some(DateTimeFormat::YyyyMmDdHhMmSs));
    assert_eq!(request.tmf, Some(TimeFormat::HhMmSsColon));
    assert!(request.merge);
    assert!(request.merge_all);
    assert!(!request.dry_run);
    assert!(request.validate().is_ok());
}

#[test]
fn request_file_round_trips_through_serde() {
    let mut request = ExportRequest::for_year("GAZP", "16842", Granularity::Weekly, 2019);
    request.dry_run = true;

    let json = serde_json::to_string(&request).unwrap();
    assert!(json.contains("\"dryRun\":true"));
    assert!(!json.contains("\"from\""));

    let back: ExportRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(back, request);
}

#[test]
fn unknown_period_code_is_rejected() {
    let json = r#"{"code":"SBER","em":"3","period":12,"year":2023}"#;
    assert!(serde_json::from_str::<ExportRequest>(json).is_err());
}

#[test]
fn malformed_date_is_rejected() {
    let json = r#"{"code":"SBER","em":"3","period":8,"from":"2024-02-01","to":"29.02.2024"}"#;
    assert!(serde_json::from_str::<ExportRequest>(json).is_err());
}

#[test]
fn validation_reports_missing_interval() {
    let json = r#"{"code":"SBER","em":"3","period":8}"#;
    let request: ExportRequest = serde_json::from_str(json).unwrap();
    assert!(matches!(
        request.validate(),
        Err(ExportError::InvalidRequest(ref m)) if m.contains("year")
    ));
}
