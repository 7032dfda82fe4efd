//! Endpoint query construction for planned segments

use chrono::NaiveDate;
use finam_exporter::export::format::{CandleTime, FieldSeparator};
use finam_exporter::export::{chunk, ExportRequest, SegmentLayout};
use finam_exporter::fetcher::RequestDescriptor;
use finam_exporter::Granularity;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn descriptors(request: &ExportRequest) -> Vec<RequestDescriptor> {
    let interval = request.resolve_interval().unwrap();
    let layout = SegmentLayout::for_request(request);
    layout
        .segments(&chunk(&interval, request.period))
        .iter()
        .map(|segment| RequestDescriptor::build(request, segment, "tok", segment.is_first()))
        .collect()
}

#[test]
fn header_is_requested_for_first_segment_only() {
    let request = ExportRequest::for_year("SBER", "3", Granularity::OneHour, 2023);
    let all = descriptors(&request);

    assert_eq!(all.len(), 4);
    assert_eq!(all[0].param("at"), Some("1"));
    for later in &all[1..] {
        assert_eq!(later.param("at"), Some("0"));
    }
}

#[test]
fn segment_dates_map_to_split_fields() {
    let request = ExportRequest::for_range(
        "GAZP",
        "16842",
        Granularity::Daily,
        date(2021, 12, 5),
        date(2022, 3, 9),
    );
    let all = descriptors(&request);
    let d = &all[0];

    assert_eq!(d.param("from"), Some("05.12.2021"));
    assert_eq!(d.param("to"), Some("09.03.2022"));
    assert_eq!(d.param("yf"), Some("2021"));
    assert_eq!(d.param("yt"), Some("2022"));
    assert_eq!(d.param("df"), Some("5"));
    assert_eq!(d.param("dt"), Some("9"));
    assert_eq!(d.param("mf"), Some("11"));
    assert_eq!(d.param("mt"), Some("2"));
    assert_eq!(d.param("f"), Some("GAZP_211205_220309"));
    assert_eq!(d.param("cn"), Some("GAZP"));
    assert_eq!(d.param("market"), Some("undefined"));
}

#[test]
fn explicit_options_override_defaults() {
    let mut request = ExportRequest::for_year("SBER", "3", Granularity::Daily, 2023);
    request.sep = Some(FieldSeparator::Tab);
    request.msor = Some(CandleTime::Close);
    request.market = Some(1);
    request.cn = Some("Sberbank".to_string());
    request.file_name = Some("sber_daily".to_string());

    let d = &descriptors(&request)[0];
    assert_eq!(d.param("sep"), Some("4"));
    assert_eq!(d.param("MSOR"), Some("1"));
    assert_eq!(d.param("market"), Some("1"));
    assert_eq!(d.param("cn"), Some("Sberbank"));
    assert_eq!(d.param("f"), Some("sber_daily"));
}

#[test]
fn url_carries_every_parameter_and_redaction_hides_token() {
    let request = ExportRequest::for_year("SBER", "3", Granularity::Daily, 2023);
    let d = descriptors(&request).remove(0);

    let url = d.url().unwrap();
    assert_eq!(url.host_str(), Some("export.finam.ru"));
    assert_eq!(url.query_pairs().count(), d.params.len());
    assert!(url.as_str().contains("token=tok"));

    let redacted = d.redacted_url().unwrap();
    assert!(!redacted.as_str().contains("token=tok"));
    assert!(redacted.as_str().contains("code=SBER"));
}
