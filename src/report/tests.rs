use super::*;
use crate::api::{SafetyStatus, Statistics};
use chrono::{Local, TimeZone};

fn generated_at() -> chrono::DateTime<Local> {
    Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 42).unwrap()
}

fn snapshot() -> Statistics {
    Statistics {
        with_mask: 7,
        without_mask: 2,
        incorrect_mask: 1,
        total_detections: 10,
        current_status: SafetyStatus::Unsafe,
        safety_percentage: 70.0,
        last_violation: Some("2026-03-07 09:04:10".to_string()),
        ..Statistics::cleared()
    }
}

fn pdf_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[test]
fn test_compliance_rounds_share_of_people() {
    let summary = ReportSummary::from_snapshot(&snapshot(), generated_at());
    assert_eq!(summary.people(), 10);
    assert_eq!(summary.compliance(), 70);
    assert_eq!(
        summary.summary_line(),
        "7 out of 10 people (70%) wearing masks correctly"
    );

    let thirds = Statistics {
        with_mask: 2,
        without_mask: 1,
        incorrect_mask: 0,
        ..Statistics::cleared()
    };
    assert_eq!(
        ReportSummary::from_snapshot(&thirds, generated_at()).compliance(),
        67
    );
}

#[test]
fn test_compliance_is_full_with_nobody_seen() {
    let summary = ReportSummary::from_snapshot(&Statistics::cleared(), generated_at());
    assert_eq!(summary.compliance(), 100);
    assert_eq!(
        summary.summary_line(),
        "0 out of 0 people (100%) wearing masks correctly"
    );
    assert_eq!(summary.last_violation_text(), "No violations detected");
    assert_eq!(summary.environment_text(), "Environment Safe");
}

#[test]
fn test_counts_near_u64_max_saturate() {
    let huge = Statistics {
        with_mask: u64::MAX,
        without_mask: u64::MAX,
        incorrect_mask: 1,
        ..Statistics::cleared()
    };
    let summary = ReportSummary::from_snapshot(&huge, generated_at());
    assert_eq!(summary.people(), u64::MAX);
    assert_eq!(summary.compliance(), 100);

    let text = pdf_text(&summary.render_pdf());
    assert!(text.contains(&format!("out of {} people", u64::MAX)));
}

#[test]
fn test_file_name_uses_generation_minute() {
    let summary = ReportSummary::from_snapshot(&snapshot(), generated_at());
    assert_eq!(summary.file_name(), "MaskGuard_Report_2026-03-07_09-05.pdf");
}

#[test]
fn test_render_pdf_structure_and_content() {
    let summary = ReportSummary::from_snapshot(&snapshot(), generated_at());
    let bytes = summary.render_pdf();
    let text = pdf_text(&bytes);

    assert!(bytes.starts_with(b"%PDF-1.4\n"));
    assert!(text.trim_end().ends_with("%%EOF"));
    assert!(text.contains("/Type /Catalog"));
    assert!(text.contains("(MaskGuard Detection Report) Tj"));
    assert!(text.contains("(Generated: 2026-03-07 09:05:42) Tj"));
    assert!(text.contains("(Status: Environment Unsafe!) Tj"));
    assert!(text.contains("(Compliance: 70% Compliance) Tj"));
    assert!(text.contains("(Last detected: 2026-03-07 09:04:10) Tj"));
    assert!(text.contains("(7 out of 10 people \\(70%\\) wearing masks correctly) Tj"));

    // startxref must point at the xref table
    let startxref = text.rfind("startxref\n").unwrap() + "startxref\n".len();
    let offset: usize = text[startxref..].lines().next().unwrap().parse().unwrap();
    assert!(bytes[offset..].starts_with(b"xref\n0 7\n"));
}

#[test]
fn test_xref_offsets_point_at_objects() {
    let bytes = ReportSummary::from_snapshot(&snapshot(), generated_at()).render_pdf();
    let text = pdf_text(&bytes);

    let xref = text.rfind("xref\n0 7\n").unwrap();
    let entries: Vec<usize> = text[xref..]
        .lines()
        .skip(3)
        .take(6)
        .map(|line| line[..10].parse().unwrap())
        .collect();

    for (index, offset) in entries.iter().enumerate() {
        let expected = format!("{} 0 obj", index + 1);
        assert!(
            bytes[*offset..].starts_with(expected.as_bytes()),
            "object {} not at offset {}",
            index + 1,
            offset
        );
    }
}

#[test]
fn test_pdf_text_escaping_and_latin1() {
    let mut page = PdfPage::new();
    page.text(10.0, 10.0, 12.0, Rgb::BLACK, TextAlign::Left, "a (b) \\ c ✓");
    let text = pdf_text(&page.finish());
    assert!(text.contains("(a \\(b\\) \\\\ c ?) Tj"));
}

#[tokio::test]
async fn test_write_to_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("reports");

    let summary = ReportSummary::from_snapshot(&snapshot(), generated_at());
    let path = summary.write_to(&target).await.unwrap();

    assert_eq!(path, target.join("MaskGuard_Report_2026-03-07_09-05.pdf"));
    let written = std::fs::read(&path).unwrap();
    assert!(written.starts_with(b"%PDF-1.4"));
}
