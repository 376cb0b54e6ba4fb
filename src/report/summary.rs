use super::pdf::{wrap, PdfPage, Rgb, TextAlign};
use crate::api::{SafetyStatus, Statistics};
use crate::error::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

const ACCENT: Rgb = Rgb(59, 130, 246);
const SAFE: Rgb = Rgb(16, 185, 129);
const DANGER: Rgb = Rgb(239, 68, 68);
const WARNING: Rgb = Rgb(245, 158, 11);

/// Numbers shown in an exported report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub generated_at: DateTime<Local>,
    pub status: SafetyStatus,
    /// Server-reported compliance, as shown on the dashboard
    pub safety_percentage: f64,
    pub with_mask: u64,
    pub without_mask: u64,
    pub incorrect_mask: u64,
    pub total_detections: u64,
    pub last_violation: Option<String>,
}

impl ReportSummary {
    pub fn from_snapshot(snapshot: &Statistics, generated_at: DateTime<Local>) -> Self {
        Self {
            generated_at,
            status: snapshot.current_status,
            safety_percentage: snapshot.safety_percentage,
            with_mask: snapshot.with_mask,
            without_mask: snapshot.without_mask,
            incorrect_mask: snapshot.incorrect_mask,
            total_detections: snapshot.total_detections,
            last_violation: snapshot.last_violation.clone(),
        }
    }

    /// People counted across the three mask classes
    pub fn people(&self) -> u64 {
        self.with_mask
            .saturating_add(self.without_mask)
            .saturating_add(self.incorrect_mask)
    }

    /// Rounded share of people wearing a mask correctly; 100 with nobody seen
    pub fn compliance(&self) -> u64 {
        let people = self.people();
        if people == 0 {
            return 100;
        }
        let share = (self.with_mask as f64 / people as f64 * 100.0).round() as u64;
        share.min(100)
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{} out of {} people ({}%) wearing masks correctly",
            self.with_mask,
            self.people(),
            self.compliance()
        )
    }

    pub fn environment_text(&self) -> &'static str {
        match self.status {
            SafetyStatus::Safe => "Environment Safe",
            SafetyStatus::Unsafe => "Environment Unsafe!",
        }
    }

    pub fn last_violation_text(&self) -> String {
        match &self.last_violation {
            Some(at) => format!("Last detected: {}", at),
            None => "No violations detected".to_string(),
        }
    }

    /// `MaskGuard_Report_YYYY-MM-DD_HH-MM.pdf`
    pub fn file_name(&self) -> String {
        format!(
            "MaskGuard_Report_{}.pdf",
            self.generated_at.format("%Y-%m-%d_%H-%M")
        )
    }

    pub fn render_pdf(&self) -> Vec<u8> {
        let mut page = PdfPage::new();

        page.bold_text(105.0, 20.0, 20.0, ACCENT, TextAlign::Center, "MaskGuard Detection Report");
        page.text(
            105.0,
            28.0,
            10.0,
            Rgb::gray(100),
            TextAlign::Center,
            &format!("Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S")),
        );
        page.line(20.0, 32.0, 190.0, 32.0, Rgb::gray(200));

        page.bold_text(20.0, 42.0, 14.0, Rgb::BLACK, TextAlign::Left, "Environment Status");
        page.text(
            30.0,
            50.0,
            11.0,
            Rgb::gray(60),
            TextAlign::Left,
            &format!("Status: {}", self.environment_text()),
        );
        page.text(
            30.0,
            57.0,
            11.0,
            Rgb::gray(60),
            TextAlign::Left,
            &format!("Compliance: {}% Compliance", self.safety_percentage),
        );

        page.bold_text(20.0, 72.0, 14.0, Rgb::BLACK, TextAlign::Left, "Detection Statistics");
        let rows = [
            ("With Mask:", self.with_mask, SAFE),
            ("Without Mask:", self.without_mask, DANGER),
            ("Incorrect Mask:", self.incorrect_mask, WARNING),
            ("Total Detections:", self.total_detections, Rgb::gray(60)),
        ];
        for (row, (label, value, color)) in rows.iter().enumerate() {
            let y = 82.0 + row as f32 * 8.0;
            page.text(30.0, y, 11.0, *color, TextAlign::Left, label);
            page.text(80.0, y, 11.0, Rgb::BLACK, TextAlign::Left, &value.to_string());
        }

        page.bold_text(20.0, 121.0, 14.0, Rgb::BLACK, TextAlign::Left, "Last Violation");
        for (row, line) in wrap(&self.last_violation_text(), 80).iter().enumerate() {
            page.text(30.0, 129.0 + row as f32 * 5.0, 11.0, Rgb::gray(60), TextAlign::Left, line);
        }

        let box_y = 145.0;
        page.fill_rect(20.0, box_y, 170.0, 30.0, ACCENT);
        page.bold_text(105.0, box_y + 10.0, 12.0, Rgb::WHITE, TextAlign::Center, "Summary");
        page.text(
            105.0,
            box_y + 20.0,
            10.0,
            Rgb::WHITE,
            TextAlign::Center,
            &self.summary_line(),
        );

        page.text(
            105.0,
            280.0,
            8.0,
            Rgb::gray(150),
            TextAlign::Center,
            "MaskGuard Detection System",
        );

        page.finish()
    }

    /// Render and write the report into `dir`, creating it if needed
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(self.file_name());
        tokio::fs::write(&path, self.render_pdf()).await?;

        info!("Report written to {}", path.display());
        Ok(path)
    }
}
