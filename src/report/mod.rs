//! One-page PDF summary of the current statistics

mod pdf;
mod summary;
#[cfg(test)]
mod tests;

pub use pdf::{PdfPage, Rgb, TextAlign};
pub use summary::ReportSummary;
