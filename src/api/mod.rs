//! HTTP surface of the detection server

mod client;
mod types;

pub use client::{DetectionApi, MaskguardClient};
pub use types::{
    AlertPayload, HistoryEntry, ImageDetections, ImagePayload, ProcessFrameResponse,
    ProcessImageResponse, SafetyStatus, ServerHealth, Statistics,
};
