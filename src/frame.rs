use crate::error::DecodeError;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use std::sync::Arc;
use std::time::SystemTime;

const JPEG_MIME: &str = "image/jpeg";

/// Uncompressed RGB24 frame as delivered by a capture device
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Unique frame identifier within a device session
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Packed RGB24 pixels
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl RawFrame {
    pub fn new(id: u64, data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            id,
            timestamp: SystemTime::now(),
            data: Arc::new(data),
            width,
            height,
        }
    }

    /// Build a packed frame from a buffer whose rows are `stride` bytes apart.
    ///
    /// Returns `None` when the stride is narrower than a row or the buffer
    /// ends before the last row. The final row may omit its padding.
    pub fn from_strided(
        id: u64,
        data: &[u8],
        stride: usize,
        width: u32,
        height: u32,
    ) -> Option<Self> {
        let row_bytes = width as usize * 3;
        let rows = height as usize;
        if stride < row_bytes {
            return None;
        }
        if rows > 0 && data.len() < stride * (rows - 1) + row_bytes {
            return None;
        }

        let mut packed = Vec::with_capacity(row_bytes * rows);
        for row in 0..rows {
            let start = row * stride;
            packed.extend_from_slice(&data[start..start + row_bytes]);
        }
        Some(Self::new(id, packed, width, height))
    }

    /// Expected buffer length for the frame dimensions
    pub fn expected_size(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Validate frame data size against expected size
    pub fn validate_size(&self) -> bool {
        self.data.len() == self.expected_size()
    }

    /// Compress to JPEG at the given quality (1-100)
    pub fn encode_jpeg(&self, quality: u8) -> Result<EncodedFrame, DecodeError> {
        let mut bytes = Vec::with_capacity(self.data.len() / 8);
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
        encoder.encode(&self.data, self.width, self.height, ColorType::Rgb8)?;

        Ok(EncodedFrame {
            frame_id: self.id,
            timestamp: self.timestamp,
            mime: JPEG_MIME.to_string(),
            bytes: Arc::new(bytes),
            width: self.width,
            height: self.height,
        })
    }
}

/// Compressed still image ready to ship to the detection server
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub frame_id: u64,
    pub timestamp: SystemTime,
    pub mime: String,
    pub bytes: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
}

impl EncodedFrame {
    /// Wrap already-encoded image bytes
    pub fn from_bytes(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            frame_id: 0,
            timestamp: SystemTime::now(),
            mime: mime.into(),
            bytes: Arc::new(bytes),
            width: 0,
            height: 0,
        }
    }

    /// `data:<mime>;base64,<payload>` form used on the wire
    pub fn to_data_url(&self) -> String {
        encode_data_url(&self.mime, &self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Image returned by the server as a data URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    pub fn parse(input: &str) -> Result<Self, DecodeError> {
        decode_data_url(input)
    }

    /// File extension matching the payload's mime type
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/bmp" => "bmp",
            _ => "jpg",
        }
    }
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64_STANDARD.encode(bytes))
}

pub fn decode_data_url(input: &str) -> Result<DataUrl, DecodeError> {
    let rest = input
        .strip_prefix("data:")
        .ok_or_else(|| DecodeError::DataUrl("missing 'data:' scheme".to_string()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| DecodeError::DataUrl("missing ',' separator".to_string()))?;

    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| DecodeError::DataUrl("only base64 payloads are supported".to_string()))?;

    let bytes = BASE64_STANDARD.decode(payload.trim())?;

    Ok(DataUrl {
        mime: if mime.is_empty() {
            "text/plain".to_string()
        } else {
            mime.to_string()
        },
        bytes,
    })
}
