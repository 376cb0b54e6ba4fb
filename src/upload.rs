use crate::api::{DetectionApi, ImageDetections};
use crate::error::{DecodeError, Result};
use crate::frame::{encode_data_url, DataUrl};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of analysing one still image
#[derive(Debug, Clone)]
pub struct UploadAnalysis {
    pub detections: ImageDetections,
    /// Annotated image returned by the server
    pub annotated: DataUrl,
    pub saved_to: Option<PathBuf>,
}

/// Send an image file to `/process_image`.
///
/// Content is sniffed rather than trusted by extension; anything that is not
/// a recognised image is rejected before a request is made. When `output`
/// names a directory the annotated image is saved inside it as
/// `<stem>_annotated.<ext>`; otherwise `output` is the file path.
pub async fn analyze_image(
    api: &dyn DetectionApi,
    path: &Path,
    output: Option<&Path>,
) -> Result<UploadAnalysis> {
    let bytes = tokio::fs::read(path).await?;
    let mime = sniff_image_mime(&bytes)?;
    debug!("Uploading {} ({}, {} bytes)", path.display(), mime, bytes.len());

    let response = api.process_image(encode_data_url(mime, &bytes)).await?;
    let annotated = DataUrl::parse(&response.image)?;

    let saved_to = match output {
        Some(output) => {
            let target = output_path(path, output, &annotated).await;
            tokio::fs::write(&target, &annotated.bytes).await?;
            info!("Annotated image saved to {}", target.display());
            Some(target)
        }
        None => None,
    };

    Ok(UploadAnalysis {
        detections: response.detections,
        annotated,
        saved_to,
    })
}

/// Mime type of an image payload, or the upload rejection
pub fn sniff_image_mime(bytes: &[u8]) -> std::result::Result<&'static str, DecodeError> {
    let not_an_image = || DecodeError::NotAnImage("Please upload an image file".to_string());

    match image::guess_format(bytes).map_err(|_| not_an_image())? {
        ImageFormat::Jpeg => Ok("image/jpeg"),
        ImageFormat::Png => Ok("image/png"),
        ImageFormat::Gif => Ok("image/gif"),
        ImageFormat::WebP => Ok("image/webp"),
        ImageFormat::Bmp => Ok("image/bmp"),
        ImageFormat::Tiff => Ok("image/tiff"),
        _ => Err(not_an_image()),
    }
}

async fn output_path(input: &Path, output: &Path, annotated: &DataUrl) -> PathBuf {
    let is_dir = tokio::fs::metadata(output)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);

    if !is_dir {
        return output.to_path_buf();
    }

    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    output.join(format!("{}_annotated.{}", stem, annotated.extension()))
}
