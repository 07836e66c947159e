// src/render/media.rs

use crate::error::AppError;

/// EMU per inch, the unit docx embeds use.
pub const EMU_PER_INCH: u32 = 914_400;

/// Decoded image metadata plus the original bytes for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedImage {
    pub bytes: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl ProbedImage {
    /// Scales to the given width, preserving the intrinsic aspect ratio.
    /// Returns (width, height) in EMU.
    pub fn scaled_to_width(&self, width_emu: u32) -> (u32, u32) {
        let height_emu =
            (width_emu as u64 * self.height_px as u64 / self.width_px.max(1) as u64) as u32;
        (width_emu, height_emu)
    }
}

/// Probes raw bytes for intrinsic dimensions. A decode failure is a
/// RenderError: the export carrying this image must not be emitted.
pub fn probe_image(bytes: &[u8]) -> Result<ProbedImage, AppError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| AppError::RenderError(format!("Image decode failed: {}", e)))?;

    Ok(ProbedImage {
        width_px: decoded.width(),
        height_px: decoded.height(),
        bytes: bytes.to_vec(),
    })
}
