// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region extraction — slices every calibrated bubble out of a rectified sheet
// and stacks the patches into one (batch, channel, height, width) tensor.

use femida_core::error::{FemidaError, Result};
use femida_core::types::Key;
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::{Array4, ArrayView3, s};
use tracing::{debug, instrument};

use crate::calibration::{self, CANONICAL_HEIGHT, CANONICAL_WIDTH};

/// All 240 bubble patches of one sheet, in calibration-table order.
///
/// `tensor` has shape `(240, 3, h, w)` with RGB channels scaled to `[0, 1]`;
/// `keys[i]` names the bubble in batch slot `i`.
#[derive(Debug, Clone)]
pub struct RegionBatch {
    keys: Vec<Key>,
    tensor: Array4<f32>,
}

impl RegionBatch {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn tensor(&self) -> &Array4<f32> {
        &self.tensor
    }

    /// `(channels, height, width)` of one patch.
    pub fn patch_shape(&self) -> (usize, usize, usize) {
        let (_, c, h, w) = self.tensor.dim();
        (c, h, w)
    }

    /// The patch in batch slot `index`.
    pub fn patch(&self, index: usize) -> Option<ArrayView3<'_, f32>> {
        (index < self.len()).then(|| self.tensor.slice(s![index, .., .., ..]))
    }

    pub fn patch_for(&self, key: Key) -> Option<ArrayView3<'_, f32>> {
        let index = self.keys.iter().position(|k| *k == key)?;
        self.patch(index)
    }

    /// Mean intensity of one patch over all channels; 1.0 is paper white.
    pub fn mean_intensity(&self, index: usize) -> Option<f32> {
        self.patch(index).and_then(|p| p.mean())
    }

    pub fn into_parts(self) -> (Vec<Key>, Array4<f32>) {
        (self.keys, self.tensor)
    }
}

/// Extract every calibrated bubble from a rectified sheet.
///
/// With `resize`, each patch is resampled to `resize x resize`. Without it,
/// patches keep their native size; truncation makes slices differ by a pixel
/// across the grid, so every patch is cropped to the smallest slice.
#[instrument(skip(rectified), fields(width = rectified.width(), height = rectified.height()))]
pub fn extract(rectified: &RgbImage, resize: Option<u32>) -> Result<RegionBatch> {
    if rectified.dimensions() != (CANONICAL_WIDTH, CANONICAL_HEIGHT) {
        return Err(FemidaError::Precondition(format!(
            "expected a rectified {CANONICAL_WIDTH}x{CANONICAL_HEIGHT} sheet, got {}x{}",
            rectified.width(),
            rectified.height()
        )));
    }
    if resize == Some(0) {
        return Err(FemidaError::Precondition(
            "patch resize must be at least 1 pixel".into(),
        ));
    }

    let table = calibration::table();
    let mut crops = Vec::with_capacity(table.len());
    for (key, geometry) in table.iter() {
        let (x, y, w, h) = geometry
            .to_slice()
            .clamp_to(rectified.width(), rectified.height())
            .ok_or_else(|| {
                FemidaError::Precondition(format!("bubble {key} lies outside the sheet"))
            })?;
        crops.push((key, x, y, w, h));
    }

    let (height, width) = match resize {
        Some(side) => (side, side),
        None => (
            crops.iter().map(|c| c.4).min().unwrap_or(0),
            crops.iter().map(|c| c.3).min().unwrap_or(0),
        ),
    };

    let mut tensor = Array4::<f32>::zeros((crops.len(), 3, height as usize, width as usize));
    let mut keys = Vec::with_capacity(crops.len());

    for (slot, &(key, x, y, w, h)) in crops.iter().enumerate() {
        let patch = match resize {
            Some(side) => image::imageops::resize(
                &image::imageops::crop_imm(rectified, x, y, w, h).to_image(),
                side,
                side,
                FilterType::Triangle,
            ),
            None => image::imageops::crop_imm(rectified, x, y, width, height).to_image(),
        };

        for (px, py, pixel) in patch.enumerate_pixels() {
            for (channel, value) in pixel.0.iter().enumerate() {
                tensor[[slot, channel, py as usize, px as usize]] = *value as f32 / 255.0;
            }
        }
        keys.push(key);
    }

    debug!(patches = keys.len(), height, width, "Regions extracted");
    Ok(RegionBatch { keys, tensor })
}

#[cfg(test)]
mod tests {
    use femida_core::types::Label;
    use image::Rgb;

    use super::*;
    use crate::test_utils::white;

    fn canonical_white() -> RgbImage {
        white(CANONICAL_WIDTH, CANONICAL_HEIGHT)
    }

    #[test]
    fn keys_follow_table_order() {
        let batch = extract(&canonical_white(), Some(8)).unwrap();
        assert_eq!(batch.len(), 240);
        assert_eq!(batch.keys(), calibration::table().keys().as_slice());
        assert_eq!(batch.tensor().dim(), (240, 3, 8, 8));
    }

    #[test]
    fn native_patches_use_smallest_slice() {
        let batch = extract(&canonical_white(), None).unwrap();
        assert_eq!(batch.tensor().dim(), (240, 3, 119, 116));
        assert_eq!(batch.patch_shape(), (3, 119, 116));
    }

    #[test]
    fn white_sheet_scales_to_one() {
        let batch = extract(&canonical_white(), Some(16)).unwrap();
        assert!(batch.tensor().iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn painted_bubble_is_dark_in_its_slot_only() {
        let mut sheet = canonical_white();
        let key = Key { question: 21, label: Label::B };
        let slice = calibration::geometry_for(21, 'B').unwrap().to_slice();
        for y in slice.rows.clone() {
            for x in slice.cols.clone() {
                sheet.put_pixel(x as u32, y as u32, Rgb([0, 0, 0]));
            }
        }

        let batch = extract(&sheet, None).unwrap();
        let slot = batch.keys().iter().position(|k| *k == key).unwrap();
        for index in 0..batch.len() {
            let mean = batch.mean_intensity(index).unwrap();
            if index == slot {
                assert!(mean < 0.01, "{key} mean {mean}");
            } else {
                assert!(mean > 0.99, "{} mean {mean}", batch.keys()[index]);
            }
        }
        assert!(batch.patch_for(key).is_some());
    }

    #[test]
    fn channel_order_is_rgb() {
        let sheet = RgbImage::from_pixel(CANONICAL_WIDTH, CANONICAL_HEIGHT, Rgb([255, 0, 51]));
        let batch = extract(&sheet, Some(4)).unwrap();
        let patch = batch.patch(0).unwrap();
        assert!((patch[[0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!(patch[[1, 0, 0]].abs() < 1e-6);
        assert!((patch[[2, 0, 0]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn non_canonical_size_is_rejected() {
        assert!(matches!(
            extract(&white(100, 100), None),
            Err(FemidaError::Precondition(_))
        ));
        assert!(matches!(
            extract(&canonical_white(), Some(0)),
            Err(FemidaError::Precondition(_))
        ));
    }
}
