// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Answer sheet — one rectified sheet together with its optional identity
// payload, and the operations callers run on it.

use std::path::Path;

use femida_core::config::DetectConfig;
use femida_core::error::{FemidaError, Result};
use image::{ImageError, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::{info, instrument};

use crate::calibration::{self, CANONICAL_HEIGHT, CANONICAL_WIDTH};
use crate::extract::{RegionBatch, extract};
use crate::identity::{IdentityPayload, validate};
use crate::scan::rectangles::{CandidateRectangle, find_rectangles};
use crate::scan::rectify::SheetRectifier;

/// Outline colour of calibration boxes in [`AnswerSheet::calibration_overlay`].
const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Outline thickness in pixels, centred on the box edge.
const OVERLAY_THICKNESS: i32 = 4;

/// Whether an input image still needs perspective correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetSource {
    /// A photograph that must be rectified first.
    Raw,
    /// An image already at the canonical sheet size.
    #[default]
    Rectified,
}

#[derive(Debug, Clone, Default)]
pub struct SheetOptions {
    /// Require a decodable identity code before accepting the sheet.
    pub validate_identity: bool,
    pub config: DetectConfig,
}

/// Open an image file as RGB, at whatever size it was captured.
///
/// Filesystem failures surface as [`FemidaError::Io`], so a missing file keeps
/// its `NotFound` kind; decode failures are [`FemidaError::ImageError`].
pub fn load_image(path: impl AsRef<Path>) -> Result<RgbImage> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|err| match err {
        ImageError::IoError(io_err) => FemidaError::Io(io_err),
        other => FemidaError::ImageError(format!(
            "failed to open sheet image {}: {}",
            path.display(),
            other
        )),
    })?;
    Ok(image.to_rgb8())
}

/// A rectified answer sheet.
#[derive(Debug, Clone)]
pub struct AnswerSheet {
    image: RgbImage,
    identity: Option<IdentityPayload>,
    config: DetectConfig,
}

impl AnswerSheet {
    // -- Construction ---------------------------------------------------------

    /// Wrap an image that is already rectified to the canonical size.
    pub fn from_rectified(image: RgbImage, options: SheetOptions) -> Result<Self> {
        if image.dimensions() != (CANONICAL_WIDTH, CANONICAL_HEIGHT) {
            return Err(FemidaError::Precondition(format!(
                "rectified sheet must be {CANONICAL_WIDTH}x{CANONICAL_HEIGHT}, got {}x{}",
                image.width(),
                image.height()
            )));
        }

        let identity = if options.validate_identity {
            Some(validate(&image)?)
        } else {
            None
        };

        Ok(Self {
            image,
            identity,
            config: options.config,
        })
    }

    /// Rectify a raw photograph, then wrap it.
    #[instrument(skip_all, fields(width = raw.width(), height = raw.height()))]
    pub fn from_raw(raw: &RgbImage, options: SheetOptions) -> Result<Self> {
        let rectified = SheetRectifier::with_config(options.config.clone()).rectify(raw)?;
        Self::from_rectified(rectified, options)
    }

    /// Decode an encoded image (JPEG, PNG, ...) from memory.
    #[instrument(skip(data, options), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8], source: SheetSource, options: SheetOptions) -> Result<Self> {
        let image = image::load_from_memory(data)
            .map_err(|err| FemidaError::ImageError(format!("failed to decode sheet image: {err}")))?
            .to_rgb8();
        info!(width = image.width(), height = image.height(), "Sheet image loaded");
        Self::from_source(image, source, options)
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(
        path: impl AsRef<Path>,
        source: SheetSource,
        options: SheetOptions,
    ) -> Result<Self> {
        let image = load_image(path)?;
        Self::from_source(image, source, options)
    }

    fn from_source(image: RgbImage, source: SheetSource, options: SheetOptions) -> Result<Self> {
        match source {
            SheetSource::Raw => Self::from_raw(&image, options),
            SheetSource::Rectified => Self::from_rectified(image, options),
        }
    }

    // -- Accessors ------------------------------------------------------------

    /// Identity payload, present when the sheet was built with
    /// `validate_identity`.
    pub fn identity(&self) -> Option<&IdentityPayload> {
        self.identity.as_ref()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    // -- Operations -----------------------------------------------------------

    /// Every calibrated bubble as one batch; see [`extract`].
    pub fn regions(&self, resize: Option<u32>) -> Result<RegionBatch> {
        extract(&self.image, resize)
    }

    /// Experimental: printed boxes in the bottom strip of the sheet, found
    /// with the auxiliary policy.
    pub fn bottom_rectangles(&self) -> Vec<CandidateRectangle> {
        find_rectangles(&self.image, &self.config.auxiliary)
    }

    /// Copy of the sheet with every calibration box outlined in red.
    pub fn calibration_overlay(&self) -> RgbImage {
        let mut canvas = self.image.clone();
        for (_, geometry) in calibration::table().iter() {
            let slice = geometry.to_slice();
            let (x0, y0) = (slice.cols.start as i32, slice.rows.start as i32);
            let (w, h) = (slice.width() as i32, slice.height() as i32);

            let half = OVERLAY_THICKNESS / 2;
            for k in -half..OVERLAY_THICKNESS - half {
                let (rw, rh) = (w + 1 - 2 * k, h + 1 - 2 * k);
                if rw <= 0 || rh <= 0 {
                    continue;
                }
                let rect = Rect::at(x0 + k, y0 + k).of_size(rw as u32, rh as u32);
                draw_hollow_rect_mut(&mut canvas, rect, OVERLAY_COLOR);
            }
        }
        canvas
    }

    /// Write the rectified image; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.image.save(path.as_ref()).map_err(|err| {
            FemidaError::ImageError(format!(
                "failed to save sheet image {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }
}
