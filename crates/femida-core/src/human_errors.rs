// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator-facing error messages for the people feeding sheets into Femida.
//
// Every technical error is mapped to a plain statement plus what to do next.
// The core never retries by itself; `retake_photo` is a hint for the caller.

use crate::error::FemidaError;

/// How the operator should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The photograph itself is unusable; a new capture usually fixes it.
    Retake,
    /// Something in the input or settings must be corrected first.
    Fixable,
    /// Nothing the operator can do about this sheet or file.
    Permanent,
}

/// A plain-language error with an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary (shown as a heading).
    pub message: String,
    /// What the operator should try next.
    pub suggestion: String,
    /// Whether photographing the sheet again is likely to help.
    pub retake_photo: bool,
    pub severity: Severity,
}

/// Convert a `FemidaError` into something a scanning-desk operator can act on.
pub fn humanize_error(err: &FemidaError) -> HumanError {
    match err {
        // -- Geometry --
        FemidaError::InsufficientMarkers { found } => HumanError {
            message: format!("Only {found} of the 4 corner squares could be found."),
            suggestion: "Photograph the whole sheet so that all four black corner squares are visible, flat and well lit.".into(),
            retake_photo: true,
            severity: Severity::Retake,
        },

        FemidaError::DegenerateGeometry(_) => HumanError {
            message: "The corner squares don't form a usable sheet outline.".into(),
            suggestion: "Hold the camera roughly square to the sheet and keep it upright, then try again.".into(),
            retake_photo: true,
            severity: Severity::Retake,
        },

        // -- Identity code --
        FemidaError::CodeNotFound => HumanError {
            message: "The sheet's QR code couldn't be read.".into(),
            suggestion: "Make sure the QR code is in the photo, in focus and not covered by fingers or glare.".into(),
            retake_photo: true,
            severity: Severity::Retake,
        },

        FemidaError::MultipleCodes { count } => HumanError {
            message: format!("{count} QR codes were found; a sheet carries exactly one."),
            suggestion: "Photograph one sheet at a time and keep other printed codes out of the frame.".into(),
            retake_photo: true,
            severity: Severity::Retake,
        },

        FemidaError::CodeFormat(_) => HumanError {
            message: "The sheet's QR code doesn't contain sheet details.".into(),
            suggestion: "This sheet may not have been printed for this exam. Set it aside for manual checking.".into(),
            retake_photo: false,
            severity: Severity::Permanent,
        },

        // -- Caller errors --
        FemidaError::Precondition(detail) => HumanError {
            message: "The image can't be processed this way.".into(),
            suggestion: format!("Rectify the raw photo first, or check the requested question/label. ({detail})"),
            retake_photo: false,
            severity: Severity::Fixable,
        },

        FemidaError::Config(detail) => HumanError {
            message: "The detection settings are invalid.".into(),
            suggestion: format!("Fix the settings file or delete it to use the defaults. ({detail})"),
            retake_photo: false,
            severity: Severity::Fixable,
        },

        // -- Surrounding I/O --
        FemidaError::ImageError(_) => HumanError {
            message: "There's a problem with this image file.".into(),
            suggestion: "The file may be damaged or in an unusual format. Try exporting it as JPEG or PNG.".into(),
            retake_photo: false,
            severity: Severity::Permanent,
        },

        FemidaError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "Check the path and try again.".into(),
                    retake_photo: false,
                    severity: Severity::Fixable,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "Femida doesn't have permission to use that file.".into(),
                    suggestion: "Check the file permissions, or copy the file somewhere else first.".into(),
                    retake_photo: false,
                    severity: Severity::Fixable,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                    retake_photo: false,
                    severity: Severity::Fixable,
                }
            }
        }

        FemidaError::Serialization(_) => HumanError {
            message: "A settings or results file isn't valid JSON.".into(),
            suggestion: "Check the file contents, or regenerate it with `femida config`.".into(),
            retake_photo: false,
            severity: Severity::Fixable,
        },
    }
}
