// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Identity validation — decodes the sheet's QR code and parses its JSON
// payload.

use femida_core::error::{FemidaError, Result};
use image::RgbImage;
use rqrr::PreparedImage;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

/// Decoded identity payload: the JSON object carried by the sheet's code.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityPayload(Map<String, Value>);

impl IdentityPayload {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Deserialize the payload into a caller-defined record.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| FemidaError::CodeFormat(e.to_string()))
    }
}

/// Decode the single identity code in `image`.
///
/// Fails with [`FemidaError::CodeNotFound`] when no code decodes and with
/// [`FemidaError::MultipleCodes`] when more than one does; the sheet carries
/// exactly one code, so guessing between several would misattribute it.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn validate(image: &RgbImage) -> Result<IdentityPayload> {
    let gray = image::imageops::grayscale(image);
    let (width, height) = (gray.width() as usize, gray.height() as usize);

    let mut prepared = PreparedImage::prepare_from_greyscale(width, height, |x, y| {
        gray.get_pixel(x as u32, y as u32).0[0]
    });
    let grids = prepared.detect_grids();
    debug!(grids = grids.len(), "QR grids detected");

    let mut contents: Vec<String> = Vec::new();
    for grid in &grids {
        match grid.decode() {
            Ok((_, content)) => contents.push(content),
            Err(e) => warn!(error = %e, "QR grid failed to decode"),
        }
    }

    match contents.len() {
        0 => Err(FemidaError::CodeNotFound),
        1 => parse_payload(&contents[0]),
        count => Err(FemidaError::MultipleCodes { count }),
    }
}

/// Parse decoded code text; only a JSON object is a valid payload.
pub fn parse_payload(text: &str) -> Result<IdentityPayload> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| FemidaError::CodeFormat(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(IdentityPayload(map)),
        other => Err(FemidaError::CodeFormat(format!(
            "expected a JSON object, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::test_utils::{draw_qr, qr_side, white};

    const PAYLOAD: &[u8] = br#"{"id": "123"}"#;

    #[test]
    fn decodes_well_formed_payload() {
        let side = qr_side(PAYLOAD);
        let mut image = white(side + 80, side + 80);
        draw_qr(&mut image, PAYLOAD, 40, 40);

        let payload = validate(&image).unwrap();
        assert_eq!(payload.get("id"), Some(&Value::String("123".into())));
        assert_eq!(payload.as_map().len(), 1);
    }

    #[test]
    fn payload_deserializes_into_record() {
        #[derive(Deserialize)]
        struct Student {
            id: String,
        }
        let payload = parse_payload(r#"{"id": "123", "variant": 2}"#).unwrap();
        let student: Student = payload.deserialize().unwrap();
        assert_eq!(student.id, "123");

        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Numbered {
            id: u64,
        }
        assert!(matches!(
            payload.deserialize::<Numbered>(),
            Err(FemidaError::CodeFormat(_))
        ));
    }

    #[test]
    fn blank_image_has_no_code() {
        assert!(matches!(
            validate(&white(200, 200)),
            Err(FemidaError::CodeNotFound)
        ));
    }

    #[test]
    fn non_json_payload_is_a_format_error() {
        let text = b"student 123";
        let side = qr_side(text);
        let mut image = white(side + 80, side + 80);
        draw_qr(&mut image, text, 40, 40);

        assert!(matches!(validate(&image), Err(FemidaError::CodeFormat(_))));
    }

    #[test]
    fn two_codes_are_rejected() {
        let second = br#"{"id": "456"}"#;
        let side = qr_side(PAYLOAD).max(qr_side(second));
        let mut image = white(2 * side + 120, side + 80);
        draw_qr(&mut image, PAYLOAD, 40, 40);
        draw_qr(&mut image, second, side + 80, 40);

        assert!(matches!(
            validate(&image),
            Err(FemidaError::MultipleCodes { count: 2 })
        ));
    }

    #[test]
    fn only_objects_are_payloads() {
        assert!(matches!(parse_payload("[1, 2]"), Err(FemidaError::CodeFormat(_))));
        assert!(matches!(parse_payload("\"123\""), Err(FemidaError::CodeFormat(_))));
        assert!(matches!(parse_payload("{not json"), Err(FemidaError::CodeFormat(_))));
        assert!(parse_payload("{}").unwrap().into_map().is_empty());
    }
}
