// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic images shared by the unit tests.

use image::{Rgb, RgbImage};

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

pub fn white(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
}

/// Paint a `size x size` square with its top-left corner at `(x0, y0)`.
pub fn fill(image: &mut RgbImage, x0: u32, y0: u32, size: u32, color: Rgb<u8>) {
    for y in y0..y0 + size {
        for x in x0..x0 + size {
            image.put_pixel(x, y, color);
        }
    }
}

/// A landscape photo of the sheet: white paper with four 60px black corner
/// markers centred 50px in from each corner.
pub fn marker_sheet(width: u32, height: u32) -> RgbImage {
    let mut image = white(width, height);
    for (cx, cy) in marker_centres(width, height) {
        fill(&mut image, cx - 30, cy - 30, 60, BLACK);
    }
    image
}

/// Marker centres of [`marker_sheet`]: top-left, top-right, bottom-left,
/// bottom-right.
pub fn marker_centres(width: u32, height: u32) -> [(u32, u32); 4] {
    [
        (50, 50),
        (width - 50, 50),
        (50, height - 50),
        (width - 50, height - 50),
    ]
}

/// Render `payload` as a QR code with 6px modules and a 4-module quiet zone,
/// with its top-left corner at `(x0, y0)`.
pub fn draw_qr(image: &mut RgbImage, payload: &[u8], x0: u32, y0: u32) {
    let code = qrcode::QrCode::new(payload).expect("payload fits in a QR code");
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let scale = 6;
    let quiet = 4;

    for my in 0..modules {
        for mx in 0..modules {
            if colors[(my * modules + mx) as usize] == qrcode::Color::Dark {
                fill(
                    image,
                    x0 + (quiet + mx) * scale,
                    y0 + (quiet + my) * scale,
                    scale,
                    BLACK,
                );
            }
        }
    }
}

/// Side length in pixels of the QR code [`draw_qr`] renders for `payload`.
pub fn qr_side(payload: &[u8]) -> u32 {
    let code = qrcode::QrCode::new(payload).expect("payload fits in a QR code");
    (code.width() as u32 + 8) * 6
}
