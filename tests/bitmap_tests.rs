// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for bitmap padding

use live_effects::bitmap::{Bitmap, padding_pixels};

fn pattern(width: u32, height: u32) -> Bitmap {
    let mut bitmap = Bitmap::new(width, height);
    for y in 0..height {
        for x in 0..width {
            bitmap.set_pixel(x, y, [(x * 3) as u8, (y * 5) as u8, (x ^ y) as u8, 200]);
        }
    }
    bitmap
}

#[test]
fn test_alignment_padding_round_trip() {
    let bitmap = pattern(137, 241);
    let aligned = bitmap.add_alignment_padding();

    assert_eq!(aligned.width, 192);
    assert_eq!(aligned.height, 241);
    assert!(aligned.is_row_aligned());
    // Extra columns are transparent
    assert_eq!(aligned.pixel(137, 10), [0, 0, 0, 0]);
    assert_eq!(aligned.pixel(191, 240), [0, 0, 0, 0]);

    assert_eq!(aligned.remove_alignment_padding(137, 241), bitmap);
}

#[test]
fn test_already_aligned_bitmap_is_unchanged() {
    let bitmap = pattern(64, 3);
    assert!(bitmap.is_row_aligned());
    assert_eq!(bitmap.add_alignment_padding(), bitmap);
}

#[test]
fn test_effect_padding_then_crop() {
    let bitmap = pattern(9, 4);
    let padded = bitmap.pad(6).unwrap();

    assert_eq!((padded.width, padded.height), (21, 16));
    assert_eq!(padded.pixel(0, 0), [0, 0, 0, 0]);
    assert_eq!(padded.pixel(6, 6), bitmap.pixel(0, 0));
    assert_eq!(padded.pixel(14, 9), bitmap.pixel(8, 3));
    assert_eq!(padded.crop(6, 6, 9, 4), bitmap);
}

#[test]
fn test_crop_outside_is_transparent() {
    let bitmap = pattern(4, 4);
    let cropped = bitmap.crop(2, 2, 4, 4);
    assert_eq!(cropped.pixel(1, 1), bitmap.pixel(3, 3));
    assert_eq!(cropped.pixel(3, 3), [0, 0, 0, 0]);
    assert_eq!(bitmap.crop(10, 0, 2, 2), Bitmap::new(2, 2));
}

#[test]
fn test_padding_pixels() {
    assert_eq!(padding_pixels(0.0), 0);
    assert_eq!(padding_pixels(-3.0), 0);
    assert_eq!(padding_pixels(f64::NAN), 0);
    assert_eq!(padding_pixels(2.01), 3);
    assert_eq!(padding_pixels(5.0), 5);
}

#[test]
fn test_from_rgba_checks_length() {
    assert!(Bitmap::from_rgba(2, 2, vec![0; 16]).is_ok());
    assert!(Bitmap::from_rgba(2, 2, vec![0; 15]).is_err());
}

#[test]
fn test_rgba_image_conversion() {
    let bitmap = pattern(5, 7);
    let image = bitmap.clone().into_rgba_image().unwrap();
    assert_eq!(image.dimensions(), (5, 7));
    assert_eq!(Bitmap::from(image), bitmap);
}
