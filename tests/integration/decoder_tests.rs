//! Slice decoder tests.
//!
//! Decodes synthetic TIFF files built in memory and checks pixel layout,
//! compression handling, and the failure modes of malformed input.

use bytes::Bytes;

use ct_slice_streamer::{decode_slice, read_geometry, SliceGeometry, TiffError};

use super::test_utils::{pack_bits, TiffBuilder};

fn gradient(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

// =============================================================================
// Successful Decoding
// =============================================================================

#[test]
fn test_decode_uncompressed_single_strip() {
    let pixels = gradient(16 * 8);
    let tiff = TiffBuilder::new(16, 8, pixels.clone()).build();

    let image = decode_slice(Bytes::from(tiff)).unwrap();

    assert_eq!(image.width, 16);
    assert_eq!(image.height, 8);
    assert_eq!(image.channels, 1);
    assert_eq!(image.bytes_per_channel, 1);
    assert_eq!(image.pixels.as_ref(), pixels.as_slice());
}

#[test]
fn test_decode_multi_strip_long_arrays() {
    let pixels = gradient(10 * 9);
    let tiff = TiffBuilder::new(10, 9, pixels.clone())
        .rows_per_strip(2)
        .build();

    let image = decode_slice(Bytes::from(tiff)).unwrap();
    assert_eq!(image.pixels.as_ref(), pixels.as_slice());
}

#[test]
fn test_decode_multi_strip_short_arrays() {
    let pixels = gradient(6 * 7);
    let tiff = TiffBuilder::new(6, 7, pixels.clone())
        .rows_per_strip(3)
        .short_strip_arrays()
        .build();

    let image = decode_slice(Bytes::from(tiff)).unwrap();
    assert_eq!(image.pixels.as_ref(), pixels.as_slice());
}

#[test]
fn test_decode_two_inline_short_strips() {
    // Two SHORT strip offsets fit in the entry's value field
    let pixels = gradient(4 * 4);
    let tiff = TiffBuilder::new(4, 4, pixels.clone())
        .rows_per_strip(2)
        .short_strip_arrays()
        .build();

    let image = decode_slice(Bytes::from(tiff)).unwrap();
    assert_eq!(image.pixels.as_ref(), pixels.as_slice());
}

#[test]
fn test_decode_packbits_matches_raw() {
    let mut pixels = vec![0u8; 32 * 4];
    for (i, p) in pixels.iter_mut().enumerate().skip(40).take(30) {
        *p = (i % 5) as u8;
    }

    let raw = TiffBuilder::new(32, 4, pixels.clone()).build();
    let packed = TiffBuilder::new(32, 4, pixels.clone())
        .rows_per_strip(1)
        .packbits()
        .build();
    assert!(packed.len() < raw.len());

    let raw_image = decode_slice(Bytes::from(raw)).unwrap();
    let packed_image = decode_slice(Bytes::from(packed)).unwrap();
    assert_eq!(raw_image.pixels, packed_image.pixels);
    assert_eq!(packed_image.pixels.as_ref(), pixels.as_slice());
}

#[test]
fn test_decode_16_bit_three_channel() {
    let pixels = gradient(3 * 2 * 3 * 2);
    let tiff = TiffBuilder::new(3, 2, pixels.clone())
        .bits_per_sample(16)
        .samples_per_pixel(3)
        .build();

    let image = decode_slice(Bytes::from(tiff)).unwrap();
    assert_eq!(
        image.geometry(),
        SliceGeometry {
            width: 3,
            height: 2,
            channels: 3,
            bytes_per_channel: 2,
        }
    );
    assert_eq!(image.pixels.len(), 36);
    assert_eq!(image.pixels.as_ref(), pixels.as_slice());
}

#[test]
fn test_decode_is_deterministic() {
    let tiff = Bytes::from(
        TiffBuilder::new(20, 20, gradient(400))
            .rows_per_strip(3)
            .packbits()
            .build(),
    );

    let first = decode_slice(tiff.clone()).unwrap();
    let second = decode_slice(tiff).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_packbits_noop_control_byte() {
    let pixels = vec![9u8; 8];
    let mut strip = vec![0x80];
    strip.extend(pack_bits(&pixels));
    strip.push(0x80);

    // Splice the hand-made strip over the encoder's output
    let mut tiff = TiffBuilder::new(8, 1, pixels.clone()).packbits().build();
    let encoded = pack_bits(&pixels);
    let data_start = tiff.len() - encoded.len();
    tiff.truncate(data_start);
    tiff.extend_from_slice(&strip);
    // Patch the inline StripByteCounts (entry 8, value at 8 + 2 + 7*12 + 8)
    let count_at = 8 + 2 + 7 * 12 + 8;
    tiff[count_at..count_at + 4].copy_from_slice(&(strip.len() as u32).to_le_bytes());

    let image = decode_slice(Bytes::from(tiff)).unwrap();
    assert_eq!(image.pixels.as_ref(), pixels.as_slice());
}

#[test]
fn test_read_geometry_without_decoding() {
    let tiff = TiffBuilder::new(64, 32, vec![0u8; 64 * 32])
        .bits_per_sample(16)
        .build();
    // Pixel data is short for 16-bit, but geometry only reads the directory
    let geometry = read_geometry(Bytes::from(tiff)).unwrap();
    assert_eq!(geometry.width, 64);
    assert_eq!(geometry.height, 32);
    assert_eq!(geometry.bytes_per_channel, 2);
    assert_eq!(geometry.byte_size(), 64 * 32 * 2);
}

// =============================================================================
// Failure Modes
// =============================================================================

#[test]
fn test_big_endian_rejected() {
    let mut tiff = TiffBuilder::new(4, 4, vec![1u8; 16]).build();
    tiff[0] = b'M';
    tiff[1] = b'M';

    let err = decode_slice(Bytes::from(tiff)).unwrap_err();
    assert!(matches!(err, TiffError::UnsupportedFormat { .. }));
}

#[test]
fn test_bigtiff_version_rejected() {
    let mut tiff = TiffBuilder::new(4, 4, vec![1u8; 16]).build();
    tiff[2] = 43;

    let err = decode_slice(Bytes::from(tiff)).unwrap_err();
    assert!(matches!(err, TiffError::UnsupportedFormat { .. }));
}

#[test]
fn test_empty_file_out_of_bounds() {
    let err = decode_slice(Bytes::new()).unwrap_err();
    assert!(matches!(err, TiffError::OutOfBounds { .. }));
}

#[test]
fn test_truncated_strip_data() {
    let mut tiff = TiffBuilder::new(8, 8, vec![3u8; 64]).build();
    // Shrink the declared strip so fewer bytes are produced than expected
    let count_at = 8 + 2 + 7 * 12 + 8;
    tiff[count_at..count_at + 4].copy_from_slice(&60u32.to_le_bytes());

    let err = decode_slice(Bytes::from(tiff)).unwrap_err();
    assert_eq!(
        err,
        TiffError::TruncatedImage {
            expected: 64,
            actual: 60
        }
    );
}

#[test]
fn test_strip_past_end_of_file() {
    let mut tiff = TiffBuilder::new(8, 8, vec![3u8; 64]).build();
    tiff.truncate(tiff.len() - 10);

    let err = decode_slice(Bytes::from(tiff)).unwrap_err();
    assert!(matches!(err, TiffError::OutOfBounds { .. }));
}

#[test]
fn test_oversized_strip_overruns_buffer() {
    let mut tiff = TiffBuilder::new(4, 2, vec![5u8; 8]).build();
    tiff.extend_from_slice(&[5u8; 8]);
    let count_at = 8 + 2 + 7 * 12 + 8;
    tiff[count_at..count_at + 4].copy_from_slice(&16u32.to_le_bytes());

    let err = decode_slice(Bytes::from(tiff)).unwrap_err();
    assert!(matches!(err, TiffError::BufferOverrun { .. }));
}

#[test]
fn test_unknown_compression_rejected() {
    let mut tiff = TiffBuilder::new(4, 4, vec![1u8; 16]).build();
    // Compression is entry 4, value at 8 + 2 + 3*12 + 8
    let at = 8 + 2 + 3 * 12 + 8;
    tiff[at..at + 4].copy_from_slice(&7u32.to_le_bytes());

    let err = decode_slice(Bytes::from(tiff)).unwrap_err();
    assert!(matches!(err, TiffError::UnsupportedFormat { .. }));
}

#[test]
fn test_sub_byte_samples_rejected() {
    let tiff = TiffBuilder::new(4, 4, vec![1u8; 16])
        .bits_per_sample(4)
        .build();

    let err = decode_slice(Bytes::from(tiff)).unwrap_err();
    assert!(matches!(err, TiffError::UnsupportedFormat { .. }));
}

#[test]
fn test_overflowing_dimensions_rejected() {
    let tiff = Bytes::from(
        TiffBuilder::new(u32::MAX, u32::MAX, vec![0u8; 16])
            .bits_per_sample(32)
            .samples_per_pixel(4)
            .rows_per_strip(1)
            .build(),
    );

    assert!(matches!(
        decode_slice(tiff.clone()),
        Err(TiffError::MalformedDirectory { .. })
    ));
    assert!(matches!(
        read_geometry(tiff),
        Err(TiffError::MalformedDirectory { .. })
    ));
}

#[test]
fn test_huge_image_from_tiny_file_rejected() {
    let tiff = TiffBuilder::new(1 << 20, 1 << 20, vec![0u8; 16])
        .bits_per_sample(32)
        .samples_per_pixel(64)
        .build();
    assert!(tiff.len() < 256);

    let err = decode_slice(Bytes::from(tiff)).unwrap_err();
    assert_eq!(
        err,
        TiffError::TruncatedImage {
            expected: 1 << 48,
            actual: 16
        }
    );
}
