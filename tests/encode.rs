extern crate mockexe;

use mockexe::{Dib, RasterImage, Rgba16};

//===========================================================================//

const WHITE: Rgba16 = Rgba16::opaque8(0xff, 0xff, 0xff);
const BLACK: Rgba16 = Rgba16::opaque8(0, 0, 0);

fn solid(width: u32, height: u32, color: Rgba16) -> RasterImage {
    let num_pixels = (width * height) as usize;
    RasterImage::from_rgba16(width, height, vec![color; num_pixels])
}

fn indexed(width: u32, height: u32, num_colors: usize) -> RasterImage {
    let palette: Vec<Rgba16> = (0..num_colors)
        .map(|index| Rgba16::opaque8(index as u8, 0x80, 0xff - index as u8))
        .collect();
    let indices = (0..(width * height) as usize)
        .map(|index| (index % num_colors) as u8)
        .collect();
    RasterImage::from_indexed(width, height, palette, indices)
}

fn stride(width: usize, bits_per_pixel: usize) -> usize {
    ((width * bits_per_pixel + 31) & !31) / 8
}

// An image of the given width that classifies at the given depth.
fn image_for_depth(
    width: u32,
    height: u32,
    bits_per_pixel: u16,
) -> RasterImage {
    match bits_per_pixel {
        1 => indexed(width, height, 2),
        4 => indexed(width, height, 16),
        8 => indexed(width, height, 200),
        16 | 24 => solid(width, height, Rgba16::opaque8(10, 20, 30)),
        _ => solid(width, height, Rgba16::new(0x1000, 0x2000, 0x3000, 0x8000)),
    }
}

//===========================================================================//

#[test]
fn two_color_16x16_is_176_bytes() {
    let image = indexed(16, 16, 2);
    let mask = solid(16, 16, WHITE);
    let dib = Dib::encode(&image, &mask, 1).unwrap();
    assert_eq!(dib.bits_per_pixel(), 1);
    assert_eq!(dib.num_colors(), 2);
    assert_eq!(dib.size(), 40 + 8 + 64 + 64);
    assert_eq!(dib.data().len(), 176);
}

#[test]
fn opaque_8x8_at_24bpp() {
    let image = solid(8, 8, Rgba16::opaque8(0x11, 0x22, 0x33));
    let mask = solid(8, 8, WHITE);
    let dib = Dib::encode(&image, &mask, 24).unwrap();
    assert_eq!(dib.size(), 40 + 24 * 8 + 4 * 8);
    let pixels = &dib.data()[40..40 + 24 * 8];
    for row in pixels.chunks(24) {
        assert_eq!(&row[..3], b"\x33\x22\x11");
    }
    let mask_plane = &dib.data()[40 + 24 * 8..];
    for row in mask_plane.chunks(4) {
        assert_eq!(row, b"\xff\x00\x00\x00");
    }
}

#[test]
fn size_matches_layout_for_every_depth() {
    for &bits_per_pixel in &[1u16, 4, 8, 16, 24, 32] {
        for &(width, height) in &[(1, 1), (3, 2), (7, 5), (16, 16), (33, 4)] {
            let image = image_for_depth(width, height, bits_per_pixel);
            let mask = solid(width, height, BLACK);
            let dib = Dib::encode(&image, &mask, bits_per_pixel).unwrap();
            let palette_len = 4 * image.palette().map_or(0, |p| p.len());
            let expected = 40
                + palette_len
                + stride(width as usize, bits_per_pixel as usize)
                    * height as usize
                + stride(width as usize, 1) * height as usize;
            assert_eq!(
                dib.size(),
                expected,
                "{}x{} at {} bpp",
                width,
                height,
                bits_per_pixel
            );
            // The BITMAPINFOHEADER reports the doubled height.
            let header = &dib.data()[..40];
            assert_eq!(header[8..12], (2 * height as i32).to_le_bytes());
            assert_eq!(header[14..16], bits_per_pixel.to_le_bytes());
        }
    }
}

#[test]
fn mask_ignores_color_depth() {
    let mut mask_pixels = Vec::new();
    for index in 0..9 {
        mask_pixels.push(if index % 3 == 0 { WHITE } else { BLACK });
    }
    let mask = RasterImage::from_rgba16(9, 1, mask_pixels);
    let mut planes = Vec::new();
    for &bits_per_pixel in &[1u16, 4, 8, 24, 32] {
        let image = image_for_depth(9, 1, bits_per_pixel);
        let dib = Dib::encode(&image, &mask, bits_per_pixel).unwrap();
        let data = dib.data();
        planes.push(data[data.len() - 4..].to_vec());
    }
    for plane in planes.iter() {
        assert_eq!(plane.as_slice(), b"\x92\x00\x00\x00");
    }
}

#[test]
fn unused_trailing_bits_are_zero() {
    // Every pixel uses the last palette entry, so all used bits are set.
    let palette = vec![BLACK, WHITE];
    let image = RasterImage::from_indexed(5, 1, palette, vec![1; 5]);
    let dib = Dib::encode(&image, &solid(5, 1, WHITE), 1).unwrap();
    assert_eq!(&dib.data()[48..52], b"\xf8\x00\x00\x00");
    assert_eq!(&dib.data()[52..56], b"\xf8\x00\x00\x00");

    let palette = vec![BLACK; 16];
    let image = RasterImage::from_indexed(3, 1, palette, vec![15; 3]);
    let dib = Dib::encode(&image, &solid(3, 1, BLACK), 4).unwrap();
    assert_eq!(&dib.data()[104..108], b"\xff\xf0\x00\x00");
}

#[test]
fn palette_is_bgr0_truncated_to_8_bits() {
    let palette = vec![
        Rgba16::new(0x12ff, 0x3400, 0x56aa, 0xffff),
        Rgba16::new(0xffff, 0x0000, 0x00ff, 0xffff),
        BLACK,
    ];
    let image = RasterImage::from_indexed(1, 1, palette, vec![2]);
    let dib = Dib::encode(&image, &solid(1, 1, BLACK), 4).unwrap();
    assert_eq!(
        &dib.data()[40..52],
        b"\x56\x34\x12\x00\x00\x00\xff\x00\x00\x00\x00\x00"
    );
}

#[test]
fn depth_must_match_classification() {
    // A 32-color palette classifies at 8 bpp.
    let image = indexed(4, 4, 32);
    let mask = solid(4, 4, WHITE);
    assert_eq!(Dib::encode(&image, &mask, 8).unwrap().bits_per_pixel(), 8);
    let error = Dib::encode(&image, &mask, 4).unwrap_err();
    assert_eq!(error.kind(), std::io::ErrorKind::InvalidInput);
    assert!(error.to_string().contains("Expected 4 bits per pixel"));

    // Any transparency forces 32 bpp.
    let mut pixels = vec![WHITE; 16];
    pixels[5] = Rgba16::new(0, 0, 0, 0xfffe);
    let image = RasterImage::from_rgba16(4, 4, pixels);
    assert!(Dib::encode(&image, &mask, 24).is_err());
    assert!(Dib::encode(&image, &mask, 16).is_err());
    assert_eq!(Dib::encode(&image, &mask, 32).unwrap().bits_per_pixel(), 32);
}

#[test]
fn encoding_is_deterministic() {
    for &bits_per_pixel in &[1u16, 4, 8, 16, 24, 32] {
        let image = image_for_depth(13, 7, bits_per_pixel);
        let mask = solid(13, 7, WHITE);
        let first = Dib::encode(&image, &mask, bits_per_pixel).unwrap();
        let second = Dib::encode(&image, &mask, bits_per_pixel).unwrap();
        assert_eq!(first.data(), second.data());
    }
}

//===========================================================================//
