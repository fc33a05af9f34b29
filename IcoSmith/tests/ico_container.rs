//! Integration tests for the ICO container layout
//! Parses the produced bytes by hand and cross-checks with the image crate's ICO decoder

use byteorder::{LittleEndian, ReadBytesExt};
use icosmith::{encode_ico, ConversionRequest, Converter, ErrorKind, DEFAULT_SIZES};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

struct DirEntry {
    width: u8,
    height: u8,
    planes: u16,
    bit_count: u16,
    bytes_in_res: u32,
    image_offset: u32,
}

fn parse_directory(ico: &[u8]) -> (u16, u16, Vec<DirEntry>) {
    let mut cursor = Cursor::new(ico);
    let reserved = cursor.read_u16::<LittleEndian>().unwrap();
    let kind = cursor.read_u16::<LittleEndian>().unwrap();
    let count = cursor.read_u16::<LittleEndian>().unwrap();
    assert_eq!(reserved, 0);

    let entries = (0..count)
        .map(|_| {
            let width = cursor.read_u8().unwrap();
            let height = cursor.read_u8().unwrap();
            let _colors = cursor.read_u8().unwrap();
            let _reserved = cursor.read_u8().unwrap();
            DirEntry {
                width,
                height,
                planes: cursor.read_u16::<LittleEndian>().unwrap(),
                bit_count: cursor.read_u16::<LittleEndian>().unwrap(),
                bytes_in_res: cursor.read_u32::<LittleEndian>().unwrap(),
                image_offset: cursor.read_u32::<LittleEndian>().unwrap(),
            }
        })
        .collect();
    (kind, count, entries)
}

fn source_png() -> Vec<u8> {
    let img = RgbaImage::from_fn(320, 320, |x, y| {
        if x > 40 && x < 280 && y > 60 && y < 260 {
            Rgba([250, 200, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

#[test]
fn test_directory_matches_requested_sizes() {
    let request = ConversionRequest::new(source_png(), DEFAULT_SIZES);
    let output = Converter::new().convert(&request, |_| {}).unwrap();
    let ico = &output.ico;

    let (kind, count, entries) = parse_directory(ico);
    assert_eq!(kind, 1);
    assert_eq!(count as usize, DEFAULT_SIZES.len());

    let mut expected_offset = 6 + 16 * DEFAULT_SIZES.len();
    for (entry, &size) in entries.iter().zip(DEFAULT_SIZES.iter()) {
        let dim = if size == 256 { 0 } else { size as u8 };
        assert_eq!(entry.width, dim);
        assert_eq!(entry.height, dim);
        assert_eq!(entry.planes, 1);
        assert_eq!(entry.bit_count, 32);
        assert_eq!(entry.image_offset as usize, expected_offset);

        let start = entry.image_offset as usize;
        let end = start + entry.bytes_in_res as usize;
        assert!(end <= ico.len());
        assert_eq!(&ico[start..start + 8], PNG_SIGNATURE);
        expected_offset = end;
    }
    assert_eq!(expected_offset, ico.len());
}

#[test]
fn test_embedded_payloads_are_the_bitmap_pngs() {
    let request = ConversionRequest::new(source_png(), vec![48, 16]);
    let output = Converter::new().convert(&request, |_| {}).unwrap();
    let (_, _, entries) = parse_directory(&output.ico);

    for (entry, bitmap) in entries.iter().zip(&output.bitmaps) {
        let start = entry.image_offset as usize;
        let end = start + entry.bytes_in_res as usize;
        assert_eq!(&output.ico[start..end], bitmap.png());
    }
    assert_eq!(output.png_entries()[0].0, 48);
}

#[test]
fn test_image_crate_reads_the_container() {
    let request = ConversionRequest::new(source_png(), vec![16, 32, 256]);
    let output = Converter::new().convert(&request, |_| {}).unwrap();

    let decoded = image::load_from_memory_with_format(&output.ico, ImageFormat::Ico).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (256, 256));
}

#[test]
fn test_encode_ico_rejects_out_of_range_sizes() {
    let png = output_png();
    assert_eq!(
        encode_ico(&[(0, png.as_slice())]).unwrap_err().kind(),
        ErrorKind::Encoding
    );
    assert_eq!(
        encode_ico(&[(257, png.as_slice())]).unwrap_err().kind(),
        ErrorKind::Encoding
    );
    assert!(encode_ico(&[(256, png.as_slice())]).is_ok());
}

fn output_png() -> Vec<u8> {
    let request = ConversionRequest::new(source_png(), vec![16]);
    let output = Converter::new().convert(&request, |_| {}).unwrap();
    output.bitmaps[0].png().to_vec()
}
