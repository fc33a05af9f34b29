//! Source format detection using magic headers (file signatures)
//!
//! The decoder routes vector input by content, not by the declared MIME type,
//! so a mislabelled SVG still reaches the SVG rasterizer and a PNG declared as
//! `image/svg+xml` is still decoded as a PNG.
//!
//! ## Recognized Signatures
//!
//! - **PNG**: `89 50 4E 47 0D 0A 1A 0A`
//! - **JPEG**: `FF D8 FF`
//! - **GIF**: `47 49 46 38` (GIF87a/GIF89a)
//! - **BMP**: `42 4D`, with a known DIB header size (12, 40, 52, 56, 64, 108
//!   or 124) at offset 14
//! - **TIFF**: `49 49 2A 00` or `4D 4D 00 2A`
//! - **ICO**: `00 00 01 00`
//! - **WebP**: `RIFF .... WEBP`
//! - **SVG**: optional BOM/whitespace, then `<svg`, or an XML prolog /
//!   comment / doctype followed by an `<svg` element within the first 4 KiB

use byteorder::{ByteOrder, LittleEndian};

/// Represents a detected source format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Ico,
    WebP,
    Svg,
}

impl SourceFormat {
    /// Get format name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Gif => "GIF",
            Self::Bmp => "BMP",
            Self::Tiff => "TIFF",
            Self::Ico => "ICO",
            Self::WebP => "WebP",
            Self::Svg => "SVG",
        }
    }

    /// Map a declared MIME type onto a format, if it names one we decode.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" | "image/apng" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/bmp" => Some(Self::Bmp),
            "image/tiff" => Some(Self::Tiff),
            "image/x-icon" | "image/vnd.microsoft.icon" => Some(Self::Ico),
            "image/webp" => Some(Self::WebP),
            "image/svg+xml" => Some(Self::Svg),
            _ => None,
        }
    }

    /// The raster codec `image` should use, `None` for vector input.
    pub fn raster_format(&self) -> Option<image::ImageFormat> {
        match self {
            Self::Png => Some(image::ImageFormat::Png),
            Self::Jpeg => Some(image::ImageFormat::Jpeg),
            Self::Gif => Some(image::ImageFormat::Gif),
            Self::Bmp => Some(image::ImageFormat::Bmp),
            Self::Tiff => Some(image::ImageFormat::Tiff),
            Self::Ico => Some(image::ImageFormat::Ico),
            Self::WebP => Some(image::ImageFormat::WebP),
            Self::Svg => None,
        }
    }
}

const SVG_SCAN_LIMIT: usize = 4096;

/// BITMAPFILEHEADER length; the DIB header size follows it.
const BMP_FILE_HEADER_LEN: usize = 14;

/// Sizes of the BITMAPCOREHEADER .. BITMAPV5HEADER variants.
const DIB_HEADER_SIZES: [u32; 7] = [12, 40, 52, 56, 64, 108, 124];

fn has_dib_header(data: &[u8]) -> bool {
    data.len() >= BMP_FILE_HEADER_LEN + 4
        && DIB_HEADER_SIZES.contains(&LittleEndian::read_u32(&data[BMP_FILE_HEADER_LEN..]))
}

/// Detect source format from magic bytes
///
/// Returns `None` when nothing matches; the decoder then falls back to the
/// declared MIME type or to `image`'s own guessing.
pub fn detect_source_format(data: &[u8]) -> Option<SourceFormat> {
    match data {
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(SourceFormat::Png),
        [0xFF, 0xD8, 0xFF, ..] => Some(SourceFormat::Jpeg),
        [b'G', b'I', b'F', b'8', ..] => Some(SourceFormat::Gif),
        [b'B', b'M', ..] if has_dib_header(data) => Some(SourceFormat::Bmp),
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Some(SourceFormat::Tiff),
        [0x00, 0x00, 0x01, 0x00, ..] => Some(SourceFormat::Ico),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(SourceFormat::WebP),
        _ if looks_like_svg(data) => Some(SourceFormat::Svg),
        _ => None,
    }
}

fn looks_like_svg(data: &[u8]) -> bool {
    let head = &data[..data.len().min(SVG_SCAN_LIMIT)];
    let head = head.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(head);
    let start = match head.iter().position(|b| !b.is_ascii_whitespace()) {
        Some(start) => start,
        None => return false,
    };
    let head = &head[start..];
    if head.starts_with(b"<svg") {
        return true;
    }
    // Prolog, comment or doctype first: the root element must still be <svg.
    let preamble = head.starts_with(b"<?xml") || head.starts_with(b"<!--") || head.starts_with(b"<!DOCTYPE");
    preamble && head.windows(4).any(|w| w == b"<svg")
}

/// Short label for error messages: the detected format or the leading bytes.
pub fn describe(data: &[u8]) -> String {
    match detect_source_format(data) {
        Some(format) => format.as_str().to_string(),
        None if data.is_empty() => "empty input".to_string(),
        None => format!(
            "unrecognized data (first bytes: {:02X?})",
            &data[..data.len().min(8)]
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    const GIF_HEADER: &[u8] = b"GIF89a\x01\x00\x01\x00";
    const BMP_HEADER: &[u8] = &[
        0x42, 0x4D, 0x46, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x36, 0x00, 0x00, 0x00,
        0x28, 0x00, 0x00, 0x00,
    ];
    const TIFF_HEADER_LE: &[u8] = &[0x49, 0x49, 0x2A, 0x00, 0x08, 0x00];
    const TIFF_HEADER_BE: &[u8] = &[0x4D, 0x4D, 0x00, 0x2A, 0x00, 0x08];
    const ICO_HEADER: &[u8] = &[0x00, 0x00, 0x01, 0x00, 0x01, 0x00];
    const WEBP_HEADER: &[u8] = b"RIFF\x00\x00\x00\x00WEBPVP8 ";

    #[test]
    fn test_detect_raster_signatures() {
        assert_eq!(detect_source_format(PNG_HEADER), Some(SourceFormat::Png));
        assert_eq!(detect_source_format(JPEG_HEADER), Some(SourceFormat::Jpeg));
        assert_eq!(detect_source_format(GIF_HEADER), Some(SourceFormat::Gif));
        assert_eq!(detect_source_format(BMP_HEADER), Some(SourceFormat::Bmp));
        assert_eq!(detect_source_format(TIFF_HEADER_LE), Some(SourceFormat::Tiff));
        assert_eq!(detect_source_format(TIFF_HEADER_BE), Some(SourceFormat::Tiff));
        assert_eq!(detect_source_format(ICO_HEADER), Some(SourceFormat::Ico));
        assert_eq!(detect_source_format(WEBP_HEADER), Some(SourceFormat::WebP));
    }

    #[test]
    fn test_bm_prefix_alone_is_not_bmp() {
        assert_eq!(detect_source_format(b"BM"), None);
        assert_eq!(detect_source_format(b"BMP is a bitmap format, not this text"), None);
        // Full file header but an unknown DIB header size
        let mut bogus = BMP_HEADER.to_vec();
        bogus[14] = 0x29;
        assert_eq!(detect_source_format(&bogus), None);
    }

    #[test]
    fn test_encoded_bmp_is_detected() {
        let img = image::RgbaImage::from_pixel(3, 3, image::Rgba([1, 2, 3, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Bmp).unwrap();
        assert_eq!(detect_source_format(out.get_ref()), Some(SourceFormat::Bmp));
    }

    #[test]
    fn test_detect_bare_svg() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"/>"#;
        assert_eq!(detect_source_format(svg), Some(SourceFormat::Svg));
    }

    #[test]
    fn test_detect_svg_with_prolog_and_bom() {
        let mut svg = vec![0xEF, 0xBB, 0xBF];
        svg.extend_from_slice(b"\n  <?xml version=\"1.0\"?>\n<!-- logo -->\n<svg width=\"4\"/>");
        assert_eq!(detect_source_format(&svg), Some(SourceFormat::Svg));
    }

    #[test]
    fn test_xml_without_svg_root_is_unknown() {
        let xml = b"<?xml version=\"1.0\"?><html><body/></html>";
        assert_eq!(detect_source_format(xml), None);
    }

    #[test]
    fn test_unrecognized_and_empty() {
        assert_eq!(detect_source_format(b"This is not an image file"), None);
        assert_eq!(detect_source_format(&[]), None);
        assert_eq!(detect_source_format(&[0xFF, 0xD8]), None);
    }

    #[test]
    fn test_from_mime_type() {
        assert_eq!(SourceFormat::from_mime_type("image/png"), Some(SourceFormat::Png));
        assert_eq!(SourceFormat::from_mime_type("IMAGE/JPG"), Some(SourceFormat::Jpeg));
        assert_eq!(
            SourceFormat::from_mime_type("image/svg+xml; charset=utf-8"),
            Some(SourceFormat::Svg)
        );
        assert_eq!(
            SourceFormat::from_mime_type("image/vnd.microsoft.icon"),
            Some(SourceFormat::Ico)
        );
        assert_eq!(SourceFormat::from_mime_type("text/plain"), None);
    }

    #[test]
    fn test_svg_has_no_raster_codec() {
        assert!(SourceFormat::Svg.raster_format().is_none());
        assert_eq!(SourceFormat::Png.raster_format(), Some(image::ImageFormat::Png));
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(PNG_HEADER), "PNG");
        assert_eq!(describe(&[]), "empty input");
        assert!(describe(b"garbage!!").starts_with("unrecognized data"));
    }
}
