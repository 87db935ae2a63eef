//! # Rendering
//!
//! Adapter over the `qrcode` symbol encoder and the `image` codecs.
//!
//! ## Contract
//! - Input: text, normalized [`RenderOptions`], an [`OutputFormat`]
//! - Output: [`RenderedImage`] holding the encoded payload, its labels and a
//!   suggested filename
//! - Failure: [`RenderError`] when the encoder rejects the text, usually
//!   because it does not fit the chosen error-correction level
//!
//! ## Raster layout
//! The symbol is drawn with a quiet zone of `margin` modules on each side and
//! scaled to exactly `size` x `size` pixels. If `size` is smaller than the
//! module count the image is grown to one pixel per module.
//!
//! ## Vector layout
//! SVG output is produced by the encoder's own renderer. It uses its fixed
//! quiet zone and rounds up to the next whole module size.
use std::{fmt, io::Cursor, num::ParseIntError, str::FromStr, sync::LazyLock};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use qrcode::{EcLevel, QrCode, render::svg};
use regex::Regex;
use serde::{Serialize, Serializer};
use thiserror::Error;

pub const DEFAULT_SIZE: u32 = 300;
pub const DEFAULT_MARGIN: u32 = 2;

static HEX_COLOR: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^#?([0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
});

/// Invalid user-supplied rendering inputs.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum OptionsError {
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Invalid error correction level: {0}. Supported levels: L, M, Q, H")]
    InvalidErrorCorrection(String),

    #[error("Unsupported format: {0}. Supported formats: {formats}", formats = OutputFormat::SUPPORTED)]
    UnsupportedFormat(String),

    #[error("Size must be between 1 and {max}")]
    InvalidSize { max: u32 },
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{reason} (error correction level {level})")]
    Symbol {
        level: ErrorCorrection,
        reason: String,
    },

    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::opaque(0, 0, 0);
    pub const WHITE: Color = Color::opaque(0xFF, 0xFF, 0xFF);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    fn rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl FromStr for Color {
    type Err = OptionsError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || OptionsError::InvalidColor(input.to_string());

        let matches = HEX_COLOR
            .as_ref()
            .map(|re| re.is_match(input))
            .unwrap_or(false);
        if !matches {
            return Err(invalid());
        }

        parse_hex(input.trim_start_matches('#')).map_err(|_| invalid())
    }
}

fn parse_hex(hex: &str) -> Result<Color, ParseIntError> {
    let expanded: String = match hex.len() {
        3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
        _ => hex.to_string(),
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i * 2..i * 2 + 2], 16);

    Ok(Color {
        r: channel(0)?,
        g: channel(1)?,
        b: channel(2)?,
        a: if expanded.len() == 8 { channel(3)? } else { 0xFF },
    })
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 0xFF {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorCorrection {
    Low,
    #[default]
    Medium,
    Quartile,
    High,
}

impl ErrorCorrection {
    pub fn letter(self) -> &'static str {
        match self {
            ErrorCorrection::Low => "L",
            ErrorCorrection::Medium => "M",
            ErrorCorrection::Quartile => "Q",
            ErrorCorrection::High => "H",
        }
    }

    fn ec_level(self) -> EcLevel {
        match self {
            ErrorCorrection::Low => EcLevel::L,
            ErrorCorrection::Medium => EcLevel::M,
            ErrorCorrection::Quartile => EcLevel::Q,
            ErrorCorrection::High => EcLevel::H,
        }
    }
}

impl FromStr for ErrorCorrection {
    type Err = OptionsError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(ErrorCorrection::Low),
            "m" | "medium" => Ok(ErrorCorrection::Medium),
            "q" | "quartile" => Ok(ErrorCorrection::Quartile),
            "h" | "high" => Ok(ErrorCorrection::High),
            _ => Err(OptionsError::InvalidErrorCorrection(input.to_string())),
        }
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

impl Serialize for ErrorCorrection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.letter())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    pub size: u32,
    #[serde(rename = "color")]
    pub foreground: Color,
    #[serde(rename = "backgroundColor")]
    pub background: Color,
    pub error_correction: ErrorCorrection,
    #[serde(skip)]
    pub margin: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            foreground: Color::BLACK,
            background: Color::WHITE,
            error_correction: ErrorCorrection::default(),
            margin: DEFAULT_MARGIN,
        }
    }
}

/// Formats a caller may ask for.
///
/// `Pdf` is a label only: its payload is the PNG encoding, served under the
/// `application/pdf` content type and a `.pdf` filename. Consumers expecting
/// a real PDF document will not get one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Svg,
    Pdf,
}

/// Byte encodings actually produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Encoding {
    Png,
    Jpeg,
    Svg,
}

impl OutputFormat {
    pub const SUPPORTED: &'static str = "png, jpeg, jpg, svg, pdf";

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Svg => "svg",
            OutputFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Svg => "image/svg+xml",
            OutputFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Svg => "svg",
            OutputFormat::Pdf => "pdf",
        }
    }

    fn encoding(self) -> Encoding {
        match self {
            OutputFormat::Png => Encoding::Png,
            OutputFormat::Jpeg => Encoding::Jpeg,
            OutputFormat::Svg => Encoding::Svg,
            // no PDF writer, degrade to PNG bytes
            OutputFormat::Pdf => Encoding::Png,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = OptionsError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "svg" => Ok(OutputFormat::Svg),
            "pdf" => Ok(OutputFormat::Pdf),
            _ => Err(OptionsError::UnsupportedFormat(input.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct RenderedImage {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl RenderedImage {
    fn new(format: OutputFormat, bytes: Vec<u8>) -> Self {
        let filename = format!(
            "qr-code-{}.{}",
            Utc::now().timestamp_millis(),
            format.extension()
        );

        Self {
            format,
            bytes,
            filename,
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type(),
            STANDARD.encode(&self.bytes)
        )
    }
}

pub fn render(
    text: &str,
    options: &RenderOptions,
    format: OutputFormat,
) -> Result<RenderedImage, RenderError> {
    let code = encode_symbol(text, options.error_correction)?;

    let bytes = match format.encoding() {
        Encoding::Png => write_raster(&code, options, ImageFormat::Png)?,
        Encoding::Jpeg => write_raster(&code, options, ImageFormat::Jpeg)?,
        Encoding::Svg => write_svg(&code, options).into_bytes(),
    };

    Ok(RenderedImage::new(format, bytes))
}

fn encode_symbol(text: &str, level: ErrorCorrection) -> Result<QrCode, RenderError> {
    QrCode::with_error_correction_level(text.as_bytes(), level.ec_level()).map_err(|e| {
        RenderError::Symbol {
            level,
            reason: e.to_string(),
        }
    })
}

fn raster(code: &QrCode, options: &RenderOptions) -> RgbaImage {
    let modules = code.width() as u64;
    let margin = options.margin as u64;
    let total = modules + margin * 2;
    let pixels = (options.size as u64).max(total);

    let colors = code.to_colors();
    let dark = options.foreground.rgba();
    let light = options.background.rgba();

    let module_at = |px: u32| -> Option<u64> {
        let m = px as u64 * total / pixels;
        (m >= margin && m < margin + modules).then(|| m - margin)
    };

    RgbaImage::from_fn(pixels as u32, pixels as u32, |x, y| {
        match (module_at(x), module_at(y)) {
            (Some(mx), Some(my)) => match colors[(my * modules + mx) as usize] {
                qrcode::Color::Dark => dark,
                qrcode::Color::Light => light,
            },
            _ => light,
        }
    })
}

fn write_raster(
    code: &QrCode,
    options: &RenderOptions,
    format: ImageFormat,
) -> Result<Vec<u8>, RenderError> {
    let image = DynamicImage::ImageRgba8(raster(code, options));

    // JPEG has no alpha channel
    let image = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    };

    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format)?;

    Ok(bytes)
}

fn write_svg(code: &QrCode, options: &RenderOptions) -> String {
    let dark = options.foreground.to_string();
    let light = options.background.to_string();

    code.render::<svg::Color>()
        .min_dimensions(options.size, options.size)
        .dark_color(svg::Color(&dark))
        .light_color(svg::Color(&light))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 4] = [0x89, b'P', b'N', b'G'];
    const JPEG_MAGIC: [u8; 2] = [0xFF, 0xD8];

    #[test]
    fn test_color_parsing() {
        assert_eq!("#000000".parse::<Color>(), Ok(Color::BLACK));
        assert_eq!("#fff".parse::<Color>(), Ok(Color::WHITE));
        assert_eq!("FF0000".parse::<Color>(), Ok(Color::opaque(0xFF, 0, 0)));
        assert_eq!(
            "#11223380".parse::<Color>(),
            Ok(Color {
                r: 0x11,
                g: 0x22,
                b: 0x33,
                a: 0x80
            })
        );
        assert_eq!(
            "#1234".parse::<Color>(),
            Ok(Color {
                r: 0x11,
                g: 0x22,
                b: 0x33,
                a: 0x44
            })
        );
    }

    #[test]
    fn test_invalid_colors() {
        for input in ["", "#", "red", "#12345", "#GGGGGG", "#1234567890", "rgb(0,0,0)"] {
            assert_eq!(
                input.parse::<Color>(),
                Err(OptionsError::InvalidColor(input.to_string())),
                "{input:?}"
            );
        }
    }

    #[test]
    fn test_color_display_normalizes() {
        assert_eq!("#abc".parse::<Color>().map(|c| c.to_string()), Ok("#AABBCC".to_string()));
        assert_eq!(
            "#aabbcc7f".parse::<Color>().map(|c| c.to_string()),
            Ok("#AABBCC7F".to_string())
        );
    }

    #[test]
    fn test_error_correction_names() {
        assert_eq!("L".parse::<ErrorCorrection>(), Ok(ErrorCorrection::Low));
        assert_eq!("m".parse::<ErrorCorrection>(), Ok(ErrorCorrection::Medium));
        assert_eq!("Quartile".parse::<ErrorCorrection>(), Ok(ErrorCorrection::Quartile));
        assert_eq!("high".parse::<ErrorCorrection>(), Ok(ErrorCorrection::High));
        assert!("X".parse::<ErrorCorrection>().is_err());
        assert_eq!(ErrorCorrection::default().to_string(), "M");
    }

    #[test]
    fn test_format_names() {
        assert_eq!("png".parse::<OutputFormat>(), Ok(OutputFormat::Png));
        assert_eq!("JPG".parse::<OutputFormat>(), Ok(OutputFormat::Jpeg));
        assert_eq!("jpeg".parse::<OutputFormat>(), Ok(OutputFormat::Jpeg));
        assert_eq!("svg".parse::<OutputFormat>(), Ok(OutputFormat::Svg));
        assert_eq!("pdf".parse::<OutputFormat>(), Ok(OutputFormat::Pdf));
    }

    #[test]
    fn test_unsupported_format_lists_supported() {
        let err = "xyz".parse::<OutputFormat>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported format: xyz. Supported formats: png, jpeg, jpg, svg, pdf"
        );
    }

    #[test]
    fn test_png_exact_size() {
        let options = RenderOptions::default();
        let image = render("https://example.com", &options, OutputFormat::Png).unwrap();
        assert_eq!(&image.bytes[..4], &PNG_MAGIC);
        assert_eq!(image.content_type(), "image/png");

        let decoded = image::load_from_memory(&image.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (300, 300));
    }

    #[test]
    fn test_small_size_grows_to_module_count() {
        let options = RenderOptions {
            size: 1,
            ..RenderOptions::default()
        };
        let image = render("hello", &options, OutputFormat::Png).unwrap();
        let decoded = image::load_from_memory(&image.bytes).unwrap();

        // version 1 symbol is 21 modules, plus two margins of 2
        assert_eq!(decoded.width(), 25);
        assert_eq!(decoded.height(), 25);
    }

    #[test]
    fn test_raster_uses_colors() {
        let options = RenderOptions {
            foreground: Color::opaque(0xFF, 0, 0),
            background: Color::opaque(0, 0, 0xFF),
            ..RenderOptions::default()
        };
        let code = encode_symbol("hello", options.error_correction).unwrap();
        let image = raster(&code, &options);

        // corner is quiet zone, the finder pattern starts right after it
        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 0xFF, 0xFF]));
        assert_eq!(image.get_pixel(30, 30), &Rgba([0xFF, 0, 0, 0xFF]));
    }

    #[test]
    fn test_jpeg_payload() {
        let image = render("hello", &RenderOptions::default(), OutputFormat::Jpeg).unwrap();
        assert_eq!(&image.bytes[..2], &JPEG_MAGIC);
        assert!(image.data_uri().starts_with("data:image/jpeg;base64,"));
        assert!(image.filename.ends_with(".jpg"));
    }

    #[test]
    fn test_svg_payload() {
        let options = RenderOptions {
            foreground: Color::opaque(0x12, 0x34, 0x56),
            ..RenderOptions::default()
        };
        let image = render("hello", &options, OutputFormat::Svg).unwrap();
        let svg = String::from_utf8(image.bytes.clone()).unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains("#123456"));
        assert_eq!(image.content_type(), "image/svg+xml");
    }

    #[test]
    fn test_pdf_is_png_labelled_pdf() {
        let image = render("hello", &RenderOptions::default(), OutputFormat::Pdf).unwrap();

        assert_eq!(&image.bytes[..4], &PNG_MAGIC);
        assert_eq!(image.content_type(), "application/pdf");
        assert!(image.data_uri().starts_with("data:application/pdf;base64,iVBORw0KGgo"));
        assert!(image.filename.starts_with("qr-code-"));
        assert!(image.filename.ends_with(".pdf"));
    }

    #[test]
    fn test_text_too_long() {
        let text = "x".repeat(3000);
        let options = RenderOptions {
            error_correction: ErrorCorrection::High,
            ..RenderOptions::default()
        };

        let err = render(&text, &options, OutputFormat::Png).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Symbol {
                level: ErrorCorrection::High,
                ..
            }
        ));
    }

    #[test]
    fn test_options_serialize() {
        let json = serde_json::to_value(RenderOptions::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "size": 300,
                "color": "#000000",
                "backgroundColor": "#FFFFFF",
                "errorCorrection": "M"
            })
        );
    }
}
