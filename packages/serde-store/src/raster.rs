//! Image codecs.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use stowage_core_store::{Error, Result, DEFAULT_JPEG_QUALITY};

/// The formats images are stored in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// File extension for member files, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    /// The format an extension asks for, if any. Case-insensitive.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }
}

/// Encodes images to bytes and back.
pub trait ImageCodec: Send + Sync {
    fn encode(&self, image: &DynamicImage, format: ImageFormat) -> Result<Bytes>;

    fn decode(&self, bytes: &Bytes) -> Result<DynamicImage>;

    /// Encode as PNG, falling back to JPEG when PNG fails.
    fn encode_any(&self, image: &DynamicImage) -> Result<(Bytes, ImageFormat)> {
        match self.encode(image, ImageFormat::Png) {
            Ok(bytes) => Ok((bytes, ImageFormat::Png)),
            Err(png_error) => {
                log::trace!("PNG encoding failed ({}), trying JPEG", png_error);
                self.encode(image, ImageFormat::Jpeg)
                    .map(|bytes| (bytes, ImageFormat::Jpeg))
            }
        }
    }
}

/// PNG and JPEG through the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct RasterCodec {
    /// 1 to 100.
    pub jpeg_quality: u8,
}

impl Default for RasterCodec {
    fn default() -> Self {
        RasterCodec {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl RasterCodec {
    pub fn with_jpeg_quality(jpeg_quality: u8) -> Self {
        RasterCodec {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }
}

impl ImageCodec for RasterCodec {
    fn encode(&self, image: &DynamicImage, format: ImageFormat) -> Result<Bytes> {
        let mut buf = Vec::new();
        let encoded = match format {
            ImageFormat::Png => image.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png),
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel.
                let rgb = image.to_rgb8();
                JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality.clamp(1, 100))
                    .encode_image(&rgb)
            }
        };
        encoded.map_err(|e| Error::serialization("image", e.to_string()))?;
        Ok(Bytes::from(buf))
    }

    fn decode(&self, bytes: &Bytes) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|e| Error::deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn checkerboard() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(8, 6, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 128])
            }
        }))
    }

    /// Refuses PNG so the fallback path can be observed.
    struct JpegOnly(RasterCodec);

    impl ImageCodec for JpegOnly {
        fn encode(&self, image: &DynamicImage, format: ImageFormat) -> Result<Bytes> {
            match format {
                ImageFormat::Png => Err(Error::serialization("image", "png disabled")),
                ImageFormat::Jpeg => self.0.encode(image, format),
            }
        }

        fn decode(&self, bytes: &Bytes) -> Result<DynamicImage> {
            self.0.decode(bytes)
        }
    }

    #[test]
    fn png_is_lossless() {
        let codec = RasterCodec::default();
        let original = checkerboard();
        let bytes = codec.encode(&original, ImageFormat::Png).unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded.to_rgba8(), original.to_rgba8());
    }

    #[test]
    fn jpeg_keeps_dimensions() {
        let codec = RasterCodec::with_jpeg_quality(80);
        let bytes = codec.encode(&checkerboard(), ImageFormat::Jpeg).unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
        assert_eq!(codec.decode(&bytes).unwrap().dimensions(), (8, 6));
    }

    #[test]
    fn encode_any_prefers_png() {
        let (bytes, format) = RasterCodec::default().encode_any(&checkerboard()).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);
    }

    #[test]
    fn encode_any_falls_back_to_jpeg() {
        let codec = JpegOnly(RasterCodec::default());
        let (bytes, format) = codec.encode_any(&checkerboard()).unwrap();
        assert_eq!(format, ImageFormat::Jpeg);
        assert_eq!(format.extension(), "jpg");
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn decoding_garbage_fails() {
        let result = RasterCodec::default().decode(&Bytes::from_static(b"{\"not\":\"an image\"}"));
        assert!(matches!(result, Err(Error::Deserialization { .. })));
    }

    #[test]
    fn extensions() {
        assert_eq!(ImageFormat::from_extension("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("gif"), None);
    }
}
