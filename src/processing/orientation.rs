use std::borrow::Cow;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::RgbaImage;
use image::imageops::{flip_horizontal, flip_vertical, rotate90, rotate180, rotate270};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Stored orientation of a photo, as recorded by the EXIF orientation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Normal,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Transpose,
    Rotate90,
    Transverse,
    Rotate270,
}

impl Orientation {
    pub fn from_exif(value: u32) -> Option<Self> {
        Some(match value {
            1 => Self::Normal,
            2 => Self::FlipHorizontal,
            3 => Self::Rotate180,
            4 => Self::FlipVertical,
            5 => Self::Transpose,
            6 => Self::Rotate90,
            7 => Self::Transverse,
            8 => Self::Rotate270,
            _ => return None,
        })
    }

    pub fn is_canonical(self) -> bool {
        self == Self::Normal
    }

    /// Whether upright width and height are the stored height and width.
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Self::Transpose | Self::Rotate90 | Self::Transverse | Self::Rotate270
        )
    }
}

/// A decoded photo together with its stored orientation.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: RgbaImage,
    orientation: Orientation,
}

impl SourceImage {
    pub fn new(pixels: RgbaImage, orientation: Orientation) -> Self {
        Self {
            pixels,
            orientation,
        }
    }

    pub fn upright(pixels: RgbaImage) -> Self {
        Self::new(pixels, Orientation::Normal)
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Logical (upright) dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        let (w, h) = self.pixels.dimensions();
        if self.orientation.swaps_axes() {
            (h, w)
        } else {
            (w, h)
        }
    }
}

/// Returns the photo in canonical orientation.
///
/// Already-upright photos are borrowed as is. If the upright buffer cannot be
/// produced the stored buffer is returned unrotated.
pub fn normalize(source: &SourceImage) -> Cow<'_, RgbaImage> {
    if source.orientation.is_canonical() {
        return Cow::Borrowed(&source.pixels);
    }
    match render_upright(&source.pixels, source.orientation) {
        Ok(upright) if upright.dimensions() == source.dimensions() => Cow::Owned(upright),
        Ok(upright) => {
            warn!(
                orientation = ?source.orientation,
                got = ?upright.dimensions(),
                expected = ?source.dimensions(),
                "upright render has unexpected size; keeping stored orientation"
            );
            Cow::Borrowed(&source.pixels)
        }
        Err(err) => {
            warn!(orientation = ?source.orientation, "{err}; keeping stored orientation");
            Cow::Borrowed(&source.pixels)
        }
    }
}

fn render_upright(pixels: &RgbaImage, orientation: Orientation) -> Result<RgbaImage> {
    let (width, height) = pixels.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::EmptyImage { width, height });
    }
    let upright = match orientation {
        Orientation::Normal => pixels.clone(),
        Orientation::FlipHorizontal => flip_horizontal(pixels),
        Orientation::Rotate180 => rotate180(pixels),
        Orientation::FlipVertical => flip_vertical(pixels),
        // transpose: rotate90 + flip_horizontal
        Orientation::Transpose => flip_horizontal(&rotate90(pixels)),
        Orientation::Rotate90 => rotate90(pixels),
        // transverse: rotate270 + flip_horizontal
        Orientation::Transverse => flip_horizontal(&rotate270(pixels)),
        Orientation::Rotate270 => rotate270(pixels),
    };
    Ok(upright)
}

/// Decodes a photo to RGBA8 and records its EXIF orientation if available.
///
/// Missing or unreadable metadata means the photo is taken as upright.
pub fn load_source_image(path: &Path) -> Result<SourceImage> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .to_rgba8();
    let orientation = match read_orientation(path) {
        Some(value) => Orientation::from_exif(value).unwrap_or_else(|| {
            warn!(value, path = %path.display(), "unknown exif orientation");
            Orientation::Normal
        }),
        None => Orientation::Normal,
    };
    Ok(SourceImage::new(img, orientation))
}

fn read_orientation(path: &Path) -> Option<u32> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let value = field.value.get_uint(0)?;
    debug!("exif orientation {} for {}", value, path.display());
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn marked(width: u32, height: u32) -> RgbaImage {
        // Top-left pixel is red, everything else black.
        RgbaImage::from_fn(width, height, |x, y| {
            if x == 0 && y == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
    }

    #[test]
    fn canonical_orientation_is_borrowed() {
        let source = SourceImage::upright(marked(3, 2));
        let out = normalize(&source);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert!(std::ptr::eq(out.as_ref(), source.pixels()));
    }

    #[test]
    fn rotate90_swaps_dimensions() {
        let source = SourceImage::new(marked(3, 2), Orientation::Rotate90);
        assert_eq!(source.dimensions(), (2, 3));
        let out = normalize(&source);
        assert!(matches!(out, Cow::Owned(_)));
        assert_eq!(out.dimensions(), (2, 3));
        // Clockwise rotation moves the top-left corner to the top-right.
        assert_eq!(out.get_pixel(1, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn rotate180_moves_marker_to_bottom_right() {
        let source = SourceImage::new(marked(3, 2), Orientation::Rotate180);
        let out = normalize(&source);
        assert_eq!(out.dimensions(), (3, 2));
        assert_eq!(out.get_pixel(2, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn transpose_keeps_marker_at_origin() {
        let source = SourceImage::new(marked(4, 2), Orientation::Transpose);
        let out = normalize(&source);
        assert_eq!(out.dimensions(), (2, 4));
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn empty_buffer_falls_back_to_original() {
        let source = SourceImage::new(RgbaImage::new(0, 0), Orientation::Rotate270);
        let out = normalize(&source);
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn exif_values_outside_range_are_unknown() {
        assert_eq!(Orientation::from_exif(0), None);
        assert_eq!(Orientation::from_exif(9), None);
        assert_eq!(Orientation::from_exif(6), Some(Orientation::Rotate90));
    }
}
