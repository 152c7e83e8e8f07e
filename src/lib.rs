//! Share small raster sketches inside a URL.
//!
//! An image is cropped to its content, binarized into one bit per channel,
//! deflated plane by plane, wrapped in a tiny little-endian container,
//! optionally sealed with AES-256-GCM under a password, and finally written
//! as URL-safe base64. [`encoder::Encoder`] and [`decoder::Decoder`] run the
//! two directions; [`canvas::Canvas`] is a drawing session built on top.

pub mod bitplane;
pub mod canvas;
pub mod cipher;
pub mod compress;
pub mod container;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod load;
pub mod transport;

pub use canvas::{Canvas, CanvasConfig, Pen};
pub use container::Container;
pub use decoder::{Decoder, Payload, SealedPayload};
pub use encoder::Encoder;
pub use error::CodecError;
pub use load::{LoadOutcome, LoadState, Loader};

use image::RgbaImage;
use std::convert::TryFrom;

pub const HEADER_LENGTH: usize = 8;

/// White margin kept around the content when cropping.
pub const CONTENT_MARGIN: u32 = 2;

const WHITE: [u8; 3] = [255, 255, 255];

/// Region of a canvas that an export covers.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ContentBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub width: u32,
    pub height: u32,
}

impl ContentBounds {
    pub fn new(min_x: u32, min_y: u32, width: u32, height: u32) -> Self {
        Self {
            min_x,
            min_y,
            width,
            height,
        }
    }

    /// Smallest rectangle holding every pixel whose colour is not pure white,
    /// grown by [`CONTENT_MARGIN`] and clamped to the image. Alpha is ignored.
    /// Returns `None` for a blank image.
    pub fn of(image: &RgbaImage) -> Option<Self> {
        let mut extent: Option<(u32, u32, u32, u32)> = None;

        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel.0[..3] == WHITE {
                continue;
            }
            extent = Some(match extent {
                None => (x, y, x, y),
                Some((min_x, min_y, max_x, max_y)) => {
                    (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
                }
            });
        }

        let (min_x, min_y, max_x, max_y) = extent?;
        let min_x = min_x.saturating_sub(CONTENT_MARGIN);
        let min_y = min_y.saturating_sub(CONTENT_MARGIN);
        let max_x = (max_x + CONTENT_MARGIN).min(image.width() - 1);
        let max_y = (max_y + CONTENT_MARGIN).min(image.height() - 1);

        Some(Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn fits_within(&self, image: &RgbaImage) -> bool {
        u64::from(self.min_x) + u64::from(self.width) <= u64::from(image.width())
            && u64::from(self.min_y) + u64::from(self.height) <= u64::from(image.height())
    }
}

/// Fixed 8-byte prefix of every container: offset and size of the encoded
/// region, each a little-endian u16.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ContainerHeader {
    pub offset_x: u16,
    pub offset_y: u16,
    pub width: u16,
    pub height: u16,
}

impl TryFrom<ContentBounds> for ContainerHeader {
    type Error = CodecError;

    fn try_from(bounds: ContentBounds) -> Result<Self, Self::Error> {
        let invalid = || CodecError::InvalidDimensions {
            width: bounds.width,
            height: bounds.height,
        };

        Ok(ContainerHeader {
            offset_x: u16::try_from(bounds.min_x).map_err(|_| invalid())?,
            offset_y: u16::try_from(bounds.min_y).map_err(|_| invalid())?,
            width: u16::try_from(bounds.width).map_err(|_| invalid())?,
            height: u16::try_from(bounds.height).map_err(|_| invalid())?,
        })
    }
}

impl From<ContainerHeader> for ContentBounds {
    fn from(header: ContainerHeader) -> Self {
        ContentBounds::new(
            u32::from(header.offset_x),
            u32::from(header.offset_y),
            u32::from(header.width),
            u32::from(header.height),
        )
    }
}

impl From<[u8; HEADER_LENGTH]> for ContainerHeader {
    fn from(data: [u8; HEADER_LENGTH]) -> Self {
        ContainerHeader {
            offset_x: u16::from_le_bytes([data[0], data[1]]),
            offset_y: u16::from_le_bytes([data[2], data[3]]),
            width: u16::from_le_bytes([data[4], data[5]]),
            height: u16::from_le_bytes([data[6], data[7]]),
        }
    }
}

impl From<ContainerHeader> for [u8; HEADER_LENGTH] {
    fn from(header: ContainerHeader) -> Self {
        let mut raw: [u8; HEADER_LENGTH] = [0; HEADER_LENGTH];
        raw[0..2].copy_from_slice(&header.offset_x.to_le_bytes());
        raw[2..4].copy_from_slice(&header.offset_y.to_le_bytes());
        raw[4..6].copy_from_slice(&header.width.to_le_bytes());
        raw[6..8].copy_from_slice(&header.height.to_le_bytes());
        raw
    }
}

fn err_to_io_error<E>(error: E) -> std::io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    std::io::Error::new(std::io::ErrorKind::Other, error.into())
}
