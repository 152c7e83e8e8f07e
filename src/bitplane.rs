use crate::error::CodecError;
use crate::ContentBounds;
use image::{ImageBuffer, Rgba, RgbaImage};

/// Channel values strictly above this become a set bit.
pub const THRESHOLD: u8 = 128;

/// One bit per pixel for each of the R, G and B channels, row-major and
/// most-significant bit first. The last byte is zero-padded.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BitPlanes {
    pub r: Vec<u8>,
    pub g: Vec<u8>,
    pub b: Vec<u8>,
}

impl BitPlanes {
    pub fn channels(&self) -> [&[u8]; 3] {
        [&self.r, &self.g, &self.b]
    }
}

/// Bytes needed to hold one plane of `width * height` bits.
pub fn plane_len(width: u32, height: u32) -> usize {
    (width as usize * height as usize + 7) / 8
}

fn binarize(value: u8) -> bool {
    value > THRESHOLD
}

fn bit_position(index: usize) -> (usize, u8) {
    (index / 8, 0x80 >> (index % 8))
}

/// Opaque pixel for the `index`th bit. Callers make sure the planes are long
/// enough.
pub(crate) fn pixel_at(planes: &BitPlanes, index: usize) -> Rgba<u8> {
    let (byte_idx, mask) = bit_position(index);
    let level = |plane: &[u8]| if plane[byte_idx] & mask != 0 { 255 } else { 0 };
    Rgba([level(&planes.r), level(&planes.g), level(&planes.b), 255])
}

/// Whether every plane holds at least `width * height` bits.
pub(crate) fn covers(planes: &BitPlanes, width: u32, height: u32) -> bool {
    let len = plane_len(width, height);
    planes.channels().iter().all(|plane| plane.len() >= len)
}

pub fn pack(image: &RgbaImage, bounds: &ContentBounds) -> Result<BitPlanes, CodecError> {
    if !bounds.fits_within(image) {
        return Err(CodecError::InvalidDimensions {
            width: bounds.width,
            height: bounds.height,
        });
    }

    let len = plane_len(bounds.width, bounds.height);
    let mut planes = BitPlanes {
        r: vec![0; len],
        g: vec![0; len],
        b: vec![0; len],
    };

    let mut bit_idx = 0;
    for y in bounds.min_y..bounds.min_y + bounds.height {
        for x in bounds.min_x..bounds.min_x + bounds.width {
            let Rgba([r, g, b, _]) = *image.get_pixel(x, y);
            let (byte_idx, mask) = bit_position(bit_idx);

            if binarize(r) {
                planes.r[byte_idx] |= mask;
            }
            if binarize(g) {
                planes.g[byte_idx] |= mask;
            }
            if binarize(b) {
                planes.b[byte_idx] |= mask;
            }

            bit_idx += 1;
        }
    }

    Ok(planes)
}

/// Rebuilds the opaque region described by `planes`. A set bit becomes 255,
/// a clear bit 0.
pub fn unpack(planes: &BitPlanes, width: u32, height: u32) -> Result<RgbaImage, CodecError> {
    if !covers(planes, width, height) {
        return Err(CodecError::CorruptStream);
    }

    Ok(ImageBuffer::from_fn(width, height, |x, y| {
        pixel_at(planes, y as usize * width as usize + x as usize)
    }))
}
