//! Binary envelope around the three compressed planes.
//!
//! ```text
//! offset_x u16 | offset_y u16 | width u16 | height u16
//! r_len u32 | r bytes | g_len u32 | g bytes | b_len u32 | b bytes
//! ```
//!
//! All integers are little-endian.

use crate::bitplane::{self, plane_len, BitPlanes};
use crate::compress;
use crate::error::CodecError;
use crate::{ContainerHeader, ContentBounds, HEADER_LENGTH};
use image::{Rgba, RgbaImage};
use log::debug;
use std::convert::{TryFrom, TryInto};

const LENGTH_PREFIX: usize = 4;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Container {
    header: ContainerHeader,
    planes: BitPlanes,
}

impl Container {
    pub fn new(bounds: ContentBounds, planes: BitPlanes) -> Result<Self, CodecError> {
        let header = ContainerHeader::try_from(bounds)?;

        let expected = plane_len(bounds.width, bounds.height);
        if planes.channels().iter().any(|plane| plane.len() != expected) {
            return Err(CodecError::InvalidDimensions {
                width: bounds.width,
                height: bounds.height,
            });
        }

        Ok(Self { header, planes })
    }

    pub fn header(&self) -> ContainerHeader {
        self.header
    }

    pub fn bounds(&self) -> ContentBounds {
        self.header.into()
    }

    pub fn planes(&self) -> &BitPlanes {
        &self.planes
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let raw_header: [u8; HEADER_LENGTH] = self.header.into();
        let mut out: Vec<u8> = raw_header.to_vec();

        for plane in self.planes.channels().iter() {
            let compressed = compress::compress(plane).map_err(|err| {
                debug!("plane failed to deflate: {}", err);
                CodecError::CorruptStream
            })?;
            let len = u32::try_from(compressed.len()).map_err(|_| {
                CodecError::InvalidDimensions {
                    width: u32::from(self.header.width),
                    height: u32::from(self.header.height),
                }
            })?;

            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&compressed);
        }

        debug!("encoded container: {:?}, {} bytes", self.header, out.len());

        Ok(out)
    }

    /// Parses a container. Any declared length that runs past the end of
    /// `data` fails with [`CodecError::TruncatedContainer`]; bytes after the
    /// blue plane are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let mut reader = SliceReader::new(data);

        let raw_header: [u8; HEADER_LENGTH] = reader
            .take(HEADER_LENGTH)?
            .try_into()
            .map_err(|_| CodecError::CorruptStream)?;
        let header = ContainerHeader::from(raw_header);

        debug!("decoded header: {:?}", header);

        let expected = plane_len(u32::from(header.width), u32::from(header.height));
        let mut read_plane = || -> Result<Vec<u8>, CodecError> {
            let len = reader.take_u32()? as usize;
            let plane = compress::decompress(reader.take(len)?, expected)?;
            if plane.len() < expected {
                debug!("plane inflated to {} of {} bytes", plane.len(), expected);
                return Err(CodecError::CorruptStream);
            }
            Ok(plane)
        };

        let r = read_plane()?;
        let g = read_plane()?;
        let b = read_plane()?;

        if reader.remaining() > 0 {
            debug!("ignoring {} trailing bytes", reader.remaining());
        }

        Ok(Self {
            header,
            planes: BitPlanes { r, g, b },
        })
    }

    /// Region this container describes, as opaque pixels.
    pub fn to_image(&self) -> Result<RgbaImage, CodecError> {
        bitplane::unpack(
            &self.planes,
            u32::from(self.header.width),
            u32::from(self.header.height),
        )
    }

    /// Clears `target` to white, then draws the region at its stored offset.
    /// Only the part of the region that overlaps `target` is visited, so the
    /// cost follows the target size rather than the declared region size.
    pub fn apply_to(&self, target: &mut RgbaImage) -> Result<(), CodecError> {
        let bounds = self.bounds();
        if !bitplane::covers(&self.planes, bounds.width, bounds.height) {
            return Err(CodecError::CorruptStream);
        }

        for pixel in target.pixels_mut() {
            *pixel = Rgba([255, 255, 255, 255]);
        }

        let visible_width = target.width().saturating_sub(bounds.min_x).min(bounds.width);
        let visible_height = target.height().saturating_sub(bounds.min_y).min(bounds.height);

        for y in 0..visible_height {
            let row = y as usize * bounds.width as usize;
            for x in 0..visible_width {
                let pixel = bitplane::pixel_at(&self.planes, row + x as usize);
                target.put_pixel(bounds.min_x + x, bounds.min_y + y, pixel);
            }
        }

        Ok(())
    }
}

/// Bounds-checked cursor over the container bytes.
struct SliceReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> SliceReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if len > self.remaining() {
            return Err(CodecError::TruncatedContainer {
                offset: self.offset,
                needed: len,
                available: self.remaining(),
            });
        }

        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn take_u32(&mut self) -> Result<u32, CodecError> {
        let raw = self.take(LENGTH_PREFIX)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Container {
        let planes = BitPlanes {
            r: vec![0b1000_0000, 0],
            g: vec![0, 0b0000_0001],
            b: vec![0xFF, 0xFF],
        };
        Container::new(ContentBounds::new(5, 7, 4, 4), planes).expect("no error")
    }

    fn segment_lengths(data: &[u8]) -> Vec<usize> {
        let mut lengths = Vec::new();
        let mut offset = HEADER_LENGTH;
        while offset < data.len() {
            let len = u32::from_le_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ]) as usize;
            lengths.push(len);
            offset += LENGTH_PREFIX + len;
        }
        lengths
    }

    #[test]
    fn test_encode_layout() {
        let data = sample().encode().expect("no error");

        assert_eq!(&[5u8, 0, 7, 0, 4, 0, 4, 0], &data[..HEADER_LENGTH]);

        let lengths = segment_lengths(&data);
        assert_eq!(3, lengths.len());
        assert_eq!(
            data.len(),
            HEADER_LENGTH + 3 * LENGTH_PREFIX + lengths.iter().sum::<usize>()
        );
    }

    #[test]
    fn test_encode_decode() {
        let container = sample();
        let data = container.encode().expect("no error");
        let decoded = Container::decode(&data).expect("no error");

        assert_eq!(container, decoded);
        assert_eq!(ContentBounds::new(5, 7, 4, 4), decoded.bounds());
    }

    #[test]
    fn test_reencode_is_byte_identical() {
        let data = sample().encode().expect("no error");
        let again = Container::decode(&data)
            .expect("no error")
            .encode()
            .expect("no error");

        assert_eq!(data, again);
    }

    #[test]
    fn test_new_rejects_mismatched_planes() {
        let planes = BitPlanes {
            r: vec![0; 2],
            g: vec![0; 2],
            b: vec![0; 1],
        };
        assert!(Container::new(ContentBounds::new(0, 0, 4, 4), planes).is_err());
    }

    #[test]
    fn test_decode_short_header() {
        assert_eq!(
            Err(CodecError::TruncatedContainer {
                offset: 0,
                needed: HEADER_LENGTH,
                available: 5
            }),
            Container::decode(&[1, 2, 3, 4, 5])
        );
    }

    #[test]
    fn test_decode_missing_last_segment() {
        let data = sample().encode().expect("no error");
        let lengths = segment_lengths(&data);
        let without_blue = data.len() - LENGTH_PREFIX - lengths[2];

        for cut in &[without_blue, data.len() - 1, without_blue + 2] {
            match Container::decode(&data[..*cut]) {
                Err(CodecError::TruncatedContainer { .. }) => {}
                other => panic!("cut at {}: unexpected {:?}", cut, other),
            }
        }
    }

    #[test]
    fn test_decode_oversized_length() {
        let mut data = vec![0, 0, 0, 0, 1, 0, 1, 0];
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        data.extend_from_slice(&[0x03, 0x00]);

        match Container::decode(&data) {
            Err(CodecError::TruncatedContainer {
                offset, available, ..
            }) => {
                assert_eq!(12, offset);
                assert_eq!(2, available);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_corrupt_plane() {
        let mut data = vec![0, 0, 0, 0, 4, 0, 4, 0];
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&[0xFF, 0xFF, 0xFF]);

        assert_eq!(Err(CodecError::CorruptStream), Container::decode(&data));
    }

    #[test]
    fn test_decode_short_plane() {
        let mut data = vec![0, 0, 0, 0, 8, 0, 8, 0];
        for _ in 0..3 {
            let compressed = compress::compress(&[0; 2]).expect("no error");
            data.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
            data.extend_from_slice(&compressed);
        }

        assert_eq!(Err(CodecError::CorruptStream), Container::decode(&data));
    }

    #[test]
    fn test_apply_wide_region_to_small_target() {
        let (width, height) = (4000, 3);
        let mut r = vec![0; plane_len(width, height)];
        // region pixel (1, 2)
        r[1000] = 0b0100_0000;
        let planes = BitPlanes {
            g: vec![0; r.len()],
            b: vec![0; r.len()],
            r,
        };
        let container =
            Container::new(ContentBounds::new(10, 20, width, height), planes).expect("no error");

        let mut target = RgbaImage::from_pixel(64, 64, Rgba([9, 9, 9, 255]));
        container.apply_to(&mut target).expect("no error");

        assert_eq!(&Rgba([255, 255, 255, 255]), target.get_pixel(5, 5));
        assert_eq!(&Rgba([0, 0, 0, 255]), target.get_pixel(10, 20));
        assert_eq!(&Rgba([255, 0, 0, 255]), target.get_pixel(11, 22));
        assert_eq!(&Rgba([0, 0, 0, 255]), target.get_pixel(63, 22));
        assert_eq!(&Rgba([255, 255, 255, 255]), target.get_pixel(63, 23));
    }

    #[test]
    fn test_apply_region_outside_target() {
        let planes = BitPlanes {
            r: vec![0; 2],
            g: vec![0; 2],
            b: vec![0; 2],
        };
        let container =
            Container::new(ContentBounds::new(100, 100, 4, 4), planes).expect("no error");

        let mut target = RgbaImage::from_pixel(64, 64, Rgba([9, 9, 9, 255]));
        container.apply_to(&mut target).expect("no error");

        assert!(target.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn test_apply_short_plane_leaves_target() {
        let container = Container {
            header: ContainerHeader {
                offset_x: 0,
                offset_y: 0,
                width: 4,
                height: 4,
            },
            planes: BitPlanes {
                r: vec![0; 2],
                g: vec![0; 1],
                b: vec![0; 2],
            },
        };

        let mut target = RgbaImage::from_pixel(64, 64, Rgba([9, 9, 9, 255]));
        assert_eq!(Err(CodecError::CorruptStream), container.apply_to(&mut target));
        assert_eq!(&Rgba([9, 9, 9, 255]), target.get_pixel(0, 0));
    }

    #[test]
    fn test_apply_clears_and_clips() {
        let mut target = RgbaImage::from_pixel(7, 9, Rgba([9, 9, 9, 255]));
        sample().apply_to(&mut target).expect("no error");

        assert_eq!(&Rgba([255, 255, 255, 255]), target.get_pixel(0, 0));
        assert_eq!(&Rgba([255, 255, 255, 255]), target.get_pixel(4, 8));
        assert_eq!(&Rgba([255, 0, 255, 255]), target.get_pixel(5, 7));
        assert_eq!(&Rgba([0, 0, 255, 255]), target.get_pixel(6, 7));
        assert_eq!(&Rgba([0, 0, 255, 255]), target.get_pixel(6, 8));
    }
}
