use crate::decoder::{Decoder, Payload};
use crate::encoder::Encoder;
use crate::error::CodecError;
use crate::err_to_io_error;
use crate::load::LoadOutcome;
use image::{Rgba, RgbaImage};
use log::debug;
use std::io::{BufRead, Seek, Write};

pub const MIN_DIMENSION: u32 = 64;
pub const MAX_DIMENSION: u32 = 2048;
pub const DEFAULT_DIMENSION: u32 = 512;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

fn check_dimensions(width: u32, height: u32) -> Result<(), CodecError> {
    let range = MIN_DIMENSION..=MAX_DIMENSION;
    if range.contains(&width) && range.contains(&height) {
        Ok(())
    } else {
        Err(CodecError::InvalidDimensions { width, height })
    }
}

/// Canvas size, normally taken from the `w` and `h` query parameters.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
        }
    }
}

impl CanvasConfig {
    /// Reads `w` and `h` from a query string such as `?w=800&h=600`.
    /// Missing, malformed, zero or out-of-range values keep the default.
    pub fn from_query(query: &str) -> Self {
        let dimension = |key| {
            query_param(query, key)
                .and_then(parse_dimension)
                .unwrap_or(DEFAULT_DIMENSION)
        };

        Self {
            width: dimension("w"),
            height: dimension("h"),
        }
    }
}

fn parse_dimension(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value
        .parse::<u32>()
        .ok()
        .filter(|v| (MIN_DIMENSION..=MAX_DIMENSION).contains(v))
}

/// First value of `key` in a query string, without percent-decoding.
pub fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            Some((parts.next()?, parts.next().unwrap_or("")))
        })
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// The shared image carried in the `img` query parameter, if any.
pub fn image_param(query: &str) -> Option<&str> {
    query_param(query, "img").filter(|v| !v.is_empty())
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Pen {
    pub color: Rgba<u8>,
    pub width: u32,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            color: Rgba([0, 0, 0, 255]),
            width: 2,
        }
    }
}

/// A drawing session: the pixel buffer plus the current pen.
pub struct Canvas {
    image: RgbaImage,
    pen: Pen,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self, CodecError> {
        check_dimensions(width, height)?;
        Ok(Self {
            image: RgbaImage::from_pixel(width, height, WHITE),
            pen: Pen::default(),
        })
    }

    pub fn from_config(config: &CanvasConfig) -> Result<Self, CodecError> {
        Self::new(config.width, config.height)
    }

    pub fn from_png<R: BufRead + Seek>(input_image: R) -> Result<Self, std::io::Error> {
        match image::load(input_image, image::ImageFormat::Png) {
            Ok(img) => {
                let image = img.to_rgba8();
                check_dimensions(image.width(), image.height()).map_err(err_to_io_error)?;
                Ok(Self {
                    image,
                    pen: Pen::default(),
                })
            }
            Err(err) => Err(err_to_io_error(err)),
        }
    }

    pub fn write_png<W: Write>(&self, output: &mut W) -> Result<(), std::io::Error> {
        match image::DynamicImage::ImageRgba8(self.image.clone())
            .write_to(output, image::ImageFormat::Png)
        {
            Ok(_) => Ok(()),
            Err(err) => Err(err_to_io_error(err)),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pen(&self) -> Pen {
        self.pen
    }

    pub fn set_color(&mut self, r: u8, g: u8, b: u8) {
        self.pen.color = Rgba([r, g, b, 255]);
    }

    pub fn set_width(&mut self, width: u32) {
        self.pen.width = width;
    }

    pub fn clear(&mut self) {
        self.fill_with(WHITE);
    }

    /// Floods the whole canvas with the pen colour.
    pub fn fill(&mut self) {
        self.fill_with(self.pen.color);
    }

    fn fill_with(&mut self, color: Rgba<u8>) {
        for pixel in self.image.pixels_mut() {
            *pixel = color;
        }
    }

    /// Stamps a disc of radius `width / 2` centred on (x, y).
    pub fn draw_point(&mut self, x: i64, y: i64) {
        let r = i64::from(self.pen.width / 2);
        let (width, height) = (i64::from(self.width()), i64::from(self.height()));

        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let (px, py) = (x + dx, y + dy);
                if px >= 0 && px < width && py >= 0 && py < height {
                    self.image.put_pixel(px as u32, py as u32, self.pen.color);
                }
            }
        }
    }

    /// Bresenham walk from (x0, y0) to (x1, y1), both ends included.
    pub fn draw_line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64) {
        let (dx, dy) = ((x1 - x0).abs(), (y1 - y0).abs());
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx - dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            self.draw_point(x, y);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Replaces the canvas with a white one of the new size, keeping the old
    /// content centred when growing and anchored top-left when shrinking.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), CodecError> {
        check_dimensions(width, height)?;

        let old = std::mem::replace(&mut self.image, RgbaImage::from_pixel(width, height, WHITE));
        let offset_x = width.saturating_sub(old.width()) / 2;
        let offset_y = height.saturating_sub(old.height()) / 2;

        for (x, y, pixel) in old.enumerate_pixels() {
            let (dest_x, dest_y) = (x + offset_x, y + offset_y);
            if dest_x < width && dest_y < height {
                self.image.put_pixel(dest_x, dest_y, *pixel);
            }
        }

        debug!(
            "resized canvas {}x{} -> {}x{}",
            old.width(),
            old.height(),
            width,
            height
        );
        Ok(())
    }

    /// Link text for the current drawing, or an empty string when there is
    /// nothing on the canvas.
    pub fn export(&self, password: Option<&str>) -> Result<String, CodecError> {
        Encoder::new(password.map(str::to_string)).export(&self.image)
    }

    /// Loads link text onto the canvas. Sealed links report
    /// [`LoadOutcome::RequiresPassword`] and leave the canvas untouched.
    pub fn load(&mut self, text: &str) -> LoadOutcome {
        match Decoder::new().decode(text) {
            Ok(Payload::Plain(container)) => applied(container.apply_to(&mut self.image)),
            Ok(Payload::Sealed(_)) => LoadOutcome::RequiresPassword,
            Err(err) => LoadOutcome::Failed(err),
        }
    }

    /// Loads a sealed link. An unsealed link is refused and the canvas is
    /// left as it was.
    pub fn load_with_password(&mut self, text: &str, password: &str) -> LoadOutcome {
        match Decoder::new().decode_with_password(text, password) {
            Ok(container) => applied(container.apply_to(&mut self.image)),
            Err(CodecError::AuthenticationFailed) => LoadOutcome::WrongPassword,
            Err(err) => LoadOutcome::Failed(err),
        }
    }
}

fn applied(result: Result<(), CodecError>) -> LoadOutcome {
    match result {
        Ok(()) => LoadOutcome::Applied,
        Err(err) => LoadOutcome::Failed(err),
    }
}
