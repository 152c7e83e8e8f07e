use crate::bitplane;
use crate::cipher;
use crate::container::Container;
use crate::error::CodecError;
use crate::transport;
use crate::ContentBounds;
use image::RgbaImage;
use log::debug;

pub struct Encoder {
    password: Option<String>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Encoder {
    /// An empty password is treated the same as no password.
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }

    /// Crops `image` to its content and packs it into a container.
    pub fn encode_container(&self, image: &RgbaImage) -> Result<Container, CodecError> {
        let bounds = ContentBounds::of(image).ok_or(CodecError::NoContent)?;

        debug!(
            "content bounds: {:?} of {}x{} canvas",
            bounds,
            image.width(),
            image.height()
        );

        let planes = bitplane::pack(image, &bounds)?;
        Container::new(bounds, planes)
    }

    /// Runs the whole export pipeline and returns the link text.
    pub fn encode(&self, image: &RgbaImage) -> Result<String, CodecError> {
        let container = self.encode_container(image)?.encode()?;
        let payload = cipher::maybe_seal(container, self.password.as_deref())?;
        let text = transport::to_text(&payload);

        debug!(
            "encoded {} payload bytes as {} characters (sealed: {})",
            payload.len(),
            text.len(),
            cipher::is_sealed(&payload),
        );

        Ok(text)
    }

    /// Like [`Encoder::encode`], but a blank image yields an empty string.
    pub fn export(&self, image: &RgbaImage) -> Result<String, CodecError> {
        match self.encode(image) {
            Err(CodecError::NoContent) => Ok(String::new()),
            other => other,
        }
    }
}
