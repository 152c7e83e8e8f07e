use crate::cipher;
use crate::container::Container;
use crate::error::CodecError;
use crate::transport;
use log::debug;

/// Result of reading link text: either a container that is ready to use, or
/// a sealed payload waiting for a password.
#[derive(Debug)]
pub enum Payload {
    Plain(Container),
    Sealed(SealedPayload),
}

/// Encrypted bytes with the marker already stripped.
#[derive(Debug, Clone)]
pub struct SealedPayload {
    data: Vec<u8>,
}

impl SealedPayload {
    /// Decrypts and parses the container. Can be called again with another
    /// password after an [`CodecError::AuthenticationFailed`].
    pub fn unlock(&self, password: &str) -> Result<Container, CodecError> {
        let plaintext = cipher::open(&self.data, password)?;
        debug!("unlocked {} byte container", plaintext.len());
        Container::decode(&plaintext)
    }
}

pub struct Decoder {}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self {}
    }

    pub fn decode(&self, text: &str) -> Result<Payload, CodecError> {
        let data = transport::from_text(text)?;
        self.decode_bytes(&data)
    }

    /// Branches on the marker: sealed bytes are kept for [`SealedPayload::unlock`],
    /// anything else must parse as a container.
    pub fn decode_bytes(&self, data: &[u8]) -> Result<Payload, CodecError> {
        match cipher::strip_marker(data) {
            Some(sealed) => {
                debug!("payload is sealed ({} bytes)", sealed.len());
                Ok(Payload::Sealed(SealedPayload {
                    data: sealed.to_vec(),
                }))
            }
            None => Container::decode(data).map(Payload::Plain),
        }
    }

    /// One-shot decode for callers that already have the password.
    /// An unsealed payload fails with [`CodecError::DecodeError`], the same
    /// way [`crate::Loader::submit_password`] does when nothing is locked.
    pub fn decode_with_password(
        &self,
        text: &str,
        password: &str,
    ) -> Result<Container, CodecError> {
        match self.decode(text)? {
            Payload::Plain(_) => {
                debug!("password given for a payload that is not sealed");
                Err(CodecError::DecodeError)
            }
            Payload::Sealed(sealed) => sealed.unlock(password),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use image::{Rgba, RgbaImage};

    fn sketch() -> RgbaImage {
        let mut image = RgbaImage::from_pixel(64, 64, Rgba([255, 255, 255, 255]));
        for i in 5..25 {
            image.put_pixel(i, i, Rgba([0, 0, 255, 255]));
        }
        image
    }

    #[test]
    fn test_decode_plain() {
        let text = Encoder::default().encode(&sketch()).expect("no error");

        match Decoder::new().decode(&text).expect("no error") {
            Payload::Plain(container) => {
                assert_eq!(crate::ContentBounds::new(3, 3, 24, 24), container.bounds())
            }
            Payload::Sealed(_) => panic!("payload should not be sealed"),
        }
    }

    #[test]
    fn test_decode_sealed_retry() {
        let text = Encoder::new(Some("right".to_string()))
            .encode(&sketch())
            .expect("no error");

        let sealed = match Decoder::new().decode(&text).expect("no error") {
            Payload::Sealed(sealed) => sealed,
            Payload::Plain(_) => panic!("payload should be sealed"),
        };

        assert_eq!(
            Some(CodecError::AuthenticationFailed),
            sealed.unlock("wrong").err()
        );
        assert!(sealed.unlock("right").is_ok());
    }

    #[test]
    fn test_decode_with_password() {
        let decoder = Decoder::new();
        let plain = Encoder::default().encode(&sketch()).expect("no error");
        let sealed = Encoder::new(Some("pw".to_string()))
            .encode(&sketch())
            .expect("no error");

        assert_eq!(
            Some(CodecError::DecodeError),
            decoder.decode_with_password(&plain, "pw").err()
        );

        let expected = match decoder.decode(&plain).expect("no error") {
            Payload::Plain(container) => container,
            Payload::Sealed(_) => panic!("payload should not be sealed"),
        };
        let unlocked = decoder.decode_with_password(&sealed, "pw").expect("no error");
        assert_eq!(expected, unlocked);
    }

    #[test]
    fn test_decode_bad_text() {
        assert_eq!(
            Some(CodecError::DecodeError),
            Decoder::new().decode("not base64!").err()
        );
    }

    #[test]
    fn test_decode_truncated_container() {
        let text = transport::to_text(&[1, 0, 1, 0, 4, 0]);
        match Decoder::new().decode(&text) {
            Err(CodecError::TruncatedContainer { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bare_marker_is_sealed() {
        match Decoder::new().decode_bytes(b"ENC:") {
            Ok(Payload::Sealed(sealed)) => assert_eq!(
                Some(CodecError::AuthenticationFailed),
                sealed.unlock("anything").err()
            ),
            other => panic!("unexpected {:?}", other),
        }
    }
}
