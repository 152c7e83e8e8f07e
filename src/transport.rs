use crate::error::CodecError;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use log::debug;

// Decoders tolerate non-zero bits after the last full byte, as other
// base64 readers of these links do.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical)
        .with_decode_allow_trailing_bits(true),
);

pub fn to_text(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Accepts URL-safe base64 without padding, which is what [`to_text`]
/// writes, and falls back to standard padded base64.
pub fn from_text(text: &str) -> Result<Vec<u8>, CodecError> {
    if text.is_empty() {
        return Err(CodecError::DecodeError);
    }

    URL_SAFE_LENIENT
        .decode(text)
        .or_else(|err| {
            debug!("not url-safe base64 ({}), trying standard alphabet", err);
            STANDARD_LENIENT.decode(text)
        })
        .map_err(|err| {
            debug!("not standard base64 either: {}", err);
            CodecError::DecodeError
        })
}
