/// QR numeric transcoding for compact health card tokens
///
/// QR numeric mode packs decimal digits roughly twice as densely as the
/// byte mode a raw JWS would need, so the wire token is re-encoded as a
/// digit string before rendering. Every character of the compact token
/// alphabet sits in one contiguous code point range starting at '-', which
/// lets each character map to a two-digit decimal value.
use crate::error::{ShcError, ShcResult};

/// URI scheme prefix emitted by `pack` and accepted by `unpack`
const URI_SCHEME: &str = "shc";

/// Lowest code point used by the compact token alphabet ('-')
const SMALLEST_B64_CHAR_CODE: u32 = 45;

/// Highest two-digit value a token character may map to
const MAX_CHAR_VALUE: u32 = 89;

/// Re-encode a compact token as a scheme-prefixed decimal digit string
pub fn pack(token: &str) -> ShcResult<String> {
    let mut packed = String::with_capacity(URI_SCHEME.len() + 2 + token.len() * 2);
    packed.push_str(URI_SCHEME);
    packed.push_str(":/");

    for c in token.chars() {
        let code = c as u32;
        if code < SMALLEST_B64_CHAR_CODE || code > SMALLEST_B64_CHAR_CODE + MAX_CHAR_VALUE {
            return Err(ShcError::QrEncoding(format!(
                "Character '{}' is outside the token alphabet",
                c
            )));
        }
        let value = code - SMALLEST_B64_CHAR_CODE;
        packed.push_str(&format!("{:02}", value));
    }

    Ok(packed)
}

/// Recover a compact token from its QR digit string
///
/// Accepts the scheme marker in its legacy-compatible forms ("shc",
/// "shc:", "shc:/"), case-insensitive, as well as a bare digit string.
pub fn unpack(uri: &str) -> ShcResult<String> {
    let lowered = uri.to_lowercase();
    let mut data = lowered.as_str();

    // Backwards compatibility with older scheme spellings.
    if let Some(rest) = data.strip_prefix(URI_SCHEME) {
        data = rest;
        if let Some(rest) = data.strip_prefix(':') {
            data = rest;
        }
        if let Some(rest) = data.strip_prefix('/') {
            data = rest;
        }
    }

    if data.len() % 2 != 0 {
        return Err(ShcError::QrEncoding(format!(
            "Digit body has odd length {}",
            data.len()
        )));
    }

    let mut token = String::with_capacity(data.len() / 2);
    for pair in data.as_bytes().chunks(2) {
        let high = (pair[0] as char).to_digit(10);
        let low = (pair[1] as char).to_digit(10);
        let value = match (high, low) {
            (Some(h), Some(l)) => h * 10 + l,
            _ => {
                return Err(ShcError::QrEncoding(format!(
                    "Non-digit characters in pair '{}{}'",
                    pair[0] as char, pair[1] as char
                )));
            }
        };
        let c = char::from_u32(SMALLEST_B64_CHAR_CODE + value).ok_or_else(|| {
            ShcError::QrEncoding(format!("Digit pair {:02} maps to no character", value))
        })?;
        token.push(c);
    }

    Ok(token)
}
