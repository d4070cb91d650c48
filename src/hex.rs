//! Hex helpers for EUIs, keys and modem payload arguments.

use crate::error::{NodeError, Result};

/// Encode bytes as uppercase hex
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Decode a fixed-length hex string (case-insensitive)
///
/// # Errors
///
/// Returns [`NodeError::Config`] if the string has the wrong length or
/// contains a non-hex character.
pub fn parse_hex<const N: usize>(name: &str, text: &str) -> Result<[u8; N]> {
    let text = text.trim();
    if text.len() != N * 2 {
        return Err(NodeError::Config(format!(
            "{} must be {} hex characters, got {}",
            name,
            N * 2,
            text.len()
        )));
    }

    let mut out = [0u8; N];
    for (i, byte) in out.iter_mut().enumerate() {
        let pair = text.get(i * 2..i * 2 + 2).ok_or_else(|| {
            NodeError::Config(format!("{} contains a non-ASCII character", name))
        })?;
        if !pair.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(NodeError::Config(format!("{} is not valid hex: {:?}", name, pair)));
        }
        *byte = u8::from_str_radix(pair, 16)
            .map_err(|_| NodeError::Config(format!("{} is not valid hex: {:?}", name, pair)))?;
    }
    Ok(out)
}
