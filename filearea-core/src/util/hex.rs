use crate::error::{FileAreaError, Result};

pub fn parse_hex_array<const N: usize>(hex_str: &str) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    let bytes = hex::decode(hex_str.trim())
        .map_err(|e| FileAreaError::Format(format!("invalid hex: {e}")))?;
    if bytes.len() != N {
        return Err(FileAreaError::Format(format!(
            "expected {N} bytes ({} hex chars), got {}",
            N * 2,
            bytes.len()
        )));
    }
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(parse_hex_array::<4>("00112233").is_ok());
        assert!(parse_hex_array::<4>("001122").is_err());
        assert!(parse_hex_array::<4>("zz112233").is_err());
    }
}
