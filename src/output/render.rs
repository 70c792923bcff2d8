//! Presentation of captured output.

/// Line printed before the raw output.
pub const HEADER: &str = "Output of command:\n";

/// Header followed by the raw captured bytes.
pub fn render(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER.len() + bytes.len());
    out.extend_from_slice(HEADER.as_bytes());
    out.extend_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prefixes_header() {
        assert_eq!(render(b"hi\n"), b"Output of command:\nhi\n");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(b""), HEADER.as_bytes());
    }

    #[test]
    fn test_render_keeps_raw_bytes() {
        let raw = [0xff, 0x00, b'\r', b'\n'];
        assert!(render(&raw).ends_with(&raw));
    }
}
