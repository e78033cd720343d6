//! Heuristic text/binary classification of imported content.

/// Probes the first bytes of a file's content to decide whether it can be
/// shown as text. Empty files count as text; a null byte or invalid UTF-8
/// in the probe window means binary.
pub fn is_text_content(bytes: &[u8]) -> bool {
    const PROBE_SIZE: usize = 1024;

    if bytes.is_empty() {
        return true;
    }

    let window = &bytes[..bytes.len().min(PROBE_SIZE)];
    if window.contains(&0) {
        return false;
    }

    match std::str::from_utf8(window) {
        Ok(_) => true,
        // The probe may cut a multi-byte sequence at the window edge;
        // only treat it as binary when the error is not at the boundary.
        Err(e) => e.valid_up_to() + 4 > window.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_plain_text_are_text() {
        assert!(is_text_content(b""));
        assert!(is_text_content(b"fn main() {}\n"));
        assert!(is_text_content("größe – ünïcode".as_bytes()));
    }

    #[test]
    fn null_bytes_mean_binary() {
        assert!(!is_text_content(&[0x7f, b'E', b'L', b'F', 0, 0, 1]));
    }

    #[test]
    fn invalid_utf8_means_binary() {
        assert!(!is_text_content(&[0xff, 0xfe, 0x12, 0x34]));
    }

    #[test]
    fn multibyte_sequence_cut_at_the_probe_edge_is_still_text() {
        let mut bytes = vec![b'a'; 1023];
        bytes.extend_from_slice("é".as_bytes());
        bytes.extend_from_slice("more text".as_bytes());
        assert!(is_text_content(&bytes));
    }
}
