//! Minimal SSE framing: event boundary detection and `data:` extraction.
//!
//! The backend separates events with a blank line (LF or CRLF) and carries
//! one JSON document per event in `data:` lines. Multi-line data is joined
//! with `\n` per the SSE spec.

/// Find the earliest event boundary in `buffer`.
///
/// Returns `(position, delimiter_len)` for `\n\n` or `\r\n\r\n`.
fn event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n");
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n");
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a <= b { (a, 2) } else { (b, 4) }),
        (Some(a), None) => Some((a, 2)),
        (None, Some(b)) => Some((b, 4)),
        (None, None) => None,
    }
}

/// Remove and return the next complete event from the front of `buffer`.
pub(crate) fn next_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let (pos, delim_len) = event_boundary(buffer)?;
    let event = buffer[..pos].to_vec();
    buffer.drain(..pos + delim_len);
    Some(event)
}

/// Extract the joined `data:` payload from one raw event.
pub(crate) fn data_payload(event: &str) -> Option<String> {
    let mut data = String::new();
    let mut found = false;

    for line in event.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(mut rest) = line.strip_prefix("data:") {
            if let Some(stripped) = rest.strip_prefix(' ') {
                rest = stripped;
            }
            if found {
                data.push('\n');
            }
            data.push_str(rest);
            found = true;
        }
    }

    if found { Some(data) } else { None }
}

#[cfg(test)]
mod tests {
    use super::{data_payload, event_boundary, next_event};

    #[test]
    fn boundary_prefers_earliest_delimiter() {
        assert_eq!(event_boundary(b"a\n\nb\r\n\r\n"), Some((1, 2)));
        assert_eq!(event_boundary(b"a\r\n\r\nb\n\n"), Some((1, 4)));
        assert_eq!(event_boundary(b"no delimiter yet\n"), None);
        assert_eq!(event_boundary(b""), None);
    }

    #[test]
    fn next_event_drains_sequentially() {
        let mut buffer = b"data: one\n\ndata: two\n\npartial".to_vec();
        assert_eq!(next_event(&mut buffer), Some(b"data: one".to_vec()));
        assert_eq!(next_event(&mut buffer), Some(b"data: two".to_vec()));
        assert_eq!(next_event(&mut buffer), None);
        assert_eq!(buffer, b"partial");
    }

    #[test]
    fn next_event_handles_crlf_framing() {
        let mut buffer = b"data: win\r\n\r\nrest".to_vec();
        assert_eq!(next_event(&mut buffer), Some(b"data: win".to_vec()));
        assert_eq!(buffer, b"rest");
    }

    #[test]
    fn data_payload_joins_multiline_and_skips_fields() {
        let event = "id: 7\ndata: {\"a\":\ndata: 1}\nretry: 500";
        assert_eq!(data_payload(event), Some("{\"a\":\n1}".to_string()));
    }

    #[test]
    fn data_payload_without_data_lines_is_none() {
        assert_eq!(data_payload("event: ping\nid: 3"), None);
    }

    #[test]
    fn data_payload_tolerates_missing_space() {
        assert_eq!(data_payload("data:x"), Some("x".to_string()));
    }
}
