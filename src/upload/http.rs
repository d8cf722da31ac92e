use core::fmt::{self, Write};

pub const API_KEY_HEADER: &str = "x-functions-key";

pub fn write_request_head<W: Write>(
    out: &mut W,
    host: &str,
    path: &str,
    api_key: Option<&str>,
    content_length: usize,
) -> fmt::Result {
    write!(out, "POST {} HTTP/1.1\r\nHost: {}\r\n", path, host)?;
    out.write_str("Content-Type: application/json\r\n")?;
    if let Some(key) = api_key {
        write!(out, "{}: {}\r\n", API_KEY_HEADER, key)?;
    }
    write!(
        out,
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        content_length
    )
}

pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}

/// Status code from the first response line, e.g. `HTTP/1.1 200 OK`.
pub fn parse_status_code(response: &[u8]) -> Option<u16> {
    let line_end = response
        .windows(2)
        .position(|window| window == b"\r\n")
        .unwrap_or(response.len());
    let line = core::str::from_utf8(&response[..line_end]).ok()?;
    let mut parts = line.split_ascii_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_head_carries_key_and_length() {
        let mut head = String::new();
        write_request_head(&mut head, "collector.local", "/api/badge-data", Some("k3y"), 42)
            .unwrap();
        assert_eq!(
            head,
            "POST /api/badge-data HTTP/1.1\r\nHost: collector.local\r\n\
             Content-Type: application/json\r\nx-functions-key: k3y\r\n\
             Content-Length: 42\r\nConnection: close\r\n\r\n"
        );
        assert_eq!(find_header_end(head.as_bytes()), Some(head.len() - 4));
    }

    #[test]
    fn key_header_is_omitted_without_key() {
        let mut head = String::new();
        write_request_head(&mut head, "h", "/", None, 0).unwrap();
        assert!(!head.contains(API_KEY_HEADER));
    }

    #[test]
    fn status_line_parsing() {
        assert_eq!(parse_status_code(b"HTTP/1.1 200 OK\r\n\r\n"), Some(200));
        assert_eq!(parse_status_code(b"HTTP/1.0 503 Busy"), Some(503));
        assert_eq!(parse_status_code(b"garbage 200"), None);
        assert_eq!(parse_status_code(b"HTTP/1.1\r\n"), None);
        assert!(is_success(204));
        assert!(!is_success(401));
    }
}
