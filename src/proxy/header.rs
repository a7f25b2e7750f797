use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::transform::Transform;

/// Upper bound on the first read from a client connection.
pub const MAX_HEADER_SIZE: usize = 8192;

/// Reads the first chunk of bytes from a freshly accepted connection.
///
/// Exactly one read: the request line and Host header are assumed to
/// arrive together. Exact replay of the consumed bytes to the remote
/// depends on never reading past them, so there is no accumulation loop.
/// The transform is applied to the bytes actually read.
pub async fn read_header(stream: &mut TcpStream, transform: Transform) -> std::io::Result<BytesMut> {
    let mut header = BytesMut::with_capacity(MAX_HEADER_SIZE);
    stream.read_buf(&mut header).await?;
    transform.apply(&mut header);
    Ok(header)
}

/// A request is a CONNECT tunnel iff the header starts with the literal
/// method token.
pub fn is_tunnel(header: &[u8]) -> bool {
    header.starts_with(b"CONNECT")
}

/// Extracts the destination "host:port" from a request header.
///
/// Line index 1 is trusted to be the Host header without checking its
/// name; malformed requests resolve to the wrong value or to `None`.
/// Plain requests without an explicit port get `:80` appended; CONNECT
/// requests are assumed to already carry one.
pub fn extract_host(is_tunnel: bool, header: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(header);
    let mut lines = text.split("\r\n");
    let _request_line = lines.next()?;
    let host_line = lines.next()?;

    let (_name, value) = host_line.split_once(':')?;
    let mut address = value.trim_matches(' ').to_string();
    if !address.contains(':') && !is_tunnel {
        address.push_str(":80");
    }

    Some(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_request_gets_default_port() {
        let header = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
        assert_eq!(
            extract_host(false, header),
            Some("example.com:80".to_string())
        );
    }

    #[test]
    fn explicit_port_is_preserved() {
        let header = b"GET / HTTP/1.1\r\nHost: example.com:443\r\n\r\n";
        assert_eq!(
            extract_host(false, header),
            Some("example.com:443".to_string())
        );
    }

    #[test]
    fn tunnel_request_keeps_address_as_is() {
        let header = b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n\r\n";
        assert_eq!(
            extract_host(true, header),
            Some("example.com:443".to_string())
        );
    }

    #[test]
    fn single_line_header_is_unresolvable() {
        assert_eq!(extract_host(false, b"GET / HTTP/1.1"), None);
    }

    #[test]
    fn empty_header_is_unresolvable() {
        assert_eq!(extract_host(false, b""), None);
    }

    #[test]
    fn second_line_without_colon_is_unresolvable() {
        let header = b"GET / HTTP/1.1\r\nnot-a-host-header\r\n\r\n";
        assert_eq!(extract_host(false, header), None);
    }

    #[test]
    fn connect_method_is_detected_as_tunnel() {
        assert!(is_tunnel(b"CONNECT example.com:443 HTTP/1.1\r\n"));
        assert!(!is_tunnel(b"GET / HTTP/1.1\r\n"));
        assert!(!is_tunnel(b"CONNE"));
    }
}
