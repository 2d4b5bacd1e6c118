use std::io::{Read, Write};
use std::net::TcpListener;

use reqwest::Client;

use super::SgsClient;

/// Serve a single canned HTTP response on a local port, returning its base URL
pub(crate) fn serve_once(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
    });
    format!("http://{}/dados/serie", addr)
}

/// Client that talks to a local server directly, ignoring proxy settings
pub(crate) fn local_client(base_url: String) -> SgsClient {
    let http = Client::builder().no_proxy().build().unwrap();
    SgsClient::with_http_client(base_url, http)
}
