//! Minimal HTTP server answering every request with a fixed status and body

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

/// Serves `body` with a 200 on an ephemeral localhost port, returning the port
#[allow(dead_code)]
pub fn serve(body: &'static str) -> u16 {
    serve_status("200 OK", body)
}

/// Serves `body` with `status` on an ephemeral localhost port, returning the
/// port. Same responses as the unit-test server in `src/scrape.rs`.
#[allow(dead_code)]
pub fn serve_status(status: &'static str, body: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind stub server");
    let port = listener.local_addr().expect("No local address").port();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut buf = Vec::new();
            let mut chunk = [0u8; 512];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    port
}

/// A localhost port nothing listens on
#[allow(dead_code)]
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    listener.local_addr().expect("No local address").port()
}
