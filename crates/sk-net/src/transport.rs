//! TCP connection setup.

use sk_core::BrowserError;
use sk_core::BrowserResult;
use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::time::Duration;

/// Byte stream a request is written to and a response read from.
pub trait IoStream: Read + Write + Send {}
impl<T> IoStream for T where T: Read + Write + Send {}

pub type BoxedIoStream = Box<dyn IoStream>;

/// Connects to the first reachable address. `timeout` bounds the connect
/// and every later read and write on the socket.
pub fn connect(addresses: &[SocketAddr], timeout: Option<Duration>) -> BrowserResult<TcpStream> {
    let mut last_error = None;

    for address in addresses {
        let attempt = match timeout {
            Some(limit) => TcpStream::connect_timeout(address, limit),
            None => TcpStream::connect(address),
        };

        match attempt {
            Ok(stream) => return configure(stream, *address, timeout),
            Err(error) => {
                log::debug!("connect to {address} failed: {error}");
                last_error = Some(BrowserError::new(
                    "net.transport.connect_failed",
                    format!("failed to connect to `{address}`: {error}"),
                ));
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        BrowserError::new(
            "net.transport.no_addresses",
            "no addresses available to open a connection",
        )
    }))
}

fn configure(
    stream: TcpStream,
    address: SocketAddr,
    timeout: Option<Duration>,
) -> BrowserResult<TcpStream> {
    let socket_error = |what: &str, error: std::io::Error| {
        BrowserError::new(
            "net.transport.socket_option_failed",
            format!("failed to set {what} for `{address}`: {error}"),
        )
    };

    stream
        .set_nodelay(true)
        .map_err(|error| socket_error("TCP_NODELAY", error))?;
    stream
        .set_read_timeout(timeout)
        .map_err(|error| socket_error("read timeout", error))?;
    stream
        .set_write_timeout(timeout)
        .map_err(|error| socket_error("write timeout", error))?;

    Ok(stream)
}
