//! HTTP/1.1 wire format: request encoding and response decoding.

use brotli::Decompressor;
use flate2::read::DeflateDecoder;
use flate2::read::GzDecoder;
use flate2::read::ZlibDecoder;
use sk_core::BrowserError;
use sk_core::BrowserResult;
use std::io::BufRead;
use std::io::BufReader;
use std::io::ErrorKind;
use std::io::Read;
use url::Url;

const MAX_RESPONSE_HEAD_BYTES: usize = 128 * 1024;
const MAX_CHUNK_LINE_BYTES: usize = 8 * 1024;
const MAX_PREALLOCATED_BODY_BYTES: usize = 64 * 1024;
const ACCEPT_ENCODING: &str = "gzip, deflate, br";

/// Single header with a wire-safe name and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: &str, value: &str) -> BrowserResult<Self> {
        if name.is_empty() || !name.bytes().all(is_token_char) {
            return Err(BrowserError::new(
                "net.http.header_name_invalid",
                format!("invalid HTTP header name `{name}`"),
            ));
        }

        if value.bytes().any(|byte| matches!(byte, b'\r' | b'\n' | 0)) {
            return Err(BrowserError::new(
                "net.http.header_value_invalid",
                format!("invalid characters found in HTTP header `{name}`"),
            ));
        }

        Ok(Self {
            name: name.to_owned(),
            value: value.to_owned(),
        })
    }
}

/// Status line and headers of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status_code: u16,
    pub headers: Vec<Header>,
}

impl ResponseHead {
    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }

    /// Whether any `name` header lists `token` in its comma-separated value.
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.headers.iter().any(|header| {
            header.name.eq_ignore_ascii_case(name)
                && header
                    .value
                    .split(',')
                    .any(|candidate| candidate.trim().eq_ignore_ascii_case(token))
        })
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status_code, 301 | 302 | 303 | 307 | 308)
    }

    fn has_body(&self) -> bool {
        !((100..200).contains(&self.status_code)
            || self.status_code == 204
            || self.status_code == 304)
    }
}

/// Response with framing and content coding removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub head: ResponseHead,
    pub body: Vec<u8>,
}

/// Encodes a `GET` for `url`. Every request asks the server to close the
/// connection so the body can always be read to end of stream.
pub fn encode_get_request(url: &Url, user_agent: &str) -> BrowserResult<Vec<u8>> {
    let host = url.host_str().ok_or_else(|| {
        BrowserError::new(
            "net.http.host_missing",
            format!("URL `{url}` has no host"),
        )
    })?;
    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };

    let mut target = url.path().to_owned();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let headers = [
        Header::new("Host", &authority)?,
        Header::new("User-Agent", user_agent)?,
        Header::new("Accept", "*/*")?,
        Header::new("Accept-Encoding", ACCEPT_ENCODING)?,
        Header::new("Connection", "close")?,
    ];

    let mut encoded = format!("GET {target} HTTP/1.1\r\n").into_bytes();
    for header in &headers {
        encoded.extend_from_slice(header.name.as_bytes());
        encoded.extend_from_slice(b": ");
        encoded.extend_from_slice(header.value.as_bytes());
        encoded.extend_from_slice(b"\r\n");
    }
    encoded.extend_from_slice(b"\r\n");
    Ok(encoded)
}

/// Reads one complete response from `stream`.
pub fn read_response<R: Read>(stream: R) -> BrowserResult<RawResponse> {
    let mut reader = BufReader::new(stream);
    let head = read_head(&mut reader)?;

    if !head.has_body() {
        return Ok(RawResponse {
            head,
            body: Vec::new(),
        });
    }

    let framed = if head.header("transfer-encoding").is_some() {
        if !head.has_token("transfer-encoding", "chunked") {
            return Err(BrowserError::new(
                "net.http.transfer_encoding_unsupported",
                "only chunked transfer encoding is supported",
            ));
        }
        read_chunked_body(&mut reader)?
    } else if let Some(length) = content_length(&head)? {
        read_sized_body(&mut reader, length)?
    } else {
        read_until_close(&mut reader)?
    };

    let body = decode_content_encoding(&head, framed)?;
    Ok(RawResponse { head, body })
}

fn read_head<R: BufRead>(reader: &mut R) -> BrowserResult<ResponseHead> {
    let mut consumed = 0_usize;
    let mut next_line = |reader: &mut R| -> BrowserResult<String> {
        let line = read_line(reader, MAX_RESPONSE_HEAD_BYTES.saturating_sub(consumed), "head")?;
        consumed += line.len() + 2;
        Ok(line)
    };

    let status_line = next_line(reader)?;
    let status_code = parse_status_line(&status_line)?;

    let mut headers = Vec::new();
    loop {
        let line = next_line(reader)?;
        if line.is_empty() {
            break;
        }

        let (name, value) = line.split_once(':').ok_or_else(|| {
            BrowserError::new(
                "net.http.header_invalid",
                format!("invalid HTTP header line `{line}`"),
            )
        })?;
        headers.push(Header::new(name.trim(), value.trim())?);
    }

    Ok(ResponseHead {
        status_code,
        headers,
    })
}

/// Reads one CRLF- or LF-terminated line, without the terminator.
fn read_line<R: BufRead>(reader: &mut R, limit: usize, what: &str) -> BrowserResult<String> {
    let mut line = Vec::new();
    let read = reader
        .by_ref()
        .take(limit as u64 + 1)
        .read_until(b'\n', &mut line)
        .map_err(|error| {
            BrowserError::new(
                "net.http.read_failed",
                format!("failed while reading HTTP {what}: {error}"),
            )
        })?;

    if read == 0 || line.last() != Some(&b'\n') {
        if line.len() > limit {
            return Err(BrowserError::new(
                "net.http.line_too_large",
                format!("HTTP {what} line exceeds {limit} bytes"),
            ));
        }
        return Err(BrowserError::new(
            "net.http.unexpected_eof",
            format!("connection closed in the middle of the HTTP {what}"),
        ));
    }

    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }

    String::from_utf8(line).map_err(|error| {
        BrowserError::new(
            "net.http.invalid_utf8",
            format!("HTTP {what} is not valid UTF-8: {error}"),
        )
    })
}

fn parse_status_line(line: &str) -> BrowserResult<u16> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !matches!(version, "HTTP/1.0" | "HTTP/1.1") {
        return Err(BrowserError::new(
            "net.http.version_unsupported",
            format!("unsupported response version `{version}`"),
        ));
    }

    let code = parts.next().unwrap_or_default();
    match code.parse::<u16>() {
        Ok(value) if (100..=599).contains(&value) => Ok(value),
        _ => Err(BrowserError::new(
            "net.http.status_line_invalid",
            format!("invalid status line `{line}`"),
        )),
    }
}

fn content_length(head: &ResponseHead) -> BrowserResult<Option<usize>> {
    let mut length: Option<usize> = None;
    for header in &head.headers {
        if !header.name.eq_ignore_ascii_case("content-length") {
            continue;
        }

        let parsed = header.value.parse::<usize>().map_err(|error| {
            BrowserError::new(
                "net.http.content_length_invalid",
                format!("invalid Content-Length `{}`: {error}", header.value),
            )
        })?;
        if length.is_some_and(|existing| existing != parsed) {
            return Err(BrowserError::new(
                "net.http.content_length_conflict",
                "conflicting Content-Length headers in response",
            ));
        }
        length = Some(parsed);
    }

    Ok(length)
}

/// Reads exactly `length` bytes. The buffer grows with the bytes actually
/// received, so a bogus declared length cannot exhaust memory up front.
fn read_sized_body<R: Read>(reader: &mut R, length: usize) -> BrowserResult<Vec<u8>> {
    let mut body = Vec::with_capacity(length.min(MAX_PREALLOCATED_BODY_BYTES));
    let limit = u64::try_from(length).unwrap_or(u64::MAX);
    let received = reader
        .by_ref()
        .take(limit)
        .read_to_end(&mut body)
        .map_err(|error| {
            BrowserError::new(
                "net.http.read_body_failed",
                format!("failed to read {length} body bytes: {error}"),
            )
        })?;

    if received != length {
        return Err(BrowserError::new(
            "net.http.body_truncated",
            format!("expected {length} body bytes, connection closed after {received}"),
        ));
    }
    Ok(body)
}

/// Reads to end of stream. Peers that drop the connection without a TLS
/// close notification surface as `UnexpectedEof`, which still ends the body.
fn read_until_close<R: Read>(reader: &mut R) -> BrowserResult<Vec<u8>> {
    let mut body = Vec::new();
    match reader.read_to_end(&mut body) {
        Ok(_) => Ok(body),
        Err(error) if error.kind() == ErrorKind::UnexpectedEof => Ok(body),
        Err(error) => Err(BrowserError::new(
            "net.http.read_body_failed",
            format!("failed while reading response body: {error}"),
        )),
    }
}

fn read_chunked_body<R: BufRead>(reader: &mut R) -> BrowserResult<Vec<u8>> {
    let mut decoded = Vec::new();

    loop {
        let size_line = read_line(reader, MAX_CHUNK_LINE_BYTES, "chunk size")?;
        let size_token = size_line.split(';').next().unwrap_or_default().trim();
        if size_token.is_empty() {
            continue;
        }

        let size = usize::from_str_radix(size_token, 16).map_err(|error| {
            BrowserError::new(
                "net.http.chunk_size_invalid",
                format!("invalid chunk size `{size_token}`: {error}"),
            )
        })?;

        if size == 0 {
            // Trailers carry nothing we use.
            while !read_line(reader, MAX_CHUNK_LINE_BYTES, "chunk trailer")?.is_empty() {}
            return Ok(decoded);
        }

        decoded.extend(read_sized_body(reader, size)?);
        if !read_line(reader, MAX_CHUNK_LINE_BYTES, "chunk terminator")?.is_empty() {
            return Err(BrowserError::new(
                "net.http.chunk_terminator_invalid",
                "chunk data is missing its trailing CRLF",
            ));
        }
    }
}

fn decode_content_encoding(head: &ResponseHead, body: Vec<u8>) -> BrowserResult<Vec<u8>> {
    let encodings = head
        .headers
        .iter()
        .filter(|header| header.name.eq_ignore_ascii_case("content-encoding"))
        .flat_map(|header| header.value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>();

    let mut decoded = body;
    for encoding in encodings.iter().rev() {
        decoded = match encoding.as_str() {
            "identity" => decoded,
            "gzip" | "x-gzip" => inflate("gzip", GzDecoder::new(decoded.as_slice()))?,
            "deflate" => inflate_deflate(&decoded)?,
            "br" => inflate("brotli", Decompressor::new(decoded.as_slice(), 4096))?,
            other => {
                return Err(BrowserError::new(
                    "net.http.content_encoding_unsupported",
                    format!("unsupported content encoding `{other}`"),
                ));
            }
        };
    }

    Ok(decoded)
}

/// Servers disagree on whether `deflate` means zlib-wrapped or raw.
fn inflate_deflate(body: &[u8]) -> BrowserResult<Vec<u8>> {
    let mut zlib = Vec::new();
    if ZlibDecoder::new(body).read_to_end(&mut zlib).is_ok() {
        return Ok(zlib);
    }
    inflate("deflate", DeflateDecoder::new(body))
}

fn inflate<R: Read>(name: &str, mut decoder: R) -> BrowserResult<Vec<u8>> {
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).map_err(|error| {
        BrowserError::new(
            "net.http.decode_failed",
            format!("{name} decode failed: {error}"),
        )
    })?;
    Ok(decoded)
}

fn is_token_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
                | b'`' | b'|' | b'~'
        )
}
