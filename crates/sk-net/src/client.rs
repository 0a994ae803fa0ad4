//! Blocking HTTP/1.1 fetcher with redirect handling.

use crate::fetch::FetchOptions;
use crate::fetch::FetchedResponse;
use crate::fetch::Fetcher;
use crate::http::RawResponse;
use crate::http::encode_get_request;
use crate::http::read_response;
use crate::tls::TlsConnector;
use crate::transport;
use crate::transport::BoxedIoStream;
use sk_core::BrowserError;
use sk_core::BrowserResult;
use std::io::Write;
use url::Url;

/// [`Fetcher`] that speaks HTTP/1.1 over plain TCP or rustls.
///
/// One connection is opened per request and closed after the response; there
/// is no pooling.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    tls: TlsConnector,
}

impl HttpFetcher {
    pub fn new() -> BrowserResult<Self> {
        Ok(Self {
            tls: TlsConnector::new()?,
        })
    }

    fn fetch_once(&self, url: &Url, options: &FetchOptions) -> BrowserResult<RawResponse> {
        let host = url.host_str().unwrap_or_default();
        let addresses = url.socket_addrs(|| None).map_err(|error| {
            BrowserError::new(
                "net.dns.resolve_failed",
                format!("failed to resolve `{host}`: {error}"),
            )
        })?;

        let stream = transport::connect(&addresses, options.timeout)?;
        let mut stream: BoxedIoStream = match url.scheme() {
            "https" => self.tls.connect(host, stream)?,
            _ => Box::new(stream),
        };

        let request = encode_get_request(url, &options.user_agent)?;
        stream
            .write_all(&request)
            .and_then(|()| stream.flush())
            .map_err(|error| {
                BrowserError::new(
                    "net.http.write_failed",
                    format!("failed to send request to `{url}`: {error}"),
                )
            })?;

        read_response(stream)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, options: &FetchOptions) -> BrowserResult<FetchedResponse> {
        let mut current = parse_target(url)?;
        let mut hops = 0_usize;

        loop {
            let response = self.fetch_once(&current, options)?;

            let location = response
                .head
                .is_redirect()
                .then(|| response.head.header("location"))
                .flatten();

            let Some(location) = location else {
                log::debug!(
                    "fetched {current}: status {} ({} bytes)",
                    response.head.status_code,
                    response.body.len()
                );
                return Ok(FetchedResponse {
                    final_url: current.to_string(),
                    status_code: response.head.status_code,
                    content_type: response
                        .head
                        .header("content-type")
                        .unwrap_or_default()
                        .to_owned(),
                    body: response.body,
                });
            };

            if hops >= options.max_redirects {
                return Err(BrowserError::new(
                    "net.http.too_many_redirects",
                    format!(
                        "gave up on `{url}` after {} redirects",
                        options.max_redirects
                    ),
                ));
            }
            hops += 1;

            let next = current.join(location).map_err(|error| {
                BrowserError::new(
                    "net.http.redirect_invalid",
                    format!("redirect from `{current}` to `{location}` is not a URL: {error}"),
                )
            })?;
            ensure_supported_scheme(&next)?;
            log::debug!("redirect {hops}: {current} -> {next}");
            current = next;
        }
    }
}

fn parse_target(raw: &str) -> BrowserResult<Url> {
    let url = Url::parse(raw).map_err(|error| {
        BrowserError::new(
            "net.url.invalid",
            format!("`{raw}` is not a valid URL: {error}"),
        )
    })?;
    ensure_supported_scheme(&url)?;
    Ok(url)
}

fn ensure_supported_scheme(url: &Url) -> BrowserResult<()> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(BrowserError::new(
            "net.url.scheme_unsupported",
            format!("scheme `{}` is not supported", url.scheme()),
        ));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(BrowserError::new(
            "net.url.host_missing",
            format!("URL `{url}` has no host"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::HttpFetcher;
    use super::parse_target;
    use crate::fetch::FetchOptions;
    use crate::fetch::Fetcher;
    use std::io::BufRead;
    use std::io::BufReader;
    use std::io::Write;
    use std::net::TcpListener;
    use std::net::TcpStream;
    use std::thread;
    use std::time::Duration;

    fn fetcher() -> HttpFetcher {
        match HttpFetcher::new() {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    /// Serves `responses` in order, one per accepted connection, and
    /// returns the base URL.
    fn serve(responses: Vec<String>) -> String {
        let listener = match TcpListener::bind("127.0.0.1:0") {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        let address = match listener.local_addr() {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };

        thread::spawn(move || {
            for response in responses {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                answer(stream, &response);
            }
        });

        format!("http://{address}")
    }

    fn answer(stream: TcpStream, response: &str) {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        while reader.read_line(&mut line).is_ok_and(|read| read > 0) {
            if line == "\r\n" {
                break;
            }
            line.clear();
        }
        let _ = reader.get_mut().write_all(response.as_bytes());
    }

    fn options() -> FetchOptions {
        FetchOptions::default().with_timeout(Duration::from_secs(5))
    }

    #[test]
    fn rejects_unsupported_schemes() {
        let outcome = parse_target("ftp://files.example.com/a");
        assert!(outcome.is_err());
        if let Err(error) = outcome {
            assert_eq!(error.code, "net.url.scheme_unsupported");
        }
    }

    #[test]
    fn rejects_unparseable_targets() {
        let outcome = fetcher().fetch("not a url", &options());
        assert!(outcome.is_err());
        if let Err(error) = outcome {
            assert_eq!(error.code, "net.url.invalid");
        }
    }

    #[test]
    fn fetches_body_and_content_type() {
        let base = serve(vec![
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 12\r\n\r\n<p>Hello</p>"
                .to_owned(),
        ]);

        let response = match fetcher().fetch(&format!("{base}/index.html"), &options()) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(response.status_code, 200);
        assert_eq!(response.content_type, "text/html");
        assert_eq!(response.body, b"<p>Hello</p>");
        assert_eq!(response.final_url, format!("{base}/index.html"));
    }

    #[test]
    fn follows_relative_redirects() {
        let base = serve(vec![
            "HTTP/1.1 302 Found\r\nLocation: /final\r\nContent-Length: 0\r\n\r\n".to_owned(),
            "HTTP/1.1 200 OK\r\n\r\ndone".to_owned(),
        ]);

        let response = match fetcher().fetch(&format!("{base}/start"), &options()) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(response.body, b"done");
        assert_eq!(response.final_url, format!("{base}/final"));
    }

    #[test]
    fn stops_after_redirect_limit() {
        let base = serve(vec![
            "HTTP/1.1 301 Moved\r\nLocation: /loop\r\nContent-Length: 0\r\n\r\n".to_owned(),
        ]);

        let outcome = fetcher().fetch(&format!("{base}/loop"), &options().with_max_redirects(0));
        assert!(outcome.is_err());
        if let Err(error) = outcome {
            assert_eq!(error.code, "net.http.too_many_redirects");
        }
    }

    #[test]
    fn returns_error_statuses_without_failing() {
        let base = serve(vec![
            "HTTP/1.1 404 Not Found\r\nContent-Length: 7\r\n\r\nmissing".to_owned(),
        ]);

        let response = match fetcher().fetch(&format!("{base}/gone"), &options()) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(response.status_code, 404);
        assert!(!response.is_ok());
        assert_eq!(response.text(), "missing");
    }
}
