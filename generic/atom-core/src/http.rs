use embassy_time::{Duration, with_timeout};
use embedded_io_async::{Read, Write};
use heapless::{String, Vec};
use log::info;
use thiserror::Error;

use crate::env_monitor::{LatestSnapshot, Snapshot};
use crate::system_settings::log_toggles::{LogChannel, LogToggleReceiver, may_log};

pub const PORT: u16 = 80;
/// Hard limit for a whole connection, from the first byte read until the response is flushed
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(1);
/// Request lines are cut off after this many bytes
pub const MAX_LINE: usize = 128;

const NOT_FOUND_BODY: &[u8] = b"404 Page not found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Index,
    Logo,
    Favicon,
    DataScript,
    NotFound,
}

impl Route {
    /// Classify a request line. Returns `None` for anything that is not a GET line.
    pub fn from_request_line(line: &str) -> Option<Route> {
        let target = line.strip_prefix("GET ")?;
        let target = target.split(' ').next().unwrap_or_default();
        let path = target.split('?').next().unwrap_or_default();
        Some(match path {
            "/" => Route::Index,
            "/electric-idea_100x100.jpg" => Route::Logo,
            "/favicon.ico" => Route::Favicon,
            "/data.js" => Route::DataScript,
            _ => Route::NotFound,
        })
    }

    pub fn status_line(self) -> &'static str {
        match self {
            Route::NotFound => "HTTP/1.1 404 Not Found",
            _ => "HTTP/1.1 200 OK",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Route::Index => "text/html",
            Route::Logo => "image/jpeg",
            Route::Favicon => "image/x-icon",
            Route::DataScript => "application/javascript",
            Route::NotFound => "text/plain",
        }
    }
}

/// Byte-fed request reader
pub struct RequestScanner {
    line: Vec<u8, MAX_LINE>,
    route: Route,
}

impl RequestScanner {
    pub const fn new() -> Self {
        Self {
            line: Vec::new(),
            route: Route::NotFound,
        }
    }

    /// Feed the next byte. Returns the route once the empty line terminating the request
    /// header has been seen.
    pub fn feed(&mut self, byte: u8) -> Option<Route> {
        match byte {
            b'\r' => None,
            b'\n' if self.line.is_empty() => Some(self.route),
            b'\n' => {
                if let Ok(line) = core::str::from_utf8(&self.line)
                    && let Some(route) = Route::from_request_line(line)
                {
                    self.route = route;
                }
                self.line.clear();
                None
            }
            _ => {
                // overlong lines are truncated
                let _ = self.line.push(byte);
                None
            }
        }
    }
}

impl Default for RequestScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Static content of the page
#[derive(Clone, Copy)]
pub struct Site {
    pub index_html: &'static [u8],
    pub logo_jpeg: &'static [u8],
    pub favicon: &'static [u8],
}

#[derive(Error, Debug)]
pub enum HttpError<E> {
    #[error("Client closed the connection before the request was complete")]
    ConnectionClosed,
    #[error("Client did not finish within {}ms", CONNECTION_TIMEOUT.as_millis())]
    Timeout,
    #[error("Socket error: {0:?}")]
    Io(E),
}

pub async fn read_request<R: Read>(rx: &mut R) -> Result<Route, HttpError<R::Error>> {
    let mut scanner = RequestScanner::new();
    let mut buf = [0u8; 64];
    loop {
        let n = rx.read(&mut buf).await.map_err(HttpError::Io)?;
        if n == 0 {
            return Err(HttpError::ConnectionClosed);
        }
        if let Some(route) = buf[..n].iter().find_map(|b| scanner.feed(*b)) {
            return Ok(route);
        }
    }
}

pub async fn write_response<W: Write>(
    tx: &mut W,
    route: Route,
    site: &Site,
    snapshot: &Snapshot,
) -> Result<(), HttpError<W::Error>> {
    let mut script = String::<128>::new();
    let body: &[u8] = match route {
        Route::Index => site.index_html,
        Route::Logo => site.logo_jpeg,
        Route::Favicon => site.favicon,
        Route::DataScript => {
            // three lines of at most ~40 characters each always fit
            let _ = snapshot.write_script(&mut script);
            script.as_bytes()
        }
        Route::NotFound => NOT_FOUND_BODY,
    };

    let mut header = String::<96>::new();
    let _ = core::fmt::write(
        &mut header,
        format_args!(
            "{}\r\nContent-type:{}\r\nConnection: close\r\n\r\n",
            route.status_line(),
            route.content_type()
        ),
    );
    tx.write_all(header.as_bytes()).await.map_err(HttpError::Io)?;
    tx.write_all(body).await.map_err(HttpError::Io)?;
    tx.write_all(b"\r\n").await.map_err(HttpError::Io)?;
    tx.flush().await.map_err(HttpError::Io)
}

/// Answer a single request. The whole exchange has to finish within [`CONNECTION_TIMEOUT`],
/// the caller closes the socket afterwards in any case.
pub async fn serve_connection<S: Read + Write>(
    socket: &mut S,
    site: &Site,
    latest: &LatestSnapshot,
    log_receiver: &mut LogToggleReceiver,
) -> Result<Route, HttpError<S::Error>> {
    let route = with_timeout(CONNECTION_TIMEOUT, async {
        let route = read_request(socket).await?;
        write_response(socket, route, site, &latest.get()).await?;
        Ok::<_, HttpError<S::Error>>(route)
    })
    .await
    .map_err(|_| HttpError::Timeout)??;

    may_log(log_receiver, LogChannel::Http, || info!("Served {route:?}")).await;
    Ok(route)
}
