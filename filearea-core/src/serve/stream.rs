use std::io::{self, Read, Seek, SeekFrom, Write};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{FileAreaError, Result};
use crate::serve::range::ByteRange;
use crate::store::ContentReader;

/// Multipart separator; appears in the response head and in every part frame.
pub const BOUNDARY: &str = "s1e2r3v4e5b6y7t8e9r0a1n2g3e4s5";

/// 64 KiB per 60 s budget: clients down to about 1 KiB/s are never cut off.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
pub const DEFAULT_CHUNK_TIME_LIMIT_SECS: u64 = 60;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferLimits {
    pub chunk_size: usize,
    /// Budget for moving one chunk; renewed for every chunk.
    pub chunk_time_limit: Duration,
    /// Hard cap on the whole transfer.
    pub max_transfer_time: Duration,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_time_limit: Duration::from_secs(DEFAULT_CHUNK_TIME_LIMIT_SECS),
            max_transfer_time: Duration::from_secs(3600),
        }
    }
}

/// Status line and headers, known before any body byte is produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.headers.push((name.to_string(), value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn extend(&mut self, other: ResponseHead) {
        self.headers.extend(other.headers);
    }

    /// HTTP/1.1 rendering of the head, terminated by the blank line.
    pub fn write_to(&self, w: &mut dyn Write) -> io::Result<()> {
        write!(w, "HTTP/1.1 {} {}\r\n", self.status, reason(self.status))?;
        for (k, v) in &self.headers {
            write!(w, "{k}: {v}\r\n")?;
        }
        w.write_all(b"\r\n")
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        206 => "Partial Content",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "",
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    Complete { bytes_sent: u64 },
    /// The consumer stopped accepting bytes; not an error.
    ClientAborted { bytes_sent: u64 },
}

#[derive(Clone, Debug)]
enum Plan {
    Full,
    Single(ByteRange),
    Multipart(Vec<ByteRange>),
}

/// Streams the whole content, one range, or a multipart/byteranges body from a
/// seekable handle. The handle is owned and released when streaming ends.
pub struct ByteStreamer {
    reader: Box<dyn ContentReader>,
    mime: String,
    total: u64,
    plan: Plan,
    limits: TransferLimits,
}

impl ByteStreamer {
    /// `ranges` of `None` (or an empty list) serves the whole content with 200.
    pub fn new(
        reader: Box<dyn ContentReader>,
        mime: &str,
        total: u64,
        ranges: Option<Vec<ByteRange>>,
        limits: TransferLimits,
    ) -> Self {
        let plan = match ranges {
            Some(mut r) if r.len() == 1 => Plan::Single(r.remove(0)),
            Some(r) if r.len() > 1 => Plan::Multipart(r),
            _ => Plan::Full,
        };
        Self {
            reader,
            mime: mime.to_string(),
            total,
            plan,
            limits,
        }
    }

    pub fn content_length(&self) -> u64 {
        match &self.plan {
            Plan::Full => self.total,
            Plan::Single(r) => r.length(),
            Plan::Multipart(ranges) => {
                ranges
                    .iter()
                    .map(|r| part_header(&self.mime, r, self.total).len() as u64 + r.length())
                    .sum::<u64>()
                    + trailer().len() as u64
            }
        }
    }

    pub fn head(&self) -> ResponseHead {
        let mut head = ResponseHead::new(match self.plan {
            Plan::Full => 200,
            _ => 206,
        });
        head.push("Content-Length", self.content_length().to_string());
        match &self.plan {
            Plan::Full => head.push("Content-Type", self.mime.clone()),
            Plan::Single(r) => {
                head.push("Content-Range", content_range(r, self.total));
                head.push("Content-Type", self.mime.clone());
            }
            Plan::Multipart(_) => head.push(
                "Content-Type",
                format!("multipart/byteranges; boundary={BOUNDARY}"),
            ),
        }
        head
    }

    /// Write the body. Disconnects end the transfer with `ClientAborted`; a source
    /// shorter than promised is `Truncated`.
    pub fn stream_to(mut self, out: &mut dyn Write) -> Result<StreamOutcome> {
        let mut t = Transfer {
            out,
            bytes_sent: 0,
            started: Instant::now(),
            overran: false,
            limits: self.limits.clone(),
        };
        let res = match std::mem::replace(&mut self.plan, Plan::Full) {
            Plan::Full => {
                let total = self.total;
                t.copy_range(&mut self.reader, 0, total)
            }
            Plan::Single(r) => t.copy_range(&mut self.reader, r.start, r.length()),
            Plan::Multipart(ranges) => {
                let mut res = Ok(());
                for r in &ranges {
                    res = t
                        .send(part_header(&self.mime, r, self.total).as_bytes())
                        .and_then(|_| t.copy_range(&mut self.reader, r.start, r.length()));
                    if res.is_err() {
                        break;
                    }
                }
                res.and_then(|_| t.send(trailer().as_bytes()))
            }
        };
        let bytes_sent = t.bytes_sent;
        match res {
            Ok(()) => {
                debug!(bytes_sent, "stream complete");
                Ok(StreamOutcome::Complete { bytes_sent })
            }
            Err(Halt::ClientGone) => {
                info!(bytes_sent, "client disconnected mid-stream");
                Ok(StreamOutcome::ClientAborted { bytes_sent })
            }
            Err(Halt::Failed(e)) => Err(e),
        }
    }
}

enum Halt {
    ClientGone,
    Failed(FileAreaError),
}

impl From<io::Error> for Halt {
    fn from(e: io::Error) -> Self {
        Halt::Failed(e.into())
    }
}

struct Transfer<'a> {
    out: &'a mut dyn Write,
    bytes_sent: u64,
    started: Instant,
    /// The previous chunk took longer than its budget.
    overran: bool,
    limits: TransferLimits,
}

impl Transfer<'_> {
    fn send(&mut self, buf: &[u8]) -> std::result::Result<(), Halt> {
        match self.out.write_all(buf) {
            Ok(()) => {
                self.bytes_sent += buf.len() as u64;
                Ok(())
            }
            Err(e) if is_disconnect(&e) => Err(Halt::ClientGone),
            Err(e) => Err(e.into()),
        }
    }

    fn copy_range(
        &mut self,
        src: &mut Box<dyn ContentReader>,
        start: u64,
        len: u64,
    ) -> std::result::Result<(), Halt> {
        src.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; self.limits.chunk_size.max(1).min(len as usize)];
        let mut copied = 0u64;
        while copied < len {
            // Budgets are checked before a chunk goes out, never after the last one.
            if self.overran || self.started.elapsed() > self.limits.max_transfer_time {
                return Err(Halt::Failed(FileAreaError::TransferTimedOut {
                    bytes_sent: self.bytes_sent,
                }));
            }
            let chunk_start = Instant::now();
            let want = buf.len().min((len - copied) as usize);
            let n = match src.read(&mut buf[..want]) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                return Err(Halt::Failed(FileAreaError::Truncated {
                    expected: len,
                    got: copied,
                }));
            }
            self.send(&buf[..n])?;
            copied += n as u64;
            self.overran = chunk_start.elapsed() > self.limits.chunk_time_limit;
        }
        Ok(())
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
    )
}

fn content_range(r: &ByteRange, total: u64) -> String {
    format!("bytes {}-{}/{}", r.start, r.end, total)
}

fn part_header(mime: &str, r: &ByteRange, total: u64) -> String {
    format!(
        "\r\n--{BOUNDARY}\r\nContent-Type: {mime}\r\nContent-Range: {}\r\n\r\n",
        content_range(r, total)
    )
}

fn trailer() -> String {
    format!("\r\n--{BOUNDARY}--\r\n")
}
