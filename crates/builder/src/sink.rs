//! Destinations for the standard output and error of `nydus-image`.

use std::fmt;
use std::io::{self, Read, Write};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};

/// Where a standard stream of the child process goes.
#[derive(Default)]
pub enum Sink {
    /// Share the stream of the current process.
    #[default]
    Inherit,
    /// Discard the stream.
    Null,
    /// Copy the stream verbatim into a writer. The same writer may be used
    /// for both stdout and stderr; it is locked once per chunk.
    Writer(Arc<Mutex<dyn Write + Send>>),
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Inherit => f.write_str("Inherit"),
            Sink::Null => f.write_str("Null"),
            Sink::Writer(_) => f.write_str("Writer"),
        }
    }
}

impl Sink {
    /// Wrap an owned writer.
    pub fn writer(w: impl Write + Send + 'static) -> Self {
        Sink::Writer(Arc::new(Mutex::new(w)))
    }

    pub(crate) fn stdio(&self) -> Stdio {
        match self {
            Sink::Inherit => Stdio::inherit(),
            Sink::Null => Stdio::null(),
            Sink::Writer(_) => Stdio::piped(),
        }
    }

    /// Copy `stream` into this sink until EOF. The stream is always drained,
    /// even after a write error, so the child can't block on a full pipe.
    pub(crate) fn forward(&self, stream: Option<impl Read>) -> io::Result<()> {
        let (Some(mut stream), Sink::Writer(w)) = (stream, self) else {
            return Ok(());
        };
        let mut buf = [0u8; 8192];
        let mut failed = None;
        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if failed.is_some() {
                continue;
            }
            let mut w = w.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = w.write_all(&buf[..n]) {
                failed = Some(e);
            }
        }
        if let Some(e) = failed {
            return Err(e);
        }
        w.lock().unwrap_or_else(PoisonError::into_inner).flush()
    }
}
