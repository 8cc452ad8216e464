// Byte pumps between pipeline stages
use anyhow::{Context, Result};
use log::{debug, warn};
use std::io::{self, ErrorKind, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// Copies `src` into `dst` in chunks of at most `chunk` bytes, flushing after
/// each one so the reader on the other side sees data as soon as it exists.
///
/// Stops at end of input. A write error (usually a closed pipe) ends the copy
/// and is returned to the caller.
pub fn copy_chunked<R, W>(src: &mut R, dst: &mut W, chunk: usize) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; chunk.max(1)];
    let mut total = 0u64;
    loop {
        let n = match src.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        dst.write_all(&buf[..n])?;
        dst.flush()?;
        total += n as u64;
    }
}

/// Background threads feeding stage inputs.
///
/// Each relay owns both of its ends and drops them when it finishes, which is
/// what delivers end-of-input to the downstream process.
pub struct Relays {
    chunk_size: usize,
    done_tx: Sender<String>,
    done_rx: Receiver<String>,
    pending: usize,
}

impl Relays {
    pub fn new(chunk_size: usize) -> Self {
        let (done_tx, done_rx) = mpsc::channel();
        Self {
            chunk_size,
            done_tx,
            done_rx,
            pending: 0,
        }
    }

    pub fn spawn<R, W>(&mut self, label: &str, mut src: R, mut dst: W) -> Result<()>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let chunk = self.chunk_size;
        let done = self.done_tx.clone();
        let name = label.to_string();

        thread::Builder::new()
            .name(format!("relay:{}", label))
            .spawn(move || {
                match copy_chunked(&mut src, &mut dst, chunk) {
                    Ok(bytes) => debug!("relay {} copied {} bytes", name, bytes),
                    Err(e) => debug!("relay {} stopped: {}", name, e),
                }
                drop(dst);
                drop(src);
                let _ = done.send(name);
            })
            .with_context(|| format!("{}: failed to start input relay", label))?;

        self.pending += 1;
        Ok(())
    }

    /// Waits up to `timeout` for all relays to finish and returns how many
    /// were left running. Abandoned threads end on their own once their
    /// pipe breaks.
    pub fn join(mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        while self.pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.done_rx.recv_timeout(remaining) {
                Ok(_) => self.pending -= 1,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        if self.pending > 0 {
            warn!("abandoning {} input relay(s) still running", self.pending);
        }
        self.pending
    }
}
