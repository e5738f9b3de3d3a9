//! Request body storage once the input stage has run.

use std::fmt;
use std::io::{self, Read};

use bytes::{Buf, Bytes};
use tokio::sync::mpsc;

/// Chunks still arriving from the network after the switch to streaming.
pub type ChunkSender = mpsc::Sender<io::Result<Bytes>>;

/// The request body as seen by deserialization.
#[derive(Default)]
pub enum RequestBody {
    /// No body was sent, or the method carries none.
    #[default]
    Empty,
    /// The whole body, accumulated in memory.
    Buffered(Bytes),
    /// A blocking reader over what was buffered plus what is still arriving.
    Streaming(BlockingBody),
}

impl RequestBody {
    /// Turns the body into a reader.
    ///
    /// Reading a [`RequestBody::Streaming`] body blocks the calling thread
    /// and must only happen on a blocking executor.
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        match self {
            Self::Empty => Box::new(io::empty()),
            Self::Buffered(bytes) => Box::new(bytes.reader()),
            Self::Streaming(body) => Box::new(body),
        }
    }

    /// Returns true if nothing was sent.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Buffered(bytes) => bytes.is_empty(),
            Self::Streaming(_) => false,
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Buffered(b) => write!(f, "Buffered({} bytes)", b.len()),
            Self::Streaming(_) => f.write_str("Streaming"),
        }
    }
}

/// A blocking [`Read`] over a buffered prefix followed by chunks received
/// from a channel.
pub struct BlockingBody {
    current: Bytes,
    rx: mpsc::Receiver<io::Result<Bytes>>,
    done: bool,
}

impl BlockingBody {
    /// Creates a body that yields `buffered` first, then whatever arrives on
    /// the returned sender until it is dropped.
    pub fn channel(buffered: Bytes, capacity: usize) -> (Self, ChunkSender) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                current: buffered,
                rx,
                done: false,
            },
            tx,
        )
    }
}

impl Read for BlockingBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if !self.current.is_empty() {
                let n = buf.len().min(self.current.len());
                buf[..n].copy_from_slice(&self.current[..n]);
                self.current.advance(n);
                return Ok(n);
            }
            if self.done {
                return Ok(0);
            }
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => self.current = chunk,
                Some(Err(e)) => {
                    self.done = true;
                    return Err(e);
                }
                None => {
                    self.done = true;
                    return Ok(0);
                }
            }
        }
    }
}
