use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};

use crate::error::{Result, SourceError};
use crate::traits::ByteSource;

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 256;

/// Adapts any [`Read`] into a non-blocking [`ByteSource`].
///
/// The reader is expected to be configured with a short timeout (serial
/// ports) or to be non-blocking. `TimedOut` and `WouldBlock` mean "nothing
/// pending" and are not errors. End of stream is reported once, as
/// [`SourceError::Closed`], after every buffered byte has been handed out.
pub struct ReadSource<R> {
    inner: R,
    buf: BytesMut,
    eof: bool,
}

impl<R: Read> ReadSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            eof: false,
        }
    }

    fn fill(&mut self) -> Result<()> {
        if !self.buf.is_empty() || self.eof {
            return Ok(());
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    tracing::debug!("byte source reached end of stream");
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
                {
                    return Ok(());
                }
                Err(err) => return Err(SourceError::Io(err)),
            }
        }
    }

    /// Borrow the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the adapter and return the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn available(&mut self) -> Result<usize> {
        self.fill()?;
        if self.buf.is_empty() && self.eof {
            return Err(SourceError::Closed);
        }
        Ok(self.buf.len())
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        self.fill()?;
        if self.buf.has_remaining() {
            return Ok(Some(self.buf.get_u8()));
        }
        if self.eof {
            return Err(SourceError::Closed);
        }
        Ok(None)
    }
}

/// An in-memory source. Bytes can be appended while it is being drained.
#[derive(Debug, Default)]
pub struct SliceSource {
    buf: BytesMut,
}

impl SliceSource {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            buf: BytesMut::from(bytes),
        }
    }

    /// Make more bytes available.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl ByteSource for SliceSource {
    fn available(&mut self) -> Result<usize> {
        Ok(self.buf.len())
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.buf.has_remaining() {
            Ok(Some(self.buf.get_u8()))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn read_source_yields_bytes_then_closed() {
        let mut source = ReadSource::new(Cursor::new(vec![1u8, 2, 3]));
        assert_eq!(source.available().unwrap(), 3);
        assert_eq!(source.read_byte().unwrap(), Some(1));
        assert_eq!(source.read_byte().unwrap(), Some(2));
        assert_eq!(source.read_byte().unwrap(), Some(3));
        assert!(matches!(source.read_byte(), Err(SourceError::Closed)));
        assert!(matches!(source.available(), Err(SourceError::Closed)));
    }

    #[test]
    fn timeouts_are_empty_polls() {
        let mut source = ReadSource::new(TimeoutThenData {
            timeouts: 2,
            bytes: vec![0xAA],
        });
        assert_eq!(source.read_byte().unwrap(), None);
        assert_eq!(source.available().unwrap(), 0);
        assert_eq!(source.read_byte().unwrap(), Some(0xAA));
    }

    #[test]
    fn interrupted_read_retries() {
        let mut source = ReadSource::new(InterruptedThenData { state: 0 });
        assert_eq!(source.read_byte().unwrap(), Some(7));
    }

    #[test]
    fn hard_io_error_propagates() {
        let mut source = ReadSource::new(Broken);
        let err = source.read_byte().unwrap_err();
        assert!(matches!(err, SourceError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn slice_source_accepts_more_bytes() {
        let mut source = SliceSource::new(&[1]);
        assert_eq!(source.read_byte().unwrap(), Some(1));
        assert_eq!(source.read_byte().unwrap(), None);
        assert!(source.is_empty());
        source.push(&[2, 3]);
        assert_eq!(source.available().unwrap(), 2);
        assert_eq!(source.read_byte().unwrap(), Some(2));
    }

    struct TimeoutThenData {
        timeouts: usize,
        bytes: Vec<u8>,
    }

    impl Read for TimeoutThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.timeouts > 0 {
                self.timeouts -= 1;
                return Err(std::io::Error::from(ErrorKind::TimedOut));
            }
            let n = self.bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[..n]);
            self.bytes.drain(..n);
            Ok(n)
        }
    }

    struct InterruptedThenData {
        state: u8,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            buf[0] = 7;
            Ok(1)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }
    }
}
