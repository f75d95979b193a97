use crate::error::Result;

/// Microseconds from a monotonic clock.
///
/// Deliberately 32 bits wide: the value wraps after ~71 minutes and every
/// consumer compares timestamps with `wrapping_sub`.
pub type Micros = u32;

/// Elapsed microseconds from `earlier` to `now`, correct across one wrap.
#[inline]
pub fn elapsed(now: Micros, earlier: Micros) -> Micros {
    now.wrapping_sub(earlier)
}

/// A byte stream that can be polled without blocking.
///
/// Implementations must return promptly: "nothing to read right now" is
/// `Ok(None)` from [`read_byte`](ByteSource::read_byte), never a wait.
pub trait ByteSource {
    /// Number of bytes that can be read without blocking.
    fn available(&mut self) -> Result<usize>;

    /// Read one byte if one is available.
    fn read_byte(&mut self) -> Result<Option<u8>>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn available(&mut self) -> Result<usize> {
        (**self).available()
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn available(&mut self) -> Result<usize> {
        (**self).available()
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }
}

/// A monotonic microsecond clock owned by the host.
pub trait Clock {
    /// Current timestamp. Only differences between readings are meaningful.
    fn now_micros(&self) -> Micros;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_micros(&self) -> Micros {
        (**self).now_micros()
    }
}
