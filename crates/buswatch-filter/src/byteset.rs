use std::fmt;

/// A set of byte values, stored as a 256-bit membership table.
///
/// Iteration is in ascending order and duplicates collapse on insert.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ByteSet {
    bits: [u64; 4],
}

impl ByteSet {
    pub const fn new() -> Self {
        Self { bits: [0; 4] }
    }

    pub fn insert(&mut self, byte: u8) -> bool {
        let (word, mask) = Self::slot(byte);
        let fresh = self.bits[word] & mask == 0;
        self.bits[word] |= mask;
        fresh
    }

    pub fn contains(&self, byte: u8) -> bool {
        let (word, mask) = Self::slot(byte);
        self.bits[word] & mask != 0
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    /// True when every byte of `bytes` is a member.
    pub fn covers(&self, bytes: &[u8]) -> bool {
        bytes.iter().all(|&b| self.contains(b))
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(move |&b| self.contains(b))
    }

    /// Number of distinct values in `bytes`.
    pub fn distinct(bytes: &[u8]) -> usize {
        bytes.iter().copied().collect::<ByteSet>().len()
    }

    fn slot(byte: u8) -> (usize, u64) {
        ((byte >> 6) as usize, 1u64 << (byte & 0x3F))
    }
}

impl FromIterator<u8> for ByteSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = ByteSet::new();
        for byte in iter {
            set.insert(byte);
        }
        set
    }
}

impl fmt::Debug for ByteSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().map(|b| format!("0x{b:02X}")))
            .finish()
    }
}
