/// Truncates or zero-pads `source` to exactly `capacity` bytes.
///
/// Every placement goes through this; an overlay placement passes its own
/// length as `capacity` so only the source bytes are written.
pub fn fit(source: &[u8], capacity: usize) -> Vec<u8> {
    let mut out = source[..source.len().min(capacity)].to_vec();
    out.resize(capacity, 0);
    out
}

/// Fixed-size, zero-initialised backing store for a disk image.
///
/// The length is set at allocation and never changes; writes that would run
/// past the end are clipped.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskImage {
    data: Vec<u8>,
    sector_size: usize,
}

impl DiskImage {
    /// Allocates `total_sectors * sector_size` zero bytes.
    ///
    /// The caller must ensure the product does not overflow.
    pub(crate) fn new(sector_size: usize, total_sectors: usize) -> Self {
        Self {
            data: vec![0; sector_size * total_sectors],
            sector_size,
        }
    }

    /// Copies `data` into the image starting at byte `offset`.
    ///
    /// Returns the number of bytes actually written.
    pub(crate) fn write(&mut self, offset: usize, data: &[u8]) -> usize {
        if data.is_empty() || offset >= self.data.len() {
            return 0;
        }

        let end_pos = std::cmp::min(offset + data.len(), self.data.len());
        let written = end_pos - offset;
        self.data[offset..end_pos].copy_from_slice(&data[..written]);
        written
    }

    /// Returns the bytes of the image, clipped to its length.
    pub fn read(&self, offset: usize, len: usize) -> &[u8] {
        if offset >= self.data.len() {
            return &[];
        }

        let end_pos = std::cmp::min(offset.saturating_add(len), self.data.len());
        &self.data[offset..end_pos]
    }

    /// Returns sector `index`, or an empty slice past the end.
    pub fn sector(&self, index: usize) -> &[u8] {
        match index.checked_mul(self.sector_size) {
            Some(offset) => self.read(offset, self.sector_size),
            None => &[],
        }
    }

    pub fn sector_size(&self) -> usize { self.sector_size }

    pub fn total_sectors(&self) -> usize { self.data.len() / self.sector_size }

    pub fn len(&self) -> usize { self.data.len() }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    pub fn as_bytes(&self) -> &[u8] { &self.data }

    pub fn into_bytes(self) -> Vec<u8> { self.data }
}
