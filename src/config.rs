//! Decoder limits.

/// Default maximum size of one part's header block (8KB).
pub const DEFAULT_MAX_HEADER_SIZE: usize = 8 * 1024;

/// Limits applied while decoding a multipart stream.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of header bytes per part.
    max_header_size: usize,
    /// Maximum body size per part.
    max_part_size: Option<u64>,
    /// Maximum number of parts.
    max_parts: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            max_part_size: None,
            max_parts: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum size of a part's header block.
    #[must_use]
    pub fn max_header_size(mut self, size: usize) -> Self {
        self.max_header_size = size;
        self
    }

    /// Set the maximum body size of a single part.
    #[must_use]
    pub fn max_part_size(mut self, size: u64) -> Self {
        self.max_part_size = Some(size);
        self
    }

    /// Set the maximum number of parts.
    #[must_use]
    pub fn max_parts(mut self, count: usize) -> Self {
        self.max_parts = Some(count);
        self
    }

    #[must_use]
    pub fn get_max_header_size(&self) -> usize {
        self.max_header_size
    }

    #[must_use]
    pub fn get_max_part_size(&self) -> Option<u64> {
        self.max_part_size
    }

    #[must_use]
    pub fn get_max_parts(&self) -> Option<usize> {
        self.max_parts
    }
}
