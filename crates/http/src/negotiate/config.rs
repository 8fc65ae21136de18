/// Settings that shape how response bodies are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingConfig {
    /// Compress bodies with gzip when the client accepts it.
    pub gzip: bool,
    /// gzip level, 0 to 9.
    pub compression_level: u32,
    /// Bytes buffered before a chunk is emitted; 0 sends every write as its own chunk.
    pub chunk_threshold: usize,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self { gzip: false, compression_level: 9, chunk_threshold: 0 }
    }
}

impl EncodingConfig {
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    pub fn with_chunk_threshold(mut self, threshold: usize) -> Self {
        self.chunk_threshold = threshold;
        self
    }
}
