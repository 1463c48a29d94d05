//! String pool of the scene blob

/// Append-only pool of NUL-terminated strings
///
/// The pool starts with a single NUL, so offset 0 reads as the empty string
/// and is free to mean "none".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringPool {
    bytes: Vec<u8>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    pub fn new() -> Self {
        Self { bytes: vec![0] }
    }

    /// Append `s` and return its offset. Equal strings are not shared.
    pub fn push(&mut self, s: &str) -> u32 {
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        offset
    }

    /// Append `s` if present, 0 otherwise
    pub fn push_opt(&mut self, s: Option<&str>) -> u32 {
        s.map_or(0, |s| self.push(s))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.len() <= 1
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
