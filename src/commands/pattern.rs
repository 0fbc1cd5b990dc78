use bytes::Bytes;
use regex::bytes::Regex;

/// A SCAN MATCH glob. `*` matches any run of bytes, every other byte
/// matches only itself.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: Bytes,
    regex: Regex,
}

impl GlobPattern {
    pub fn new(source: Bytes) -> Result<Self, regex::Error> {
        let mut expr = String::with_capacity(source.len() * 4 + 12);
        expr.push_str(r"(?s-u)\A");
        for &b in source.iter() {
            if b == b'*' {
                expr.push_str(".*");
            } else {
                expr.push_str(&format!(r"\x{:02X}", b));
            }
        }
        expr.push_str(r"\z");

        let regex = Regex::new(&expr)?;
        Ok(Self { source, regex })
    }

    /// True when the pattern accepts every key.
    pub fn is_match_all(&self) -> bool {
        !self.source.is_empty() && self.source.iter().all(|&b| b == b'*')
    }

    pub fn is_match(&self, key: &[u8]) -> bool {
        self.regex.is_match(key)
    }
}

impl PartialEq for GlobPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for GlobPattern {}
