//! Key derivation paths
//!
//! Paths use the BIP32 notation with three starting points: `m/...` starts at
//! the master key, `../...` at the parent of the current key and `./...` (or a
//! bare `0/1/...`) at the current key. Segments are decimal indexes below
//! 2^31, hardened with a `'`, `h` or `H` suffix.

use std::{fmt, str::FromStr};

use bytes::{BufMut, Bytes, BytesMut};
use coins_bip32::path::DerivationPath;
use derive_more::Display;

use crate::Error;

/// Deepest path the applet derives
pub const MAX_DEPTH: usize = 10;

/// Offset of hardened indexes
pub const HARDENED: u32 = 0x8000_0000;

/// Where derivation starts (P1 bits 6 and 7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PathSource {
    /// The master key
    #[display("m")]
    Master,
    /// The parent of the current key
    #[display("..")]
    Parent,
    /// The current key
    #[display(".")]
    Current,
}

impl PathSource {
    /// P1 bits selecting this starting point
    pub const fn p1(self) -> u8 {
        match self {
            Self::Master => 0x00,
            Self::Parent => 0x40,
            Self::Current => 0x80,
        }
    }
}

/// A parsed derivation path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    source: PathSource,
    segments: Vec<u32>,
}

impl KeyPath {
    /// Path from raw parts; fails when deeper than [`MAX_DEPTH`]
    pub fn new(source: PathSource, segments: Vec<u32>) -> Result<Self, Error> {
        if segments.len() > MAX_DEPTH {
            return Err(Error::InvalidDerivationPath(format!(
                "path has {} segments, at most {MAX_DEPTH} allowed",
                segments.len()
            )));
        }
        Ok(Self { source, segments })
    }

    /// The master key itself
    pub const fn master() -> Self {
        Self {
            source: PathSource::Master,
            segments: Vec::new(),
        }
    }

    /// Starting point
    pub const fn source(&self) -> PathSource {
        self.source
    }

    /// Derivation indexes, hardened ones offset by [`HARDENED`]
    pub fn segments(&self) -> &[u32] {
        &self.segments
    }

    /// Whether the path starts at the master key
    pub const fn is_absolute(&self) -> bool {
        matches!(self.source, PathSource::Master)
    }

    /// Segments as big-endian words, the encoding every path-taking command uses
    pub fn to_bytes(&self) -> Bytes {
        let mut data = BytesMut::with_capacity(self.segments.len() * 4);
        for segment in &self.segments {
            data.put_u32(*segment);
        }
        data.freeze()
    }

    /// Decode the big-endian words returned by GET STATUS; always absolute
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() % 4 != 0 {
            return Err(Error::InvalidData("key path length must be a multiple of 4"));
        }
        let segments = data
            .chunks_exact(4)
            .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Self::new(PathSource::Master, segments)
    }
}

fn parse_segment(segment: &str) -> Result<u32, Error> {
    let invalid = || Error::InvalidDerivationPath(format!("invalid segment {segment:?}"));

    let (digits, hardened) = match segment.strip_suffix(['\'', 'h', 'H']) {
        Some(digits) => (digits, true),
        None => (segment, false),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let index: u32 = digits.parse().map_err(|_| invalid())?;
    if index >= HARDENED {
        return Err(invalid());
    }

    Ok(if hardened { index | HARDENED } else { index })
}

impl FromStr for KeyPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('/').peekable();

        let source = match parts.peek().copied() {
            Some("m") => PathSource::Master,
            Some("..") => PathSource::Parent,
            Some(".") => PathSource::Current,
            Some("") | None => {
                return Err(Error::InvalidDerivationPath("empty path".to_string()));
            }
            Some(_) => {
                // bare segments are relative to the current key
                let segments = parts.map(parse_segment).collect::<Result<_, _>>()?;
                return Self::new(PathSource::Current, segments);
            }
        };
        parts.next();

        let segments = parts.map(parse_segment).collect::<Result<_, _>>()?;
        Self::new(source, segments)
    }
}

impl TryFrom<&str> for KeyPath {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)?;
        for segment in &self.segments {
            if segment & HARDENED != 0 {
                write!(f, "/{}'", segment & !HARDENED)?;
            } else {
                write!(f, "/{segment}")?;
            }
        }
        Ok(())
    }
}

impl TryFrom<&DerivationPath> for KeyPath {
    type Error = Error;

    fn try_from(path: &DerivationPath) -> Result<Self, Self::Error> {
        Self::new(PathSource::Master, path.iter().copied().collect())
    }
}

impl From<&KeyPath> for DerivationPath {
    fn from(path: &KeyPath) -> Self {
        path.segments.iter().copied().collect()
    }
}
