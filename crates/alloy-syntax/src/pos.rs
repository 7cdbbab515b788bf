use std::fmt;

/// An opaque handle to a byte offset in a source file.
///
/// The zero value is [`Pos::NONE`], which stands for "no position". Handles are
/// only meaningful together with the [`SourceMap`] of the text they were
/// produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Pos(u32);

impl Pos {
    pub const NONE: Pos = Pos(0);

    /// Create a handle for a 0-based byte offset
    pub const fn at(offset: u32) -> Self {
        Pos(offset.saturating_add(1))
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// 0-based byte offset, or `None` for [`Pos::NONE`]
    pub const fn offset(self) -> Option<u32> {
        match self.0 {
            0 => None,
            n => Some(n - 1),
        }
    }

    /// Handle `n` bytes further into the file
    pub const fn add(self, n: u32) -> Self {
        match self.0 {
            0 => Pos::NONE,
            base => Pos(base.saturating_add(n)),
        }
    }
}

/// Largest source text whose offsets, end of input included, fit a [`Pos`]
pub const MAX_SOURCE_LEN: usize = u32::MAX as usize - 1;

/// Narrow a byte offset or length, saturating at `u32::MAX`
pub(crate) fn narrow(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// A resolved source location.
///
/// Line and column are 1-based; the column counts bytes. A position with
/// `line == 0` is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub filename: String,
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn is_valid(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.filename.is_empty(), self.is_valid()) {
            (_, false) if self.filename.is_empty() => write!(f, "-"),
            (_, false) => write!(f, "{}", self.filename),
            (true, true) => write!(f, "{}:{}", self.line, self.column),
            (false, true) => write!(f, "{}:{}:{}", self.filename, self.line, self.column),
        }
    }
}

/// Line table for one source text, used to resolve [`Pos`] handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMap {
    filename: String,
    /// Byte offset at which each line starts
    line_starts: Vec<u32>,
    len: u32,
}

impl SourceMap {
    pub fn new(filename: impl Into<String>, text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| narrow(i).saturating_add(1)),
        );
        Self {
            filename: filename.into(),
            line_starts,
            len: narrow(text.len()),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Resolve a handle. Returns `None` for [`Pos::NONE`] and for handles that
    /// point past the end of the text.
    pub fn position(&self, pos: Pos) -> Option<Position> {
        let offset = pos.offset()?;
        if offset > self.len {
            return None;
        }
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        Some(Position {
            filename: self.filename.clone(),
            offset,
            line: narrow(line_idx).saturating_add(1),
            column: offset - self.line_starts[line_idx] + 1,
        })
    }

    /// Resolve a handle, falling back to an invalid [`Position`]
    pub fn resolve(&self, pos: Pos) -> Position {
        self.position(pos).unwrap_or_default()
    }
}
