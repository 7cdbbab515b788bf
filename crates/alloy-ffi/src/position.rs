use alloy_syntax::{Pos, Position, SourceMap};
use serde::Serialize;

/// Wire form of a source location.
///
/// An invalid record has every other field zeroed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PositionRecord {
    pub filename: String,
    pub offset: u32,
    pub line: u32,
    pub column: u32,
    pub valid: bool,
}

impl From<&Position> for PositionRecord {
    fn from(pos: &Position) -> Self {
        if !pos.is_valid() {
            return Self::default();
        }
        Self {
            filename: pos.filename.clone(),
            offset: pos.offset,
            line: pos.line,
            column: pos.column,
            valid: true,
        }
    }
}

/// Resolve a handle against its source map
pub fn encode_pos(map: &SourceMap, pos: Pos) -> PositionRecord {
    map.position(pos)
        .map(|p| PositionRecord::from(&p))
        .unwrap_or_default()
}
