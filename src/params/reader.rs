//! Lazy line reader for experiment lists.

use std::io::{self, BufRead, Lines};

use super::ParameterSet;

/// Drops comment lines and commented blocks.
///
/// One filter per read: the block flag must never leak between inputs.
#[derive(Debug, Default)]
pub struct CommentFilter {
    in_block: bool,
}

impl CommentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `line` (already trimmed) carries an experiment.
    pub fn keep(&mut self, line: &str) -> bool {
        if line.is_empty() || line.starts_with('#') {
            return false;
        }
        if line.starts_with("==") {
            self.in_block = !self.in_block;
            return false;
        }
        !self.in_block
    }
}

/// Single-pass iterator over the parameter sets of an input.
///
/// Lines are read and parsed on demand.
pub struct Entries<R> {
    lines: Lines<R>,
    filter: CommentFilter,
}

impl<R: BufRead> Iterator for Entries<R> {
    type Item = io::Result<ParameterSet>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            let line = line.trim();
            if !self.filter.keep(line) {
                continue;
            }
            // Kept lines are non-empty, so a name is always present.
            if let Ok(params) = ParameterSet::parse(line) {
                return Some(Ok(params));
            }
        }
    }
}

/// Read every experiment entry from `reader`.
pub fn read<R: BufRead>(reader: R) -> Entries<R> {
    Entries {
        lines: reader.lines(),
        filter: CommentFilter::new(),
    }
}
