//! splits a combined vertex + fragment source into tagged blocks
//!
//! ```glsl
//! //@begin_vert
//! void main() { ... }
//! //@end
//! //@begin_frag
//! void main() { ... }
//! //@end
//! ```

use log::*;
use thiserror::Error;

use crate::shaders::Stage;

const BEGIN_MARKER: &str = "//@begin_";
const END_MARKER: &str = "\n//@end";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("{file}:{line}: '//@begin_{tag}' has no matching '//@end'")]
    Unterminated {
        file: String,
        tag: &'static str,
        line: usize,
    },
    #[error("{file}: tagged blocks overlap or are out of order")]
    Overlap { file: String },
}

/// a byte range of the combined source holding one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceBlock {
    pub stage: Stage,
    pub offset: usize,
    pub length: usize,
}

impl SourceBlock {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.offset..self.end()]
    }

    /// added to line numbers reported relative to the block start
    pub fn line_bias(&self, source: &str) -> usize {
        line_bias(source, self.offset)
    }

    /// maps a 1-based line inside the block to a 1-based line of the whole file
    pub fn remap_line(&self, source: &str, line: usize) -> usize {
        line + self.line_bias(source)
    }
}

pub fn has_tagged_blocks(source: &str) -> bool {
    let line_start_marker = format!("\n{BEGIN_MARKER}");
    source.trim_start().starts_with(BEGIN_MARKER) || source.contains(&line_start_marker)
}

/// what a `//@begin_` at the start of a line opens
#[derive(Debug, PartialEq, Eq)]
enum BeginMarker<'a> {
    Block {
        stage: Stage,
        tag: &'static str,
        body_start: usize,
    },
    UnknownTag(&'a str),
    /// a stage tag followed by more text on the marker line
    TrailingText(&'static str),
}

/// parses the marker at `marker`, also returning where its tag ends
fn parse_begin_marker(source: &str, marker: usize) -> (BeginMarker<'_>, usize) {
    let tag_start = marker + BEGIN_MARKER.len();
    let tag_end = source[tag_start..]
        .find(|c: char| c.is_whitespace())
        .map(|i| tag_start + i)
        .unwrap_or(source.len());

    let (stage, tag) = match &source[tag_start..tag_end] {
        "vert" => (Stage::Vertex, "vert"),
        "frag" => (Stage::Fragment, "frag"),
        unknown => return (BeginMarker::UnknownTag(unknown), tag_end),
    };

    let marker = match line_break_end(source, tag_end) {
        Some(body_start) => BeginMarker::Block {
            stage,
            tag,
            body_start,
        },
        None => BeginMarker::TrailingText(tag),
    };
    (marker, tag_end)
}

pub fn split(file: &str, source: &str) -> Result<Vec<SourceBlock>, SplitError> {
    let mut blocks = vec![];
    let scan_start = source.len() - source.trim_start().len();
    let mut cursor = scan_start;

    while let Some(found) = source[cursor..].find(BEGIN_MARKER) {
        let marker = cursor + found;
        let line = line_bias(source, marker) + 1;

        if marker > scan_start && !source[..marker].ends_with('\n') {
            debug!("{file}:{line}: '{BEGIN_MARKER}' in the middle of a line is not a marker");
            cursor = marker + BEGIN_MARKER.len();
            continue;
        }

        let (stage, tag, body_start) = match parse_begin_marker(source, marker) {
            (
                BeginMarker::Block {
                    stage,
                    tag,
                    body_start,
                },
                _,
            ) => (stage, tag, body_start),
            (BeginMarker::UnknownTag(tag), tag_end) => {
                warn!("{file}:{line}: ignoring unrecognized tag '{BEGIN_MARKER}{tag}'");
                cursor = tag_end;
                continue;
            }
            (BeginMarker::TrailingText(tag), tag_end) => {
                warn!(
                    "{file}:{line}: ignoring '{BEGIN_MARKER}{tag}', the marker must end its line"
                );
                cursor = tag_end;
                continue;
            }
        };

        let Some(body_end) = find_end_marker(source, body_start) else {
            return Err(SplitError::Unterminated {
                file: file.to_string(),
                tag,
                line,
            });
        };

        debug!("{file}: {stage} block at bytes {body_start}..{body_end}");
        blocks.push(SourceBlock {
            stage,
            offset: body_start,
            length: body_end - body_start,
        });

        // body_end points at the '/' of the terminator
        cursor = body_end + END_MARKER.len() - 1;
    }

    validate_blocks(file, &blocks)?;
    Ok(blocks)
}

/// blocks must be in file order and must not overlap
pub fn validate_blocks(file: &str, blocks: &[SourceBlock]) -> Result<(), SplitError> {
    let ordered = blocks.windows(2).all(|pair| pair[0].end() <= pair[1].offset);

    if ordered {
        Ok(())
    } else {
        Err(SplitError::Overlap {
            file: file.to_string(),
        })
    }
}

/// the number of line breaks strictly before `offset`
pub fn line_bias(source: &str, offset: usize) -> usize {
    source.as_bytes()[..offset.min(source.len())]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
}

/// the index just past a "\n" or "\r\n" at `at`
fn line_break_end(source: &str, at: usize) -> Option<usize> {
    let rest = &source[at..];
    if rest.starts_with("\r\n") {
        Some(at + 2)
    } else if rest.starts_with('\n') {
        Some(at + 1)
    } else {
        None
    }
}

/// the end of the block body, which keeps the line break before "//@end"
fn find_end_marker(source: &str, body_start: usize) -> Option<usize> {
    // the marker line's own line break lets an empty body terminate
    let mut search = body_start - 1;

    while let Some(found) = source[search..].find(END_MARKER) {
        let newline = search + found;
        let after = newline + END_MARKER.len();

        let terminated = source[after..]
            .chars()
            .next()
            .is_none_or(|c| c.is_whitespace());
        if terminated {
            return Some((newline + 1).max(body_start));
        }

        search = newline + 1;
    }

    None
}
