//! Streaming two-way merge of sorted line inputs.
//!
//! One candidate line is held per input. Each step picks the driving side
//! (see `compare::pick_driver`), decides whether its candidate is written
//! (see `compare::decide`), and pulls the next line only from the side(s)
//! that were consumed. When one input runs out the other is drained through
//! the same decision rule.
use std::io::{Read, Write};

use tracing::{debug, warn};

use super::compare::{Decision, decide, pick_driver};
use super::error::{MergeError, Result, Source};
use super::reader::LineReader;
use super::writer::LineWriter;
use crate::common::page_size;

/// Which lines of the merged sequence are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Drop lines equal to the last line written.
    Unique,
    /// Keep every line of both inputs.
    All,
}

impl OutputMode {
    /// Build the mode from a pair of flags, exactly one of which must be set.
    pub fn from_flags(unique: bool, all: bool) -> Result<Self> {
        match (unique, all) {
            (true, false) => Ok(OutputMode::Unique),
            (false, true) => Ok(OutputMode::All),
            (true, true) => Err(MergeError::InvalidArguments(
                "unique and all output modes are mutually exclusive".to_string(),
            )),
            (false, false) => Err(MergeError::InvalidArguments(
                "one of unique or all output mode is required".to_string(),
            )),
        }
    }
}

/// Configuration for a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    pub mode: OutputMode,
    pub case_insensitive: bool,
    /// Fail with `NotSorted` instead of skipping out-of-order lines.
    pub require_sorted: bool,
    /// Report the number of lines written.
    pub count_lines: bool,
    /// Read window per input in bytes; the output buffer is twice this.
    pub window_size: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            mode: OutputMode::All,
            case_insensitive: false,
            require_sorted: false,
            count_lines: false,
            window_size: default_window_size(),
        }
    }
}

/// Two pages per input.
pub fn default_window_size() -> usize {
    2 * page_size()
}

/// Counters collected over one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub first_lines: u64,
    pub second_lines: u64,
    pub lines_written: u64,
    pub bytes_written: u64,
    pub duplicates_skipped: u64,
    pub unsorted_skipped: u64,
}

/// Merge state for one invocation. Owns both readers, the writer and the
/// last line written.
pub struct Merger<A: Read, B: Read, W: Write> {
    first: LineReader<A>,
    second: LineReader<B>,
    out: LineWriter<W>,
    opts: MergeOptions,
    line1: Vec<u8>,
    line2: Vec<u8>,
    /// `None` until the first line is written; distinct from an empty line.
    last: Option<Vec<u8>>,
    duplicates_skipped: u64,
    unsorted_skipped: u64,
}

impl<A: Read, B: Read, W: Write> Merger<A, B, W> {
    pub fn new(first: A, second: B, out: W, opts: &MergeOptions) -> Self {
        let window = opts.window_size.max(1);
        Self {
            first: LineReader::new(first, window),
            second: LineReader::new(second, window),
            out: LineWriter::new(out, window.saturating_mul(2)),
            opts: *opts,
            line1: Vec::with_capacity(256),
            line2: Vec::with_capacity(256),
            last: None,
            duplicates_skipped: 0,
            unsorted_skipped: 0,
        }
    }

    /// Run to completion, flush the writer, and return the sink.
    pub fn run(mut self) -> Result<(MergeStats, W)> {
        debug!(
            mode = ?self.opts.mode,
            case_insensitive = self.opts.case_insensitive,
            require_sorted = self.opts.require_sorted,
            window = self.first.capacity(),
            "merge started"
        );

        let mut live1 = self.advance(Source::First)?;
        let mut live2 = self.advance(Source::Second)?;

        while live1 && live2 {
            let pick = pick_driver(&self.line1, &self.line2, self.opts.case_insensitive);
            let decision = decide(
                self.candidate(pick.driver),
                self.last.as_deref(),
                &self.opts,
            );
            self.apply(pick.driver, decision)?;

            if pick.paired && decision.is_skip() {
                // The other candidate is equal and would be dropped the same way.
                self.skip_paired(decision);
                live1 = self.advance(Source::First)?;
                live2 = self.advance(Source::Second)?;
            } else if pick.driver == Source::First {
                live1 = self.advance(Source::First)?;
            } else {
                live2 = self.advance(Source::Second)?;
            }
        }

        if live1 {
            debug!(remaining = %Source::First, "second input exhausted, draining");
            self.drain(Source::First)?;
        } else if live2 {
            debug!(remaining = %Source::Second, "first input exhausted, draining");
            self.drain(Source::Second)?;
        }

        let stats = MergeStats {
            first_lines: self.first.lines_read(),
            second_lines: self.second.lines_read(),
            lines_written: self.out.lines_written(),
            bytes_written: self.out.bytes_written(),
            duplicates_skipped: self.duplicates_skipped,
            unsorted_skipped: self.unsorted_skipped,
        };
        let sink = self.out.finish()?;
        debug!(?stats, "merge finished");
        Ok((stats, sink))
    }

    /// Write out the remaining lines of `side` after the other input ended.
    fn drain(&mut self, side: Source) -> Result<()> {
        loop {
            let decision = decide(self.candidate(side), self.last.as_deref(), &self.opts);
            self.apply(side, decision)?;
            if !self.advance(side)? {
                return Ok(());
            }
        }
    }

    #[inline]
    fn candidate(&self, side: Source) -> &[u8] {
        match side {
            Source::First => &self.line1,
            Source::Second => &self.line2,
        }
    }

    fn reader_line(&self, side: Source) -> u64 {
        match side {
            Source::First => self.first.lines_read(),
            Source::Second => self.second.lines_read(),
        }
    }

    /// Load the next candidate for `side`; `false` once that input is exhausted.
    fn advance(&mut self, side: Source) -> Result<bool> {
        let more = match side {
            Source::First => self.first.take_line(&mut self.line1),
            Source::Second => self.second.take_line(&mut self.line2),
        };
        more.map_err(|source| MergeError::Read { input: side, source })
    }

    fn apply(&mut self, side: Source, decision: Decision) -> Result<()> {
        match decision {
            Decision::Emit => self.emit(side)?,
            Decision::SkipDuplicate => self.duplicates_skipped += 1,
            Decision::SkipUnsorted => {
                self.unsorted_skipped += 1;
                warn!(
                    input = %side,
                    line = self.reader_line(side),
                    "line out of order, skipped"
                );
            }
            Decision::Reject => {
                return Err(MergeError::NotSorted {
                    input: side,
                    line: self.reader_line(side),
                });
            }
        }
        Ok(())
    }

    fn skip_paired(&mut self, decision: Decision) {
        match decision {
            Decision::SkipDuplicate => self.duplicates_skipped += 1,
            Decision::SkipUnsorted => self.unsorted_skipped += 1,
            Decision::Emit | Decision::Reject => {}
        }
    }

    /// Write the candidate of `side` and remember it as the last line written.
    fn emit(&mut self, side: Source) -> Result<()> {
        let line = match side {
            Source::First => &self.line1,
            Source::Second => &self.line2,
        };
        self.out.emit(line)?;
        let last = self.last.get_or_insert_with(Vec::new);
        last.clear();
        last.extend_from_slice(line);
        Ok(())
    }
}

/// Merge two sorted streams into `out`.
pub fn merge_streams<A: Read, B: Read, W: Write>(
    first: A,
    second: B,
    out: W,
    opts: &MergeOptions,
) -> Result<MergeStats> {
    let (stats, _) = Merger::new(first, second, out, opts).run()?;
    Ok(stats)
}
