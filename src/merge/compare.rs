//! Line comparison and the per-step merge decisions.
//!
//! Everything here is pure: no I/O, no state. The merge controller asks
//! `pick_driver` which candidate to look at, then `decide` what to do with it
//! relative to the last line written.
use std::cmp::Ordering;

use super::core::{MergeOptions, OutputMode};
use super::error::Source;

/// Strip the line terminator, if any. Ordering is defined on line content so
/// that inputs produced by `LC_ALL=C sort` (or `sort -f`) count as sorted.
#[inline]
fn content(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\n') => &line[..line.len() - 1],
        _ => line,
    }
}

/// Compare two lines, optionally ignoring ASCII case.
#[inline]
pub fn compare_lines(a: &[u8], b: &[u8], case_insensitive: bool) -> Ordering {
    let (a, b) = (content(a), content(b));
    if case_insensitive {
        for (&ca, &cb) in a.iter().zip(b.iter()) {
            match ca.to_ascii_lowercase().cmp(&cb.to_ascii_lowercase()) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        a.len().cmp(&b.len())
    } else {
        a.cmp(b)
    }
}

/// Case-sensitive ordering used to break ties between lines that are equal
/// when case is ignored.
#[inline]
pub fn tie_break(a: &[u8], b: &[u8]) -> Ordering {
    compare_lines(a, b, false)
}

/// Which candidate drives the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pick {
    pub driver: Source,
    /// Both candidates compare equal under the active mode.
    pub paired: bool,
}

/// Choose the driving side: the smaller candidate, or on equality the one
/// ordered first case-sensitively. Byte-identical candidates favour the first
/// input.
pub fn pick_driver(first: &[u8], second: &[u8], case_insensitive: bool) -> Pick {
    match compare_lines(first, second, case_insensitive) {
        Ordering::Less => Pick {
            driver: Source::First,
            paired: false,
        },
        Ordering::Greater => Pick {
            driver: Source::Second,
            paired: false,
        },
        Ordering::Equal => {
            let driver = if tie_break(first, second) == Ordering::Greater {
                Source::Second
            } else {
                Source::First
            };
            Pick {
                driver,
                paired: true,
            }
        }
    }
}

/// What to do with the driving candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Emit,
    /// Equal to the last line written in unique mode.
    SkipDuplicate,
    /// Ordered before the last line written; dropped in best-effort mode.
    SkipUnsorted,
    /// Ordered before the last line written with sortedness enforced.
    Reject,
}

impl Decision {
    /// The candidate is dropped without being written.
    #[inline]
    pub fn is_skip(self) -> bool {
        matches!(self, Decision::SkipDuplicate | Decision::SkipUnsorted)
    }
}

/// Decide the fate of `candidate` given the last line written.
pub fn decide(candidate: &[u8], last: Option<&[u8]>, opts: &MergeOptions) -> Decision {
    let Some(last) = last else {
        return Decision::Emit;
    };
    match compare_lines(candidate, last, opts.case_insensitive) {
        Ordering::Greater => Decision::Emit,
        Ordering::Equal => match opts.mode {
            OutputMode::All => Decision::Emit,
            OutputMode::Unique => Decision::SkipDuplicate,
        },
        Ordering::Less if opts.require_sorted => Decision::Reject,
        Ordering::Less => Decision::SkipUnsorted,
    }
}
