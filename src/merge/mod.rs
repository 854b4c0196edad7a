pub mod commit;
pub mod compare;
pub mod core;
pub mod error;
pub mod reader;
pub mod request;
pub mod writer;


pub use self::commit::PendingOutput;
pub use self::compare::{Decision, Pick, compare_lines, decide, pick_driver, tie_break};
pub use self::core::*;
pub use self::error::{MergeError, Result, Source};
pub use self::reader::LineReader;
pub use self::request::{MergeRequest, MergeSummary, merge_files};
pub use self::writer::LineWriter;
