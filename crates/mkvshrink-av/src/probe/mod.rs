//! Probing an input and choosing which of its streams to keep.
//!
//! [`run_probe`] shells out to ffprobe and hands the captured listing to a
//! [`ProbeParser`]; a [`StreamSelector`] then picks the streams for the
//! configured language pair.

pub mod ffprobe;
pub mod parser;
pub mod select;

pub use self::ffprobe::run_probe;
pub use self::parser::ProbeParser;
pub use self::select::StreamSelector;
