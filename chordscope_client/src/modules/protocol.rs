pub use chordscope_protocol::*;
