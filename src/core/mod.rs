//! Core vocabulary shared by the parser, the shape reader and the fusion engine
//!
//! - `namespaces`: namespace URI constants and prebuilt vocabulary terms

pub mod namespaces;

pub use namespaces::{ns, vocab, Vocab};
