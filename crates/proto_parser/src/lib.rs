pub mod source;
pub mod syntax;

pub use source::{Source, SourceFile};
pub use syntax::*;
