mod ast;
mod cursor;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{tokenize, Keyword, Token, TokenKind};
pub use parser::{ParseError, ParseResult, Parser};
