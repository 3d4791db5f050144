use phf::phf_map;

use crate::syntax::cursor::Cursor;

use super::cursor::EOF_CHAR;

static KEYWORD: phf::Map<&'static str, Keyword> = phf_map! {
    "syntax" => Keyword::Syntax,
    "import" => Keyword::Import,
    "weak" => Keyword::Weak,
    "public" => Keyword::Public,
    "package" => Keyword::Package,
    "option" => Keyword::Option,
    "inf" => Keyword::Inf,
    "repeated" => Keyword::Repeated,
    "optional" => Keyword::Optional,
    "required" => Keyword::Required,
    "bool" => Keyword::Bool,
    "string" => Keyword::String,
    "bytes" => Keyword::Bytes,
    "float" => Keyword::Float,
    "double" => Keyword::Double,
    "int32" => Keyword::Int32,
    "int64" => Keyword::Int64,
    "uint32" => Keyword::Uint32,
    "uint64" => Keyword::Uint64,
    "sint32" => Keyword::Sint32,
    "sint64" => Keyword::Sint64,
    "fixed32" => Keyword::Fixed32,
    "fixed64" => Keyword::Fixed64,
    "sfixed32" => Keyword::SFixed32,
    "sfixed64" => Keyword::SFixed64,
    "group" => Keyword::Group,
    "oneof" => Keyword::Oneof,
    "map" => Keyword::Map,
    "extensions" => Keyword::Extensions,
    "to" => Keyword::To,
    "max" => Keyword::Max,
    "reserved" => Keyword::Reserved,
    "enum" => Keyword::Enum,
    "message" => Keyword::Message,
    "extend" => Keyword::Extend,
    "service" => Keyword::Service,
    "rpc" => Keyword::Rpc,
    "stream" => Keyword::Stream,
    "returns" => Keyword::Returns,
};

static OPERATORS: phf::Map<char, TokenKind> = phf_map! {
    ';' => TokenKind::SemiColon,
    ',' => TokenKind::Comma,
    '.' => TokenKind::Dot,
    '/' => TokenKind::Slash,
    ':' => TokenKind::Colon,
    '=' => TokenKind::Equals,
    '-' => TokenKind::Minus,
    '+' => TokenKind::Plus,
    '(' => TokenKind::LParen,
    ')' => TokenKind::RParen,
    '{' => TokenKind::LBrace,
    '}' => TokenKind::RBrace,
    '[' => TokenKind::LBracket,
    ']' => TokenKind::RBracket,
    '<' => TokenKind::LAngle,
    '>' => TokenKind::RAngle,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Keyword {
    Syntax,
    Import,
    Weak,
    Public,
    Package,
    Option,
    Inf,
    Repeated,
    Optional,
    Required,
    Bool,
    String,
    Bytes,
    Float,
    Double,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    SFixed32,
    SFixed64,
    Group,
    Oneof,
    Map,
    Extensions,
    To,
    Max,
    Reserved,
    Enum,
    Message,
    Extend,
    Service,
    Rpc,
    Stream,
    Returns,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    IntLiteral,
    FloatLiteral,
    String,
    SemiColon,
    Comma,
    Dot,
    Slash,
    Colon,
    Equals,
    Minus,
    Plus,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LAngle,
    RAngle,
    Identifier,
    Keyword(Keyword),
    LineComment,
    BlockComment,
    NewLine,
    Unknown,
    Eof,
}

impl Keyword {
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Keyword::String
                | Keyword::Bool
                | Keyword::Bytes
                | Keyword::Float
                | Keyword::Double
                | Keyword::Int32
                | Keyword::Int64
                | Keyword::Uint32
                | Keyword::Uint64
                | Keyword::Sint32
                | Keyword::Sint64
                | Keyword::Fixed32
                | Keyword::Fixed64
                | Keyword::SFixed32
                | Keyword::SFixed64
        )
    }

    pub fn is_map_key_type(&self) -> bool {
        matches!(
            self,
            Keyword::Int32
                | Keyword::Int64
                | Keyword::Uint32
                | Keyword::Uint64
                | Keyword::Sint32
                | Keyword::Sint64
                | Keyword::Fixed32
                | Keyword::Fixed64
                | Keyword::SFixed32
                | Keyword::SFixed64
                | Keyword::Bool
                | Keyword::String
        )
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    pub value: String,
    pub kind: TokenKind,
    pub position: usize,
}

pub fn tokenize(input: &str) -> impl Iterator<Item = Token> + '_ {
    let mut cursor = Cursor::new(input);

    std::iter::from_fn(move || {
        if cursor.is_eof() {
            None
        } else {
            cursor.reset_len_consumed();
            Some(cursor.advance_token())
        }
    })
}

impl Cursor<'_> {
    fn advance_token(&mut self) -> Token {
        let pos = self.current_pos();
        let c = self.bump().unwrap_or(EOF_CHAR);

        match c {
            '/' => match self.first() {
                '/' => self.line_comment(pos),
                '*' => self.block_comment(pos),
                _ => Token {
                    value: c.to_string(),
                    kind: TokenKind::Slash,
                    position: pos,
                },
            },
            c @ '_' => self.identifier_or_keyword(c, pos),
            c if c.is_ascii_alphabetic() => self.identifier_or_keyword(c, pos),
            c if c.is_whitespace() => self.whitespace(c, pos),
            c if c.is_ascii_digit() => self.numeric_literal(c, pos),
            '.' if self.first().is_ascii_digit() => self.numeric_literal(c, pos),
            c @ '"' | c @ '\'' => self.string(c, pos),
            EOF_CHAR if self.is_eof() => Token {
                value: String::new(),
                kind: TokenKind::Eof,
                position: pos,
            },
            c => match OPERATORS.get(&c) {
                Some(kind) => Token {
                    value: c.to_string(),
                    kind: *kind,
                    position: pos,
                },
                None => Token {
                    value: c.to_string(),
                    kind: TokenKind::Unknown,
                    position: pos,
                },
            },
        }
    }

    fn whitespace(&mut self, c: char, pos: usize) -> Token {
        match c {
            '\n' => Token {
                value: c.to_string(),
                kind: TokenKind::NewLine,
                position: pos,
            },
            '\r' if self.first() == '\n' => {
                self.bump();
                Token {
                    value: "\r\n".to_string(),
                    kind: TokenKind::NewLine,
                    position: pos,
                }
            }
            '\r' => Token {
                value: c.to_string(),
                kind: TokenKind::Unknown,
                position: pos,
            },
            _ => {
                self.reset_len_consumed();
                self.advance_token()
            }
        }
    }

    /// Quoted string literal. The token value keeps the quotes and any escape
    /// sequences verbatim; an unterminated literal becomes an `Unknown` token.
    fn string(&mut self, quote: char, pos: usize) -> Token {
        let mut value = quote.to_string();

        loop {
            match self.bump() {
                Some('\\') => {
                    value.push('\\');
                    if let Some(escaped) = self.bump() {
                        value.push(escaped);
                    }
                }
                Some('\n') | None => {
                    return Token {
                        value,
                        kind: TokenKind::Unknown,
                        position: pos,
                    };
                }
                Some(c) if c == quote => {
                    value.push(c);
                    break;
                }
                Some(c) => value.push(c),
            }
        }

        Token {
            value,
            kind: TokenKind::String,
            position: pos,
        }
    }

    fn numeric_literal(&mut self, c: char, pos: usize) -> Token {
        let mut value = c.to_string();
        let mut next = self.first();

        while next.is_ascii_digit()
            || next == '.'
            || next.is_ascii_alphabetic()
            || ((next == '+' || next == '-') && value.ends_with(['e', 'E']) && !is_hex(&value))
        {
            if let Some(c) = self.bump() {
                value.push(c);
            }
            next = self.first();
        }

        Token {
            kind: classify_number(&value),
            value,
            position: pos,
        }
    }

    fn identifier_or_keyword(&mut self, c: char, pos: usize) -> Token {
        let mut value = c.to_string();

        while self.first().is_ascii_alphanumeric() || self.first() == '_' {
            if let Some(c) = self.bump() {
                value.push(c);
            }
        }

        match KEYWORD.get(&value) {
            Some(keyword) => Token {
                value,
                kind: TokenKind::Keyword(*keyword),
                position: pos,
            },
            None => Token {
                value,
                kind: TokenKind::Identifier,
                position: pos,
            },
        }
    }

    fn line_comment(&mut self, pos: usize) -> Token {
        let mut value = String::new();

        while !matches!(self.first(), '\n' | '\r') && !self.is_eof() {
            if let Some(c) = self.bump() {
                value.push(c);
            }
        }

        Token {
            value: format!("/{value}"),
            kind: TokenKind::LineComment,
            position: pos,
        }
    }

    fn block_comment(&mut self, pos: usize) -> Token {
        let mut value = String::from("/");

        // opening '*'
        if let Some(c) = self.bump() {
            value.push(c);
        }

        loop {
            match self.bump() {
                Some('*') if self.first() == '/' => {
                    self.bump();
                    value.push_str("*/");
                    break;
                }
                Some(c) => value.push(c),
                None => {
                    return Token {
                        value,
                        kind: TokenKind::Unknown,
                        position: pos,
                    };
                }
            }
        }

        Token {
            value,
            kind: TokenKind::BlockComment,
            position: pos,
        }
    }
}

fn is_hex(value: &str) -> bool {
    value.starts_with("0x") || value.starts_with("0X")
}

fn classify_number(value: &str) -> TokenKind {
    if is_hex(value) {
        return if value.len() > 2 && value[2..].chars().all(|c| c.is_ascii_hexdigit()) {
            TokenKind::IntLiteral
        } else {
            TokenKind::Unknown
        };
    }

    if !value.contains(['.', 'e', 'E']) {
        let mut chars = value.chars();
        return match (chars.next(), chars.clone().next()) {
            (Some('0'), Some(_)) if chars.all(|c| c.is_digit(8)) => TokenKind::IntLiteral,
            (Some('0'), Some(_)) => TokenKind::Unknown,
            _ if value.chars().all(|c| c.is_ascii_digit()) => TokenKind::IntLiteral,
            _ => TokenKind::Unknown,
        };
    }

    let (mantissa, exponent) = match value.find(['e', 'E']) {
        Some(idx) => (&value[..idx], Some(&value[idx + 1..])),
        None => (value, None),
    };

    let mut points = 0;
    let mut digits = 0;
    for c in mantissa.chars() {
        match c {
            '.' => points += 1,
            c if c.is_ascii_digit() => digits += 1,
            _ => return TokenKind::Unknown,
        }
    }
    if points > 1 || digits == 0 {
        return TokenKind::Unknown;
    }

    if let Some(exponent) = exponent {
        let exponent = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        if exponent.is_empty() || !exponent.chars().all(|c| c.is_ascii_digit()) {
            return TokenKind::Unknown;
        }
    }

    TokenKind::FloatLiteral
}

#[cfg(test)]
mod tests {
    use super::{tokenize, Keyword, Token, TokenKind};

    #[test]
    fn double_quoted_string() {
        let input = r#""hello""#;

        let expected_tokens = vec![Token {
            value: r#""hello""#.to_string(),
            kind: TokenKind::String,
            position: 0,
        }];

        let actual_tokens: Vec<Token> = tokenize(input).collect();

        assert_eq!(expected_tokens.len(), actual_tokens.len());

        expected_tokens
            .iter()
            .zip(actual_tokens)
            .for_each(|(e, a)| {
                assert_eq!(e, &a);
            });
    }

    #[test]
    fn new_lines() {
        let inputs = vec![
            ("\r\n", TokenKind::NewLine),
            ("\n", TokenKind::NewLine),
            ("\r", TokenKind::Unknown),
        ];

        for (input, expected_kind) in inputs {
            let expected_tokens = vec![Token {
                value: input.to_string(),
                kind: expected_kind,
                position: 0,
            }];

            let actual_tokens: Vec<Token> = tokenize(input).collect();

            assert_eq!(expected_tokens.len(), actual_tokens.len());

            expected_tokens
                .iter()
                .zip(actual_tokens)
                .for_each(|(e, a)| {
                    assert_eq!(e, &a);
                });
        }
    }

    #[test]
    fn numeric_literal() {
        let inputs = vec![
            ("0", TokenKind::IntLiteral),
            ("1234", TokenKind::IntLiteral),
            ("0741", TokenKind::IntLiteral),
            ("0781", TokenKind::Unknown),
            ("0x0f6db2", TokenKind::IntLiteral),
            ("0X0f6db2", TokenKind::IntLiteral),
            ("0.0", TokenKind::FloatLiteral),
            ("1.", TokenKind::FloatLiteral),
            (".123", TokenKind::FloatLiteral),
            ("555.555", TokenKind::FloatLiteral),
            ("1.234e-12", TokenKind::FloatLiteral),
            (".953e20", TokenKind::FloatLiteral),
            ("5E+40", TokenKind::FloatLiteral),
        ];

        for (input, expected_kind) in inputs {
            let expected_tokens = vec![Token {
                value: input.to_string(),
                kind: expected_kind,
                position: 0,
            }];

            let actual_tokens: Vec<Token> = tokenize(input).collect();

            assert_eq!(
                expected_tokens.len(),
                actual_tokens.len(),
                "expected = {:?}, actual = {:?}",
                expected_tokens,
                actual_tokens
            );

            expected_tokens
                .iter()
                .zip(actual_tokens)
                .for_each(|(e, a)| {
                    assert_eq!(e, &a);
                });
        }
    }

    #[test]
    pub fn keywords() {
        let input = vec![
            ("syntax", Keyword::Syntax),
            ("import", Keyword::Import),
            ("package", Keyword::Package),
            ("option", Keyword::Option),
            ("message", Keyword::Message),
            ("enum", Keyword::Enum),
            ("service", Keyword::Service),
            ("rpc", Keyword::Rpc),
            ("returns", Keyword::Returns),
            ("extend", Keyword::Extend),
            ("extensions", Keyword::Extensions),
            ("reserved", Keyword::Reserved),
            ("to", Keyword::To),
            ("max", Keyword::Max),
            ("weak", Keyword::Weak),
            ("repeated", Keyword::Repeated),
            ("map", Keyword::Map),
            ("oneof", Keyword::Oneof),
            ("group", Keyword::Group),
            ("required", Keyword::Required),
            ("optional", Keyword::Optional),
            ("double", Keyword::Double),
            ("float", Keyword::Float),
            ("int32", Keyword::Int32),
            ("int64", Keyword::Int64),
            ("uint32", Keyword::Uint32),
            ("uint64", Keyword::Uint64),
            ("sint32", Keyword::Sint32),
            ("sint64", Keyword::Sint64),
            ("fixed32", Keyword::Fixed32),
            ("fixed64", Keyword::Fixed64),
            ("sfixed32", Keyword::SFixed32),
            ("sfixed64", Keyword::SFixed64),
            ("bool", Keyword::Bool),
            ("string", Keyword::String),
            ("bytes", Keyword::Bytes),
            ("stream", Keyword::Stream),
            ("inf", Keyword::Inf),
            ("public", Keyword::Public),
        ];

        for (input, expected_kind) in input {
            let expected_tokens = vec![Token {
                value: input.to_string(),
                kind: TokenKind::Keyword(expected_kind),
                position: 0,
            }];

            let actual_tokens: Vec<Token> = tokenize(input).collect();

            assert_eq!(
                expected_tokens.len(),
                actual_tokens.len(),
                "expected = {:?}, actual = {:?}",
                expected_tokens,
                actual_tokens
            );

            expected_tokens
                .iter()
                .zip(actual_tokens)
                .for_each(|(e, a)| {
                    assert_eq!(e, &a);
                });
        }
    }

    #[test]
    fn operators() {
        let input = vec![
            (';', TokenKind::SemiColon),
            (',', TokenKind::Comma),
            ('=', TokenKind::Equals),
            ('{', TokenKind::LBrace),
            ('}', TokenKind::RBrace),
            ('[', TokenKind::LBracket),
            (']', TokenKind::RBracket),
            ('(', TokenKind::LParen),
            (')', TokenKind::RParen),
            ('<', TokenKind::LAngle),
            ('>', TokenKind::RAngle),
            (':', TokenKind::Colon),
            ('.', TokenKind::Dot),
            ('+', TokenKind::Plus),
            ('-', TokenKind::Minus),
            ('/', TokenKind::Slash),
        ];

        for (input, expected_kind) in input {
            let expected_tokens = vec![Token {
                value: input.to_string(),
                kind: expected_kind,
                position: 0,
            }];

            let actual_tokens: Vec<Token> = tokenize(&input.to_string()).collect();

            assert_eq!(
                expected_tokens.len(),
                actual_tokens.len(),
                "expected = {:?}, actual = {:?}",
                expected_tokens,
                actual_tokens
            );

            expected_tokens
                .iter()
                .zip(actual_tokens)
                .for_each(|(e, a)| {
                    assert_eq!(e, &a);
                });
        }
    }

    #[test]
    fn combinations() {
        let input: &[(&str, &[Token])] = &[
            (
                "syntax = \"proto3\";",
                &[
                    Token {
                        value: "syntax".to_string(),
                        kind: TokenKind::Keyword(Keyword::Syntax),
                        position: 0,
                    },
                    Token {
                        value: "=".to_string(),
                        kind: TokenKind::Equals,
                        position: 7,
                    },
                    Token {
                        value: "\"proto3\"".to_string(),
                        kind: TokenKind::String,
                        position: 9,
                    },
                    Token {
                        value: ";".to_string(),
                        kind: TokenKind::SemiColon,
                        position: 17,
                    },
                ],
            ),
            (
                "message Foo {",
                &[
                    Token {
                        value: "message".to_string(),
                        kind: TokenKind::Keyword(Keyword::Message),
                        position: 0,
                    },
                    Token {
                        value: "Foo".to_string(),
                        kind: TokenKind::Identifier,
                        position: 8,
                    },
                    Token {
                        value: "{".to_string(),
                        kind: TokenKind::LBrace,
                        position: 12,
                    },
                ],
            ),
            (
                "message Foo { optional int32 bar = 1; }",
                &[
                    Token {
                        value: "message".to_string(),
                        kind: TokenKind::Keyword(Keyword::Message),
                        position: 0,
                    },
                    Token {
                        value: "Foo".to_string(),
                        kind: TokenKind::Identifier,
                        position: 8,
                    },
                    Token {
                        value: "{".to_string(),
                        kind: TokenKind::LBrace,
                        position: 12,
                    },
                    Token {
                        value: "optional".to_string(),
                        kind: TokenKind::Keyword(Keyword::Optional),
                        position: 14,
                    },
                    Token {
                        value: "int32".to_string(),
                        kind: TokenKind::Keyword(Keyword::Int32),
                        position: 23,
                    },
                    Token {
                        value: "bar".to_string(),
                        kind: TokenKind::Identifier,
                        position: 29,
                    },
                    Token {
                        value: "=".to_string(),
                        kind: TokenKind::Equals,
                        position: 33,
                    },
                    Token {
                        value: "1".to_string(),
                        kind: TokenKind::IntLiteral,
                        position: 35,
                    },
                    Token {
                        value: ";".to_string(),
                        kind: TokenKind::SemiColon,
                        position: 36,
                    },
                    Token {
                        value: "}".to_string(),
                        kind: TokenKind::RBrace,
                        position: 38,
                    },
                ],
            ),
            (
                "message Foo { optional int32 bar = 1; optional int32 baz = 2; }",
                &[
                    Token {
                        value: "message".to_string(),
                        kind: TokenKind::Keyword(Keyword::Message),
                        position: 0,
                    },
                    Token {
                        value: "Foo".to_string(),
                        kind: TokenKind::Identifier,
                        position: 8,
                    },
                    Token {
                        value: "{".to_string(),
                        kind: TokenKind::LBrace,
                        position: 12,
                    },
                    Token {
                        value: "optional".to_string(),
                        kind: TokenKind::Keyword(Keyword::Optional),
                        position: 14,
                    },
                    Token {
                        value: "int32".to_string(),
                        kind: TokenKind::Keyword(Keyword::Int32),
                        position: 23,
                    },
                    Token {
                        value: "bar".to_string(),
                        kind: TokenKind::Identifier,
                        position: 29,
                    },
                    Token {
                        value: "=".to_string(),
                        kind: TokenKind::Equals,
                        position: 33,
                    },
                    Token {
                        value: "1".to_string(),
                        kind: TokenKind::IntLiteral,
                        position: 35,
                    },
                    Token {
                        value: ";".to_string(),
                        kind: TokenKind::SemiColon,
                        position: 36,
                    },
                    Token {
                        value: "optional".to_string(),
                        kind: TokenKind::Keyword(Keyword::Optional),
                        position: 38,
                    },
                    Token {
                        value: "int32".to_string(),
                        kind: TokenKind::Keyword(Keyword::Int32),
                        position: 47,
                    },
                    Token {
                        value: "baz".to_string(),
                        kind: TokenKind::Identifier,
                        position: 53,
                    },
                    Token {
                        value: "=".to_string(),
                        kind: TokenKind::Equals,
                        position: 57,
                    },
                    Token {
                        value: "2".to_string(),
                        kind: TokenKind::IntLiteral,
                        position: 59,
                    },
                    Token {
                        value: ";".to_string(),
                        kind: TokenKind::SemiColon,
                        position: 60,
                    },
                    Token {
                        value: "}".to_string(),
                        kind: TokenKind::RBrace,
                        position: 62,
                    },
                ],
            ),
        ];

        for (input, expected_tokens) in input {
            let actual_tokens: Vec<Token> = tokenize(&input.to_string()).collect();

            assert_eq!(
                expected_tokens.len(),
                actual_tokens.len(),
                "expected = {:?}, actual = {:?}",
                expected_tokens,
                actual_tokens
            );

            expected_tokens
                .iter()
                .zip(actual_tokens)
                .for_each(|(e, a)| {
                    assert_eq!(e, &a);
                });
        }
    }

    #[test]
    fn comments() {
        let input = "// line\n/* block\n comment */syntax";

        let kinds: Vec<TokenKind> = tokenize(input).map(|t| t.kind).collect();

        assert_eq!(
            kinds,
            vec![
                TokenKind::LineComment,
                TokenKind::NewLine,
                TokenKind::BlockComment,
                TokenKind::Keyword(Keyword::Syntax),
            ]
        );
    }

    #[test]
    fn string_escapes_and_unterminated() {
        let tokens: Vec<Token> = tokenize(r#"'it\'s' "open"#).collect();

        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].value, r#"'it\'s'"#);
        assert_eq!(tokens[1].kind, TokenKind::Unknown);
        assert_eq!(tokens[1].position, 8);
    }
}
