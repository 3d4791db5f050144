use std::iter::Peekable;

use super::{
    ast::{
        message::{
            FieldCardinality, FieldDeclaration, FieldType, MapFieldDeclaration, Message,
            MessageElement, OneofDeclaration, OneofElement, OneofField,
        },
        option::{OptionName, OptionNamePart, OptionNode, OptionValue},
        service::{MessageType, MethodElement, MethodNode, ServiceElement, ServiceNode},
        EnumElement, EnumNode, ExtensionElement, ExtensionNode, ImportModifier, ImportNode,
        MapKeyType, Node, PackageNode, Reserved, Root, RootNode, ScalarType, SyntaxNode,
        SyntaxType, TagEnd, TagRange, TypeName,
    },
    lexer::{Keyword, Token, TokenKind},
};

#[derive(Debug)]
pub struct ParseResult {
    pub root: Root,
    pub errors: Vec<ParseError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: String, position: usize) -> Self {
        Self { message, position }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (at byte {})", self.message, self.position)
    }
}

type Result<T> = std::result::Result<T, ParseError>;

pub struct Parser<I: Iterator<Item = Token>> {
    line: usize,
    last_end: usize,
    tokens: Peekable<I>,
    errors: Vec<ParseError>,
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new(tokens: I) -> Self {
        Self {
            line: 0,
            last_end: 0,
            tokens: tokens.peekable(),
            errors: Vec::new(),
        }
    }

    pub fn parse(mut self, file_name: &str) -> ParseResult {
        let mut root = Root::new(file_name.to_string());

        while !self.is_at_end() {
            match self.root_node() {
                Ok(RootNode::Empty) => {}
                Ok(node) => root.add_node(node),
                Err(err) => {
                    log::debug!("{file_name}: {err}");
                    self.errors.push(err);
                    self.sync();
                }
            }
        }

        log::trace!("{file_name}: parsed {} lines", self.line + 1);

        ParseResult {
            root,
            errors: self.errors,
        }
    }

    fn is_at_end(&mut self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
    }

    fn peek_kind(&mut self) -> Option<TokenKind> {
        loop {
            match self.tokens.peek() {
                Some(Token {
                    kind: TokenKind::NewLine,
                    ..
                }) => {
                    self.line += 1;
                    self.tokens.next();
                }
                Some(Token {
                    kind: TokenKind::LineComment | TokenKind::BlockComment,
                    value,
                    ..
                }) => {
                    self.line += value.matches('\n').count();
                    self.tokens.next();
                }
                Some(token) => return Some(token.kind),
                None => return None,
            }
        }
    }

    fn peek_position(&mut self) -> usize {
        self.peek_kind();
        self.tokens
            .peek()
            .map(|token| token.position)
            .unwrap_or(self.last_end)
    }

    fn advance(&mut self) -> Option<Token> {
        self.peek_kind();
        let token = self.tokens.next();
        if let Some(token) = &token {
            self.last_end = token_end(token);
        }
        token
    }

    /// Consumes the next token, which the caller has already peeked.
    fn bump(&mut self) -> Token {
        let position = self.last_end;
        self.advance().unwrap_or(Token {
            value: String::new(),
            kind: TokenKind::Eof,
            position,
        })
    }

    fn expect(&mut self, token_kind: TokenKind) -> Result<Token> {
        match self.peek_kind() {
            Some(kind) if kind == token_kind => Ok(self.bump()),
            next => Err(ParseError::new(
                format!("Expected token: {:?}. Got: {:?}", token_kind, next),
                self.peek_position(),
            )),
        }
    }

    /// Identifiers in proto files may collide with keywords (`string message = 1;`).
    fn identifier(&mut self) -> Result<Token> {
        match self.peek_kind() {
            Some(TokenKind::Identifier | TokenKind::Keyword(_)) => Ok(self.bump()),
            next => Err(ParseError::new(
                format!("Expected identifier. Got: {:?}", next),
                self.peek_position(),
            )),
        }
    }

    fn sync(&mut self) {
        loop {
            match self.advance() {
                Some(Token {
                    kind: TokenKind::RBrace | TokenKind::SemiColon | TokenKind::Eof,
                    ..
                })
                | None => return,
                _ => {}
            };
        }
    }

    fn root_node(&mut self) -> Result<RootNode> {
        let result = match self.peek_kind() {
            Some(TokenKind::Keyword(Keyword::Syntax)) => {
                RootNode::SyntaxDeclaration(self.syntax_node()?)
            }
            Some(TokenKind::Keyword(Keyword::Package)) => {
                RootNode::PackageDeclaration(self.package_node()?)
            }
            Some(TokenKind::Keyword(Keyword::Import)) => {
                RootNode::ImportDeclaration(self.import_node()?)
            }
            Some(TokenKind::Keyword(Keyword::Option)) => {
                RootNode::OptionDeclaration(self.option_node()?)
            }
            Some(TokenKind::Keyword(Keyword::Message)) => {
                RootNode::MessageDeclaration(self.message_node()?)
            }
            Some(TokenKind::Keyword(Keyword::Enum)) => RootNode::EnumDeclaration(self.enum_node()?),
            Some(TokenKind::Keyword(Keyword::Service)) => {
                RootNode::ServiceDeclaration(self.service_node()?)
            }
            Some(TokenKind::Keyword(Keyword::Extend)) => {
                RootNode::ExtensionDeclaration(self.extend_node()?)
            }
            Some(TokenKind::SemiColon) => {
                self.bump();
                RootNode::Empty
            }
            Some(TokenKind::Eof) | None => RootNode::Empty,
            Some(kind) => {
                // left in place for `sync` to skip
                let err = ParseError::new(
                    format!("Unexpected token: {:?}. Expected root node", kind),
                    self.peek_position(),
                );
                return Err(err);
            }
        };

        Ok(result)
    }

    fn syntax_node(&mut self) -> Result<Node<SyntaxNode>> {
        let start = self.bump().position;

        self.expect(TokenKind::Equals)?;

        let version = self.string()?;
        let proto_type = match version.value.as_str() {
            "proto2" => SyntaxType::Proto2,
            "proto3" => SyntaxType::Proto3,
            other => {
                return Err(ParseError::new(
                    format!("Invalid syntax version: {other:?}"),
                    version.start,
                ));
            }
        };

        let end_token = self.expect(TokenKind::SemiColon)?;

        Ok(Node::new(
            SyntaxNode { proto_type },
            start,
            token_end(&end_token),
        ))
    }

    fn package_node(&mut self) -> Result<Node<PackageNode>> {
        let start = self.bump().position;

        let name = self.qualified_identifier()?;

        let end_token = self.expect(TokenKind::SemiColon)?;

        Ok(Node::new(
            PackageNode {
                package_name: name.value,
            },
            start,
            token_end(&end_token),
        ))
    }

    fn import_node(&mut self) -> Result<Node<ImportNode>> {
        let start = self.bump().position;

        let modifier = match self.peek_kind() {
            Some(TokenKind::Keyword(Keyword::Public)) => {
                self.bump();
                Some(ImportModifier::Public)
            }
            Some(TokenKind::Keyword(Keyword::Weak)) => {
                self.bump();
                Some(ImportModifier::Weak)
            }
            _ => None,
        };

        let file_name = self.string()?;

        let end_token = self.expect(TokenKind::SemiColon)?;

        Ok(Node::new(
            ImportNode {
                modifier,
                package_name: file_name.value,
            },
            start,
            token_end(&end_token),
        ))
    }

    /// Either a full `option name = value;` statement or, inside `[...]`, a
    /// compact `name = value` entry.
    fn option_node(&mut self) -> Result<Node<OptionNode>> {
        let statement = matches!(
            self.peek_kind(),
            Some(TokenKind::Keyword(Keyword::Option))
        );
        let start = if statement {
            self.bump().position
        } else {
            self.peek_position()
        };

        let name = self.option_name()?;

        self.expect(TokenKind::Equals)?;

        let value = self.option_value()?;

        let end = if statement {
            token_end(&self.expect(TokenKind::SemiColon)?)
        } else {
            value.end
        };

        Ok(Node::new(OptionNode { name, value }, start, end))
    }

    fn message_node(&mut self) -> Result<Node<Message>> {
        let start = self.bump().position;

        let identifier = self.identifier()?;

        self.expect(TokenKind::LBrace)?;

        let mut elements = Vec::new();
        while !matches!(
            self.peek_kind(),
            Some(TokenKind::RBrace | TokenKind::Eof) | None
        ) {
            elements.push(self.message_element()?);
        }

        let end_token = self.expect(TokenKind::RBrace)?;

        Ok(Node::new(
            Message {
                name: identifier.value,
                elements,
            },
            start,
            token_end(&end_token),
        ))
    }

    fn enum_node(&mut self) -> Result<Node<EnumNode>> {
        let start = self.bump().position;

        let identifier_token = self.identifier()?;

        self.expect(TokenKind::LBrace)?;

        let mut elements = Vec::new();
        while !matches!(
            self.peek_kind(),
            Some(TokenKind::RBrace | TokenKind::Eof) | None
        ) {
            elements.push(self.enum_element()?);
        }

        let end_token = self.expect(TokenKind::RBrace)?;

        Ok(Node::new(
            EnumNode {
                name: identifier_token.value,
                elements,
            },
            start,
            token_end(&end_token),
        ))
    }

    fn service_node(&mut self) -> Result<Node<ServiceNode>> {
        let start = self.bump().position;

        let identifier_token = self.identifier()?;

        self.expect(TokenKind::LBrace)?;

        let mut elements = Vec::new();
        while !matches!(
            self.peek_kind(),
            Some(TokenKind::RBrace | TokenKind::Eof) | None
        ) {
            elements.push(self.service_element()?);
        }

        let end_token = self.expect(TokenKind::RBrace)?;

        Ok(Node::new(
            ServiceNode {
                name: identifier_token.value,
                elements,
            },
            start,
            token_end(&end_token),
        ))
    }

    fn extend_node(&mut self) -> Result<Node<ExtensionNode>> {
        let start = self.bump().position;

        let extendee = self.type_name()?;

        self.expect(TokenKind::LBrace)?;

        let mut elements = Vec::new();
        while !matches!(
            self.peek_kind(),
            Some(TokenKind::RBrace | TokenKind::Eof) | None
        ) {
            elements.push(self.extension_element()?);
        }

        let end_token = self.expect(TokenKind::RBrace)?;

        Ok(Node::new(
            ExtensionNode {
                extendee: extendee.value.parts,
                elements,
            },
            start,
            token_end(&end_token),
        ))
    }

    /// One or more adjacent string literals, concatenated and unescaped.
    fn string(&mut self) -> Result<Node<String>> {
        let token = self.expect(TokenKind::String)?;

        let start = token.position;
        let mut end = token_end(&token);
        let mut string = unquote(&token.value);

        while let Some(TokenKind::String) = self.peek_kind() {
            let token = self.bump();
            string.push_str(&unquote(&token.value));
            end = token_end(&token);
        }

        Ok(Node::new(string, start, end))
    }

    fn qualified_identifier(&mut self) -> Result<Node<Vec<String>>> {
        let identifier = self.identifier()?;
        let start = identifier.position;
        let mut end = token_end(&identifier);

        let mut identifiers = vec![identifier.value];

        while let Some(TokenKind::Dot) = self.peek_kind() {
            self.bump();
            let identifier = self.identifier()?;
            end = token_end(&identifier);
            identifiers.push(identifier.value);
        }

        Ok(Node::new(identifiers, start, end))
    }

    fn option_name(&mut self) -> Result<Node<OptionName>> {
        let mut name = Vec::new();

        loop {
            match self.peek_kind() {
                Some(TokenKind::Identifier | TokenKind::Keyword(_)) => {
                    let identifier = self.bump();
                    let end = token_end(&identifier);
                    name.push(Node::new(
                        OptionNamePart::SimpleName(identifier.value),
                        identifier.position,
                        end,
                    ));
                }
                Some(TokenKind::LParen) => {
                    let start = self.bump().position;
                    let type_name = self.type_name()?;
                    let end = token_end(&self.expect(TokenKind::RParen)?);

                    name.push(Node::new(
                        OptionNamePart::ExtensionName(type_name.value),
                        start,
                        end,
                    ));
                }
                next => {
                    return Err(ParseError::new(
                        format!("Expected option name. Got: {:?}", next),
                        self.peek_position(),
                    ));
                }
            }

            if let Some(TokenKind::Dot) = self.peek_kind() {
                self.bump();
            } else {
                break;
            }
        }

        let start = name.first().map(|part| part.start).unwrap_or(self.last_end);
        let end = name.last().map(|part| part.end).unwrap_or(self.last_end);

        Ok(Node::new(name, start, end))
    }

    fn option_value(&mut self) -> Result<Node<OptionValue>> {
        match self.peek_kind() {
            Some(TokenKind::String) => {
                let string = self.string()?;
                Ok(Node::new(
                    OptionValue::StringLiteral(string.value),
                    string.start,
                    string.end,
                ))
            }
            Some(TokenKind::Minus | TokenKind::Plus) => {
                let sign = self.bump();
                let negative = sign.kind == TokenKind::Minus;

                match self.peek_kind() {
                    Some(TokenKind::IntLiteral) => {
                        let token = self.bump();
                        let end = token_end(&token);
                        let value = if negative {
                            OptionValue::IntLiteral(format!("-{}", token.value))
                        } else {
                            OptionValue::UintLiteral(token.value)
                        };
                        Ok(Node::new(value, sign.position, end))
                    }
                    Some(TokenKind::FloatLiteral) => {
                        let token = self.bump();
                        let end = token_end(&token);
                        let value = if negative {
                            format!("-{}", token.value)
                        } else {
                            token.value
                        };
                        Ok(Node::new(OptionValue::FloatLiteral(value), sign.position, end))
                    }
                    Some(TokenKind::Identifier | TokenKind::Keyword(Keyword::Inf)) => {
                        // -inf, -nan
                        let token = self.bump();
                        let end = token_end(&token);
                        Ok(Node::new(
                            OptionValue::FloatLiteral(format!("{}{}", sign.value, token.value)),
                            sign.position,
                            end,
                        ))
                    }
                    _ => Err(ParseError::new(
                        "Expected int or float literal".to_string(),
                        sign.position,
                    )),
                }
            }
            Some(TokenKind::IntLiteral) => {
                let token = self.bump();
                let end = token_end(&token);
                Ok(Node::new(
                    OptionValue::UintLiteral(token.value),
                    token.position,
                    end,
                ))
            }
            Some(TokenKind::FloatLiteral) => {
                let token = self.bump();
                let end = token_end(&token);
                Ok(Node::new(
                    OptionValue::FloatLiteral(token.value),
                    token.position,
                    end,
                ))
            }
            Some(TokenKind::Identifier | TokenKind::Keyword(_)) => {
                let name = self.qualified_identifier()?;
                Ok(Node::new(
                    OptionValue::Identifier(name.value.join(".")),
                    name.start,
                    name.end,
                ))
            }
            Some(TokenKind::LBrace) => self.message_literal(),
            next => Err(ParseError::new(
                format!("Expected option value. Got: {:?}", next),
                self.peek_position(),
            )),
        }
    }

    /// Aggregate option value `{ ... }`, kept as raw text.
    fn message_literal(&mut self) -> Result<Node<OptionValue>> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut depth = 1;
        let mut parts = vec![open.value];

        while depth > 0 {
            match self.peek_kind() {
                Some(TokenKind::Eof) | None => {
                    return Err(ParseError::new(
                        "Unterminated message literal".to_string(),
                        open.position,
                    ));
                }
                Some(TokenKind::LBrace) => depth += 1,
                Some(TokenKind::RBrace) => depth -= 1,
                _ => {}
            }
            parts.push(self.bump().value);
        }

        Ok(Node::new(
            OptionValue::MessageLiteral(parts.join(" ")),
            open.position,
            self.last_end,
        ))
    }

    fn message_element(&mut self) -> Result<Node<MessageElement>> {
        let element = match self.peek_kind() {
            Some(TokenKind::Keyword(Keyword::Message)) => {
                let decl = self.message_node()?;
                Node::new(
                    MessageElement::Message(Box::new(decl.value)),
                    decl.start,
                    decl.end,
                )
            }
            Some(TokenKind::Keyword(Keyword::Enum)) => {
                let decl = self.enum_node()?;
                Node::new(MessageElement::Enum(decl.value), decl.start, decl.end)
            }
            Some(TokenKind::Keyword(Keyword::Oneof)) => {
                let decl = self.oneof_node()?;
                Node::new(MessageElement::OneOf(decl.value), decl.start, decl.end)
            }
            Some(TokenKind::Keyword(Keyword::Map)) => {
                let decl = self.map_field_decl()?;
                Node::new(MessageElement::MapField(decl.value), decl.start, decl.end)
            }
            Some(TokenKind::Keyword(Keyword::Extend)) => {
                let decl = self.extend_node()?;
                Node::new(MessageElement::Extension(decl.value), decl.start, decl.end)
            }
            Some(TokenKind::Keyword(Keyword::Extensions)) => {
                let start = self.bump().position;
                let ranges = self.tag_range()?;
                let end = token_end(&self.expect(TokenKind::SemiColon)?);
                Node::new(MessageElement::Extensions(ranges), start, end)
            }
            Some(TokenKind::Keyword(Keyword::Reserved)) => {
                let decl = self.reserved_node()?;
                Node::new(MessageElement::Reserved(decl.value), decl.start, decl.end)
            }
            Some(TokenKind::Keyword(Keyword::Option)) => {
                let decl = self.option_node()?;
                Node::new(MessageElement::Option(decl.value), decl.start, decl.end)
            }
            Some(TokenKind::SemiColon) => {
                let token = self.bump();
                Node::new(MessageElement::Empty, token.position, token_end(&token))
            }
            Some(TokenKind::Identifier | TokenKind::Dot | TokenKind::Keyword(_)) => {
                let decl = self.field_decl()?;
                Node::new(MessageElement::Field(decl.value), decl.start, decl.end)
            }
            next => {
                return Err(ParseError::new(
                    format!("Expected message element. Got: {:?}", next),
                    self.peek_position(),
                ));
            }
        };

        Ok(element)
    }

    fn field_decl(&mut self) -> Result<Node<FieldDeclaration>> {
        let start = self.peek_position();
        let cardinality = self.field_cardinality()?;

        let field_type = self.field_type()?;

        let field_name = self.field_name()?;

        self.expect(TokenKind::Equals)?;

        let field_number = self.field_number()?;

        let options = if let Some(TokenKind::LBracket) = self.peek_kind() {
            self.compact_options()?
        } else {
            vec![]
        };

        let end = token_end(&self.expect(TokenKind::SemiColon)?);

        let decl = FieldDeclaration {
            cardinality,
            type_name: field_type,
            name: field_name,
            number: field_number,
            options,
        };

        Ok(Node::new(decl, start, end))
    }

    fn field_cardinality(&mut self) -> Result<Node<FieldCardinality>> {
        let cardinality = match self.peek_kind() {
            Some(
                kind @ TokenKind::Keyword(
                    Keyword::Required | Keyword::Optional | Keyword::Repeated,
                ),
            ) => {
                let token = self.bump();
                let end = token_end(&token);
                let cardinality =
                    FieldCardinality::try_from(kind).map_err(|e| ParseError::new(e, token.position))?;
                Node::new(cardinality, token.position, end)
            }
            _ => {
                // implicit presence
                let position = self.peek_position();
                Node::new(FieldCardinality::Optional, position, position)
            }
        };

        Ok(cardinality)
    }

    fn field_type(&mut self) -> Result<Node<FieldType>> {
        let field_type = match self.peek_kind() {
            Some(TokenKind::Keyword(t)) if t.is_scalar() => {
                let token = self.bump();
                let scalar_type = ScalarType::try_from(token.kind)
                    .map_err(|e| ParseError::new(e, token.position))?;

                Node::new(
                    FieldType::ScalarType(scalar_type),
                    token.position,
                    token_end(&token),
                )
            }
            Some(TokenKind::Identifier | TokenKind::Dot | TokenKind::Keyword(_)) => {
                let name = self.type_name()?;
                Node::new(FieldType::TypeName(name.value), name.start, name.end)
            }
            next => {
                return Err(ParseError::new(
                    format!("Expected field type. Got: {:?}", next),
                    self.peek_position(),
                ));
            }
        };

        Ok(field_type)
    }

    fn field_number(&mut self) -> Result<Node<u32>> {
        let token = self.expect(TokenKind::IntLiteral)?;
        let end = token_end(&token);
        let number = parse_int(&token.value).ok_or_else(|| {
            ParseError::new(
                format!("Invalid field number: {}", token.value),
                token.position,
            )
        })?;

        Ok(Node::new(number, token.position, end))
    }

    fn field_name(&mut self) -> Result<Node<String>> {
        let token = self.identifier()?;
        let end = token_end(&token);
        Ok(Node::new(token.value, token.position, end))
    }

    fn enum_element(&mut self) -> Result<Node<EnumElement>> {
        match self.peek_kind() {
            Some(TokenKind::Keyword(Keyword::Option)) => {
                let option = self.option_node()?;
                Ok(Node::new(
                    EnumElement::EnumOption(option.value),
                    option.start,
                    option.end,
                ))
            }
            Some(TokenKind::Keyword(Keyword::Reserved)) => {
                let reserved = self.reserved_node()?;
                Ok(Node::new(
                    EnumElement::EnumReserved(reserved.value),
                    reserved.start,
                    reserved.end,
                ))
            }
            Some(TokenKind::SemiColon) => {
                let token = self.bump();
                Ok(Node::new(
                    EnumElement::Empty,
                    token.position,
                    token_end(&token),
                ))
            }
            Some(TokenKind::Identifier | TokenKind::Keyword(_)) => {
                let value_name = self.bump();

                self.expect(TokenKind::Equals)?;

                let negative = if let Some(TokenKind::Minus) = self.peek_kind() {
                    self.bump();
                    true
                } else {
                    false
                };
                let value = self.expect(TokenKind::IntLiteral)?;
                let magnitude = parse_int(&value.value).ok_or_else(|| {
                    ParseError::new(
                        format!("Invalid enum value: {}", value.value),
                        value.position,
                    )
                })?;
                let number = if negative {
                    -(magnitude as i64)
                } else {
                    magnitude as i64
                };
                let number = i32::try_from(number).map_err(|_| {
                    ParseError::new(format!("Enum value out of range: {number}"), value.position)
                })?;

                let options = if let Some(TokenKind::LBracket) = self.peek_kind() {
                    self.compact_options()?
                } else {
                    Vec::new()
                };
                let end = self.expect(TokenKind::SemiColon)?;

                let element = EnumElement::EnumValue {
                    name: value_name.value,
                    number,
                    options,
                };

                Ok(Node::new(element, value_name.position, token_end(&end)))
            }
            next => Err(ParseError::new(
                format!("Expected enum element. Got: {:?}", next),
                self.peek_position(),
            )),
        }
    }

    fn service_element(&mut self) -> Result<Node<ServiceElement>> {
        match self.peek_kind() {
            Some(TokenKind::Keyword(Keyword::Option)) => {
                let option = self.option_node()?;
                Ok(Node::new(
                    ServiceElement::Option(option.value),
                    option.start,
                    option.end,
                ))
            }
            Some(TokenKind::SemiColon) => {
                let token = self.bump();
                Ok(Node::new(
                    ServiceElement::Empty,
                    token.position,
                    token_end(&token),
                ))
            }
            Some(TokenKind::Keyword(Keyword::Rpc)) => {
                let method = self.method_node()?;
                Ok(Node::new(
                    ServiceElement::Method(method.value),
                    method.start,
                    method.end,
                ))
            }
            next => Err(ParseError::new(
                format!("Expected service element. Got: {:?}", next),
                self.peek_position(),
            )),
        }
    }

    fn method_node(&mut self) -> Result<Node<MethodNode>> {
        let start = self.bump().position;
        let rpc_name = self.identifier()?;

        let input_type = self.rpc_message_type()?;
        self.expect(TokenKind::Keyword(Keyword::Returns))?;
        let output_type = self.rpc_message_type()?;

        let mut method = MethodNode {
            name: rpc_name.value,
            input_type,
            output_type,
            elements: Vec::new(),
        };

        let end = if let Some(TokenKind::LBrace) = self.peek_kind() {
            self.bump();
            loop {
                let element = match self.peek_kind() {
                    Some(TokenKind::Keyword(Keyword::Option)) => {
                        let option = self.option_node()?;
                        Node::new(MethodElement::Option(option.value), option.start, option.end)
                    }
                    Some(TokenKind::SemiColon) => {
                        let token = self.bump();
                        Node::new(MethodElement::Empty, token.position, token_end(&token))
                    }
                    Some(TokenKind::RBrace) => break,
                    next => {
                        return Err(ParseError::new(
                            format!("Expected rpc option. Got: {:?}", next),
                            self.peek_position(),
                        ));
                    }
                };
                method.elements.push(element);
            }

            let end = token_end(&self.expect(TokenKind::RBrace)?);

            // `rpc X (A) returns (B) {};` is legal
            if let Some(TokenKind::SemiColon) = self.peek_kind() {
                self.bump();
            }

            end
        } else {
            token_end(&self.expect(TokenKind::SemiColon)?)
        };

        Ok(Node::new(method, start, end))
    }

    fn rpc_message_type(&mut self) -> Result<Node<MessageType>> {
        let start = self.expect(TokenKind::LParen)?.position;
        let stream = if let Some(TokenKind::Keyword(Keyword::Stream)) = self.peek_kind() {
            self.bump();
            true
        } else {
            false
        };
        let type_name = self.type_name()?;
        let end = token_end(&self.expect(TokenKind::RParen)?);

        Ok(Node::new(MessageType { stream, type_name }, start, end))
    }

    fn extension_element(&mut self) -> Result<Node<ExtensionElement>> {
        match self.peek_kind() {
            Some(TokenKind::SemiColon) => {
                let token = self.bump();
                Ok(Node::new(
                    ExtensionElement::Empty,
                    token.position,
                    token_end(&token),
                ))
            }
            _ => {
                let field = self.field_decl()?;
                Ok(Node::new(
                    ExtensionElement::Field(field.value),
                    field.start,
                    field.end,
                ))
            }
        }
    }

    fn type_name(&mut self) -> Result<Node<TypeName>> {
        let dot = if let Some(TokenKind::Dot) = self.peek_kind() {
            Some(self.bump().position)
        } else {
            None
        };

        let parts = self.qualified_identifier()?;

        let name = TypeName {
            absolute: dot.is_some(),
            parts: parts.value,
        };

        Ok(Node::new(name, dot.unwrap_or(parts.start), parts.end))
    }

    fn reserved_node(&mut self) -> Result<Node<Reserved>> {
        let start = self.expect(TokenKind::Keyword(Keyword::Reserved))?.position;

        let reserved = match self.peek_kind() {
            Some(TokenKind::IntLiteral) => Reserved::TagRanges(self.tag_range()?),
            Some(TokenKind::String) => Reserved::Names(self.reserved_names()?),
            next => {
                return Err(ParseError::new(
                    format!("Expected reserved range or names. Got: {:?}", next),
                    self.peek_position(),
                ));
            }
        };

        let end = token_end(&self.expect(TokenKind::SemiColon)?);

        Ok(Node::new(reserved, start, end))
    }

    fn map_field_decl(&mut self) -> Result<Node<MapFieldDeclaration>> {
        let start = self.expect(TokenKind::Keyword(Keyword::Map))?.position;
        self.expect(TokenKind::LAngle)?;
        let key_type = self.map_key_type()?;
        self.expect(TokenKind::Comma)?;
        let value_type = self.field_type()?;
        self.expect(TokenKind::RAngle)?;

        let name = self.field_name()?;
        self.expect(TokenKind::Equals)?;
        let number = self.field_number()?;

        let options = if let Some(TokenKind::LBracket) = self.peek_kind() {
            self.compact_options()?
        } else {
            Vec::new()
        };

        let end = token_end(&self.expect(TokenKind::SemiColon)?);

        let field = MapFieldDeclaration {
            key_type,
            value_type,
            name,
            number,
            options,
        };

        Ok(Node::new(field, start, end))
    }

    fn map_key_type(&mut self) -> Result<Node<MapKeyType>> {
        match self.peek_kind() {
            Some(TokenKind::Keyword(kw)) if kw.is_map_key_type() => {
                let token = self.bump();
                let end = token_end(&token);
                let key_type =
                    MapKeyType::try_from(token.kind).map_err(|e| ParseError::new(e, token.position))?;
                Ok(Node::new(key_type, token.position, end))
            }
            next => Err(ParseError::new(
                format!("Expected map key type. Got: {:?}", next),
                self.peek_position(),
            )),
        }
    }

    fn oneof_node(&mut self) -> Result<Node<OneofDeclaration>> {
        let start = self.expect(TokenKind::Keyword(Keyword::Oneof))?.position;
        let name = self.field_name()?;

        self.expect(TokenKind::LBrace)?;

        let mut elements = Vec::new();
        while !matches!(
            self.peek_kind(),
            Some(TokenKind::RBrace | TokenKind::Eof) | None
        ) {
            elements.push(self.oneof_element()?);
        }

        let end = token_end(&self.expect(TokenKind::RBrace)?);

        Ok(Node::new(OneofDeclaration { name, elements }, start, end))
    }

    fn oneof_element(&mut self) -> Result<Node<OneofElement>> {
        match self.peek_kind() {
            Some(TokenKind::Keyword(Keyword::Option)) => {
                let option = self.option_node()?;
                Ok(Node::new(
                    OneofElement::Option(option.value),
                    option.start,
                    option.end,
                ))
            }
            Some(TokenKind::Identifier | TokenKind::Dot | TokenKind::Keyword(_)) => {
                let field = self.oneof_field_decl()?;
                Ok(Node::new(
                    OneofElement::OneofField(field.value),
                    field.start,
                    field.end,
                ))
            }
            next => Err(ParseError::new(
                format!("Expected oneof element. Got: {:?}", next),
                self.peek_position(),
            )),
        }
    }

    fn oneof_field_decl(&mut self) -> Result<Node<OneofField>> {
        let type_name = self.field_type()?;
        let name = self.field_name()?;
        self.expect(TokenKind::Equals)?;
        let number = self.field_number()?;

        let options = if let Some(TokenKind::LBracket) = self.peek_kind() {
            Some(self.compact_options()?)
        } else {
            None
        };

        let end = token_end(&self.expect(TokenKind::SemiColon)?);
        let start = type_name.start;

        let field = OneofField {
            type_name,
            name,
            number,
            options,
        };

        Ok(Node::new(field, start, end))
    }

    fn compact_options(&mut self) -> Result<Vec<Node<OptionNode>>> {
        self.expect(TokenKind::LBracket)?;

        let mut options = Vec::new();

        while !matches!(
            self.peek_kind(),
            Some(TokenKind::RBracket | TokenKind::Eof) | None
        ) {
            options.push(self.option_node()?);

            if let Some(TokenKind::Comma) = self.peek_kind() {
                self.bump();
            }
        }

        self.expect(TokenKind::RBracket)?;

        Ok(options)
    }

    fn tag_range(&mut self) -> Result<Vec<Node<TagRange>>> {
        let mut ranges = Vec::new();

        loop {
            let start = self.field_number()?;
            let end = if let Some(TokenKind::Keyword(Keyword::To)) = self.peek_kind() {
                self.bump();

                let end = match self.peek_kind() {
                    Some(TokenKind::Keyword(Keyword::Max)) => {
                        let token = self.bump();
                        Node::new(TagEnd::Max, token.position, token_end(&token))
                    }
                    Some(TokenKind::IntLiteral) => {
                        let number = self.field_number()?;
                        Node::new(TagEnd::Tag(number.value), number.start, number.end)
                    }
                    next => {
                        return Err(ParseError::new(
                            format!("Expected tag end. Got: {:?}", next),
                            self.peek_position(),
                        ));
                    }
                };

                Some(end)
            } else {
                None
            };

            let range_start = start.start;
            let range_end = end.as_ref().map(|n| n.end).unwrap_or(start.end);

            ranges.push(Node::new(TagRange { start, end }, range_start, range_end));

            if let Some(TokenKind::Comma) = self.peek_kind() {
                self.bump();
            } else {
                break;
            }
        }

        Ok(ranges)
    }

    fn reserved_names(&mut self) -> Result<Vec<Node<String>>> {
        let mut names = Vec::new();

        loop {
            names.push(self.string()?);

            if let Some(TokenKind::Comma) = self.peek_kind() {
                self.bump();
            } else {
                break;
            }
        }

        Ok(names)
    }
}

fn token_end(token: &Token) -> usize {
    token.position + token.value.len()
}

fn parse_int(value: &str) -> Option<u32> {
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else if value.len() > 1 && value.starts_with('0') {
        u32::from_str_radix(&value[1..], 8).ok()
    } else {
        value.parse::<u32>().ok()
    }
}

/// Strips the surrounding quotes of a string literal token and resolves
/// escape sequences.
fn unquote(raw: &str) -> String {
    let inner = raw
        .get(1..raw.len().saturating_sub(1))
        .unwrap_or_default();

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('0') => result.push('\0'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }

    result
}
