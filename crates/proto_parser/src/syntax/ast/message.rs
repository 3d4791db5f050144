use crate::syntax::lexer::{Keyword, TokenKind};

use super::{
    option::OptionNode, EnumNode, ExtensionNode, MapKeyType, Node, Reserved, ScalarType, TagRange,
    TypeName,
};

#[derive(Debug, Clone)]
pub struct Message {
    pub name: String,
    pub elements: Vec<Node<MessageElement>>,
}

impl Message {
    /// Every field of the message in declaration order, including the members
    /// of `oneof` blocks.
    pub fn fields(&self) -> Vec<FieldView<'_>> {
        let mut fields = Vec::new();

        for element in &self.elements {
            match &element.value {
                MessageElement::Field(field) => fields.push(FieldView {
                    name: &field.name.value,
                    number: field.number.value,
                    cardinality: field.cardinality.value.clone(),
                    field_type: FieldViewType::Single(&field.type_name.value),
                }),
                MessageElement::MapField(field) => fields.push(FieldView {
                    name: &field.name.value,
                    number: field.number.value,
                    cardinality: FieldCardinality::Repeated,
                    field_type: FieldViewType::Map(&field.key_type.value, &field.value_type.value),
                }),
                MessageElement::OneOf(oneof) => {
                    for element in &oneof.elements {
                        if let OneofElement::OneofField(field) = &element.value {
                            fields.push(FieldView {
                                name: &field.name.value,
                                number: field.number.value,
                                cardinality: FieldCardinality::Optional,
                                field_type: FieldViewType::Single(&field.type_name.value),
                            });
                        }
                    }
                }
                _ => {}
            }
        }

        fields
    }

    pub fn nested_messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.elements.iter().filter_map(|element| match &element.value {
            MessageElement::Message(message) => Some(message.as_ref()),
            _ => None,
        })
    }

    pub fn nested_enums(&self) -> impl Iterator<Item = &EnumNode> + '_ {
        self.elements.iter().filter_map(|element| match &element.value {
            MessageElement::Enum(node) => Some(node),
            _ => None,
        })
    }
}

/// Uniform read-only view over plain, map and oneof fields.
#[derive(Debug, Clone)]
pub struct FieldView<'a> {
    pub name: &'a str,
    pub number: u32,
    pub cardinality: FieldCardinality,
    pub field_type: FieldViewType<'a>,
}

#[derive(Debug, Clone)]
pub enum FieldViewType<'a> {
    Single(&'a FieldType),
    Map(&'a MapKeyType, &'a FieldType),
}

#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub cardinality: Node<FieldCardinality>,
    pub type_name: Node<FieldType>,
    pub name: Node<String>,
    pub number: Node<u32>,
    pub options: Vec<Node<OptionNode>>,
}

#[derive(Debug, Clone)]
pub struct MapFieldDeclaration {
    pub key_type: Node<MapKeyType>,
    pub value_type: Node<FieldType>,
    pub name: Node<String>,
    pub number: Node<u32>,
    pub options: Vec<Node<OptionNode>>,
}

#[derive(Debug, Clone)]
pub enum MessageElement {
    Field(FieldDeclaration),
    MapField(MapFieldDeclaration),
    OneOf(OneofDeclaration),
    Option(OptionNode),
    Reserved(Reserved),
    Message(Box<Message>),
    Enum(EnumNode),
    Extension(ExtensionNode),
    Extensions(Vec<Node<TagRange>>),
    Empty,
}

#[derive(Debug, Clone)]
pub struct OneofDeclaration {
    pub name: Node<String>,
    pub elements: Vec<Node<OneofElement>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldCardinality {
    Required,
    Optional,
    Repeated,
}

impl TryFrom<TokenKind> for FieldCardinality {
    type Error = String;

    fn try_from(value: TokenKind) -> Result<Self, Self::Error> {
        match value {
            TokenKind::Keyword(Keyword::Required) => Ok(FieldCardinality::Required),
            TokenKind::Keyword(Keyword::Optional) => Ok(FieldCardinality::Optional),
            TokenKind::Keyword(Keyword::Repeated) => Ok(FieldCardinality::Repeated),
            _ => Err(format!("Invalid field cardinality: {:?}", value)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FieldType {
    ScalarType(ScalarType),
    TypeName(TypeName),
}

#[derive(Debug, Clone)]
pub enum OneofElement {
    Option(OptionNode),
    OneofField(OneofField),
}

#[derive(Debug, Clone)]
pub struct OneofField {
    pub type_name: Node<FieldType>,
    pub name: Node<String>,
    pub number: Node<u32>,
    pub options: Option<Vec<Node<OptionNode>>>,
}
