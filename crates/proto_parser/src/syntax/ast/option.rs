use super::{Node, TypeName};

#[derive(Debug, Clone)]
pub struct OptionNode {
    pub name: Node<OptionName>,
    pub value: Node<OptionValue>,
}

pub type OptionName = Vec<Node<OptionNamePart>>;

#[derive(Debug, Clone)]
pub enum OptionValue {
    StringLiteral(String),
    UintLiteral(String),
    IntLiteral(String),
    FloatLiteral(String),
    Identifier(String),
    MessageLiteral(String),
}

#[derive(Debug, Clone)]
pub enum OptionNamePart {
    SimpleName(String),
    ExtensionName(TypeName),
}

impl OptionNode {
    /// Dotted option name as written, e.g. `(ddp.update_response)` or
    /// `java_package`.
    pub fn name_text(&self) -> String {
        self.name
            .value
            .iter()
            .map(|part| match &part.value {
                OptionNamePart::SimpleName(name) => name.clone(),
                OptionNamePart::ExtensionName(type_name) => format!("({})", type_name.full_name()),
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Last identifier of the option name. For `(a.b.completion_response)`
    /// this is `completion_response`.
    pub fn short_name(&self) -> Option<&str> {
        self.name.value.last().map(|part| match &part.value {
            OptionNamePart::SimpleName(name) => name.as_str(),
            OptionNamePart::ExtensionName(type_name) => type_name.simple_name(),
        })
    }

    pub fn is_extension(&self) -> bool {
        self.name
            .value
            .iter()
            .any(|part| matches!(part.value, OptionNamePart::ExtensionName(_)))
    }
}

impl OptionValue {
    /// Raw literal text; string literals are already unquoted.
    pub fn text(&self) -> &str {
        match self {
            OptionValue::StringLiteral(value)
            | OptionValue::UintLiteral(value)
            | OptionValue::IntLiteral(value)
            | OptionValue::FloatLiteral(value)
            | OptionValue::Identifier(value)
            | OptionValue::MessageLiteral(value) => value,
        }
    }
}
