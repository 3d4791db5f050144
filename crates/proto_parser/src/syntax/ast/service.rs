use super::{option::OptionNode, Node, TypeName};

#[derive(Debug, Clone)]
pub struct ServiceNode {
    pub name: String,
    pub elements: Vec<Node<ServiceElement>>,
}

#[derive(Debug, Clone)]
pub enum ServiceElement {
    Option(OptionNode),
    Method(MethodNode),
    Empty,
}

#[derive(Debug, Clone)]
pub struct MethodNode {
    pub name: String,
    pub input_type: Node<MessageType>,
    pub output_type: Node<MessageType>,
    pub elements: Vec<Node<MethodElement>>,
}

#[derive(Debug, Clone)]
pub enum MethodElement {
    Option(OptionNode),
    Empty,
}

#[derive(Debug, Clone)]
pub struct MessageType {
    pub stream: bool,
    pub type_name: Node<TypeName>,
}

impl ServiceNode {
    pub fn methods(&self) -> impl Iterator<Item = &MethodNode> + '_ {
        self.elements.iter().filter_map(|element| match &element.value {
            ServiceElement::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn options(&self) -> impl Iterator<Item = &OptionNode> + '_ {
        self.elements.iter().filter_map(|element| match &element.value {
            ServiceElement::Option(option) => Some(option),
            _ => None,
        })
    }
}

impl MethodNode {
    /// Options in declaration order, whether written in the method body or not.
    pub fn options(&self) -> impl Iterator<Item = &OptionNode> + '_ {
        self.elements.iter().filter_map(|element| match &element.value {
            MethodElement::Option(option) => Some(option),
            _ => None,
        })
    }
}
