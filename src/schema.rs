//! Read-only descriptor tree built from parsed `.proto` sources.

use std::collections::HashSet;

use proto_parser::{
    message::{FieldCardinality, FieldType, FieldViewType, Message},
    option::{OptionNode, OptionValue},
    service::{MethodNode, ServiceNode},
    EnumNode, MapKeyType, ScalarType, Source, SourceFile,
};

#[derive(Debug, Default)]
pub struct Schema {
    files: Vec<FileDescriptor>,
}

#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub name: String,
    pub package: String,
    pub options: Vec<RawOption>,
    pub services: Vec<ServiceDescriptor>,
    pub messages: Vec<MessageDescriptor>,
    /// Imported file names in declaration order.
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub name: String,
    pub methods: Vec<MethodDescriptor>,
}

#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: String,
    /// Type name as written in the rpc declaration.
    pub input_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub options: Vec<RawOption>,
}

#[derive(Debug, Clone)]
pub struct MessageDescriptor {
    /// Package-relative name. Nested messages are flattened: `Outer.Inner`.
    pub name: String,
    pub full_name: String,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: Label,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Optional,
    Required,
    Repeated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Scalar(ScalarType),
    Enum(String),
    Message(String),
    Map {
        key: MapKeyType,
        value: Box<FieldKind>,
    },
}

/// An option as declared, with its value untouched. Typed reads live in
/// [`crate::annotations`].
#[derive(Debug, Clone)]
pub struct RawOption {
    /// Full name as written, e.g. `(ddp.update_response)`.
    pub name: String,
    /// Last identifier of the name, e.g. `update_response`.
    pub short_name: String,
    pub value: OptionValue,
}

/// A message type split into its package and package-relative name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeRef {
    pub package: String,
    pub name: String,
}

impl TypeRef {
    /// `pkg.sub.Name` yields package `pkg.sub` and name `Name`; a name without
    /// dots takes `default_package`.
    pub fn parse(written: &str, default_package: &str) -> Self {
        let written = written.trim_start_matches('.');
        match written.rsplit_once('.') {
            Some((package, name)) => Self {
                package: package.to_string(),
                name: name.to_string(),
            },
            None => Self {
                package: default_package.to_string(),
                name: written.to_string(),
            },
        }
    }

    pub fn full_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    /// Name with nesting dots replaced, as protobuf code generators name
    /// nested classes.
    pub fn flat_name(&self) -> String {
        self.name.replace('.', "_")
    }
}

impl From<&OptionNode> for RawOption {
    fn from(option: &OptionNode) -> Self {
        Self {
            name: option.name_text(),
            short_name: option.short_name().unwrap_or_default().to_string(),
            value: option.value.value.clone(),
        }
    }
}

impl Schema {
    /// Converts every parsed file, keeping the load order of `source`.
    pub fn from_source(source: &Source) -> Self {
        let enum_names: HashSet<String> = source
            .files()
            .flat_map(|file| {
                let mut names = Vec::new();
                for node in file.root.enums() {
                    names.push(node.name.clone());
                }
                for message in file.root.messages() {
                    collect_nested_enums(message, &mut names);
                }
                names
            })
            .collect();

        let files = source
            .files()
            .map(|file| convert_file(file, &enum_names))
            .collect();

        Self { files }
    }

    pub fn file(&self, name: &str) -> Option<&FileDescriptor> {
        self.files.iter().find(|file| file.name == name)
    }

    pub fn files(&self) -> impl Iterator<Item = &FileDescriptor> + '_ {
        self.files.iter()
    }

    /// Looks a message up by package-relative name in `file`, then in each of
    /// its direct dependencies in declaration order.
    pub fn find_message<'a>(
        &'a self,
        file: &'a FileDescriptor,
        name: &str,
    ) -> Option<&'a MessageDescriptor> {
        file.find_message(name).or_else(|| {
            file.dependencies
                .iter()
                .filter_map(|dependency| self.file(dependency))
                .find_map(|dependency| dependency.find_message(name))
        })
    }

    /// Resolves a type name written in `file` to its package and
    /// package-relative name.
    pub fn resolve_type(&self, file: &FileDescriptor, written: &str) -> TypeRef {
        let absolute = written.starts_with('.');
        let name = written.trim_start_matches('.');

        let scope = std::iter::once(file).chain(
            file.dependencies
                .iter()
                .filter_map(|dependency| self.file(dependency)),
        );

        for candidate in scope {
            let found = candidate.messages.iter().find(|message| {
                message.full_name == name
                    || (!absolute && message.full_name == qualify(&file.package, name))
            });

            if let Some(message) = found {
                return TypeRef {
                    package: candidate.package.clone(),
                    name: message.name.clone(),
                };
            }
        }

        TypeRef::parse(name, &file.package)
    }
}

impl FileDescriptor {
    pub fn find_message(&self, name: &str) -> Option<&MessageDescriptor> {
        self.messages.iter().find(|message| message.name == name)
    }
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{package}.{name}")
    }
}

fn collect_nested_enums(message: &Message, names: &mut Vec<String>) {
    names.extend(message.nested_enums().map(|node: &EnumNode| node.name.clone()));
    for nested in message.nested_messages() {
        collect_nested_enums(nested, names);
    }
}

fn convert_file(file: &SourceFile, enum_names: &HashSet<String>) -> FileDescriptor {
    let root = &file.root;
    let package = root
        .package()
        .map(|package| package.package_name.join("."))
        .unwrap_or_default();

    let mut messages = Vec::new();
    for message in root.messages() {
        convert_message(message, "", &package, enum_names, &mut messages);
    }

    log::trace!(
        "{}: {} services, {} messages",
        file.name,
        root.services().count(),
        messages.len()
    );

    FileDescriptor {
        name: file.name.clone(),
        options: root.options().map(RawOption::from).collect(),
        services: root.services().map(convert_service).collect(),
        messages,
        dependencies: root
            .imports()
            .map(|import| import.package_name.clone())
            .collect(),
        package,
    }
}

fn convert_service(service: &ServiceNode) -> ServiceDescriptor {
    ServiceDescriptor {
        name: service.name.clone(),
        methods: service.methods().map(convert_method).collect(),
    }
}

fn convert_method(method: &MethodNode) -> MethodDescriptor {
    MethodDescriptor {
        name: method.name.clone(),
        input_type: method.input_type.value.type_name.value.full_name(),
        client_streaming: method.input_type.value.stream,
        server_streaming: method.output_type.value.stream,
        options: method.options().map(RawOption::from).collect(),
    }
}

fn convert_message(
    message: &Message,
    parent: &str,
    package: &str,
    enum_names: &HashSet<String>,
    out: &mut Vec<MessageDescriptor>,
) {
    let name = if parent.is_empty() {
        message.name.clone()
    } else {
        format!("{parent}.{}", message.name)
    };

    let fields = message
        .fields()
        .into_iter()
        .map(|field| {
            let label = match field.cardinality {
                FieldCardinality::Optional => Label::Optional,
                FieldCardinality::Required => Label::Required,
                FieldCardinality::Repeated => Label::Repeated,
            };
            let kind = match field.field_type {
                FieldViewType::Single(field_type) => field_kind(field_type, enum_names),
                FieldViewType::Map(key, value) => FieldKind::Map {
                    key: key.clone(),
                    value: Box::new(field_kind(value, enum_names)),
                },
            };

            FieldDescriptor {
                name: field.name.to_string(),
                label,
                kind,
            }
        })
        .collect();

    out.push(MessageDescriptor {
        full_name: qualify(package, &name),
        name: name.clone(),
        fields,
    });

    for nested in message.nested_messages() {
        convert_message(nested, &name, package, enum_names, out);
    }
}

fn field_kind(field_type: &FieldType, enum_names: &HashSet<String>) -> FieldKind {
    match field_type {
        FieldType::ScalarType(scalar) => FieldKind::Scalar(scalar.clone()),
        FieldType::TypeName(type_name) if enum_names.contains(type_name.simple_name()) => {
            FieldKind::Enum(type_name.full_name())
        }
        FieldType::TypeName(type_name) => FieldKind::Message(type_name.full_name()),
    }
}

#[cfg(test)]
mod tests {
    use proto_parser::ScalarType;

    use super::{FieldKind, Label, TypeRef};
    use crate::testing::schema;

    #[test]
    fn converts_services_and_messages() {
        let schema = schema(&[(
            "shop.proto",
            r#"
            package shop.v1;

            service Store {
                rpc Buy (stream BuyArgs) returns (stream Receipt);
            }

            message BuyArgs {
                enum Kind { A = 0; }
                message Line {
                    string sku = 1;
                }
                repeated Line lines = 1;
                Kind kind = 2;
                map<string, int64> totals = 3;
            }
            "#,
        )]);

        let file = schema.file("shop.proto").expect("file");
        assert_eq!(file.package, "shop.v1");

        let method = &file.services[0].methods[0];
        assert_eq!(method.name, "Buy");
        assert_eq!(method.input_type, "BuyArgs");
        assert!(method.client_streaming && method.server_streaming);

        let names: Vec<_> = file.messages.iter().map(|m| m.full_name.as_str()).collect();
        assert_eq!(names, vec!["shop.v1.BuyArgs", "shop.v1.BuyArgs.Line"]);

        let args = &file.messages[0];
        assert_eq!(args.fields[0].label, Label::Repeated);
        assert_eq!(args.fields[0].kind, FieldKind::Message("Line".to_string()));
        assert_eq!(args.fields[1].kind, FieldKind::Enum("Kind".to_string()));
        assert_eq!(
            args.fields[2].kind,
            FieldKind::Map {
                key: proto_parser::MapKeyType::String,
                value: Box::new(FieldKind::Scalar(ScalarType::Int64)),
            }
        );
    }

    #[test]
    fn finds_messages_in_dependencies_in_order() {
        let schema = schema(&[
            ("a.proto", "package a; message Shared { int32 from_a = 1; }"),
            ("b.proto", "package b; message Shared { int32 from_b = 1; }"),
            (
                "main.proto",
                "import \"missing.proto\"; import \"b.proto\"; import \"a.proto\"; package m; message Own {}",
            ),
        ]);

        let main = schema.file("main.proto").expect("main");
        assert!(schema.find_message(main, "Own").is_some());

        let shared = schema.find_message(main, "Shared").expect("shared");
        assert_eq!(shared.full_name, "b.Shared");
        assert!(schema.find_message(main, "Nowhere").is_none());
    }

    #[test]
    fn resolves_type_names() {
        let schema = schema(&[
            ("common.proto", "package ddp.common; message Empty {}"),
            (
                "pay.proto",
                "import \"common.proto\"; package pay; message Args { message Inner {} }",
            ),
        ]);
        let file = schema.file("pay.proto").expect("pay");

        let resolved = schema.resolve_type(file, "Args");
        assert_eq!(resolved.package, "pay");
        assert_eq!(resolved.name, "Args");

        let nested = schema.resolve_type(file, "Args.Inner");
        assert_eq!(nested.name, "Args.Inner");
        assert_eq!(nested.flat_name(), "Args_Inner");

        let foreign = schema.resolve_type(file, ".ddp.common.Empty");
        assert_eq!(foreign.package, "ddp.common");
        assert_eq!(foreign.full_name(), "ddp.common.Empty");

        let unknown = schema.resolve_type(file, "other.Thing");
        assert_eq!(unknown, TypeRef::parse("other.Thing", "pay"));
    }

    #[test]
    fn parses_type_refs() {
        let qualified = TypeRef::parse("payment.sub.ChargeResult", "x");
        assert_eq!(qualified.package, "payment.sub");
        assert_eq!(qualified.name, "ChargeResult");

        let bare = TypeRef::parse("ChargeResult", "payment");
        assert_eq!(bare.full_name(), "payment.ChargeResult");

        assert_eq!(TypeRef::parse("Solo", "").full_name(), "Solo");
    }
}
