//! Normalized view of a validated file: services, methods, their responses
//! and callback forms. Emitters only read this model.

use std::{collections::BTreeSet, fmt};

use crate::{
    annotations::{FileAnnotations, MethodAnnotations},
    error::{ConformanceError, GenerateError},
    expand::{Callback, Overloads},
    naming::{lower_underscore_to_upper_camel, lowercase_first_letter},
    schema::{FileDescriptor, MethodDescriptor, Schema, ServiceDescriptor, TypeRef},
};

const ERROR_LABEL: &str = "Error";
const COMPLETION_LABEL: &str = "Completion";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingMode {
    None,
    Client,
    Server,
    Bidi,
}

impl StreamingMode {
    pub fn from_flags(client_streaming: bool, server_streaming: bool) -> Self {
        match (client_streaming, server_streaming) {
            (false, false) => Self::None,
            (true, false) => Self::Client,
            (false, true) => Self::Server,
            (true, true) => Self::Bidi,
        }
    }
}

impl fmt::Display for StreamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Client => "client",
            Self::Server => "server",
            Self::Bidi => "bidi",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodModel {
    pub name: String,
    pub input_type: TypeRef,
    pub completion_response: TypeRef,
    pub update_responses: Vec<TypeRef>,
    /// Upper camel names of the callbacks, unique within the method. Parallel
    /// to `update_responses`.
    pub completion_label: String,
    pub update_labels: Vec<String>,
    pub streaming: StreamingMode,
    pub overloads: Overloads,
}

impl MethodModel {
    /// Update responses in declaration order, then the completion response.
    pub fn responses(&self) -> impl Iterator<Item = &TypeRef> + '_ {
        self.update_responses
            .iter()
            .chain(std::iter::once(&self.completion_response))
    }

    /// Response type delivered to `callback`; `None` for the error callback.
    pub fn callback_response(&self, callback: Callback) -> Option<&TypeRef> {
        match callback {
            Callback::Error => None,
            Callback::Update(index) => self.update_responses.get(index),
            Callback::Completion => Some(&self.completion_response),
        }
    }

    /// Name of `callback` in selectors and method names: `Error`, or the
    /// label of its response.
    pub fn callback_label(&self, callback: Callback) -> &str {
        match callback {
            Callback::Error => ERROR_LABEL,
            Callback::Update(index) => self
                .update_labels
                .get(index)
                .map(String::as_str)
                .unwrap_or_default(),
            Callback::Completion => &self.completion_label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceModel {
    pub name: String,
    pub methods: Vec<MethodModel>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileModel {
    pub name: String,
    pub package: String,
    pub api_major_version: u32,
    pub api_minor_version: u32,
    /// Prefix of generated message classes in Objective-C, empty when unset.
    pub objc_class_prefix: String,
    pub services: Vec<ServiceModel>,
}

impl FileModel {
    pub fn package_parts(&self) -> Vec<String> {
        if self.package.is_empty() {
            Vec::new()
        } else {
            crate::naming::tokenize(&self.package, ".")
        }
    }
}

/// Which part of a response type a [`ResponseSet`] collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKey {
    Name,
    Package,
    FullName,
}

impl ResponseKey {
    pub fn of(self, response: &TypeRef) -> String {
        match self {
            Self::Name => response.flat_name(),
            Self::Package => response.package.clone(),
            Self::FullName => response.full_name(),
        }
    }
}

/// Deduplicated response names, iterated in ascending lexicographic order no
/// matter how they were inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseSet(BTreeSet<String>);

impl ResponseSet {
    pub fn of_method(method: &MethodModel, key: ResponseKey) -> Self {
        method.responses().map(|response| key.of(response)).collect()
    }

    pub fn of_service(service: &ServiceModel, key: ResponseKey) -> Self {
        service
            .methods
            .iter()
            .flat_map(|method| method.responses())
            .map(|response| key.of(response))
            .collect()
    }

    pub fn of_file(file: &FileModel, key: ResponseKey) -> Self {
        file.services
            .iter()
            .flat_map(|service| service.methods.iter())
            .flat_map(|method| method.responses())
            .map(|response| key.of(response))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for ResponseSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Builds the method model. Updates repeating the completion response or an
/// earlier update are dropped so no callback appears twice.
pub fn extract_method(
    schema: &Schema,
    file: &FileDescriptor,
    service: &ServiceDescriptor,
    method: &MethodDescriptor,
) -> Result<MethodModel, ConformanceError> {
    let annotations = MethodAnnotations::read(method);

    let completion_response = match &annotations.completion_response {
        Some(name) => schema.resolve_type(file, name),
        None => {
            return Err(ConformanceError {
                service: service.name.clone(),
                method: method.name.clone(),
                reason: "does not contain a completion response".to_string(),
            })
        }
    };

    let mut update_responses: Vec<TypeRef> = Vec::new();
    for name in &annotations.update_responses {
        let response = schema.resolve_type(file, name);
        if response == completion_response || update_responses.contains(&response) {
            log::warn!(
                "{}.{}: ignoring repeated update response {}",
                service.name,
                method.name,
                response.full_name()
            );
            continue;
        }
        update_responses.push(response);
    }

    let streaming = StreamingMode::from_flags(method.client_streaming, method.server_streaming);

    log::trace!(
        "{}.{}: {} updates, streaming {streaming}",
        service.name,
        method.name,
        update_responses.len()
    );

    let (completion_label, update_labels) = callback_labels(&completion_response, &update_responses);

    Ok(MethodModel {
        name: method.name.clone(),
        input_type: schema.resolve_type(file, &method.input_type),
        overloads: Overloads::expand(update_responses.len()),
        completion_response,
        update_responses,
        completion_label,
        update_labels,
        streaming,
    })
}

/// Labels the completion and update callbacks of a method. A response keeps
/// its flat name unless that is taken by the error callback, the completion
/// response or another update, then it is prefixed with its package. Labels
/// that still clash are numbered.
fn callback_labels(completion: &TypeRef, updates: &[TypeRef]) -> (String, Vec<String>) {
    let mut taken = vec![lowercase_first_letter(ERROR_LABEL)];

    let completion_label = claim_label(completion, false, 0, &mut taken);
    taken.push(lowercase_first_letter(COMPLETION_LABEL));

    let short: Vec<String> = updates
        .iter()
        .map(|update| lowercase_first_letter(&update.flat_name()))
        .collect();

    let update_labels = updates
        .iter()
        .enumerate()
        .map(|(index, update)| {
            let shared = short.iter().filter(|name| **name == short[index]).count() > 1;
            claim_label(update, shared, index + 1, &mut taken)
        })
        .collect();

    (completion_label, update_labels)
}

fn claim_label(response: &TypeRef, qualify: bool, ordinal: usize, taken: &mut Vec<String>) -> String {
    let short = response.flat_name();

    let mut label = if qualify || taken.contains(&lowercase_first_letter(&short)) {
        let package: String = response
            .package
            .split('.')
            .map(lower_underscore_to_upper_camel)
            .collect();
        format!("{package}{short}")
    } else {
        short
    };

    while taken.contains(&lowercase_first_letter(&label)) {
        label.push_str(&ordinal.to_string());
    }

    taken.push(lowercase_first_letter(&label));
    label
}

pub fn extract_service(
    schema: &Schema,
    file: &FileDescriptor,
    service: &ServiceDescriptor,
) -> Result<ServiceModel, ConformanceError> {
    let methods = service
        .methods
        .iter()
        .map(|method| extract_method(schema, file, service, method))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ServiceModel {
        name: service.name.clone(),
        methods,
    })
}

pub fn extract_file(schema: &Schema, file: &FileDescriptor) -> Result<FileModel, GenerateError> {
    let annotations = FileAnnotations::read(file);

    let (api_major_version, api_minor_version) =
        match (annotations.api_major_version, annotations.api_minor_version) {
            (Some(major), Some(minor)) => (major, minor),
            _ => {
                return Err(GenerateError::MissingVersion {
                    file: file.name.clone(),
                })
            }
        };

    let services = file
        .services
        .iter()
        .map(|service| extract_service(schema, file, service))
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "{}: extracted {} services (api {api_major_version}.{api_minor_version})",
        file.name,
        services.len()
    );

    Ok(FileModel {
        name: file.name.clone(),
        package: file.package.clone(),
        api_major_version,
        api_minor_version,
        objc_class_prefix: annotations.objc_class_prefix.unwrap_or_default(),
        services,
    })
}

#[cfg(test)]
mod tests {
    use super::{extract_file, ResponseKey, ResponseSet, StreamingMode};
    use crate::{
        expand::Callback,
        schema::TypeRef,
        testing::{schema, PAYMENT_PROTO},
    };

    #[test]
    fn streaming_modes() {
        assert_eq!(StreamingMode::from_flags(false, false), StreamingMode::None);
        assert_eq!(StreamingMode::from_flags(true, false), StreamingMode::Client);
        assert_eq!(StreamingMode::from_flags(false, true), StreamingMode::Server);
        assert_eq!(StreamingMode::from_flags(true, true), StreamingMode::Bidi);
        assert_eq!(StreamingMode::Bidi.to_string(), "bidi");
    }

    #[test]
    fn extracts_payment_model() {
        let schema = schema(&[("payment.proto", PAYMENT_PROTO)]);
        let file = schema.file("payment.proto").expect("file");

        let model = extract_file(&schema, file).unwrap();
        assert_eq!(model.api_major_version, 1);
        assert_eq!(model.api_minor_version, 0);
        assert_eq!(model.services.len(), 1);

        let charge = &model.services[0].methods[0];
        assert_eq!(charge.name, "Charge");
        assert_eq!(charge.input_type, TypeRef::parse("payment.ChargeArgs", ""));
        assert_eq!(charge.completion_response.name, "ChargeResult");
        assert_eq!(charge.completion_response.package, "payment");
        assert_eq!(charge.update_responses.len(), 1);
        assert_eq!(charge.update_responses[0].name, "ChargeProgress");
        assert_eq!(charge.streaming, StreamingMode::None);
        assert_eq!(charge.overloads.count(), 4);
        assert_eq!(
            charge.callback_response(Callback::Update(0)).map(|r| r.name.as_str()),
            Some("ChargeProgress")
        );
        assert_eq!(charge.callback_response(Callback::Error), None);

        let responses: Vec<_> = charge.responses().map(|r| r.name.as_str()).collect();
        assert_eq!(responses, vec!["ChargeProgress", "ChargeResult"]);

        let set = ResponseSet::of_file(&model, ResponseKey::Name);
        let names: Vec<_> = set.iter().collect();
        assert_eq!(names, vec!["ChargeProgress", "ChargeResult", "PingResult"]);
    }

    #[test]
    fn response_set_order_ignores_insertion_order() {
        let names = ["Zeta", "alpha", "Beta", "Zeta", "Alpha", "beta"];
        let expected: ResponseSet = names.iter().map(|s| s.to_string()).collect();

        for rotation in 0..names.len() {
            let mut shuffled = names.to_vec();
            shuffled.rotate_left(rotation);
            if rotation % 2 == 1 {
                shuffled.reverse();
            }

            let set: ResponseSet = shuffled.iter().map(|s| s.to_string()).collect();
            assert_eq!(set, expected);
            assert_eq!(
                set.iter().collect::<Vec<_>>(),
                vec!["Alpha", "Beta", "Zeta", "alpha", "beta"]
            );
        }
    }

    #[test]
    fn drops_repeated_updates() {
        let text = r#"
            option (api_major_version) = 1;
            option (api_minor_version) = 2;
            package p;
            service S {
                rpc M (A) returns (B) {
                    option (update_response) = "p.Step";
                    option (update_response) = "Step";
                    option (update_response) = "p.Done";
                    option (completion_response) = "p.Done";
                }
            }
        "#;
        let schema = schema(&[("p.proto", text)]);
        let model = extract_file(&schema, schema.file("p.proto").expect("file")).unwrap();

        let method = &model.services[0].methods[0];
        assert_eq!(method.update_responses, vec![TypeRef::parse("p.Step", "")]);
        assert_eq!(method.overloads.count(), 4);
    }

    #[test]
    fn callback_labels_never_collide() {
        let text = r#"
            option (api_major_version) = 1;
            option (api_minor_version) = 0;
            package p;
            service S {
                rpc M (A) returns (B) {
                    option (update_response) = "p.Error";
                    option (update_response) = "p.Completion";
                    option (update_response) = "a.Progress";
                    option (update_response) = "b.Progress";
                    option (update_response) = "q.Done";
                    option (completion_response) = "p.Done";
                }
            }
        "#;
        let schema = schema(&[("p.proto", text)]);
        let model = extract_file(&schema, schema.file("p.proto").expect("file")).unwrap();

        let method = &model.services[0].methods[0];
        assert_eq!(method.completion_label, "Done");
        assert_eq!(
            method.update_labels,
            vec!["PError", "PCompletion", "AProgress", "BProgress", "QDone"]
        );
        assert_eq!(method.callback_label(Callback::Error), "Error");
        assert_eq!(method.callback_label(Callback::Update(2)), "AProgress");
        assert_eq!(method.callback_label(Callback::Completion), "Done");
    }

    #[test]
    fn unqualified_clashes_are_numbered() {
        let text = r#"
            option (api_major_version) = 1;
            option (api_minor_version) = 0;
            service S {
                rpc M (A) returns (B) {
                    option (update_response) = "Error";
                    option (completion_response) = "Done";
                }
            }
        "#;
        let schema = schema(&[("p.proto", text)]);
        let model = extract_file(&schema, schema.file("p.proto").expect("file")).unwrap();

        assert_eq!(model.services[0].methods[0].update_labels, vec!["Error1"]);
    }

    #[test]
    fn nested_responses_keep_their_package() {
        let text = r#"
            option (api_major_version) = 1;
            option (api_minor_version) = 0;
            package p;
            service S {
                rpc M (Outer) returns (Outer.Inner) {
                    option (update_response) = "Outer.Inner";
                    option (completion_response) = "p.Outer.Inner";
                }
            }
            message Outer {
                message Inner { int32 x = 1; }
            }
        "#;
        let schema = schema(&[("p.proto", text)]);
        let model = extract_file(&schema, schema.file("p.proto").expect("file")).unwrap();

        let method = &model.services[0].methods[0];
        assert_eq!(method.completion_response.package, "p");
        assert_eq!(method.completion_response.name, "Outer.Inner");
        assert_eq!(method.completion_label, "Outer_Inner");
        assert!(method.update_responses.is_empty());
    }

    #[test]
    fn package_keys() {
        let schema = schema(&[("payment.proto", PAYMENT_PROTO)]);
        let model =
            extract_file(&schema, schema.file("payment.proto").expect("file")).unwrap();

        let packages = ResponseSet::of_service(&model.services[0], ResponseKey::Package);
        assert_eq!(packages.iter().collect::<Vec<_>>(), vec!["payment"]);

        let full = ResponseSet::of_method(&model.services[0].methods[0], ResponseKey::FullName);
        assert!(full.contains("payment.ChargeResult"));
        assert_eq!(full.len(), 2);
    }
}
