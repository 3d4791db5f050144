//! Typed reads of the options the generator understands. Nothing else in the
//! crate looks at raw options.
//!
//! Extension names are matched on their last segment, so
//! `(completion_response)` and `(ddp.api.common.completion_response)` are the
//! same annotation.

use proto_parser::option::OptionValue;

use crate::schema::{FileDescriptor, MethodDescriptor, RawOption};

pub const API_MAJOR_VERSION: &str = "api_major_version";
pub const API_MINOR_VERSION: &str = "api_minor_version";
pub const CC_GENERIC_SERVICES: &str = "cc_generic_services";
pub const OBJC_CLASS_PREFIX: &str = "objc_class_prefix";
pub const COMPLETION_RESPONSE: &str = "completion_response";
pub const UPDATE_RESPONSE: &str = "update_response";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAnnotations {
    pub api_major_version: Option<u32>,
    pub api_minor_version: Option<u32>,
    pub cc_generic_services: bool,
    pub objc_class_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodAnnotations {
    pub completion_response: Option<String>,
    /// In declaration order.
    pub update_responses: Vec<String>,
}

impl FileAnnotations {
    pub fn read(file: &FileDescriptor) -> Self {
        let mut annotations = Self::default();

        for option in &file.options {
            match option.short_name.as_str() {
                API_MAJOR_VERSION => annotations.api_major_version = read_u32(&file.name, option),
                API_MINOR_VERSION => annotations.api_minor_version = read_u32(&file.name, option),
                CC_GENERIC_SERVICES => {
                    annotations.cc_generic_services = matches!(
                        &option.value,
                        OptionValue::Identifier(value) if value == "true"
                    )
                }
                OBJC_CLASS_PREFIX => {
                    annotations.objc_class_prefix = Some(option.value.text().to_string())
                }
                _ => {}
            }
        }

        annotations
    }
}

impl MethodAnnotations {
    pub fn read(method: &MethodDescriptor) -> Self {
        let mut annotations = Self::default();

        for option in &method.options {
            match option.short_name.as_str() {
                COMPLETION_RESPONSE => {
                    if let Some(previous) = &annotations.completion_response {
                        log::warn!(
                            "{}: completion response {previous} overridden by {}",
                            method.name,
                            option.value.text()
                        );
                    }
                    annotations.completion_response = Some(option.value.text().to_string());
                }
                UPDATE_RESPONSE => annotations
                    .update_responses
                    .push(option.value.text().to_string()),
                _ => {}
            }
        }

        annotations
    }
}

fn read_u32(file: &str, option: &RawOption) -> Option<u32> {
    let text = option.value.text();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    };

    if parsed.is_none() {
        log::warn!("{file}: option {} has non-integer value {text:?}", option.name);
    }

    parsed
}
