use crate::{
    annotations::{FileAnnotations, MethodAnnotations},
    error::{ConformanceError, GenerateError},
    schema::FileDescriptor,
};

/// Checks everything the emitters rely on before anything is rendered: no
/// generic services, both API versions present and a completion response on
/// every method.
pub fn validate(file: &FileDescriptor) -> Result<(), GenerateError> {
    let annotations = FileAnnotations::read(file);

    if annotations.cc_generic_services {
        return Err(GenerateError::GenericServices {
            file: file.name.clone(),
        });
    }

    if annotations.api_major_version.is_none() || annotations.api_minor_version.is_none() {
        return Err(GenerateError::MissingVersion {
            file: file.name.clone(),
        });
    }

    check_conformance(file)?;

    log::debug!("{} is conformant", file.name);

    Ok(())
}

/// Fails on the first method, in declaration order, without a completion
/// response.
pub fn check_conformance(file: &FileDescriptor) -> Result<(), ConformanceError> {
    for service in &file.services {
        for method in &service.methods {
            if MethodAnnotations::read(method).completion_response.is_none() {
                return Err(ConformanceError {
                    service: service.name.clone(),
                    method: method.name.clone(),
                    reason: "does not contain a completion response".to_string(),
                });
            }
        }
    }

    Ok(())
}
