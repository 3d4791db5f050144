//! The generation pipeline for one file: parameters, validation, model
//! extraction, rendering and the output path check. Any fatal error returns
//! before a single file is produced.

use std::collections::HashSet;

use crate::{
    emit::{render, EmitOptions, GeneratedFile, RenderContext, Target},
    error::{Diagnostic, GenerateError},
    example_values::ExampleValues,
    model::extract_file,
    params,
    schema::Schema,
    validate::validate,
};

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub target: Target,
    /// `key=value,key=value` generator parameter.
    pub parameter: String,
    pub options: EmitOptions,
    /// Literals for the request fields of examples and tests. Placeholders
    /// are used when unset.
    pub example_values: Option<ExampleValues>,
}

impl GenerateRequest {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            parameter: String::new(),
            options: EmitOptions::default(),
            example_values: None,
        }
    }
}

/// Output of a successful run. `diagnostics` lists the artifacts that were
/// degraded by unresolved types.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    pub files: Vec<GeneratedFile>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn generate(
    schema: &Schema,
    file_name: &str,
    request: &GenerateRequest,
) -> Result<Generation, GenerateError> {
    let parameters = params::parse(&request.parameter, request.target.parameter_keys())?;

    let file = schema
        .file(file_name)
        .ok_or_else(|| GenerateError::UnknownFile(file_name.to_string()))?;

    validate(file)?;
    let model = extract_file(schema, file)?;

    let ctx = RenderContext::new(schema, file, &model).with_example_values(request.example_values.as_ref());

    let emitter = request.target.emitter(&parameters);
    let mut diagnostics = Vec::new();
    let files = render(emitter.as_ref(), ctx, request.options, &mut diagnostics)?;

    check_collisions(&files)?;

    log::debug!(
        "{file_name}: generated {} {} files with {} diagnostics",
        files.len(),
        request.target,
        diagnostics.len()
    );

    Ok(Generation { files, diagnostics })
}

/// Fails on the first path produced twice.
pub fn check_collisions(files: &[GeneratedFile]) -> Result<(), GenerateError> {
    let mut seen = HashSet::new();

    for file in files {
        if !seen.insert(file.path.as_str()) {
            return Err(GenerateError::PathCollision {
                path: file.path.clone(),
            });
        }
    }

    Ok(())
}
