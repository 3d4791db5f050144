//! Target renderers. Every target implements [`Emitter`]; [`render`] drives
//! the prologue, includes, body and epilogue stages of each artifact into
//! separate buffers and concatenates them. Example and test files are cut
//! from per-method templates by [`examples`].

pub mod cpp;
pub mod examples;
pub mod nodejs;
pub mod objc;

use std::{collections::BTreeMap, fmt};

use crate::{
    code_writer::CodeWriter,
    error::{Diagnostic, GenerateError},
    example_values::ExampleValues,
    expand::Callback,
    model::{FileModel, MethodModel, ServiceModel},
    naming::lowercase_first_letter,
    schema::{FileDescriptor, MessageDescriptor, Schema, TypeRef},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Cpp,
    Objc,
    Nodejs,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Cpp, Target::Objc, Target::Nodejs];

    pub fn name(self) -> &'static str {
        match self {
            Self::Cpp => "cpp",
            Self::Objc => "objc",
            Self::Nodejs => "nodejs",
        }
    }

    /// Generator parameter keys the target understands.
    pub fn parameter_keys(self) -> &'static [&'static str] {
        match self {
            Self::Cpp => &[cpp::SERVICES_NAMESPACE],
            Self::Objc => &[
                objc::CLASS_PREFIX,
                examples::EXAMPLES_DIR,
                examples::TESTS_DIR,
                examples::STANDALONE_DIR,
            ],
            Self::Nodejs => &[
                nodejs::RUNTIME_MODULE,
                examples::EXAMPLES_DIR,
                examples::TESTS_DIR,
                examples::STANDALONE_DIR,
            ],
        }
    }

    pub fn emitter(self, parameters: &BTreeMap<String, String>) -> Box<dyn Emitter> {
        match self {
            Self::Cpp => Box::new(cpp::CppEmitter::new(parameters)),
            Self::Objc => Box::new(objc::ObjcEmitter::new(parameters)),
            Self::Nodejs => Box::new(nodejs::NodejsEmitter::new(parameters)),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

/// Which auxiliary artifacts to produce for targets that have them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOptions {
    pub simulator: bool,
    pub examples: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            simulator: true,
            examples: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Interface,
    Implementation,
    SimulatorHeader,
    SimulatorSource,
}

#[derive(Debug, Clone)]
pub struct Artifact<'a> {
    pub path: String,
    pub kind: ArtifactKind,
    /// Set for per-service artifacts.
    pub service: Option<&'a ServiceModel>,
}

impl<'a> Artifact<'a> {
    pub fn file(path: String, kind: ArtifactKind) -> Self {
        Self {
            path,
            kind,
            service: None,
        }
    }

    pub fn service(path: String, kind: ArtifactKind, service: &'a ServiceModel) -> Self {
        Self {
            path,
            kind,
            service: Some(service),
        }
    }
}

/// Everything a stage may read. Nothing in it is mutable.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub schema: &'a Schema,
    pub file: &'a FileDescriptor,
    pub model: &'a FileModel,
    pub example_values: Option<&'a ExampleValues>,
}

impl<'a> RenderContext<'a> {
    pub fn new(schema: &'a Schema, file: &'a FileDescriptor, model: &'a FileModel) -> Self {
        Self {
            schema,
            file,
            model,
            example_values: None,
        }
    }

    pub fn with_example_values(self, example_values: Option<&'a ExampleValues>) -> Self {
        Self {
            example_values,
            ..self
        }
    }
}

pub type Writer = CodeWriter<String>;

pub trait Emitter {
    fn target(&self) -> Target;

    fn indent_spaces(&self) -> usize {
        2
    }

    /// Output paths of the file, in emission order.
    fn artifacts<'a>(&self, model: &'a FileModel, options: EmitOptions) -> Vec<Artifact<'a>>;

    fn prologue(&self, ctx: RenderContext<'_>, artifact: &Artifact<'_>, w: &mut Writer) -> fmt::Result;

    fn includes(&self, ctx: RenderContext<'_>, artifact: &Artifact<'_>, w: &mut Writer) -> fmt::Result;

    fn body(
        &self,
        ctx: RenderContext<'_>,
        artifact: &Artifact<'_>,
        w: &mut Writer,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> fmt::Result;

    fn epilogue(&self, _ctx: RenderContext<'_>, _artifact: &Artifact<'_>, _w: &mut Writer) -> fmt::Result {
        Ok(())
    }

    /// Targets with example files say where they go.
    fn example_layout(&self) -> Option<&examples::ExampleLayout> {
        None
    }

    /// Marked-up template of one method, see [`examples`]. `artifact` names
    /// the example file for diagnostics.
    fn method_template(
        &self,
        _ctx: RenderContext<'_>,
        _service: &ServiceModel,
        _method: &MethodModel,
        _artifact: &str,
        _w: &mut Writer,
        _diagnostics: &mut Vec<Diagnostic>,
    ) -> fmt::Result {
        Ok(())
    }
}

/// Renders every artifact of the file, then its example files. Unresolved
/// types are pushed to `diagnostics` and only drop the affected lines.
pub fn render(
    emitter: &dyn Emitter,
    ctx: RenderContext<'_>,
    options: EmitOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<GeneratedFile>, GenerateError> {
    let artifacts = emitter.artifacts(ctx.model, options);
    let mut files = Vec::with_capacity(artifacts.len());

    for artifact in &artifacts {
        let content = render_artifact(emitter, ctx, artifact, diagnostics).map_err(|source| {
            GenerateError::Render {
                artifact: artifact.path.clone(),
                source,
            }
        })?;

        log::debug!(
            "{}: rendered {} ({} bytes)",
            emitter.target(),
            artifact.path,
            content.len()
        );

        files.push(GeneratedFile {
            path: artifact.path.clone(),
            content,
        });
    }

    if options.examples {
        if let Some(layout) = emitter.example_layout() {
            files.extend(examples::render(emitter, layout, ctx, diagnostics)?);
        }
    }

    Ok(files)
}

fn render_artifact(
    emitter: &dyn Emitter,
    ctx: RenderContext<'_>,
    artifact: &Artifact<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String, fmt::Error> {
    let writer = || CodeWriter::with_indent_spaces(String::new(), emitter.indent_spaces());

    let mut prologue = writer();
    emitter.prologue(ctx, artifact, &mut prologue)?;

    let mut includes = writer();
    emitter.includes(ctx, artifact, &mut includes)?;

    let mut body = writer();
    emitter.body(ctx, artifact, &mut body, diagnostics)?;

    let mut epilogue = writer();
    emitter.epilogue(ctx, artifact, &mut epilogue)?;

    Ok([prologue, includes, body, epilogue]
        .into_iter()
        .map(CodeWriter::into_inner)
        .collect())
}

/// Label of a callback as it appears in parameter names: `error`, the lower
/// camel update label, or `completion`.
pub fn callback_label(method: &MethodModel, callback: Callback) -> String {
    match callback {
        Callback::Error => "error".to_string(),
        Callback::Completion => "completion".to_string(),
        Callback::Update(_) => lowercase_first_letter(method.callback_label(callback)),
    }
}

pub fn callback_parameter(method: &MethodModel, callback: Callback) -> String {
    format!("{}Callback", callback_label(method, callback))
}

/// Finds the message `type_ref` names by its package-relative name, searching
/// the file and then its direct imports in order. A miss is recorded against `artifact` and logged.
pub fn resolve_message<'a>(
    ctx: RenderContext<'a>,
    type_ref: &TypeRef,
    artifact: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<&'a MessageDescriptor> {
    let found = ctx.schema.find_message(ctx.file, &type_ref.name);

    if found.is_none() {
        let diagnostic = Diagnostic {
            artifact: artifact.to_string(),
            message: format!(
                "could not find {} in {} or its imports, skipping its fields",
                type_ref.full_name(),
                ctx.file.name
            ),
        };
        log::warn!("{diagnostic}");
        diagnostics.push(diagnostic);
    }

    found
}

/// File declaring `response`, if it is the current file or a direct import.
pub fn defining_file<'a>(ctx: RenderContext<'a>, response: &TypeRef) -> Option<&'a FileDescriptor> {
    std::iter::once(ctx.file)
        .chain(
            ctx.file
                .dependencies
                .iter()
                .filter_map(|dependency| ctx.schema.file(dependency)),
        )
        .find(|candidate| {
            candidate.package == response.package && candidate.find_message(&response.name).is_some()
        })
}
