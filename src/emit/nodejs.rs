//! Node.js client. JavaScript has no overloading, so every callback form is
//! its own method named after the callbacks it takes. All forms funnel into
//! the canonical one, which also returns a promise settled by the completion
//! or error response.

use std::{collections::BTreeMap, fmt};

use proto_parser::ScalarType;

use crate::{
    cw_write, cw_writeln,
    error::Diagnostic,
    expand::{Callback, CallbackForm},
    model::{FileModel, MethodModel, ResponseKey, ResponseSet, ServiceModel},
    naming::{lower_camel, lowercase_first_letter},
    schema::{FieldDescriptor, FieldKind, Label},
};

use super::{
    callback_parameter,
    examples::{example_value, ExampleLayout, FileNaming},
    resolve_message, Artifact, ArtifactKind, EmitOptions, Emitter, RenderContext, Target, Writer,
};

pub const RUNTIME_MODULE: &str = "runtime_module";

const DEFAULT_RUNTIME_MODULE: &str = "ddprpc-runtime";
const SIMULATOR_FILE: &str = "simulator.js";
const EXAMPLES_FILE: &str = "examples.template.js";
const API_REQUIRE: &str = "const DotDashPayAPI = require('dotdashpay');";
const ERROR_SIGNAL: &str = "ErrorResponse";

#[derive(Debug, Clone)]
pub struct NodejsEmitter {
    runtime_module: String,
    examples: ExampleLayout,
}

impl NodejsEmitter {
    pub fn new(parameters: &BTreeMap<String, String>) -> Self {
        Self {
            runtime_module: parameters
                .get(RUNTIME_MODULE)
                .filter(|module| !module.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_RUNTIME_MODULE.to_string()),
            examples: ExampleLayout::new(
                parameters,
                EXAMPLES_FILE,
                FileNaming::new("", ".example.js"),
                FileNaming::new("", ".test.js"),
            ),
        }
    }
}

fn service_file(service: &ServiceModel) -> String {
    format!("{}.js", lowercase_first_letter(&service.name))
}

/// `charge`, `chargeOnError`, `chargeOnChargeProgress`,
/// `chargeOnErrorOnChargeProgress`.
pub fn form_method_name(method: &MethodModel, form: &CallbackForm) -> String {
    let mut name = lowercase_first_letter(&method.name);
    for callback in &form.callbacks {
        match callback {
            Callback::Error => name.push_str("OnError"),
            Callback::Update(_) => {
                name.push_str("On");
                name.push_str(method.callback_label(*callback));
            }
            Callback::Completion => {}
        }
    }
    name
}

fn parameters(method: &MethodModel, form: &CallbackForm) -> String {
    std::iter::once("args".to_string())
        .chain(form.callbacks.iter().map(|callback| callback_parameter(method, *callback)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn signal_name(method: &MethodModel, callback: Callback) -> String {
    match method.callback_response(callback) {
        Some(response) => response.flat_name(),
        None => ERROR_SIGNAL.to_string(),
    }
}

fn placeholder(field: &FieldDescriptor) -> &'static str {
    if field.label == Label::Repeated {
        return "[]";
    }

    match &field.kind {
        FieldKind::Map { .. } => "{}",
        FieldKind::Enum(_) => "0",
        FieldKind::Message(_) => "null",
        FieldKind::Scalar(ScalarType::Bool) => "false",
        FieldKind::Scalar(ScalarType::String) => "''",
        FieldKind::Scalar(ScalarType::Bytes) => "null",
        FieldKind::Scalar(_) => "0",
    }
}

fn write_banner(w: &mut Writer, model: &FileModel) -> fmt::Result {
    w.writeln("// Generated by the ddpRPC protobuf plugin.")?;
    w.writeln("// If you make any local change, they will be lost.")?;
    cw_writeln!(w, "// source: {}", model.name)?;
    w.writeln("'use strict';")?;
    w.blank_line()
}

fn write_canonical(w: &mut Writer, method: &MethodModel) -> fmt::Result {
    let canonical = &method.overloads.canonical;

    w.block(
        &format!("{}({})", form_method_name(method, canonical), parameters(method, canonical)),
        |w| {
            for callback in &canonical.callbacks {
                cw_writeln!(w, "SignalManager.clear('{}');", signal_name(method, *callback))?;
            }

            w.block_closed_by("const promise = new Promise((resolve, reject) => {", "});", |w| {
                w.block_closed_by(
                    &format!(
                        "Bridge.getInstance().sendRequest('{}', args, (sent) => {{",
                        method.name
                    ),
                    "});",
                    |w| {
                        w.block("if (!sent)", |w| {
                            w.writeln("reject(ErrorResponse.notAcknowledged());")?;
                            w.writeln("return;")
                        })?;

                        cw_writeln!(w, "SignalManager.on('{ERROR_SIGNAL}', reject);")?;
                        for callback in &canonical.callbacks {
                            if let Callback::Update(_) = callback {
                                let parameter = callback_parameter(method, *callback);
                                w.block(&format!("if ({parameter})"), |w| {
                                    cw_writeln!(
                                        w,
                                        "SignalManager.on('{}', {parameter});",
                                        signal_name(method, *callback)
                                    )
                                })?;
                            }
                        }
                        cw_writeln!(
                            w,
                            "SignalManager.on('{}', resolve);",
                            signal_name(method, Callback::Completion)
                        )
                    },
                )
            })?;

            w.writeln("promise.then(completionCallback || noop, errorCallback || noop);")?;
            w.writeln("return promise;")
        },
    )
}

fn write_service(w: &mut Writer, service: &ServiceModel) -> fmt::Result {
    w.block(&format!("class {}", service.name), |w| {
        w.block("constructor()", |w| {
            w.writeln("this.apiMajorVersion = API_MAJOR_VERSION;")?;
            w.writeln("this.apiMinorVersion = API_MINOR_VERSION;")
        })?;

        for method in &service.methods {
            let canonical = form_method_name(method, &method.overloads.canonical);

            for form in &method.overloads.sugar {
                w.blank_line()?;
                w.block(
                    &format!("{}({})", form_method_name(method, form), parameters(method, form)),
                    |w| {
                        let arguments = method.overloads.canonical.callbacks.iter().map(|callback| {
                            if form.includes(*callback) {
                                callback_parameter(method, *callback)
                            } else {
                                "null".to_string()
                            }
                        });

                        cw_write!(w, "return this.{canonical}(args, ")?;
                        w.write_separated(arguments, ", ", |w, argument| w.write(&argument))?;
                        w.writeln(");")
                    },
                )?;
            }

            w.blank_line()?;
            write_canonical(w, method)?;
        }

        Ok(())
    })
}

impl NodejsEmitter {
    fn write_simulator(&self, ctx: RenderContext<'_>, w: &mut Writer) -> fmt::Result {
        let names = ResponseSet::of_file(ctx.model, ResponseKey::Name);

        w.block("function setResponse(responseName, responseData)", |w| {
            w.writeln("SimulatorHelper.setResponse(responseName, responseData);")
        })?;
        w.blank_line()?;

        w.block("function loadSimulatorSpecification(name)", |w| {
            w.writeln("SimulatorHelper.loadSimulatorSpecification(name);")
        })?;
        w.blank_line()?;

        w.block("function getResponsesForRequest(request)", |w| {
            for method in ctx.model.services.iter().flat_map(|service| &service.methods) {
                let responses: Vec<String> = method
                    .responses()
                    .map(|response| format!("'{}'", response.flat_name()))
                    .collect();

                w.block(&format!("if (request === '{}')", method.name), |w| {
                    cw_writeln!(w, "return [{}];", responses.join(", "))
                })?;
                w.blank_line()?;
            }
            w.writeln("return null;")
        })?;
        w.blank_line()?;

        for name in names.iter() {
            w.block(&format!("function setResponse{name}(response)"), |w| {
                cw_writeln!(w, "setResponse('{name}', response);")
            })?;
            w.blank_line()?;
        }

        w.block_closed_by("module.exports = {", "};", |w| {
            w.writeln("setResponse,")?;
            w.writeln("loadSimulatorSpecification,")?;
            w.writeln("getResponsesForRequest,")?;
            for name in names.iter() {
                cw_writeln!(w, "setResponse{name},")?;
            }
            Ok(())
        })
    }

    /// Example function, mocha case and reference snippet of one method.
    fn write_method_template(
        &self,
        ctx: RenderContext<'_>,
        service: &ServiceModel,
        method: &MethodModel,
        artifact: &str,
        w: &mut Writer,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> fmt::Result {
        let api = format!("DotDashPayAPI.{}", lowercase_first_letter(&service.name));
        let id = format!("{}.{}", service.name, method.name);
        let args = args_lines(ctx, method, artifact, diagnostics);
        let canonical = &method.overloads.canonical;

        w.writeln("// @single(example-includes(all))")?;
        w.writeln(API_REQUIRE)?;
        w.writeln("// @single-end()")?;
        w.blank_line()?;
        w.writeln("// @test(test-includes)")?;
        w.writeln("const assert = require('assert');")?;
        w.writeln("// @test-end()")?;
        w.blank_line()?;

        cw_writeln!(w, "// @example({id})")?;
        w.block(&format!("function example{}()", method.name), |w| {
            cw_writeln!(w, "// @example-args({id})")?;
            for line in &args {
                w.writeln(line)?;
            }
            w.writeln("// @example-args-end()")?;
            w.blank_line()?;

            cw_writeln!(w, "{api}.{}(args,", form_method_name(method, canonical))?;
            {
                let _indent = w.indent();
                cw_writeln!(w, "// @example-error({id})")?;
                w.block_closed_by("(error) => {", "},", |w| {
                    w.writeln("console.error(error.errorMessage);")
                })?;
                w.writeln("// @example-error-end()")?;

                for response in method.responses() {
                    cw_writeln!(w, "// @example-response({}.{})", service.name, response.flat_name())?;
                    w.block_closed_by("(response) => {", "},", |w| {
                        let Some(message) = resolve_message(ctx, response, artifact, diagnostics) else {
                            return Ok(());
                        };
                        for field in &message.fields {
                            let name = lower_camel(&field.name);
                            cw_writeln!(w, "const {name} = response.{name};  // {name} = FILL_IN")?;
                        }
                        Ok(())
                    })?;
                    w.writeln("// @example-response-end()")?;
                }
            }
            w.writeln(");")
        })?;
        w.writeln("// @example-end()")?;
        w.blank_line()?;

        cw_writeln!(w, "// @test({id})")?;
        w.block_closed_by(&format!("describe('{id}', () => {{"), "});", |w| {
            w.block_closed_by("it('settles with the completion response', () => {", "});", |w| {
                for line in &args {
                    w.writeln(line)?;
                }
                w.blank_line()?;
                cw_writeln!(w, "return {api}.{}(args)", lowercase_first_letter(&method.name))?;
                let _indent = w.indent();
                w.block_closed_by(".then((response) => {", "});", |w| w.writeln("assert.ok(response);"))
            })
        })?;
        w.writeln("// @test-end()")?;
        w.blank_line()?;

        cw_writeln!(w, "// @reference({id})")?;
        cw_writeln!(w, "// @standalone({})", method.name)?;
        w.writeln(API_REQUIRE)?;
        w.blank_line()?;
        for line in &args {
            w.writeln(line)?;
        }
        w.blank_line()?;
        cw_writeln!(w, "// @example-request({id})")?;
        cw_writeln!(w, "{api}.{}(args)", lowercase_first_letter(&method.name))?;
        {
            let _indent = w.indent();
            w.block_closed_by(".then((response) => {", "})", |w| w.writeln("// Handle response"))?;
            w.block_closed_by(".catch((error) => {", "});", |w| {
                w.writeln("// Handle error response")
            })?;
        }
        w.writeln("// @example-request-end()")?;
        w.writeln("// @standalone-end()")?;
        w.writeln("// @reference-end()")
    }
}

/// `const args = {};` and an assignment per field, with an example value or
/// a placeholder.
fn args_lines(
    ctx: RenderContext<'_>,
    method: &MethodModel,
    artifact: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<String> {
    let mut lines = vec!["const args = {};".to_string()];

    if let Some(args) = resolve_message(ctx, &method.input_type, artifact, diagnostics) {
        for field in &args.fields {
            let value = example_value(ctx, Target::Nodejs.name(), field, artifact, diagnostics)
                .unwrap_or_else(|| placeholder(field).to_string());
            lines.push(format!("args.{} = {value};", lower_camel(&field.name)));
        }
    }

    lines
}

impl Emitter for NodejsEmitter {
    fn target(&self) -> Target {
        Target::Nodejs
    }

    fn artifacts<'a>(&self, model: &'a FileModel, options: EmitOptions) -> Vec<Artifact<'a>> {
        let mut artifacts: Vec<Artifact<'a>> = model
            .services
            .iter()
            .map(|service| Artifact::service(service_file(service), ArtifactKind::Implementation, service))
            .collect();

        if options.simulator {
            artifacts.push(Artifact::file(SIMULATOR_FILE.to_string(), ArtifactKind::SimulatorSource));
        }

        artifacts
    }

    fn prologue(&self, ctx: RenderContext<'_>, _artifact: &Artifact<'_>, w: &mut Writer) -> fmt::Result {
        write_banner(w, ctx.model)
    }

    fn includes(&self, ctx: RenderContext<'_>, artifact: &Artifact<'_>, w: &mut Writer) -> fmt::Result {
        match artifact.kind {
            ArtifactKind::Implementation => {
                cw_writeln!(
                    w,
                    "const {{ Bridge, ErrorResponse, SignalManager }} = require('{}');",
                    self.runtime_module
                )?;
                w.blank_line()?;
                cw_writeln!(w, "const API_MAJOR_VERSION = {};", ctx.model.api_major_version)?;
                cw_writeln!(w, "const API_MINOR_VERSION = {};", ctx.model.api_minor_version)?;
                w.blank_line()?;
                w.writeln("const noop = () => {};")?;
                w.blank_line()
            }
            ArtifactKind::SimulatorSource => {
                cw_writeln!(w, "const {{ SimulatorHelper }} = require('{}');", self.runtime_module)?;
                w.blank_line()
            }
            _ => Ok(()),
        }
    }

    fn body(
        &self,
        ctx: RenderContext<'_>,
        artifact: &Artifact<'_>,
        w: &mut Writer,
        _diagnostics: &mut Vec<Diagnostic>,
    ) -> fmt::Result {
        match (artifact.kind, artifact.service) {
            (ArtifactKind::Implementation, Some(service)) => write_service(w, service),
            (ArtifactKind::SimulatorSource, _) => self.write_simulator(ctx, w),
            _ => Ok(()),
        }
    }

    fn epilogue(&self, _ctx: RenderContext<'_>, artifact: &Artifact<'_>, w: &mut Writer) -> fmt::Result {
        match (artifact.kind, artifact.service) {
            (ArtifactKind::Implementation, Some(service)) => {
                w.blank_line()?;
                cw_writeln!(w, "module.exports = {};", service.name)
            }
            _ => Ok(()),
        }
    }

    fn example_layout(&self) -> Option<&ExampleLayout> {
        Some(&self.examples)
    }

    fn method_template(
        &self,
        ctx: RenderContext<'_>,
        service: &ServiceModel,
        method: &MethodModel,
        artifact: &str,
        w: &mut Writer,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> fmt::Result {
        self.write_method_template(ctx, service, method, artifact, w, diagnostics)
    }
}
