//! Single C++ header per file: one abstract class per service with the
//! canonical callback form pure virtual and the shorter forms inline.

use std::{collections::BTreeMap, fmt};

use crate::{
    cw_writeln,
    error::Diagnostic,
    expand::{Callback, CallbackForm},
    model::{FileModel, MethodModel, ServiceModel, StreamingMode},
    naming::{filename_identifier, strip_proto},
    schema::TypeRef,
};

use super::{
    callback_parameter, Artifact, ArtifactKind, EmitOptions, Emitter, RenderContext, Target,
    Writer,
};

pub const SERVICES_NAMESPACE: &str = "services_namespace";

const CALLBACK_TEMPLATE: &str = "::ddprpc::Callback";
const ERROR_RESPONSE: &str = "::ddprpc::ErrorResponse";

#[derive(Debug, Clone, Default)]
pub struct CppEmitter {
    services_namespace: Option<String>,
}

impl CppEmitter {
    pub fn new(parameters: &BTreeMap<String, String>) -> Self {
        Self {
            services_namespace: parameters
                .get(SERVICES_NAMESPACE)
                .filter(|namespace| !namespace.is_empty())
                .cloned(),
        }
    }
}

fn guard(file_name: &str) -> String {
    format!("__DDPRPC_{}__INCLUDED", filename_identifier(file_name))
}

/// `payment.sub.ChargeResult` -> `::payment::sub::ChargeResult`
fn qualified_class(type_ref: &TypeRef) -> String {
    let mut name = String::new();
    if !type_ref.package.is_empty() {
        for part in type_ref.package.split('.') {
            name.push_str("::");
            name.push_str(part);
        }
    }
    name.push_str("::");
    name.push_str(&type_ref.flat_name());
    name
}

fn callback_type(method: &MethodModel, callback: Callback) -> String {
    let argument = match method.callback_response(callback) {
        Some(response) => qualified_class(response),
        None => ERROR_RESPONSE.to_string(),
    };
    format!("{CALLBACK_TEMPLATE}<{argument}>")
}

fn signature(method: &MethodModel, form: &CallbackForm) -> String {
    let mut parameters = vec![format!("const {}& args", qualified_class(&method.input_type))];
    for callback in &form.callbacks {
        parameters.push(format!(
            "{} {}",
            callback_type(method, *callback),
            callback_parameter(method, *callback)
        ));
    }
    format!("void {}({})", method.name, parameters.join(", "))
}

/// Arguments a shorter form passes to the canonical one.
fn forwarded_arguments(method: &MethodModel, form: &CallbackForm) -> String {
    let mut arguments = vec!["args".to_string()];
    for callback in &method.overloads.canonical.callbacks {
        if form.includes(*callback) {
            arguments.push(callback_parameter(method, *callback));
        } else {
            arguments.push("nullptr".to_string());
        }
    }
    arguments.join(", ")
}

fn write_method(w: &mut Writer, method: &MethodModel) -> fmt::Result {
    if method.streaming != StreamingMode::None {
        cw_writeln!(w, "// {} streaming", method.streaming)?;
    }

    for form in &method.overloads.sugar {
        w.block(&signature(method, form), |w| {
            cw_writeln!(w, "{}({});", method.name, forwarded_arguments(method, form))
        })?;
    }

    cw_writeln!(
        w,
        "virtual {} = 0;",
        signature(method, &method.overloads.canonical)
    )
}

fn write_service(w: &mut Writer, service: &ServiceModel) -> fmt::Result {
    w.block_closed_by(&format!("class {} {{", service.name), "};", |w| {
        w.writeln("public:")?;
        cw_writeln!(w, "virtual ~{}() {{}}", service.name)?;

        for method in &service.methods {
            w.blank_line()?;
            write_method(w, method)?;
        }

        Ok(())
    })
}

impl Emitter for CppEmitter {
    fn target(&self) -> Target {
        Target::Cpp
    }

    fn artifacts<'a>(
        &self,
        model: &'a FileModel,
        _options: EmitOptions,
    ) -> Vec<Artifact<'a>> {
        vec![Artifact::file(
            format!("{}.ddprpc.pb.h", strip_proto(&model.name)),
            ArtifactKind::Interface,
        )]
    }

    fn prologue(&self, ctx: RenderContext<'_>, _artifact: &Artifact<'_>, w: &mut Writer) -> fmt::Result {
        let model = ctx.model;
        let guard = guard(&model.name);

        w.writeln("// Generated by the ddpRPC protobuf plugin.")?;
        w.writeln("// If you make any local change, they will be lost.")?;
        cw_writeln!(w, "// source: {}", model.name)?;
        cw_writeln!(w, "#ifndef {guard}")?;
        cw_writeln!(w, "#define {guard}")?;
        w.blank_line()?;
        cw_writeln!(w, "#define DDP_API_MAJOR_VERSION {}", model.api_major_version)?;
        cw_writeln!(w, "#define DDP_API_MINOR_VERSION {}", model.api_minor_version)?;
        w.blank_line()?;
        cw_writeln!(w, "#include \"{}.pb.h\"", strip_proto(&model.name))?;
        w.blank_line()
    }

    fn includes(&self, ctx: RenderContext<'_>, _artifact: &Artifact<'_>, w: &mut Writer) -> fmt::Result {
        let model = ctx.model;

        w.writeln("#include <ddprpc/callback.h>")?;
        w.writeln("#include <functional>")?;
        w.blank_line()?;

        // Keyed by full name for the declaration order; the names are not
        // re-split since nested messages contain dots too.
        let responses: BTreeMap<String, &TypeRef> = model
            .services
            .iter()
            .flat_map(|service| &service.methods)
            .flat_map(|method| method.responses())
            .map(|response| (response.full_name(), response))
            .collect();

        let (own, foreign): (Vec<&TypeRef>, Vec<&TypeRef>) = responses
            .into_values()
            .partition(|response| response.package == model.package);

        for response in &foreign {
            let mut line = String::new();
            let parts: Vec<&str> = if response.package.is_empty() {
                Vec::new()
            } else {
                response.package.split('.').collect()
            };
            for part in &parts {
                line.push_str(&format!("namespace {part} {{ "));
            }
            line.push_str(&format!("class {};", response.flat_name()));
            for _ in &parts {
                line.push_str(" }");
            }
            w.writeln(&line)?;
        }
        if !foreign.is_empty() {
            w.blank_line()?;
        }

        for part in model.package_parts() {
            cw_writeln!(w, "namespace {part} {{")?;
        }
        if !model.package.is_empty() {
            w.blank_line()?;
        }

        for response in &own {
            cw_writeln!(w, "class {};", response.flat_name())?;
        }
        if !own.is_empty() {
            w.blank_line()?;
        }

        Ok(())
    }

    fn body(
        &self,
        ctx: RenderContext<'_>,
        _artifact: &Artifact<'_>,
        w: &mut Writer,
        _diagnostics: &mut Vec<Diagnostic>,
    ) -> fmt::Result {
        if let Some(namespace) = &self.services_namespace {
            cw_writeln!(w, "namespace {namespace} {{")?;
            w.blank_line()?;
        }

        for service in &ctx.model.services {
            write_service(w, service)?;
            w.blank_line()?;
        }

        if let Some(namespace) = &self.services_namespace {
            cw_writeln!(w, "}}  // namespace {namespace}")?;
            w.blank_line()?;
        }

        Ok(())
    }

    fn epilogue(&self, ctx: RenderContext<'_>, _artifact: &Artifact<'_>, w: &mut Writer) -> fmt::Result {
        let model = ctx.model;

        for part in model.package_parts().iter().rev() {
            cw_writeln!(w, "}}  // namespace {part}")?;
        }
        if !model.package.is_empty() {
            w.blank_line()?;
        }

        cw_writeln!(w, "#endif  // {}", guard(&model.name))
    }
}
