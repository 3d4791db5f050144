//! Objective-C client: a `.h`/`.m` pair per service built on the Bridge and
//! SignalManager runtime, the simulator manager, and an example and XCTest
//! case per method.
//!
//! Service and simulator classes carry the `class_prefix` parameter. Message
//! classes (args, responses and `ErrorResponse`) carry the file's
//! `objc_class_prefix` option. Signal names are never prefixed.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use proto_parser::ScalarType;

use crate::{
    cw_writeln,
    error::Diagnostic,
    expand::{Callback, CallbackForm},
    model::{FileModel, MethodModel, ResponseKey, ResponseSet, ServiceModel},
    naming::{file_name_in_upper_camel, lower_camel, lowercase_first_letter},
    schema::{FieldDescriptor, FieldKind, Label, TypeRef},
};

use super::{
    callback_parameter, defining_file,
    examples::{example_value, ExampleLayout, FileNaming},
    resolve_message, Artifact, ArtifactKind, EmitOptions, Emitter, RenderContext, Target, Writer,
};

pub const CLASS_PREFIX: &str = "class_prefix";

const DEFAULT_CLASS_PREFIX: &str = "DDP";
const ERROR_RESPONSE: &str = "ErrorResponse";
const EXAMPLES_FILE: &str = "APIExamples.template.m";
const NOT_ACKNOWLEDGED_MESSAGE: &str = "The request was not acknowledged. Please check the connection between this machine and the DotDashPay module.";

#[derive(Debug, Clone)]
pub struct ObjcEmitter {
    class_prefix: String,
    examples: ExampleLayout,
}

impl ObjcEmitter {
    pub fn new(parameters: &BTreeMap<String, String>) -> Self {
        let class_prefix = parameters
            .get(CLASS_PREFIX)
            .cloned()
            .unwrap_or_else(|| DEFAULT_CLASS_PREFIX.to_string());

        Self {
            examples: ExampleLayout::new(
                parameters,
                EXAMPLES_FILE,
                FileNaming::new(format!("{class_prefix}Example."), ".m"),
                FileNaming::new(format!("{class_prefix}Test."), ".m"),
            ),
            class_prefix,
        }
    }

    fn service_class(&self, service: &ServiceModel) -> String {
        format!("{}{}", self.class_prefix, service.name)
    }

    fn simulator_class(&self) -> String {
        format!("{}SimulatorManager", self.class_prefix)
    }
}

/// Generated message classes of a file, all named with its prefix.
struct MessageClasses<'a> {
    prefix: &'a str,
}

impl<'a> MessageClasses<'a> {
    fn of(model: &'a FileModel) -> Self {
        Self {
            prefix: &model.objc_class_prefix,
        }
    }

    fn class(&self, type_ref: &TypeRef) -> String {
        self.named(&type_ref.flat_name())
    }

    fn named(&self, flat_name: &str) -> String {
        format!("{}{flat_name}", self.prefix)
    }

    fn error(&self) -> String {
        format!("{}{ERROR_RESPONSE}", self.prefix)
    }

    fn callback_class(&self, method: &MethodModel, callback: Callback) -> String {
        match method.callback_response(callback) {
            Some(response) => self.class(response),
            None => self.error(),
        }
    }
}

fn selector_part(method: &MethodModel, callback: Callback) -> String {
    format!("on{}", method.callback_label(callback))
}

fn signature(classes: &MessageClasses<'_>, method: &MethodModel, form: &CallbackForm) -> String {
    let mut signature = format!(
        "- (void) {}:({}*)args",
        lowercase_first_letter(&method.name),
        classes.class(&method.input_type)
    );
    for callback in &form.callbacks {
        signature.push_str(&format!(
            " {}:(void(^)({}*)){}",
            selector_part(method, *callback),
            classes.callback_class(method, *callback),
            callback_parameter(method, *callback)
        ));
    }
    signature
}

fn forward_call(method: &MethodModel, form: &CallbackForm) -> String {
    let mut call = format!("[self {}:args", lowercase_first_letter(&method.name));
    for callback in &method.overloads.canonical.callbacks {
        let argument = if form.includes(*callback) {
            callback_parameter(method, *callback)
        } else {
            "nil".to_string()
        };
        call.push_str(&format!(" {}:{argument}", selector_part(method, *callback)));
    }
    call.push_str("];");
    call
}

fn signal_name(method: &MethodModel, callback: Callback) -> String {
    match method.callback_response(callback) {
        Some(response) => response.flat_name(),
        None => ERROR_RESPONSE.to_string(),
    }
}

/// Objective-C type of a generated property, pointer included.
fn field_type(classes: &MessageClasses<'_>, package: &str, field: &FieldDescriptor) -> String {
    if field.label == Label::Repeated {
        return "NSMutableArray*".to_string();
    }

    match &field.kind {
        FieldKind::Map { .. } => "NSMutableDictionary*".to_string(),
        FieldKind::Enum(_) => "int32_t".to_string(),
        FieldKind::Message(name) => format!("{}*", classes.class(&TypeRef::parse(name, package))),
        FieldKind::Scalar(scalar) => match scalar {
            ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => "int32_t",
            ScalarType::Uint32 | ScalarType::Fixed32 => "uint32_t",
            ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => "int64_t",
            ScalarType::Uint64 | ScalarType::Fixed64 => "uint64_t",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
            ScalarType::Bool => "BOOL",
            ScalarType::String => "NSString*",
            ScalarType::Bytes => "NSData*",
        }
        .to_string(),
    }
}

fn placeholder(field_type: &str) -> &'static str {
    if field_type.ends_with('*') {
        "nil"
    } else if field_type == "BOOL" {
        "NO"
    } else {
        "0"
    }
}

impl ObjcEmitter {
    fn write_header_body(&self, ctx: RenderContext<'_>, service: &ServiceModel, w: &mut Writer) -> fmt::Result {
        let classes = MessageClasses::of(ctx.model);

        cw_writeln!(w, "@interface {} : NSObject", self.service_class(service))?;
        w.blank_line()?;

        for method in &service.methods {
            for form in method.overloads.all() {
                cw_writeln!(w, "{};", signature(&classes, method, form))?;
                w.blank_line()?;
            }
        }

        w.writeln("@end")
    }

    fn write_source_body(&self, ctx: RenderContext<'_>, service: &ServiceModel, w: &mut Writer) -> fmt::Result {
        let classes = MessageClasses::of(ctx.model);

        cw_writeln!(w, "@implementation {}", self.service_class(service))?;
        w.blank_line()?;

        for method in &service.methods {
            for form in &method.overloads.sugar {
                w.block(&signature(&classes, method, form), |w| {
                    w.writeln(&forward_call(method, form))
                })?;
                w.blank_line()?;
            }

            w.block(
                &signature(&classes, method, &method.overloads.canonical),
                |w| self.write_canonical(&classes, service, method, w),
            )?;
            w.blank_line()?;
        }

        w.writeln("@end")
    }

    /// Clears stale handlers, sends the request and registers the callbacks
    /// once the bridge acknowledges it.
    fn write_canonical(
        &self,
        classes: &MessageClasses<'_>,
        service: &ServiceModel,
        method: &MethodModel,
        w: &mut Writer,
    ) -> fmt::Result {
        let canonical = &method.overloads.canonical.callbacks;

        for callback in canonical {
            cw_writeln!(w, "[SignalManager clear:@\"{}\"];", signal_name(method, *callback))?;
        }

        cw_writeln!(
            w,
            "[[Bridge getInstance] sendRequest:@\"{}\" withArgs:args completionBlock:^(BOOL sent) {{",
            method.name
        )?;
        {
            let _indent = w.indent();
            cw_writeln!(
                w,
                "VLOG(2, @\"{}::{}: %d\", sent);",
                self.service_class(service),
                method.name
            )?;

            w.block("if (!sent)", |w| {
                w.block("if (errorCallback != nil)", |w| {
                    let error = classes.error();
                    cw_writeln!(w, "{error}* error = [[{error} alloc] init];")?;
                    w.writeln("error.errorCode = @\"RequestNotAcknowledged\";")?;
                    cw_writeln!(w, "error.errorMessage = @\"{NOT_ACKNOWLEDGED_MESSAGE}\";")?;
                    w.writeln("errorCallback(error);")
                })?;
                w.writeln("return;")
            })?;

            for callback in canonical {
                let parameter = callback_parameter(method, *callback);
                let register = format!(
                    "[SignalManager on:@\"{}\" performCallback:{parameter}];",
                    signal_name(method, *callback)
                );

                if *callback == Callback::Completion {
                    w.writeln(&register)?;
                } else {
                    w.block(&format!("if ({parameter} != nil)"), |w| w.writeln(&register))?;
                }
            }
        }
        w.writeln("}];")
    }

    fn write_simulator_header(&self, ctx: RenderContext<'_>, w: &mut Writer) -> fmt::Result {
        let classes = MessageClasses::of(ctx.model);

        cw_writeln!(w, "@interface {} : NSObject", self.simulator_class())?;
        w.blank_line()?;
        w.writeln("+ (void) setResponse:(NSString*)responseName withResponseData:(id)responseData;")?;
        w.blank_line()?;
        w.writeln("+ (void) loadSimulatorSpecification:(NSString*)name;")?;
        w.blank_line()?;
        w.writeln("+ (NSArray*) getResponsesForRequest:(NSString*)request;")?;
        w.blank_line()?;

        for name in ResponseSet::of_file(ctx.model, ResponseKey::Name).iter() {
            cw_writeln!(
                w,
                "+ (void) setResponse{name}:({}*)response;",
                classes.named(name)
            )?;
            w.blank_line()?;
        }

        w.writeln("@end")
    }

    fn write_simulator_source(&self, ctx: RenderContext<'_>, w: &mut Writer) -> fmt::Result {
        let classes = MessageClasses::of(ctx.model);

        cw_writeln!(w, "@implementation {}", self.simulator_class())?;
        w.blank_line()?;

        w.block("+ (void) loadSimulatorSpecification:(NSString*)name", |w| {
            w.writeln("[SimulatorHelper loadSimulatorSpecification:name];")
        })?;
        w.blank_line()?;

        w.block(
            "+ (void) setResponse:(NSString*)responseName withResponseData:(id)responseData",
            |w| w.writeln("[SimulatorHelper setResponse:responseName withResponseData:responseData];"),
        )?;
        w.blank_line()?;

        w.block("+ (NSArray*) getResponsesForRequest:(NSString*)request", |w| {
            for service in &ctx.model.services {
                for method in &service.methods {
                    let responses: Vec<String> = method
                        .responses()
                        .map(|response| format!("@\"{}\"", response.flat_name()))
                        .collect();

                    w.block(
                        &format!("if ([request isEqualToString:@\"{}\"])", method.name),
                        |w| cw_writeln!(w, "return @[{}];", responses.join(", ")),
                    )?;
                    w.blank_line()?;
                }
            }
            w.writeln("return nil;")
        })?;
        w.blank_line()?;

        for name in ResponseSet::of_file(ctx.model, ResponseKey::Name).iter() {
            let class = classes.named(name);
            w.block(
                &format!("+ (void) setResponse{name}:({class}*)response"),
                |w| cw_writeln!(w, "[SimulatorHelper setResponse:@\"{name}\" withResponseData:response];"),
            )?;
            w.blank_line()?;
        }

        w.writeln("@end")
    }

    /// Example method, XCTest case and reference snippet of one method.
    fn write_method_template(
        &self,
        ctx: RenderContext<'_>,
        service: &ServiceModel,
        method: &MethodModel,
        artifact: &str,
        w: &mut Writer,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> fmt::Result {
        let classes = MessageClasses::of(ctx.model);
        let api = format!("DotDashPayAPI.{}", lowercase_first_letter(&service.name));
        let id = format!("{}.{}", service.name, method.name);
        let args = self.args_lines(ctx, &classes, method, artifact, diagnostics);

        w.writeln("// @single(example-includes(all))")?;
        w.writeln("#import <DotDashPayAPI/DotDashPayAPI.h>")?;
        w.writeln("// @single-end()")?;
        w.blank_line()?;
        w.writeln("// @test(test-includes)")?;
        w.writeln("#import <XCTest/XCTest.h>")?;
        w.writeln("// @test-end()")?;
        w.blank_line()?;

        cw_writeln!(w, "// @example({id})")?;
        w.block(&format!("- (void) Example{}", method.name), |w| {
            cw_writeln!(w, "// @example-args({id})")?;
            for line in &args {
                w.writeln(line)?;
            }
            w.writeln("// @example-args-end()")?;
            w.blank_line()?;

            cw_writeln!(w, "[{api} {}:args", lowercase_first_letter(&method.name))?;
            {
                let _indent = w.indent();
                cw_writeln!(w, "// @example-error({id})")?;
                w.block(&format!("onError:^({}* error)", classes.error()), |w| {
                    w.block("if ([error.errorCode isEqualToString:@\"\"])", |w| {
                        w.writeln("LOG(ERROR, @\"%@\", error.errorMessage);")
                    })
                })?;
                w.writeln("// @example-error-end()")?;

                for callback in &method.overloads.canonical.callbacks {
                    let Some(response) = method.callback_response(*callback) else {
                        continue;
                    };
                    cw_writeln!(w, "// @example-response({}.{})", service.name, response.flat_name())?;
                    w.block(
                        &format!("{}:^({}* response)", selector_part(method, *callback), classes.class(response)),
                        |w| {
                            let Some(message) = resolve_message(ctx, response, artifact, diagnostics) else {
                                return Ok(());
                            };
                            for field in &message.fields {
                                let ty = field_type(&classes, &response.package, field);
                                let name = lower_camel(&field.name);
                                cw_writeln!(w, "{ty} {name} = response.{name};  // {name} = FILL_IN")?;
                            }
                            Ok(())
                        },
                    )?;
                    w.writeln("// @example-response-end()")?;
                }
            }
            w.writeln("];")
        })?;
        w.writeln("// @example-end()")?;
        w.blank_line()?;

        let test_class = format!("{}Test{}", self.class_prefix, method.name);
        cw_writeln!(w, "// @test({id})")?;
        cw_writeln!(w, "@interface {test_class} : XCTestCase")?;
        w.writeln("@end")?;
        w.blank_line()?;
        cw_writeln!(w, "@implementation {test_class}")?;
        w.blank_line()?;
        w.block(&format!("- (void) test{}", method.name), |w| {
            cw_writeln!(
                w,
                "XCTestExpectation* expectation = [self expectationWithDescription:@\"{id}\"];"
            )?;
            for line in &args {
                w.writeln(line)?;
            }
            w.blank_line()?;
            write_request(w, &api, &classes, method, |w, callback| match callback {
                Callback::Error => {
                    w.writeln("XCTFail(@\"%@\", error.errorMessage);")?;
                    w.writeln("[expectation fulfill];")
                }
                Callback::Update(_) => w.writeln("XCTAssertNotNil(response);"),
                Callback::Completion => {
                    w.writeln("XCTAssertNotNil(response);")?;
                    w.writeln("[expectation fulfill];")
                }
            })?;
            w.blank_line()?;
            w.writeln("[self waitForExpectationsWithTimeout:5 handler:nil];")
        })?;
        w.blank_line()?;
        w.writeln("@end")?;
        w.writeln("// @test-end()")?;
        w.blank_line()?;

        cw_writeln!(w, "// @reference({id})")?;
        cw_writeln!(w, "// @standalone({})", method.name)?;
        w.writeln("#import <DotDashPayAPI/DotDashPayAPI.h>")?;
        w.blank_line()?;
        for line in &args {
            w.writeln(line)?;
        }
        w.blank_line()?;
        cw_writeln!(w, "// @example-request({id})")?;
        write_request(w, &api, &classes, method, |w, callback| match callback {
            Callback::Error => w.writeln("// Handle error response"),
            _ => w.writeln("// Handle response"),
        })?;
        w.writeln("// @example-request-end()")?;
        w.writeln("// @standalone-end()")?;
        w.writeln("// @reference-end()")
    }

    /// Allocates `args` and assigns every field an example value, or a
    /// placeholder when there is none.
    fn args_lines(
        &self,
        ctx: RenderContext<'_>,
        classes: &MessageClasses<'_>,
        method: &MethodModel,
        artifact: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<String> {
        let args_class = classes.class(&method.input_type);
        let mut lines = vec![format!("{args_class}* args = [[{args_class} alloc] init];")];

        if let Some(args) = resolve_message(ctx, &method.input_type, artifact, diagnostics) {
            for field in &args.fields {
                let value = example_value(ctx, Target::Objc.name(), field, artifact, diagnostics)
                    .unwrap_or_else(|| {
                        placeholder(&field_type(classes, &method.input_type.package, field)).to_string()
                    });
                lines.push(format!("args.{} = {value};", lower_camel(&field.name)));
            }
        }

        lines
    }
}

/// The canonical call as one statement, a block per callback:
/// `[api charge:args onError:^(ErrorResponse* error) {` ... `}];`.
fn write_request<F>(
    w: &mut Writer,
    api: &str,
    classes: &MessageClasses<'_>,
    method: &MethodModel,
    mut handler: F,
) -> fmt::Result
where
    F: FnMut(&mut Writer, Callback) -> fmt::Result,
{
    for (index, callback) in method.overloads.canonical.callbacks.iter().enumerate() {
        let parameter = match callback {
            Callback::Error => "error",
            _ => "response",
        };
        let block = format!(
            "{}:^({}* {parameter}) {{",
            selector_part(method, *callback),
            classes.callback_class(method, *callback)
        );

        if index == 0 {
            cw_writeln!(w, "[{api} {}:args {block}", lowercase_first_letter(&method.name))?;
        } else {
            cw_writeln!(w, "}} {block}")?;
        }

        let _indent = w.indent();
        handler(w, *callback)?;
    }

    w.writeln("}];")
}

impl Emitter for ObjcEmitter {
    fn target(&self) -> Target {
        Target::Objc
    }

    fn indent_spaces(&self) -> usize {
        4
    }

    fn artifacts<'a>(&self, model: &'a FileModel, options: EmitOptions) -> Vec<Artifact<'a>> {
        let mut artifacts = Vec::new();

        for service in &model.services {
            let class = self.service_class(service);
            artifacts.push(Artifact::service(format!("{class}.h"), ArtifactKind::Interface, service));
            artifacts.push(Artifact::service(format!("{class}.m"), ArtifactKind::Implementation, service));
        }

        if options.simulator {
            let class = self.simulator_class();
            artifacts.push(Artifact::file(format!("{class}.h"), ArtifactKind::SimulatorHeader));
            artifacts.push(Artifact::file(format!("{class}.m"), ArtifactKind::SimulatorSource));
        }

        artifacts
    }

    fn prologue(&self, ctx: RenderContext<'_>, artifact: &Artifact<'_>, w: &mut Writer) -> fmt::Result {
        w.writeln("//")?;
        cw_writeln!(w, "//  Automatically generated from {}", ctx.model.name)?;
        w.writeln("//  DO NOT EDIT THIS FILE DIRECTLY.")?;
        w.writeln("//")?;
        w.blank_line()?;

        if artifact.kind == ArtifactKind::Interface {
            cw_writeln!(w, "#define DDP_API_MAJOR_VERSION {}", ctx.model.api_major_version)?;
            cw_writeln!(w, "#define DDP_API_MINOR_VERSION {}", ctx.model.api_minor_version)?;
            w.blank_line()?;
        }

        Ok(())
    }

    fn includes(&self, ctx: RenderContext<'_>, artifact: &Artifact<'_>, w: &mut Writer) -> fmt::Result {
        let classes = MessageClasses::of(ctx.model);

        match (artifact.kind, artifact.service) {
            (ArtifactKind::Interface, Some(service)) => {
                w.writeln("#import <Foundation/Foundation.h>")?;
                w.blank_line()?;

                let mut forward: BTreeSet<String> = BTreeSet::new();
                forward.insert(classes.error());
                for method in &service.methods {
                    forward.insert(classes.class(&method.input_type));
                    forward.extend(method.responses().map(|response| classes.class(response)));
                }
                for class in &forward {
                    cw_writeln!(w, "@class {class};")?;
                }
                w.blank_line()
            }
            (ArtifactKind::Implementation, Some(service)) => {
                cw_writeln!(w, "#import \"{}.h\"", self.service_class(service))?;
                w.blank_line()?;
                for header in ["Bridge.h", "DotDashPayAPI.h", "Logging.h", "SerialProtocol.h", "SignalManager.h"] {
                    cw_writeln!(w, "#import \"{header}\"")?;
                }
                w.blank_line()?;

                let mut headers: BTreeSet<String> = BTreeSet::new();
                headers.insert(format!("{}.pbobjc.h", file_name_in_upper_camel(&ctx.model.name, true)));
                for method in &service.methods {
                    for type_ref in std::iter::once(&method.input_type).chain(method.responses()) {
                        if let Some(file) = defining_file(ctx, type_ref) {
                            headers.insert(format!("{}.pbobjc.h", file_name_in_upper_camel(&file.name, true)));
                        }
                    }
                }

                w.writeln("#import \"ApiCommon.pbobjc.h\"")?;
                for header in headers.iter().filter(|header| *header != "ApiCommon.pbobjc.h") {
                    cw_writeln!(w, "#import \"{header}\"")?;
                }
                w.blank_line()
            }
            (ArtifactKind::SimulatorHeader, _) => {
                w.writeln("#import <Foundation/Foundation.h>")?;
                w.blank_line()?;
                for name in ResponseSet::of_file(ctx.model, ResponseKey::Name).iter() {
                    cw_writeln!(w, "@class {};", classes.named(name))?;
                }
                w.blank_line()
            }
            (ArtifactKind::SimulatorSource, _) => {
                cw_writeln!(w, "#import \"{}.h\"", self.simulator_class())?;
                w.blank_line()?;
                w.writeln("#import \"SimulatorHelper.h\"")?;
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
            (ArtifactKind::Interface, Some(service)) => self.write_header_body(ctx, service, w),
            (ArtifactKind::Implementation, Some(service)) => self.write_source_body(ctx, service, w),
            (ArtifactKind::SimulatorHeader, _) => self.write_simulator_header(ctx, w),
            (ArtifactKind::SimulatorSource, _) => self.write_simulator_source(ctx, w),
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
