use ddprpc::{
    generate,
    model::{extract_file, ResponseKey, ResponseSet},
    validate::validate,
    GenerateError, GenerateRequest, Generation, Schema, Target,
};
use proto_parser::Source;

const PAYMENT: &str = r#"
syntax = "proto3";

package payment;

option (ddp.api_major_version) = 1;
option (ddp.api_minor_version) = 0;

service Payment {
    rpc Charge (ChargeArgs) returns (ChargeResult) {
        option (ddp.update_response) = "payment.ChargeProgress";
        option (ddp.completion_response) = "payment.ChargeResult";
    }
}

message ChargeArgs {
    int64 amount_cents = 1;
}

message ChargeProgress {
    uint32 percent = 1;
}

message ChargeResult {
    string transaction_id = 1;
}
"#;

fn load(files: &[(&str, &str)]) -> Schema {
    let mut source = Source::default();
    for (name, text) in files {
        source.parse(name, text).expect("proto parses");
    }
    Schema::from_source(&source)
}

fn run(schema: &Schema, file: &str, target: Target) -> Result<Generation, GenerateError> {
    generate(schema, file, &GenerateRequest::new(target))
}

fn content<'a>(generation: &'a Generation, path: &str) -> &'a str {
    &generation
        .files
        .iter()
        .find(|file| file.path == path)
        .unwrap_or_else(|| panic!("{path} missing"))
        .content
}

#[test]
fn payment_scenario() {
    let schema = load(&[("payment.proto", PAYMENT)]);
    let file = schema.file("payment.proto").expect("file");

    validate(file).unwrap();

    let model = extract_file(&schema, file).unwrap();
    let responses = ResponseSet::of_service(&model.services[0], ResponseKey::Name);
    assert_eq!(
        responses.iter().collect::<Vec<_>>(),
        vec!["ChargeProgress", "ChargeResult"]
    );

    let cpp = run(&schema, "payment.proto", Target::Cpp).unwrap();
    let header = content(&cpp, "payment.ddprpc.pb.h");
    assert!(header.contains("void Charge(const ::payment::ChargeArgs& args, ::ddprpc::Callback<::payment::ChargeResult> completionCallback) {"));
    assert!(header.contains("void Charge(const ::payment::ChargeArgs& args, ::ddprpc::Callback<::ddprpc::ErrorResponse> errorCallback, ::ddprpc::Callback<::payment::ChargeResult> completionCallback) {"));
    assert!(header.contains("virtual void Charge(const ::payment::ChargeArgs& args, ::ddprpc::Callback<::ddprpc::ErrorResponse> errorCallback, ::ddprpc::Callback<::payment::ChargeProgress> chargeProgressCallback, ::ddprpc::Callback<::payment::ChargeResult> completionCallback) = 0;"));

    let objc = run(&schema, "payment.proto", Target::Objc).unwrap();
    assert_eq!(
        content(&objc, "DDPPayment.h").matches("- (void) charge:").count(),
        4
    );

    let nodejs = run(&schema, "payment.proto", Target::Nodejs).unwrap();
    let service = content(&nodejs, "payment.js");
    for name in ["charge(", "chargeOnError(", "chargeOnChargeProgress(", "chargeOnErrorOnChargeProgress("] {
        assert!(service.contains(&format!("  {name}args")), "{name}");
    }
}

#[test]
fn missing_completion_produces_nothing() {
    let text = PAYMENT.replace(
        "service Payment {",
        "service Payment {\n    rpc Refund (ChargeArgs) returns (ChargeResult);",
    );
    let schema = load(&[("payment.proto", text.as_str())]);

    for target in Target::ALL {
        let err = run(&schema, "payment.proto", target).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Service [Payment] does not contain a completion response (method Refund)"
        );
    }
}

#[test]
fn missing_versions_are_fatal() {
    let text = PAYMENT.replace("option (ddp.api_minor_version) = 0;", "");
    let schema = load(&[("payment.proto", text.as_str())]);

    let err = run(&schema, "payment.proto", Target::Cpp).unwrap_err();
    assert!(matches!(err, GenerateError::MissingVersion { .. }));
}

#[test]
fn output_is_deterministic() {
    let schema = load(&[("payment.proto", PAYMENT)]);

    for target in Target::ALL {
        let first = run(&schema, "payment.proto", target).unwrap();
        let second = run(&schema, "payment.proto", target).unwrap();
        assert_eq!(first.files, second.files, "{target}");
    }
}

#[test]
fn response_order_ignores_declaration_order() {
    let services = |first: &str, second: &str| {
        format!(
            r#"
            option (api_major_version) = 1;
            option (api_minor_version) = 0;
            package p;
            service A {{
                rpc One (X) returns (X) {{ option (completion_response) = "p.{first}"; }}
                rpc Two (X) returns (X) {{ option (completion_response) = "p.{second}"; }}
            }}
            "#
        )
    };

    let forward = services("Zulu", "Alpha");
    let reverse = services("Alpha", "Zulu");

    let simulator_header = |text: &str| {
        let schema = load(&[("p.proto", text)]);
        let generation = run(&schema, "p.proto", Target::Objc).unwrap();
        content(&generation, "DDPSimulatorManager.h").to_string()
    };

    let header = simulator_header(&forward);
    assert_eq!(header, simulator_header(&reverse));
    assert!(header.contains("@class Alpha;\n@class Zulu;\n"));
}

#[test]
fn responses_from_imports_are_resolved() {
    let common = r#"
        package ddp.common;
        message Ack {
            bool ok = 1;
        }
    "#;
    let device = r#"
        import "common.proto";

        option (api_major_version) = 2;
        option (api_minor_version) = 1;

        package device;

        service Reader {
            rpc Reset (ResetArgs) returns (ddp.common.Ack) {
                option (completion_response) = "ddp.common.Ack";
            }
        }

        message ResetArgs {}
    "#;
    let schema = load(&[("common.proto", common), ("device.proto", device)]);

    let cpp = run(&schema, "device.proto", Target::Cpp).unwrap();
    let header = content(&cpp, "device.ddprpc.pb.h");
    assert!(header.contains("namespace ddp { namespace common { class Ack; } }\n"));
    assert!(header.contains("::ddprpc::Callback<::ddp::common::Ack> completionCallback"));

    let objc = run(&schema, "device.proto", Target::Objc).unwrap();
    let source = content(&objc, "DDPReader.m");
    assert!(source.contains("#import \"Common.pbobjc.h\"\n"));
    assert!(source.contains("#import \"Device.pbobjc.h\"\n"));
    assert!(objc.diagnostics.is_empty());
    assert!(content(&objc, "APIExamples.template.m").contains("BOOL ok = response.ok;"));
}

#[test]
fn unresolved_responses_only_degrade_examples() {
    let text = PAYMENT.replace(
        "option (ddp.completion_response) = \"payment.ChargeResult\";",
        "option (ddp.completion_response) = \"payment.Unknown\";",
    );
    let schema = load(&[("payment.proto", text.as_str())]);

    let generation = run(&schema, "payment.proto", Target::Nodejs).unwrap();
    assert_eq!(generation.files.len(), 6);
    assert_eq!(generation.diagnostics.len(), 1);
    assert_eq!(generation.diagnostics[0].artifact, "examples/Charge.example.js");
    assert!(content(&generation, "payment.js").contains("SignalManager.on('Unknown', resolve);"));
    assert!(content(&generation, "tests/Charge.test.js").contains("describe('Payment.Charge'"));
}

#[test]
fn callbacks_named_like_the_fixed_ones_stay_distinct() {
    let text = r#"
        option (api_major_version) = 1;
        option (api_minor_version) = 0;
        package p;
        service S {
            rpc M (A) returns (Done) {
                option (update_response) = "p.Error";
                option (update_response) = "a.Progress";
                option (update_response) = "b.Progress";
                option (completion_response) = "p.Done";
            }
        }
    "#;
    let schema = load(&[("p.proto", text)]);

    let cpp = run(&schema, "p.proto", Target::Cpp).unwrap();
    let header = content(&cpp, "p.ddprpc.pb.h");
    let canonical = header
        .lines()
        .find(|line| line.contains("virtual void M("))
        .expect("canonical form declared");
    assert_eq!(canonical.matches(" errorCallback").count(), 1);
    for parameter in ["pErrorCallback", "aProgressCallback", "bProgressCallback", "completionCallback"] {
        assert_eq!(canonical.matches(parameter).count(), 1, "{parameter}");
    }

    let objc = run(&schema, "p.proto", Target::Objc).unwrap();
    assert!(content(&objc, "DDPS.h").contains(
        "- (void) m:(A*)args onError:(void(^)(ErrorResponse*))errorCallback onPError:(void(^)(Error*))pErrorCallback onAProgress:(void(^)(Progress*))aProgressCallback onBProgress:(void(^)(Progress*))bProgressCallback onDone:(void(^)(Done*))completionCallback;\n"
    ));

    let nodejs = run(&schema, "p.proto", Target::Nodejs).unwrap();
    let service = content(&nodejs, "s.js");
    assert_eq!(service.matches("  mOnError(").count(), 1);
    assert!(service.contains("  mOnPErrorOnAProgressOnBProgress(args, pErrorCallback, aProgressCallback, bProgressCallback, completionCallback) {\n"));
    assert!(service.contains("  mOnErrorOnPErrorOnAProgressOnBProgress(args, errorCallback, pErrorCallback, aProgressCallback, bProgressCallback, completionCallback) {\n"));
}

#[test]
fn nested_responses_keep_their_package() {
    let text = r#"
        option (api_major_version) = 1;
        option (api_minor_version) = 0;
        package p;
        service S {
            rpc M (Outer) returns (Outer.Inner) {
                option (update_response) = "Outer.Progress";
                option (completion_response) = "p.Outer.Inner";
            }
        }
        message Outer {
            message Inner { int32 x = 1; }
            message Progress { uint32 percent = 1; }
        }
    "#;
    let schema = load(&[("p.proto", text)]);

    let cpp = run(&schema, "p.proto", Target::Cpp).unwrap();
    let header = content(&cpp, "p.ddprpc.pb.h");
    assert!(header.contains("namespace p {\n\nclass Outer_Inner;\nclass Outer_Progress;\n"));
    assert!(!header.contains("namespace Outer"));
    assert!(header.contains("::ddprpc::Callback<::p::Outer_Inner> completionCallback"));

    let nodejs = run(&schema, "p.proto", Target::Nodejs).unwrap();
    assert!(nodejs.diagnostics.is_empty(), "{:?}", nodejs.diagnostics);
    assert!(content(&nodejs, "simulator.js").contains("function setResponseOuter_Inner(response) {\n"));
    assert!(content(&nodejs, "examples/M.example.js").contains("const x = response.x;"));

    let objc = run(&schema, "p.proto", Target::Objc).unwrap();
    assert!(objc.diagnostics.is_empty(), "{:?}", objc.diagnostics);
    assert!(content(&objc, "DDPSimulatorManager.h")
        .contains("+ (void) setResponseOuter_Inner:(Outer_Inner*)response;\n"));
}
