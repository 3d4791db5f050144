mod logger;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use ddprpc::{
    check_collisions, generate, EmitOptions, ExampleValues, GenerateRequest, Schema, Target,
};
use logger::create_logger;
use proto_parser::Source;

#[derive(Debug, ValueEnum, Clone, Copy)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

#[derive(Debug, ValueEnum, Clone, Copy, PartialEq, Eq)]
enum Lang {
    Cpp,
    Objc,
    Nodejs,
}

impl From<Lang> for Target {
    fn from(lang: Lang) -> Self {
        match lang {
            Lang::Cpp => Target::Cpp,
            Lang::Objc => Target::Objc,
            Lang::Nodejs => Target::Nodejs,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The .proto files to generate clients for
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Target language, repeat for several. Each gets its own subdirectory
    /// of the output directory when more than one is given
    #[arg(value_enum, long, required = true)]
    lang: Vec<Lang>,

    /// Directory the generated files are written to
    #[arg(long, env = "DDPRPC_OUT", default_value = ".")]
    out: PathBuf,

    /// Directories searched for imports. Defaults to the directories of the
    /// input files
    #[arg(short = 'I', long)]
    include: Vec<PathBuf>,

    /// Generator parameter, `key=value,key=value`
    #[arg(long, env = "DDPRPC_PARAMETER", default_value = "")]
    parameter: String,

    /// Skip the simulator artifacts
    #[arg(long)]
    no_simulator: bool,

    /// Skip the example and test files
    #[arg(long)]
    no_examples: bool,

    /// JSON document with example values for request fields
    #[arg(long, env = "DDPRPC_EXAMPLE_VALUES")]
    example_values: Option<PathBuf>,

    /// The log level to use
    #[arg(value_enum, long, default_value = "info")]
    log_level: LogLevel,

    /// Also write every log record to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn include_dirs(&self) -> Vec<PathBuf> {
        if !self.include.is_empty() {
            return self.include.clone();
        }

        let mut dirs: Vec<PathBuf> = Vec::new();
        for file in &self.files {
            let dir = match file.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }

    fn out_dir(&self, target: Target) -> PathBuf {
        if self.lang.len() > 1 {
            self.out.join(target.name())
        } else {
            self.out.clone()
        }
    }
}

fn load_example_values(path: &Path) -> Result<ExampleValues> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read example values from {}", path.display()))?;

    ExampleValues::from_json(&text)
        .with_context(|| format!("Failed to parse example values in {}", path.display()))
}

/// Generates every requested client and then writes the outputs of the
/// files that succeeded. A file that fails to generate is reported and
/// skipped, and the run still fails once the others are written.
fn run(args: &Args) -> Result<Vec<PathBuf>> {
    let mut source = Source::new(args.include_dirs());

    let mut names: Vec<String> = Vec::new();
    for path in &args.files {
        let name = source.load(path)?;
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let schema = Schema::from_source(&source);
    let options = EmitOptions {
        simulator: !args.no_simulator,
        examples: !args.no_examples,
    };
    let example_values = args
        .example_values
        .as_deref()
        .map(load_example_values)
        .transpose()?;

    let mut failures: Vec<String> = Vec::new();
    let mut outputs: Vec<(PathBuf, String)> = Vec::new();
    for lang in &args.lang {
        let target = Target::from(*lang);
        let request = GenerateRequest {
            target,
            parameter: args.parameter.clone(),
            options,
            example_values: example_values.clone(),
        };

        let mut files = Vec::new();
        for name in &names {
            let generation = match generate(&schema, name, &request) {
                Ok(generation) => generation,
                Err(err) => {
                    log::error!("Failed to generate the {target} client for {name}: {err}");
                    failures.push(format!("{name} ({target}): {err}"));
                    continue;
                }
            };

            for diagnostic in &generation.diagnostics {
                log::warn!("{name}: {diagnostic}");
            }
            files.extend(generation.files);
        }

        if let Err(err) = check_collisions(&files) {
            log::error!("Conflicting {target} outputs: {err}");
            failures.push(format!("{target}: {err}"));
            continue;
        }

        let dir = args.out_dir(target);
        outputs.extend(files.into_iter().map(|file| (dir.join(&file.path), file.content)));
    }

    for (path, content) in &outputs {
        write_file(path, content)?;
    }

    if !failures.is_empty() {
        bail!("Failed to generate {} of the requested clients:\n{}", failures.len(), failures.join("\n"));
    }

    Ok(outputs.into_iter().map(|(path, _)| path).collect())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;

    log::info!("wrote {}", path.display());

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    create_logger(args.log_file.as_deref(), args.log_level.into())?;

    log::info!("Starting ddprpc");

    let written = run(&args)?;

    log::info!("Generated {} files", written.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;

    use super::{run, Args};

    const COMMON: &str = r#"
package ddp.common;

message Ack {
    bool ok = 1;
}
"#;

    const READER: &str = r#"
import "common.proto";

option (api_major_version) = 3;
option (api_minor_version) = 1;

package reader;

service Reader {
    rpc Reset (ResetArgs) returns (ddp.common.Ack) {
        option (update_response) = "reader.Resetting";
        option (completion_response) = "ddp.common.Ack";
    }
}

message ResetArgs {}

message Resetting {
    uint32 step = 1;
}
"#;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("ddprpc").chain(argv.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn writes_generated_files() {
        let protos = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(protos.path().join("common.proto"), COMMON).unwrap();
        fs::write(protos.path().join("reader.proto"), READER).unwrap();

        let reader = protos.path().join("reader.proto");
        let args = args(&[
            "--lang",
            "cpp",
            "--out",
            out.path().to_str().unwrap(),
            reader.to_str().unwrap(),
        ]);

        let written = run(&args).unwrap();

        assert_eq!(written, vec![out.path().join("reader.ddprpc.pb.h")]);
        let header = fs::read_to_string(&written[0]).unwrap();
        assert!(header.contains("#define DDP_API_MAJOR_VERSION 3"));
        assert!(header.contains("namespace ddp { namespace common { class Ack; } }"));
    }

    #[test]
    fn several_languages_get_subdirectories() {
        let protos = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(protos.path().join("common.proto"), COMMON).unwrap();
        fs::write(protos.path().join("reader.proto"), READER).unwrap();

        let reader = protos.path().join("reader.proto");
        let args = args(&[
            "--lang",
            "objc",
            "--lang",
            "nodejs",
            "--no-examples",
            "--out",
            out.path().to_str().unwrap(),
            "-I",
            protos.path().to_str().unwrap(),
            reader.to_str().unwrap(),
        ]);

        run(&args).unwrap();

        assert!(out.path().join("objc/DDPReader.h").is_file());
        assert!(out.path().join("objc/DDPSimulatorManager.m").is_file());
        assert!(!out.path().join("objc/APIExamples.template.m").exists());
        assert!(!out.path().join("objc/examples").exists());
        assert!(out.path().join("nodejs/reader.js").is_file());
        assert!(out.path().join("nodejs/simulator.js").is_file());
    }

    #[test]
    fn fatal_errors_write_nothing() {
        let protos = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let broken = READER.replace("option (completion_response) = \"ddp.common.Ack\";", "");
        fs::write(protos.path().join("common.proto"), COMMON).unwrap();
        fs::write(protos.path().join("reader.proto"), broken).unwrap();

        let reader = protos.path().join("reader.proto");
        let args = args(&[
            "--lang",
            "nodejs",
            "--out",
            out.path().to_str().unwrap(),
            reader.to_str().unwrap(),
        ]);

        let err = run(&args).unwrap_err();

        assert!(format!("{err:#}").contains("Service [Reader] does not contain a completion response"));
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn one_failing_file_does_not_stop_the_others() {
        let protos = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let broken = READER
            .replace("option (completion_response) = \"ddp.common.Ack\";", "")
            .replace("service Reader", "service Broken")
            .replace("package reader;", "package broken;");
        fs::write(protos.path().join("common.proto"), COMMON).unwrap();
        fs::write(protos.path().join("reader.proto"), READER).unwrap();
        fs::write(protos.path().join("broken.proto"), broken).unwrap();

        let reader = protos.path().join("reader.proto");
        let broken = protos.path().join("broken.proto");
        let args = args(&[
            "--lang",
            "nodejs",
            "--no-examples",
            "--out",
            out.path().to_str().unwrap(),
            broken.to_str().unwrap(),
            reader.to_str().unwrap(),
        ]);

        let err = run(&args).unwrap_err();

        let message = format!("{err:#}");
        assert!(message.contains("Failed to generate 1 of the requested clients"));
        assert!(message.contains("broken.proto (nodejs): Service [Broken] does not contain a completion response"));
        assert!(!message.contains("reader.proto"));
        assert!(out.path().join("reader.js").is_file());
        assert!(out.path().join("simulator.js").is_file());
        assert!(!out.path().join("broken.js").exists());
    }

    #[test]
    fn example_values_fill_requests() {
        let protos = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(protos.path().join("common.proto"), COMMON).unwrap();
        fs::write(
            protos.path().join("reader.proto"),
            READER.replace("message ResetArgs {}", "message ResetArgs { bool hard = 1; }"),
        )
        .unwrap();
        let values = protos.path().join("example-values.json");
        fs::write(&values, r#"{"hard": true}"#).unwrap();

        let reader = protos.path().join("reader.proto");
        let args = args(&[
            "--lang",
            "nodejs",
            "--example-values",
            values.to_str().unwrap(),
            "--out",
            out.path().to_str().unwrap(),
            reader.to_str().unwrap(),
        ]);

        run(&args).unwrap();

        let example = fs::read_to_string(out.path().join("examples/Reset.example.js")).unwrap();
        assert!(example.contains("  args.hard = true;\n"));
        assert!(out.path().join("tests/Reset.test.js").is_file());
        assert!(out.path().join("examples/nodejs_Reset.example.js").is_file());
        assert!(out.path().join("examples.template.js").is_file());

        let args = super::Args {
            example_values: Some(protos.path().join("missing.json")),
            ..args
        };
        let err = run(&args).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read example values"));
    }

    #[test]
    fn parameters_reach_the_generator() {
        let protos = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(protos.path().join("common.proto"), COMMON).unwrap();
        fs::write(protos.path().join("reader.proto"), READER).unwrap();

        let reader = protos.path().join("reader.proto");
        let args = args(&[
            "--lang",
            "cpp",
            "--parameter",
            "services_namespace=client",
            "--out",
            out.path().to_str().unwrap(),
            reader.to_str().unwrap(),
        ]);

        let written = run(&args).unwrap();
        let header = fs::read_to_string(&written[0]).unwrap();
        assert!(header.contains("namespace client {"));

        let args = super::Args {
            parameter: "colour=blue".to_string(),
            ..args
        };
        let err = run(&args).unwrap_err();
        assert!(format!("{err:#}").contains("Unknown parameter: colour=blue"));
    }
}
