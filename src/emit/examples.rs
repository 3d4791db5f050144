//! Example, test and reference files cut from per-method templates.
//!
//! A target renders one marked-up template per method. Regions are delimited
//! by comment lines:
//!
//! - `// @example(id)` ... `// @example-end()` only goes to the example file
//! - `// @test(id)` ... `// @test-end()` only goes to the test file
//! - `// @reference(id)` ... `// @reference-end()` only goes to the reference
//! - `// @single(id)` ... `// @single-end()` appears once in the reference,
//!   its lines merged across all methods
//! - `// @standalone(id)` ... `// @standalone-end()` inside a reference
//!   region is also written to its own file
//!
//! Every other `// @` line is markup: kept in the reference, dropped from
//! the example and test files.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    code_writer::CodeWriter,
    error::{Diagnostic, GenerateError},
    schema::FieldDescriptor,
};

use super::{Emitter, GeneratedFile, RenderContext};

pub const EXAMPLES_DIR: &str = "examples_dir";
pub const TESTS_DIR: &str = "tests_dir";
pub const STANDALONE_DIR: &str = "standalone_dir";

const DEFAULT_EXAMPLES_DIR: &str = "examples";
const DEFAULT_TESTS_DIR: &str = "tests";

fn region(tag: &str) -> Regex {
    Regex::new(&format!(
        r"(?ms)^[ \t]*// ?@{tag}(?:\(([^\n]*?)\))?[ \t]*\n(.*?)^[ \t]*// ?@{tag}-end\(\)[ \t]*(?:\n|\z)"
    ))
    .expect("region pattern should be valid")
}

static EXAMPLE: Lazy<Regex> = Lazy::new(|| region("example"));
static TEST: Lazy<Regex> = Lazy::new(|| region("test"));
static REFERENCE: Lazy<Regex> = Lazy::new(|| region("reference"));
static SINGLE: Lazy<Regex> = Lazy::new(|| region("single"));
static STANDALONE: Lazy<Regex> = Lazy::new(|| region("standalone"));

static MARKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*// ?@.*(?:\n|\z)").expect("markup pattern should be valid"));
static BLANK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("blank line pattern should be valid"));

/// `<prefix><id><suffix>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNaming {
    pub prefix: String,
    pub suffix: String,
}

impl FileNaming {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn name(&self, id: &str) -> String {
        format!("{}{id}{}", self.prefix, self.suffix)
    }
}

/// Where the example outputs of a target go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleLayout {
    pub examples_dir: String,
    pub tests_dir: String,
    pub standalone_dir: String,
    /// Path of the reference, relative to the output directory.
    pub reference: String,
    pub example: FileNaming,
    pub test: FileNaming,
}

impl ExampleLayout {
    /// Reads the directories from the generator parameters. Standalone files
    /// go next to the examples unless `standalone_dir` is set.
    pub fn new(
        parameters: &BTreeMap<String, String>,
        reference: impl Into<String>,
        example: FileNaming,
        test: FileNaming,
    ) -> Self {
        let dir = |key: &str| parameters.get(key).filter(|dir| !dir.is_empty()).cloned();

        let examples_dir = dir(EXAMPLES_DIR).unwrap_or_else(|| DEFAULT_EXAMPLES_DIR.to_string());
        Self {
            tests_dir: dir(TESTS_DIR).unwrap_or_else(|| DEFAULT_TESTS_DIR.to_string()),
            standalone_dir: dir(STANDALONE_DIR).unwrap_or_else(|| examples_dir.clone()),
            examples_dir,
            reference: reference.into(),
            example,
            test,
        }
    }

    pub fn example_path(&self, id: &str) -> String {
        join(&self.examples_dir, &self.example.name(id))
    }

    pub fn test_path(&self, id: &str) -> String {
        join(&self.tests_dir, &self.test.name(id))
    }

    pub fn standalone_path(&self, language: &str, id: &str) -> String {
        join(&self.standalone_dir, &format!("{language}_{}", self.example.name(id)))
    }
}

fn join(dir: &str, name: &str) -> String {
    match dir.trim_end_matches('/') {
        "" | "." => name.to_string(),
        dir => format!("{dir}/{name}"),
    }
}

/// Renders the template of every method and cuts it into the example and test
/// file of the method, the reference and its standalone files.
pub fn render(
    emitter: &dyn Emitter,
    layout: &ExampleLayout,
    ctx: RenderContext<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<GeneratedFile>, GenerateError> {
    let mut files = Vec::new();
    let mut reference = Reference::default();

    for service in &ctx.model.services {
        for method in &service.methods {
            let example_path = layout.example_path(&method.name);

            let mut w = CodeWriter::with_indent_spaces(String::new(), emitter.indent_spaces());
            emitter
                .method_template(ctx, service, method, &example_path, &mut w, diagnostics)
                .map_err(|source| GenerateError::Render {
                    artifact: example_path.clone(),
                    source,
                })?;
            let template = w.into_inner();

            files.push(GeneratedFile {
                path: example_path,
                content: example_content(&template),
            });
            files.push(GeneratedFile {
                path: layout.test_path(&method.name),
                content: test_content(&template),
            });
            reference.add(&template);
        }
    }

    let reference = reference.finish();
    let language = emitter.target().name();
    for (id, block) in standalones(&reference) {
        files.push(GeneratedFile {
            path: layout.standalone_path(language, &id),
            content: tidy(&MARKUP.replace_all(&block, "")),
        });
    }

    files.push(GeneratedFile {
        path: layout.reference.clone(),
        content: reference,
    });

    log::debug!("{}: cut method templates into {} example files", emitter.target(), files.len());

    Ok(files)
}

pub fn example_content(template: &str) -> String {
    let content = TEST.replace_all(template, "");
    let content = REFERENCE.replace_all(&content, "");
    tidy(&MARKUP.replace_all(&content, ""))
}

pub fn test_content(template: &str) -> String {
    let content = EXAMPLE.replace_all(template, "");
    let content = REFERENCE.replace_all(&content, "");
    tidy(&MARKUP.replace_all(&content, ""))
}

/// Accumulates the reference across methods. Lines of a single region are
/// kept once each, in the order first seen.
#[derive(Debug, Default)]
struct Reference {
    singles: Vec<(String, Vec<String>)>,
    body: String,
}

impl Reference {
    fn add(&mut self, template: &str) {
        for captures in SINGLE.captures_iter(template) {
            let id = captures.get(1).map_or("", |id| id.as_str());
            let block = captures.get(2).map_or("", |block| block.as_str());

            let index = match self.singles.iter().position(|(seen, _)| seen == id) {
                Some(index) => index,
                None => {
                    self.singles.push((id.to_string(), Vec::new()));
                    self.singles.len() - 1
                }
            };

            let lines = &mut self.singles[index].1;
            for line in block.lines().filter(|line| !line.trim().is_empty()) {
                if !lines.iter().any(|seen| seen == line) {
                    lines.push(line.to_string());
                }
            }
        }

        let content = TEST.replace_all(template, "");
        self.body.push_str(&SINGLE.replace_all(&content, ""));
        self.body.push('\n');
    }

    /// Singles are written as `// @<id>` ... `// @<name>-end()` where `name`
    /// is the id up to its argument list.
    fn finish(self) -> String {
        let mut content = String::new();

        for (id, lines) in &self.singles {
            let name = id.split('(').next().unwrap_or(id);
            content.push_str(&format!("// @{id}\n"));
            for line in lines {
                content.push_str(line);
                content.push('\n');
            }
            content.push_str(&format!("// @{name}-end()\n\n"));
        }

        content.push_str(&self.body);
        tidy(&content)
    }
}

fn standalones(reference: &str) -> Vec<(String, String)> {
    STANDALONE
        .captures_iter(reference)
        .map(|captures| {
            let id = captures.get(1).map_or("", |id| id.as_str());
            let block = captures.get(2).map_or("", |block| block.as_str());
            (id.to_string(), block.to_string())
        })
        .collect()
}

/// Collapses runs of blank lines and trims the ends.
fn tidy(content: &str) -> String {
    let collapsed = BLANK_RUNS.replace_all(content, "\n\n");
    let trimmed = collapsed.trim_matches('\n');

    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

/// Literal for `field` from the loaded example values. `None` when no values
/// are loaded; a field the values lack is recorded against `artifact`.
pub fn example_value(
    ctx: RenderContext<'_>,
    language: &str,
    field: &FieldDescriptor,
    artifact: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    let values = ctx.example_values?;

    let value = values.value_for(language, &field.name);
    if value.is_none() {
        let diagnostic = Diagnostic {
            artifact: artifact.to_string(),
            message: format!("no example value for field {}, using a placeholder", field.name),
        };
        log::warn!("{diagnostic}");
        diagnostics.push(diagnostic);
    }

    value
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{example_content, test_content, tidy, ExampleLayout, FileNaming, Reference};

    const TEMPLATE: &str = "\
// @single(example-includes(all))
#import <Api.h>
// @single-end()

// @test(test-includes)
#import <XCTest.h>
// @test-end()

// @example(Charge)
void example() {
    // @example-args(Payment.Charge)
    args.amount = 0;
    // @example-args-end()
}
// @example-end()

// @test(Charge)
void test() {
    run();
}
// @test-end()

// @reference(Charge)
// @standalone(Charge)
charge();
// @standalone-end()
// @reference-end()
";

    #[test]
    fn example_drops_tests_reference_and_markup() {
        assert_eq!(
            example_content(TEMPLATE),
            "#import <Api.h>\n\nvoid example() {\n    args.amount = 0;\n}\n"
        );
    }

    #[test]
    fn test_drops_examples_reference_and_markup() {
        assert_eq!(
            test_content(TEMPLATE),
            "#import <Api.h>\n\n#import <XCTest.h>\n\nvoid test() {\n    run();\n}\n"
        );
    }

    #[test]
    fn reference_merges_singles() {
        let mut reference = Reference::default();
        reference.add(TEMPLATE);
        reference.add(&TEMPLATE.replace("Charge", "Refund"));
        reference.add("// @single(example-includes(all))\n#import <Api.h>\n#import <Extra.h>\n// @single-end()\n");

        let content = reference.finish();

        assert!(content.starts_with(
            "// @example-includes(all)\n#import <Api.h>\n#import <Extra.h>\n// @example-includes-end()\n\n// @example(Charge)\n"
        ));
        assert_eq!(content.matches("#import <Api.h>").count(), 1);
        assert!(!content.contains("XCTest"));
        assert!(content.contains("// @example-args(Payment.Refund)\n"));
        assert!(content.contains("// @standalone(Refund)\ncharge();\n// @standalone-end()\n"));
    }

    #[test]
    fn standalone_regions_are_found_in_the_reference() {
        let mut reference = Reference::default();
        reference.add(TEMPLATE);
        reference.add(&TEMPLATE.replace("Charge", "Refund"));

        let standalones = super::standalones(&reference.finish());

        assert_eq!(
            standalones,
            vec![
                ("Charge".to_string(), "charge();\n".to_string()),
                ("Refund".to_string(), "charge();\n".to_string()),
            ]
        );
    }

    #[test]
    fn nested_markers_are_not_regions() {
        let template = "// @example-args(A.B)\nargs();\n// @example-args-end()\n";

        assert_eq!(test_content(template), "args();\n");
    }

    #[test]
    fn blank_runs_collapse() {
        assert_eq!(tidy("\n\na\n\n\n\nb\n\n"), "a\n\nb\n");
        assert_eq!(tidy("\n\n"), "");
    }

    #[test]
    fn layout_reads_directories() {
        let naming = || FileNaming::new("DDPExample.", ".m");

        let layout = ExampleLayout::new(&BTreeMap::new(), "ref.m", naming(), FileNaming::new("DDPTest.", ".m"));
        assert_eq!(layout.example_path("Charge"), "examples/DDPExample.Charge.m");
        assert_eq!(layout.test_path("Charge"), "tests/DDPTest.Charge.m");
        assert_eq!(layout.standalone_path("objc", "Charge"), "examples/objc_DDPExample.Charge.m");

        let parameters = BTreeMap::from([
            ("examples_dir".to_string(), ".".to_string()),
            ("tests_dir".to_string(), "../tests/".to_string()),
            ("standalone_dir".to_string(), "site/views".to_string()),
        ]);
        let layout = ExampleLayout::new(&parameters, "ref.m", naming(), naming());
        assert_eq!(layout.example_path("Charge"), "DDPExample.Charge.m");
        assert_eq!(layout.test_path("Charge"), "../tests/DDPExample.Charge.m");
        assert_eq!(layout.standalone_path("objc", "Charge"), "site/views/objc_DDPExample.Charge.m");
    }
}
