use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};

use crate::{tokenize, ParseError, Parser, Root};

#[derive(Debug)]
pub struct SourceFile {
    /// Name relative to the include directory it was found in, the same
    /// string other files use to import it.
    pub name: String,
    pub text: String,
    pub root: Root,
    pub errors: Vec<ParseError>,
}

impl SourceFile {
    /// 1-based line and column of a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let before = self.text.get(..offset).unwrap_or_default();

        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(idx) => before[idx + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };

        (line, column)
    }

    pub fn describe_error(&self, error: &ParseError) -> String {
        let (line, column) = self.line_col(error.position);
        format!("{}:{line}:{column}: {}", self.name, error.message)
    }
}

#[derive(Debug, Default)]
pub struct Source {
    include_dirs: Vec<PathBuf>,
    files: HashMap<String, SourceFile>,
    order: Vec<String>,
    missing_imports: Vec<(String, String)>,
}

impl Source {
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        Self {
            include_dirs,
            ..Default::default()
        }
    }

    /// Parses an in-memory file. Imports are not followed.
    pub fn parse(&mut self, name: &str, text: &str) -> Result<&SourceFile> {
        let tokens = tokenize(text);
        let result = Parser::new(tokens).parse(name);

        let file = SourceFile {
            name: name.to_string(),
            text: text.to_string(),
            root: result.root,
            errors: result.errors,
        };

        if let Some(first) = file.errors.first() {
            for error in file.errors.iter().skip(1) {
                log::error!("{}", file.describe_error(error));
            }
            bail!("{}", file.describe_error(first));
        }

        log::debug!("parsed {name}");

        if !self.files.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.files.insert(name.to_string(), file);

        self.files
            .get(name)
            .context(format!("{name} vanished after parsing"))
    }

    /// Reads and parses `path`, then every file it imports that can be found
    /// in the include directories. Returns the name the file was stored under.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let name = self.relative_name(path);

        self.load_named(&name, path)?;

        Ok(name)
    }

    fn load_named(&mut self, name: &str, path: &Path) -> Result<()> {
        if self.files.contains_key(name) {
            return Ok(());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let imports: Vec<String> = self
            .parse(name, &text)?
            .root
            .imports()
            .map(|import| import.package_name.clone())
            .collect();

        for import in imports {
            if self.files.contains_key(&import) {
                continue;
            }

            match self.find_import(&import) {
                Some(import_path) => self.load_named(&import, &import_path)?,
                None => {
                    log::warn!("{name}: import {import:?} not found in include directories");
                    self.missing_imports.push((name.to_string(), import));
                }
            }
        }

        Ok(())
    }

    fn find_import(&self, import: &str) -> Option<PathBuf> {
        self.include_dirs
            .iter()
            .map(|dir| dir.join(import))
            .find(|candidate| candidate.is_file())
    }

    fn relative_name(&self, path: &Path) -> String {
        let relative = self
            .include_dirs
            .iter()
            .find_map(|dir| path.strip_prefix(dir).ok())
            .unwrap_or(path);

        relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn file(&self, name: &str) -> Option<&SourceFile> {
        self.files.get(name)
    }

    /// Parsed files in load order.
    pub fn files(&self) -> impl Iterator<Item = &SourceFile> + '_ {
        self.order.iter().filter_map(|name| self.files.get(name))
    }

    /// `(importing file, import)` pairs that could not be resolved.
    pub fn missing_imports(&self) -> &[(String, String)] {
        &self.missing_imports
    }
}
