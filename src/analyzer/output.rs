//! Analyzer stdout schema.
//!
//! Every list element is wrapped in a single-key object naming its kind
//! (`{"function": {...}}`, `{"namespace": {...}, "line_nr": 3}`,
//! `{"class": {...}}`). Absent and `null` lists both mean "none".

use serde::Deserialize;

use crate::analyzer::AnalyzerError;
use crate::core::model::{ClassModel, FileModel, FunctionModel, NamespaceModel};

#[derive(Debug, Deserialize)]
pub struct AnalyzerDocument {
    pub file: RawFile,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawFile {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub functions: Option<Vec<FunctionEntry>>,
    #[serde(default)]
    pub namespaces: Option<Vec<NamespaceEntry>>,
    #[serde(default)]
    pub classes: Option<Vec<ClassEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionEntry {
    pub function: RawFunction,
}

#[derive(Debug, Deserialize)]
pub struct RawFunction {
    pub name: String,
    #[serde(default)]
    pub start_line: i64,
    #[serde(default)]
    pub end_line: i64,
}

#[derive(Debug, Deserialize)]
pub struct NamespaceEntry {
    pub namespace: RawScope,
    #[serde(default)]
    pub line_nr: i64,
}

#[derive(Debug, Deserialize)]
pub struct ClassEntry {
    pub class: RawScope,
}

#[derive(Debug, Deserialize)]
pub struct RawScope {
    pub name: String,
    #[serde(default)]
    pub functions: Option<Vec<FunctionEntry>>,
    #[serde(default)]
    pub namespaces: Option<Vec<NamespaceEntry>>,
    #[serde(default)]
    pub classes: Option<Vec<ClassEntry>>,
}

fn convert_functions(entries: Option<Vec<FunctionEntry>>) -> Result<Vec<FunctionModel>, AnalyzerError> {
    entries
        .unwrap_or_default()
        .into_iter()
        .map(|FunctionEntry { function: f }| {
            if f.start_line > f.end_line {
                return Err(AnalyzerError::Malformed(format!(
                    "function {:?} starts at line {} after it ends at line {}",
                    f.name, f.start_line, f.end_line
                )));
            }
            Ok(FunctionModel {
                name: f.name,
                start_line: f.start_line,
                end_line: f.end_line,
            })
        })
        .collect()
}

fn convert_namespaces(entries: Option<Vec<NamespaceEntry>>) -> Result<Vec<NamespaceModel>, AnalyzerError> {
    entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| {
            let scope = entry.namespace;
            Ok(NamespaceModel {
                name: scope.name,
                line_nr: entry.line_nr,
                namespaces: convert_namespaces(scope.namespaces)?,
                classes: convert_classes(scope.classes)?,
                functions: convert_functions(scope.functions)?,
            })
        })
        .collect()
}

fn convert_classes(entries: Option<Vec<ClassEntry>>) -> Result<Vec<ClassModel>, AnalyzerError> {
    entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| {
            let scope = entry.class;
            Ok(ClassModel {
                name: scope.name,
                namespaces: convert_namespaces(scope.namespaces)?,
                classes: convert_classes(scope.classes)?,
                functions: convert_functions(scope.functions)?,
            })
        })
        .collect()
}

/// Decodes analyzer stdout into a parsed [`FileModel`] named `file_name`.
pub fn decode_analyzer_output(
    stdout: &[u8],
    file_name: &str,
    lines_in_file: u64,
) -> Result<FileModel, AnalyzerError> {
    let doc: AnalyzerDocument = serde_json::from_slice(stdout)?;
    let raw = doc.file;
    Ok(FileModel {
        file_name: file_name.to_string(),
        parsed: true,
        lines_in_file,
        namespaces: convert_namespaces(raw.namespaces)?,
        classes: convert_classes(raw.classes)?,
        functions: convert_functions(raw.functions)?,
    })
}
