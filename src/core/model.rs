use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionModel {
    pub name: String,
    pub start_line: i64,
    pub end_line: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassModel {
    pub name: String,
    #[serde(default)]
    pub namespaces: Vec<NamespaceModel>,
    #[serde(default)]
    pub classes: Vec<ClassModel>,
    #[serde(default)]
    pub functions: Vec<FunctionModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceModel {
    pub name: String,
    pub line_nr: i64,
    #[serde(default)]
    pub namespaces: Vec<NamespaceModel>,
    #[serde(default)]
    pub classes: Vec<ClassModel>,
    #[serde(default)]
    pub functions: Vec<FunctionModel>,
}

/// Structural summary of one file. Children keep source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileModel {
    pub file_name: String,
    pub parsed: bool,
    pub lines_in_file: u64,
    #[serde(default)]
    pub namespaces: Vec<NamespaceModel>,
    #[serde(default)]
    pub classes: Vec<ClassModel>,
    #[serde(default)]
    pub functions: Vec<FunctionModel>,
}

impl FileModel {
    /// A file that was visited but not analyzed: no content, zero lines.
    pub fn unparsed(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Self::default()
        }
    }
}

/// Files in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectModel {
    pub files: Vec<FileModel>,
}
