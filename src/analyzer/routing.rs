use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Cpp,
    Java,
}

impl Language {
    /// Tag passed to the analyzer with `-t`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::Java => "java",
        }
    }

    /// Extension routing. Anything unlisted is not analyzed.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "cpp" | "hpp" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            _ => None,
        }
    }
}
