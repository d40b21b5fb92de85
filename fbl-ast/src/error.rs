use fbl_util::Trace;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not find class \"{0}\" in AST")]
    ClassNotFound(String),
    #[error("Could not find enum \"{0}\" in AST")]
    EnumNotFound(String),
    #[error("Could not find function \"{0}\" in AST")]
    FunctionNotFound(String),
    #[error("Multiple matches for the given name were found")]
    MultipleMatches,
    #[error("Failed to parse type \"{spelling}\": {reason}")]
    FailedToParseType { spelling: String, reason: String },
    #[error("Typedef \"{name}\" resolves to itself")]
    RecursiveTypedef { name: String, source: Trace },
    #[error("Invalid item \"{name}\": {reason}")]
    InvalidItem { name: String, reason: String },
    #[error("Failed to read AST from \"{path}\"")]
    FailedToReadAst {
        path: String,
        source: Box<dyn std::error::Error + 'static + Send + Sync>,
    },
    #[error("Failed to read typemaps from \"{path}\"")]
    FailedToReadTypemaps {
        path: String,
        source: Box<dyn std::error::Error + 'static + Send + Sync>,
    },
    #[error("I/O error")]
    IoError(#[from] std::io::Error),
    #[error("JSON error")]
    JsonError(#[from] serde_json::Error),
}
