use fbl_ast::SourceLocation;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("AST error")]
    AstError(#[from] fbl_ast::Error),
    #[error("Symbol \"{name}\" at {location} was already defined at {previous}")]
    DuplicateSymbol {
        name: String,
        location: SourceLocation,
        previous: SourceLocation,
    },
    #[error("Class \"{name}\" at {location} was already defined at {previous}")]
    DuplicateClass {
        name: String,
        location: SourceLocation,
        previous: SourceLocation,
    },
    #[error("Member \"{0}\" was found outside of a class")]
    MemberOutsideClass(String),
    #[error("Failed to generate function \"{name}\"")]
    FailedToGenerateFunction {
        name: String,
        source: Box<dyn std::error::Error + 'static + Send + Sync>,
    },
    #[error("Failed to generate class \"{name}\"")]
    FailedToGenerateClass {
        name: String,
        source: Box<dyn std::error::Error + 'static + Send + Sync>,
    },
    #[error("Failed to generate enum \"{name}\"")]
    FailedToGenerateEnum {
        name: String,
        source: Box<dyn std::error::Error + 'static + Send + Sync>,
    },
    #[error("String formatting error while generating")]
    FormatError(#[from] std::fmt::Error),
}

impl Error {
    /// Errors that abort the current declaration but let generation carry on with the next one
    pub fn is_skip(&self) -> bool {
        matches!(self, Error::DuplicateSymbol { .. } | Error::DuplicateClass { .. })
    }
}
