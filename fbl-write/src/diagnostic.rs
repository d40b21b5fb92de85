use std::fmt::Display;

use fbl_ast::SourceLocation;
use tracing::{error, warn};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// No typemap for a required operation and type. A placeholder was substituted.
    MissingTemplate,
    /// A class name was needed for a type that is not a registered class. A placeholder was substituted.
    UnknownClassType,
    DuplicateSymbol,
    DuplicateClass,
    /// Something the generator ignores, such as base classes
    UnsupportedFeature,
}

impl DiagnosticKind {
    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticKind::MissingTemplate => "missing-template",
            DiagnosticKind::UnknownClassType => "unknown-class-type",
            DiagnosticKind::DuplicateSymbol => "duplicate-symbol",
            DiagnosticKind::DuplicateClass => "duplicate-class",
            DiagnosticKind::UnsupportedFeature => "unsupported-feature",
        }
    }

    /// Hard errors mean the run as a whole failed, even though generation carried on
    pub fn is_error(&self) -> bool {
        matches!(self, DiagnosticKind::DuplicateSymbol | DiagnosticKind::DuplicateClass)
    }
}

impl Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: SourceLocation,
    pub message: String,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} [{}]: {}",
            self.location,
            if self.kind.is_error() { "error" } else { "warning" },
            self.kind,
            self.message
        )
    }
}

#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn report(&mut self, kind: DiagnosticKind, location: &SourceLocation, message: String) {
        let diagnostic = Diagnostic {
            kind,
            location: location.clone(),
            message,
        };

        if kind.is_error() {
            error!("{diagnostic}");
        } else {
            warn!("{diagnostic}");
        }

        self.diagnostics.push(diagnostic);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind.is_error())
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
