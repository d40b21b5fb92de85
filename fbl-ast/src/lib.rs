use std::path::Path;

pub mod ast;
pub mod class;
pub mod enm;
pub mod error;
pub mod function;
pub mod index_map;
pub mod qualtype;
pub mod typedef;
pub mod typemap;

pub use ast::{ClassId, EnumId, Item, TypeCategory, AST};
pub use class::ClassDecl;
pub use enm::Enum;
pub use error::Error;
pub use function::{AccessorRole, DeclKind, DeclarationNode, Features, Parameter, SourceLocation};
pub use qualtype::{BuiltinKind, QualType, TypeRef};
pub use typedef::Typedef;
pub use typemap::{read_typemaps, Typemap, TypemapAttachments, TypemapSource, TypemapTable};

type Result<T, E = Error> = std::result::Result<T, E>;

/// Read the AST JSON document at `path`
pub fn read_ast(path: impl AsRef<Path>) -> Result<AST> {
    let path = path.as_ref();
    let to_err = |source: Box<dyn std::error::Error + 'static + Send + Sync>| Error::FailedToReadAst {
        path: path.display().to_string(),
        source,
    };
    let json = std::fs::read_to_string(path).map_err(|e| to_err(Box::new(e)))?;
    AST::from_json(&json).map_err(|e| to_err(Box::new(e)))
}

/// Replace every run of characters that cannot appear in an identifier with a single `_`
pub fn sanitize_name(name: &str) -> String {
    let re = regex::Regex::new("(?:[^a-zA-Z0-9])+").unwrap();
    re.replace_all(name, "_").trim_matches('_').to_string()
}
