//! Typemap storage.
//!
//! A typemap is a code template keyed by an operation name (`ctype`, `in`, `fout`, ...) and the canonical signature
//! of a C++ type (see the [`Display`](std::fmt::Display) impl of [`QualType`]). Operations can carry a suffix
//! (`ctype:out`) for variants that only apply to return values. The generator only ever needs the
//! [`TypemapSource`] trait; [`TypemapTable`] is the in-memory implementation with the built-in Fortran library.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use ustr::{Ustr, UstrMap};

use crate::error::Error;
use crate::qualtype::{BuiltinKind, QualType};
type Result<T, E = Error> = std::result::Result<T, E>;

/// Generic name standing in for any class in typemap signatures
pub const SWIGTYPE: &str = "SWIGTYPE";
/// Generic name standing in for any enum in typemap signatures
pub const SWIGENUM: &str = "SWIGENUM";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TypemapRepr")]
pub struct Typemap {
    code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    numinputs: Option<usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TypemapRepr {
    Code(String),
    Full {
        code: String,
        #[serde(default)]
        numinputs: Option<usize>,
    },
}

impl From<TypemapRepr> for Typemap {
    fn from(repr: TypemapRepr) -> Self {
        match repr {
            TypemapRepr::Code(code) => Typemap::new(&code),
            TypemapRepr::Full { code, numinputs } => Typemap { code, numinputs },
        }
    }
}

impl Typemap {
    pub fn new(code: &str) -> Typemap {
        Typemap {
            code: code.to_string(),
            numinputs: None,
        }
    }

    /// An `in` typemap that consumes no argument from the caller
    pub fn zero_input(code: &str) -> Typemap {
        Typemap {
            code: code.to_string(),
            numinputs: Some(0),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// A copy of this typemap with its code replaced
    pub fn with_code(&self, code: String) -> Typemap {
        Typemap {
            code,
            numinputs: self.numinputs,
        }
    }

    pub fn numinputs(&self) -> Option<usize> {
        self.numinputs
    }

    pub fn is_zero_input(&self) -> bool {
        self.numinputs == Some(0)
    }
}

/// Typemaps attached directly to one parameter, keyed by operation (optionally suffixed)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypemapAttachments(BTreeMap<String, Typemap>);

impl TypemapAttachments {
    pub fn new() -> TypemapAttachments {
        TypemapAttachments::default()
    }

    pub fn with(mut self, op: &str, typemap: Typemap) -> TypemapAttachments {
        self.attach(op, typemap);
        self
    }

    pub fn attach(&mut self, op: &str, typemap: Typemap) {
        self.0.insert(op.to_string(), typemap);
    }

    pub fn get(&self, op: &str) -> Option<&Typemap> {
        self.0.get(op)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Anything the generator can ask for a typemap
pub trait TypemapSource {
    fn lookup(&self, op: &str, signature: &str) -> Option<&Typemap>;
}

#[derive(Default)]
pub struct TypemapTable {
    maps: UstrMap<hashbrown::HashMap<String, Typemap>>,
}

impl std::fmt::Debug for TypemapTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypemapTable({} operations, {} typemaps)", self.maps.len(), self.len())
    }
}

impl TypemapSource for TypemapTable {
    fn lookup(&self, op: &str, signature: &str) -> Option<&Typemap> {
        self.maps.get(&Ustr::from(op))?.get(signature)
    }
}

impl TypemapTable {
    pub fn new() -> TypemapTable {
        TypemapTable::default()
    }

    pub fn len(&self) -> usize {
        self.maps.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a typemap for the given type, replacing any existing one
    pub fn insert(&mut self, op: &str, qual_type: &QualType, typemap: Typemap) {
        self.maps
            .entry(Ustr::from(op))
            .or_default()
            .insert(qual_type.to_string(), typemap);
    }

    /// Insert a typemap for a type given as a C++ spelling. The spelling is normalized to its canonical signature.
    pub fn insert_spelling(&mut self, op: &str, spelling: &str, typemap: Typemap) -> Result<()> {
        let qual_type: QualType = spelling.parse()?;
        self.insert(op, &qual_type, typemap);
        Ok(())
    }

    fn code(&mut self, op: &str, qual_type: &QualType, code: &str) {
        self.insert(op, qual_type, Typemap::new(code));
    }

    /// Overlay `other` on top of this table
    pub fn extend(&mut self, other: TypemapTable) {
        for (op, map) in other.maps {
            self.maps.entry(op).or_default().extend(map);
        }
    }

    /// Parse a table from JSON of the form `{"op": {"type spelling": "code" | {"code": .., "numinputs": ..}}}`
    pub fn from_json(json: &str) -> Result<TypemapTable> {
        let raw: HashMap<String, HashMap<String, Typemap>> = serde_json::from_str(json)?;
        let mut table = TypemapTable::new();
        for (op, map) in raw {
            for (spelling, typemap) in map {
                table.insert_spelling(&op, &spelling, typemap)?;
            }
        }
        Ok(table)
    }

    /// The built-in Fortran typemap library
    #[instrument(level = "trace")]
    pub fn fortran() -> TypemapTable {
        let mut tm = TypemapTable::new();

        for (kind, ftype) in FORTRAN_SCALARS {
            add_scalar(&mut tm, *kind, ftype);
        }

        add_void(&mut tm);
        add_class(&mut tm);
        add_enum(&mut tm);

        debug!("built-in fortran library has {} typemaps", tm.len());
        tm
    }
}

pub fn read_typemaps(path: impl AsRef<Path>) -> Result<TypemapTable> {
    let path = path.as_ref();
    let to_err = |source: Box<dyn std::error::Error + 'static + Send + Sync>| Error::FailedToReadTypemaps {
        path: path.display().to_string(),
        source,
    };
    let json = std::fs::read_to_string(path).map_err(|e| to_err(Box::new(e)))?;
    TypemapTable::from_json(&json).map_err(|e| to_err(Box::new(e)))
}

const FORTRAN_SCALARS: &[(BuiltinKind, &str)] = &[
    (BuiltinKind::Bool, "logical(C_BOOL)"),
    (BuiltinKind::Char, "character(C_CHAR)"),
    (BuiltinKind::SChar, "integer(C_SIGNED_CHAR)"),
    (BuiltinKind::UChar, "integer(C_SIGNED_CHAR)"),
    (BuiltinKind::Short, "integer(C_SHORT)"),
    (BuiltinKind::UShort, "integer(C_SHORT)"),
    (BuiltinKind::Int, "integer(C_INT)"),
    (BuiltinKind::UInt, "integer(C_INT)"),
    (BuiltinKind::Long, "integer(C_LONG)"),
    (BuiltinKind::ULong, "integer(C_LONG)"),
    (BuiltinKind::LongLong, "integer(C_LONG_LONG)"),
    (BuiltinKind::ULongLong, "integer(C_LONG_LONG)"),
    (BuiltinKind::SizeT, "integer(C_SIZE_T)"),
    (BuiltinKind::Float, "real(C_FLOAT)"),
    (BuiltinKind::Double, "real(C_DOUBLE)"),
    (BuiltinKind::LongDouble, "real(C_LONG_DOUBLE)"),
];

fn add_scalar(tm: &mut TypemapTable, kind: BuiltinKind, ftype: &str) {
    let c = kind.spelling();
    let value = QualType::builtin(kind);
    let const_ref = QualType::lvalue_reference(QualType::builtin(kind).with_const(true));

    for qt in [&value, &const_ref] {
        tm.code("ctype", qt, c);
        tm.code("imtype", qt, &format!("{ftype}, value"));
        tm.code("imtype:out", qt, ftype);
        tm.code("ftype", qt, &format!("{ftype}, intent(in)"));
        tm.code("ftype:out", qt, ftype);
        tm.code("fin", qt, "$input");
        tm.code("fout", qt, "$result = $imcall");
    }
    tm.code("in", &value, "$1 = ($1_ltype)$input;");
    tm.code("out", &value, "$result = $1;");
    tm.code("in", &const_ref, "$1 = &$input;");
    tm.code("out", &const_ref, "$result = *$1;");

    let pointer = QualType::pointer(QualType::builtin(kind));
    let reference = QualType::lvalue_reference(QualType::builtin(kind));
    let const_pointer = QualType::pointer(QualType::builtin(kind).with_const(true));

    for qt in [&pointer, &reference, &const_pointer] {
        let const_ = if qt == &const_pointer { "const " } else { "" };
        tm.code("ctype", qt, &format!("{const_}{c} *"));
        tm.code("imtype", qt, "type(C_PTR), value");
        tm.code("imtype:out", qt, "type(C_PTR)");
        tm.code(
            "ftype",
            qt,
            &format!(
                "{ftype}, target, intent({})",
                if const_.is_empty() { "inout" } else { "in" }
            ),
        );
        tm.code("ftype:out", qt, "type(C_PTR)");
        tm.code("in", qt, "$1 = ($1_ltype)$input;");
        tm.code("out", qt, "$result = $1;");
        tm.code("fin", qt, "c_loc($input)");
        tm.code("fout", qt, "$result = $imcall");
    }
}

fn add_void(tm: &mut TypemapTable) {
    let void = QualType::void();
    tm.code("ctype", &void, "void");
    tm.code("imtype:out", &void, "");
    tm.code("ftype:out", &void, "");
    tm.code("out", &void, "");
    tm.code("fout", &void, "call $imcall");

    for is_const in [false, true] {
        let qt = QualType::pointer(QualType::void().with_const(is_const));
        tm.code("ctype", &qt, if is_const { "const void *" } else { "void *" });
        tm.code("imtype", &qt, "type(C_PTR), value");
        tm.code("imtype:out", &qt, "type(C_PTR)");
        tm.code("ftype", &qt, "type(C_PTR), intent(in)");
        tm.code("ftype:out", &qt, "type(C_PTR)");
        tm.code("in", &qt, "$1 = ($1_ltype)$input;");
        tm.code("out", &qt, "$result = $1;");
        tm.code("fin", &qt, "$input");
        tm.code("fout", &qt, "$result = $imcall");
    }
}

fn add_class(tm: &mut TypemapTable) {
    let value = QualType::named(SWIGTYPE);
    let pointer = QualType::pointer(QualType::named(SWIGTYPE));
    let const_pointer = QualType::pointer(QualType::named(SWIGTYPE).with_const(true));
    let reference = QualType::lvalue_reference(QualType::named(SWIGTYPE));
    let const_reference = QualType::lvalue_reference(QualType::named(SWIGTYPE).with_const(true));

    for qt in [&value, &pointer, &const_pointer, &reference, &const_reference] {
        tm.code("imtype", qt, "type(C_PTR), value");
        tm.code("imtype:out", qt, "type(C_PTR)");
        tm.code("ftype", qt, "class($fclassname), intent(in)");
        tm.code("ftype:out", qt, "type($fclassname)");
        tm.code("in", qt, "$1 = ($1_ltype)$input;");
        tm.code("fin", qt, "$input%swigptr");
        tm.code("fout", qt, "$result%swigptr = $imcall");
    }

    tm.code("ctype", &value, "const void *");
    tm.code("ctype:out", &value, "void *");
    tm.code("out", &value, "$result = new $1_basetype($1);");

    for qt in [&pointer, &reference] {
        tm.code("ctype", qt, "void *");
        tm.code("out", qt, "$result = (void *)$1;");
    }
    for qt in [&const_pointer, &const_reference] {
        tm.code("ctype", qt, "const void *");
        tm.code("out", qt, "$result = (const void *)$1;");
    }

    tm.code("fdata", &value, "type(C_PTR), public :: swigptr = C_NULL_PTR");
    tm.code("fcreate", &pointer, "self%swigptr = $imcall");
    tm.code(
        "frelease",
        &pointer,
        indoc::indoc! {"
            call $imcall
            self%swigptr = C_NULL_PTR"},
    );
}

fn add_enum(tm: &mut TypemapTable) {
    let value = QualType::named(SWIGENUM);
    let const_reference = QualType::lvalue_reference(QualType::named(SWIGENUM).with_const(true));

    for qt in [&value, &const_reference] {
        tm.code("ctype", qt, "int");
        tm.code("imtype", qt, "integer(C_INT), value");
        tm.code("imtype:out", qt, "integer(C_INT)");
        tm.code("ftype", qt, "integer(kind($fclassname)), intent(in)");
        tm.code("ftype:out", qt, "integer(kind($fclassname))");
        tm.code("fin", qt, "$input");
        tm.code("fout", qt, "$result = $imcall");
    }
    tm.code("in", &value, "$1 = ($1_ltype)$input;");
    tm.code("out", &value, "$result = (int)$1;");
    tm.code("in", &const_reference, "$1 = ($1_ltype)&$input;");
    tm.code("out", &const_reference, "$result = (int)*$1;");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_library_covers_common_types() {
        let tm = TypemapTable::fortran();
        assert_eq!(tm.lookup("ctype", "int").map(|t| t.code()), Some("int"));
        assert_eq!(
            tm.lookup("imtype", "const double &").map(|t| t.code()),
            Some("real(C_DOUBLE), value")
        );
        assert_eq!(tm.lookup("ctype", "const SWIGTYPE &").map(|t| t.code()), Some("const void *"));
        assert_eq!(tm.lookup("ctype:out", "SWIGTYPE").map(|t| t.code()), Some("void *"));
        assert_eq!(tm.lookup("fout", "void").map(|t| t.code()), Some("call $imcall"));
        assert!(tm.lookup("ctype", "SimpleClass *").is_none());
    }

    #[test]
    fn json_tables_are_normalized_and_overlay() -> Result<(), Error> {
        let overlay = TypemapTable::from_json(
            r#"{
                "ftype": {"const int&": "integer(C_INT), intent(in), optional"},
                "in": {"int *OUTPUT": {"code": "$1 = &temp;", "numinputs": 0}}
            }"#,
        );
        // parameter names are not part of a type spelling
        assert!(overlay.is_err());

        let overlay = TypemapTable::from_json(
            r#"{
                "ftype": {"const int&": "integer(C_INT), intent(in), optional"},
                "in": {"double ** ": {"code": "$1 = &temp;", "numinputs": 0}}
            }"#,
        )?;
        let mut tm = TypemapTable::fortran();
        tm.extend(overlay);

        assert_eq!(
            tm.lookup("ftype", "const int &").map(|t| t.code()),
            Some("integer(C_INT), intent(in), optional")
        );
        assert!(tm.lookup("in", "double * *").map(Typemap::is_zero_input).unwrap_or(false));
        assert_eq!(tm.lookup("ftype", "int").map(|t| t.code()), Some("integer(C_INT), intent(in)"));
        Ok(())
    }
}
