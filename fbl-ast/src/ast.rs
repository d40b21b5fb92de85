use std::fmt::Debug;

use fbl_util::Trace;
use serde::Deserialize;
use tracing::{error, instrument, trace};
use ustr::{Ustr, UstrMap};

use crate::class::ClassDecl;
use crate::enm::Enum;
use crate::error::Error;
use crate::function::{DeclKind, DeclarationNode};
use crate::index_map::{IndexMapKey, UstrIndexMap};
use crate::qualtype::{BuiltinKind, QualType, TypeRef};
use crate::typedef::Typedef;
type Result<T, E = Error> = std::result::Result<T, E>;

/// A top-level declaration, in the order the front end saw it
#[derive(Clone, Debug)]
pub enum Item {
    Function(DeclarationNode),
    Class(ClassId),
    Enum(EnumId),
}

/// What a type names once typedefs are resolved and pointers, references and qualifiers are peeled off
#[derive(Debug)]
pub enum TypeCategory<'a> {
    Void,
    Builtin(BuiltinKind),
    Class(&'a ClassDecl),
    Enum(&'a Enum),
    /// A name the AST knows nothing about. Treated as an opaque class.
    Unknown(Ustr),
    /// Spelled `enum X` but not declared in the AST
    UnknownEnum(Ustr),
}

impl<'a> TypeCategory<'a> {
    pub fn is_class_like(&self) -> bool {
        matches!(self, TypeCategory::Class(_) | TypeCategory::Unknown(_))
    }
}

pub struct AST {
    pub(crate) name: String,
    pub(crate) includes: Vec<String>,
    /// C++ code inserted verbatim into the initialization block of the shim source
    pub(crate) init: Vec<String>,
    pub(crate) classes: UstrIndexMap<ClassDecl, ClassId>,
    pub(crate) enums: UstrIndexMap<Enum, EnumId>,
    pub(crate) typedefs: UstrMap<Typedef>,
    pub(crate) items: Vec<Item>,
}

impl Debug for AST {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AST({}: {} classes, {} enums, {} typedefs, {} items)",
            self.name,
            self.classes.len(),
            self.enums.len(),
            self.typedefs.len(),
            self.items.len()
        )
    }
}

#[derive(Deserialize)]
struct AstFile {
    name: String,
    #[serde(default)]
    includes: Vec<String>,
    #[serde(default)]
    init: Vec<String>,
    #[serde(default)]
    typedefs: Vec<Typedef>,
    #[serde(default)]
    items: Vec<ItemFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum ItemFile {
    Class(ClassDecl),
    Enum(Enum),
    Function(DeclarationNode),
}

impl AST {
    pub fn new(name: &str) -> AST {
        AST {
            name: name.to_string(),
            includes: Vec::new(),
            init: Vec::new(),
            classes: UstrIndexMap::new(),
            enums: UstrIndexMap::new(),
            typedefs: UstrMap::default(),
            items: Vec::new(),
        }
    }

    /// Load an AST from the JSON document written by the front end
    #[instrument(level = "trace", skip(json))]
    pub fn from_json(json: &str) -> Result<AST> {
        let file: AstFile = serde_json::from_str(json)?;

        let mut ast = AST::new(&file.name);
        ast.includes = file.includes;
        ast.init = file.init;
        for td in file.typedefs {
            ast.add_typedef(td);
        }
        for item in file.items {
            match item {
                ItemFile::Class(class) => {
                    ast.add_class(class);
                }
                ItemFile::Enum(enm) => {
                    ast.add_enum(enm);
                }
                ItemFile::Function(function) => {
                    if function.kind() != &DeclKind::FreeFunction {
                        return Err(Error::InvalidItem {
                            name: function.name().to_string(),
                            reason: "top-level functions must have kind \"free_function\"".to_string(),
                        });
                    }
                    ast.add_function(function);
                }
            }
        }

        trace!("loaded {ast:?}");
        Ok(ast)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn add_include(&mut self, include: &str) {
        self.includes.push(include.to_string());
    }

    pub fn init(&self) -> &[String] {
        &self.init
    }

    pub fn add_init(&mut self, code: &str) {
        self.init.push(code.to_string());
    }

    pub fn add_class(&mut self, class: ClassDecl) -> ClassId {
        let id = ClassId(self.classes.insert(class.name().into(), class));
        self.items.push(Item::Class(id));
        id
    }

    pub fn add_enum(&mut self, enm: Enum) -> EnumId {
        let key: Ustr = if enm.is_anonymous() {
            format!("<anonymous enum {}>", self.enums.len()).into()
        } else {
            enm.name().into()
        };
        let id = EnumId(self.enums.insert(key, enm));
        self.items.push(Item::Enum(id));
        id
    }

    pub fn add_function(&mut self, function: DeclarationNode) {
        self.items.push(Item::Function(function));
    }

    pub fn add_typedef(&mut self, typedef: Typedef) {
        self.typedefs.insert(typedef.name().into(), typedef);
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn classes(&self) -> &UstrIndexMap<ClassDecl, ClassId> {
        &self.classes
    }

    pub fn enums(&self) -> &UstrIndexMap<Enum, EnumId> {
        &self.enums
    }

    pub fn class(&self, id: ClassId) -> &ClassDecl {
        &self.classes[id]
    }

    pub fn enm(&self, id: EnumId) -> &Enum {
        &self.enums[id]
    }

    pub fn get_class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.get(&name.into())
    }

    pub fn get_enum(&self, name: &str) -> Option<&Enum> {
        self.enums.get(&name.into())
    }

    pub fn get_typedef(&self, name: &str) -> Option<&Typedef> {
        self.typedefs.get(&name.into())
    }

    /// Find a class whose qualified name fully or partially (trailing `::` segments) matches `name`
    pub fn find_class(&self, name: &str) -> Result<ClassId> {
        let suffix = format!("::{name}");
        let mut matches = Vec::new();
        for (id, class) in self.classes.iter().enumerate() {
            if class.name() == name {
                return Ok(ClassId(id));
            } else if class.name().ends_with(&suffix) {
                matches.push(ClassId(id));
            }
        }

        match matches.len() {
            0 => {
                let mut distances = self
                    .classes
                    .iter()
                    .map(|c| (levenshtein::levenshtein(c.name(), name), c.name()))
                    .collect::<Vec<_>>();
                distances.sort_by(|a, b| a.0.cmp(&b.0));

                error!("Could not find class matching qualified name: \"{}\"", name);
                if !distances.is_empty() {
                    error!("Did you mean one of:");
                    for (_, sug) in distances.iter().take(3) {
                        error!("  {sug}");
                    }
                }

                Err(Error::ClassNotFound(name.into()))
            }
            1 => Ok(matches[0]),
            _ => {
                error!("Multiple classes match \"{name}\":");
                for id in &matches {
                    error!("  {}", self.classes[*id].name());
                }
                Err(Error::MultipleMatches)
            }
        }
    }

    pub fn find_enum(&self, name: &str) -> Result<EnumId> {
        self.enums
            .get_id(&name.into())
            .map(|id| EnumId(*id))
            .ok_or_else(|| Error::EnumNotFound(name.into()))
    }

    /// Find a top-level function by its C++ name
    pub fn find_function(&self, name: &str) -> Result<&DeclarationNode> {
        self.items
            .iter()
            .find_map(|item| match item {
                Item::Function(f) if f.name() == name => Some(f),
                _ => None,
            })
            .ok_or_else(|| Error::FunctionNotFound(name.into()))
    }

    /// Replace every typedef in the base of `qual_type` with the type it aliases, until the base is no longer a
    /// typedef. The pointer/reference shape and qualifiers are kept.
    pub fn resolve_typedefs(&self, qual_type: &QualType) -> Result<QualType> {
        let mut current = qual_type.clone();
        let mut seen = Vec::new();

        while let Some(name) = current.base_name() {
            let typedef = match self.typedefs.get(&name) {
                Some(td) => td,
                None => break,
            };

            if seen.contains(&name) {
                return Err(Error::RecursiveTypedef {
                    name: name.to_string(),
                    source: Trace::new(),
                });
            }
            seen.push(name);

            current = current.replace_base(typedef.underlying_type());
        }

        Ok(current)
    }

    /// Categorize the base of `qual_type` after resolving typedefs
    pub fn categorize(&self, qual_type: &QualType) -> Result<TypeCategory<'_>> {
        let resolved = self.resolve_typedefs(qual_type)?;
        let category = match resolved.base().type_ref() {
            TypeRef::Builtin(BuiltinKind::Void) => TypeCategory::Void,
            TypeRef::Builtin(kind) => TypeCategory::Builtin(*kind),
            TypeRef::Ref(name) => {
                if let Some(class) = self.classes.get(name) {
                    TypeCategory::Class(class)
                } else if let Some(enm) = self.enums.get(name) {
                    TypeCategory::Enum(enm)
                } else {
                    TypeCategory::Unknown(*name)
                }
            }
            TypeRef::Enum(name) => match self.enums.get(name) {
                Some(enm) => TypeCategory::Enum(enm),
                None => TypeCategory::UnknownEnum(*name),
            },
            // base() never stops on a pointer or reference
            TypeRef::Pointer(_) | TypeRef::LValueReference(_) | TypeRef::RValueReference(_) => {
                TypeCategory::Unknown(resolved.to_string().into())
            }
        };
        Ok(category)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ClassId(usize);

impl ClassId {
    pub fn new(id: usize) -> ClassId {
        ClassId(id)
    }
}

impl IndexMapKey for ClassId {
    fn get(&self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EnumId(usize);

impl EnumId {
    pub fn new(id: usize) -> EnumId {
        EnumId(id)
    }
}

impl IndexMapKey for EnumId {
    fn get(&self) -> usize {
        self.0
    }
}
