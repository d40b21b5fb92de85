use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{class::ClassDecl, qualtype::QualType, sanitize_name, typemap::TypemapAttachments};

/// Where a declaration came from, for diagnostics
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: &str, line: u32) -> SourceLocation {
        SourceLocation {
            file: file.to_string(),
            line,
        }
    }
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.file.is_empty() {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}:{}", self.file, self.line)
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub(crate) name: String,
    #[serde(rename = "type")]
    pub(crate) qual_type: QualType,
    /// Typemaps attached to this parameter by the front end. These win over the typemap store.
    #[serde(default, skip_serializing_if = "TypemapAttachments::is_empty")]
    pub(crate) typemaps: TypemapAttachments,
}

impl Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.qual_type)
    }
}

impl Parameter {
    pub fn new(name: &str, qual_type: QualType) -> Parameter {
        Parameter {
            name: name.to_string(),
            qual_type,
            typemaps: TypemapAttachments::default(),
        }
    }

    pub fn with_typemaps(mut self, typemaps: TypemapAttachments) -> Parameter {
        self.typemaps = typemaps;
        self
    }

    /// The declared name. May be empty for unnamed parameters.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qual_type(&self) -> &QualType {
        &self.qual_type
    }

    pub fn typemaps(&self) -> &TypemapAttachments {
        &self.typemaps
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorRole {
    Get,
    Set,
}

/// What sort of entity a [`DeclarationNode`] binds. Member kinds only appear inside a [`ClassDecl`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclKind {
    FreeFunction,
    Constructor,
    Destructor,
    Method {
        #[serde(default)]
        is_const: bool,
    },
    Accessor {
        field: String,
        role: AccessorRole,
    },
}

impl DeclKind {
    pub fn is_member(&self) -> bool {
        !matches!(self, DeclKind::FreeFunction)
    }

    /// Does this kind of member take the object as an implicit first argument?
    pub fn has_self(&self) -> bool {
        matches!(
            self,
            DeclKind::Destructor | DeclKind::Method { .. } | DeclKind::Accessor { .. }
        )
    }
}

/// Optional behaviour requested by the front end for a single declaration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    /// The result is a newly allocated object whose ownership passes to the caller
    pub new_object: bool,
    /// Fortran code inserted verbatim at the start of the proxy routine body
    pub prepend: Option<String>,
    /// Fortran code inserted verbatim at the end of the proxy routine body
    pub append: Option<String>,
    /// C++ code wrapping the action. `$action` expands to the action code.
    pub exception: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeclarationNode {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) sym_name: Option<String>,
    #[serde(default)]
    pub(crate) rename: Option<String>,
    #[serde(flatten)]
    pub(crate) kind: DeclKind,
    #[serde(default)]
    pub(crate) parameters: Vec<Parameter>,
    #[serde(default = "QualType::void")]
    pub(crate) result: QualType,
    /// Set by the front end when this is one of several overloaded variants
    #[serde(default)]
    pub(crate) overload: Option<String>,
    #[serde(default)]
    pub(crate) features: Features,
    /// The literal C++ invocation of the underlying entity. Synthesized when absent.
    #[serde(default)]
    pub(crate) action: Option<String>,
    #[serde(default)]
    pub(crate) location: SourceLocation,
}

impl Display for DeclarationNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let args = self
            .parameters
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({args}) -> {}", self.name, self.result)
    }
}

impl DeclarationNode {
    pub fn new(name: &str, kind: DeclKind) -> DeclarationNode {
        DeclarationNode {
            name: name.to_string(),
            sym_name: None,
            rename: None,
            kind,
            parameters: Vec::new(),
            result: QualType::void(),
            overload: None,
            features: Features::default(),
            action: None,
            location: SourceLocation::default(),
        }
    }

    pub fn function(name: &str) -> DeclarationNode {
        DeclarationNode::new(name, DeclKind::FreeFunction)
    }

    pub fn method(name: &str) -> DeclarationNode {
        DeclarationNode::new(name, DeclKind::Method { is_const: false })
    }

    pub fn with_parameter(mut self, name: &str, qual_type: QualType) -> DeclarationNode {
        self.parameters.push(Parameter::new(name, qual_type));
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> DeclarationNode {
        self.parameters = parameters;
        self
    }

    pub fn with_result(mut self, result: QualType) -> DeclarationNode {
        self.result = result;
        self
    }

    pub fn with_rename(mut self, rename: &str) -> DeclarationNode {
        self.rename = Some(rename.to_string());
        self
    }

    pub fn with_sym_name(mut self, sym_name: &str) -> DeclarationNode {
        self.sym_name = Some(sym_name.to_string());
        self
    }

    pub fn with_overload(mut self, discriminator: &str) -> DeclarationNode {
        self.overload = Some(discriminator.to_string());
        self
    }

    pub fn with_features(mut self, features: Features) -> DeclarationNode {
        self.features = features;
        self
    }

    pub fn with_action(mut self, action: &str) -> DeclarationNode {
        self.action = Some(action.to_string());
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> DeclarationNode {
        self.location = location;
        self
    }

    /// The C++ name of the entity, qualified for free functions
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &DeclKind {
        &self.kind
    }

    pub fn result(&self) -> &QualType {
        &self.result
    }

    /// The parameters as declared, without any implicit `self`
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn overload(&self) -> Option<&str> {
        self.overload.as_deref()
    }

    pub fn is_overloaded(&self) -> bool {
        self.overload.is_some()
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn rename(&self) -> Option<&str> {
        self.rename.as_deref()
    }

    /// The name the entity is exposed under: the rename if one was given, otherwise the unqualified C++ name
    pub fn public_name(&self) -> String {
        match &self.rename {
            Some(rename) => rename.clone(),
            None => sanitize_name(self.name.rsplit("::").next().unwrap_or(&self.name)),
        }
    }

    /// The symbol the shim is named after, e.g. `new_Foo`, `Foo_bar`, `Foo_x_get`
    pub fn sym_name(&self, class: Option<&ClassDecl>) -> String {
        if let Some(sym_name) = &self.sym_name {
            return sym_name.clone();
        }

        let class_name = class.map(|c| c.public_name()).unwrap_or_default();
        match &self.kind {
            DeclKind::FreeFunction => self.public_name(),
            DeclKind::Constructor => format!("new_{class_name}"),
            DeclKind::Destructor => format!("delete_{class_name}"),
            DeclKind::Method { .. } => format!("{class_name}_{}", self.public_name()),
            DeclKind::Accessor { field, role } => format!(
                "{class_name}_{field}_{}",
                match role {
                    AccessorRole::Get => "get",
                    AccessorRole::Set => "set",
                }
            ),
        }
    }

    /// The return type, with constructors defaulting to a pointer to their class
    pub fn effective_result(&self, class: Option<&ClassDecl>) -> QualType {
        match (&self.kind, class) {
            (DeclKind::Constructor, Some(class)) if self.result.is_void() => {
                QualType::pointer(QualType::named(class.name()))
            }
            _ => self.result.clone(),
        }
    }

    /// The full parameter list as the shim sees it, with the implicit `self` first for members that take one
    pub fn effective_parameters(&self, class: Option<&ClassDecl>) -> Vec<Parameter> {
        let mut result = Vec::with_capacity(self.parameters.len() + 1);
        if let (true, Some(class)) = (self.kind.has_self(), class) {
            let is_const = matches!(
                self.kind,
                DeclKind::Method { is_const: true }
                    | DeclKind::Accessor {
                        role: AccessorRole::Get,
                        ..
                    }
            );
            result.push(Parameter::new(
                "self",
                QualType::pointer(QualType::named(class.name()).with_const(is_const)),
            ));
        }
        result.extend(self.parameters.iter().cloned());
        result
    }
}
