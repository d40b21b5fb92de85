use serde::{Deserialize, Serialize};

use crate::{
    function::{DeclarationNode, SourceLocation},
    sanitize_name,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassDecl {
    /// Qualified C++ name, e.g. `ns::SimpleClass`
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) rename: Option<String>,
    /// Declared base classes. Inheritance is not supported and these are dropped with a warning.
    #[serde(default)]
    pub(crate) bases: Vec<String>,
    #[serde(default)]
    pub(crate) members: Vec<DeclarationNode>,
    #[serde(default)]
    pub(crate) location: SourceLocation,
}

impl ClassDecl {
    pub fn new(name: &str) -> ClassDecl {
        ClassDecl {
            name: name.to_string(),
            rename: None,
            bases: Vec::new(),
            members: Vec::new(),
            location: SourceLocation::default(),
        }
    }

    pub fn with_member(mut self, member: DeclarationNode) -> ClassDecl {
        self.members.push(member);
        self
    }

    pub fn with_base(mut self, base: &str) -> ClassDecl {
        self.bases.push(base.to_string());
        self
    }

    pub fn with_rename(mut self, rename: &str) -> ClassDecl {
        self.rename = Some(rename.to_string());
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> ClassDecl {
        self.location = location;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the generated derived type
    pub fn public_name(&self) -> String {
        match &self.rename {
            Some(rename) => rename.clone(),
            None => sanitize_name(self.name.rsplit("::").next().unwrap_or(&self.name)),
        }
    }

    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    pub fn members(&self) -> &[DeclarationNode] {
        &self.members
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }
}
