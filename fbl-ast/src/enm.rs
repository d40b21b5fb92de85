use serde::{Deserialize, Serialize};

use crate::{function::SourceLocation, sanitize_name};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Enum {
    /// Qualified C++ name. Empty for anonymous enums.
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) rename: Option<String>,
    pub(crate) variants: Vec<(String, i64)>,
    #[serde(default)]
    pub(crate) location: SourceLocation,
}

impl Enum {
    pub fn new(name: &str, variants: &[(&str, i64)]) -> Enum {
        Enum {
            name: name.to_string(),
            rename: None,
            variants: variants.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
            location: SourceLocation::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }

    pub fn variants(&self) -> &[(String, i64)] {
        &self.variants
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// The marker enumerator naming this enum's kind in Fortran, `None` for anonymous enums
    pub fn marker(&self) -> Option<String> {
        if self.is_anonymous() {
            None
        } else if let Some(rename) = &self.rename {
            Some(rename.clone())
        } else {
            Some(sanitize_name(&self.name))
        }
    }
}
