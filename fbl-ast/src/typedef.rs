use serde::{Deserialize, Serialize};

use crate::qualtype::QualType;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Typedef {
    /// Qualified name of the alias, e.g. `SimpleClass::storage_type`
    pub(crate) name: String,
    pub(crate) underlying: QualType,
}

impl Typedef {
    pub fn new(name: &str, underlying: QualType) -> Typedef {
        Typedef {
            name: name.to_string(),
            underlying,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn underlying_type(&self) -> &QualType {
        &self.underlying
    }
}
