use std::fmt::Write;

use fbl_ast::index_map::{IndexMapKey, UstrIndexMap};

use crate::error::Error;
type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Copy, Debug)]
pub struct OverloadGroupId(usize);

impl IndexMapKey for OverloadGroupId {
    fn get(&self) -> usize {
        self.0
    }
}

/// Variants sharing one public name, in the order they were declared.
///
/// One registry lives for the whole module (free functions). Each class gets a fresh one in its
/// [`ClassContext`](crate::class::ClassContext).
#[derive(Debug, Default)]
pub struct OverloadRegistry {
    groups: UstrIndexMap<Vec<String>, OverloadGroupId>,
}

impl OverloadRegistry {
    pub fn new() -> OverloadRegistry {
        OverloadRegistry::default()
    }

    pub fn record(&mut self, public_name: &str, variant: &str) {
        self.groups
            .get_or_insert_with(public_name.into(), Vec::new)
            .push(variant.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The groups in the order their public names were first seen
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter_with_keys()
            .map(|(name, variants)| (name.as_str(), variants.as_slice()))
    }

    pub fn variants(&self, public_name: &str) -> Option<&[String]> {
        self.groups.get(&public_name.into()).map(|v| v.as_slice())
    }

    /// Module scope: export each public name and map it to its variants with a generic interface
    pub fn write_module_interfaces(&self, out: &mut String) -> Result<()> {
        for (name, variants) in self.groups() {
            writeln!(out, " public :: {name}")?;
            writeln!(out, " interface {name}")?;
            writeln!(out, "  module procedure {}", variants.join(", "))?;
            writeln!(out, " end interface")?;
        }
        Ok(())
    }

    /// Class scope: one `generic` binding per public name, written inside the type's `contains` section
    pub fn write_generics(&self, out: &mut String) -> Result<()> {
        for (name, variants) in self.groups() {
            writeln!(out, "  generic :: {name} => {}", variants.join(", "))?;
        }
        Ok(())
    }
}
