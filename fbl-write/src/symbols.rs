use fbl_ast::SourceLocation;
use hashbrown::HashMap;

/// Names that must be unique across the generated module, with where they were first defined
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, SourceLocation>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Register `name`. If it already exists, returns the location of the previous definition.
    pub fn register(&mut self, name: &str, location: &SourceLocation) -> Result<(), SourceLocation> {
        if let Some(previous) = self.symbols.get(name) {
            return Err(previous.clone());
        }
        self.symbols.insert(name.to_string(), location.clone());
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }
}
