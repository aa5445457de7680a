//! The label → word-address symbol table built during Pass 1.

use std::collections::HashMap;

use crate::error::SemanticError;

/// Label names are uppercased by the lexer before they ever reach here, so
/// lookups are case-insensitive by construction.
#[derive(Debug, Default)]
pub struct SymbolTable {
    addresses: HashMap<String, u16>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Records `label -> address`. Fails if `label` was already defined.
    pub fn define(&mut self, label: &str, address: u16, line: u32) -> Result<(), SemanticError> {
        if self.addresses.contains_key(label) {
            return Err(SemanticError::DuplicateLabel {
                line,
                label: label.to_string(),
            });
        }
        self.addresses.insert(label.to_string(), address);
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<u16> {
        self.addresses.get(label).copied()
    }

    /// Looks up `label`, turning a miss into a `SemanticError::UndefinedLabel`.
    pub fn resolve(&self, label: &str, line: u32) -> Result<u16, SemanticError> {
        self.get(label).ok_or_else(|| SemanticError::UndefinedLabel {
            line,
            label: label.to_string(),
        })
    }
}
