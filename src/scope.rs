use std::collections::HashMap;

use crate::{token::Span, types::TypeId, util::intern::Name};

/// One lexical scope's name table. The checker keeps a stack of these
/// (innermost last); lookups walk the stack outward.
#[derive(Default)]
pub struct SymbolTable {
    symbols: HashMap<Name, Symbol>,
    /// Insertion order, for deterministic suggestion candidates.
    order: Vec<Name>,
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: Name,
    pub kind: SymbolKind,
    pub ty: TypeId,
    pub mutable: bool,
    pub initialized: bool,
    /// Defining token's span.
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    /// `var` — function-scoped, hoisted.
    Var,
    /// `let` and the `name: type = value` sugar form.
    Let,
    Const,
    Func,
    Param,
    /// `for` loop counter.
    Counter,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Declares `symbol` in this scope. Fails (returning the existing
    /// symbol) when the name is already bound here; shadowing an outer
    /// scope's binding is not this table's concern.
    pub fn declare(&mut self, symbol: Symbol) -> Result<(), Symbol> {
        match self.symbols.get(&symbol.name) {
            Some(existing) => Err(existing.clone()),
            None => {
                self.order.push(symbol.name);
                self.symbols.insert(symbol.name, symbol);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: Name) -> Option<&Symbol> {
        self.symbols.get(&name)
    }

    pub fn get_mut(&mut self, name: Name) -> Option<&mut Symbol> {
        self.symbols.get_mut(&name)
    }

    /// Declared names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = Name> + '_ {
        self.order.iter().copied()
    }
}
