use std::{collections::HashMap, rc::Rc};

/// An identifier or type tag, interned for cheap comparison. Scope lookups
/// and property tables compare names constantly; a `u32` handle keeps those
/// O(1) and lets AST nodes stay `Copy`. Use [`Interner::resolve`] for the
/// text.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Name(u32);

/// Owns the text behind every [`Name`] handed out during one compilation.
pub struct Interner {
    lookup: HashMap<Rc<str>, Name>,
    texts: Vec<Rc<str>>,
}

impl Interner {
    pub fn with_capacity(capacity: usize) -> Interner {
        Interner {
            lookup: HashMap::with_capacity(capacity),
            texts: Vec::with_capacity(capacity),
        }
    }

    /// The same text always maps to the same name.
    pub fn intern(&mut self, text: &str) -> Name {
        if let Some(&name) = self.lookup.get(text) {
            return name;
        }
        let text: Rc<str> = text.into();
        let name = Name(u32::try_from(self.texts.len()).expect("name table overflow"));
        self.texts.push(Rc::clone(&text));
        self.lookup.insert(text, name);
        name
    }

    /// Panics on a name from a different interner.
    pub fn resolve(&self, name: Name) -> &str {
        &self.texts[name.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_name() {
        let mut interner = Interner::with_capacity(4);

        let hello = interner.intern("hello");
        let world = interner.intern("world");

        assert_eq!(hello, interner.intern("hello"));
        assert_eq!(world, interner.intern("world"));
        assert_ne!(hello, world);
    }

    #[test]
    fn resolve_round_trips() {
        let mut interner = Interner::with_capacity(4);
        for text in ["alpha", "beta", "alpha", "gamma"] {
            let name = interner.intern(text);
            assert_eq!(interner.resolve(name), text);
        }
    }
}
