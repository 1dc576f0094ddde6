use crate::{types::TypeRegistry, util::intern::Interner};

pub mod tree;

/// Everything the printers need besides the node itself: interned names and
/// the type registry for rendering resolved types.
pub struct Context<'a> {
    pub idents: &'a Interner,
    pub registry: &'a TypeRegistry,
}
