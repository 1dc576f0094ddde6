use std::collections::HashMap;

use crate::{
    ast::{AssignOp, BinaryOp, UnaryOp},
    util::intern::{Interner, Name},
};

/// Stable identity of a type. Every structured type lives in the
/// [`TypeRegistry`]; everything else holds plain ids, so cyclic type shapes
/// (a record whose method returns the record) never form owning cycles.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct TypeId(u32);

impl TypeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Built-in singletons, seeded by [`TypeRegistry::new`] at fixed ids.
pub mod builtins {
    use super::TypeId;

    pub const ANY: TypeId = TypeId(0);
    pub const OBJECT: TypeId = TypeId(1);
    pub const STR: TypeId = TypeId(2);
    pub const NUM: TypeId = TypeId(3);
    pub const BOOL: TypeId = TypeId(4);
    pub const VOID: TypeId = TypeId(5);
    /// A pending inference.
    pub const INFER: TypeId = TypeId(6);
    /// An earlier failure; assignable in both directions so a single root
    /// cause never cascades.
    pub const ERROR: TypeId = TypeId(7);
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeData {
    Primitive {
        tag: Name,
    },
    /// A generic formal parameter, e.g. the `T` of `Array<T>`.
    Param {
        tag: Name,
    },
    Function(FunctionType),
    Generic(GenericType),
    Instance(GenericInstance),
    /// Deduplicated member set, sorted by id.
    Union {
        members: Vec<TypeId>,
    },
    /// Structural object type; insertion-ordered properties.
    Object {
        properties: Vec<(Name, TypeId)>,
    },
    /// User-defined nominal record.
    Record(RecordType),
    /// Forward reference awaiting resolution, possibly applied to type
    /// arguments (`Foo<num>` before `Foo` is known).
    Unresolved {
        tag: Name,
        args: Vec<TypeId>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionType {
    pub params: Vec<ParamType>,
    pub return_ty: TypeId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParamType {
    pub name: Name,
    pub ty: TypeId,
    pub required: bool,
    pub rest: bool,
    pub has_default: bool,
}

impl ParamType {
    pub fn required(name: Name, ty: TypeId) -> ParamType {
        ParamType {
            name,
            ty,
            required: true,
            rest: false,
            has_default: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenericType {
    pub tag: Name,
    /// Formal parameters ([`TypeData::Param`] ids), in declaration order.
    pub params: Vec<TypeId>,
    pub properties: Vec<(Name, TypeId)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenericInstance {
    pub generic: TypeId,
    pub args: Vec<TypeId>,
    /// The generic's properties with formals substituted.
    pub properties: Vec<(Name, TypeId)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordType {
    pub tag: Name,
    pub properties: Vec<(Name, TypeId)>,
}

pub struct TypeRegistry {
    types: Vec<TypeData>,
    array: TypeId,
}

impl TypeRegistry {
    pub fn new(interner: &mut Interner) -> TypeRegistry {
        let mut registry = TypeRegistry {
            types: Vec::with_capacity(64),
            array: TypeId(0),
        };
        for tag in ["any", "object", "str", "num", "bool", "void", "infer", "error"] {
            let tag = interner.intern(tag);
            registry.add(TypeData::Primitive { tag });
        }
        debug_assert_eq!(registry.types.len(), builtins::ERROR.index() + 1);

        // The built-in `Array<T>` generic.
        let t = registry.add(TypeData::Param {
            tag: interner.intern("T"),
        });
        let push = registry.function(FunctionType {
            params: vec![ParamType::required(interner.intern("item"), t)],
            return_ty: builtins::NUM,
        });
        let pop = registry.function(FunctionType {
            params: vec![],
            return_ty: t,
        });
        let properties = vec![
            (interner.intern("length"), builtins::NUM),
            (interner.intern("push"), push),
            (interner.intern("pop"), pop),
        ];
        registry.array = registry.add(TypeData::Generic(GenericType {
            tag: interner.intern("Array"),
            params: vec![t],
            properties,
        }));
        registry
    }

    pub fn data(&self, id: TypeId) -> &TypeData {
        &self.types[id.index()]
    }

    /// The built-in `Array` generic.
    pub fn array_generic(&self) -> TypeId {
        self.array
    }

    pub fn array_of(&mut self, element: TypeId) -> TypeId {
        let array = self.array;
        self.instantiate(array, vec![element])
    }

    /// Element type of an `Array<T>` instance, if `id` is one.
    pub fn array_element(&self, id: TypeId) -> Option<TypeId> {
        match self.data(id) {
            TypeData::Instance(instance) if instance.generic == self.array => {
                instance.args.first().copied()
            }
            _ => None,
        }
    }

    fn add(&mut self, data: TypeData) -> TypeId {
        let id = u32::try_from(self.types.len()).expect("type registry out of ids");
        self.types.push(data);
        TypeId(id)
    }

    pub fn function(&mut self, function: FunctionType) -> TypeId {
        self.add(TypeData::Function(function))
    }

    pub fn object(&mut self, properties: Vec<(Name, TypeId)>) -> TypeId {
        self.add(TypeData::Object { properties })
    }

    pub fn param(&mut self, tag: Name) -> TypeId {
        self.add(TypeData::Param { tag })
    }

    pub fn generic(&mut self, generic: GenericType) -> TypeId {
        self.add(TypeData::Generic(generic))
    }

    pub fn record(&mut self, tag: Name) -> TypeId {
        self.add(TypeData::Record(RecordType {
            tag,
            properties: Vec::new(),
        }))
    }

    pub fn unresolved(&mut self, tag: Name, args: Vec<TypeId>) -> TypeId {
        self.add(TypeData::Unresolved { tag, args })
    }

    /// Fills in a record's or generic's property table after registration.
    /// Registration and population are separate steps so mutually recursive
    /// records can reference each other.
    pub fn set_properties(&mut self, id: TypeId, properties: Vec<(Name, TypeId)>) {
        match &mut self.types[id.index()] {
            TypeData::Record(record) => record.properties = properties,
            TypeData::Generic(generic) => generic.properties = properties,
            other => unreachable!("set_properties on {other:?}"),
        }
    }

    /// Union of `members`, flattened and deduplicated. Structural identity:
    /// the same member set always yields the same id.
    pub fn union(&mut self, members: Vec<TypeId>) -> TypeId {
        let mut flat = Vec::with_capacity(members.len());
        for member in members {
            match self.data(member) {
                TypeData::Union { members } => flat.extend(members.iter().copied()),
                _ => flat.push(member),
            }
        }
        flat.sort_by_key(|id| id.0);
        flat.dedup();

        if flat.contains(&builtins::ERROR) {
            return builtins::ERROR;
        }
        if flat.contains(&builtins::ANY) {
            return builtins::ANY;
        }
        match flat.len() {
            0 => builtins::ANY,
            1 => flat[0],
            _ => {
                let existing = self.types.iter().position(
                    |data| matches!(data, TypeData::Union { members } if *members == flat),
                );
                match existing {
                    Some(index) => TypeId(index as u32),
                    None => self.add(TypeData::Union { members: flat }),
                }
            }
        }
    }

    /// Produces (or reuses) the instance of `generic` with the given type
    /// arguments. Structural identity: same generic, same arguments, same id.
    pub fn instantiate(&mut self, generic: TypeId, args: Vec<TypeId>) -> TypeId {
        let existing = self.types.iter().position(|data| {
            matches!(data, TypeData::Instance(i) if i.generic == generic && i.args == args)
        });
        if let Some(index) = existing {
            return TypeId(index as u32);
        }

        let TypeData::Generic(data) = self.data(generic).clone() else {
            unreachable!("instantiate on non-generic type")
        };
        let map: HashMap<TypeId, TypeId> = data
            .params
            .iter()
            .copied()
            .zip(args.iter().copied())
            .collect();
        let properties = data
            .properties
            .iter()
            .map(|&(name, ty)| (name, self.substitute(ty, &map)))
            .collect();
        self.add(TypeData::Instance(GenericInstance {
            generic,
            args,
            properties,
        }))
    }

    fn substitute(&mut self, ty: TypeId, map: &HashMap<TypeId, TypeId>) -> TypeId {
        if let Some(&mapped) = map.get(&ty) {
            return mapped;
        }
        match self.data(ty).clone() {
            TypeData::Function(function) => {
                let params = function
                    .params
                    .iter()
                    .map(|p| ParamType {
                        ty: self.substitute(p.ty, map),
                        ..p.clone()
                    })
                    .collect::<Vec<_>>();
                let return_ty = self.substitute(function.return_ty, map);
                if params == function.params && return_ty == function.return_ty {
                    ty
                } else {
                    self.function(FunctionType { params, return_ty })
                }
            }
            TypeData::Union { members } => {
                let substituted: Vec<_> =
                    members.iter().map(|&m| self.substitute(m, map)).collect();
                if substituted == members {
                    ty
                } else {
                    self.union(substituted)
                }
            }
            TypeData::Object { properties } => {
                let substituted: Vec<_> = properties
                    .iter()
                    .map(|&(name, t)| (name, self.substitute(t, map)))
                    .collect();
                if substituted == properties {
                    ty
                } else {
                    self.object(substituted)
                }
            }
            TypeData::Instance(instance) => {
                let args: Vec<_> = instance
                    .args
                    .iter()
                    .map(|&a| self.substitute(a, map))
                    .collect();
                if args == instance.args {
                    ty
                } else {
                    self.instantiate(instance.generic, args)
                }
            }
            _ => ty,
        }
    }

    /// Property table of `id`, if it is a property-bearing type.
    pub fn properties_of(&self, id: TypeId) -> Option<&[(Name, TypeId)]> {
        match self.data(id) {
            TypeData::Object { properties } => Some(properties),
            TypeData::Record(record) => Some(&record.properties),
            TypeData::Instance(instance) => Some(&instance.properties),
            TypeData::Generic(generic) => Some(&generic.properties),
            _ => None,
        }
    }

    /// The assignability relation: may a value of type `src` be stored where
    /// `dst` is expected?
    pub fn can_assign(&self, dst: TypeId, src: TypeId) -> bool {
        use builtins::*;
        if dst == src || dst == ANY || src == ANY || dst == ERROR || src == ERROR {
            return true;
        }
        // Pending inference accepts anything; it is about to be replaced.
        if dst == INFER || src == INFER {
            return true;
        }
        // The `object` primitive accepts any property-bearing value.
        if dst == OBJECT && self.properties_of(src).is_some() {
            return true;
        }

        match (self.data(dst), self.data(src)) {
            (TypeData::Union { members: d }, TypeData::Union { members: s }) => s
                .iter()
                .all(|&m| d.iter().any(|&t| self.can_assign(t, m))),
            (TypeData::Union { members }, _) => {
                members.iter().any(|&t| self.can_assign(t, src))
            }
            (_, TypeData::Union { members }) => {
                members.iter().all(|&m| self.can_assign(dst, m))
            }
            (TypeData::Function(d), TypeData::Function(s)) => {
                d.params.len() == s.params.len()
                    && d.params
                        .iter()
                        .zip(&s.params)
                        .all(|(a, b)| a.rest == b.rest && self.equivalent(a.ty, b.ty))
                    && self.can_assign(d.return_ty, s.return_ty)
            }
            (TypeData::Instance(d), TypeData::Instance(s)) => {
                d.generic == s.generic
                    && d.args.len() == s.args.len()
                    && d.args
                        .iter()
                        .zip(&s.args)
                        .all(|(&a, &b)| self.equivalent(a, b))
            }
            // A generic record instance accepts compatible object literals,
            // same as a plain record.
            (TypeData::Instance(d), TypeData::Object { properties }) => {
                self.covers(&d.properties, properties)
            }
            // Width subtyping: every declared property must be present with
            // an assignable type; extra properties are allowed.
            (TypeData::Object { properties }, _) => match self.properties_of(src) {
                Some(src_props) => self.covers(properties, src_props),
                None => false,
            },
            // Records are nominal, but accept structurally-compatible object
            // literals.
            (TypeData::Record(record), TypeData::Object { properties }) => {
                self.covers(&record.properties, properties)
            }
            _ => false,
        }
    }

    fn covers(
        &self,
        wanted: &[(Name, TypeId)],
        given: &[(Name, TypeId)],
    ) -> bool {
        wanted.iter().all(|&(name, ty)| {
            given
                .iter()
                .find(|&&(n, _)| n == name)
                .is_some_and(|&(_, src_ty)| self.can_assign(ty, src_ty))
        })
    }

    fn equivalent(&self, a: TypeId, b: TypeId) -> bool {
        a == b || (self.can_assign(a, b) && self.can_assign(b, a))
    }

    /// Renders `id` the way it is written in annotations: `num`, `Doggy`,
    /// `Array<num>`, `num | str`, `(a: num) -> bool`, `{x: num}`.
    pub fn display(&self, id: TypeId, interner: &Interner) -> String {
        match self.data(id) {
            TypeData::Primitive { tag }
            | TypeData::Param { tag }
            | TypeData::Record(RecordType { tag, .. })
            | TypeData::Generic(GenericType { tag, .. }) => interner.resolve(*tag).to_owned(),
            TypeData::Unresolved { tag, args } => {
                let tag = interner.resolve(*tag);
                if args.is_empty() {
                    tag.to_owned()
                } else {
                    format!("{tag}<{}>", self.display_list(args, interner))
                }
            }
            TypeData::Instance(instance) => {
                let tag = self.display(instance.generic, interner);
                format!("{tag}<{}>", self.display_list(&instance.args, interner))
            }
            TypeData::Union { members } => members
                .iter()
                .map(|&m| self.display(m, interner))
                .collect::<Vec<_>>()
                .join(" | "),
            TypeData::Object { properties } => {
                let fields: Vec<_> = properties
                    .iter()
                    .map(|&(name, ty)| {
                        format!("{}: {}", interner.resolve(name), self.display(ty, interner))
                    })
                    .collect();
                format!("{{{}}}", fields.join(", "))
            }
            TypeData::Function(function) => {
                let params: Vec<_> = function
                    .params
                    .iter()
                    .map(|p| {
                        format!("{}: {}", interner.resolve(p.name), self.display(p.ty, interner))
                    })
                    .collect();
                format!(
                    "({}) -> {}",
                    params.join(", "),
                    self.display(function.return_ty, interner)
                )
            }
        }
    }

    fn display_list(&self, ids: &[TypeId], interner: &Interner) -> String {
        ids.iter()
            .map(|&id| self.display(id, interner))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn numeric(id: TypeId) -> bool {
    id == builtins::NUM || id == builtins::ANY
}

/// Result type of a binary operator application, or `t_error` when the
/// operand types do not fit. `t_any` operands always yield the operator's
/// default result.
pub fn binary_result(op: BinaryOp, lhs: TypeId, rhs: TypeId) -> TypeId {
    use builtins::*;
    use BinaryOp::*;
    if lhs == ERROR || rhs == ERROR {
        return ERROR;
    }
    match op {
        Add => {
            if lhs == STR || rhs == STR {
                STR
            } else if numeric(lhs) && numeric(rhs) {
                NUM
            } else {
                ERROR
            }
        }
        Sub | Mul | Div | FloorDiv | Mod | Pow | BitAnd | BitOr | BitXor => {
            if numeric(lhs) && numeric(rhs) {
                NUM
            } else {
                ERROR
            }
        }
        Less | LessEq | Greater | GreaterEq => {
            if numeric(lhs) && numeric(rhs) {
                BOOL
            } else {
                ERROR
            }
        }
        EqEq | NotEq | Is | And | Or => BOOL,
    }
}

pub fn unary_result(op: UnaryOp, operand: TypeId) -> TypeId {
    use builtins::*;
    use UnaryOp::*;
    if operand == ERROR {
        return ERROR;
    }
    match op {
        Neg | Pos | Incr | Decr => {
            if numeric(operand) {
                NUM
            } else {
                ERROR
            }
        }
        Not => BOOL,
    }
}

/// Result type of a compound assignment. `+=` additionally accepts a string
/// left-hand side (appending); everything else is numeric.
pub fn compound_result(op: AssignOp, lhs: TypeId, rhs: TypeId) -> TypeId {
    use builtins::*;
    use AssignOp::*;
    if lhs == ERROR || rhs == ERROR {
        return ERROR;
    }
    if lhs == ANY {
        return ANY;
    }
    match op {
        Assign => unreachable!("plain assignment goes through can_assign"),
        Add if lhs == STR => STR,
        _ => {
            if numeric(lhs) && numeric(rhs) {
                NUM
            } else {
                ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn setup() -> (Interner, TypeRegistry) {
        let mut interner = Interner::with_capacity(32);
        let registry = TypeRegistry::new(&mut interner);
        (interner, registry)
    }

    #[test]
    fn primitives_assign_by_identity() {
        let (_, reg) = setup();
        assert!(reg.can_assign(builtins::NUM, builtins::NUM));
        assert!(!reg.can_assign(builtins::NUM, builtins::STR));
        assert!(!reg.can_assign(builtins::BOOL, builtins::NUM));
    }

    #[test]
    fn any_accepts_and_is_accepted() {
        let (_, reg) = setup();
        assert!(reg.can_assign(builtins::ANY, builtins::NUM));
        assert!(reg.can_assign(builtins::STR, builtins::ANY));
    }

    #[test]
    fn error_suppresses_cascades() {
        let (_, reg) = setup();
        assert!(reg.can_assign(builtins::NUM, builtins::ERROR));
        assert!(reg.can_assign(builtins::ERROR, builtins::NUM));
    }

    #[test]
    fn union_membership() {
        let (_, mut reg) = setup();
        let num_or_str = reg.union(vec![builtins::NUM, builtins::STR]);
        assert!(reg.can_assign(num_or_str, builtins::NUM));
        assert!(reg.can_assign(num_or_str, builtins::STR));
        assert!(!reg.can_assign(num_or_str, builtins::BOOL));
        // A union source fits a scalar only if every member does.
        assert!(!reg.can_assign(builtins::NUM, num_or_str));
    }

    #[test]
    fn unions_are_structural() {
        let (_, mut reg) = setup();
        let a = reg.union(vec![builtins::NUM, builtins::STR]);
        let b = reg.union(vec![builtins::STR, builtins::NUM]);
        assert_eq!(a, b);
        // Nested unions flatten.
        let c = reg.union(vec![a, builtins::NUM]);
        assert_eq!(a, c);
        // A single-member union is the member itself.
        assert_eq!(reg.union(vec![builtins::NUM]), builtins::NUM);
    }

    #[test]
    fn array_instances_are_structural() {
        let (_, mut reg) = setup();
        let a = reg.array_of(builtins::NUM);
        let b = reg.array_of(builtins::NUM);
        let c = reg.array_of(builtins::STR);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(reg.array_element(a), Some(builtins::NUM));
    }

    #[test]
    fn array_properties_substitute_the_formal() {
        let (mut i, mut reg) = setup();
        let nums = reg.array_of(builtins::NUM);
        let pop = reg
            .properties_of(nums)
            .unwrap()
            .iter()
            .find(|&&(name, _)| name == i.intern("pop"))
            .map(|&(_, ty)| ty)
            .unwrap();
        let TypeData::Function(f) = reg.data(pop) else {
            panic!("pop should be a function")
        };
        assert_eq!(f.return_ty, builtins::NUM);
    }

    #[test]
    fn object_width_subtyping() {
        let (mut i, mut reg) = setup();
        let x = i.intern("x");
        let y = i.intern("y");
        let want = reg.object(vec![(x, builtins::NUM)]);
        let give = reg.object(vec![(x, builtins::NUM), (y, builtins::STR)]);
        let wrong = reg.object(vec![(x, builtins::STR)]);
        assert!(reg.can_assign(want, give));
        assert!(!reg.can_assign(want, wrong));
        assert!(!reg.can_assign(give, want));
    }

    #[test]
    fn record_accepts_compatible_object_literal() {
        let (mut i, mut reg) = setup();
        let doggy = reg.record(i.intern("Doggy"));
        reg.set_properties(doggy, vec![(i.intern("age"), builtins::NUM)]);
        let literal = reg.object(vec![(i.intern("age"), builtins::NUM)]);
        let wrong = reg.object(vec![(i.intern("age"), builtins::STR)]);
        assert!(reg.can_assign(doggy, literal));
        assert!(!reg.can_assign(doggy, wrong));
        // Nominal in the other direction: a different record does not fit.
        let other = reg.record(i.intern("Catty"));
        reg.set_properties(other, vec![(i.intern("age"), builtins::NUM)]);
        assert!(!reg.can_assign(doggy, other));
    }

    #[test]
    fn generic_instance_accepts_object_literal() {
        let (mut i, mut reg) = setup();
        let t = reg.param(i.intern("T"));
        let value = i.intern("value");
        let boxed = reg.generic(GenericType {
            tag: i.intern("Box"),
            params: vec![t],
            properties: vec![(value, t)],
        });
        let box_of_num = reg.instantiate(boxed, vec![builtins::NUM]);
        let ok = reg.object(vec![(value, builtins::NUM)]);
        let wrong = reg.object(vec![(value, builtins::STR)]);
        assert!(reg.can_assign(box_of_num, ok));
        assert!(!reg.can_assign(box_of_num, wrong));
    }

    #[test]
    fn function_assignability_is_strict() {
        let (mut i, mut reg) = setup();
        let x = i.intern("x");
        let f = reg.function(FunctionType {
            params: vec![ParamType::required(x, builtins::NUM)],
            return_ty: builtins::STR,
        });
        let same = reg.function(FunctionType {
            params: vec![ParamType::required(x, builtins::NUM)],
            return_ty: builtins::STR,
        });
        let different_param = reg.function(FunctionType {
            params: vec![ParamType::required(x, builtins::STR)],
            return_ty: builtins::STR,
        });
        let different_arity = reg.function(FunctionType {
            params: vec![],
            return_ty: builtins::STR,
        });
        assert!(reg.can_assign(f, same));
        assert!(!reg.can_assign(f, different_param));
        assert!(!reg.can_assign(f, different_arity));
    }

    #[test]
    fn display_forms() {
        let (mut i, mut reg) = setup();
        assert_eq!(reg.display(builtins::NUM, &i), "num");
        let nums = reg.array_of(builtins::NUM);
        assert_eq!(reg.display(nums, &i), "Array<num>");
        let union = reg.union(vec![builtins::NUM, builtins::STR]);
        assert_eq!(reg.display(union, &i), "str | num");
        let x = i.intern("x");
        let obj = reg.object(vec![(x, builtins::NUM)]);
        assert_eq!(reg.display(obj, &i), "{x: num}");
        let f = reg.function(FunctionType {
            params: vec![ParamType::required(x, builtins::NUM)],
            return_ty: builtins::BOOL,
        });
        assert_eq!(reg.display(f, &i), "(x: num) -> bool");
    }

    #[test]
    fn binary_operator_table() {
        use BinaryOp::*;
        assert_eq!(binary_result(Add, builtins::NUM, builtins::NUM), builtins::NUM);
        assert_eq!(binary_result(Add, builtins::STR, builtins::NUM), builtins::STR);
        assert_eq!(binary_result(Add, builtins::NUM, builtins::STR), builtins::STR);
        assert_eq!(binary_result(Add, builtins::BOOL, builtins::NUM), builtins::ERROR);
        assert_eq!(binary_result(Sub, builtins::NUM, builtins::NUM), builtins::NUM);
        assert_eq!(binary_result(Sub, builtins::STR, builtins::NUM), builtins::ERROR);
        assert_eq!(binary_result(Less, builtins::NUM, builtins::NUM), builtins::BOOL);
        assert_eq!(binary_result(Less, builtins::STR, builtins::NUM), builtins::ERROR);
        assert_eq!(binary_result(EqEq, builtins::STR, builtins::NUM), builtins::BOOL);
        assert_eq!(binary_result(And, builtins::BOOL, builtins::NUM), builtins::BOOL);
        // `any` takes the default result without error.
        assert_eq!(binary_result(Mul, builtins::ANY, builtins::NUM), builtins::NUM);
        // `error` propagates silently.
        assert_eq!(binary_result(EqEq, builtins::ERROR, builtins::NUM), builtins::ERROR);
    }

    #[test]
    fn unary_operator_table() {
        use UnaryOp::*;
        assert_eq!(unary_result(Neg, builtins::NUM), builtins::NUM);
        assert_eq!(unary_result(Neg, builtins::STR), builtins::ERROR);
        assert_eq!(unary_result(Not, builtins::STR), builtins::BOOL);
        assert_eq!(unary_result(Incr, builtins::NUM), builtins::NUM);
    }

    #[test]
    fn compound_operator_table() {
        use AssignOp::*;
        assert_eq!(compound_result(Add, builtins::NUM, builtins::NUM), builtins::NUM);
        assert_eq!(compound_result(Add, builtins::STR, builtins::NUM), builtins::STR);
        assert_eq!(compound_result(Sub, builtins::STR, builtins::NUM), builtins::ERROR);
        assert_eq!(compound_result(Sub, builtins::ANY, builtins::NUM), builtins::ANY);
    }
}
