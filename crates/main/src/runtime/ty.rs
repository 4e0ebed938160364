////////////////////////////////////////////////////////////////////////////////
// This file is part of "Ad Astra", an embeddable scripting programming       //
// language platform.                                                         //
//                                                                            //
// This work is proprietary software with source-available code.              //
//                                                                            //
// To copy, use, distribute, or contribute to this work, you must agree to    //
// the terms of the General License Agreement:                                //
//                                                                            //
// https://github.com/Eliah-Lakhin/ad-astra/blob/master/EULA.md               //
//                                                                            //
// The agreement grants a Basic Commercial License, allowing you to use       //
// this work in non-commercial and limited commercial products with a total   //
// gross revenue cap. To remove this commercial limit for one of your         //
// products, you must acquire a Full Commercial License.                      //
//                                                                            //
// If you contribute to the source code, documentation, or related materials, //
// you must grant me an exclusive license to these contributions.             //
// Contributions are governed by the "Contributions" section of the General   //
// License Agreement.                                                         //
//                                                                            //
// Copying the work in parts is strictly forbidden, except as permitted       //
// under the General License Agreement.                                       //
//                                                                            //
// If you do not or cannot agree to the terms of this Agreement,              //
// do not use this work.                                                      //
//                                                                            //
// This work is provided "as is", without any warranties, express or implied, //
// except where such disclaimers are legally invalid.                         //
//                                                                            //
// Copyright (c) 2024 Ilya Lakhin (Илья Александрович Лахин).                 //
// All rights reserved.                                                       //
////////////////////////////////////////////////////////////////////////////////

use std::{
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    iter::FusedIterator,
    ops::Deref,
    sync::{
        atomic::{AtomicUsize, Ordering},
        OnceLock,
        RwLock,
        RwLockReadGuard,
        RwLockWriteGuard,
    },
};

use ahash::{AHashMap, AHashSet};
use compact_str::{format_compact, CompactString};
use lady_deirdre::sync::Lazy;

use crate::runtime::{
    Constructor,
    Field,
    Ident,
    Method,
    Primitive,
    RuntimeError,
    RuntimeResult,
    TypeBuilder,
};

/// The kind of a [TypeMeta].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// The `void` type. Only used as a method return type.
    Void,

    /// One of the eight primitive types (`int`, `boolean`, ...).
    Primitive(Primitive),

    /// A boxed primitive type (`core.Integer`, `core.Boolean`, ...).
    Wrapper(Primitive),

    /// The textual `core.String` type.
    String,

    /// The universal root type `core.Object`.
    ///
    /// Every non-primitive type is assignable to it, and hierarchy walks stop
    /// before reaching it.
    Root,

    /// An array of the component type.
    Array(&'static TypeMeta),

    /// A user-declared class.
    Class,

    /// A user-declared interface.
    Interface,
}

/// A runtime descriptor of a type.
///
/// Descriptors are created once and never freed. You can obtain a `'static`
/// reference to a built-in descriptor using the associated functions
/// ([TypeMeta::int], [TypeMeta::string], [TypeMeta::root], etc.), to an array
/// descriptor using [TypeMeta::array_of], and to any registered descriptor
/// using [TypeMeta::by_name]. User types are declared with
/// [TypeMeta::class] and [TypeMeta::interface].
///
/// Two descriptors are equal if and only if they describe the same type.
///
/// The [Display] implementation prints the canonical name of the type
/// (e.g., `"int"`, `"core.String"`, or `"geo.Point[]"`).
pub struct TypeMeta {
    id: usize,
    name: Ident,
    simple_name: CompactString,
    kind: TypeKind,
    supertype: Option<&'static TypeMeta>,
    interfaces: Vec<&'static TypeMeta>,
    sealed: bool,
    is_abstract: bool,
    members: OnceLock<Members>,
}

impl PartialEq for TypeMeta {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id.eq(&other.id)
    }
}

impl Eq for TypeMeta {}

impl Hash for TypeMeta {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl Display for TypeMeta {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.name, formatter)
    }
}

impl Debug for TypeMeta {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TypeMeta")
            .field("name", &self.name.as_str())
            .field("kind", &DebugKind(&self.kind))
            .finish_non_exhaustive()
    }
}

impl TypeMeta {
    /// Starts a declaration of a new class with the specified canonical name.
    ///
    /// The class extends `core.Object` unless
    /// [TypeBuilder::extends] says otherwise.
    #[inline(always)]
    pub fn class(name: impl Into<CompactString>) -> TypeBuilder {
        TypeBuilder::new(name.into(), TypeKind::Class)
    }

    /// Starts a declaration of a new interface with the specified canonical
    /// name.
    #[inline(always)]
    pub fn interface(name: impl Into<CompactString>) -> TypeBuilder {
        TypeBuilder::new(name.into(), TypeKind::Interface)
    }

    /// Looks up a registered type by its canonical name.
    ///
    /// Names ending with `[]` denote array types of the preceding component
    /// type. Nested types use `Outer.Inner` canonical names.
    ///
    /// Returns [RuntimeError::UnknownType] if there is no such type.
    pub fn by_name(name: &str) -> RuntimeResult<&'static Self> {
        if let Some(component) = name.strip_suffix("[]") {
            return Ok(Self::array_of(Self::by_name(component)?));
        }

        match TypeRegistry::get().read_index().get(name) {
            Some(ty) => Ok(*ty),

            None => Err(RuntimeError::UnknownType {
                name: CompactString::from(name),
            }),
        }
    }

    /// Returns the array type with the specified component type.
    ///
    /// Array descriptors are interned: repeated calls with the same component
    /// return the same descriptor.
    pub fn array_of(component: &'static TypeMeta) -> &'static Self {
        let registry = TypeRegistry::get();

        if let Some(array) = registry.read_arrays().get(&component.id) {
            return *array;
        }

        *registry
            .write_arrays()
            .entry(component.id)
            .or_insert_with(|| {
                Self::leak(
                    format_compact!("{}[]", component.name),
                    TypeKind::Array(component),
                    Some(Self::root()),
                    Vec::new(),
                )
            })
    }

    /// The `void` type.
    #[inline(always)]
    pub fn void() -> &'static Self {
        Builtins::get().void
    }

    /// The universal root type `core.Object`.
    #[inline(always)]
    pub fn root() -> &'static Self {
        Builtins::get().root
    }

    /// The `core.String` type.
    #[inline(always)]
    pub fn string() -> &'static Self {
        Builtins::get().string
    }

    /// The unboxed type of the primitive.
    #[inline(always)]
    pub fn primitive(primitive: Primitive) -> &'static Self {
        Builtins::get().primitives[primitive as usize]
    }

    /// The boxed wrapper type of the primitive.
    #[inline(always)]
    pub fn wrapper(primitive: Primitive) -> &'static Self {
        Builtins::get().wrappers[primitive as usize]
    }

    /// The `boolean` type.
    #[inline(always)]
    pub fn boolean() -> &'static Self {
        Self::primitive(Primitive::Boolean)
    }

    /// The `byte` type.
    #[inline(always)]
    pub fn byte() -> &'static Self {
        Self::primitive(Primitive::Byte)
    }

    /// The `short` type.
    #[inline(always)]
    pub fn short() -> &'static Self {
        Self::primitive(Primitive::Short)
    }

    /// The `char` type.
    #[inline(always)]
    pub fn char() -> &'static Self {
        Self::primitive(Primitive::Char)
    }

    /// The `int` type.
    #[inline(always)]
    pub fn int() -> &'static Self {
        Self::primitive(Primitive::Int)
    }

    /// The `long` type.
    #[inline(always)]
    pub fn long() -> &'static Self {
        Self::primitive(Primitive::Long)
    }

    /// The `float` type.
    #[inline(always)]
    pub fn float() -> &'static Self {
        Self::primitive(Primitive::Float)
    }

    /// The `double` type.
    #[inline(always)]
    pub fn double() -> &'static Self {
        Self::primitive(Primitive::Double)
    }

    /// A process-unique number of this type.
    #[inline(always)]
    pub fn id(&self) -> usize {
        self.id
    }

    /// The fully qualified name of the type (e.g., `"geo.shapes.Point"`).
    #[inline(always)]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The name of the type without its namespace (e.g., `"Point"`).
    #[inline(always)]
    pub fn simple_name(&self) -> &str {
        self.simple_name.as_str()
    }

    #[inline(always)]
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// The direct supertype of this type.
    ///
    /// Classes, arrays, wrappers and `core.String` have a supertype (at least
    /// `core.Object`). Interfaces, primitives, `void` and `core.Object` itself
    /// have none.
    #[inline(always)]
    pub fn supertype(&self) -> Option<&'static TypeMeta> {
        self.supertype
    }

    /// Interfaces directly implemented (or, for interfaces, extended) by this
    /// type, in declaration order.
    #[inline(always)]
    pub fn interfaces(&self) -> &[&'static TypeMeta] {
        &self.interfaces
    }

    /// Returns true if access override is refused for the non-public members
    /// of this type.
    #[inline(always)]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Returns true if this type cannot be instantiated.
    ///
    /// Interfaces are always abstract.
    #[inline(always)]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract || self.is_interface()
    }

    #[inline(always)]
    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    #[inline(always)]
    pub fn is_root(&self) -> bool {
        matches!(self.kind, TypeKind::Root)
    }

    #[inline(always)]
    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }

    #[inline(always)]
    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(_))
    }

    /// Returns true if the type can be extended by a user-declared class.
    #[inline(always)]
    pub fn is_extensible(&self) -> bool {
        matches!(self.kind, TypeKind::Class | TypeKind::Root)
    }

    /// The component type of an array type.
    #[inline(always)]
    pub fn component(&self) -> Option<&'static TypeMeta> {
        match &self.kind {
            TypeKind::Array(component) => Some(*component),
            _ => None,
        }
    }

    /// Fields declared by this type itself, statics first.
    #[inline(always)]
    pub fn declared_fields(&self) -> &[Field] {
        match self.members.get() {
            Some(members) => &members.fields,
            None => &[],
        }
    }

    /// Methods declared by this type itself, statics first.
    #[inline(always)]
    pub fn declared_methods(&self) -> &[Method] {
        match self.members.get() {
            Some(members) => &members.methods,
            None => &[],
        }
    }

    /// Constructors declared by this type itself.
    #[inline(always)]
    pub fn declared_constructors(&self) -> &[Constructor] {
        match self.members.get() {
            Some(members) => &members.constructors,
            None => &[],
        }
    }

    /// Returns an iterator over this type and its supertypes, from the most
    /// derived to the least derived, excluding `core.Object`.
    #[inline(always)]
    pub fn lineage(&'static self) -> Lineage {
        Lineage { next: Some(self) }
    }

    /// Returns true if a value of the `other` type may be used wherever this
    /// type is expected.
    ///
    /// ```
    /// use ad_astra_reflect::runtime::TypeMeta;
    ///
    /// let strings = TypeMeta::array_of(TypeMeta::string());
    /// let objects = TypeMeta::array_of(TypeMeta::root());
    ///
    /// assert!(TypeMeta::root().is_assignable_from(TypeMeta::string()));
    /// assert!(objects.is_assignable_from(strings));
    /// assert!(!strings.is_assignable_from(objects));
    /// assert!(!TypeMeta::root().is_assignable_from(TypeMeta::int()));
    /// ```
    pub fn is_assignable_from(&self, other: &TypeMeta) -> bool {
        if self == other {
            return true;
        }

        match &self.kind {
            TypeKind::Root => !other.is_primitive() && !other.is_void(),

            TypeKind::Array(component) => {
                let Some(other_component) = other.component() else {
                    return false;
                };

                if component.is_primitive() || other_component.is_primitive() {
                    return *component == other_component;
                }

                component.is_assignable_from(other_component)
            }

            TypeKind::Class | TypeKind::Interface => other.inherits(self),

            _ => false,
        }
    }

    /// Walks the supertypes and interfaces of this type looking for the
    /// `ancestor`.
    fn inherits(&self, ancestor: &TypeMeta) -> bool {
        let mut visited = AHashSet::new();
        let mut stack = Vec::with_capacity(self.interfaces.len() + 1);

        if let Some(supertype) = self.supertype {
            stack.push(supertype);
        }

        stack.extend(self.interfaces.iter().copied());

        while let Some(next) = stack.pop() {
            if next == ancestor {
                return true;
            }

            if !visited.insert(next.id) {
                continue;
            }

            if let Some(supertype) = next.supertype {
                stack.push(supertype);
            }

            stack.extend(next.interfaces.iter().copied());
        }

        false
    }

    pub(super) fn leak(
        name: CompactString,
        kind: TypeKind,
        supertype: Option<&'static TypeMeta>,
        interfaces: Vec<&'static TypeMeta>,
    ) -> &'static Self {
        Self::leak_declared(name, kind, supertype, interfaces, false, false)
    }

    pub(super) fn leak_declared(
        name: CompactString,
        kind: TypeKind,
        supertype: Option<&'static TypeMeta>,
        interfaces: Vec<&'static TypeMeta>,
        sealed: bool,
        is_abstract: bool,
    ) -> &'static Self {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

        let name = Ident::from(name);
        let simple_name = CompactString::from(name.last_segment());

        Box::leak(Box::new(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name,
            simple_name,
            kind,
            supertype,
            interfaces,
            sealed,
            is_abstract,
            members: OnceLock::new(),
        }))
    }

    // Returns false if the members were already installed.
    pub(super) fn install_members(&self, members: Members) -> bool {
        self.members.set(members).is_ok()
    }
}

/// An iterator over a type and its supertypes.
///
/// Created by the [TypeMeta::lineage] function. The iterator yields the
/// starting type first and stops before the universal root type.
pub struct Lineage {
    next: Option<&'static TypeMeta>,
}

impl Iterator for Lineage {
    type Item = &'static TypeMeta;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;

        if current.is_root() {
            return None;
        }

        self.next = current.supertype;

        Some(current)
    }
}

impl FusedIterator for Lineage {}

#[derive(Default)]
pub(super) struct Members {
    pub(super) fields: Vec<Field>,
    pub(super) methods: Vec<Method>,
    pub(super) constructors: Vec<Constructor>,
}

pub(super) struct TypeRegistry {
    index: RwLock<AHashMap<CompactString, &'static TypeMeta>>,
    arrays: RwLock<AHashMap<usize, &'static TypeMeta>>,
}

impl TypeRegistry {
    #[inline(always)]
    pub(super) fn get() -> &'static Self {
        static REGISTRY: Lazy<TypeRegistry> = Lazy::new(|| {
            let builtins = Builtins::get();

            let mut index = AHashMap::new();

            let all = [builtins.void, builtins.root, builtins.string]
                .into_iter()
                .chain(builtins.primitives)
                .chain(builtins.wrappers);

            for ty in all {
                let _ = index.insert(CompactString::from(ty.name()), ty);
            }

            TypeRegistry {
                index: RwLock::new(index),
                arrays: RwLock::new(AHashMap::new()),
            }
        });

        REGISTRY.deref()
    }

    #[inline(always)]
    pub(super) fn read_index(
        &self,
    ) -> RwLockReadGuard<'_, AHashMap<CompactString, &'static TypeMeta>> {
        self.index.read().unwrap_or_else(|poison| poison.into_inner())
    }

    #[inline(always)]
    pub(super) fn write_index(
        &self,
    ) -> RwLockWriteGuard<'_, AHashMap<CompactString, &'static TypeMeta>> {
        self.index.write().unwrap_or_else(|poison| poison.into_inner())
    }

    #[inline(always)]
    fn read_arrays(&self) -> RwLockReadGuard<'_, AHashMap<usize, &'static TypeMeta>> {
        self.arrays.read().unwrap_or_else(|poison| poison.into_inner())
    }

    #[inline(always)]
    fn write_arrays(&self) -> RwLockWriteGuard<'_, AHashMap<usize, &'static TypeMeta>> {
        self.arrays.write().unwrap_or_else(|poison| poison.into_inner())
    }
}

struct Builtins {
    void: &'static TypeMeta,
    root: &'static TypeMeta,
    string: &'static TypeMeta,
    primitives: [&'static TypeMeta; 8],
    wrappers: [&'static TypeMeta; 8],
}

impl Builtins {
    #[inline(always)]
    fn get() -> &'static Self {
        static BUILTINS: Lazy<Builtins> = Lazy::new(|| {
            let void = TypeMeta::leak(CompactString::from("void"), TypeKind::Void, None, Vec::new());

            let root = TypeMeta::leak(
                CompactString::from("core.Object"),
                TypeKind::Root,
                None,
                Vec::new(),
            );

            let string = TypeMeta::leak(
                CompactString::from("core.String"),
                TypeKind::String,
                Some(root),
                Vec::new(),
            );

            let primitives = Primitive::ALL.map(|primitive| {
                TypeMeta::leak(
                    CompactString::from(primitive.name()),
                    TypeKind::Primitive(primitive),
                    None,
                    Vec::new(),
                )
            });

            let wrappers = Primitive::ALL.map(|primitive| {
                TypeMeta::leak(
                    CompactString::from(primitive.wrapper_name()),
                    TypeKind::Wrapper(primitive),
                    Some(root),
                    Vec::new(),
                )
            });

            Builtins {
                void,
                root,
                string,
                primitives,
                wrappers,
            }
        });

        BUILTINS.deref()
    }
}

struct DebugKind<'a>(&'a TypeKind);

impl<'a> Debug for DebugKind<'a> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            TypeKind::Array(component) => {
                formatter.write_fmt(format_args!("Array({})", component.name()))
            }

            other => Debug::fmt(other, formatter),
        }
    }
}
