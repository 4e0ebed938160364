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

use std::sync::{atomic::AtomicBool, Arc, RwLock};

use ahash::AHashSet;
use compact_str::{format_compact, CompactString};
use log::debug;

use crate::runtime::{
    coercion::{coerce, default_value},
    invoke::{ConstructorBody, MethodBody},
    ty::{Members, TypeRegistry},
    Constructor,
    Field,
    Ident,
    Invocation,
    Method,
    RuntimeError,
    RuntimeResult,
    TypeKind,
    TypeMeta,
    Value,
    Visibility,
    REGISTRY_LOG,
};

/// A declaration of a new class or interface.
///
/// Created by the [TypeMeta::class] and [TypeMeta::interface] functions.
/// The [build](TypeBuilder::build) function validates the declaration and
/// registers the type.
///
/// ```
/// use ad_astra_reflect::runtime::{FieldDecl, MethodDecl, TypeMeta, Value};
///
/// let named = TypeMeta::interface("docs.builder.Named")
///     .method(MethodDecl::abstract_method("name", [], TypeMeta::string()))
///     .build()
///     .unwrap();
///
/// let user = TypeMeta::class("docs.builder.User")
///     .implements(named)
///     .field(FieldDecl::new("login", TypeMeta::string()).initial("guest"))
///     .method(MethodDecl::new("name", [], TypeMeta::string(), |invocation| {
///         invocation.this()?.read("login")
///     }))
///     .build()
///     .unwrap();
///
/// assert!(named.is_assignable_from(user));
/// assert_eq!(TypeMeta::by_name("docs.builder.User").unwrap(), user);
/// ```
pub struct TypeBuilder {
    name: CompactString,
    kind: TypeKind,
    supertype: Option<&'static TypeMeta>,
    interfaces: Vec<&'static TypeMeta>,
    sealed: bool,
    is_abstract: bool,
    fields: Vec<FieldDecl>,
    methods: Vec<MethodDecl>,
    constructors: Vec<ConstructorDecl>,
}

impl TypeBuilder {
    pub(super) fn new(name: CompactString, kind: TypeKind) -> Self {
        let supertype = match kind {
            TypeKind::Class => Some(TypeMeta::root()),
            _ => None,
        };

        Self {
            name,
            kind,
            supertype,
            interfaces: Vec::new(),
            sealed: false,
            is_abstract: false,
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// Sets the superclass of a class.
    ///
    /// For interfaces, adds an extended interface instead.
    pub fn extends(mut self, supertype: &'static TypeMeta) -> Self {
        match self.kind {
            TypeKind::Interface => self.interfaces.push(supertype),
            _ => self.supertype = Some(supertype),
        }

        self
    }

    /// Adds an implemented interface.
    pub fn implements(mut self, interface: &'static TypeMeta) -> Self {
        self.interfaces.push(interface);

        self
    }

    /// Refuses access override for the non-public members of the type.
    pub fn sealed(mut self) -> Self {
        self.sealed = true;

        self
    }

    /// Forbids instantiation of the class.
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;

        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);

        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);

        self
    }

    pub fn constructor(mut self, constructor: ConstructorDecl) -> Self {
        self.constructors.push(constructor);

        self
    }

    /// Validates the declaration and registers the new type.
    ///
    /// Fails with [RuntimeError::DuplicateType] if the name is taken, with
    /// [RuntimeError::DuplicateMember] if two members share an identity, with
    /// [RuntimeError::TypeMismatch] if a field's initial value does not fit its
    /// type, and with [RuntimeError::InvalidHierarchy] if the declaration
    /// breaks any other rule of the object model.
    pub fn build(mut self) -> RuntimeResult<&'static TypeMeta> {
        self.validate()?;

        let initials = self
            .fields
            .iter_mut()
            .map(|field| match field.initial.take() {
                Some(initial) => coerce(initial, field.ty),
                None => Ok(default_value(field.ty)),
            })
            .collect::<RuntimeResult<Vec<_>>>()?;

        let mut fields = self.fields.into_iter().zip(initials).collect::<Vec<_>>();
        let mut methods = self.methods;

        fields.sort_by_key(|(field, _)| !field.is_static);
        methods.sort_by_key(|method| !method.is_static);

        let mut constructors = self.constructors;

        if self.kind == TypeKind::Class && constructors.is_empty() {
            constructors.push(ConstructorDecl {
                params: Vec::new(),
                visibility: Visibility::Public,
                body: None,
            });
        }

        let mut index = TypeRegistry::get().write_index();

        if index.contains_key(&self.name) {
            return Err(RuntimeError::DuplicateType { name: self.name });
        }

        let meta = TypeMeta::leak_declared(
            self.name.clone(),
            self.kind,
            self.supertype,
            self.interfaces,
            self.sealed,
            self.is_abstract,
        );

        let fields = fields
            .into_iter()
            .enumerate()
            .map(|(slot, (field, initial))| Field {
                name: field.name,
                ty: field.ty,
                is_static: field.is_static,
                visibility: field.visibility,
                owner: meta,
                index: slot,
                static_value: RwLock::new(match field.is_static {
                    true => initial.clone(),
                    false => Value::Null,
                }),
                initial,
                accessible: AtomicBool::new(false),
            })
            .collect::<Vec<_>>();

        let methods = methods
            .into_iter()
            .map(|method| Method {
                name: method.name,
                params: method.params,
                ret: method.ret,
                is_static: method.is_static,
                visibility: method.visibility,
                owner: meta,
                body: method.body,
                accessible: AtomicBool::new(false),
            })
            .collect::<Vec<_>>();

        let constructors = constructors
            .into_iter()
            .map(|constructor| Constructor {
                params: constructor.params,
                owner: meta,
                visibility: constructor.visibility,
                body: constructor.body,
                accessible: AtomicBool::new(false),
            })
            .collect::<Vec<_>>();

        let installed = meta.install_members(Members {
            fields,
            methods,
            constructors,
        });

        if !installed {
            return Err(RuntimeError::DuplicateType { name: self.name });
        }

        let _ = index.insert(self.name, meta);

        debug!(
            target: REGISTRY_LOG,
            "Type {meta} registered with {} field(s), {} method(s) and {} constructor(s).",
            meta.declared_fields().len(),
            meta.declared_methods().len(),
            meta.declared_constructors().len(),
        );

        Ok(meta)
    }

    fn validate(&self) -> RuntimeResult<()> {
        let name = self.name.as_str();

        if name.is_empty()
            || name.ends_with("[]")
            || name.split('.').any(|segment| segment.is_empty())
            || name.contains(char::is_whitespace)
        {
            return Err(self.invalid("malformed type name"));
        }

        if let Some(supertype) = self.supertype {
            if !supertype.is_extensible() {
                return Err(self.invalid("the supertype is not an extensible class"));
            }
        }

        if self
            .interfaces
            .iter()
            .any(|interface| !interface.is_interface())
        {
            return Err(self.invalid("implemented type is not an interface"));
        }

        if self.kind == TypeKind::Interface {
            if !self.constructors.is_empty() {
                return Err(self.invalid("interfaces cannot declare constructors"));
            }

            if self.fields.iter().any(|field| !field.is_static) {
                return Err(self.invalid("interfaces cannot declare instance fields"));
            }
        }

        let mut field_names = AHashSet::new();

        for field in &self.fields {
            if field.ty.is_void() {
                return Err(self.invalid("fields cannot be of the void type"));
            }

            if !field_names.insert(field.name.as_str()) {
                return Err(self.duplicate(format_compact!("field {}", field.name)));
            }
        }

        let mut method_signatures = AHashSet::new();

        for method in &self.methods {
            if method.params.iter().any(|param| param.is_void()) {
                return Err(self.invalid("parameters cannot be of the void type"));
            }

            if method.body.is_none() {
                if method.is_static {
                    return Err(self.invalid("static methods must have a body"));
                }

                if self.kind == TypeKind::Class && !self.is_abstract {
                    return Err(self.invalid("abstract method in a non-abstract class"));
                }
            }

            if !method_signatures.insert((method.name.as_str(), method.params.as_slice())) {
                return Err(self.duplicate(format_compact!("method {}", method.name)));
            }
        }

        let mut constructor_signatures = AHashSet::new();

        for constructor in &self.constructors {
            if constructor.params.iter().any(|param| param.is_void()) {
                return Err(self.invalid("parameters cannot be of the void type"));
            }

            if !constructor_signatures.insert(constructor.params.as_slice()) {
                return Err(self.duplicate(CompactString::from("constructor")));
            }
        }

        Ok(())
    }

    #[inline(always)]
    fn invalid(&self, reason: &'static str) -> RuntimeError {
        RuntimeError::InvalidHierarchy {
            ty: self.name.clone(),
            reason,
        }
    }

    #[inline(always)]
    fn duplicate(&self, member: CompactString) -> RuntimeError {
        RuntimeError::DuplicateMember {
            owner: self.name.clone(),
            member,
        }
    }
}

/// A declaration of a field.
pub struct FieldDecl {
    name: Ident,
    ty: &'static TypeMeta,
    is_static: bool,
    visibility: Visibility,
    initial: Option<Value>,
}

impl FieldDecl {
    /// Declares a public instance field with the type's default initial
    /// value.
    pub fn new(name: impl Into<CompactString>, ty: &'static TypeMeta) -> Self {
        Self {
            name: Ident::from(name.into()),
            ty,
            is_static: false,
            visibility: Visibility::Public,
            initial: None,
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;

        self
    }

    pub fn static_field(mut self) -> Self {
        self.is_static = true;

        self
    }

    /// Sets the value the field holds before any constructor runs.
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());

        self
    }
}

/// A declaration of a method.
pub struct MethodDecl {
    name: Ident,
    params: Vec<&'static TypeMeta>,
    ret: &'static TypeMeta,
    is_static: bool,
    visibility: Visibility,
    body: Option<MethodBody>,
}

impl MethodDecl {
    /// Declares a public instance method with a body.
    ///
    /// Use [TypeMeta::void] as the return type of methods that return
    /// nothing. Whatever the body of such a method returns is discarded.
    pub fn new(
        name: impl Into<CompactString>,
        params: impl IntoIterator<Item = &'static TypeMeta>,
        ret: &'static TypeMeta,
        body: impl Fn(Invocation<'_>) -> RuntimeResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            body: Some(Arc::new(body)),
            ..Self::abstract_method(name, params, ret)
        }
    }

    /// Declares a public instance method without a body.
    pub fn abstract_method(
        name: impl Into<CompactString>,
        params: impl IntoIterator<Item = &'static TypeMeta>,
        ret: &'static TypeMeta,
    ) -> Self {
        Self {
            name: Ident::from(name.into()),
            params: params.into_iter().collect(),
            ret,
            is_static: false,
            visibility: Visibility::Public,
            body: None,
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;

        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;

        self
    }
}

/// A declaration of a constructor.
pub struct ConstructorDecl {
    params: Vec<&'static TypeMeta>,
    visibility: Visibility,
    body: Option<ConstructorBody>,
}

impl ConstructorDecl {
    /// Declares a public constructor.
    ///
    /// The body receives the new object as the
    /// [receiver](Invocation::this) of the invocation.
    pub fn new(
        params: impl IntoIterator<Item = &'static TypeMeta>,
        body: impl Fn(Invocation<'_>) -> RuntimeResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            params: params.into_iter().collect(),
            visibility: Visibility::Public,
            body: Some(Arc::new(body)),
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;

        self
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{
        ConstructorDecl,
        FieldDecl,
        MethodDecl,
        RuntimeError,
        TypeMeta,
        Value,
        Visibility,
    };

    #[test]
    fn test_member_ordering() {
        let ty = TypeMeta::class("tests.builder.Ordered")
            .field(FieldDecl::new("a", TypeMeta::int()))
            .field(FieldDecl::new("B", TypeMeta::int()).static_field())
            .field(FieldDecl::new("c", TypeMeta::int()))
            .field(FieldDecl::new("D", TypeMeta::int()).static_field())
            .method(MethodDecl::new("run", [], TypeMeta::void(), |_| Ok(Value::Null)))
            .method(
                MethodDecl::new("create", [], TypeMeta::void(), |_| Ok(Value::Null))
                    .static_method(),
            )
            .build()
            .unwrap();

        let fields = ty
            .declared_fields()
            .iter()
            .map(|field| field.name())
            .collect::<Vec<_>>();

        assert_eq!(fields, ["B", "D", "a", "c"]);
        assert_eq!(ty.declared_methods()[0].name(), "create");
        assert_eq!(ty.declared_constructors().len(), 1);
        assert!(ty.declared_constructors()[0].params().is_empty());
    }

    #[test]
    fn test_declaration_errors() {
        let _ = TypeMeta::class("tests.builder.Taken").build().unwrap();

        assert!(matches!(
            TypeMeta::class("tests.builder.Taken").build(),
            Err(RuntimeError::DuplicateType { .. }),
        ));

        assert!(matches!(
            TypeMeta::class("tests.builder.TwoFields")
                .field(FieldDecl::new("x", TypeMeta::int()))
                .field(FieldDecl::new("x", TypeMeta::long()).visibility(Visibility::Private))
                .build(),
            Err(RuntimeError::DuplicateMember { .. }),
        ));

        assert!(matches!(
            TypeMeta::class("tests.builder.TwoConstructors")
                .constructor(ConstructorDecl::new([TypeMeta::int()], |_| Ok(())))
                .constructor(ConstructorDecl::new([TypeMeta::int()], |_| Ok(())))
                .build(),
            Err(RuntimeError::DuplicateMember { .. }),
        ));

        assert!(matches!(
            TypeMeta::class("tests.builder.Overloads")
                .method(MethodDecl::new("f", [TypeMeta::int()], TypeMeta::void(), |_| Ok(Value::Null)))
                .method(MethodDecl::new("f", [TypeMeta::long()], TypeMeta::void(), |_| Ok(Value::Null)))
                .build(),
            Ok(_),
        ));

        assert!(matches!(
            TypeMeta::class("tests.builder.FromString")
                .extends(TypeMeta::string())
                .build(),
            Err(RuntimeError::InvalidHierarchy { .. }),
        ));

        assert!(matches!(
            TypeMeta::class("tests.builder.Concrete")
                .method(MethodDecl::abstract_method("f", [], TypeMeta::void()))
                .build(),
            Err(RuntimeError::InvalidHierarchy { .. }),
        ));

        assert!(matches!(
            TypeMeta::interface("tests.builder.Stateful")
                .field(FieldDecl::new("state", TypeMeta::int()))
                .build(),
            Err(RuntimeError::InvalidHierarchy { .. }),
        ));

        assert!(matches!(
            TypeMeta::class("tests.builder.BadInitial")
                .field(FieldDecl::new("flag", TypeMeta::boolean()).initial(1))
                .build(),
            Err(RuntimeError::TypeMismatch { .. }),
        ));

        assert!(matches!(
            TypeMeta::class("tests..Malformed").build(),
            Err(RuntimeError::InvalidHierarchy { .. }),
        ));

        assert!(TypeMeta::by_name("tests.builder.TwoFields").is_err());
    }
}
