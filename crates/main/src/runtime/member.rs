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
    sync::{atomic::AtomicBool, RwLock},
};

use ahash::AHashSet;

use crate::runtime::{
    coercion::coerce,
    invoke::{ConstructorBody, MethodBody},
    Accessible,
    Ident,
    Instance,
    Invocation,
    RuntimeError,
    RuntimeResult,
    Signature,
    TypeMeta,
    Value,
};

/// A declared visibility of a member.
///
/// Only public members can be used reflectively right away. Any other member
/// needs an [access override](crate::runtime::override_access) first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Package,
    Private,
}

impl Display for Visibility {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Package => "package",
            Self::Private => "private",
        })
    }
}

/// A named, typed storage slot declared by a type.
///
/// Static fields hold a single value shared by the whole program. Instance
/// fields hold one value per [Instance] of the owner type or its subtypes.
pub struct Field {
    pub(super) name: Ident,
    pub(super) ty: &'static TypeMeta,
    pub(super) is_static: bool,
    pub(super) visibility: Visibility,
    pub(super) owner: &'static TypeMeta,
    pub(super) index: usize,
    pub(super) initial: Value,
    pub(super) static_value: RwLock<Value>,
    pub(super) accessible: AtomicBool,
}

impl Debug for Field {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!("Field({self})"))
    }
}

impl Display for Field {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!("{}::{}: {}", self.owner, self.name, self.ty))
    }
}

impl Field {
    #[inline(always)]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    #[inline(always)]
    pub fn owner(&self) -> &'static TypeMeta {
        self.owner
    }

    /// The declared type of the field.
    #[inline(always)]
    pub fn ty(&self) -> &'static TypeMeta {
        self.ty
    }

    #[inline(always)]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Reads the field.
    ///
    /// Static fields ignore the `target`. Instance fields require an
    /// [Instance] target of the owner type or its subtype.
    pub fn get(&'static self, target: Option<&Value>) -> RuntimeResult<Value> {
        self.check_access()?;

        if self.is_static {
            let value = self
                .static_value
                .read()
                .unwrap_or_else(|poison| poison.into_inner());

            return Ok(value.clone());
        }

        Ok(self.target_instance(target)?.load(self))
    }

    /// Writes the field.
    ///
    /// The value is checked against the declared type of the field, and
    /// widened if the field is primitive.
    pub fn set(&'static self, target: Option<&Value>, value: Value) -> RuntimeResult<()> {
        self.check_access()?;

        let value = coerce(value, self.ty)?;

        if self.is_static {
            let mut slot = self
                .static_value
                .write()
                .unwrap_or_else(|poison| poison.into_inner());

            *slot = value;

            return Ok(());
        }

        self.target_instance(target)?.store(self, value);

        Ok(())
    }

    #[inline(always)]
    pub(super) fn slot(&self) -> (usize, usize) {
        (self.owner.id(), self.index)
    }

    #[inline(always)]
    pub(super) fn initial_value(&self) -> Value {
        self.initial.clone()
    }

    #[inline(always)]
    fn check_access(&'static self) -> RuntimeResult<()> {
        match self.is_accessible() {
            true => Ok(()),
            false => Err(RuntimeError::Inaccessible {
                member: Member::Field(self),
            }),
        }
    }

    fn target_instance<'a>(&self, target: Option<&'a Value>) -> RuntimeResult<&'a Instance> {
        receiver_instance(self.owner, target, "field access")
    }
}

/// A named operation declared by a type.
pub struct Method {
    pub(super) name: Ident,
    pub(super) params: Vec<&'static TypeMeta>,
    pub(super) ret: &'static TypeMeta,
    pub(super) is_static: bool,
    pub(super) visibility: Visibility,
    pub(super) owner: &'static TypeMeta,
    pub(super) body: Option<MethodBody>,
    pub(super) accessible: AtomicBool,
}

impl Debug for Method {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!("Method({self})"))
    }
}

impl Display for Method {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.signature(), formatter)
    }
}

impl Method {
    #[inline(always)]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The type that declares the method.
    #[inline(always)]
    pub fn owner(&self) -> &'static TypeMeta {
        self.owner
    }

    /// The declared parameter types in positional order.
    #[inline(always)]
    pub fn params(&self) -> &[&'static TypeMeta] {
        &self.params
    }

    /// The declared return type, `void` if the method returns nothing.
    #[inline(always)]
    pub fn return_type(&self) -> &'static TypeMeta {
        self.ret
    }

    #[inline(always)]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Returns false for abstract methods.
    #[inline(always)]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    #[inline(always)]
    pub fn signature(&self) -> Signature<'_> {
        Signature {
            owner: Some(self.owner),
            name: Some(self.name.as_str()),
            params: Some(&self.params),
            output: Some(self.ret),
        }
    }

    /// Invokes the method.
    ///
    /// Instance methods require an [Instance] receiver of the owner type or
    /// its subtype, and are dispatched virtually: the body that runs is the
    /// one of the most derived override available for the receiver's class.
    /// Static methods ignore the receiver.
    ///
    /// The arguments are checked against the declared parameter types. Errors
    /// raised by the body are returned wrapped into
    /// [RuntimeError::Invocation]. Methods returning `void` produce
    /// [Null](Value::Null).
    pub fn invoke(
        &'static self,
        receiver: Option<&Value>,
        arguments: Vec<Value>,
    ) -> RuntimeResult<Value> {
        if !self.is_accessible() {
            return Err(RuntimeError::Inaccessible {
                member: Member::Method(self),
            });
        }

        let arguments = prepare_arguments(Member::Method(self), &self.params, arguments)?;

        if self.is_static {
            return self.run(self, None, arguments);
        }

        let Some(receiver) = receiver else {
            return Err(RuntimeError::ObjectAbsent {
                operation: "instance method invocation",
            });
        };

        let instance = receiver_instance(self.owner, Some(receiver), "instance method invocation")?;

        self.dispatch(instance.ty())
            .run(self, Some(receiver), arguments)
    }

    // Skips the visibility check and argument preparation. Used by the object
    // model itself (equality and textual representation).
    pub(crate) fn dispatch_unchecked(
        &'static self,
        receiver: &Value,
        arguments: Vec<Value>,
    ) -> RuntimeResult<Value> {
        let Some(instance) = receiver.as_instance() else {
            return Err(RuntimeError::ObjectAbsent {
                operation: "instance method invocation",
            });
        };

        self.dispatch(instance.ty())
            .run(self, Some(receiver), arguments)
    }

    /// Returns true if this method has the same name and parameter types as
    /// the `other` one.
    #[inline]
    pub fn overrides(&self, other: &Method) -> bool {
        self.name == other.name && self.params == other.params
    }

    // Finds the implementation of this method for the runtime class. Classes
    // of the lineage are searched first, then the default bodies of their
    // interfaces.
    fn dispatch(&'static self, runtime: &'static TypeMeta) -> &'static Method {
        if self.is_static || self.visibility == Visibility::Private {
            return self;
        }

        for level in runtime.lineage() {
            for candidate in level.declared_methods() {
                if !candidate.is_static && candidate.body.is_some() && candidate.overrides(self) {
                    return candidate;
                }
            }
        }

        let mut visited = AHashSet::new();
        let mut stack = Vec::new();

        for level in runtime.lineage() {
            stack.extend(level.interfaces().iter().rev().copied());

            while let Some(interface) = stack.pop() {
                if !visited.insert(interface.id()) {
                    continue;
                }

                for candidate in interface.declared_methods() {
                    if !candidate.is_static && candidate.body.is_some() && candidate.overrides(self)
                    {
                        return candidate;
                    }
                }

                stack.extend(interface.interfaces().iter().rev().copied());
            }
        }

        self
    }

    fn run(
        &'static self,
        invoked: &'static Method,
        receiver: Option<&Value>,
        arguments: Vec<Value>,
    ) -> RuntimeResult<Value> {
        let Some(body) = &self.body else {
            return Err(RuntimeError::AbstractMethod {
                member: Member::Method(invoked),
            });
        };

        let result = match body(Invocation::new(receiver, arguments)) {
            Ok(result) => result,

            Err(cause) => {
                return Err(RuntimeError::Invocation {
                    member: Member::Method(invoked),
                    cause: Box::new(cause),
                })
            }
        };

        if self.ret.is_void() {
            return Ok(Value::Null);
        }

        coerce(result, self.ret)
    }
}

/// An initializer of a class.
///
/// Constructors are not inherited: each class declares its own. A class that
/// declares no constructors gets a public parameterless one.
pub struct Constructor {
    pub(super) params: Vec<&'static TypeMeta>,
    pub(super) owner: &'static TypeMeta,
    pub(super) visibility: Visibility,
    pub(super) body: Option<ConstructorBody>,
    pub(super) accessible: AtomicBool,
}

impl Debug for Constructor {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!("Constructor({self})"))
    }
}

impl Display for Constructor {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.signature(), formatter)
    }
}

impl Constructor {
    /// The simple name of the owner type.
    #[inline(always)]
    pub fn name(&self) -> &str {
        self.owner.simple_name()
    }

    #[inline(always)]
    pub fn owner(&self) -> &'static TypeMeta {
        self.owner
    }

    #[inline(always)]
    pub fn params(&self) -> &[&'static TypeMeta] {
        &self.params
    }

    #[inline(always)]
    pub fn signature(&self) -> Signature<'_> {
        Signature {
            owner: Some(self.owner),
            name: Some(self.name()),
            params: Some(&self.params),
            output: None,
        }
    }

    /// Creates a new object of the owner type.
    ///
    /// The instance fields of the object start with their initial values,
    /// then the constructor body runs with the new object as the receiver.
    /// Errors raised by the body are returned wrapped into
    /// [RuntimeError::Invocation].
    pub fn new_instance(&'static self, arguments: Vec<Value>) -> RuntimeResult<Value> {
        if !self.is_accessible() {
            return Err(RuntimeError::Inaccessible {
                member: Member::Constructor(self),
            });
        }

        if self.owner.is_abstract() {
            return Err(RuntimeError::Instantiation { ty: self.owner });
        }

        let arguments = prepare_arguments(Member::Constructor(self), &self.params, arguments)?;

        let receiver = Value::Instance(Instance::allocate(self.owner));

        if let Some(body) = &self.body {
            if let Err(cause) = body(Invocation::new(Some(&receiver), arguments)) {
                return Err(RuntimeError::Invocation {
                    member: Member::Constructor(self),
                    cause: Box::new(cause),
                });
            }
        }

        Ok(receiver)
    }
}

/// Any member of a type.
#[derive(Clone, Copy)]
pub enum Member {
    Field(&'static Field),
    Method(&'static Method),
    Constructor(&'static Constructor),
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Field(this), Self::Field(other)) => std::ptr::eq(*this, *other),
            (Self::Method(this), Self::Method(other)) => std::ptr::eq(*this, *other),
            (Self::Constructor(this), Self::Constructor(other)) => std::ptr::eq(*this, *other),
            _ => false,
        }
    }
}

impl Eq for Member {}

impl Debug for Member {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(field) => Debug::fmt(field, formatter),
            Self::Method(method) => Debug::fmt(method, formatter),
            Self::Constructor(constructor) => Debug::fmt(constructor, formatter),
        }
    }
}

impl Display for Member {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(field) => Display::fmt(field, formatter),
            Self::Method(method) => Display::fmt(method, formatter),
            Self::Constructor(constructor) => Display::fmt(constructor, formatter),
        }
    }
}

impl Member {
    #[inline(always)]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Field(field) => field.name(),
            Self::Method(method) => method.name(),
            Self::Constructor(constructor) => constructor.name(),
        }
    }

    /// The type that declares the member.
    #[inline(always)]
    pub fn owner(&self) -> &'static TypeMeta {
        match self {
            Self::Field(field) => field.owner,
            Self::Method(method) => method.owner,
            Self::Constructor(constructor) => constructor.owner,
        }
    }

    #[inline(always)]
    pub fn visibility(&self) -> Visibility {
        match self {
            Self::Field(field) => field.visibility,
            Self::Method(method) => method.visibility,
            Self::Constructor(constructor) => constructor.visibility,
        }
    }

    /// The number of declared parameters. Zero for fields.
    #[inline(always)]
    pub fn arity(&self) -> usize {
        match self {
            Self::Field(_) => 0,
            Self::Method(method) => method.params.len(),
            Self::Constructor(constructor) => constructor.params.len(),
        }
    }

    #[inline(always)]
    pub fn is_accessible(&self) -> bool {
        match self {
            Self::Field(field) => field.is_accessible(),
            Self::Method(method) => method.is_accessible(),
            Self::Constructor(constructor) => constructor.is_accessible(),
        }
    }
}

fn prepare_arguments(
    member: Member,
    params: &[&'static TypeMeta],
    arguments: Vec<Value>,
) -> RuntimeResult<Vec<Value>> {
    if params.len() != arguments.len() {
        return Err(RuntimeError::ArityMismatch {
            member,
            arguments: arguments.len(),
        });
    }

    arguments
        .into_iter()
        .zip(params)
        .map(|(argument, param)| coerce(argument, *param))
        .collect()
}

fn receiver_instance<'a>(
    owner: &'static TypeMeta,
    target: Option<&'a Value>,
    operation: &'static str,
) -> RuntimeResult<&'a Instance> {
    match target {
        None | Some(Value::Null) => Err(RuntimeError::ObjectAbsent { operation }),

        Some(Value::Instance(instance)) => match owner.is_assignable_from(instance.ty()) {
            true => Ok(instance),
            false => Err(RuntimeError::TypeMismatch {
                expected: owner,
                found: Some(instance.ty()),
            }),
        },

        Some(other) => Err(RuntimeError::TypeMismatch {
            expected: owner,
            found: other.ty(),
        }),
    }
}
