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
    fmt::{Display, Formatter},
    mem::take,
    sync::Arc,
};

use crate::runtime::{FromValue, Instance, RuntimeError, RuntimeResult, TypeMeta, Value};

pub(super) type MethodBody = Arc<dyn Fn(Invocation<'_>) -> RuntimeResult<Value> + Send + Sync>;

pub(super) type ConstructorBody = Arc<dyn Fn(Invocation<'_>) -> RuntimeResult<()> + Send + Sync>;

/// The context of a member body invocation.
///
/// The object holds the receiver (the object the method was invoked on, or
/// the object under construction) and the arguments, already checked against
/// the declared parameter types. The number of arguments always equals the
/// number of declared parameters.
pub struct Invocation<'a> {
    receiver: Option<&'a Value>,
    arguments: Vec<Value>,
}

impl<'a> Invocation<'a> {
    #[inline(always)]
    pub(super) fn new(receiver: Option<&'a Value>, arguments: Vec<Value>) -> Self {
        Self {
            receiver,
            arguments,
        }
    }

    /// The receiver of the invocation. `None` for static methods.
    #[inline(always)]
    pub fn receiver(&self) -> Option<&'a Value> {
        self.receiver
    }

    /// The receiver of the invocation as an object.
    ///
    /// Returns [RuntimeError::ObjectAbsent] for static invocations.
    #[inline]
    pub fn this(&self) -> RuntimeResult<&'a Instance> {
        match self.receiver {
            Some(Value::Instance(instance)) => Ok(instance),
            _ => Err(RuntimeError::ObjectAbsent { operation: "this" }),
        }
    }

    #[inline(always)]
    pub fn arity(&self) -> usize {
        self.arguments.len()
    }

    #[inline(always)]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Returns a reference to the argument, or to [Null](Value::Null) if the
    /// index is out of bounds.
    #[inline(always)]
    pub fn arg(&self, index: usize) -> &Value {
        static NULL: Value = Value::Null;

        self.arguments.get(index).unwrap_or(&NULL)
    }

    /// Moves the argument out of the invocation and converts it into a Rust
    /// value.
    ///
    /// The argument's slot is left [Null](Value::Null). Out of bounds
    /// indices are treated as null arguments.
    #[inline]
    pub fn take<T: FromValue>(&mut self, index: usize) -> RuntimeResult<T> {
        match self.arguments.get_mut(index) {
            Some(argument) => T::from_value(take(argument)),
            None => T::from_value(Value::Null),
        }
    }
}

/// A printable signature of a member.
///
/// The [Display] implementation renders a canonical, user-facing view of the
/// signature, such as `geo.Point::distance(geo.Point) -> double`.
///
/// ```
/// use ad_astra_reflect::runtime::{Signature, TypeMeta};
///
/// let params = [TypeMeta::int(), TypeMeta::string()];
///
/// let signature = Signature {
///     name: Some("foo"),
///     params: Some(&params),
///     output: Some(TypeMeta::boolean()),
///     ..Signature::new()
/// };
///
/// assert_eq!(signature.to_string(), "fn foo(int, core.String) -> boolean");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Signature<'a> {
    /// The type that declares the member, if any.
    pub owner: Option<&'static TypeMeta>,

    /// The name of the member.
    pub name: Option<&'a str>,

    /// The declared parameter types, if the member is callable.
    pub params: Option<&'a [&'static TypeMeta]>,

    /// The declared return type. `void` and `None` are not rendered.
    pub output: Option<&'static TypeMeta>,
}

impl<'a> Display for Signature<'a> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.owner, self.name) {
            (None, Some(name)) => formatter.write_fmt(format_args!("fn {name}"))?,
            (Some(ty), Some(name)) => formatter.write_fmt(format_args!("{ty}::{name}"))?,
            _ => formatter.write_str("fn")?,
        };

        if let Some(params) = self.params {
            formatter.write_str("(")?;

            let mut is_first = true;

            for param in params {
                match is_first {
                    true => is_first = false,
                    false => formatter.write_str(", ")?,
                }

                Display::fmt(param, formatter)?;
            }

            formatter.write_str(")")?;
        }

        if let Some(output) = self.output {
            if !output.is_void() {
                formatter.write_str(" -> ")?;
                Display::fmt(output, formatter)?;
            }
        }

        Ok(())
    }
}

impl<'a> Default for Signature<'a> {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Signature<'a> {
    /// Creates a signature with all fields set to `None`.
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            owner: None,
            name: None,
            params: None,
            output: None,
        }
    }

    /// The number of parameters, if the signature has a parameter list.
    #[inline(always)]
    pub fn arity(&self) -> Option<usize> {
        self.params.map(|params| params.len())
    }
}

/// Returns the runtime types of the arguments, suitable for a member lookup.
///
/// [Null](Value::Null) arguments produce `None` slots, which match any
/// declared parameter type.
///
/// ```
/// use ad_astra_reflect::{
///     args,
///     runtime::{param_types, Primitive, TypeMeta, Value},
/// };
///
/// let types = param_types(&args![1, Value::Null, "x"]);
///
/// assert_eq!(types[0], Some(TypeMeta::wrapper(Primitive::Int)));
/// assert_eq!(types[1], None);
/// assert_eq!(types[2], Some(TypeMeta::string()));
/// ```
#[inline]
pub fn param_types(arguments: &[Value]) -> Vec<Option<&'static TypeMeta>> {
    arguments.iter().map(Value::ty).collect()
}

#[cfg(test)]
mod tests {
    use crate::runtime::{invoke::Invocation, RuntimeError, Signature, TypeMeta, Value};

    #[test]
    fn test_invocation_arguments() {
        let receiver = Value::Int(1);
        let mut invocation = Invocation::new(Some(&receiver), vec![Value::Int(2), Value::from("x")]);

        assert_eq!(invocation.arity(), 2);
        assert!(matches!(
            invocation.this(),
            Err(RuntimeError::ObjectAbsent { operation: "this" }),
        ));
        assert_eq!(invocation.take::<i64>(0).unwrap(), 2);
        assert_eq!(invocation.arg(0), &Value::Null);
        assert_eq!(invocation.arg(1), &Value::from("x"));
        assert_eq!(invocation.arg(5), &Value::Null);
        assert_eq!(invocation.take::<Option<String>>(7).unwrap(), None);
    }

    #[test]
    fn test_signature_display() {
        let params = [TypeMeta::long()];

        let signature = Signature {
            owner: Some(TypeMeta::string()),
            name: Some("charAt"),
            params: Some(&params),
            output: Some(TypeMeta::char()),
        };

        assert_eq!(signature.to_string(), "core.String::charAt(long) -> char");
        assert_eq!(signature.arity(), Some(1));

        let signature = Signature {
            name: Some("run"),
            params: Some(&[]),
            output: Some(TypeMeta::void()),
            ..Signature::new()
        };

        assert_eq!(signature.to_string(), "fn run()");
        assert_eq!(Signature::new().to_string(), "fn");
    }
}
