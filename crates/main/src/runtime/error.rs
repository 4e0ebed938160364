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
    error::Error as StdError,
    fmt::{Debug, Display, Formatter},
    result::Result as StdResult,
    sync::Arc,
};

use compact_str::CompactString;

use crate::runtime::{Member, TypeMeta};

/// A result of a runtime API call, which can either be a normal value or a
/// [RuntimeError].
pub type RuntimeResult<T> = StdResult<T, RuntimeError>;

/// A helper trait for the [RuntimeResult] object.
pub trait RuntimeResultExt {
    /// Replaces the error, if any, with its [normalized](normalize) root
    /// cause.
    fn normalized(self) -> Self;
}

impl<T> RuntimeResultExt for RuntimeResult<T> {
    #[inline(always)]
    fn normalized(self) -> Self {
        self.map_err(normalize)
    }
}

/// Strips the wrappers added by the reflective invocation machinery.
///
/// The [Invocation](RuntimeError::Invocation) and
/// [Propagated](RuntimeError::Propagated) variants are unwrapped repeatedly
/// until an error of any other kind is reached. Any other error is returned
/// unchanged.
///
/// ```
/// use ad_astra_reflect::runtime::{normalize, RuntimeError};
///
/// let cause = RuntimeError::raise_message("disk is full");
/// let wrapped = RuntimeError::Propagated {
///     cause: Box::new(RuntimeError::Propagated {
///         cause: Box::new(cause.clone()),
///     }),
/// };
///
/// assert_eq!(normalize(wrapped).to_string(), "disk is full");
/// ```
pub fn normalize(mut error: RuntimeError) -> RuntimeError {
    loop {
        match error {
            RuntimeError::Invocation { cause, .. } | RuntimeError::Propagated { cause } => {
                error = *cause;
            }

            other => return other,
        }
    }
}

/// Returns the [normalized](normalize) error as an [Err] result.
///
/// This function never returns [Ok], and is meant to be used in tail
/// position: `return raise(error)`.
#[inline(always)]
pub fn raise<T>(error: RuntimeError) -> RuntimeResult<T> {
    Err(normalize(error))
}

/// A description of a member lookup that found nothing.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Lookup {
    /// A field with the name, ignoring letter case.
    FieldName(CompactString),

    /// A field whose declared type is assignable to the type.
    FieldType(&'static TypeMeta),

    /// A field satisfying a user predicate.
    FieldPredicate,

    /// A method with the optional name, return type and parameter list.
    ///
    /// A `None` parameter slot stands for an argument of unknown type.
    Method {
        returns: Option<&'static TypeMeta>,
        name: Option<CompactString>,
        params: Option<Vec<Option<&'static TypeMeta>>>,
        filtered: bool,
    },

    /// A constructor with the parameter list.
    Constructor {
        params: Vec<Option<&'static TypeMeta>>,
    },
}

impl Display for Lookup {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FieldName(name) => formatter.write_fmt(format_args!("field {name}")),

            Self::FieldType(ty) => formatter.write_fmt(format_args!("field of type {ty}")),

            Self::FieldPredicate => formatter.write_str("field matching predicate"),

            Self::Method {
                returns,
                name,
                params,
                filtered,
            } => {
                formatter.write_str("method ")?;

                match returns {
                    Some(ty) => Display::fmt(ty, formatter)?,
                    None => formatter.write_str("?")?,
                }

                formatter.write_str(" ")?;

                match name {
                    Some(name) => formatter.write_str(name)?,
                    None => formatter.write_str("?")?,
                }

                match params {
                    Some(params) => write_params(formatter, params)?,
                    None => formatter.write_str("(..)")?,
                }

                if *filtered {
                    formatter.write_str(" matching predicate")?;
                }

                Ok(())
            }

            Self::Constructor { params } => {
                formatter.write_str("constructor")?;
                write_params(formatter, params)
            }
        }
    }
}

fn write_params(
    formatter: &mut Formatter<'_>,
    params: &[Option<&'static TypeMeta>],
) -> std::fmt::Result {
    formatter.write_str("(")?;

    let mut is_first = true;

    for param in params {
        match is_first {
            true => is_first = false,
            false => formatter.write_str(", ")?,
        }

        match param {
            Some(ty) => Display::fmt(ty, formatter)?,
            None => formatter.write_str("?")?,
        }
    }

    formatter.write_str(")")
}

/// Represents any error that may occur during type introspection, member
/// resolution, or reflective member access.
///
/// This object implements the [Debug] and [Display] traits. The Display
/// implementation provides a brief description of the underlying error.
///
/// Errors raised by member bodies reach the caller of
/// [Method::invoke](crate::runtime::Method::invoke) wrapped into the
/// [Invocation](Self::Invocation) variant. Use [normalize] to get the original
/// failure back.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum RuntimeError {
    /// Member resolution failed.
    NotFound {
        /// What was looked up.
        lookup: Lookup,

        /// The type where the lookup started.
        receiver_type: &'static TypeMeta,

        /// The name of a similar member of the type, if there is one.
        suggestion: Option<CompactString>,
    },

    /// There is no registered type with this canonical name.
    UnknownType {
        /// The requested name.
        name: CompactString,
    },

    /// The access override of the member was refused.
    AccessDenied {
        /// The member that refuses the override.
        member: Member,
    },

    /// An attempt to use a non-public member whose access was not overridden.
    Inaccessible {
        /// The member being accessed.
        member: Member,
    },

    /// The operation requires an object, but there is none.
    ObjectAbsent {
        /// A short name of the attempted operation.
        operation: &'static str,
    },

    /// A value cannot be used where the type is expected.
    TypeMismatch {
        /// The expected type.
        expected: &'static TypeMeta,

        /// The runtime type of the provided value. `None` for null.
        found: Option<&'static TypeMeta>,
    },

    /// The number of arguments differs from the number of declared
    /// parameters.
    ArityMismatch {
        /// The invoked member.
        member: Member,

        /// The number of arguments provided.
        arguments: usize,
    },

    /// An attempt to instantiate an interface or an abstract class.
    Instantiation {
        /// The type being instantiated.
        ty: &'static TypeMeta,
    },

    /// There is no implementation of the invoked method on the receiver's
    /// type.
    AbstractMethod {
        /// The invoked method.
        member: Member,
    },

    /// The body of an invoked member failed.
    Invocation {
        /// The invoked member.
        member: Member,

        /// The error raised by the body.
        cause: Box<RuntimeError>,
    },

    /// An error rethrown as is by a member body that called another member.
    Propagated {
        /// The rethrown error.
        cause: Box<RuntimeError>,
    },

    /// An arbitrary error raised by a member body.
    Raised {
        /// The underlying error.
        cause: Arc<dyn StdError + Send + Sync + 'static>,
    },

    /// A type with this canonical name is already registered.
    DuplicateType {
        /// The canonical name of the type.
        name: CompactString,
    },

    /// A type declares two members with the same identity.
    DuplicateMember {
        /// The canonical name of the declared type.
        owner: CompactString,

        /// The member description.
        member: CompactString,
    },

    /// A type declaration violates the type hierarchy rules.
    InvalidHierarchy {
        /// The canonical name of the declared type.
        ty: CompactString,

        /// The violated rule.
        reason: &'static str,
    },
}

impl Display for RuntimeError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound {
                lookup,
                receiver_type,
                suggestion,
            } => {
                formatter.write_fmt(format_args!("could not find {lookup} in {receiver_type}"))?;

                if let Some(suggestion) = suggestion {
                    formatter.write_fmt(format_args!(", did you mean `{suggestion}`?"))?;
                }

                Ok(())
            }

            Self::UnknownType { name } => formatter.write_fmt(format_args!("unknown type {name}")),

            Self::AccessDenied { member } => {
                formatter.write_fmt(format_args!("could not override access for {member}"))
            }

            Self::Inaccessible { member } => {
                formatter.write_fmt(format_args!("{member} is not accessible"))
            }

            Self::ObjectAbsent { operation } => {
                formatter.write_fmt(format_args!("object not present ({operation})"))
            }

            Self::TypeMismatch { expected, found } => match found {
                Some(found) => {
                    formatter.write_fmt(format_args!("expected {expected}, found {found}"))
                }
                None => formatter.write_fmt(format_args!("expected {expected}, found null")),
            },

            Self::ArityMismatch { member, arguments } => formatter.write_fmt(format_args!(
                "{member} expects {} argument(s), but {arguments} provided",
                member.arity(),
            )),

            Self::Instantiation { ty } => {
                formatter.write_fmt(format_args!("cannot instantiate abstract type {ty}"))
            }

            Self::AbstractMethod { member } => {
                formatter.write_fmt(format_args!("{member} has no implementation"))
            }

            Self::Invocation { member, cause } => {
                formatter.write_fmt(format_args!("{member} failed: {cause}"))
            }

            Self::Propagated { cause } => Display::fmt(cause, formatter),

            Self::Raised { cause } => Display::fmt(cause, formatter),

            Self::DuplicateType { name } => {
                formatter.write_fmt(format_args!("type {name} is already declared"))
            }

            Self::DuplicateMember { owner, member } => {
                formatter.write_fmt(format_args!("{member} is already declared in {owner}"))
            }

            Self::InvalidHierarchy { ty, reason } => {
                formatter.write_fmt(format_args!("invalid declaration of {ty}: {reason}"))
            }
        }
    }
}

impl StdError for RuntimeError {
    #[inline]
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Invocation { cause, .. } => Some(cause.as_ref()),
            Self::Propagated { cause } => Some(cause.as_ref()),
            Self::Raised { cause } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl RuntimeError {
    /// Wraps an arbitrary error raised by a member body.
    #[inline(always)]
    pub fn raise(cause: impl StdError + Send + Sync + 'static) -> Self {
        Self::Raised {
            cause: Arc::new(cause),
        }
    }

    /// Creates an error with a plain text description.
    #[inline(always)]
    pub fn raise_message(message: impl Display) -> Self {
        Self::raise(MessageError(message.to_string()))
    }

    /// Wraps this error into the [Propagated](Self::Propagated) variant.
    #[inline(always)]
    pub fn propagate(self) -> Self {
        Self::Propagated {
            cause: Box::new(self),
        }
    }

    /// Returns the innermost cause of this error without consuming it.
    ///
    /// This is a borrowing counterpart of [normalize].
    pub fn root_cause(&self) -> &RuntimeError {
        let mut current = self;

        loop {
            match current {
                Self::Invocation { cause, .. } | Self::Propagated { cause } => current = &**cause,
                other => return other,
            }
        }
    }

    /// Returns true if this error is a member resolution failure.
    #[inline(always)]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this error reports a missing object.
    #[inline(always)]
    pub fn is_object_absent(&self) -> bool {
        matches!(self, Self::ObjectAbsent { .. })
    }
}

struct MessageError(String);

impl Debug for MessageError {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, formatter)
    }
}

impl Display for MessageError {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl StdError for MessageError {}
