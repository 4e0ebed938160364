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

//! # Ad Astra Reflect
//!
//! A runtime introspection toolkit for the Ad Astra object model.
//!
//! The crate describes types at runtime through
//! [TypeMeta](crate::runtime::TypeMeta) records: every
//! type has a canonical name, an optional supertype, a list of implemented
//! interfaces, and an ordered list of declared fields, methods and
//! constructors. On top of these descriptors the crate resolves members by
//! name, by declared type, or by an arbitrary predicate, walking the full
//! inheritance chain, and performs overload resolution over argument lists
//! where primitive types and their boxed wrappers are treated as equivalent.
//!
//! The [Refl] handle wraps a [Value](crate::runtime::Value) (or a bare type)
//! and exposes a fluent,
//! type-erased API to read and write fields and to invoke methods without
//! static knowledge of the wrapped type.
//!
//! ```
//! use ad_astra_reflect::{
//!     args,
//!     runtime::{ConstructorDecl, FieldDecl, TypeMeta, Visibility},
//!     Refl,
//! };
//!
//! let point = TypeMeta::class("docs.lib.Point")
//!     .field(FieldDecl::new("x", TypeMeta::int()).visibility(Visibility::Private))
//!     .field(FieldDecl::new("y", TypeMeta::int()).visibility(Visibility::Private))
//!     .constructor(ConstructorDecl::new(
//!         [TypeMeta::int(), TypeMeta::int()],
//!         |mut invocation| {
//!             let this = invocation.this()?.clone();
//!             this.write("x", invocation.take(0)?)?;
//!             this.write("y", invocation.take(1)?)?;
//!             Ok(())
//!         },
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let handle = Refl::instantiate(point, args![3, 4]).unwrap();
//!
//! assert_eq!(handle.get_as::<i32>("x").unwrap(), 3);
//! assert_eq!(handle.get_as::<i32>("Y").unwrap(), 4);
//! ```

#![doc(html_root_url = "https://docs.rs/ad-astra-reflect/1.0.0")]

mod refl;
pub mod runtime;

pub use crate::refl::Refl;

/// Builds a `Vec<Value>` argument list from Rust values.
///
/// Each element is converted with `Value::from`, so literals, strings,
/// [Instance](crate::runtime::Instance) references and explicit
/// [Value::Null](crate::runtime::Value::Null) entries can be mixed freely.
///
/// ```
/// use ad_astra_reflect::{args, runtime::Value};
///
/// let arguments = args![1, "two", Value::Null];
///
/// assert_eq!(arguments.len(), 3);
/// assert_eq!(arguments[0], Value::Int(1));
/// assert!(arguments[2].is_null());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::runtime::Value>::new()
    };

    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::runtime::Value::from($arg)),+]
    };
}
