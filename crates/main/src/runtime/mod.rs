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

mod access;
mod builder;
mod classify;
#[cfg(feature = "suggestions")]
mod closeness;
mod coercion;
mod error;
mod ident;
mod invoke;
mod member;
mod resolve;
mod ty;
mod value;

pub use crate::runtime::{
    access::{override_access, override_access_or_fail, Accessible},
    builder::{ConstructorDecl, FieldDecl, MethodDecl, TypeBuilder},
    classify::{is_primitive, is_primitive_or_simple, to_primitive, to_wrapper, Primitive},
    error::{normalize, raise, Lookup, RuntimeError, RuntimeResult, RuntimeResultExt},
    ident::Ident,
    invoke::{param_types, Invocation, Signature},
    member::{Constructor, Field, Member, Method, Visibility},
    resolve::{
        equals_fields,
        fields,
        find_constructor,
        find_field,
        find_method,
        methods,
        params_compatible,
        FieldQuery,
        MethodQuery,
    },
    ty::{Lineage, TypeKind, TypeMeta},
    value::{Array, FromValue, Instance, Value},
};

#[cfg(feature = "suggestions")]
pub use crate::runtime::closeness::{Closeness, StringEstimation};

pub(crate) static RESOLVE_LOG: &'static str = "ad-astra-reflect::$resolve";
pub(crate) static ACCESS_LOG: &'static str = "ad-astra-reflect::$access";
pub(crate) static REGISTRY_LOG: &'static str = "ad-astra-reflect::$registry";
