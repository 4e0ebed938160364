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

use std::fmt::{Display, Formatter};

use crate::runtime::{TypeKind, TypeMeta};

/// One of the eight built-in value kinds.
///
/// Each primitive has a [primitive type](TypeMeta::primitive) (`int`) and a
/// boxed [wrapper type](TypeMeta::wrapper) (`core.Integer`). Runtime
/// [values](crate::runtime::Value) are always boxed, so the runtime type of
/// `Value::Int(1)` is the `core.Integer` wrapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl Display for Primitive {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.name())
    }
}

impl Primitive {
    /// All primitives in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Boolean,
        Self::Byte,
        Self::Short,
        Self::Char,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
    ];

    /// The canonical name of the primitive type.
    #[inline(always)]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Char => "char",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// The canonical name of the wrapper type.
    #[inline(always)]
    pub const fn wrapper_name(self) -> &'static str {
        match self {
            Self::Boolean => "core.Boolean",
            Self::Byte => "core.Byte",
            Self::Short => "core.Short",
            Self::Char => "core.Character",
            Self::Int => "core.Integer",
            Self::Long => "core.Long",
            Self::Float => "core.Float",
            Self::Double => "core.Double",
        }
    }

    /// Returns true if a value of this primitive can be used where `target`
    /// is expected without loss of magnitude.
    ///
    /// Every primitive widens to itself.
    ///
    /// ```
    /// use ad_astra_reflect::runtime::Primitive;
    ///
    /// assert!(Primitive::Byte.widens_to(Primitive::Long));
    /// assert!(Primitive::Char.widens_to(Primitive::Int));
    /// assert!(!Primitive::Char.widens_to(Primitive::Short));
    /// assert!(!Primitive::Double.widens_to(Primitive::Float));
    /// ```
    pub const fn widens_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::Boolean, Self::Boolean) => true,
            (Self::Boolean, _) | (_, Self::Boolean) => false,

            (Self::Byte, Self::Char) => false,
            (Self::Byte, _) => true,

            (Self::Short, Self::Short | Self::Int | Self::Long | Self::Float | Self::Double) => {
                true
            }

            (Self::Char, Self::Char | Self::Int | Self::Long | Self::Float | Self::Double) => true,

            (Self::Int, Self::Int | Self::Long | Self::Float | Self::Double) => true,

            (Self::Long, Self::Long | Self::Float | Self::Double) => true,

            (Self::Float, Self::Float | Self::Double) => true,

            (Self::Double, Self::Double) => true,

            _ => false,
        }
    }
}

impl TypeMeta {
    /// Returns true if this type is one of the eight primitive types.
    #[inline(always)]
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind(), TypeKind::Primitive(_))
    }

    /// Returns true if this type is a boxed wrapper of a primitive type.
    #[inline(always)]
    pub fn is_wrapper(&self) -> bool {
        matches!(self.kind(), TypeKind::Wrapper(_))
    }

    /// Returns true for primitive types, their wrappers and the `core.String`
    /// type.
    #[inline(always)]
    pub fn is_primitive_or_simple(&self) -> bool {
        matches!(
            self.kind(),
            TypeKind::Primitive(_) | TypeKind::Wrapper(_) | TypeKind::String,
        )
    }

    /// Returns the primitive this type represents, either directly or as a
    /// wrapper.
    #[inline(always)]
    pub fn primitive_kind(&self) -> Option<Primitive> {
        match self.kind() {
            TypeKind::Primitive(primitive) | TypeKind::Wrapper(primitive) => Some(*primitive),
            _ => None,
        }
    }

    /// Maps a wrapper type to its primitive counterpart. Any other type is
    /// returned as is.
    #[inline]
    pub fn to_primitive(&'static self) -> &'static TypeMeta {
        match self.kind() {
            TypeKind::Wrapper(primitive) => TypeMeta::primitive(*primitive),
            _ => self,
        }
    }

    /// Maps a primitive type to its wrapper counterpart. Any other type is
    /// returned as is.
    #[inline]
    pub fn to_wrapper(&'static self) -> &'static TypeMeta {
        match self.kind() {
            TypeKind::Primitive(primitive) => TypeMeta::wrapper(*primitive),
            _ => self,
        }
    }
}

/// Returns true if `ty` is one of the eight primitive types.
///
/// The unknown type (`None`) is not primitive.
#[inline(always)]
pub fn is_primitive(ty: Option<&TypeMeta>) -> bool {
    match ty {
        Some(ty) => ty.is_primitive(),
        None => false,
    }
}

/// Returns true if `ty` is a primitive type, a wrapper type or `core.String`.
///
/// The unknown type (`None`) is not simple.
#[inline(always)]
pub fn is_primitive_or_simple(ty: Option<&TypeMeta>) -> bool {
    match ty {
        Some(ty) => ty.is_primitive_or_simple(),
        None => false,
    }
}

/// A total version of [TypeMeta::to_primitive].
#[inline(always)]
pub fn to_primitive(ty: Option<&'static TypeMeta>) -> Option<&'static TypeMeta> {
    ty.map(TypeMeta::to_primitive)
}

/// A total version of [TypeMeta::to_wrapper].
#[inline(always)]
pub fn to_wrapper(ty: Option<&'static TypeMeta>) -> Option<&'static TypeMeta> {
    ty.map(TypeMeta::to_wrapper)
}

#[cfg(test)]
mod tests {
    use crate::runtime::{
        is_primitive,
        is_primitive_or_simple,
        to_primitive,
        to_wrapper,
        Primitive,
        TypeMeta,
    };

    #[test]
    fn test_classification() {
        for primitive in Primitive::ALL {
            let unboxed = TypeMeta::primitive(primitive);
            let boxed = TypeMeta::wrapper(primitive);

            assert!(is_primitive(Some(unboxed)));
            assert!(!is_primitive(Some(boxed)));
            assert!(is_primitive_or_simple(Some(unboxed)));
            assert!(is_primitive_or_simple(Some(boxed)));

            assert_eq!(unboxed.name(), primitive.name());
            assert_eq!(boxed.name(), primitive.wrapper_name());
        }

        assert!(is_primitive_or_simple(Some(TypeMeta::string())));
        assert!(!is_primitive(Some(TypeMeta::string())));
        assert!(!is_primitive_or_simple(Some(TypeMeta::root())));
        assert!(!is_primitive_or_simple(Some(TypeMeta::void())));
        assert!(!is_primitive(None));
        assert!(!is_primitive_or_simple(None));
    }

    #[test]
    fn test_conversion() {
        for primitive in Primitive::ALL {
            let unboxed = TypeMeta::primitive(primitive);
            let boxed = TypeMeta::wrapper(primitive);

            assert_eq!(to_wrapper(Some(unboxed)), Some(boxed));
            assert_eq!(to_wrapper(Some(boxed)), Some(boxed));
            assert_eq!(to_primitive(Some(boxed)), Some(unboxed));
            assert_eq!(to_primitive(Some(unboxed)), Some(unboxed));
        }

        let string = TypeMeta::string();

        assert_eq!(string.to_wrapper(), string);
        assert_eq!(string.to_primitive(), string);
        assert_eq!(to_wrapper(None), None);
        assert_eq!(to_primitive(None), None);

        let array = TypeMeta::array_of(TypeMeta::int());

        assert_eq!(array.to_wrapper(), array);
    }
}
