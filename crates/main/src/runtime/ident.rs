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
    borrow::Borrow,
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
};

use compact_str::CompactString;

/// A name of a declared type or member: `Point`, `x`, `greet`.
///
/// You can retrieve the underlying string using the [Display], [Debug], and
/// [AsRef<str>](AsRef) implementations of this type.
///
/// The equality and ordering of identifiers are exact (case-sensitive), which
/// is what member declaration uniqueness relies on. Name-based member lookup
/// is case-insensitive instead, and uses [Ident::matches].
#[derive(Clone)]
pub struct Ident {
    string: CompactString,
}

impl Debug for Ident {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.string, formatter)
    }
}

impl Display for Ident {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.string, formatter)
    }
}

impl AsRef<str> for Ident {
    #[inline(always)]
    fn as_ref(&self) -> &str {
        self.string.as_ref()
    }
}

impl Borrow<str> for Ident {
    #[inline(always)]
    fn borrow(&self) -> &str {
        self.string.as_ref()
    }
}

impl PartialEq for Ident {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.string.eq(&other.string)
    }
}

impl PartialEq<str> for Ident {
    #[inline(always)]
    fn eq(&self, other: &str) -> bool {
        self.string.as_str().eq(other)
    }
}

impl<'a> PartialEq<&'a str> for Ident {
    #[inline(always)]
    fn eq(&self, other: &&'a str) -> bool {
        self.string.as_str().eq(*other)
    }
}

impl Eq for Ident {}

impl Hash for Ident {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.string.hash(state)
    }
}

impl PartialOrd for Ident {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ident {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> Ordering {
        self.string.cmp(&other.string)
    }
}

impl From<&str> for Ident {
    #[inline(always)]
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Ident {
    #[inline(always)]
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<CompactString> for Ident {
    #[inline(always)]
    fn from(value: CompactString) -> Self {
        Self::new(value)
    }
}

impl Ident {
    #[inline(always)]
    pub(crate) fn new(string: impl Into<CompactString>) -> Self {
        Self {
            string: string.into(),
        }
    }

    /// Returns the underlying string.
    #[inline(always)]
    pub fn as_str(&self) -> &str {
        self.string.as_str()
    }

    /// Returns true if this identifier equals `name` ignoring letter case.
    ///
    /// ```
    /// use ad_astra_reflect::runtime::Ident;
    ///
    /// let ident = Ident::from("userName");
    ///
    /// assert!(ident.matches("USERNAME"));
    /// assert!(!ident.matches("user"));
    /// ```
    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        let this = self.string.as_str();

        if this.len() == name.len() && this.eq_ignore_ascii_case(name) {
            return true;
        }

        this.chars()
            .flat_map(char::to_lowercase)
            .eq(name.chars().flat_map(char::to_lowercase))
    }

    /// Returns the last dot-separated segment of the identifier.
    ///
    /// For canonical type names (`geo.shapes.Point`) this is the simple
    /// name of the type (`Point`).
    #[inline]
    pub fn last_segment(&self) -> &str {
        let this = self.string.as_str();

        match this.rfind('.') {
            Some(index) => &this[(index + 1)..],
            None => this,
        }
    }
}
