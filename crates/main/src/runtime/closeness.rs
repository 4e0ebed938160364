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
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
};

use compact_str::CompactString;
use strsim::normalized_damerau_levenshtein;

/// A similarity score of two member names, in tenths of a percent.
///
/// "100%" means that the names are equal ignoring letter case, and "0%" means
/// that they have nothing in common.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Closeness(u16);

impl Debug for Closeness {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, formatter)
    }
}

impl Display for Closeness {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!("{}%", self.percents()))
    }
}

impl Closeness {
    #[inline(always)]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline(always)]
    pub const fn half() -> Self {
        Self(500)
    }

    #[inline(always)]
    pub const fn one() -> Self {
        Self(1000)
    }

    /// The score rounded to the nearest percent.
    #[inline(always)]
    pub fn percents(self) -> u16 {
        (self.0 + 5) / 10
    }
}

/// Estimates how close a string is to the name someone tried to look up.
pub trait StringEstimation {
    /// ```
    /// use ad_astra_reflect::runtime::{Closeness, StringEstimation};
    ///
    /// assert_eq!("getName".estimate("GETNAME"), Closeness::one());
    /// assert_eq!("foo".estimate("bar"), Closeness::zero());
    /// assert!("getName".estimate("getNmae") >= Closeness::half());
    /// ```
    fn estimate(&self, pattern: impl AsRef<str>) -> Closeness;
}

impl<S: AsRef<str>> StringEstimation for S {
    fn estimate(&self, pattern: impl AsRef<str>) -> Closeness {
        let this = self.as_ref().to_lowercase();
        let pattern = pattern.as_ref().to_lowercase();

        let score = normalized_damerau_levenshtein(&pattern, &this);

        Closeness((score * 1000.0).round().clamp(0.0, 1000.0) as u16)
    }
}

// Picks the candidate closest to the pattern, if it is at least half similar.
// Ties are resolved in favor of the lexicographically smaller candidate.
pub(super) fn suggest<'a>(
    pattern: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<CompactString> {
    let mut best: Option<(Closeness, &'a str)> = None;

    for candidate in candidates {
        let closeness = candidate.estimate(pattern);

        if closeness < Closeness::half() {
            continue;
        }

        if let Some((current, name)) = &best {
            match current.cmp(&closeness) {
                Ordering::Less => (),

                Ordering::Equal => {
                    if *name <= candidate {
                        continue;
                    }
                }

                Ordering::Greater => continue,
            }
        }

        best = Some((closeness, candidate));
    }

    best.map(|(_, name)| CompactString::from(name))
}

#[cfg(test)]
mod tests {
    use crate::runtime::{closeness::suggest, Closeness, StringEstimation};

    #[test]
    fn test_estimation() {
        assert_eq!("x".estimate("X"), Closeness::one());
        assert_eq!(Closeness::half().percents(), 50);
        assert_eq!(format!("{}", Closeness::one()), "100%");
        assert!("greet".estimate("greeting") > "greet".estimate("meeting"));
    }

    #[test]
    fn test_suggestion() {
        let candidates = ["getName", "setName", "toString"];

        assert_eq!(
            suggest("getNmae", candidates).as_deref(),
            Some("getName"),
        );
        assert_eq!(suggest("hashCode", candidates), None);
        assert_eq!(suggest("anything", []), None);
    }
}
