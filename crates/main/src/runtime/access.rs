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

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};

use crate::runtime::{
    Constructor,
    Field,
    Member,
    Method,
    RuntimeError,
    RuntimeResult,
    TypeMeta,
    Visibility,
    ACCESS_LOG,
};

/// A member whose visibility can be overridden.
///
/// Implemented by [Field], [Method] and [Constructor]. You cannot implement
/// this trait for your own types.
pub trait Accessible: sealed::Sealed + Sync + 'static {
    /// The declared visibility of the member.
    fn visibility(&self) -> Visibility;

    /// The type that declares the member.
    fn owner(&self) -> &'static TypeMeta;

    /// Returns the member as a [Member].
    fn member(&'static self) -> Member;

    /// Returns true if the member is public, or if its access has been
    /// overridden.
    #[inline(always)]
    fn is_accessible(&self) -> bool {
        self.visibility() == Visibility::Public || self.access_flag().load(Ordering::Acquire)
    }

    #[doc(hidden)]
    fn access_flag(&self) -> &AtomicBool;
}

/// Makes the member usable regardless of its declared visibility.
///
/// Returns `None` if the override is refused, which happens for non-public
/// members of [sealed](crate::runtime::TypeBuilder::sealed) types. Public
/// members are always accessible.
///
/// The function is idempotent: overriding an already overridden member
/// succeeds again without side effects.
pub fn override_access<M: Accessible>(member: &'static M) -> Option<&'static M> {
    if member.is_accessible() {
        return Some(member);
    }

    if member.owner().is_sealed() {
        warn!(
            target: ACCESS_LOG,
            "Access override refused for {}. The owner type is sealed.",
            member.member(),
        );

        return None;
    }

    if !member.access_flag().swap(true, Ordering::AcqRel) {
        debug!(
            target: ACCESS_LOG,
            "Access overridden for {} {}.",
            member.visibility(),
            member.member(),
        );
    }

    Some(member)
}

/// Like [override_access], but reports a refused override as
/// [RuntimeError::AccessDenied].
#[inline]
pub fn override_access_or_fail<M: Accessible>(member: &'static M) -> RuntimeResult<&'static M> {
    match override_access(member) {
        Some(member) => Ok(member),
        None => Err(RuntimeError::AccessDenied {
            member: member.member(),
        }),
    }
}

impl Accessible for Field {
    #[inline(always)]
    fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline(always)]
    fn owner(&self) -> &'static TypeMeta {
        self.owner
    }

    #[inline(always)]
    fn member(&'static self) -> Member {
        Member::Field(self)
    }

    #[inline(always)]
    fn access_flag(&self) -> &AtomicBool {
        &self.accessible
    }
}

impl Accessible for Method {
    #[inline(always)]
    fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline(always)]
    fn owner(&self) -> &'static TypeMeta {
        self.owner
    }

    #[inline(always)]
    fn member(&'static self) -> Member {
        Member::Method(self)
    }

    #[inline(always)]
    fn access_flag(&self) -> &AtomicBool {
        &self.accessible
    }
}

impl Accessible for Constructor {
    #[inline(always)]
    fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline(always)]
    fn owner(&self) -> &'static TypeMeta {
        self.owner
    }

    #[inline(always)]
    fn member(&'static self) -> Member {
        Member::Constructor(self)
    }

    #[inline(always)]
    fn access_flag(&self) -> &AtomicBool {
        &self.accessible
    }
}

mod sealed {
    use crate::runtime::{Constructor, Field, Method};

    pub trait Sealed {}

    impl Sealed for Field {}

    impl Sealed for Method {}

    impl Sealed for Constructor {}
}

#[cfg(test)]
mod tests {
    use lady_deirdre::sync::Lazy;

    use crate::runtime::{
        override_access,
        override_access_or_fail,
        Accessible,
        FieldDecl,
        RuntimeError,
        TypeMeta,
        Visibility,
    };

    static VAULT: Lazy<&'static TypeMeta> = Lazy::new(|| {
        TypeMeta::class("tests.access.Vault")
            .field(FieldDecl::new("secret", TypeMeta::int()).visibility(Visibility::Private))
            .field(FieldDecl::new("label", TypeMeta::string()))
            .build()
            .expect("Vault declaration failed.")
    });

    static SEALED_VAULT: Lazy<&'static TypeMeta> = Lazy::new(|| {
        TypeMeta::class("tests.access.SealedVault")
            .sealed()
            .field(FieldDecl::new("secret", TypeMeta::int()).visibility(Visibility::Protected))
            .field(FieldDecl::new("label", TypeMeta::string()))
            .build()
            .expect("SealedVault declaration failed.")
    });

    #[test]
    fn test_override_idempotence() {
        let secret = &VAULT.declared_fields()[0];

        assert_eq!(secret.name(), "secret");
        assert!(!secret.is_accessible());

        let first = override_access(secret).expect("First override failed.");
        let second = override_access(secret).expect("Second override failed.");

        assert!(std::ptr::eq(first, second));
        assert!(secret.is_accessible());
        assert!(override_access_or_fail(secret).is_ok());
    }

    #[test]
    fn test_sealed_refusal() {
        let secret = &SEALED_VAULT.declared_fields()[0];
        let label = &SEALED_VAULT.declared_fields()[1];

        assert!(override_access(secret).is_none());
        assert!(override_access(label).is_some());

        match override_access_or_fail(secret) {
            Err(error @ RuntimeError::AccessDenied { .. }) => {
                assert_eq!(
                    error.to_string(),
                    "could not override access for tests.access.SealedVault::secret: int",
                );
            }

            other => panic!("Unexpected result: {other:?}"),
        }
    }
}
