//! Cryptographic primitives of tokens and sessions.

pub mod random;

use derive_more::Debug;
use hmac::{
    digest::{core_api::BlockSizeUser, Digest},
    Mac as _, SimpleHmac,
};
use secrecy::{ExposeSecret as _, SecretSlice, SecretString};
use serde::Deserialize;
use subtle::ConstantTimeEq as _;

/// Hash function used for keyed signatures.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    PartialEq,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum HashFunction {
    /// SHA-224.
    Sha224,

    /// SHA-256.
    #[default]
    Sha256,

    /// SHA-384.
    Sha384,

    /// SHA-512.
    Sha512,

    /// SHA-512/256.
    Sha512_256,
}

impl HashFunction {
    /// Hashes the provided `data` with this [`HashFunction`].
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha224 => sha2::Sha224::digest(data).to_vec(),
            Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
            Self::Sha384 => sha2::Sha384::digest(data).to_vec(),
            Self::Sha512 => sha2::Sha512::digest(data).to_vec(),
            Self::Sha512_256 => sha2::Sha512_256::digest(data).to_vec(),
        }
    }

    /// Computes an HMAC of the `message` under the `key` with this
    /// [`HashFunction`].
    #[must_use]
    pub fn hmac(self, key: &[u8], message: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha224 => keyed_hash::<sha2::Sha224>(key, message),
            Self::Sha256 => keyed_hash::<sha2::Sha256>(key, message),
            Self::Sha384 => keyed_hash::<sha2::Sha384>(key, message),
            Self::Sha512 => keyed_hash::<sha2::Sha512>(key, message),
            Self::Sha512_256 => keyed_hash::<sha2::Sha512_256>(key, message),
        }
    }
}

/// Computes an HMAC of the `message` under the `key` with the `D` hash.
fn keyed_hash<D>(key: &[u8], message: &[u8]) -> Vec<u8>
where
    D: Digest + BlockSizeUser,
{
    let mut mac = SimpleHmac::<D>::new_from_slice(key)
        .expect("HMAC accepts keys of any length");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Keyed signer of token payloads.
///
/// Its key is the hash of the salt concatenated with the secret, computed
/// once.
#[derive(Debug)]
pub struct Signer {
    /// [`HashFunction`] used for both key derivation and signing.
    hash: HashFunction,

    /// Derived signing key.
    #[debug(skip)]
    key: SecretSlice<u8>,
}

impl Signer {
    /// Creates a new [`Signer`] deriving its key from the provided `salt`
    /// and `secret`.
    #[must_use]
    pub fn new(
        hash: HashFunction,
        salt: &SecretString,
        secret: &SecretString,
    ) -> Self {
        let material = [
            salt.expose_secret().as_bytes(),
            secret.expose_secret().as_bytes(),
        ]
        .concat();
        Self {
            hash,
            key: hash.digest(&material).into(),
        }
    }

    /// Signs the provided `message`.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.hash.hmac(self.key.expose_secret(), message)
    }
}

/// Compares the provided byte strings in constant time.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod spec {
    use secrecy::SecretString;

    use super::{constant_time_eq, HashFunction, Signer};

    fn signer(hash: HashFunction, salt: &str, secret: &str) -> Signer {
        Signer::new(
            hash,
            &SecretString::from(salt.to_owned()),
            &SecretString::from(secret.to_owned()),
        )
    }

    #[test]
    fn signs_deterministically() {
        let a = signer(HashFunction::Sha256, "salt", "secret");
        let b = signer(HashFunction::Sha256, "salt", "secret");

        assert_eq!(a.sign(b"payload"), b.sign(b"payload"));
        assert_ne!(a.sign(b"payload"), a.sign(b"payload2"));
    }

    #[test]
    fn depends_on_salt_and_secret() {
        let base = signer(HashFunction::Sha256, "salt", "secret");

        assert_ne!(
            base.sign(b"payload"),
            signer(HashFunction::Sha256, "other", "secret").sign(b"payload"),
        );
        assert_ne!(
            base.sign(b"payload"),
            signer(HashFunction::Sha256, "salt", "other").sign(b"payload"),
        );
    }

    #[test]
    fn produces_digest_sized_signatures() {
        for (hash, len) in [
            (HashFunction::Sha224, 28),
            (HashFunction::Sha256, 32),
            (HashFunction::Sha384, 48),
            (HashFunction::Sha512, 64),
            (HashFunction::Sha512_256, 32),
        ] {
            assert_eq!(signer(hash, "s", "k").sign(b"m").len(), len, "{hash}");
        }
    }

    #[test]
    fn parses_hash_names() {
        assert_eq!(
            "SHA512_256".parse::<HashFunction>().unwrap(),
            HashFunction::Sha512_256,
        );
        assert_eq!(HashFunction::default(), HashFunction::Sha256);
        assert_eq!(HashFunction::Sha384.to_string(), "SHA384");
    }

    #[test]
    fn compares_in_constant_time() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
