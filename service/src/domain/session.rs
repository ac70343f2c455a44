//! [`Session`] definitions.

use std::{borrow::Cow, collections::BTreeMap};

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, Error, From};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{crypto::random, domain::user};

/// Server-side state of a signed-in client.
///
/// Only its [`Id`] ever leaves the server.
#[derive(Clone, Debug)]
pub struct Session {
    /// [`Id`] of this [`Session`].
    pub(crate) id: Id,

    /// [`Values`] carried by this [`Session`].
    pub(crate) values: Values,

    /// [`DateTime`] when this [`Session`] was created.
    pub(crate) created_at: CreationDateTime,

    /// [`DateTime`] when this [`Session`] was last saved.
    pub(crate) updated_at: Option<UpdateDateTime>,

    /// [`DateTime`] when this [`Session`] expires.
    pub(crate) expires_at: ExpirationDateTime,
}

impl Session {
    /// Returns the [`Id`] of this [`Session`].
    #[must_use]
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Returns the [`Values`] of this [`Session`].
    #[must_use]
    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Returns the [`DateTime`] when this [`Session`] was created.
    #[must_use]
    pub fn created_at(&self) -> CreationDateTime {
        self.created_at
    }

    /// Returns the [`DateTime`] when this [`Session`] was last saved, if ever.
    #[must_use]
    pub fn updated_at(&self) -> Option<UpdateDateTime> {
        self.updated_at
    }

    /// Returns the [`DateTime`] when this [`Session`] expires.
    #[must_use]
    pub fn expires_at(&self) -> ExpirationDateTime {
        self.expires_at
    }

    /// Checks whether this [`Session`] is expired at the provided moment.
    #[must_use]
    pub fn is_expired_at<Of: ?Sized>(&self, now: DateTimeOf<Of>) -> bool {
        now.coerce() > self.expires_at
    }

    /// Sets the provided `value` under the provided [`Key`].
    ///
    /// The change is local until the [`Session`] is saved.
    ///
    /// # Errors
    ///
    /// If the `value` cannot be represented as JSON.
    pub fn set<V: Serialize + ?Sized>(
        &mut self,
        key: impl Into<Key>,
        value: &V,
    ) -> Result<(), CodecError> {
        self.values.set(key, value)
    }

    /// Returns the value stored under the provided [`Key`], if any.
    ///
    /// # Errors
    ///
    /// If the stored value cannot be read as a `V`.
    pub fn get<V: DeserializeOwned>(
        &self,
        key: &Key,
    ) -> Result<Option<V>, CodecError> {
        self.values.get(key)
    }

    /// Removes the value stored under the provided [`Key`].
    ///
    /// The change is local until the [`Session`] is saved.
    pub fn remove(&mut self, key: &Key) -> Option<serde_json::Value> {
        self.values.remove(key)
    }

    /// Stores the provided [`user::Identity`] under [`Key::USER`] and marks
    /// this [`Session`] as authenticated.
    ///
    /// # Errors
    ///
    /// If the [`user::Identity`] cannot be represented as JSON.
    pub fn authenticate(
        &mut self,
        identity: &user::Identity,
    ) -> Result<(), CodecError> {
        self.set(Key::USER, identity)?;
        self.set(Key::IS_AUTHENTICATED, &true)
    }

    /// Indicates whether this [`Session`] is marked as authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.get(&Key::IS_AUTHENTICATED), Ok(Some(true)))
    }

    /// Returns the full [`user::Identity`] stored under [`Key::USER`].
    ///
    /// # Errors
    ///
    /// - [`IdentityError::NotFound`] if nothing is stored under [`Key::USER`],
    ///   or only a bare user ID is.
    /// - [`IdentityError::Malformed`] if the stored value is neither form.
    pub fn identity(&self) -> Result<user::Identity, IdentityError> {
        match self.stored_identity()? {
            StoredIdentity::Record(identity) => Ok(identity),
            StoredIdentity::Id(_) => Err(IdentityError::NotFound),
        }
    }

    /// Returns the ID of the user stored under [`Key::USER`], whether it was
    /// stored as a full [`user::Identity`] or as a bare [`user::Id`].
    ///
    /// # Errors
    ///
    /// - [`IdentityError::NotFound`] if nothing is stored under [`Key::USER`].
    /// - [`IdentityError::Malformed`] if the stored value is neither form.
    pub fn user_id(&self) -> Result<user::Id, IdentityError> {
        Ok(match self.stored_identity()? {
            StoredIdentity::Record(identity) => identity.id,
            StoredIdentity::Id(id) => id,
        })
    }

    /// Reads the user identity stored under [`Key::USER`] in any of its
    /// accepted forms.
    fn stored_identity(&self) -> Result<StoredIdentity, IdentityError> {
        self.get(&Key::USER)
            .map_err(IdentityError::Malformed)?
            .ok_or(IdentityError::NotFound)
    }
}

/// User identity as it may appear under [`Key::USER`].
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredIdentity {
    /// Full [`user::Identity`] record.
    Record(user::Identity),

    /// Bare [`user::Id`].
    Id(user::Id),
}

/// Error of reading a [`user::Identity`] from a [`Session`].
#[derive(Debug, Display, Error)]
pub enum IdentityError {
    /// No user identity is stored in the [`Session`].
    #[display("user not found in session")]
    NotFound,

    /// Stored user identity cannot be decoded.
    #[display("malformed user identity in session: {_0}")]
    Malformed(CodecError),
}

/// ID of a [`Session`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, Hash, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(String);

impl Id {
    /// Length of a generated [`Id`].
    pub const LENGTH: usize = 64;

    /// Generates a new random [`Id`].
    #[must_use]
    pub fn random() -> Self {
        Self(random::alphanumeric(Self::LENGTH))
    }
}

/// Key of a value in [`Values`].
#[derive(
    Clone,
    Debug,
    Deserialize,
    Display,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(transparent)]
pub struct Key(Cow<'static, str>);

impl Key {
    /// [`Key`] of the signed-in [`user::Identity`].
    pub const USER: Self = Self(Cow::Borrowed("user"));

    /// [`Key`] of the flag marking a [`Session`] as authenticated.
    pub const IS_AUTHENTICATED: Self = Self(Cow::Borrowed("is_authenticated"));
}

impl From<&'static str> for Key {
    fn from(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Self(Cow::Owned(key))
    }
}

/// Values carried by a [`Session`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Values(BTreeMap<Key, serde_json::Value>);

impl Values {
    /// Sets the provided `value` under the provided [`Key`].
    ///
    /// # Errors
    ///
    /// If the `value` cannot be represented as JSON.
    pub fn set<V: Serialize + ?Sized>(
        &mut self,
        key: impl Into<Key>,
        value: &V,
    ) -> Result<(), CodecError> {
        drop(self.0.insert(key.into(), serde_json::to_value(value)?));
        Ok(())
    }

    /// Returns the value stored under the provided [`Key`], if any.
    ///
    /// # Errors
    ///
    /// If the stored value cannot be read as a `V`.
    pub fn get<V: DeserializeOwned>(
        &self,
        key: &Key,
    ) -> Result<Option<V>, CodecError> {
        self.0.get(key).map(V::deserialize).transpose()
    }

    /// Returns the raw JSON value stored under the provided [`Key`], if any.
    #[must_use]
    pub fn get_raw(&self, key: &Key) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Removes the value stored under the provided [`Key`].
    pub fn remove(&mut self, key: &Key) -> Option<serde_json::Value> {
        self.0.remove(key)
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indicates whether no values are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encodes these [`Values`] for storing.
    ///
    /// # Errors
    ///
    /// If any of the values cannot be encoded.
    pub fn encode(&self) -> Result<EncodedValues, CodecError> {
        serde_json::to_vec(self).map(EncodedValues)
    }

    /// Decodes the provided [`EncodedValues`].
    ///
    /// # Errors
    ///
    /// If the [`EncodedValues`] are malformed.
    pub fn decode(encoded: &EncodedValues) -> Result<Self, CodecError> {
        serde_json::from_slice(&encoded.0)
    }
}

/// [`Values`] encoded into bytes.
#[derive(Clone, Debug, Eq, From, PartialEq)]
pub struct EncodedValues(Vec<u8>);

impl AsRef<[u8]> for EncodedValues {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Error of encoding or decoding [`Values`].
pub type CodecError = serde_json::Error;

/// [`Session`] as persisted in a store.
#[derive(Clone, Debug)]
pub struct Record {
    /// [`Id`] of the [`Session`].
    pub id: Id,

    /// [`EncodedValues`] of the [`Session`].
    pub values: EncodedValues,

    /// [`DateTime`] when the [`Session`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when the [`Session`] was last saved.
    pub updated_at: Option<UpdateDateTime>,

    /// [`DateTime`] when the [`Session`] expires.
    pub expires_at: ExpirationDateTime,
}

impl Record {
    /// Encodes the provided [`Session`] into a [`Record`].
    ///
    /// # Errors
    ///
    /// If the [`Session`] [`Values`] cannot be encoded.
    pub fn encode(session: &Session) -> Result<Self, CodecError> {
        Ok(Self {
            id: session.id.clone(),
            values: session.values.encode()?,
            created_at: session.created_at,
            updated_at: session.updated_at,
            expires_at: session.expires_at,
        })
    }
}

/// [`DateTime`] of a [`Session`] creation.
pub type CreationDateTime = DateTimeOf<(Session, unit::Creation)>;

/// [`DateTime`] of a [`Session`] last update.
pub type UpdateDateTime = DateTimeOf<(Session, unit::Update)>;

/// [`DateTime`] of a [`Session`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Session, unit::Expiration)>;

#[cfg(test)]
mod spec {
    use common::DateTime;
    use serde_json::json;

    use crate::domain::user;

    use super::{CreationDateTime, IdentityError, Key, Session, Values};

    fn session() -> Session {
        let now = DateTime::now();
        Session {
            id: super::Id::random(),
            values: Values::default(),
            created_at: now.coerce(),
            updated_at: None,
            expires_at: (now + std::time::Duration::from_secs(60)).coerce(),
        }
    }

    fn identity() -> user::Identity {
        user::Identity {
            id: user::Id::new(),
            username: user::Username::from("alice".to_owned()),
        }
    }

    #[test]
    fn sets_gets_and_removes_values() {
        let mut session = session();

        session.set("count", &3).unwrap();
        session.set(String::from("name"), "bob").unwrap();

        assert_eq!(session.get::<u32>(&"count".into()).unwrap(), Some(3));
        assert_eq!(
            session.get::<String>(&"name".into()).unwrap().as_deref(),
            Some("bob"),
        );
        assert_eq!(session.get::<u32>(&"missing".into()).unwrap(), None);
        assert!(session.get::<u32>(&"name".into()).is_err());

        assert_eq!(session.remove(&"count".into()), Some(json!(3)));
        assert_eq!(session.get::<u32>(&"count".into()).unwrap(), None);
    }

    #[test]
    fn round_trips_encoded_values() {
        let mut values = Values::default();
        values.set(Key::USER, &identity()).unwrap();
        values.set("list", &[1, 2, 3]).unwrap();

        let decoded = Values::decode(&values.encode().unwrap()).unwrap();

        assert_eq!(decoded, values);
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn reads_identity_in_both_forms() {
        let identity = identity();
        let mut full = session();
        full.authenticate(&identity).unwrap();
        let mut bare = session();
        bare.set(Key::USER, &identity.id).unwrap();

        assert!(full.is_authenticated());
        assert_eq!(full.identity().unwrap(), identity);
        assert_eq!(full.user_id().unwrap(), identity.id);

        assert!(!bare.is_authenticated());
        assert_eq!(bare.user_id().unwrap(), identity.id);
        assert!(matches!(bare.identity(), Err(IdentityError::NotFound)));
    }

    #[test]
    fn reports_missing_and_malformed_identity() {
        let mut session = session();

        assert!(matches!(session.user_id(), Err(IdentityError::NotFound)));

        session.set(Key::USER, &42).unwrap();

        assert!(matches!(session.user_id(), Err(IdentityError::Malformed(_))));
    }

    #[test]
    fn generates_distinct_ids() {
        let (a, b) = (super::Id::random(), super::Id::random());

        assert_ne!(a, b);
        assert_eq!(a.as_ref().len(), super::Id::LENGTH);
    }

    #[test]
    fn detects_expiration() {
        let session = session();
        let created: CreationDateTime = session.created_at();

        assert!(!session.is_expired_at(created));
        assert!(session.is_expired_at(
            session.expires_at() + std::time::Duration::from_secs(1),
        ));
    }
}
