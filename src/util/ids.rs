//! Core identity types: `ActorId`, `ActorType`, `SiloId`.
//!
//! Unlike a process-internal object system, Quark identities are stable,
//! opaque strings chosen by the caller (or the silo operator, for
//! `SiloId`) rather than runtime-generated UUIDs: an `ActorId` must survive
//! restarts, re-placement onto a different silo, and process crashes, so it
//! cannot be derived from anything transient.

// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Layer 3: Internal module imports
// (none)

/// Error returned when constructing an identity from an invalid string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("identity must be a non-empty string")]
pub struct EmptyIdentityError;

/// The permanent logical identity of an actor.
///
/// An `ActorId` is a non-empty, opaque, caller-chosen string. Identity plus
/// [`ActorType`] is globally unique cluster-wide; the pair never changes
/// across restarts or re-placement.
///
/// # Examples
///
/// ```rust
/// use quark::util::ActorId;
///
/// let id = ActorId::new("order:42").unwrap();
/// assert_eq!(id.as_str(), "order:42");
/// assert!(ActorId::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(String);

impl ActorId {
    /// Construct an `ActorId` from a non-empty string.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyIdentityError`] if `id` is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, EmptyIdentityError> {
        let id = id.into();
        if id.is_empty() {
            return Err(EmptyIdentityError);
        }
        Ok(Self(id))
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ActorId {
    type Error = EmptyIdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ActorId {
    type Error = EmptyIdentityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A stable string naming a user-declared actor behavior.
///
/// The pair `(ActorType, ActorId)` is the primary key used throughout the
/// runtime: the directory, the state store, and the reminder store all key
/// on this pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorType(String);

impl ActorType {
    /// Construct an `ActorType` from a non-empty string.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyIdentityError`] if `name` is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, EmptyIdentityError> {
        let name = name.into();
        if name.is_empty() {
            return Err(EmptyIdentityError);
        }
        Ok(Self(name))
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ActorType {
    type Error = EmptyIdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ActorType {
    type Error = EmptyIdentityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A stable string identifying one process ("silo") in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SiloId(String);

impl SiloId {
    /// Construct a `SiloId` from a non-empty string.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyIdentityError`] if `id` is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, EmptyIdentityError> {
        let id = id.into();
        if id.is_empty() {
            return Err(EmptyIdentityError);
        }
        Ok(Self(id))
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SiloId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SiloId {
    type Error = EmptyIdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// The primary key of an activation: a behavior name plus its identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorKey {
    pub actor_type: ActorType,
    pub actor_id: ActorId,
}

impl ActorKey {
    /// Build a new `(ActorType, ActorId)` key.
    pub fn new(actor_type: ActorType, actor_id: ActorId) -> Self {
        Self {
            actor_type,
            actor_id,
        }
    }

    /// The `"{actorType}/{actorId}"` form used as a persistence key prefix.
    pub fn as_key_prefix(&self) -> String {
        format!("{}/{}", self.actor_type, self.actor_id)
    }
}

impl Display for ActorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actor_type, self.actor_id)
    }
}

/// Ephemeral identifier for one in-process activation instance.
///
/// An [`ActorId`] is the permanent cluster-wide identity of a virtual actor;
/// an `InstanceId` is a fresh, random identifier minted each time the host
/// instantiates an activation for that `ActorId`. The turn loop, local
/// mailbox plumbing, and `ActorAddress` routing within one silo's
/// in-process engine key on `InstanceId`, not on the stable `ActorId`,
/// because a restart produces a new instance behind the same logical
/// identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Generate a new random `InstanceId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `InstanceId` from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for in-process messages routed through the mailbox
/// and broker layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a new random `MessageId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `MessageId` from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// In-process routing address for an activation instance.
///
/// Supports both named and anonymous addressing for the mailbox/broker
/// layer's internal pub-sub routing. This is a lower-level concept than
/// [`ActorKey`]: many `ActorAddress` values may exist over the lifetime of
/// one logical actor, one per activation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorAddress {
    /// Named actor with string identifier.
    Named { id: InstanceId, name: String },
    /// Anonymous actor with only an id.
    Anonymous { id: InstanceId },
}

impl ActorAddress {
    /// Create a new named actor address.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            id: InstanceId::new(),
            name: name.into(),
        }
    }

    /// Create a new anonymous actor address.
    pub fn anonymous() -> Self {
        Self::Anonymous {
            id: InstanceId::new(),
        }
    }

    /// Get the instance id.
    pub fn id(&self) -> &InstanceId {
        match self {
            Self::Named { id, .. } => id,
            Self::Anonymous { id } => id,
        }
    }

    /// Get the actor name if available.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } => Some(name),
            Self::Anonymous { .. } => None,
        }
    }
}

impl Display for ActorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { id, name } => write!(f, "{name}@{id}"),
            Self::Anonymous { id } => write!(f, "anonymous@{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_is_unique() {
        assert_ne!(InstanceId::new(), InstanceId::new());
    }

    #[test]
    fn test_message_id_is_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn test_named_actor_address() {
        let addr = ActorAddress::named("test_actor");
        assert_eq!(addr.name(), Some("test_actor"));
    }

    #[test]
    fn test_anonymous_actor_address() {
        let addr = ActorAddress::anonymous();
        assert_eq!(addr.name(), None);
    }

    #[test]
    fn test_actor_address_display_named() {
        let addr = ActorAddress::named("my_actor");
        assert!(format!("{addr}").contains("my_actor@"));
    }

    #[test]
    fn test_actor_id_rejects_empty() {
        assert!(ActorId::new("").is_err());
        assert!(ActorId::new("c1").is_ok());
    }

    #[test]
    fn test_actor_id_display() {
        let id = ActorId::new("order:42").unwrap();
        assert_eq!(format!("{id}"), "order:42");
    }

    #[test]
    fn test_actor_id_ordering_is_lexicographic() {
        let a = ActorId::new("a").unwrap();
        let b = ActorId::new("b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_actor_type_rejects_empty() {
        assert!(ActorType::new("").is_err());
    }

    #[test]
    fn test_silo_id_rejects_empty() {
        assert!(SiloId::new("").is_err());
        assert!(SiloId::new("silo-1").is_ok());
    }

    #[test]
    fn test_actor_key_prefix() {
        let key = ActorKey::new(
            ActorType::new("counter").unwrap(),
            ActorId::new("c1").unwrap(),
        );
        assert_eq!(key.as_key_prefix(), "counter/c1");
        assert_eq!(format!("{key}"), "counter/c1");
    }

    #[test]
    fn test_ids_are_serde_roundtrippable() {
        let id = ActorId::new("c1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        let back: ActorId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
