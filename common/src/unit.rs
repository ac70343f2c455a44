//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing the last modification of an entity.
#[derive(Clone, Copy, Debug)]
pub struct Update;

/// Marker type describing the moment an entity stops being valid.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// Marker type describing a successful sign-in.
#[derive(Clone, Copy, Debug)]
pub struct Login;
