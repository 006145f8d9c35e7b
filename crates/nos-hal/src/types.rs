//! Type-safe forwarding-plane object handles.
//!
//! Handles are opaque 64-bit identifiers returned by the driver. The phantom
//! type parameter prevents accidental mixing of different object kinds (e.g.
//! passing a port handle where a router-interface handle is expected).

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Raw object identifier as the driver reports it.
pub type RawObjectId = u64;

/// Marker trait for forwarding-plane object kinds.
pub trait ObjectKind: Send + Sync + 'static {
    /// Returns the object kind name for debugging.
    fn kind_name() -> &'static str;
}

/// A type-safe forwarding-plane object handle.
#[derive(Clone, Copy)]
pub struct ObjectId<T: ObjectKind> {
    raw: RawObjectId,
    _marker: PhantomData<T>,
}

impl<T: ObjectKind> ObjectId<T> {
    /// The null handle.
    pub const NULL: Self = Self {
        raw: 0,
        _marker: PhantomData,
    };

    /// Creates a handle from a raw value.
    ///
    /// Returns `None` if the raw value is 0 (the null handle). Use the
    /// `NULL` constant for explicitly null handles.
    pub fn from_raw(raw: RawObjectId) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self {
                raw,
                _marker: PhantomData,
            })
        }
    }

    /// Creates a handle from a raw value, including null.
    pub const fn from_raw_unchecked(raw: RawObjectId) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Returns the raw handle value.
    pub const fn as_raw(&self) -> RawObjectId {
        self.raw
    }

    /// Returns true if this is the null handle.
    pub const fn is_null(&self) -> bool {
        self.raw == 0
    }

    /// Returns true if this is a valid (non-null) handle.
    pub const fn is_valid(&self) -> bool {
        self.raw != 0
    }
}

impl<T: ObjectKind> fmt::Debug for ObjectId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:016x})", T::kind_name(), self.raw)
    }
}

impl<T: ObjectKind> fmt::Display for ObjectId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.raw)
    }
}

impl<T: ObjectKind> PartialEq for ObjectId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T: ObjectKind> Eq for ObjectId<T> {}

impl<T: ObjectKind> Hash for ObjectId<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T: ObjectKind> Default for ObjectId<T> {
    fn default() -> Self {
        Self::NULL
    }
}

macro_rules! define_object_kind {
    ($name:ident, $kind_name:literal, $handle_alias:ident) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl ObjectKind for $name {
            fn kind_name() -> &'static str {
                $kind_name
            }
        }

        pub type $handle_alias = ObjectId<$name>;
    };
}

define_object_kind!(PortObject, "Port", PortHandle);
define_object_kind!(LagObject, "Lag", LagHandle);
define_object_kind!(VlanObject, "Vlan", VlanHandle);
define_object_kind!(VirtualRouterObject, "VirtualRouter", VrfHandle);
define_object_kind!(RouterInterfaceObject, "RouterInterface", RouterInterfaceHandle);
