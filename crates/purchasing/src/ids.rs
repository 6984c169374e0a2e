//! Purchasing identifiers. All wrap [`AggregateId`] and are tenant-scoped via
//! the `tenant_id` carried by commands and events.

use serde::{Deserialize, Serialize};

use procura_core::AggregateId;

macro_rules! purchasing_id {
    ($(#[$meta:meta])* $t:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(pub AggregateId);

        impl $t {
            pub fn new(id: AggregateId) -> Self {
                Self(id)
            }

            pub fn generate() -> Self {
                Self(AggregateId::new())
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

purchasing_id!(
    /// One material/quantity line within a purchase request.
    LineItemId
);
purchasing_id!(
    /// The purchase request a line item belongs to.
    PurchaseRequestId
);
purchasing_id!(
    /// Catalogue material being procured.
    MaterialId
);
purchasing_id!(VendorId);
purchasing_id!(
    /// A return request; unique within its line item.
    ReturnRequestId
);
