//! Items

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    num::NonZeroU32,
};

use jiff::Timestamp;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    pricing::{PricingError, line_total_minor, money},
    products::{Product, ProductId},
};

/// Line identifier, unique per insertion event rather than per product.
///
/// A UUIDv7, so ids sort by the time the line was created and carry that time with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(Uuid);

impl LineId {
    /// Generate an id for a line created now.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Creation time embedded in the id, or `None` for ids that aren't time-based.
    pub fn created_at(&self) -> Option<Timestamp> {
        let (seconds, nanos) = self.0.get_timestamp()?.to_unix();

        Timestamp::new(
            i64::try_from(seconds).ok()?,
            i32::try_from(nanos).ok()?,
        )
        .ok()
    }
}

impl Default for LineId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for LineId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

/// One entry in the cart: a product snapshot and the quantity requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    #[serde(rename = "id")]
    line_id: LineId,
    product_id: ProductId,
    product: Product,
    quantity: NonZeroU32,
    added_at: Timestamp,
}

impl CartLineItem {
    /// Creates a new line for a product, stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(product: Product, quantity: NonZeroU32) -> Self {
        Self {
            line_id: LineId::new(),
            product_id: product.id.clone(),
            product,
            quantity,
            added_at: Timestamp::now(),
        }
    }

    /// Returns the line id
    pub fn line_id(&self) -> LineId {
        self.line_id
    }

    /// Returns the id of the product on this line
    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Returns the product as it was when first added
    pub fn product(&self) -> &Product {
        &self.product
    }

    /// Returns the quantity
    pub fn quantity(&self) -> NonZeroU32 {
        self.quantity
    }

    /// Returns when the line was first added
    pub fn added_at(&self) -> Timestamp {
        self.added_at
    }

    /// Effective unit price multiplied by quantity.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::LineOutOfRange`] if the amount does not fit in minor units.
    pub fn line_total(&self) -> Result<Money<'static, Currency>, PricingError> {
        line_total_minor(self).map(money)
    }

    pub(crate) fn set_quantity(&mut self, quantity: NonZeroU32) {
        self.quantity = quantity;
    }
}
