//! # Stock Adjuster
//!
//! Manual stock changes and inventory reporting.
//!
//! ```text
//! adjust(id, 5, Subtract)
//!     │
//!     ├── validate delta (>= 0)
//!     ├── load product            → ProductNotFound
//!     ├── apply_adjustment        → early InsufficientStock on the read value
//!     ├── conditional UPDATE      → InsufficientStock if a concurrent sale won,
//!     │                             OutOfRange if a concurrent add filled it
//!     └── quantity < threshold    → warn!
//! ```

use sellpoint_core::stock::{
    apply_adjustment, quantity_overflow, stock_alerts, suggest_restock, Availability, RestockSuggestion, StockAlert,
    StockSummary,
};
use sellpoint_core::validation::validate_stock_delta;
use sellpoint_core::{CoreError, StockLevel, StockMode};
use sellpoint_db::{AddOutcome, Database, SubtractOutcome};
use tracing::{debug, info, warn};

use crate::error::ServiceResult;

#[derive(Debug, Clone)]
pub struct StockAdjuster {
    db: Database,
    low_stock_threshold: i64,
}

impl StockAdjuster {
    pub fn new(db: Database, low_stock_threshold: i64) -> Self {
        StockAdjuster {
            db,
            low_stock_threshold,
        }
    }

    /// Changes a product's stock. `delta` is never negative; `mode` says
    /// whether it is added, subtracted or becomes the new quantity.
    pub async fn adjust(&self, product_id: &str, delta: i64, mode: StockMode) -> ServiceResult<StockLevel> {
        validate_stock_delta(delta)?;

        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let expected = apply_adjustment(&product.name, product.current_stock, delta, mode)?;
        debug!(product = %product.name, current = product.current_stock, expected, mode = %mode, "Adjusting stock");

        let stock = self.db.stock();
        let level = match mode {
            StockMode::Add => match stock.add(product_id, delta).await? {
                AddOutcome::Applied(level) => Some(level),
                AddOutcome::Overflow { current } => {
                    warn!(product = %product.name, current, delta, "Stock add would overflow");
                    return Err(CoreError::from(quantity_overflow()).into());
                }
                AddOutcome::Missing => None,
            },
            StockMode::Set => stock.set(product_id, delta).await?,
            StockMode::Subtract => match stock.subtract(product_id, delta).await? {
                SubtractOutcome::Applied(level) => Some(level),
                SubtractOutcome::Insufficient { available } => {
                    return Err(CoreError::insufficient_stock(&product.name, available, delta).into());
                }
                SubtractOutcome::Missing => None,
            },
        }
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        info!(product = %product.name, mode = %mode, delta, quantity = level.quantity, "Stock adjusted");
        self.warn_if_low(&product.name, level.quantity);

        Ok(level)
    }

    /// Inventory overview against the configured threshold.
    pub async fn stock_summary(&self) -> ServiceResult<StockSummary> {
        Ok(self.db.stock().summary(self.low_stock_threshold).await?)
    }

    pub async fn stock_alerts(&self) -> ServiceResult<Vec<StockAlert>> {
        let summary = self.stock_summary().await?;
        Ok(stock_alerts(summary.out_of_stock_count, summary.low_stock_count))
    }

    /// Up to ten reorder suggestions, emptiest products first.
    pub async fn restock_suggestions(&self) -> ServiceResult<Vec<RestockSuggestion>> {
        let below = self.db.stock().below_threshold(self.low_stock_threshold).await?;
        Ok(suggest_restock(&below, self.low_stock_threshold))
    }

    /// Whether `required` units of a product can be sold right now.
    pub async fn check_availability(&self, product_id: &str, required: i64) -> ServiceResult<Availability> {
        let level = self
            .db
            .stock()
            .get(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        Ok(Availability::evaluate(level.quantity, required))
    }

    pub(crate) fn warn_if_low(&self, product: &str, quantity: i64) {
        if quantity < self.low_stock_threshold {
            warn!(
                product = %product,
                quantity,
                threshold = self.low_stock_threshold,
                "Low stock"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, ServiceError};
    use sellpoint_core::stock::{AlertLevel, RestockPriority};
    use sellpoint_core::{Money, NewProduct, ValidationError};
    use sellpoint_db::DbConfig;

    async fn setup(quantity: i64) -> (StockAdjuster, Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mouse = db
            .products()
            .insert(&NewProduct {
                name: "Mouse".into(),
                description: None,
                price: Money::from_cents(2999),
            })
            .await
            .unwrap();
        db.stock().set(&mouse.id, quantity).await.unwrap();
        (StockAdjuster::new(db.clone(), 10), db, mouse.id)
    }

    #[tokio::test]
    async fn test_modes() {
        let (adjuster, _db, id) = setup(3).await;

        assert_eq!(adjuster.adjust(&id, 7, StockMode::Add).await.unwrap().quantity, 10);
        assert_eq!(adjuster.adjust(&id, 4, StockMode::Subtract).await.unwrap().quantity, 6);
        assert_eq!(adjuster.adjust(&id, 25, StockMode::Set).await.unwrap().quantity, 25);
    }

    #[tokio::test]
    async fn test_subtract_beyond_stock_is_rejected() {
        let (adjuster, db, id) = setup(3).await;

        let err = adjuster.adjust(&id, 5, StockMode::Subtract).await.unwrap_err();
        match err {
            ServiceError::Core(CoreError::InsufficientStock { available, requested, .. }) => {
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(db.stock().get(&id).await.unwrap().unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_add_that_would_overflow_changes_nothing() {
        let (adjuster, db, id) = setup(i64::MAX - 1).await;

        let err = adjuster.adjust(&id, 5, StockMode::Add).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(db.stock().get(&id).await.unwrap().unwrap().quantity, i64::MAX - 1);
    }

    #[tokio::test]
    async fn test_rejects_negative_delta_and_unknown_product() {
        let (adjuster, _db, id) = setup(3).await;

        let err = adjuster.adjust(&id, -1, StockMode::Add).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::Validation(ValidationError::Negative { .. }))
        ));

        let err = adjuster.adjust("nope", 1, StockMode::Add).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_reports() {
        let (adjuster, db, id) = setup(0).await;
        let cable = db
            .products()
            .insert(&NewProduct {
                name: "Cable".into(),
                description: None,
                price: Money::from_cents(500),
            })
            .await
            .unwrap();
        db.stock().set(&cable.id, 4).await.unwrap();

        let alerts = adjuster.stock_alerts().await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].level, AlertLevel::Error);

        let suggestions = adjuster.restock_suggestions().await.unwrap();
        assert_eq!(suggestions[0].product_id, id);
        assert_eq!(suggestions[0].priority, RestockPriority::High);
        assert_eq!(suggestions[0].suggested_order, 20);
        assert_eq!(suggestions[1].priority, RestockPriority::Medium);

        let availability = adjuster.check_availability(&cable.id, 3).await.unwrap();
        assert!(availability.available);
        assert_eq!(availability.remaining_after, Some(1));
        assert!(!adjuster.check_availability(&cable.id, 5).await.unwrap().available);
    }
}
