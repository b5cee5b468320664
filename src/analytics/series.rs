// =============================================================================
// Time Series Container
// =============================================================================
//
// An ordered-by-timestamp sequence of observations for a single asset — the
// input to every indicator engine.  Price validation happens here, at
// construction, so the numeric engines never see a zero, negative, or
// non-finite price.  The caller guarantees ascending, deduplicated timestamps;
// the container does not reorder or deduplicate.

use chrono::{DateTime, Utc};

use crate::analytics::AnalyticsError;

/// One data point for one asset at one instant.  Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub market_cap: Option<f64>,
    pub volume: Option<f64>,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self {
            timestamp,
            price,
            market_cap: None,
            volume: None,
        }
    }
}

/// Price history for a single asset, strictly ascending by timestamp.
///
/// Constructed fresh from provider data on each computation request and never
/// mutated in place.  Construction fails with
/// [`AnalyticsError::MalformedObservation`] if any price is non-finite, zero,
/// or negative.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    asset_id: String,
    observations: Vec<Observation>,
}

impl TimeSeries {
    /// Build a series from pre-sorted observations, validating every price.
    pub fn new(
        asset_id: impl Into<String>,
        observations: Vec<Observation>,
    ) -> Result<Self, AnalyticsError> {
        let asset_id = asset_id.into();
        for obs in &observations {
            if !obs.price.is_finite() || obs.price <= 0.0 {
                return Err(AnalyticsError::MalformedObservation {
                    asset_id: asset_id.clone(),
                    price: obs.price,
                });
            }
        }
        Ok(Self {
            asset_id,
            observations,
        })
    }

    /// Convenience constructor from bare `(timestamp, price)` pairs.
    pub fn from_prices(
        asset_id: impl Into<String>,
        points: impl IntoIterator<Item = (DateTime<Utc>, f64)>,
    ) -> Result<Self, AnalyticsError> {
        let observations = points
            .into_iter()
            .map(|(ts, price)| Observation::new(ts, price))
            .collect();
        Self::new(asset_id, observations)
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// The price column, in timestamp order.
    pub fn prices(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.price).collect()
    }

    /// The timestamp column, parallel to [`prices`](Self::prices).
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.observations.iter().map(|o| o.timestamp).collect()
    }

    pub fn last_price(&self) -> Option<f64> {
        self.observations.last().map(|o| o.price)
    }
}
