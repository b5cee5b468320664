// =============================================================================
// Market Analytics Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicator and movers engines.
// Every engine is a plain function over an immutable input series or snapshot
// pair: no I/O, no caching, no state between calls.  Positions for which a
// window has not yet filled are `None`, never zero — downstream ranking and
// charting must be able to tell "no value" from "no movement".

pub mod correlation;
pub mod macd;
pub mod movers;
pub mod rolling;
pub mod rsi;
pub mod series;

use thiserror::Error;

/// Errors surfaced by the analytics engines.
///
/// All variants are local to a single asset's computation: a caller running a
/// multi-asset batch can skip the failing asset and continue with the rest.
/// Undefined values (unfilled windows, zero-base percentage changes) are *not*
/// errors — they are represented as `None` in the output series.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("no observations for '{asset_id}'")]
    InsufficientHistory { asset_id: String },

    #[error("price {price} for '{asset_id}' must be finite and positive")]
    MalformedObservation { asset_id: String, price: f64 },

    #[error("window size must be at least 1, got {window}")]
    InvalidWindow { window: usize },

    #[error("fast span {fast} must be strictly less than slow span {slow}")]
    InvalidSpans { fast: usize, slow: usize },

    #[error("{which} snapshot contains no assets")]
    EmptySnapshot { which: &'static str },

    #[error("snapshots share no asset identifiers")]
    NoOverlap,

    #[error("alert threshold must be a positive percentage, got {threshold}")]
    InvalidThreshold { threshold: f64 },
}
