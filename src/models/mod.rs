mod holding;
mod price_point;
mod quote;
mod rollup;
mod tag;

pub use holding::{CreateHolding, Holding, HoldingRecord, HoldingView, PriceStatus, UpdateHolding};
pub use price_point::{PriceHistory, PricePoint};
pub use quote::{BookEntry, PriceBook, PriceQuote, PriceSource, QuotesResponse};
pub use rollup::{
    PortfolioSummary, RollUpReport, RollUpTotal, SeriesPoint, TagRollUp, TagTimeseries,
    TimeseriesParams,
};
pub use tag::{CreateTag, Tag, UpdateTag};
