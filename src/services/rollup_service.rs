use tracing::{info, warn};

use crate::db::PortfolioStore;
use crate::errors::AppError;
use crate::models::{Holding, PortfolioSummary, RollUpReport, TagTimeseries};
use crate::services::price_service::PriceService;
use crate::services::rollup_engine;

pub const DEFAULT_TIMESERIES_DAYS: u32 = 30;
pub const MAX_TIMESERIES_DAYS: u32 = 365;

async fn open_holdings(store: &dyn PortfolioStore) -> Result<Vec<Holding>, AppError> {
    let mut holdings = store.list_holdings().await?;
    holdings.retain(|h| !h.closed);
    Ok(holdings)
}

fn symbols_of(holdings: &[Holding]) -> Vec<String> {
    holdings.iter().map(|h| h.symbol.clone()).collect()
}

pub async fn tag_rollup(store: &dyn PortfolioStore, prices: &PriceService) -> Result<RollUpReport, AppError> {
    let holdings = open_holdings(store).await?;
    let book = prices.fetch_prices(&symbols_of(&holdings)).await;

    let report = rollup_engine::roll_up(&holdings, &book);
    if report.unpriced {
        warn!("Roll-up computed without prices for {:?}", report.missing);
    }
    info!(
        "Rolled up {} holdings into {} tags ({} stale)",
        holdings.len(),
        report.tags.len(),
        report.stale.len()
    );
    Ok(report)
}

pub async fn summary(store: &dyn PortfolioStore, prices: &PriceService) -> Result<PortfolioSummary, AppError> {
    let holdings = open_holdings(store).await?;
    let book = prices.fetch_prices(&symbols_of(&holdings)).await;
    Ok(rollup_engine::summarize(&holdings, &book))
}

pub async fn tag_timeseries(
    store: &dyn PortfolioStore,
    prices: &PriceService,
    days: Option<u32>,
) -> Result<TagTimeseries, AppError> {
    let days = days.unwrap_or(DEFAULT_TIMESERIES_DAYS);
    if days == 0 || days > MAX_TIMESERIES_DAYS {
        return Err(AppError::Validation(format!(
            "days must be between 1 and {}",
            MAX_TIMESERIES_DAYS
        )));
    }

    let holdings = open_holdings(store).await?;
    if holdings.is_empty() {
        return Ok(TagTimeseries::default());
    }

    let histories = prices.fetch_histories(&symbols_of(&holdings), days).await;
    Ok(rollup_engine::tag_timeseries(&holdings, &histories))
}
