use std::sync::Arc;

use crate::db::PortfolioStore;
use crate::services::price_service::PriceService;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PortfolioStore>,
    pub prices: PriceService,
}
