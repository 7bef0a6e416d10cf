use std::collections::BTreeSet;
use std::sync::OnceLock;

use bigdecimal::BigDecimal;
use regex::Regex;
use tracing::error;
use uuid::Uuid;

use crate::db::PortfolioStore;
use crate::errors::AppError;
use crate::models::{CreateHolding, Holding, HoldingRecord, HoldingView, PriceBook, PriceStatus, UpdateHolding};
use crate::services::price_service::PriceService;
use crate::services::rollup_engine;
use crate::services::tag_service;

fn symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Exchange suffixes (.TO), share classes (BRK-B), indices (^GSPC), FX (EURUSD=X).
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9^][A-Z0-9.\-=^]{0,14}$").expect("valid symbol regex"))
}

/// Trims and uppercases a ticker, rejecting anything that isn't one.
/// Symbols end up in provider URLs, so every entry point goes through here.
pub fn validate_symbol(raw: &str) -> Result<String, AppError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AppError::Validation("Symbol cannot be empty".into()));
    }
    if !symbol_pattern().is_match(&symbol) {
        return Err(AppError::Validation(format!("Invalid symbol: {}", symbol)));
    }
    Ok(symbol)
}

/// Checks and normalizes a create/update body before it reaches the store.
pub fn validate(input: CreateHolding) -> Result<HoldingRecord, AppError> {
    let symbol = validate_symbol(&input.symbol)?;

    let zero = BigDecimal::from(0);
    if input.quantity <= zero {
        return Err(AppError::Validation("Quantity must be > 0".into()));
    }
    if input.cost_basis < zero {
        return Err(AppError::Validation("Cost basis cannot be negative".into()));
    }
    if let Some(closing_price) = &input.closing_price {
        if !input.closed {
            return Err(AppError::Validation("Closing price requires a closed holding".into()));
        }
        if *closing_price < zero {
            return Err(AppError::Validation("Closing price cannot be negative".into()));
        }
    }

    let tags = input
        .tags
        .iter()
        .map(|name| tag_service::validate_name(name))
        .collect::<Result<BTreeSet<String>, AppError>>()?;

    Ok(HoldingRecord {
        symbol,
        quantity: input.quantity,
        cost_basis: input.cost_basis,
        tags: tags.into_iter().collect(),
        closed: input.closed,
        closing_price: input.closing_price,
    })
}

pub async fn create(store: &dyn PortfolioStore, input: CreateHolding) -> Result<Holding, AppError> {
    let record = validate(input)?;
    store.create_holding(&record).await
        .map_err(|e| {
            error!("Failed to create holding for {}: {}", record.symbol, e);
            e
        })
}

pub async fn fetch_one(store: &dyn PortfolioStore, id: Uuid) -> Result<Holding, AppError> {
    store.fetch_holding(id).await?
        .ok_or_else(|| AppError::NotFound("Holding not found".to_string()))
}

pub async fn update(store: &dyn PortfolioStore, id: Uuid, input: UpdateHolding) -> Result<Holding, AppError> {
    let record = validate(input)?;
    store.update_holding(id, &record).await?
        .ok_or_else(|| AppError::NotFound("Holding not found".to_string()))
}

pub async fn delete(store: &dyn PortfolioStore, id: Uuid) -> Result<(), AppError> {
    if !store.delete_holding(id).await? {
        return Err(AppError::NotFound("Holding not found".to_string()));
    }
    Ok(())
}

/// Attaches current price, value and gain/loss to a holding. A closed holding
/// with a closing price is valued at that price instead of the market.
pub fn price_holding(holding: Holding, book: &PriceBook) -> HoldingView {
    let entry = book.get(&holding.symbol);
    let long_name = entry.and_then(|e| e.quote.long_name.clone());

    let (price, price_status) = match (&holding.closing_price, holding.closed) {
        (Some(closing), true) => (Some(closing.clone()), PriceStatus::Closed),
        _ => (
            entry.map(|e| e.quote.price.clone()),
            PriceStatus::from(entry.map(|e| e.source)),
        ),
    };
    let market_value = price
        .as_ref()
        .map(|p| rollup_engine::current_value(&holding.quantity, p));
    let unrealized_gain_loss = price
        .as_ref()
        .map(|p| rollup_engine::gain_loss(&holding.quantity, &holding.cost_basis, p));

    HoldingView {
        holding,
        long_name,
        current_price: price,
        market_value,
        unrealized_gain_loss,
        price_status,
    }
}

pub async fn list_priced(store: &dyn PortfolioStore, prices: &PriceService) -> Result<Vec<HoldingView>, AppError> {
    let holdings = store.list_holdings().await?;
    let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
    let book = prices.fetch_prices(&symbols).await;
    Ok(holdings.into_iter().map(|h| price_holding(h, &book)).collect())
}

pub async fn price_one(holding: Holding, prices: &PriceService) -> HoldingView {
    let book = prices.fetch_prices(std::slice::from_ref(&holding.symbol)).await;
    price_holding(holding, &book)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(symbol: &str, quantity: i64, cost: i64, tags: &[&str]) -> CreateHolding {
        CreateHolding {
            symbol: symbol.to_string(),
            quantity: BigDecimal::from(quantity),
            cost_basis: BigDecimal::from(cost),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            closed: false,
            closing_price: None,
        }
    }

    #[test]
    fn test_validate_normalizes() {
        let record = validate(input(" aapl ", 10, 100, &["tech", " tech ", "us"])).unwrap();

        assert_eq!(record.symbol, "AAPL");
        assert_eq!(record.tags, vec!["tech".to_string(), "us".to_string()]);
    }

    #[test]
    fn test_validate_accepts_exchange_suffixes() {
        for symbol in ["RY.TO", "BRK-B", "^GSPC", "EURUSD=X"] {
            assert!(validate(input(symbol, 1, 1, &[])).is_ok(), "{symbol}");
        }
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let cases = [
            input("", 1, 1, &[]),
            input("NOT A SYMBOL", 1, 1, &[]),
            input("AAPL", 0, 1, &[]),
            input("AAPL", -5, 1, &[]),
            input("AAPL", 1, -1, &[]),
            input("AAPL", 1, 1, &[""]),
        ];

        for case in cases {
            assert!(matches!(validate(case), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn test_validate_symbol_rejects_url_fragments() {
        for raw in ["../v7/finance?x=1", "A/B", "AAPL&range=max", "A B", "%2F"] {
            assert!(matches!(validate_symbol(raw), Err(AppError::Validation(_))), "{raw}");
        }
        assert_eq!(validate_symbol(" brk-b ").unwrap(), "BRK-B");
    }

    #[test]
    fn test_zero_cost_basis_is_allowed() {
        assert!(validate(input("AAPL", 1, 0, &[])).is_ok());
    }

    #[test]
    fn test_price_holding_marks_missing() {
        let now = chrono::Utc::now();
        let holding = |symbol: &str| Holding {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            quantity: BigDecimal::from(10),
            cost_basis: BigDecimal::from(100),
            tags: vec![],
            closed: false,
            closing_price: None,
            created_at: now,
            updated_at: now,
        };
        let book = PriceBook::from_prices([("AAPL", BigDecimal::from(150))]);

        let views: Vec<HoldingView> = [holding("AAPL"), holding("GHOST")]
            .into_iter()
            .map(|h| price_holding(h, &book))
            .collect();

        assert_eq!(views[0].market_value, Some(BigDecimal::from(1500)));
        assert_eq!(views[0].unrealized_gain_loss, Some(BigDecimal::from(500)));
        assert_eq!(views[0].price_status, PriceStatus::Live);
        assert_eq!(views[1].current_price, None);
        assert_eq!(views[1].price_status, PriceStatus::Missing);
    }

    fn stored(symbol: &str, closed: bool, closing_price: Option<&str>) -> Holding {
        let now = chrono::Utc::now();
        Holding {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            quantity: BigDecimal::from(10),
            cost_basis: BigDecimal::from(100),
            tags: vec![],
            closed,
            closing_price: closing_price.map(|p| p.parse().unwrap()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_closing_price_validation() {
        let mut closed = input("AAPL", 1, 100, &[]);
        closed.closed = true;
        closed.closing_price = Some(BigDecimal::from(120));
        assert_eq!(validate(closed.clone()).unwrap().closing_price, Some(BigDecimal::from(120)));

        let mut negative = closed.clone();
        negative.closing_price = Some(BigDecimal::from(-1));
        assert!(matches!(validate(negative), Err(AppError::Validation(_))));

        let mut still_open = closed;
        still_open.closed = false;
        assert!(matches!(validate(still_open), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_closed_holding_is_valued_at_closing_price() {
        let book = PriceBook::from_prices([("AAPL", BigDecimal::from(150))]);

        let view = price_holding(stored("AAPL", true, Some("120")), &book);

        assert_eq!(view.current_price, Some(BigDecimal::from(120)));
        assert_eq!(view.market_value, Some(BigDecimal::from(1200)));
        assert_eq!(view.unrealized_gain_loss, Some(BigDecimal::from(200)));
        assert_eq!(view.price_status, PriceStatus::Closed);
    }

    #[test]
    fn test_closed_without_closing_price_uses_market() {
        let book = PriceBook::from_prices([("AAPL", BigDecimal::from(150))]);

        let view = price_holding(stored("AAPL", true, None), &book);

        assert_eq!(view.market_value, Some(BigDecimal::from(1500)));
        assert_eq!(view.price_status, PriceStatus::Live);
    }

    #[test]
    fn test_long_name_comes_from_quote() {
        let mut quote = crate::models::PriceQuote::bare("AAPL", BigDecimal::from(150));
        quote.long_name = Some("Apple Inc.".into());
        let mut book = PriceBook::new();
        book.insert(quote, crate::models::PriceSource::Live);

        let view = price_holding(stored("AAPL", false, None), &book);
        assert_eq!(view.long_name.as_deref(), Some("Apple Inc."));

        let view = price_holding(stored("GHOST", false, None), &book);
        assert_eq!(view.long_name, None);
    }
}
