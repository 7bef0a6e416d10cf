//! Pure aggregation of holdings and prices into per-tag roll-ups.
//!
//! Nothing here performs I/O or keeps state between calls. Every output is a
//! function of the holdings and the price book passed in.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};

use crate::models::{
    Holding, PortfolioSummary, PriceBook, PricePoint, PriceSource, RollUpReport, RollUpTotal,
    SeriesPoint, TagRollUp, TagTimeseries,
};

/// `quantity × price`
pub fn current_value(quantity: &BigDecimal, price: &BigDecimal) -> BigDecimal {
    quantity * price
}

/// `quantity × price − quantity × cost_basis`
pub fn gain_loss(quantity: &BigDecimal, cost_basis: &BigDecimal, price: &BigDecimal) -> BigDecimal {
    current_value(quantity, price) - quantity * cost_basis
}

#[derive(Default)]
struct Accumulator {
    holdings: usize,
    quantity: BigDecimal,
    value: BigDecimal,
    gain_loss: BigDecimal,
}

impl Accumulator {
    fn add(&mut self, quantity: &BigDecimal, value: &BigDecimal, gain_loss: &BigDecimal) {
        self.holdings += 1;
        self.quantity += quantity;
        self.value += value;
        self.gain_loss += gain_loss;
    }
}

/// Priced open holdings with their value and gain/loss, plus the symbols that
/// could not be priced or were priced from a stale quote.
struct Valuation<'a> {
    priced: Vec<(&'a Holding, BigDecimal, BigDecimal)>,
    missing: Vec<String>,
    stale: Vec<String>,
}

fn value_holdings<'a>(holdings: &'a [Holding], book: &PriceBook) -> Valuation<'a> {
    let mut priced = Vec::with_capacity(holdings.len());
    let mut missing = BTreeSet::new();
    let mut stale = BTreeSet::new();

    for holding in holdings.iter().filter(|h| !h.closed) {
        let Some(entry) = book.get(&holding.symbol) else {
            missing.insert(holding.symbol.clone());
            continue;
        };

        if entry.source == PriceSource::LastKnown {
            stale.insert(holding.symbol.clone());
        }

        let price = &entry.quote.price;
        let value = current_value(&holding.quantity, price);
        let gl = gain_loss(&holding.quantity, &holding.cost_basis, price);
        priced.push((holding, value, gl));
    }

    Valuation {
        priced,
        missing: missing.into_iter().collect(),
        stale: stale.into_iter().collect(),
    }
}

/// Per-tag aggregates over the open holdings.
///
/// A holding with several tags contributes fully to each of them. Holdings
/// without a price are left out of every aggregate and reported in `missing`.
pub fn roll_up(holdings: &[Holding], book: &PriceBook) -> RollUpReport {
    let valuation = value_holdings(holdings, book);

    let mut by_tag: BTreeMap<&str, Accumulator> = BTreeMap::new();
    let mut total = Accumulator::default();

    for (holding, value, gl) in &valuation.priced {
        total.add(&holding.quantity, value, gl);

        // Guard against a holding listing the same tag twice.
        let tags: BTreeSet<&str> = holding.tags.iter().map(String::as_str).collect();
        for tag in tags {
            by_tag.entry(tag).or_default().add(&holding.quantity, value, gl);
        }
    }

    let tags = by_tag
        .into_iter()
        .map(|(tag, acc)| TagRollUp {
            tag: tag.to_string(),
            holdings: acc.holdings,
            total_quantity: acc.quantity,
            total_value: acc.value,
            gain_loss: acc.gain_loss,
        })
        .collect();

    RollUpReport {
        tags,
        total: RollUpTotal {
            market_value: total.value,
            gain_loss: total.gain_loss,
        },
        unpriced: !valuation.missing.is_empty(),
        missing: valuation.missing,
        stale: valuation.stale,
        as_of: Utc::now(),
    }
}

/// Portfolio-wide totals over the open holdings.
pub fn summarize(holdings: &[Holding], book: &PriceBook) -> PortfolioSummary {
    let valuation = value_holdings(holdings, book);

    let mut total = Accumulator::default();
    for (holding, value, gl) in &valuation.priced {
        total.add(&holding.quantity, value, gl);
    }

    PortfolioSummary {
        total_market_value: total.value,
        total_unrealized_gain_loss: total.gain_loss,
        unpriced: !valuation.missing.is_empty(),
        missing: valuation.missing,
        stale: valuation.stale,
    }
}

/// Daily per-tag and total market value over the given close histories.
///
/// Each date that appears in any history is a point. On that date a holding is
/// valued at the last close on or before it; a holding with no close yet is
/// skipped. A series only gets a point on dates where at least one of its
/// holdings was valued.
pub fn tag_timeseries(holdings: &[Holding], histories: &HashMap<String, Vec<PricePoint>>) -> TagTimeseries {
    let open: Vec<&Holding> = holdings
        .iter()
        .filter(|h| !h.closed && histories.contains_key(&h.symbol))
        .collect();

    let dates: BTreeSet<NaiveDate> = open
        .iter()
        .flat_map(|h| histories[&h.symbol].iter().map(|p| p.date))
        .collect();

    // Histories sorted by date so each symbol can be walked with a cursor.
    let mut sorted: HashMap<&str, Vec<&PricePoint>> = HashMap::new();
    for holding in &open {
        sorted.entry(holding.symbol.as_str()).or_insert_with(|| {
            let mut points: Vec<&PricePoint> = histories[&holding.symbol].iter().collect();
            points.sort_by_key(|p| p.date);
            points
        });
    }
    let mut cursors: HashMap<&str, usize> = HashMap::new();

    let mut series = TagTimeseries::default();

    for date in dates {
        let mut total: Option<Accumulator> = None;
        let mut by_tag: BTreeMap<&str, Accumulator> = BTreeMap::new();

        // Advance every symbol's cursor to its last close on or before `date`.
        let mut closes: HashMap<&str, &BigDecimal> = HashMap::new();
        for (&symbol, points) in &sorted {
            let cursor = cursors.entry(symbol).or_insert(0);
            while *cursor < points.len() && points[*cursor].date <= date {
                *cursor += 1;
            }
            if *cursor > 0 {
                closes.insert(symbol, &points[*cursor - 1].close);
            }
        }

        for holding in &open {
            let Some(close) = closes.get(holding.symbol.as_str()) else { continue };
            let value = current_value(&holding.quantity, close);
            let gl = gain_loss(&holding.quantity, &holding.cost_basis, close);

            total.get_or_insert_with(Accumulator::default).add(&holding.quantity, &value, &gl);
            let tags: BTreeSet<&str> = holding.tags.iter().map(String::as_str).collect();
            for tag in tags {
                by_tag.entry(tag).or_default().add(&holding.quantity, &value, &gl);
            }
        }

        if let Some(total) = total {
            series.total.push(SeriesPoint {
                date,
                market_value: total.value,
                unrealized_gain_loss: total.gain_loss,
            });
        }
        for (tag, acc) in by_tag {
            series.tags.entry(tag.to_string()).or_default().push(SeriesPoint {
                date,
                market_value: acc.value,
                unrealized_gain_loss: acc.gain_loss,
            });
        }
    }

    series
}
