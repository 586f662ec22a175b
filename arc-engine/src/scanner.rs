use crate::resolver::ResolvedArbitragePair;
use arc_data::MarketDataHub;
use arc_instrument::{ExchangeId, Symbol};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;

/// A candidate cross-exchange trade, valid only at the instant it was emitted. Does not
/// persist beyond its evaluation cycle.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ArbitrageOpportunity {
    pub opportunity_id: String,
    pub symbol: Symbol,
    pub buy_exchange: ExchangeId,
    pub sell_exchange: ExchangeId,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub spread: Decimal,
    pub spread_pct: Decimal,
    pub max_quantity: Decimal,
    pub estimated_profit: Decimal,
    pub confidence: Decimal,
    pub timestamp: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
}

/// One venue's top-of-book read during a scan, carrying enough of
/// `SymbolInfo` to compute fees and minimums without a second hub lookup.
struct VenueQuote {
    exchange: ExchangeId,
    best_bid: Decimal,
    best_bid_size: Decimal,
    best_ask: Decimal,
    best_ask_size: Decimal,
    taker_fee: Decimal,
    min_base_amount: Decimal,
    confidence: Decimal,
}

fn read_venue_quote(
    hub: &MarketDataHub,
    exchange: ExchangeId,
    pair: &ResolvedArbitragePair,
    staleness: Duration,
    now: DateTime<Utc>,
) -> Option<VenueQuote> {
    let info = pair.per_exchange.get(&exchange)?;
    let timestamp = hub.book_timestamp(exchange, &pair.symbol)?;
    let age = now.signed_duration_since(timestamp).to_std().ok()?;
    if age > staleness {
        return None;
    }

    let (best_bid, best_ask) = hub.best_bid_ask(exchange, &pair.symbol)?;

    // Confidence aggregates freshness (fresher is better) and depth
    // (deeper is better). Both halves are normalised to roughly [0, 1]
    // against the config's own staleness window / minimum order size so
    // neither dominates.
    let freshness = Decimal::from(staleness.as_millis() as i64 - age.as_millis() as i64).max(Decimal::ZERO)
        / Decimal::from(staleness.as_millis().max(1) as i64);
    let depth = (best_bid.size + best_ask.size) / (info.min_base_amount.max(Decimal::new(1, 8)) * Decimal::from(2));
    let confidence = (freshness + depth.min(Decimal::ONE)) / Decimal::from(2);

    Some(VenueQuote {
        exchange,
        best_bid: best_bid.price,
        best_bid_size: best_bid.size,
        best_ask: best_ask.price,
        best_ask_size: best_ask.size,
        taker_fee: info.taker_fee,
        min_base_amount: info.min_base_amount,
        confidence,
    })
}

/// Evaluate one [`ResolvedArbitragePair`] against the hub's current snapshot and emit a
/// candidate opportunity if one clears the pair's `min_profit_bps`.
pub fn scan_pair(
    hub: &MarketDataHub,
    pair: &ResolvedArbitragePair,
    staleness: Duration,
    scan_interval: Duration,
    now: DateTime<Utc>,
    next_id: impl FnOnce() -> String,
) -> Option<ArbitrageOpportunity> {
    let quotes: Vec<VenueQuote> = pair
        .exchanges()
        .filter_map(|exchange| read_venue_quote(hub, exchange, pair, staleness, now))
        .collect();

    if quotes.len() < 2 {
        return None;
    }

    let best_ask_quote = quotes.iter().min_by(|a, b| a.best_ask.cmp(&b.best_ask))?;
    let best_bid_quote = quotes.iter().max_by(|a, b| a.best_bid.cmp(&b.best_bid))?;

    if best_ask_quote.exchange == best_bid_quote.exchange {
        return None;
    }

    let spread = best_bid_quote.best_bid - best_ask_quote.best_ask;
    if spread <= Decimal::ZERO {
        return None;
    }

    let fees = best_ask_quote.best_ask * best_ask_quote.taker_fee + best_bid_quote.best_bid * best_bid_quote.taker_fee;
    let net_spread = spread - fees;
    let net_bps = net_spread / best_ask_quote.best_ask * Decimal::from(10_000);
    if net_bps < pair.min_profit_bps {
        return None;
    }

    let max_by_exposure = pair.max_exposure_usd / best_ask_quote.best_ask;
    let max_quantity = best_ask_quote
        .best_ask_size
        .min(best_bid_quote.best_bid_size)
        .min(max_by_exposure);

    let min_required = best_ask_quote.min_base_amount.max(best_bid_quote.min_base_amount);
    if max_quantity < min_required {
        return None;
    }

    let confidence = (best_ask_quote.confidence + best_bid_quote.confidence) / Decimal::from(2);
    let estimated_profit = net_spread * max_quantity;
    let expiry = now + chrono::Duration::from_std(scan_interval * 2).unwrap_or(chrono::Duration::zero());

    Some(ArbitrageOpportunity {
        opportunity_id: next_id(),
        symbol: pair.symbol.clone(),
        buy_exchange: best_ask_quote.exchange,
        sell_exchange: best_bid_quote.exchange,
        buy_price: best_ask_quote.best_ask,
        sell_price: best_bid_quote.best_bid,
        spread,
        spread_pct: net_bps / Decimal::from(100),
        max_quantity,
        estimated_profit,
        confidence,
        timestamp: now,
        expiry,
    })
}

/// Tie-break ordering across a batch of candidate opportunities gathered in one scan
/// cycle.
pub fn rank_opportunities(mut opportunities: Vec<ArbitrageOpportunity>) -> Vec<ArbitrageOpportunity> {
    opportunities.sort_by(|a, b| {
        let fees_a = a.spread - (a.estimated_profit / a.max_quantity.max(Decimal::new(1, 8)));
        let fees_b = b.spread - (b.estimated_profit / b.max_quantity.max(Decimal::new(1, 8)));
        fees_a
            .cmp(&fees_b)
            .then_with(|| b.confidence.cmp(&a.confidence))
            .then_with(|| a.buy_exchange.as_str().cmp(b.sell_exchange.as_str()))
    });
    opportunities
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_data::MarketEvent;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::time::Duration as StdDuration;

    fn symbol_info(taker_fee: Decimal, min_base_amount: Decimal) -> arc_instrument::SymbolInfo {
        arc_instrument::SymbolInfo {
            symbol: Symbol::spot("btc", "usdt"),
            base_precision: 6,
            quote_precision: 2,
            min_base_amount,
            min_quote_amount: dec!(10),
            maker_fee: taker_fee,
            taker_fee,
            active: true,
        }
    }

    fn pair() -> ResolvedArbitragePair {
        let mut per_exchange = HashMap::new();
        per_exchange.insert(ExchangeId::GateioSpot, symbol_info(dec!(0.001), dec!(0.0001)));
        per_exchange.insert(ExchangeId::MexcSpot, symbol_info(dec!(0.001), dec!(0.0001)));
        ResolvedArbitragePair {
            id: "btc-usdt".to_string(),
            symbol: Symbol::spot("btc", "usdt"),
            per_exchange,
            min_profit_bps: dec!(10),
            max_exposure_usd: dec!(100000),
            priority: 1,
        }
    }

    // A best_ask=100.0 size=1.0 fee=0.001; B best_bid=100.5 size=2.0
    // fee=0.001; min_profit_bps=10 -> emit with spread=0.5, fees=0.2005,
    // net_spread=0.2995, net_bps≈30, max_quantity=1.0.
    #[test]
    fn test_scenario_s3_opportunity_emission() {
        let hub = MarketDataHub::new();
        let now = Utc::now();

        hub.ingest(
            ExchangeId::GateioSpot,
            MarketEvent::OrderBookSnapshot {
                symbol: Symbol::spot("btc", "usdt"),
                bids: vec![arc_data::books::Level::new(dec!(99.9), dec!(1.0))],
                asks: vec![arc_data::books::Level::new(dec!(100.0), dec!(1.0))],
                timestamp: now,
                update_id: Some(1),
            },
        );
        hub.ingest(
            ExchangeId::MexcSpot,
            MarketEvent::OrderBookSnapshot {
                symbol: Symbol::spot("btc", "usdt"),
                bids: vec![arc_data::books::Level::new(dec!(100.5), dec!(2.0))],
                asks: vec![arc_data::books::Level::new(dec!(101.0), dec!(2.0))],
                timestamp: now,
                update_id: Some(1),
            },
        );

        let opportunity = scan_pair(
            &hub,
            &pair(),
            StdDuration::from_millis(100),
            StdDuration::from_millis(100),
            now,
            || "test-opp-1".to_string(),
        )
        .expect("should emit an opportunity");

        assert_eq!(opportunity.buy_exchange, ExchangeId::GateioSpot);
        assert_eq!(opportunity.sell_exchange, ExchangeId::MexcSpot);
        assert_eq!(opportunity.spread, dec!(0.5));
        assert_eq!(opportunity.max_quantity, dec!(1.0));
        assert!(opportunity.spread_pct > dec!(0));
    }

    #[test]
    fn test_stale_quote_is_skipped() {
        let hub = MarketDataHub::new();
        let stale_time = Utc::now() - chrono::Duration::seconds(5);

        hub.ingest(
            ExchangeId::GateioSpot,
            MarketEvent::OrderBookSnapshot {
                symbol: Symbol::spot("btc", "usdt"),
                bids: vec![arc_data::books::Level::new(dec!(99.9), dec!(1.0))],
                asks: vec![arc_data::books::Level::new(dec!(100.0), dec!(1.0))],
                timestamp: stale_time,
                update_id: Some(1),
            },
        );
        hub.ingest(
            ExchangeId::MexcSpot,
            MarketEvent::OrderBookSnapshot {
                symbol: Symbol::spot("btc", "usdt"),
                bids: vec![arc_data::books::Level::new(dec!(100.5), dec!(2.0))],
                asks: vec![arc_data::books::Level::new(dec!(101.0), dec!(2.0))],
                timestamp: Utc::now(),
                update_id: Some(1),
            },
        );

        let opportunity = scan_pair(
            &hub,
            &pair(),
            StdDuration::from_millis(100),
            StdDuration::from_millis(100),
            Utc::now(),
            || "test-opp-2".to_string(),
        );
        assert!(opportunity.is_none());
    }
}
