//! Per-token position replay.
//!
//! A position is derived, never persisted: it is recomputed from the event
//! log on every read so it cannot drift from the source of truth.

use crate::domain::event::{Event, TradeAction};
use serde::Serialize;
use std::collections::HashSet;

/// Remaining quantity below this is treated as fully closed. A flat cutoff
/// ignoring per-instrument decimal precision; configurable via
/// `[position] dust_threshold`.
pub const DEFAULT_DUST_THRESHOLD: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenPosition {
    pub symbol: String,
    pub num_trades: usize,
    pub num_buys: usize,
    pub num_sells: usize,
    pub total_bought_qty: f64,
    pub total_sold_qty: f64,
    pub net_realized_pnl: f64,
    pub remaining_qty: f64,
    pub is_closed: bool,
    pub avg_buy_price: f64,
    pub avg_sell_price: f64,
}

/// Replay an account's trades in one instrument.
///
/// Trades are walked ascending by time and deduplicated by signature: a
/// signature seen more than once contributes once to every total, however
/// many duplicate log entries upstream re-delivery produced.
///
/// `net_realized_pnl` is net cash flow (quote received minus quote spent),
/// not a matched-lot FIFO allocation; unrealized PnL on an open remainder
/// needs a current price and lives outside this module.
pub fn compute(events: &[Event], symbol: &str, dust_threshold: f64) -> TokenPosition {
    let mut trades: Vec<&Event> = events
        .iter()
        .filter(|e| {
            e.trade_record()
                .is_some_and(|t| t.symbol.eq_ignore_ascii_case(symbol))
        })
        .collect();
    trades.sort_by_key(|e| e.occurred_at);

    let mut seen: HashSet<&str> = HashSet::new();
    let mut num_buys = 0usize;
    let mut num_sells = 0usize;
    let mut total_bought_qty = 0.0;
    let mut total_sold_qty = 0.0;
    let mut total_bought_quote = 0.0;
    let mut total_sold_quote = 0.0;

    for event in trades {
        let Some(trade) = event.trade_record() else {
            continue;
        };
        if !seen.insert(trade.signature.as_str()) {
            continue;
        }

        match trade.action {
            TradeAction::Buy => {
                num_buys += 1;
                total_bought_qty += trade.base_amount;
                total_bought_quote += trade.quote_amount;
            }
            TradeAction::Sell => {
                num_sells += 1;
                total_sold_qty += trade.base_amount;
                total_sold_quote += trade.quote_amount;
            }
        }
    }

    let remaining_qty = total_bought_qty - total_sold_qty;
    let avg_buy_price = if total_bought_qty > 0.0 {
        total_bought_quote / total_bought_qty
    } else {
        0.0
    };
    let avg_sell_price = if total_sold_qty > 0.0 {
        total_sold_quote / total_sold_qty
    } else {
        0.0
    };

    TokenPosition {
        symbol: symbol.to_string(),
        num_trades: num_buys + num_sells,
        num_buys,
        num_sells,
        total_bought_qty,
        total_sold_qty,
        net_realized_pnl: total_sold_quote - total_bought_quote,
        remaining_qty,
        is_closed: remaining_qty.abs() < dust_threshold,
        avg_buy_price,
        avg_sell_price,
    }
}
