//! Static demo quotes served when every live provider fails
//!
//! Values are illustrative snapshots, not market data. Lookups are exact
//! matches on the uppercase ticker.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::model::{Quote, SourceTag};

struct DemoRecord {
    symbol: &'static str,
    company_name: &'static str,
    exchange: &'static str,
    price: Decimal,
    change: Decimal,
    percent_change: Decimal,
}

const DEMO_TABLE: &[DemoRecord] = &[
    DemoRecord {
        symbol: "NVDA",
        company_name: "NVIDIA Corporation",
        exchange: "NASDAQ",
        price: dec!(875.28),
        change: dec!(12.50),
        percent_change: dec!(1.4489),
    },
    DemoRecord {
        symbol: "AAPL",
        company_name: "Apple Inc.",
        exchange: "NASDAQ",
        price: dec!(189.84),
        change: dec!(2.31),
        percent_change: dec!(1.2318),
    },
    DemoRecord {
        symbol: "MSFT",
        company_name: "Microsoft Corporation",
        exchange: "NASDAQ",
        price: dec!(415.50),
        change: dec!(-3.20),
        percent_change: dec!(-0.7643),
    },
    DemoRecord {
        symbol: "GOOGL",
        company_name: "Alphabet Inc.",
        exchange: "NASDAQ",
        price: dec!(171.95),
        change: dec!(0.85),
        percent_change: dec!(0.4968),
    },
    DemoRecord {
        symbol: "TSLA",
        company_name: "Tesla, Inc.",
        exchange: "NASDAQ",
        price: dec!(177.46),
        change: dec!(-4.12),
        percent_change: dec!(-2.2690),
    },
];

/// Demo quote for an exact uppercase ticker, stamped with the current time
pub fn demo_quote(symbol: &str) -> Option<Quote> {
    DEMO_TABLE
        .iter()
        .find(|record| record.symbol == symbol)
        .map(|record| Quote {
            symbol: record.symbol.to_string(),
            company_name: Some(record.company_name.to_string()),
            exchange: Some(record.exchange.to_string()),
            price: Some(record.price),
            change: Some(record.change),
            percent_change: Some(record.percent_change),
            currency: Some("USD".to_string()),
            retrieved_at: Utc::now(),
            source: SourceTag::Demo,
        })
}

/// Tickers present in the demo table
pub fn demo_symbols() -> impl Iterator<Item = &'static str> {
    DEMO_TABLE.iter().map(|record| record.symbol)
}
