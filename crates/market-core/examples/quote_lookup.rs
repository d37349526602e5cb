//! Quote lookup example
//!
//! Looks up a ticker (or resolves a company name first), prints the quote
//! with the provider attempts behind it, and a short company background.
//!
//! To run this example:
//! ```bash
//! # Both keys are optional; without them the demo table is used
//! export FMP_API_KEY=your_key_here
//! export ALPHA_VANTAGE_API_KEY=your_key_here
//!
//! cargo run --example quote_lookup NVDA
//! cargo run --example quote_lookup "Apple"
//! ```

use market_core::{MarketData, MarketDataConfig};
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    market_utils::init_tracing();

    let input = env::args().nth(1).unwrap_or_else(|| "NVDA".to_string());

    let config = MarketDataConfig::from_env()?;
    println!("Configuration: {config:#?}\n");

    let market = MarketData::from_config(config)?;

    // Tickers are short and alphanumeric; anything else is treated as a name
    let looks_like_ticker = input.len() <= 5 && input.chars().all(|c| c.is_ascii_alphanumeric());
    let symbol = if looks_like_ticker {
        input.clone()
    } else {
        let candidates = market.resolve(&input).await;
        println!("Candidates for {input:?}:");
        for candidate in &candidates {
            println!(
                "  {:<10} {} ({})",
                candidate.symbol,
                candidate.display_name,
                candidate.exchange.as_deref().unwrap_or("-")
            );
        }
        match candidates.first() {
            Some(best) => best.symbol.clone(),
            None => {
                println!("  (none)");
                return Ok(());
            },
        }
    };

    let trace = market.get_quote_traced(&symbol).await;
    let quote = &trace.quote;

    println!("\n=== {} ===", quote.symbol);
    match quote.price {
        Some(price) => println!("Price:   {price} {}", quote.currency.as_deref().unwrap_or("")),
        None => println!("Price:   unavailable"),
    }
    if let (Some(change), Some(percent)) = (quote.change, quote.percent_change) {
        println!("Change:  {change} ({percent}%)");
    }
    println!("Source:  {}", quote.source);

    println!("\nAttempts:");
    for attempt in &trace.attempts {
        println!("  {:<14} {:?}", attempt.provider.to_string(), attempt.outcome);
    }

    let subject = quote.company_name.clone().unwrap_or_else(|| input.clone());
    if let Some(context) = market.get_context(&subject).await {
        println!("\n{}:\n{}", context.subject_name, context.text);
    }

    Ok(())
}
