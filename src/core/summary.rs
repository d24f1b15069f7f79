//! Cross-currency summary: pairwise rates and per-base totals.
use crate::core::currency::{CurrencyCode, RateTable};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::BTreeMap;

/// Fractional digits kept in every computed figure.
pub const SUMMARY_DECIMALS: u32 = 4;

/// A consistent view of balances, pair rates and totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub amounts: BTreeMap<CurrencyCode, Decimal>,
    /// Keyed `"C2-C1"`: how many units of C1 one unit of C2 buys.
    pub rates: BTreeMap<String, Decimal>,
    /// Value of all balances expressed in each base currency.
    pub total: BTreeMap<CurrencyCode, Decimal>,
}

fn round(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(SUMMARY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(SUMMARY_DECIMALS);
    rounded
}

/// Computes `rate[c2] / rate[c1]` for every ordered pair of distinct balance
/// currencies. Pairs with a missing or zero rate are omitted.
pub fn pair_rates(
    balances: &BTreeMap<CurrencyCode, Decimal>,
    rates: &RateTable,
) -> BTreeMap<String, Decimal> {
    let mut pairs = BTreeMap::new();
    for c1 in balances.keys() {
        for c2 in balances.keys() {
            if c1 == c2 {
                continue;
            }
            let (Some(r1), Some(r2)) = (rates.get(c1), rates.get(c2)) else {
                continue;
            };
            if let Some(rate) = r2.checked_div(*r1) {
                pairs.insert(format!("{c2}-{c1}"), round(rate));
            }
        }
    }
    pairs
}

/// Computes, for each currency in the rate table, the sum of all balances
/// converted into it. Balances without a rate contribute nothing.
pub fn totals(
    balances: &BTreeMap<CurrencyCode, Decimal>,
    rates: &RateTable,
) -> BTreeMap<CurrencyCode, Decimal> {
    rates
        .iter()
        .filter_map(|(base, base_rate)| {
            let mut total = Decimal::ZERO;
            for (code, amount) in balances {
                let Some(rate) = rates.get(code) else {
                    continue;
                };
                let term = amount.checked_mul(*rate)?.checked_div(*base_rate)?;
                total = total.checked_add(term)?;
            }
            Some((base.clone(), round(total)))
        })
        .collect()
}

pub fn summarize(balances: &BTreeMap<CurrencyCode, Decimal>, rates: &RateTable) -> Summary {
    Summary {
        amounts: balances.clone(),
        rates: pair_rates(balances, rates),
        total: totals(balances, rates),
    }
}

impl Summary {
    /// Renders the summary as plain text for log output.
    pub fn render_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        for (code, amount) in &self.amounts {
            lines.push(format!("{}: {}", code.as_str().to_lowercase(), amount));
        }
        lines.push(String::new());

        for (pair, rate) in &self.rates {
            lines.push(format!("{}: {}", pair.to_lowercase(), rate));
        }
        lines.push(String::new());

        let parts: Vec<String> = self
            .amounts
            .keys()
            .filter_map(|code| {
                self.total
                    .get(code)
                    .map(|total| format!("{total:.4} {}", code.as_str().to_lowercase()))
            })
            .collect();
        lines.push(format!("sum: {}", parts.join(" / ")));

        lines.join("\n")
    }
}
