//! Spoken rupee amounts in the Indian numbering system
//! (thousand, lakh = 10^5, crore = 10^7).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const ONES: [&str; 20] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Eleven",
    "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen", "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

const THOUSAND: u128 = 1_000;
const LAKH: u128 = 100_000;
const CRORE: u128 = 10_000_000;

/// Render `amount` as `"<Words> Rupees Only"`.
///
/// The amount is rounded to whole rupees first; paise are never spoken.
/// Negative amounts are prefixed with `"Minus"`.
pub fn amount_in_words(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let magnitude = rounded.abs().to_u128().unwrap_or_default();

    if magnitude == 0 {
        return "Zero Rupees Only".to_string();
    }

    let mut words = Vec::new();
    if rounded.is_sign_negative() {
        words.push("Minus");
    }
    push_words(magnitude, &mut words);
    words.push("Rupees");
    words.push("Only");
    words.join(" ")
}

fn push_words(n: u128, out: &mut Vec<&'static str>) {
    match n {
        0 => {}
        1..=19 => out.push(ONES[n as usize]),
        20..=99 => {
            out.push(TENS[(n / 10) as usize]);
            push_words(n % 10, out);
        }
        100..=999 => {
            out.push(ONES[(n / 100) as usize]);
            out.push("Hundred");
            push_words(n % 100, out);
        }
        _ if n < LAKH => split(n, THOUSAND, "Thousand", out),
        _ if n < CRORE => split(n, LAKH, "Lakh", out),
        _ => split(n, CRORE, "Crore", out),
    }
}

fn split(n: u128, unit: u128, name: &'static str, out: &mut Vec<&'static str>) {
    push_words(n / unit, out);
    out.push(name);
    push_words(n % unit, out);
}
