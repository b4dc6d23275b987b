use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for every stored monetary value.
pub const MONEY_SCALE: u32 = 2;

pub(crate) const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Round a currency value to two decimals, halves away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Negative inputs are treated as zero.
pub(crate) fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}
