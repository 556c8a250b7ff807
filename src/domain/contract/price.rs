use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

const SECONDS_PER_DAY: u64 = 86_400;
const NANOS_SCALE: u32 = 9;
const PRICE_DECIMALS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("storage period is zero")]
    ZeroPeriod,

    #[error("file size is zero")]
    ZeroSize,

    #[error("price out of range: {0}")]
    Overflow(String),
}

/// Reward rate of an order in TON per day per GB.
///
/// `(total_rewards / 1e9) / (storage_period / 86400) / (file_size / 1e9)`,
/// rounded half away from zero to five decimal places.
pub fn order_price(
    total_rewards: u128,
    storage_period: u64,
    file_size: u64,
) -> Result<Decimal, PriceError> {
    if storage_period == 0 {
        return Err(PriceError::ZeroPeriod);
    }
    if file_size == 0 {
        return Err(PriceError::ZeroSize);
    }

    let rewards = i128::try_from(total_rewards)
        .ok()
        .and_then(|nanos| Decimal::try_from_i128_with_scale(nanos, NANOS_SCALE).ok())
        .ok_or_else(|| PriceError::Overflow(format!("total rewards {}", total_rewards)))?;
    let days = Decimal::from(storage_period)
        .checked_div(Decimal::from(SECONDS_PER_DAY))
        .ok_or_else(|| PriceError::Overflow(format!("storage period {}", storage_period)))?;
    let gigabytes = Decimal::from_i128_with_scale(i128::from(file_size), NANOS_SCALE);

    rewards
        .checked_div(days)
        .and_then(|per_day| per_day.checked_div(gigabytes))
        .map(|price| {
            price.round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
        })
        .ok_or_else(|| {
            PriceError::Overflow(format!(
                "rewards {} over {}s for {} bytes",
                total_rewards, storage_period, file_size
            ))
        })
}

/// Price as stored in the orders table
pub fn order_price_f64(
    total_rewards: u128,
    storage_period: u64,
    file_size: u64,
) -> Result<f64, PriceError> {
    let price = order_price(total_rewards, storage_period, file_size)?;
    price
        .to_f64()
        .ok_or_else(|| PriceError::Overflow(price.to_string()))
}
