//! The batch decrement script and its reply format.
//!
//! `KEYS[i]` is a stock counter and `ARGV[i]` the quantity to take from it.
//! The script checks every counter before writing any, so a batch is either
//! applied in full or not at all.
//!
//! Replies:
//! - `{0, i, available}` when line `i` (1-based) cannot be served
//! - `{1, previous_1, next_1, previous_2, next_2, ...}` when applied

use storefront_core::stock::{AtomicDecrement, CounterStep, PlanShortfall};
use storefront_core::{Result, ShopError};

/// Lua source of the batch decrement.
pub const DECREMENT_SCRIPT: &str = r#"
for i = 1, #KEYS do
  local qty = tonumber(ARGV[i]) or 0
  if qty <= 0 then
    return {0, i, -1}
  end
  local current = tonumber(redis.call("GET", KEYS[i]) or "0") or 0
  if current < 0 then
    current = 0
  end
  if current < qty then
    return {0, i, current}
  end
end

local out = {1}
for i = 1, #KEYS do
  local qty = tonumber(ARGV[i]) or 0
  local current = tonumber(redis.call("GET", KEYS[i]) or "0") or 0
  if current < 0 then
    current = 0
  end
  local next = current - qty
  if next < 0 then
    next = 0
  end
  redis.call("SET", KEYS[i], next)
  table.insert(out, current)
  table.insert(out, next)
end
return out
"#;

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Decode a script reply for a batch of `lines` counters.
///
/// # Errors
///
/// Returns [`ShopError::Kv`] if the reply does not have the expected shape.
pub fn parse_reply(reply: &[i64], lines: usize) -> Result<AtomicDecrement> {
    match reply.first() {
        Some(1) => {
            let pairs = &reply[1..];
            if pairs.len() != lines * 2 {
                return Err(ShopError::Kv(format!(
                    "decrement script returned {} values for {lines} counters",
                    pairs.len()
                )));
            }
            Ok(AtomicDecrement::Applied(
                pairs
                    .chunks_exact(2)
                    .map(|pair| CounterStep {
                        previous: non_negative(pair[0]),
                        next: non_negative(pair[1]),
                    })
                    .collect(),
            ))
        }
        Some(0) => {
            let position = reply
                .get(1)
                .copied()
                .ok_or_else(|| ShopError::Kv("decrement script reply has no index".into()))?;
            let index = usize::try_from(position.max(1) - 1).unwrap_or(0);
            Ok(AtomicDecrement::Insufficient(PlanShortfall {
                index,
                available: non_negative(reply.get(2).copied().unwrap_or(0)),
            }))
        }
        _ => Err(ShopError::Kv(format!("unexpected decrement script reply: {reply:?}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_applied_reply() {
        let outcome = parse_reply(&[1, 3, 1, 1, 0], 2).unwrap();
        assert_eq!(
            outcome,
            AtomicDecrement::Applied(vec![
                CounterStep { previous: 3, next: 1 },
                CounterStep { previous: 1, next: 0 },
            ])
        );
    }

    #[test]
    fn test_insufficient_reply_is_zero_based() {
        let outcome = parse_reply(&[0, 2, 1], 2).unwrap();
        assert_eq!(
            outcome,
            AtomicDecrement::Insufficient(PlanShortfall { index: 1, available: 1 })
        );
    }

    #[test]
    fn test_invalid_quantity_reports_zero_available() {
        let outcome = parse_reply(&[0, 1, -1], 1).unwrap();
        assert_eq!(
            outcome,
            AtomicDecrement::Insufficient(PlanShortfall { index: 0, available: 0 })
        );
    }

    #[test]
    fn test_malformed_replies() {
        assert!(parse_reply(&[], 1).is_err());
        assert!(parse_reply(&[1, 3], 1).is_err());
        assert!(parse_reply(&[0], 1).is_err());
        assert!(parse_reply(&[7, 0, 0], 1).is_err());
    }
}
