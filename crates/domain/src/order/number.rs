//! Order numbers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Prefix shared by every generated order number.
pub const ORDER_NUMBER_PREFIX: &str = "ORD";

/// Human-facing unique order reference, e.g. `ORD-1718000000123456789`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates order numbers from the wall clock in nanoseconds, forced to be
/// strictly increasing so concurrent checkouts in one process never collide
/// even when the clock stalls or steps backwards.
#[derive(Debug, Default)]
pub struct OrderNumberGenerator {
    last: AtomicU64,
}

impl OrderNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next order number.
    pub fn next(&self) -> OrderNumber {
        let now = now_nanos();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last.saturating_add(1));
            match self.last.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return OrderNumber(format!("{ORDER_NUMBER_PREFIX}-{candidate}")),
                Err(actual) => last = actual,
            }
        }
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_numbers_carry_prefix() {
        let generator = OrderNumberGenerator::new();
        assert!(generator.next().as_str().starts_with("ORD-"));
    }

    #[test]
    fn test_numbers_strictly_increase() {
        let generator = OrderNumberGenerator::new();
        let parse = |n: OrderNumber| -> u64 { n.as_str()[4..].parse().unwrap() };

        let mut previous = parse(generator.next());
        for _ in 0..1_000 {
            let current = parse(generator.next());
            assert!(current > previous);
            previous = current;
        }
    }

    #[test]
    fn test_concurrent_generation_is_collision_free() {
        let generator = Arc::new(OrderNumberGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || (0..500).map(|_| generator.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for number in handle.join().unwrap() {
                assert!(seen.insert(number), "duplicate order number");
            }
        }
        assert_eq!(seen.len(), 4_000);
    }
}
