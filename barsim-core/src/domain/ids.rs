use serde::{Deserialize, Serialize};
use std::fmt;

/// Order ID, assigned by the matching engine at submission.
///
/// Strictly increasing within one simulation run; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Monotonic order ID generator. The first ID handed out is 1.
#[derive(Debug, Clone, Default)]
pub struct IdGen {
    last: u64,
}

impl IdGen {
    pub fn next_order_id(&mut self) -> OrderId {
        self.last += 1;
        OrderId(self.last)
    }

    /// The most recently issued ID, if any.
    pub fn last_issued(&self) -> Option<OrderId> {
        (self.last > 0).then_some(OrderId(self.last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut gen = IdGen::default();
        assert_eq!(gen.last_issued(), None);
        assert_eq!(gen.next_order_id(), OrderId(1));
        assert_eq!(gen.next_order_id(), OrderId(2));
        assert_eq!(gen.last_issued(), Some(OrderId(2)));
    }

    #[test]
    fn order_ids_sort_by_submission() {
        assert!(OrderId(3) < OrderId(10));
        assert_eq!(OrderId(7).to_string(), "7");
    }
}
