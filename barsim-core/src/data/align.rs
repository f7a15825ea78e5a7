//! Multi-symbol time alignment.
//!
//! Given bars for multiple symbols, align them to a common timeline. A symbol
//! missing a timestamp after its first bar is padded with its previous bar,
//! re-stamped to the missing time. Timestamps before a symbol's first bar stay
//! empty for that symbol.

use crate::domain::Bar;
use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};

/// Bars for multiple symbols on a common timeline.
#[derive(Debug)]
pub struct AlignedData {
    /// The common time axis (sorted ascending).
    pub timeline: Vec<NaiveDateTime>,
    /// Per symbol: index into `timeline` of its first bar.
    pub first_index: HashMap<String, usize>,
    /// Per symbol: bars from `first_index` to the end of the timeline.
    pub bars: HashMap<String, Vec<Bar>>,
}

/// Align sorted per-symbol series to the union of their timestamps.
pub fn align_symbols(symbol_bars: &HashMap<String, Vec<Bar>>) -> AlignedData {
    let timeline: Vec<NaiveDateTime> = symbol_bars
        .values()
        .flat_map(|bars| bars.iter().map(|b| b.timestamp))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut first_index = HashMap::new();
    let mut aligned = HashMap::new();

    for (symbol, bars) in symbol_bars {
        let Some(first) = bars.first() else {
            continue;
        };
        let start = timeline.partition_point(|t| *t < first.timestamp);
        let mut out = Vec::with_capacity(timeline.len() - start);
        let mut source = bars.iter().peekable();
        let mut last: Option<&Bar> = None;

        for &t in &timeline[start..] {
            if let Some(bar) = source.next_if(|b| b.timestamp == t) {
                last = Some(bar);
                out.push(bar.clone());
            } else if let Some(prev) = last {
                out.push(Bar {
                    timestamp: t,
                    ..prev.clone()
                });
            }
        }

        first_index.insert(symbol.clone(), start);
        aligned.insert(symbol.clone(), out);
    }

    AlignedData {
        timeline,
        first_index,
        bars: aligned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn bar(symbol: &str, day: u32, close: f64) -> Bar {
        Bar {
            symbol: symbol.into(),
            timestamp: ts(day),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn union_of_timestamps() {
        let mut data = HashMap::new();
        data.insert("A".to_string(), vec![bar("A", 1, 10.0), bar("A", 3, 12.0)]);
        data.insert("B".to_string(), vec![bar("B", 2, 20.0), bar("B", 3, 21.0)]);
        let aligned = align_symbols(&data);
        assert_eq!(aligned.timeline, vec![ts(1), ts(2), ts(3)]);
    }

    #[test]
    fn gaps_are_padded_with_previous_bar() {
        let mut data = HashMap::new();
        data.insert("A".to_string(), vec![bar("A", 1, 10.0), bar("A", 3, 12.0)]);
        data.insert("B".to_string(), vec![bar("B", 2, 20.0), bar("B", 3, 21.0)]);
        let aligned = align_symbols(&data);

        let a = &aligned.bars["A"];
        assert_eq!(a.len(), 3);
        assert_eq!(a[1].timestamp, ts(2));
        assert_eq!(a[1].close, 10.0);
        assert_eq!(a[2].close, 12.0);
    }

    #[test]
    fn late_starting_symbol_has_no_leading_bars() {
        let mut data = HashMap::new();
        data.insert("A".to_string(), vec![bar("A", 1, 10.0), bar("A", 2, 11.0)]);
        data.insert("B".to_string(), vec![bar("B", 2, 20.0)]);
        let aligned = align_symbols(&data);

        assert_eq!(aligned.first_index["A"], 0);
        assert_eq!(aligned.first_index["B"], 1);
        assert_eq!(aligned.bars["B"].len(), 1);
    }
}
