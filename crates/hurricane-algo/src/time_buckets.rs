//! Append-only allocation of time bucket ids.

use hurricane_core::{EventRecord, HurricaneError, HurricaneResult, TimeBucket, TimeId, TimeKey};
use std::collections::{HashMap, HashSet};

/// Distinct time keys of `events`, in first-seen order.
pub fn derive_time_keys<'a>(events: impl IntoIterator<Item = &'a EventRecord>) -> Vec<TimeKey> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .map(EventRecord::time_key)
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Result of one allocation round.
#[derive(Debug, Clone)]
pub struct Allocation {
    /// Existing buckets followed by the new ones.
    pub ledger: Vec<TimeBucket>,
    pub added: usize,
}

/// Give every key not yet in `existing` a fresh id.
///
/// New ids start at `max(existing id) + 1` (1 for an empty ledger) and
/// increase in the order keys are supplied. Existing buckets are returned
/// untouched, so ids already handed out never change. A ledger holding the
/// same id or key twice is a [`HurricaneError::Integrity`] error.
pub fn allocate_time_buckets(
    existing: Vec<TimeBucket>,
    keys: impl IntoIterator<Item = TimeKey>,
) -> HurricaneResult<Allocation> {
    let mut known: HashSet<TimeKey> = HashSet::with_capacity(existing.len());
    let mut ids = HashSet::with_capacity(existing.len());
    for bucket in &existing {
        if !ids.insert(bucket.id) || !known.insert(bucket.key.clone()) {
            return Err(HurricaneError::Integrity(format!(
                "time ledger repeats bucket {} ({:?})",
                bucket.id.value(),
                bucket.key
            )));
        }
    }

    let mut next_id = existing.iter().map(|b| b.id.value()).max().unwrap_or(0) + 1;
    let mut ledger = existing;
    let before = ledger.len();
    for key in keys {
        if known.insert(key.clone()) {
            ledger.push(TimeBucket {
                id: TimeId::new(next_id),
                key,
            });
            next_id += 1;
        }
    }
    let added = ledger.len() - before;
    Ok(Allocation { ledger, added })
}

/// Lookup from time key to bucket id.
pub fn bucket_index(ledger: &[TimeBucket]) -> HashMap<&TimeKey, TimeId> {
    ledger.iter().map(|bucket| (&bucket.key, bucket.id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn key(period: &str, day: u32) -> TimeKey {
        TimeKey::from_event(period, NaiveDate::from_ymd_opt(2021, 6, day).unwrap())
    }

    #[test]
    fn empty_ledger_starts_at_one() {
        let allocation =
            allocate_time_buckets(Vec::new(), vec![key("Manhã", 1), key("Tarde", 1)]).unwrap();
        let ids: Vec<u64> = allocation.ledger.iter().map(|b| b.id.value()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(allocation.added, 2);
    }

    #[test]
    fn overlapping_batch_keeps_existing_ids() {
        let first = allocate_time_buckets(Vec::new(), vec![key("Manhã", 1), key("Noite", 2)])
            .unwrap()
            .ledger;
        let second = allocate_time_buckets(
            first.clone(),
            vec![key("Noite", 2), key("Tarde", 3), key("Tarde", 3)],
        )
        .unwrap();
        assert_eq!(&second.ledger[..2], &first[..]);
        assert_eq!(second.added, 1);
        assert_eq!(second.ledger[2].id, TimeId::new(3));
        assert_eq!(second.ledger[2].key, key("Tarde", 3));
    }

    #[test]
    fn ids_continue_after_gaps() {
        let existing = vec![TimeBucket {
            id: TimeId::new(40),
            key: key("Manhã", 1),
        }];
        let allocation = allocate_time_buckets(existing, vec![key("Manhã", 2)]).unwrap();
        assert_eq!(allocation.ledger[1].id, TimeId::new(41));
    }

    #[test]
    fn repeated_ledger_ids_are_rejected() {
        let existing = vec![
            TimeBucket {
                id: TimeId::new(1),
                key: key("Manhã", 1),
            },
            TimeBucket {
                id: TimeId::new(1),
                key: key("Manhã", 2),
            },
        ];
        assert!(allocate_time_buckets(existing, Vec::new()).is_err());
    }
}
