//! Time-indexed event store
//!
//! Lists of events keyed by block-time instant. A list is appended to until
//! its instant is reached, then read and deleted in one step, so an event is
//! released at most once and never before its instant.

use crate::event::{decode_list, encode_list, Event};
use crate::keys::{event_key, parse_event_key, EVENT_PREFIX};
use cadence_core::{check_instant, KvStore, Scheduler, SchedulingError, StoreError};

/// Events scheduled at exactly `instant`, without removing them
pub fn peek<S: KvStore + ?Sized>(store: &S, instant: i64) -> Result<Vec<Event>, StoreError> {
    if instant < 0 {
        return Ok(Vec::new());
    }
    match store.get(&event_key(instant))? {
        Some(bytes) => decode_list(&bytes),
        None => Ok(Vec::new()),
    }
}

/// Instants at or before `until` that still hold events, ascending
pub fn due_instants<S: KvStore + ?Sized>(store: &S, until: i64) -> Result<Vec<i64>, StoreError> {
    let mut instants = Vec::new();
    for (key, _) in store.scan_prefix(EVENT_PREFIX)? {
        let instant = parse_event_key(&key).ok_or_else(|| {
            StoreError::Unmarshal(format!(
                "malformed event key {}",
                String::from_utf8_lossy(&key)
            ))
        })?;
        if instant > until {
            break;
        }
        instants.push(instant);
    }
    Ok(instants)
}

/// Up to `limit` scheduled lists, earliest first
pub fn pending<S: KvStore + ?Sized>(
    store: &S,
    limit: usize,
) -> Result<Vec<(i64, Vec<Event>)>, StoreError> {
    store
        .scan_prefix(EVENT_PREFIX)?
        .into_iter()
        .take(limit)
        .map(|(key, bytes)| {
            let instant = parse_event_key(&key).ok_or_else(|| {
                StoreError::Unmarshal(format!(
                    "malformed event key {}",
                    String::from_utf8_lossy(&key)
                ))
            })?;
            Ok((instant, decode_list(&bytes)?))
        })
        .collect()
}

pub struct EventStore<'a, S: KvStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: KvStore + ?Sized> EventStore<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Append `event` to the list at `instant`, creating the list if needed
    pub fn register_at(&mut self, instant: i64, event: Event, now: i64) -> Result<(), SchedulingError> {
        check_instant(instant, now)?;

        let key = event_key(instant);
        let mut events = match self.store.get(&key)? {
            Some(bytes) => decode_list(&bytes)?,
            None => Vec::new(),
        };
        let kind = event.kind();
        events.push(event);
        self.store.set(&key, encode_list(&events)?)?;

        log::debug!(
            "Scheduled {} event at {} ({} pending at that instant)",
            kind.name(),
            instant,
            events.len()
        );
        Ok(())
    }

    /// Remove and return the list at exactly `instant`; empty on a second call
    pub fn take_due(&mut self, instant: i64) -> Result<Vec<Event>, StoreError> {
        if instant < 0 {
            return Ok(Vec::new());
        }
        let key = event_key(instant);
        match self.store.get(&key)? {
            Some(bytes) => {
                let events = decode_list(&bytes)?;
                self.store.delete(&key)?;
                Ok(events)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Take every list due at or before `until`, earliest instant first.
    /// Nothing is deleted unless every due list decodes.
    pub fn take_all_due(&mut self, until: i64) -> Result<Vec<Event>, StoreError> {
        let instants = due_instants(&*self.store, until)?;
        let mut released = Vec::new();
        for &instant in &instants {
            released.extend(peek(&*self.store, instant)?);
        }
        for instant in instants {
            self.store.delete(&event_key(instant))?;
        }
        Ok(released)
    }

    pub fn peek(&self, instant: i64) -> Result<Vec<Event>, StoreError> {
        peek(&*self.store, instant)
    }

    pub fn due_instants(&self, until: i64) -> Result<Vec<i64>, StoreError> {
        due_instants(&*self.store, until)
    }
}

impl<S: KvStore + ?Sized> Scheduler<Event> for EventStore<'_, S> {
    fn register_at(&mut self, instant: i64, event: Event, now: i64) -> Result<(), SchedulingError> {
        EventStore::register_at(self, instant, event, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ProposalDecideEvent, ReturnCoinEvent, ReturnKind};
    use cadence_core::{Coin, MemoryStore};

    fn proposal(id: &str) -> Event {
        Event::ProposalDecide(ProposalDecideEvent {
            proposal_id: id.to_string(),
        })
    }

    fn refund(amount: u64) -> Event {
        Event::ReturnCoin(ReturnCoinEvent {
            account: "carol".to_string(),
            amount: Coin::new(amount),
            kind: ReturnKind::Saving,
        })
    }

    #[test]
    fn test_same_instant_is_fifo() {
        let mut store = MemoryStore::new();
        let mut events = EventStore::new(&mut store);
        events.register_at(100, proposal("a"), 50).unwrap();
        events.register_at(100, refund(5), 60).unwrap();
        events.register_at(100, proposal("b"), 100).unwrap();

        assert_eq!(events.peek(100).unwrap().len(), 3);
        assert_eq!(
            events.take_due(100).unwrap(),
            vec![proposal("a"), refund(5), proposal("b")]
        );
    }

    #[test]
    fn test_take_due_is_at_most_once() {
        let mut store = MemoryStore::new();
        let mut events = EventStore::new(&mut store);
        events.register_at(10, refund(1), 0).unwrap();

        assert_eq!(events.take_due(10).unwrap(), vec![refund(1)]);
        assert!(events.take_due(10).unwrap().is_empty());
        assert!(events.peek(10).unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_past_instant_rejected() {
        let mut store = MemoryStore::new();
        let mut events = EventStore::new(&mut store);
        let err = events.register_at(99, refund(1), 100).unwrap_err();
        assert_eq!(err, SchedulingError::ExpiredEvent { instant: 99, now: 100 });
        assert!(store.is_empty());
    }

    #[test]
    fn test_take_all_due_orders_by_instant() {
        let mut store = MemoryStore::new();
        let mut events = EventStore::new(&mut store);
        events.register_at(300, proposal("late"), 0).unwrap();
        events.register_at(20, proposal("early"), 0).unwrap();
        events.register_at(100, proposal("middle"), 0).unwrap();
        events.register_at(20, refund(2), 0).unwrap();

        assert_eq!(events.due_instants(100).unwrap(), vec![20, 100]);
        let released = events.take_all_due(100).unwrap();
        assert_eq!(
            released,
            vec![proposal("early"), refund(2), proposal("middle")]
        );
        assert!(events.take_all_due(100).unwrap().is_empty());

        let remaining = pending(&store, 10).unwrap();
        assert_eq!(remaining, vec![(300, vec![proposal("late")])]);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut store = MemoryStore::new();
        EventStore::new(&mut store)
            .register_at(5, refund(3), 0)
            .unwrap();
        assert_eq!(peek(&store, 5).unwrap(), vec![refund(3)]);
        assert_eq!(peek(&store, 5).unwrap(), vec![refund(3)]);
        assert!(peek(&store, 6).unwrap().is_empty());
    }
}
