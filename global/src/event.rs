//! Deferred events
//!
//! Every effect another module can schedule is a variant of `Event`. Stored
//! events are encoded as a one-byte tag from `EventKind` followed by the
//! bincode payload, so the on-disk format does not depend on variant order.

use cadence_core::{rational_serde, Coin, Rational, StoreError};
use economics::{ContentValuationParams, GlobalAllocation};
use serde::{Deserialize, Serialize};

/// Why coins are being returned to an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnKind {
    VoterDeposit,
    ValidatorDeposit,
    DeveloperDeposit,
    Saving,
}

/// Credit `amount` back to `account`, e.g. a deposit unlocking in instalments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnCoinEvent {
    pub account: String,
    pub amount: Coin,
    pub kind: ReturnKind,
}

/// Pay the author their share of the reward window once the freezing period ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRewardEvent {
    pub author: String,
    pub post_id: String,
    pub consumer: String,
    pub original_payment: Coin,
    pub friction: Coin,
    pub evaluated: Coin,
    #[serde(with = "rational_serde")]
    pub penalty: Rational,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalDecideEvent {
    pub proposal_id: String,
}

/// Engine parameters governance may change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamChange {
    Valuation(ContentValuationParams),
    FrictionRate(#[serde(with = "rational_serde")] Rational),
    FreezingPeriod(i64),
    Allocation(GlobalAllocation),
    GrowthBounds {
        #[serde(with = "rational_serde")]
        floor: Rational,
        #[serde(with = "rational_serde")]
        ceiling: Rational,
    },
}

impl ParamChange {
    pub fn name(&self) -> &'static str {
        match self {
            ParamChange::Valuation(_) => "valuation",
            ParamChange::FrictionRate(_) => "friction_rate",
            ParamChange::FreezingPeriod(_) => "freezing_period",
            ParamChange::Allocation(_) => "allocation",
            ParamChange::GrowthBounds { .. } => "growth_bounds",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamChangeEvent {
    pub change: ParamChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ReturnCoin(ReturnCoinEvent),
    ContentReward(ContentRewardEvent),
    ProposalDecide(ProposalDecideEvent),
    ParamChange(ParamChangeEvent),
}

/// Serialization tag table. Tags are permanent; add new kinds at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ReturnCoin,
    ContentReward,
    ProposalDecide,
    ParamChange,
}

impl EventKind {
    pub const fn tag(self) -> u8 {
        match self {
            EventKind::ReturnCoin => 0x01,
            EventKind::ContentReward => 0x02,
            EventKind::ProposalDecide => 0x03,
            EventKind::ParamChange => 0x04,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(EventKind::ReturnCoin),
            0x02 => Some(EventKind::ContentReward),
            0x03 => Some(EventKind::ProposalDecide),
            0x04 => Some(EventKind::ParamChange),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::ReturnCoin => "return_coin",
            EventKind::ContentReward => "content_reward",
            EventKind::ProposalDecide => "proposal_decide",
            EventKind::ParamChange => "param_change",
        }
    }
}

fn marshal<T: Serialize>(kind: EventKind, payload: &T) -> Result<Vec<u8>, StoreError> {
    let body = bincode::serialize(payload)
        .map_err(|e| StoreError::Marshal(format!("{} event: {}", kind.name(), e)))?;
    let mut bytes = Vec::with_capacity(body.len() + 1);
    bytes.push(kind.tag());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

fn unmarshal<T: serde::de::DeserializeOwned>(kind: EventKind, body: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(body)
        .map_err(|e| StoreError::Unmarshal(format!("{} event: {}", kind.name(), e)))
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ReturnCoin(_) => EventKind::ReturnCoin,
            Event::ContentReward(_) => EventKind::ContentReward,
            Event::ProposalDecide(_) => EventKind::ProposalDecide,
            Event::ParamChange(_) => EventKind::ParamChange,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        match self {
            Event::ReturnCoin(e) => marshal(EventKind::ReturnCoin, e),
            Event::ContentReward(e) => marshal(EventKind::ContentReward, e),
            Event::ProposalDecide(e) => marshal(EventKind::ProposalDecide, e),
            Event::ParamChange(e) => marshal(EventKind::ParamChange, e),
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Event, StoreError> {
        let (&tag, body) = bytes
            .split_first()
            .ok_or_else(|| StoreError::Unmarshal("empty event record".to_string()))?;
        let kind = EventKind::from_tag(tag)
            .ok_or_else(|| StoreError::Unmarshal(format!("unknown event tag {:#04x}", tag)))?;

        Ok(match kind {
            EventKind::ReturnCoin => Event::ReturnCoin(unmarshal(kind, body)?),
            EventKind::ContentReward => Event::ContentReward(unmarshal(kind, body)?),
            EventKind::ProposalDecide => Event::ProposalDecide(unmarshal(kind, body)?),
            EventKind::ParamChange => Event::ParamChange(unmarshal(kind, body)?),
        })
    }
}

/// Encode the FIFO list stored under one instant
pub fn encode_list(events: &[Event]) -> Result<Vec<u8>, StoreError> {
    let encoded = events
        .iter()
        .map(Event::encode)
        .collect::<Result<Vec<_>, _>>()?;
    bincode::serialize(&encoded).map_err(|e| StoreError::Marshal(format!("event list: {}", e)))
}

pub fn decode_list(bytes: &[u8]) -> Result<Vec<Event>, StoreError> {
    let encoded: Vec<Vec<u8>> = bincode::deserialize(bytes)
        .map_err(|e| StoreError::Unmarshal(format!("event list: {}", e)))?;
    encoded.iter().map(|bytes| Event::decode(bytes)).collect()
}
