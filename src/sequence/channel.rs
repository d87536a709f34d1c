// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ConfigurationError;

/// Card-qualified channel address, e.g. `dio0[3]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId {
    pub card: String,
    pub index: usize,
}

impl ChannelId {
    pub fn new(card: impl Into<String>, index: usize) -> Self {
        Self {
            card: card.into(),
            index,
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.card, self.index)
    }
}

/// Whether a card drives digital lines or analog outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Digital,
    Analog,
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Digital => "digital",
            CardKind::Analog => "analog",
        }
    }
}

/// One output line of a card.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
}

/// A hardware card and the channels it provides.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub name: String,
    pub kind: CardKind,
    pub address: Option<String>,
    /// Native analog sample rate in samples per millisecond, when the backend resamples.
    pub sample_rate: Option<f64>,
    pub channels: Vec<Channel>,
}

impl Card {
    /// A card whose channels are indexed in the order their display names are given.
    pub fn new<I, S>(name: impl Into<String>, kind: CardKind, channel_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let channels = channel_names
            .into_iter()
            .enumerate()
            .map(|(index, display)| Channel {
                id: ChannelId::new(name.clone(), index),
                name: display.into(),
            })
            .collect();
        Self {
            name,
            kind,
            address: None,
            sample_rate: None,
            channels,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// Every channel the configured hardware provides, by card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelRegistry {
    cards: IndexMap<String, Card>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_card(&mut self, card: Card) -> Result<(), ConfigurationError> {
        if self.cards.contains_key(&card.name) {
            return Err(ConfigurationError::DuplicateCard { name: card.name });
        }
        self.cards.insert(card.name.clone(), card);
        Ok(())
    }

    pub fn card(&self, name: &str) -> Option<&Card> {
        self.cards.get(name)
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    pub fn channel(&self, id: &ChannelId) -> Option<&Channel> {
        self.cards
            .get(&id.card)
            .and_then(|card| card.channels.get(id.index))
    }

    pub fn kind_of(&self, id: &ChannelId) -> Option<CardKind> {
        self.channel(id)
            .and_then(|_| self.cards.get(&id.card))
            .map(|card| card.kind)
    }
}
