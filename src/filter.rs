//! Message admission allow-lists.
//!
//! Three independent dimensions are combined with logical AND. A dimension
//! with an empty list is disabled and places no constraint on the message.
//! Lists are immutable after startup, so lookups need no synchronization.

use std::fmt;

use ahash::AHashSet;

use crate::config::{FilterConfig, ListSetting};

/// The dimension an allow-list constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Exact match on the client identifier.
    ClientId,
    /// Exact match on the topic name.
    Topic,
    /// Case-sensitive substring match on the payload.
    PayloadKeyword,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::ClientId => "client",
            Dimension::Topic => "topic",
            Dimension::PayloadKeyword => "payload keyword",
        }
    }
}

/// An allow-list for one dimension.
#[derive(Clone)]
pub struct AllowList {
    dimension: Dimension,
    entries: Vec<String>,
    exact: AHashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(dimension: Dimension, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<String> = entries
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.is_empty())
            .collect();
        let exact = match dimension {
            Dimension::PayloadKeyword => AHashSet::new(),
            Dimension::ClientId | Dimension::Topic => entries.iter().cloned().collect(),
        };
        Self {
            dimension,
            entries,
            exact,
        }
    }

    pub fn from_setting(dimension: Dimension, setting: &ListSetting) -> Self {
        Self::new(dimension, setting.entries().iter().cloned())
    }

    /// A disabled list for the dimension.
    pub fn disabled(dimension: Dimension) -> Self {
        Self::new(dimension, Vec::<String>::new())
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Entries in configuration order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Whether `value` passes this list.
    #[inline]
    pub fn permits(&self, value: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }
        match self.dimension {
            Dimension::ClientId | Dimension::Topic => self.exact.contains(value),
            Dimension::PayloadKeyword => self.entries.iter().any(|kw| value.contains(kw.as_str())),
        }
    }
}

impl fmt::Debug for AllowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllowList")
            .field("dimension", &self.dimension)
            .field("entries", &self.entries)
            .finish()
    }
}

/// The combined message admission filter.
#[derive(Debug, Clone)]
pub struct MessageFilter {
    client_ids: AllowList,
    topics: AllowList,
    payload_keywords: AllowList,
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self {
            client_ids: AllowList::disabled(Dimension::ClientId),
            topics: AllowList::disabled(Dimension::Topic),
            payload_keywords: AllowList::disabled(Dimension::PayloadKeyword),
        }
    }
}

impl MessageFilter {
    pub fn new(client_ids: AllowList, topics: AllowList, payload_keywords: AllowList) -> Self {
        Self {
            client_ids,
            topics,
            payload_keywords,
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(
            AllowList::from_setting(Dimension::ClientId, &config.client_ids),
            AllowList::from_setting(Dimension::Topic, &config.topics),
            AllowList::from_setting(Dimension::PayloadKeyword, &config.payload_keywords),
        )
    }

    /// The lists that constrain admission.
    pub fn enabled(&self) -> impl Iterator<Item = &AllowList> {
        [&self.client_ids, &self.topics, &self.payload_keywords]
            .into_iter()
            .filter(|list| list.is_enabled())
    }

    /// Whether a message passes every enabled list.
    pub fn admits(&self, client_id: &str, topic: &str, payload: &str) -> bool {
        self.client_ids.permits(client_id)
            && self.topics.permits(topic)
            && self.payload_keywords.permits(payload)
    }
}
