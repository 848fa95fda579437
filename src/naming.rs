use std::fmt;

use chrono::Local;
use uuid::Uuid;

/// Identifier attached to one extracted sub-photo
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubphotoId(String);

impl SubphotoId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubphotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of fresh identifiers, injected into the extractor
pub trait IdGenerator {
    fn next_id(&mut self) -> SubphotoId;
}

/// Local timestamp plus a random v4 uuid, e.g. `2024-03-01-14_05_09_<uuid>`
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampIdGenerator;

impl IdGenerator for TimestampIdGenerator {
    fn next_id(&mut self) -> SubphotoId {
        let stamp = Local::now().format("%Y-%m-%d-%H_%M_%S");
        SubphotoId(format!("{}_{}", stamp, Uuid::new_v4()))
    }
}

/// Deterministic `<prefix><n>` identifiers, counting from zero
#[derive(Debug, Clone, Default)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: u64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self) -> SubphotoId {
        let id = SubphotoId(format!("{}{}", self.prefix, self.next));
        self.next += 1;
        id
    }
}

/// How output files are named after their source scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingPolicy {
    /// `<stem>_<id>.jpg`
    #[default]
    Unique,
    /// `<stem>_<index>.jpg`, index counted per source scan
    Sequential,
}

impl NamingPolicy {
    pub fn file_name(&self, stem: &str, index: usize, id: &SubphotoId) -> String {
        match self {
            NamingPolicy::Unique => format!("{}_{}.jpg", stem, id),
            NamingPolicy::Sequential => format!("{}_{}.jpg", stem, index),
        }
    }
}
