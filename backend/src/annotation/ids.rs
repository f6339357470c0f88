use std::collections::HashSet;

use rand::Rng;
use rand::distr::Alphanumeric;
use uuid::Uuid;

/// Source of region identifiers.
///
/// Identifiers only need to be unique within one prediction response; wrap a
/// generator in [`UniqueIds`] to get that guarantee.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// First four hex characters of a random v4 UUID.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidFragment;

impl IdGenerator for UuidFragment {
    fn next_id(&mut self) -> String {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(4);
        id
    }
}

/// Random ASCII letters and digits.
#[derive(Debug, Clone, Copy)]
pub struct AlphanumericId {
    len: usize,
}

impl AlphanumericId {
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl Default for AlphanumericId {
    fn default() -> Self {
        Self::new(10)
    }
}

impl IdGenerator for AlphanumericId {
    fn next_id(&mut self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.len)
            .map(char::from)
            .collect()
    }
}

/// Redraws from the inner generator until it yields an id not seen before.
pub struct UniqueIds<G> {
    inner: G,
    issued: HashSet<String>,
}

impl<G: IdGenerator> UniqueIds<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            issued: HashSet::new(),
        }
    }
}

impl<G: IdGenerator> IdGenerator for UniqueIds<G> {
    fn next_id(&mut self) -> String {
        loop {
            let id = self.inner.next_id();
            if self.issued.insert(id.clone()) {
                return id;
            }
        }
    }
}
