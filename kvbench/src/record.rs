//! Synthetic key/value [`Record`]s and the seedable [`RecordGenerator`] producing them.

use rand::distr::Alphanumeric;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Prefix of every generated key, unless configured otherwise.
pub const DEFAULT_KEY_PREFIX: &str = "key_";
/// Prefix of every generated value, unless configured otherwise.
pub const DEFAULT_VALUE_PREFIX: &str = "value_";
/// Number of random characters appended to each prefix, unless configured otherwise.
pub const DEFAULT_SUFFIX_LEN: usize = 10;

/// A generated key/value pair, sent as the JSON body of a `set` call.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Record {
    /// The key, made of the key prefix and a random alphanumeric suffix.
    pub key: String,
    /// The value, made of the value prefix and a random alphanumeric suffix.
    pub value: String,
}

/// A builder for creating a [`RecordGenerator`].
#[derive(Debug)]
pub struct RecordGeneratorBuilder {
    key_prefix: String,
    value_prefix: String,
    suffix_len: usize,
    seed: u64,
}

impl RecordGeneratorBuilder {
    /// The fixed prefix of every generated key.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// The fixed prefix of every generated value.
    pub fn value_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.value_prefix = prefix.into();
        self
    }

    /// The number of random characters appended to the key and value prefixes.
    pub fn suffix_len(mut self, len: usize) -> Self {
        self.suffix_len = len;
        self
    }

    /// Seeds the generator, making the sequence of records reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Creates the generator instance.
    pub fn build(self) -> RecordGenerator {
        RecordGenerator {
            rng: SmallRng::seed_from_u64(self.seed),
            key_prefix: self.key_prefix,
            value_prefix: self.value_prefix,
            suffix_len: self.suffix_len,
        }
    }
}

/// Produces fresh [`Record`]s with random alphanumeric suffixes.
///
/// Uniqueness of keys is not enforced. Two records may collide with a probability given by the
/// suffix length, which is not an error.
#[derive(Debug)]
pub struct RecordGenerator {
    /// The RNG driving all suffixes.
    rng: SmallRng,
    key_prefix: String,
    value_prefix: String,
    suffix_len: usize,
}

impl RecordGenerator {
    /// Constructs a new builder with default prefixes and a random seed.
    pub fn builder() -> RecordGeneratorBuilder {
        RecordGeneratorBuilder {
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
            value_prefix: DEFAULT_VALUE_PREFIX.to_owned(),
            suffix_len: DEFAULT_SUFFIX_LEN,
            seed: rand::random(),
        }
    }

    fn suffix(&mut self) -> String {
        (&mut self.rng)
            .sample_iter(Alphanumeric)
            .take(self.suffix_len)
            .map(char::from)
            .collect()
    }

    /// Generates the next record.
    pub fn next_record(&mut self) -> Record {
        let key_suffix = self.suffix();
        let value_suffix = self.suffix();
        Record {
            key: format!("{}{key_suffix}", self.key_prefix),
            value: format!("{}{value_suffix}", self.value_prefix),
        }
    }

    /// Generates exactly `count` records.
    pub fn generate(&mut self, count: usize) -> Vec<Record> {
        (0..count).map(|_| self.next_record()).collect()
    }
}
