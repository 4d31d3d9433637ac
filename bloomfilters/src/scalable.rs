// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! A Bloom filter that grows a chain of filters instead of fixing its size up front.
//!
//! Reference: Almeida, Baquero, Preguiça and Hutchison (2007). "Scalable Bloom Filters"

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::builder::BloomFilterBuilder;
use crate::error::Error;
use crate::filter::BloomFilter;
use crate::hash::default_digest;
use crate::hash::validate_digest;
use crate::hash::DigestSource;
use crate::params::check_capacity;
use crate::params::check_error_rate;
use crate::params::check_fill_ratio;

/// Default error tightening ratio `r`.
pub const DEFAULT_TIGHTENING_RATIO: f64 = 0.9;

/// Creates the filter for one generation from the capacity estimate `n`.
///
/// The scalable filter installs its digest source and the generation's error budget on the
/// returned filter and resets it, so the constructor only has to pick the variant.
pub type Constructor = Arc<dyn Fn(u64) -> Result<Box<dyn BloomFilter>, Error> + Send + Sync>;

/// The built-in variants a [`ScalableBloom`] can grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Underlying {
    /// [`StandardBloom`](crate::StandardBloom) generations.
    Standard,
    /// [`PartitionedBloom`](crate::PartitionedBloom) generations.
    #[default]
    Partitioned,
}

impl Underlying {
    /// Returns a constructor building this variant with fill ratio `p`.
    pub fn constructor(self, fill_ratio: f64) -> Constructor {
        match self {
            Underlying::Standard => {
                Arc::new(move |n: u64| -> Result<Box<dyn BloomFilter>, Error> {
                    let filter = BloomFilterBuilder::new(n)
                        .fill_ratio(fill_ratio)
                        .build_standard()?;
                    Ok(Box::new(filter))
                })
            }
            Underlying::Partitioned => {
                Arc::new(move |n: u64| -> Result<Box<dyn BloomFilter>, Error> {
                    let filter = BloomFilterBuilder::new(n)
                        .fill_ratio(fill_ratio)
                        .build_partitioned()?;
                    Ok(Box::new(filter))
                })
            }
        }
    }
}

/// A Scalable Bloom filter.
///
/// Holds an append-only chain of generations. Items go into the newest generation; once its
/// estimated fill ratio exceeds `p`, the next add first appends a new generation sized for the
/// same `n` with error budget `e * r^i`, where `i` is the generation index. The budgets form a
/// geometric series, so the compound false positive rate stays below `e / (1 - r)` however
/// far the chain grows.
///
/// Checks scan the chain newest first and stop at the first hit; an item is reported absent
/// only when no generation matches.
///
/// Configuration setters affect generations created afterwards, on growth or on
/// [`reset`](BloomFilter::reset). Existing generations keep the configuration they were
/// created with.
///
/// # Examples
///
/// ```
/// # use bloomfilters::BloomFilter;
/// # use bloomfilters::ScalableBloom;
/// let mut filter = ScalableBloom::new(10).unwrap();
/// for i in 0..100 {
///     filter.add(format!("key-{i}").as_bytes());
/// }
///
/// assert!(filter.num_generations() > 1);
/// assert!(filter.check(b"key-0"));
/// assert_eq!(filter.count(), 100);
/// ```
pub struct ScalableBloom {
    /// Digest source handed to every new generation
    hasher: Box<dyn DigestSource>,
    /// Expected item count per generation (n)
    capacity: u64,
    /// Growth threshold on the newest generation's estimated fill ratio (p)
    fill_ratio: f64,
    /// Error budget of the first generation (e)
    error_rate: f64,
    /// Error tightening ratio (r), 0 < r < 1
    tightening_ratio: f64,
    /// Number of items added (c)
    count: u64,
    /// Generations in creation order, never empty
    generations: Vec<Box<dyn BloomFilter>>,
    /// Builds the filter of each new generation
    constructor: Constructor,
    /// Set when growth failed; cleared by any configuration change or reset
    growth_stalled: bool,
}

impl ScalableBloom {
    /// Creates a filter whose generations each hold `capacity` items, with the default fill
    /// ratio, error rate, tightening ratio and [`Underlying::Partitioned`] generations.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](crate::error::ErrorKind::InvalidConfig) if `capacity` is zero.
    pub fn new(capacity: u64) -> Result<Self, Error> {
        BloomFilterBuilder::new(capacity).build_scalable()
    }

    /// Assembles the filter and creates its first generation.
    pub(crate) fn from_parts(
        capacity: u64,
        fill_ratio: f64,
        error_rate: f64,
        tightening_ratio: f64,
        hasher: Option<Box<dyn DigestSource>>,
        constructor: Constructor,
    ) -> Result<Self, Error> {
        check_capacity(capacity)?;
        check_fill_ratio(fill_ratio)?;
        check_error_rate(error_rate)?;
        check_tightening_ratio(tightening_ratio)?;
        let hasher = hasher.unwrap_or_else(default_digest);
        validate_digest(&*hasher)?;

        let mut filter = ScalableBloom {
            hasher,
            capacity,
            fill_ratio,
            error_rate,
            tightening_ratio,
            count: 0,
            generations: vec![],
            constructor,
            growth_stalled: false,
        };
        filter.reset()?;
        Ok(filter)
    }

    /// Selects the constructor of future generations.
    ///
    /// Existing generations are only replaced by [`reset`](BloomFilter::reset).
    pub fn set_bloom_filter(&mut self, constructor: Constructor) {
        self.constructor = constructor;
        self.growth_stalled = false;
    }

    /// Selects one of the built-in variants for future generations, keeping the fill ratio.
    pub fn set_underlying(&mut self, underlying: Underlying) {
        self.constructor = underlying.constructor(self.fill_ratio);
        self.growth_stalled = false;
    }

    /// Sets the error tightening ratio used for future generations.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](crate::error::ErrorKind::InvalidConfig) if `r` is not in
    /// `(0, 1)`.
    pub fn set_tightening_ratio(&mut self, r: f64) -> Result<(), Error> {
        check_tightening_ratio(r)?;
        self.tightening_ratio = r;
        self.growth_stalled = false;
        Ok(())
    }

    /// Returns the error tightening ratio (r).
    pub fn tightening_ratio(&self) -> f64 {
        self.tightening_ratio
    }

    /// Returns the capacity estimate every generation is sized for (n).
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Returns the growth threshold (p).
    pub fn fill_ratio_threshold(&self) -> f64 {
        self.fill_ratio
    }

    /// Returns whether the last attempt to grow failed.
    ///
    /// While stalled, adds go to the newest generation without retrying growth. Any
    /// configuration setter or [`reset`](BloomFilter::reset) clears the stall.
    pub fn is_growth_stalled(&self) -> bool {
        self.growth_stalled
    }

    /// Returns the number of generations in the chain.
    pub fn num_generations(&self) -> usize {
        self.generations.len()
    }

    /// Returns the generation at `index`, oldest first.
    pub fn generation(&self, index: usize) -> Option<&dyn BloomFilter> {
        self.generations.get(index).map(|g| &**g)
    }

    /// Returns the error budget `e * r^index` a generation created at `index` receives.
    ///
    /// The budget is floored at `f64::MIN_POSITIVE` so that it stays a valid error rate.
    pub fn generation_error_rate(&self, index: usize) -> f64 {
        let budget = self.error_rate * self.tightening_ratio.powf(index as f64);
        budget.max(f64::MIN_POSITIVE)
    }

    fn new_generation(&self, index: usize) -> Result<Box<dyn BloomFilter>, Error> {
        let error_rate = self.generation_error_rate(index);
        let mut filter = (self.constructor)(self.capacity)?;
        filter.set_hasher(self.hasher.clone())?;
        filter.set_error_probability(error_rate)?;
        filter.reset()?;
        Ok(filter)
    }

    fn grow(&mut self, fill_ratio: f64) {
        let index = self.generations.len();
        match self.new_generation(index) {
            Ok(filter) => {
                debug!(
                    generation = index,
                    error_rate = filter.error_probability(),
                    fill_ratio,
                    "added scalable bloom filter generation"
                );
                self.generations.push(filter);
            }
            // The newest generation keeps absorbing items: no false negatives, only a worse
            // false positive rate.
            Err(err) => {
                warn!(
                    generation = index,
                    error = %err,
                    "failed to add scalable bloom filter generation"
                );
                self.growth_stalled = true;
            }
        }
    }

    fn newest(&self) -> Option<&dyn BloomFilter> {
        self.generations.last().map(|g| &**g)
    }
}

fn check_tightening_ratio(r: f64) -> Result<(), Error> {
    if !(r > 0.0 && r < 1.0) {
        return Err(Error::out_of_range("tightening_ratio", r));
    }
    Ok(())
}

impl fmt::Debug for ScalableBloom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalableBloom")
            .field("hasher", &self.hasher)
            .field("capacity", &self.capacity)
            .field("fill_ratio", &self.fill_ratio)
            .field("error_rate", &self.error_rate)
            .field("tightening_ratio", &self.tightening_ratio)
            .field("count", &self.count)
            .field("generations", &self.generations)
            .field("growth_stalled", &self.growth_stalled)
            .finish_non_exhaustive()
    }
}

impl BloomFilter for ScalableBloom {
    fn add(&mut self, item: &[u8]) -> &mut dyn BloomFilter {
        let fill_ratio = self.estimated_fill_ratio();
        if fill_ratio > self.fill_ratio && !self.growth_stalled {
            self.grow(fill_ratio);
        }

        if let Some(newest) = self.generations.last_mut() {
            newest.add(item);
        }
        self.count += 1;
        self
    }

    fn check(&self, item: &[u8]) -> bool {
        self.generations.iter().rev().any(|g| g.check(item))
    }

    fn count(&self) -> u64 {
        self.count
    }

    /// Discards every generation and starts over with a single fresh one.
    fn reset(&mut self) -> Result<(), Error> {
        let mut hasher = self.hasher.clone();
        hasher.reset();
        let previous = std::mem::replace(&mut self.hasher, hasher);

        match self.new_generation(0) {
            Ok(first) => {
                self.generations = vec![first];
                self.count = 0;
                self.growth_stalled = false;
                trace!(capacity = self.capacity, "reset scalable bloom filter");
                Ok(())
            }
            Err(err) => {
                self.hasher = previous;
                Err(err)
            }
        }
    }

    fn set_hasher(&mut self, hasher: Box<dyn DigestSource>) -> Result<(), Error> {
        validate_digest(&*hasher)?;
        self.hasher = hasher;
        self.growth_stalled = false;
        Ok(())
    }

    fn set_error_probability(&mut self, e: f64) -> Result<(), Error> {
        check_error_rate(e)?;
        self.error_rate = e;
        self.growth_stalled = false;
        Ok(())
    }

    fn error_probability(&self) -> f64 {
        self.error_rate
    }

    /// The newest generation's fill ratio, not an aggregate over the chain.
    fn fill_ratio(&self) -> f64 {
        self.newest().map_or(0.0, |g| g.fill_ratio())
    }

    /// The newest generation's estimated fill ratio, not an aggregate over the chain.
    fn estimated_fill_ratio(&self) -> f64 {
        self.newest().map_or(0.0, |g| g.estimated_fill_ratio())
    }

    fn write_stats(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            w,
            "n = {}, p = {}, e = {}",
            self.capacity, self.fill_ratio, self.error_rate
        )?;
        writeln!(w, "Total items: {}", self.count)?;

        for (i, generation) in self.generations.iter().enumerate() {
            writeln!(w, "Scalable Bloom Filter #{i}")?;
            writeln!(w, "-------------------------")?;
            generation.write_stats(w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::hash::MurmurHash3X64128;
    use crate::params::DEFAULT_FILL_RATIO;

    fn add_keys(filter: &mut ScalableBloom, range: std::ops::Range<u32>) {
        for i in range {
            filter.add(format!("key-{i}").as_bytes());
        }
    }

    #[test]
    fn test_new_has_one_generation() {
        let filter = ScalableBloom::new(10).unwrap();
        assert_eq!(filter.num_generations(), 1);
        assert_eq!(filter.capacity(), 10);
        assert_eq!(filter.tightening_ratio(), DEFAULT_TIGHTENING_RATIO);
        assert_eq!(filter.fill_ratio_threshold(), DEFAULT_FILL_RATIO);
        assert_eq!(filter.generation(0).unwrap().error_probability(), 0.001);
        assert!(filter.generation(1).is_none());
        assert!(filter.is_empty());
    }

    #[test]
    fn test_growth_with_standard_generations() {
        let mut filter = ScalableBloom::new(10).unwrap();
        filter.set_underlying(Underlying::Standard);
        filter.reset().unwrap();

        // generation 0 is 144 bits with 10 hash values: 1 - exp(-10 * 10 / 144) > 0.5
        add_keys(&mut filter, 0..10);
        assert_eq!(filter.num_generations(), 1);
        assert!(filter.estimated_fill_ratio() > 0.5);

        add_keys(&mut filter, 10..11);
        assert_eq!(filter.num_generations(), 2);
        assert_eq!(filter.generation(0).unwrap().count(), 10);
        assert_eq!(filter.generation(1).unwrap().count(), 1);
    }

    #[test]
    fn test_growth_with_partitioned_generations() {
        let mut filter = ScalableBloom::new(10).unwrap();

        // partitions are 15 bits wide: 1 - exp(-10 / 15) < 0.5 < 1 - exp(-11 / 15)
        add_keys(&mut filter, 0..10);
        assert!(filter.estimated_fill_ratio() < 0.5);
        add_keys(&mut filter, 10..11);
        assert_eq!(filter.num_generations(), 1);
        assert!(filter.estimated_fill_ratio() > 0.5);

        add_keys(&mut filter, 11..12);
        assert_eq!(filter.num_generations(), 2);
        assert_eq!(filter.count(), 12);
    }

    #[test]
    fn test_generation_error_budgets_tighten() {
        let mut filter = ScalableBloom::new(10).unwrap();
        add_keys(&mut filter, 0..200);
        assert!(filter.num_generations() > 3);

        for i in 0..filter.num_generations() {
            let budget = filter.generation(i).unwrap().error_probability();
            assert_eq!(budget, 0.001 * 0.9f64.powf(i as f64));
            assert_eq!(budget, filter.generation_error_rate(i));
            if i > 0 {
                assert!(budget < filter.generation(i - 1).unwrap().error_probability());
            }
        }
    }

    #[test]
    fn test_generation_error_rate_floor() {
        let filter = ScalableBloom::new(10).unwrap();
        assert_eq!(filter.generation_error_rate(0), 0.001);
        assert_eq!(filter.generation_error_rate(100_000), f64::MIN_POSITIVE);
    }

    #[test]
    fn test_reset_discards_chain() {
        let mut filter = ScalableBloom::new(10).unwrap();
        add_keys(&mut filter, 0..100);
        assert!(filter.num_generations() > 1);

        filter.reset().unwrap();
        assert_eq!(filter.num_generations(), 1);
        assert!(filter.is_empty());
        assert!(filter.generation(0).unwrap().is_empty());
    }

    #[test]
    fn test_failed_growth_keeps_filling_newest() {
        let mut filter = ScalableBloom::new(10).unwrap();
        filter.set_bloom_filter(Arc::new(
            |_: u64| -> Result<Box<dyn BloomFilter>, Error> {
                Err(Error::invalid_config("no more generations"))
            },
        ));

        add_keys(&mut filter, 0..50);
        assert!(filter.is_growth_stalled());
        assert_eq!(filter.num_generations(), 1);
        assert_eq!(filter.count(), 50);
        assert_eq!(filter.generation(0).unwrap().count(), 50);
        for i in 0..50 {
            assert!(filter.check(format!("key-{i}").as_bytes()));
        }

        let err = filter.reset().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert_eq!(filter.count(), 50);
    }

    #[test]
    fn test_failed_growth_is_not_retried_until_reconfigured() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::atomic::Ordering;

        let calls = Arc::new(AtomicUsize::new(0));
        let mut filter = ScalableBloom::new(10).unwrap();
        let counter = Arc::clone(&calls);
        filter.set_bloom_filter(Arc::new(
            move |_: u64| -> Result<Box<dyn BloomFilter>, Error> {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::invalid_config("no more generations"))
            },
        ));

        add_keys(&mut filter, 0..1000);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(filter.num_generations(), 1);
        assert_eq!(filter.count(), 1000);

        filter.set_underlying(Underlying::Standard);
        assert!(!filter.is_growth_stalled());
        add_keys(&mut filter, 1000..1001);
        assert_eq!(filter.num_generations(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for i in 0..1001 {
            assert!(filter.check(format!("key-{i}").as_bytes()));
        }
    }

    #[test]
    fn test_set_hasher_applies_to_new_generations() {
        let mut filter = ScalableBloom::new(10).unwrap();
        filter.set_hasher(Box::new(MurmurHash3X64128::default())).unwrap();
        add_keys(&mut filter, 0..40);
        assert!(filter.num_generations() > 1);
        for i in 0..40 {
            assert!(filter.check(format!("key-{i}").as_bytes()));
        }
    }

    #[test]
    fn test_rejects_invalid_configuration() {
        let mut filter = ScalableBloom::new(10).unwrap();
        assert!(filter.set_tightening_ratio(1.0).is_err());
        assert!(filter.set_tightening_ratio(0.0).is_err());
        assert!(filter.set_error_probability(1.0).is_err());
        assert_eq!(filter.tightening_ratio(), 0.9);
        assert_eq!(filter.error_probability(), 0.001);

        filter.set_tightening_ratio(0.5).unwrap();
        filter.reset().unwrap();
        add_keys(&mut filter, 0..40);
        assert_eq!(filter.generation_error_rate(1), 0.0005);

        assert!(ScalableBloom::new(0).is_err());
    }

    #[test]
    fn test_write_stats() {
        let mut filter = ScalableBloom::new(1).unwrap();
        filter.add(b"alpha");
        let mut stats = String::new();
        filter.write_stats(&mut stats).unwrap();

        let mut expected = String::from(
            "n = 1, p = 0.5, e = 0.001\nTotal items: 1\nScalable Bloom Filter #0\n-------------------------\n",
        );
        filter.generation(0).unwrap().write_stats(&mut expected).unwrap();
        assert_eq!(stats, expected);
    }
}
