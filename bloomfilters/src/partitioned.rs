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

//! A Bloom filter whose `k` hash values each own a separate bit array.
//!
//! References:
//! - Chang, Feng and Li (2004). "Approximate Caches for Packet Classification"
//! - Almeida, Baquero, Preguiça and Hutchison (2007). "Scalable Bloom Filters"

use std::fmt;

use tracing::trace;

use crate::bitset::BitRegion;
use crate::builder::BloomFilterBuilder;
use crate::error::Error;
use crate::filter::BloomFilter;
use crate::filter::FilterState;
use crate::hash::DigestSource;
use crate::params::FilterParameters;

/// A Bloom filter split into `k` partitions of `s = ceil(m / k)` bits.
///
/// Index derivation is the same double hash as [`StandardBloom`](crate::StandardBloom), taken
/// modulo `s`, and the `i`-th index only ever touches partition `i`. Hash values therefore
/// cannot collide with each other inside one item, and every item sets exactly one bit per
/// partition at most.
///
/// # Examples
///
/// ```
/// # use bloomfilters::BloomFilter;
/// # use bloomfilters::PartitionedBloom;
/// let mut filter = PartitionedBloom::new(1000).unwrap();
/// assert_eq!(filter.partitions().len(), 10);
///
/// filter.add(b"alpha");
/// assert!(filter.check(b"alpha"));
/// ```
#[derive(Debug, Clone)]
pub struct PartitionedBloom {
    state: FilterState,
    /// k bit arrays of length s each
    partitions: Vec<BitRegion>,
}

impl PartitionedBloom {
    /// Creates a filter for `capacity` items with the default fill ratio and error rate.
    ///
    /// Bit storage is allocated immediately, so the filter is ready for use.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](crate::error::ErrorKind::InvalidConfig) if `capacity` is zero.
    pub fn new(capacity: u64) -> Result<Self, Error> {
        BloomFilterBuilder::new(capacity).build_partitioned()
    }

    pub(crate) fn from_state(state: FilterState) -> Self {
        let partitions = make_partitions(state.params());
        PartitionedBloom { state, partitions }
    }

    /// Returns the sizing derived at the last reset.
    pub fn params(&self) -> &FilterParameters {
        self.state.params()
    }

    /// Returns the number of partitions (k).
    pub fn num_hashes(&self) -> u32 {
        self.state.params().num_hashes()
    }

    /// Returns the total bit budget (m) the partitions were sized from.
    pub fn num_bits(&self) -> u64 {
        self.state.params().num_bits()
    }

    /// Returns the width of each partition (s).
    pub fn partition_size(&self) -> u64 {
        self.state.params().partition_size()
    }

    /// Returns the partitions in hash-value order.
    pub fn partitions(&self) -> &[BitRegion] {
        &self.partitions
    }

    /// Returns the number of bits set to 1 across all partitions.
    pub fn bits_used(&self) -> u64 {
        self.partitions.iter().map(BitRegion::count_ones).sum()
    }

    /// Returns the bit position `item` maps to in each partition.
    pub fn indices(&self, item: &[u8]) -> Vec<u64> {
        let s = self.partition_size();
        self.state
            .double_hash(item)
            .indices(self.num_hashes(), s)
            .collect()
    }
}

fn make_partitions(params: &FilterParameters) -> Vec<BitRegion> {
    (0..params.num_hashes())
        .map(|_| BitRegion::new(params.partition_size()))
        .collect()
}

impl BloomFilter for PartitionedBloom {
    fn add(&mut self, item: &[u8]) -> &mut dyn BloomFilter {
        let (k, s) = (self.num_hashes(), self.partition_size());
        let indices = self.state.double_hash(item).indices(k, s);
        for (partition, bit_index) in self.partitions.iter_mut().zip(indices) {
            partition.set(bit_index);
        }
        self.state.increment();
        self
    }

    fn check(&self, item: &[u8]) -> bool {
        let (k, s) = (self.num_hashes(), self.partition_size());
        let indices = self.state.double_hash(item).indices(k, s);
        self.partitions
            .iter()
            .zip(indices)
            .all(|(partition, bit_index)| partition.test(bit_index))
    }

    fn count(&self) -> u64 {
        self.state.count()
    }

    fn reset(&mut self) -> Result<(), Error> {
        let params = self.state.derive()?;
        self.partitions = make_partitions(&params);
        self.state.commit(params);

        trace!(
            num_bits = params.num_bits(),
            num_hashes = params.num_hashes(),
            partition_size = params.partition_size(),
            error_rate = params.error_rate(),
            "reset partitioned bloom filter"
        );
        Ok(())
    }

    fn set_hasher(&mut self, hasher: Box<dyn DigestSource>) -> Result<(), Error> {
        self.state.set_hasher(hasher)
    }

    fn set_error_probability(&mut self, e: f64) -> Result<(), Error> {
        self.state.set_error_rate(e)
    }

    fn error_probability(&self) -> f64 {
        self.state.error_rate()
    }

    /// The mean fill ratio of the partitions.
    fn fill_ratio(&self) -> f64 {
        let total: f64 = self.partitions.iter().map(BitRegion::fill_ratio).sum();
        total / self.partitions.len() as f64
    }

    /// `1 - exp(-c / s)`: each item lands once in every partition.
    fn estimated_fill_ratio(&self) -> f64 {
        let c = self.count() as f64;
        let s = self.partition_size() as f64;
        1.0 - (-c / s).exp()
    }

    fn write_stats(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        self.state.write_header(w)?;
        for (i, partition) in self.partitions.iter().enumerate() {
            writeln!(
                w,
                "Bits in partition {}: {} ({:.1}%)",
                i,
                partition.count_ones(),
                partition.fill_ratio() * 100.0
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Fnv64;

    #[test]
    fn test_partition_sizing() {
        let filter = PartitionedBloom::new(10).unwrap();
        assert_eq!(filter.num_hashes(), 10);
        assert_eq!(filter.num_bits(), 144);
        assert_eq!(filter.partition_size(), 15);
        assert_eq!(filter.partitions().len(), 10);
        assert!(filter.partitions().iter().all(|p| p.len() == 15));
    }

    #[test]
    fn test_add_sets_one_bit_per_partition() {
        let mut filter = PartitionedBloom::new(1000).unwrap();
        let indices = filter.indices(b"alpha");
        assert_eq!(indices.len(), 10);
        assert!(indices.iter().all(|&i| i < 1438));

        filter.add(b"alpha");
        for (partition, &bit_index) in filter.partitions().iter().zip(&indices) {
            assert_eq!(partition.count_ones(), 1);
            assert!(partition.test(bit_index));
        }
        assert_eq!(filter.bits_used(), 10);
        assert_eq!(filter.fill_ratio(), 1.0 / 1438.0);
    }

    #[test]
    fn test_indices_follow_double_hash() {
        let filter = PartitionedBloom::new(1000).unwrap();
        // FNV-1 64 of "foobar" is 0x340d8765a4dda9c2.
        let (a, b) = (0xa4dda9c2u64, 0x340d8765u64);
        let expected: Vec<u64> = (0..10).map(|i| (a + b * i) % 1438).collect();
        assert_eq!(filter.indices(b"foobar"), expected);
    }

    #[test]
    fn test_estimated_fill_ratio() {
        let mut filter = PartitionedBloom::new(10).unwrap();
        for i in 0..11 {
            filter.add(format!("key-{i}").as_bytes());
        }
        assert_eq!(filter.estimated_fill_ratio(), 1.0 - (-11.0f64 / 15.0).exp());
        assert!(filter.estimated_fill_ratio() > 0.5);
    }

    #[test]
    fn test_reset_reallocates_partitions() {
        let mut filter = PartitionedBloom::new(100).unwrap();
        filter.add(b"alpha");
        filter.set_error_probability(0.01).unwrap();
        filter.set_hasher(Box::new(Fnv64::new())).unwrap();
        filter.reset().unwrap();

        assert_eq!(filter.num_hashes(), 7);
        assert_eq!(filter.partition_size(), 137);
        assert_eq!(filter.partitions().len(), 7);
        assert_eq!(filter.bits_used(), 0);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_write_stats() {
        let mut filter = PartitionedBloom::new(1).unwrap();
        filter.add(b"alpha");
        let mut stats = String::new();
        filter.write_stats(&mut stats).unwrap();

        let mut expected =
            String::from("m = 15, n = 1, k = 10, s = 2, p = 0.5, e = 0.001\nTotal items: 1\n");
        for i in 0..10 {
            expected.push_str(&format!("Bits in partition {i}: 1 (50.0%)\n"));
        }
        assert_eq!(stats, expected);
    }
}
