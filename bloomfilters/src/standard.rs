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

//! The classic Bloom filter: one bit array shared by all `k` hash values.

use std::fmt;

use tracing::trace;

use crate::bitset::BitRegion;
use crate::builder::BloomFilterBuilder;
use crate::error::Error;
use crate::filter::BloomFilter;
use crate::filter::FilterState;
use crate::hash::DigestSource;
use crate::params::FilterParameters;

/// A Bloom filter with a single bit array of `m` bits.
///
/// Each item is digested once; the `k` bit positions are `(a + b * i) % m` for `i` in `0..k`,
/// where `a` and `b` are the low and high 32-bit halves of the digest.
///
/// # Examples
///
/// ```
/// # use bloomfilters::BloomFilter;
/// # use bloomfilters::StandardBloom;
/// let mut filter = StandardBloom::new(1000).unwrap();
/// filter.add(b"alpha").add(b"beta");
///
/// assert!(filter.check(b"alpha"));
/// assert!(filter.check(b"beta"));
/// assert_eq!(filter.count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct StandardBloom {
    state: FilterState,
    /// Bit array of length m
    bits: BitRegion,
}

impl StandardBloom {
    /// Creates a filter for `capacity` items with the default fill ratio and error rate.
    ///
    /// Bit storage is allocated immediately, so the filter is ready for use.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](crate::error::ErrorKind::InvalidConfig) if `capacity` is zero.
    pub fn new(capacity: u64) -> Result<Self, Error> {
        BloomFilterBuilder::new(capacity).build_standard()
    }

    pub(crate) fn from_state(state: FilterState) -> Self {
        let bits = BitRegion::new(state.params().num_bits());
        StandardBloom { state, bits }
    }

    /// Returns the sizing derived at the last reset.
    pub fn params(&self) -> &FilterParameters {
        self.state.params()
    }

    /// Returns the number of bit positions set per item (k).
    pub fn num_hashes(&self) -> u32 {
        self.state.params().num_hashes()
    }

    /// Returns the total number of bits (m).
    pub fn num_bits(&self) -> u64 {
        self.state.params().num_bits()
    }

    /// Returns the number of bits set to 1.
    pub fn bits_used(&self) -> u64 {
        self.bits.count_ones()
    }

    /// Returns the underlying bit array.
    pub fn bits(&self) -> &BitRegion {
        &self.bits
    }

    /// Returns the bit positions `item` maps to.
    pub fn indices(&self, item: &[u8]) -> Vec<u64> {
        let m = self.num_bits();
        self.state
            .double_hash(item)
            .indices(self.num_hashes(), m)
            .collect()
    }
}

impl BloomFilter for StandardBloom {
    fn add(&mut self, item: &[u8]) -> &mut dyn BloomFilter {
        let (k, m) = (self.num_hashes(), self.num_bits());
        for bit_index in self.state.double_hash(item).indices(k, m) {
            self.bits.set(bit_index);
        }
        self.state.increment();
        self
    }

    fn check(&self, item: &[u8]) -> bool {
        let (k, m) = (self.num_hashes(), self.num_bits());
        self.state
            .double_hash(item)
            .indices(k, m)
            .all(|bit_index| self.bits.test(bit_index))
    }

    fn count(&self) -> u64 {
        self.state.count()
    }

    fn reset(&mut self) -> Result<(), Error> {
        let params = self.state.derive()?;
        self.bits = BitRegion::new(params.num_bits());
        self.state.commit(params);

        trace!(
            num_bits = params.num_bits(),
            num_hashes = params.num_hashes(),
            error_rate = params.error_rate(),
            "reset standard bloom filter"
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

    fn fill_ratio(&self) -> f64 {
        self.bits.fill_ratio()
    }

    /// `1 - exp(-c * k / m)`
    fn estimated_fill_ratio(&self) -> f64 {
        let c = self.count() as f64;
        let k = f64::from(self.num_hashes());
        let m = self.num_bits() as f64;
        1.0 - (-c * k / m).exp()
    }

    fn write_stats(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        self.state.write_header(w)?;
        let set = self.bits.count_ones();
        writeln!(
            w,
            "Total bits set: {} ({:.1}%)",
            set,
            set as f64 / self.num_bits() as f64 * 100.0
        )
    }
}
