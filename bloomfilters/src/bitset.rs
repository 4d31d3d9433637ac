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

//! Fixed-width bit arrays backing every filter.

/// A fixed-length bit vector packed into `u64` words.
///
/// The population count is maintained on every set, so fill ratios are available without
/// scanning the words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitRegion {
    /// Number of addressable bits
    len: u64,
    /// Count of bits set to 1
    num_bits_set: u64,
    /// Length = ceil(len / 64)
    words: Box<[u64]>,
}

impl BitRegion {
    /// Creates an all-zero region of `len` bits.
    pub fn new(len: u64) -> Self {
        let num_words = len.div_ceil(64) as usize;
        BitRegion {
            len,
            num_bits_set: 0,
            words: vec![0u64; num_words].into_boxed_slice(),
        }
    }

    /// Returns the number of addressable bits.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns whether the region has no addressable bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of bits set to 1.
    pub fn count_ones(&self) -> u64 {
        self.num_bits_set
    }

    /// Returns the fraction of bits set to 1.
    pub fn fill_ratio(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.num_bits_set as f64 / self.len as f64
    }

    /// Gets the value of a single bit.
    ///
    /// # Panics
    ///
    /// Panics if `bit_index` is not below [`len`](Self::len).
    pub fn test(&self, bit_index: u64) -> bool {
        assert!(bit_index < self.len, "bit index {bit_index} out of range");
        let word_index = (bit_index >> 6) as usize; // Equivalent to bit_index / 64
        let mask = 1u64 << (bit_index & 63);
        (self.words[word_index] & mask) != 0
    }

    /// Sets a single bit and returns whether it was previously clear.
    ///
    /// # Panics
    ///
    /// Panics if `bit_index` is not below [`len`](Self::len).
    pub fn set(&mut self, bit_index: u64) -> bool {
        assert!(bit_index < self.len, "bit index {bit_index} out of range");
        let word_index = (bit_index >> 6) as usize;
        let mask = 1u64 << (bit_index & 63);

        if (self.words[word_index] & mask) == 0 {
            self.words[word_index] |= mask;
            self.num_bits_set += 1;
            return true;
        }
        false
    }

    /// Iterates the indices of the bits set to 1, in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = u64> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let base = (i as u64) << 6;
            (0..64u64)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| base + bit)
        })
    }
}
