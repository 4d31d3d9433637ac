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

use std::hash::Hasher;

use super::DigestSource;

const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const PRIME: u64 = 0x100000001b3;

/// The 64-bit FNV-1 hash: multiply by the FNV prime, then xor in each byte.
///
/// This is the default digest source of every filter in this crate. It is fast and
/// non-cryptographic, and its 8-byte digest is exactly the width index derivation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fnv64 {
    state: u64,
}

impl Fnv64 {
    /// Creates a digest in the FNV offset-basis state.
    pub fn new() -> Self {
        Fnv64 {
            state: OFFSET_BASIS,
        }
    }
}

impl Default for Fnv64 {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Fnv64 {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state = self.state.wrapping_mul(PRIME);
            self.state ^= u64::from(byte);
        }
    }
}

impl DigestSource for Fnv64 {
    fn reset(&mut self) {
        self.state = OFFSET_BASIS;
    }

    fn write(&mut self, bytes: &[u8]) {
        Hasher::write(self, bytes);
    }

    fn size(&self) -> usize {
        8
    }

    fn sum(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.state.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fnv1_64(key: &[u8]) -> u64 {
        let mut hasher = Fnv64::new();
        Hasher::write(&mut hasher, key);
        hasher.finish()
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(fnv1_64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1_64(b"a"), 0xaf63bd4c8601b7be);
        assert_eq!(fnv1_64(b"foobar"), 0x340d8765a4dda9c2);
    }

    #[test]
    fn test_reset_and_sum() {
        let mut digest = Fnv64::new();
        DigestSource::write(&mut digest, b"foobar");

        let mut out = vec![];
        digest.sum(&mut out);
        assert_eq!(out, 0x340d8765a4dda9c2u64.to_be_bytes());

        // sum appends and leaves the state untouched
        digest.sum(&mut out);
        assert_eq!(out.len(), 16);

        digest.reset();
        assert_eq!(digest, Fnv64::new());
    }

    #[test]
    fn test_incremental_writes() {
        let mut digest = Fnv64::new();
        DigestSource::write(&mut digest, b"foo");
        DigestSource::write(&mut digest, b"bar");
        assert_eq!(digest.finish(), fnv1_64(b"foobar"));
    }
}
