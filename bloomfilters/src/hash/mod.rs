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

//! Digest sources used to derive bit indices.
//!
//! A filter never hashes an item more than once per operation: it resets its digest source,
//! absorbs the item bytes, and reads two 32-bit halves out of the digest. Every index the
//! filter touches is derived from those two halves (see [`DoubleHash`]).

use std::fmt;

use byteorder::BigEndian;
use byteorder::ByteOrder;

use crate::error::Error;

mod crypto;
mod fnv;
mod murmurhash;
mod std_hasher;

pub use self::crypto::CryptoDigest;
pub use self::fnv::Fnv64;
pub use self::murmurhash::MurmurHash3X64128;
pub use self::std_hasher::StdHasher;

/// Minimum digest width in bytes: index derivation needs two 32-bit halves.
pub const MIN_DIGEST_SIZE: usize = 8;

/// The seed 9001 used by [`MurmurHash3X64128::default`] is a prime number that was chosen very
/// early on in experimental testing. It carries no special meaning beyond being non-zero.
pub const DEFAULT_UPDATE_SEED: u64 = 9001;

/// A stateful, resettable digest.
///
/// Filters call [`reset`](Self::reset) before every item, then [`write`](Self::write) the item
/// bytes, then [`sum`](Self::sum). The state is mutated on every call, so a single digest source
/// must not be used from two threads at once; filters own theirs exclusively.
pub trait DigestSource: fmt::Debug + Send + DigestClone {
    /// Restores the initial state.
    fn reset(&mut self);

    /// Absorbs `bytes` into the running state.
    fn write(&mut self, bytes: &[u8]);

    /// Returns the number of bytes [`sum`](Self::sum) appends.
    fn size(&self) -> usize;

    /// Appends the current digest to `out` in big-endian order without changing the state.
    fn sum(&self, out: &mut Vec<u8>);
}

/// Clones a digest source behind a trait object.
///
/// Implemented automatically for every `DigestSource + Clone`.
pub trait DigestClone {
    /// Returns an independent copy of this digest source.
    fn boxed_clone(&self) -> Box<dyn DigestSource>;
}

impl<T> DigestClone for T
where
    T: DigestSource + Clone + 'static,
{
    fn boxed_clone(&self) -> Box<dyn DigestSource> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn DigestSource> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Returns the default digest source, FNV-1 64.
pub fn default_digest() -> Box<dyn DigestSource> {
    Box::new(Fnv64::new())
}

/// Rejects digest sources too narrow for index derivation.
pub(crate) fn validate_digest(source: &dyn DigestSource) -> Result<(), Error> {
    let size = source.size();
    if size < MIN_DIGEST_SIZE {
        return Err(Error::digest_too_short(MIN_DIGEST_SIZE, size));
    }
    Ok(())
}

/// Owns a digest source together with the scratch buffer its digests are written into.
#[derive(Debug, Clone)]
pub(crate) struct Digester {
    source: Box<dyn DigestSource>,
    buf: Vec<u8>,
}

impl Digester {
    pub(crate) fn new(source: Box<dyn DigestSource>) -> Self {
        let buf = Vec::with_capacity(source.size());
        Digester { source, buf }
    }

    pub(crate) fn reset(&mut self) {
        self.source.reset();
        self.buf.clear();
    }

    /// Digests `item` from a fresh state and splits the result for double hashing.
    pub(crate) fn double_hash(&mut self, item: &[u8]) -> DoubleHash {
        self.source.reset();
        self.source.write(item);
        self.buf.clear();
        self.source.sum(&mut self.buf);

        DoubleHash {
            a: u64::from(BigEndian::read_u32(&self.buf[4..8])),
            b: u64::from(BigEndian::read_u32(&self.buf[0..4])),
        }
    }
}

/// The two base values of a Kirsch-Mitzenmacher double hash.
///
/// Reference: Kirsch and Mitzenmacher (2008). "Less Hashing, Same Performance: Building a
/// Better Bloom Filter"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DoubleHash {
    /// Low-order half of the digest (bytes 4..8).
    pub(crate) a: u64,
    /// High-order half of the digest (bytes 0..4).
    pub(crate) b: u64,
}

impl DoubleHash {
    /// Computes the `i`-th index: `(a + b * i) % width`.
    ///
    /// Both halves are below 2^32 and `i` is bounded by the hash count, so the sum cannot
    /// overflow 64 bits.
    #[inline]
    pub(crate) fn index(&self, i: u32, width: u64) -> u64 {
        (self.a + self.b * u64::from(i)) % width
    }

    /// Iterates the first `k` indices modulo `width`.
    pub(crate) fn indices(self, k: u32, width: u64) -> impl Iterator<Item = u64> {
        (0..k).map(move |i| self.index(i, width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Narrow;

    impl DigestSource for Narrow {
        fn reset(&mut self) {}
        fn write(&mut self, _bytes: &[u8]) {}
        fn size(&self) -> usize {
            4
        }
        fn sum(&self, out: &mut Vec<u8>) {
            out.extend_from_slice(&[0; 4]);
        }
    }

    #[test]
    fn test_validate_digest() {
        assert!(validate_digest(&Fnv64::new()).is_ok());
        assert!(validate_digest(&MurmurHash3X64128::default()).is_ok());

        let err = validate_digest(&Narrow).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidDigest);
    }

    #[test]
    fn test_double_hash_halves() {
        let mut digester = Digester::new(default_digest());
        // FNV-1 64 of "foobar" is 0x340d8765a4dda9c2.
        let dh = digester.double_hash(b"foobar");
        assert_eq!(dh.b, 0x340d8765);
        assert_eq!(dh.a, 0xa4dda9c2);

        assert_eq!(dh.index(0, 1000), 0xa4dda9c2 % 1000);
        assert_eq!(dh.index(3, 1000), (0xa4dda9c2 + 3 * 0x340d8765) % 1000);
    }

    #[test]
    fn test_double_hash_is_deterministic() {
        let mut digester = Digester::new(default_digest());
        let first: Vec<u64> = digester.double_hash(b"alpha").indices(10, 14378).collect();
        digester.double_hash(b"something else");
        let second: Vec<u64> = digester.double_hash(b"alpha").indices(10, 14378).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 10);
        assert!(first.iter().all(|&i| i < 14378));
    }

    #[test]
    fn test_boxed_clone_is_independent() {
        let mut original = default_digest();
        original.write(b"abc");
        let mut copy = original.clone();
        copy.reset();

        let mut a = vec![];
        let mut b = vec![];
        original.sum(&mut a);
        copy.sum(&mut b);
        assert_ne!(a, b);
    }
}
