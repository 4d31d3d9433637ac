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

mod common;

use std::sync::Arc;

use bloomfilters::error::Error;
use bloomfilters::error::ErrorKind;
use bloomfilters::BloomFilter;
use bloomfilters::BloomFilterBuilder;
use bloomfilters::ScalableBloom;
use bloomfilters::StandardBloom;
use bloomfilters::Underlying;
use common::NarrowDigest;
use googletest::assert_that;
use googletest::prelude::le;

fn member(i: u32) -> Vec<u8> {
    format!("member-{i}").into_bytes()
}

fn absent(i: u32) -> Vec<u8> {
    format!("absent-{i}").into_bytes()
}

#[test]
fn test_second_generation_after_eleven_keys() {
    let mut filter = BloomFilterBuilder::new(10)
        .fill_ratio(0.5)
        .underlying(Underlying::Standard)
        .build_scalable()
        .unwrap();

    for i in 0..10 {
        filter.add(&member(i));
        assert_eq!(filter.num_generations(), 1);
    }
    assert!(filter.generation(0).unwrap().estimated_fill_ratio() > 0.5);

    filter.add(&member(10));
    assert_eq!(filter.num_generations(), 2);
    assert_eq!(filter.count(), 11);
    assert!((0..11).all(|i| filter.check(&member(i))));
}

#[test]
fn test_growth_is_monotonic() {
    let mut filter = ScalableBloom::new(50).unwrap();
    let mut generations = filter.num_generations();
    for i in 0..3000 {
        filter.add(&member(i));
        assert!(filter.num_generations() >= generations);
        assert!(filter.num_generations() <= generations + 1);
        generations = filter.num_generations();
    }
    assert!(generations > 1);

    for i in 1..generations {
        let previous = filter.generation(i - 1).unwrap().error_probability();
        let current = filter.generation(i).unwrap().error_probability();
        assert!(current < previous);
        assert_eq!(current, 0.001 * 0.9f64.powf(i as f64));
    }

    filter.reset().unwrap();
    assert_eq!(filter.num_generations(), 1);
    assert_eq!(filter.count(), 0);
}

#[test]
fn test_no_false_negatives_across_generations() {
    for underlying in [Underlying::Standard, Underlying::Partitioned] {
        let mut filter = BloomFilterBuilder::new(100)
            .underlying(underlying)
            .build_scalable()
            .unwrap();
        for i in 0..5000 {
            let item = member(i);
            assert!(filter.add(&item).check(&item));
        }
        assert!(filter.num_generations() > 10);
        for i in 0..5000 {
            assert!(filter.check(&member(i)), "lost member-{i} ({underlying:?})");
        }
        assert_eq!(filter.count(), 5000);
    }
}

#[test]
fn test_compound_false_positive_rate() {
    const N: u32 = 20_000;
    const Q: u32 = 100_000;

    for underlying in [Underlying::Standard, Underlying::Partitioned] {
        let mut filter = BloomFilterBuilder::new(5000)
            .underlying(underlying)
            .build_scalable()
            .unwrap();
        for i in 0..N {
            filter.add(&member(i));
        }

        let budget: f64 = (0..filter.num_generations())
            .map(|i| filter.generation_error_rate(i))
            .sum();
        assert!(budget < 0.001 / (1.0 - 0.9));

        let false_positives = (0..Q).filter(|&i| filter.check(&absent(i))).count();
        let rate = false_positives as f64 / f64::from(Q);
        assert_that!(rate, le(2.0 * budget));
    }
}

#[test]
fn test_fill_ratio_reports_newest_generation() {
    let mut filter = ScalableBloom::new(20).unwrap();
    for i in 0..100 {
        filter.add(&member(i));
    }
    assert!(filter.num_generations() > 1);

    let newest = filter.generation(filter.num_generations() - 1).unwrap();
    assert_eq!(filter.fill_ratio(), newest.fill_ratio());
    assert_eq!(filter.estimated_fill_ratio(), newest.estimated_fill_ratio());
}

#[test]
fn test_custom_constructor() {
    let mut filter = ScalableBloom::new(10).unwrap();
    filter.set_bloom_filter(Arc::new(
        |n: u64| -> Result<Box<dyn BloomFilter>, Error> { Ok(Box::new(StandardBloom::new(n)?)) },
    ));
    filter.reset().unwrap();

    for i in 0..100 {
        filter.add(&member(i));
    }
    assert!(filter.num_generations() > 1);
    assert!((0..100).all(|i| filter.check(&member(i))));
}

#[test]
fn test_stats_list_every_generation() {
    let mut filter = ScalableBloom::new(5).unwrap();
    for i in 0..30 {
        filter.add(&member(i));
    }
    let mut stats = String::new();
    filter.write_stats(&mut stats).unwrap();

    assert!(stats.starts_with("n = 5, p = 0.5, e = 0.001\nTotal items: 30\n"));
    for i in 0..filter.num_generations() {
        assert!(stats.contains(&format!("Scalable Bloom Filter #{i}\n")));
    }
}

#[test]
fn test_rejects_narrow_digest() {
    let mut filter = ScalableBloom::new(100).unwrap();
    filter.add(b"before");

    let err = filter.set_hasher(Box::new(NarrowDigest::default())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDigest);

    assert!(filter.check(b"before"));
    filter.reset().unwrap();
    assert!(filter.is_empty());
    filter.add(b"after");
    assert!(filter.check(b"after"));
    assert_eq!(filter.count(), 1);

    let err = BloomFilterBuilder::new(100)
        .hasher(NarrowDigest::default())
        .build_scalable()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDigest);
}
