//! Engagement synthesis for items that arrive without one
//!
//! Spike detection expects every item to carry an engagement weight. When the
//! upstream source has none, a value is drawn from an [`EngagementSource`].
//! Tests pin the value with [`FixedEngagement`] or [`SeededEngagement`].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::RangeInclusive;
use std::sync::Mutex;

use crate::models::ContentItem;

/// Range synthesized values are drawn from
pub const ENGAGEMENT_RANGE: RangeInclusive<u32> = 1..=100;

/// Source of synthetic engagement values
pub trait EngagementSource: Send + Sync {
    /// Produce one engagement value
    fn sample(&self) -> u32;
}

/// Uniform random values in [`ENGAGEMENT_RANGE`]
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomEngagement;

impl EngagementSource for RandomEngagement {
    fn sample(&self) -> u32 {
        rand::thread_rng().gen_range(ENGAGEMENT_RANGE)
    }
}

/// Reproducible values from a seeded ChaCha stream
pub struct SeededEngagement {
    rng: Mutex<ChaCha8Rng>,
}

impl SeededEngagement {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }
}

impl EngagementSource for SeededEngagement {
    fn sample(&self) -> u32 {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(ENGAGEMENT_RANGE),
            Err(poisoned) => poisoned.into_inner().gen_range(ENGAGEMENT_RANGE),
        }
    }
}

/// Always the same value
#[derive(Debug, Clone, Copy)]
pub struct FixedEngagement(pub u32);

impl EngagementSource for FixedEngagement {
    fn sample(&self) -> u32 {
        self.0
    }
}

/// Copy `items`, filling missing engagement from `source`
pub fn annotate(items: &[ContentItem], source: &dyn EngagementSource) -> Vec<ContentItem> {
    items
        .iter()
        .map(|item| {
            let mut item = item.clone();
            if item.engagement.is_none() {
                item.engagement = Some(source.sample());
            }
            item
        })
        .collect()
}
