// pacing.rs
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// Request pacing for one crawl: the order pages are visited in and how long
/// to wait between requests.
pub trait Pacing {
    fn order_pages(&self, pages: &mut [u32]);
    fn page_delay(&self) -> Duration;
    fn retry_delay(&self, attempt: u32) -> Duration;
}

/// Shuffled page order, 1-2s between pages, capped linear backoff with jitter.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPacing;

impl RandomPacing {
    const MAX_BACKOFF_SECS: u64 = 10;
    const JITTER_MAX_SECS: u64 = 2;
}

impl Pacing for RandomPacing {
    fn order_pages(&self, pages: &mut [u32]) {
        pages.shuffle(&mut rand::thread_rng());
    }

    fn page_delay(&self) -> Duration {
        Duration::from_secs_f64(1.0 + rand::thread_rng().gen::<f64>())
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let base = std::cmp::min(2 * attempt as u64, Self::MAX_BACKOFF_SECS);
        let jitter = rand::thread_rng().gen_range(0..=Self::JITTER_MAX_SECS);
        Duration::from_secs(base + jitter)
    }
}

/// Pages in ascending order, no waiting.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacing;

impl Pacing for NoPacing {
    fn order_pages(&self, _pages: &mut [u32]) {}

    fn page_delay(&self) -> Duration {
        Duration::ZERO
    }

    fn retry_delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}
