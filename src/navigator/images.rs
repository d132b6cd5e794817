//! Lazy poster loading for realized navigator slots
//!
//! Loads are staggered by dispatch order (soft limiter) and gated by a
//! semaphore (hard cap on concurrent downloads).

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};

use crate::api::{ApiClient, ApiError, Poster, ThumbnailRecord};

pub trait PosterSource: Clone + Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Arc<Poster>, ApiError>> + Send;
}

impl PosterSource for ApiClient {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Arc<Poster>, ApiError>> + Send {
        self.fetch_poster(url)
    }
}

#[derive(Debug, Clone, Default)]
pub enum SlotState {
    #[default]
    Empty,
    Loading,
    Ready(Arc<Poster>),
    /// Fetch failed or the record has no poster
    Placeholder,
}

impl SlotState {
    #[cfg(test)]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Placeholder)
    }
}

#[derive(Debug)]
pub struct ImageEvent {
    generation: u64,
    slot: String,
    result: Result<Arc<Poster>, String>,
}

pub struct LazyImageLoader<P> {
    source: P,
    slots: HashMap<String, SlotState>,
    semaphore: Arc<Semaphore>,
    stagger: Duration,
    generation: u64,
    event_tx: mpsc::UnboundedSender<ImageEvent>,
    event_rx: mpsc::UnboundedReceiver<ImageEvent>,
}

impl<P: PosterSource> LazyImageLoader<P> {
    pub fn new(source: P, max_concurrent: usize, stagger: Duration) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            source,
            slots: HashMap::new(),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            stagger,
            generation: 0,
            event_tx,
            event_rx,
        }
    }

    pub fn slot(&self, slot: &str) -> Option<&SlotState> {
        self.slots.get(slot)
    }

    #[cfg(test)]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.slots
            .values()
            .filter(|state| matches!(state, SlotState::Loading))
            .count()
    }

    /// Start loading a slot's poster. `order` delays dispatch by
    /// `order * stagger`. Returns true if a fetch was spawned.
    pub fn load(&mut self, slot: &str, url: Option<&str>, order: usize) -> bool {
        if matches!(
            self.slots.get(slot),
            Some(SlotState::Loading | SlotState::Ready(_) | SlotState::Placeholder)
        ) {
            return false;
        }

        let Some(url) = url else {
            self.slots.insert(slot.to_string(), SlotState::Placeholder);
            return false;
        };

        self.slots.insert(slot.to_string(), SlotState::Loading);

        let delay = self.stagger * order as u32;
        let source = self.source.clone();
        let semaphore = Arc::clone(&self.semaphore);
        let tx = self.event_tx.clone();
        let generation = self.generation;
        let slot = slot.to_string();
        let url = url.to_string();

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => source.fetch(&url).await.map_err(|e| e.to_string()),
                Err(_) => Err("image loader closed".to_string()),
            };
            let _ = tx.send(ImageEvent {
                generation,
                slot,
                result,
            });
        });

        true
    }

    /// Load every record in `range`, staggered by position among the
    /// dispatched loads. Returns how many fetches were spawned.
    pub fn load_visible(&mut self, records: &[ThumbnailRecord], range: Range<usize>) -> usize {
        let end = range.end.min(records.len());
        let start = range.start.min(end);

        let mut dispatched = 0;
        for record in &records[start..end] {
            if self.load(&record.task_id, record.poster_url.as_deref(), dispatched) {
                dispatched += 1;
            }
        }
        dispatched
    }

    /// Drop slots for records outside `range` widened by `margin`. Returns how
    /// many were evicted. A fetch still in flight for an evicted slot is
    /// ignored when it lands.
    pub fn evict_outside(
        &mut self,
        records: &[ThumbnailRecord],
        range: Range<usize>,
        margin: usize,
    ) -> usize {
        let end = range.end.saturating_add(margin).min(records.len());
        let start = range.start.saturating_sub(margin).min(end);
        let keep: HashSet<&str> = records[start..end]
            .iter()
            .map(|record| record.task_id.as_str())
            .collect();

        let before = self.slots.len();
        self.slots.retain(|slot, _| keep.contains(slot.as_str()));
        before - self.slots.len()
    }

    /// Forget every slot; results still in flight are ignored when they land
    pub fn clear(&mut self) {
        self.slots.clear();
        self.generation += 1;
    }

    pub fn apply(&mut self, event: ImageEvent) -> bool {
        if event.generation != self.generation {
            return false;
        }
        let Some(state) = self.slots.get_mut(&event.slot) else {
            return false;
        };

        *state = match event.result {
            Ok(poster) => SlotState::Ready(poster),
            Err(e) => {
                tracing::debug!("Navigator: poster for {} unavailable: {}", event.slot, e);
                SlotState::Placeholder
            }
        };
        true
    }

    pub fn drain_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.event_rx.try_recv() {
            changed |= self.apply(event);
        }
        changed
    }

    #[cfg(test)]
    pub async fn next_event(&mut self) -> ImageEvent {
        self.event_rx
            .recv()
            .await
            .expect("loader holds its own sender")
    }
}
