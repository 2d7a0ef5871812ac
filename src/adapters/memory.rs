//! In-process store for single-process runs and tests.
//!
//! Implements the same ports as the Redis adapter. Every operation takes one
//! lock, so slot check-and-add and job read-modify-write are atomic.

use crate::domain::jobs::{Job, JobMode, JobUpdate, UpdateOutcome};
use crate::domain::search::{normalize_query, SearchResult};
use crate::ports::cache::{AudioCache, CacheLookup, SearchCache};
use crate::ports::repository::JobRepository;
use crate::ports::slots::SlotController;
use crate::ports::StoreError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Default)]
struct Slots {
    members: HashSet<String>,
    expires_at: Option<Instant>,
}

impl Slots {
    // The whole set expires at once, like a Redis key with a TTL.
    fn purge_expired(&mut self) {
        if matches!(self.expires_at, Some(at) if Instant::now() >= at) {
            self.members.clear();
            self.expires_at = None;
        }
    }
}

#[derive(Default)]
struct State {
    jobs: HashMap<String, Expiring<Job>>,
    slots: Slots,
    searches: HashMap<String, Expiring<Vec<SearchResult>>>,
    audio: HashMap<String, Expiring<String>>,
}

/// Memory-backed job repository, slot set and caches.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    job_ttl: Duration,
    max_concurrent: usize,
    slot_ttl: Duration,
}

impl MemoryStore {
    pub fn new(job_ttl: Duration, max_concurrent: usize, slot_ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            job_ttl,
            max_concurrent,
            slot_ttl,
        }
    }

    /// Number of live jobs.
    pub async fn job_count(&self) -> usize {
        let state = self.state.lock().await;
        state.jobs.values().filter(|j| j.is_live()).count()
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn create(
        &self,
        video_id: &str,
        mode: JobMode,
        title: Option<String>,
    ) -> Result<String, StoreError> {
        let mut state = self.state.lock().await;
        state.jobs.retain(|_, j| j.is_live());
        let mut job_id = Uuid::new_v4().to_string();
        while state.jobs.get(&job_id).is_some_and(|j| j.is_live()) {
            job_id = Uuid::new_v4().to_string();
        }

        let job = Job::new(job_id.clone(), video_id.to_string(), mode, title);
        state.jobs.insert(job_id.clone(), Expiring::new(job, self.job_ttl));
        Ok(job_id)
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .jobs
            .get(job_id)
            .filter(|j| j.is_live())
            .map(|j| j.value.clone()))
    }

    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<UpdateOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let Some(entry) = state.jobs.get_mut(job_id).filter(|j| j.is_live()) else {
            return Ok(UpdateOutcome::Expired);
        };

        let mut job = entry.value.clone();
        if let Err(e) = job.apply(&update) {
            return Ok(UpdateOutcome::Rejected(e));
        }
        *entry = Expiring::new(job.clone(), self.job_ttl);
        Ok(UpdateOutcome::Applied(job))
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[async_trait]
impl SlotController for MemoryStore {
    async fn try_acquire(&self, owner_id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let slots = &mut state.slots;
        slots.purge_expired();

        if !slots.members.contains(owner_id) && slots.members.len() >= self.max_concurrent {
            return Ok(false);
        }
        slots.members.insert(owner_id.to_string());
        slots.expires_at = Some(Instant::now() + self.slot_ttl);
        Ok(true)
    }

    async fn release(&self, owner_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.slots.members.remove(owner_id);
        Ok(())
    }

    async fn active(&self) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        state.slots.purge_expired();
        Ok(state.slots.members.len())
    }
}

#[async_trait]
impl SearchCache for MemoryStore {
    async fn lookup(&self, query: &str) -> CacheLookup<Vec<SearchResult>> {
        let state = self.state.lock().await;
        match state.searches.get(&normalize_query(query)) {
            Some(entry) if entry.is_live() => CacheLookup::Hit(entry.value.clone()),
            _ => CacheLookup::Miss,
        }
    }

    async fn store(&self, query: &str, results: &[SearchResult], ttl: Duration) {
        let mut state = self.state.lock().await;
        state.searches.retain(|_, e| e.is_live());
        state
            .searches
            .insert(normalize_query(query), Expiring::new(results.to_vec(), ttl));
    }
}

#[async_trait]
impl AudioCache for MemoryStore {
    async fn lookup(&self, video_id: &str) -> CacheLookup<String> {
        let state = self.state.lock().await;
        match state.audio.get(video_id) {
            Some(entry) if entry.is_live() => CacheLookup::Hit(entry.value.clone()),
            _ => CacheLookup::Miss,
        }
    }

    async fn store(&self, video_id: &str, location: &str, ttl: Duration) {
        let mut state = self.state.lock().await;
        state.audio.retain(|_, e| e.is_live());
        state
            .audio
            .insert(video_id.to_string(), Expiring::new(location.to_string(), ttl));
    }
}
