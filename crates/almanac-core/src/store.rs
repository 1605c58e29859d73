use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::event::Event;

/// Owns the on-disk event list. All reads and writes go through here;
/// nothing else touches the data file.
#[derive(Debug)]
pub struct EventStore {
    pub data_dir: PathBuf,
    pub events_path: PathBuf,
}

impl EventStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let events_path = data_dir.join("events.data");
        if !events_path.exists() {
            fs::write(&events_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            events = %events_path.display(),
            "opened event store"
        );

        Ok(Self { data_dir, events_path })
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> anyhow::Result<Vec<Event>> {
        load_jsonl(&self.events_path).context("failed to load events.data")
    }

    #[tracing::instrument(skip(self, events))]
    pub fn save(&self, events: &[Event]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.events_path, events).context("failed to save events.data")
    }

    /// Ids are assigned monotonically: one past the highest in use.
    pub fn next_id(&self, events: &[Event]) -> u64 {
        events.iter().map(|e| e.id).max().unwrap_or(0) + 1
    }

    #[tracing::instrument(skip(self, events, event), fields(id = event.id))]
    pub fn add(&self, mut events: Vec<Event>, event: Event) -> anyhow::Result<Vec<Event>> {
        events.push(event);
        events.sort_by_key(|e| e.id);
        self.save(&events)?;
        Ok(events)
    }

    #[tracing::instrument(skip(self, events, event), fields(id = event.id))]
    pub fn update(&self, mut events: Vec<Event>, event: Event) -> anyhow::Result<Vec<Event>> {
        let slot = events
            .iter_mut()
            .find(|e| e.id == event.id)
            .ok_or_else(|| anyhow!("event not found: {}", event.id))?;
        *slot = event;
        self.save(&events)?;
        Ok(events)
    }

    #[tracing::instrument(skip(self, events))]
    pub fn delete(&self, mut events: Vec<Event>, id: u64) -> anyhow::Result<Vec<Event>> {
        let before = events.len();
        events.retain(|e| e.id != id);
        if events.len() == before {
            return Err(anyhow!("event not found: {id}"));
        }
        self.save(&events)?;
        Ok(events)
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<Event>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event: Event = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(event);
    }

    debug!(count = out.len(), "loaded events from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, events))]
fn save_jsonl_atomic(path: &Path, events: &[Event]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = events.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for event in events {
        let serialized = serde_json::to_string(event)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
