use serde::{Deserialize, Serialize};

use crate::world::{World, WorldDelta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    #[default]
    Waiting,
    Running,
    Done,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stage {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub state: StageState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

/// Server-side generation progress. `percentage` is a fraction in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

/// One message on the world stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Chunk {
        #[serde(default)]
        seq: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<Progress>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        world: Option<WorldDelta>,
    },
    Done {
        #[serde(default)]
        seq: u64,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IngestError {
    #[error("stream skipped from seq {last} to {incoming}")]
    SequenceGap { last: u64, incoming: u64 },
    #[error("server reported failure: {0}")]
    Remote(String),
    #[error("stream ended before completion")]
    Truncated,
    #[error("event received after stream completed")]
    AfterDone,
}

/// What a single accepted event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestStep {
    pub progress_changed: bool,
    pub world_changed: bool,
    pub finished: bool,
}

/// Sequence `0` means the sender does not number its events.
pub fn has_seq_gap(last_seq: Option<u64>, incoming_seq: u64) -> bool {
    if incoming_seq == 0 {
        return false;
    }

    match last_seq {
        Some(last_seq) => incoming_seq != last_seq.saturating_add(1),
        None => false,
    }
}

/// Folds stream events into a [`World`].
#[derive(Debug, Default)]
pub struct Ingestion {
    world: World,
    progress: Option<Progress>,
    last_seq: Option<u64>,
    chunks: usize,
    finished: bool,
}

impl Ingestion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn progress(&self) -> Option<&Progress> {
        self.progress.as_ref()
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    fn check_seq(&mut self, seq: u64) -> Result<(), IngestError> {
        if has_seq_gap(self.last_seq, seq) {
            return Err(IngestError::SequenceGap {
                last: self.last_seq.unwrap_or_default(),
                incoming: seq,
            });
        }
        if seq > 0 {
            self.last_seq = Some(seq);
        }
        Ok(())
    }

    /// Apply one event. Errors are terminal for the session.
    pub fn apply(&mut self, event: StreamEvent) -> Result<IngestStep, IngestError> {
        if self.finished {
            return Err(IngestError::AfterDone);
        }
        match event {
            StreamEvent::Chunk {
                seq,
                progress,
                world,
            } => {
                self.check_seq(seq)?;
                self.chunks += 1;
                let progress_changed = progress.is_some();
                if progress.is_some() {
                    self.progress = progress;
                }
                let world_changed = world.is_some();
                if let Some(delta) = world {
                    self.world.merge(delta);
                }
                Ok(IngestStep {
                    progress_changed,
                    world_changed,
                    finished: false,
                })
            }
            StreamEvent::Done { seq } => {
                self.check_seq(seq)?;
                self.finished = true;
                Ok(IngestStep {
                    progress_changed: false,
                    world_changed: false,
                    finished: true,
                })
            }
            StreamEvent::Failed { message } => Err(IngestError::Remote(message)),
        }
    }

    /// Called when the transport closes.
    pub fn finish(&self) -> Result<(), IngestError> {
        if self.finished {
            Ok(())
        } else {
            Err(IngestError::Truncated)
        }
    }
}
