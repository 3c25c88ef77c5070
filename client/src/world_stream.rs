use futures::channel::mpsc;
use futures::{FutureExt, StreamExt};
use gloo_timers::future::TimeoutFuture;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{EventSource, EventSourceInit, MessageEvent};

use hexworld_shared::{IngestError, IngestStep, StreamEvent};

use crate::config;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("could not open world stream: {0}")]
    Connect(String),
    #[error("world stream timed out after {0} ms")]
    Timeout(u32),
    #[error("malformed stream message: {0}")]
    Decode(String),
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

/// Query for a generated world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldRequest {
    pub layers: u32,
    pub rows: u32,
    pub columns: u32,
    pub max_rows_per_segment: u32,
    pub max_columns_per_segment: u32,
}

impl WorldRequest {
    pub fn sample(segment_tiles: u32) -> Self {
        Self {
            layers: config::WORLD_LAYERS,
            rows: config::WORLD_ROWS,
            columns: config::WORLD_COLUMNS,
            max_rows_per_segment: segment_tiles,
            max_columns_per_segment: segment_tiles,
        }
    }

    pub fn url(&self, api_address: &str) -> String {
        format!(
            "{}{}?layers={}&rows={}&columns={}&max_rows_per_segment={}&max_columns_per_segment={}",
            api_address.trim_end_matches('/'),
            config::SAMPLE_WORLD_PATH,
            self.layers,
            self.rows,
            self.columns,
            self.max_rows_per_segment,
            self.max_columns_per_segment,
        )
    }
}

pub fn decode_event(data: &str) -> Result<StreamEvent, FetchError> {
    serde_json::from_str(data).map_err(|err| FetchError::Decode(err.to_string()))
}

enum Message {
    Data(String),
    Error,
}

/// Open `EventSource` plus its handlers. Closed and unregistered on drop.
struct StreamConnection {
    es: EventSource,
    _on_message: Closure<dyn Fn(MessageEvent)>,
    _on_error: Closure<dyn Fn()>,
}

impl StreamConnection {
    fn open(url: &str, tx: mpsc::UnboundedSender<Message>) -> Result<Self, FetchError> {
        let init = EventSourceInit::new();
        init.set_with_credentials(true);
        let es = EventSource::new_with_event_source_init_dict(url, &init)
            .map_err(|err| FetchError::Connect(format!("{err:?}")))?;

        let data_tx = tx.clone();
        let on_message = Closure::<dyn Fn(MessageEvent)>::new(move |e: MessageEvent| {
            if let Some(data) = e.data().as_string() {
                let _ = data_tx.unbounded_send(Message::Data(data));
            }
        });
        es.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let on_error = Closure::<dyn Fn()>::new(move || {
            let _ = tx.unbounded_send(Message::Error);
        });
        es.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        Ok(Self {
            es,
            _on_message: on_message,
            _on_error: on_error,
        })
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.es.set_onmessage(None);
        self.es.set_onerror(None);
        self.es.close();
    }
}

/// Stream a world, feeding every event to `apply` until the server reports completion.
///
/// There is no retry: the first transport error, malformed message, sequence
/// gap or the overall timeout ends the session.
pub async fn stream_world(
    request: WorldRequest,
    mut apply: impl FnMut(StreamEvent) -> Result<IngestStep, IngestError>,
) -> Result<(), FetchError> {
    let url = request.url(config::api_address());
    tracing::info!(%url, "opening world stream");

    let (tx, mut rx) = mpsc::unbounded();
    let _connection = StreamConnection::open(&url, tx)?;
    let mut timeout = TimeoutFuture::new(config::STREAM_TIMEOUT_MS).fuse();
    let mut events = 0usize;

    loop {
        let message = futures::select! {
            message = rx.next() => message,
            _ = timeout => {
                tracing::warn!(events, "world stream timed out");
                return Err(FetchError::Timeout(config::STREAM_TIMEOUT_MS));
            }
        };
        match message {
            Some(Message::Data(data)) => {
                let step = apply(decode_event(&data)?)?;
                events += 1;
                if step.finished {
                    tracing::info!(events, "world stream complete");
                    return Ok(());
                }
            }
            Some(Message::Error) | None => {
                tracing::warn!(events, "world stream closed before completion");
                return Err(IngestError::Truncated.into());
            }
        }
    }
}
