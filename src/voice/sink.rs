//! Null-sink voice backend: emission is real (sources are pulled and paced
//! frame by frame) but the audio is discarded instead of being sent to a
//! transport.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::{AudioInput, BoxedVoice, FinishCallback, VoiceConnector, VoiceSession};
use crate::{
    audio::{EmissionHandle, PlaybackState, SilenceSource, constants::SOURCE_CHUNK_BYTES},
    common::{
        errors::TransportError,
        types::{DestinationId, SessionId},
    },
    configs::VoiceConfig,
    protocol::tracks::TrackRef,
};

pub struct SinkConnector {
    config: VoiceConfig,
    http: reqwest::Client,
}

impl SinkConnector {
    pub fn new(config: VoiceConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    fn accepts(config: &VoiceConfig, destination: &DestinationId) -> bool {
        config.destinations.iter().any(|d| d == &destination.0)
    }
}

#[async_trait]
impl VoiceConnector for SinkConnector {
    async fn connect(
        &self,
        session: &SessionId,
        destination: &DestinationId,
    ) -> Result<BoxedVoice, TransportError> {
        if self.config.connect_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.connect_delay_ms)).await;
        }
        if !Self::accepts(&self.config, destination) {
            return Err(TransportError::InvalidDestination(destination.clone()));
        }

        info!("[{}] sink connected to {}", session, destination);
        Ok(Arc::new(SinkVoice {
            session: session.clone(),
            destination: Mutex::new(destination.clone()),
            connected: AtomicBool::new(true),
            current: Mutex::new(None),
            config: self.config.clone(),
            http: self.http.clone(),
        }))
    }
}

pub struct SinkVoice {
    session: SessionId,
    destination: Mutex<DestinationId>,
    connected: AtomicBool,
    current: Mutex<Option<EmissionHandle>>,
    config: VoiceConfig,
    http: reqwest::Client,
}

impl SinkVoice {
    fn current_state(&self) -> PlaybackState {
        self.current
            .lock()
            .as_ref()
            .map(|h| h.get_state())
            .unwrap_or(PlaybackState::Stopped)
    }

    fn check_source(track: &TrackRef) -> Result<(), TransportError> {
        let uri = track.source_uri.as_str();
        if uri.starts_with("http://")
            || uri.starts_with("https://")
            || uri.starts_with("file://")
            || uri.starts_with('/')
        {
            Ok(())
        } else {
            Err(TransportError::Rejected(format!(
                "unsupported source address: {}",
                uri
            )))
        }
    }

    async fn open_source(
        http: &reqwest::Client,
        uri: &str,
    ) -> Result<BoxStream<'static, Result<Bytes, String>>, String> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            let response = http
                .get(uri)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| e.to_string())?;
            Ok(response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| e.to_string()))
                .boxed())
        } else {
            let path = uri.strip_prefix("file://").unwrap_or(uri);
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| format!("{}: {}", path, e))?;
            Ok(
                tokio_util::io::ReaderStream::with_capacity(file, SOURCE_CHUNK_BYTES)
                    .map(|chunk| chunk.map_err(|e| e.to_string()))
                    .boxed(),
            )
        }
    }
}

/// Parks while paused. Returns false once the emission is cancelled.
async fn wait_while_paused(handle: &EmissionHandle) -> bool {
    while handle.get_state() == PlaybackState::Paused {
        tokio::select! {
            _ = handle.cancelled().cancelled() => return false,
            _ = tokio::time::sleep(SilenceSource::frame_duration()) => {}
        }
    }
    !handle.cancelled().is_cancelled()
}

async fn emit_silence(source: SilenceSource, handle: &EmissionHandle) -> Result<(), String> {
    let mut ticker = tokio::time::interval(SilenceSource::frame_duration());
    for _frame in source {
        if !wait_while_paused(handle).await {
            return Ok(());
        }
        tokio::select! {
            _ = handle.cancelled().cancelled() => return Ok(()),
            _ = ticker.tick() => handle.record_frame(),
        }
    }
    Ok(())
}

async fn emit_track(
    http: reqwest::Client,
    track: TrackRef,
    bitrate_kbps: u32,
    handle: &EmissionHandle,
) -> Result<(), String> {
    let mut stream = tokio::select! {
        _ = handle.cancelled().cancelled() => return Ok(()),
        opened = SinkVoice::open_source(&http, &track.source_uri) => opened?,
    };

    // bytes per millisecond at the nominal bitrate
    let rate = (bitrate_kbps.max(8) / 8) as u64;
    let frame = SilenceSource::frame_duration();
    let mut owed = Duration::ZERO;

    loop {
        if !wait_while_paused(handle).await {
            return Ok(());
        }
        let chunk = tokio::select! {
            _ = handle.cancelled().cancelled() => return Ok(()),
            chunk = stream.next() => chunk,
        };
        let Some(chunk) = chunk else {
            return Ok(());
        };
        owed += Duration::from_millis(chunk?.len() as u64 / rate);

        while owed >= frame {
            if !wait_while_paused(handle).await {
                return Ok(());
            }
            tokio::select! {
                _ = handle.cancelled().cancelled() => return Ok(()),
                _ = tokio::time::sleep(frame) => handle.record_frame(),
            }
            owed -= frame;
        }
    }
}

#[async_trait]
impl VoiceSession for SinkVoice {
    fn destination(&self) -> DestinationId {
        self.destination.lock().clone()
    }

    fn play(&self, input: AudioInput, on_finished: FinishCallback) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        if let AudioInput::Track(track) = &input {
            Self::check_source(track)?;
        }

        let handle = EmissionHandle::new();
        if let Some(previous) = self.current.lock().replace(handle.clone()) {
            previous.stop();
        }

        let http = self.http.clone();
        let bitrate = self.config.bitrate_kbps;
        let session = self.session.clone();
        tokio::spawn(async move {
            let result = match input {
                AudioInput::Silence(source) => {
                    debug!("[{}] sink emitting {:?} of silence", session, source.length());
                    emit_silence(source, &handle).await
                }
                AudioInput::Track(track) => {
                    debug!("[{}] sink emitting {}", session, track.source_uri);
                    emit_track(http, track, bitrate, &handle).await
                }
            };
            debug!("[{}] sink emission ended at {}ms", session, handle.get_position());
            handle.stop();
            on_finished(result.err());
        });
        Ok(())
    }

    fn stop(&self) {
        if let Some(handle) = self.current.lock().as_ref() {
            handle.stop();
        }
    }

    fn pause(&self) {
        if let Some(handle) = self.current.lock().as_ref() {
            handle.pause();
        }
    }

    fn resume(&self) {
        if let Some(handle) = self.current.lock().as_ref() {
            handle.play();
        }
    }

    fn is_playing(&self) -> bool {
        self.current_state() == PlaybackState::Playing
    }

    fn is_paused(&self) -> bool {
        self.current_state() == PlaybackState::Paused
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            info!("[{}] sink disconnected from {}", self.session, self.destination());
        }
        self.stop();
    }

    async fn move_to(&self, destination: &DestinationId) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        if !SinkConnector::accepts(&self.config, destination) {
            return Err(TransportError::InvalidDestination(destination.clone()));
        }
        *self.destination.lock() = destination.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector() -> SinkConnector {
        SinkConnector::new(
            VoiceConfig {
                destinations: vec!["lobby".into(), "music".into()],
                connect_delay_ms: 0,
                bitrate_kbps: 160,
            },
            reqwest::Client::new(),
        )
    }

    fn recorder() -> (FinishCallback, flume::Receiver<Option<String>>) {
        let (tx, rx) = flume::unbounded();
        (
            Box::new(move |err| {
                let _ = tx.send(err);
            }),
            rx,
        )
    }

    #[tokio::test]
    async fn test_unknown_destination_is_invalid() {
        let err = connector()
            .connect(&"g1".into(), &"nowhere".into())
            .await
            .err()
            .expect("connect should fail");
        assert!(err.is_permanent());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_finishes_once_after_its_length() {
        let voice = connector()
            .connect(&"g1".into(), &"lobby".into())
            .await
            .expect("connect");
        let (callback, done) = recorder();

        voice
            .play(
                AudioInput::Silence(SilenceSource::new(Duration::from_millis(200))),
                callback,
            )
            .expect("play");
        assert!(voice.is_playing());

        let result = done.recv_async().await.expect("callback fired");
        assert_eq!(result, None);
        assert!(!voice.is_playing());
        assert!(done.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_fires_callback_without_error() {
        let voice = connector()
            .connect(&"g1".into(), &"lobby".into())
            .await
            .expect("connect");
        let (callback, done) = recorder();

        voice
            .play(
                AudioInput::Silence(SilenceSource::new(Duration::from_secs(60))),
                callback,
            )
            .expect("play");
        voice.pause();
        assert!(voice.is_paused());
        voice.stop();

        assert_eq!(done.recv_async().await.expect("callback fired"), None);
    }

    #[tokio::test]
    async fn test_rejects_unknown_scheme_and_disconnected_play() {
        let voice = connector()
            .connect(&"g1".into(), &"lobby".into())
            .await
            .expect("connect");
        let (callback, _done) = recorder();
        let err = voice
            .play(AudioInput::Track(TrackRef::new("ytsearch:abc", "abc")), callback)
            .err()
            .expect("should reject");
        assert!(matches!(err, TransportError::Rejected(_)));

        voice.disconnect().await;
        let (callback, _done) = recorder();
        let err = voice
            .play(
                AudioInput::Silence(SilenceSource::new(Duration::from_secs(1))),
                callback,
            )
            .err()
            .expect("should reject");
        assert_eq!(err, TransportError::Disconnected);
    }

    #[tokio::test]
    async fn test_move_checks_destination() {
        let voice = connector()
            .connect(&"g1".into(), &"lobby".into())
            .await
            .expect("connect");
        voice.move_to(&"music".into()).await.expect("move");
        assert_eq!(voice.destination(), DestinationId::from("music"));
        assert!(voice.move_to(&"attic".into()).await.is_err());
    }
}
