//! Scripted collaborators for orchestrator tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

use super::{AudioInput, BoxedVoice, FinishCallback, VoiceConnector, VoiceSession};
use crate::{
    common::{
        errors::{ResolutionError, TransportError},
        types::{AnyResult, DestinationId, SessionId},
    },
    configs::Config,
    protocol::tracks::TrackRef,
    server::{AppState, notifier::Notifier},
    sources::TrackResolver,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Accept,
    /// Never answers; the caller's timeout fires.
    Hang,
    Invalid,
}

#[derive(Default)]
pub struct FakeConnector {
    behaviours: Mutex<HashMap<DestinationId, Behaviour>>,
    voices: Mutex<Vec<Arc<FakeVoice>>>,
    pub connects: AtomicUsize,
}

impl FakeConnector {
    pub fn set(&self, destination: &str, behaviour: Behaviour) {
        self.behaviours
            .lock()
            .insert(DestinationId::from(destination), behaviour);
    }

    pub fn last_voice(&self) -> Option<Arc<FakeVoice>> {
        self.voices.lock().last().cloned()
    }

    pub fn voice_count(&self) -> usize {
        self.voices.lock().len()
    }
}

#[async_trait]
impl VoiceConnector for FakeConnector {
    async fn connect(
        &self,
        _session: &SessionId,
        destination: &DestinationId,
    ) -> Result<BoxedVoice, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let behaviour = self
            .behaviours
            .lock()
            .get(destination)
            .copied()
            .unwrap_or(Behaviour::Accept);

        match behaviour {
            Behaviour::Accept => {
                let voice = Arc::new(FakeVoice::new(destination.clone()));
                self.voices.lock().push(voice.clone());
                Ok(voice)
            }
            Behaviour::Hang => futures::future::pending().await,
            Behaviour::Invalid => Err(TransportError::InvalidDestination(destination.clone())),
        }
    }
}

#[derive(Default)]
struct Playing {
    current: Option<(AudioInput, FinishCallback)>,
    paused: bool,
    played: Vec<AudioInput>,
    rejected_uris: HashSet<String>,
    reject_next: usize,
}

/// Voice session that only records what it is asked to do. Loads end when
/// the test says so.
pub struct FakeVoice {
    destination: Mutex<DestinationId>,
    connected: AtomicBool,
    broken: AtomicBool,
    playing: Mutex<Playing>,
    pub rejections: AtomicUsize,
}

impl FakeVoice {
    fn new(destination: DestinationId) -> Self {
        Self {
            destination: Mutex::new(destination),
            connected: AtomicBool::new(true),
            broken: AtomicBool::new(false),
            playing: Mutex::new(Playing::default()),
            rejections: AtomicUsize::new(0),
        }
    }

    fn take_current(&self) -> Option<FinishCallback> {
        let mut playing = self.playing.lock();
        playing.paused = false;
        playing.current.take().map(|(_, cb)| cb)
    }

    /// Ends the current load as if the source ran out.
    pub fn finish(&self, error: Option<&str>) -> bool {
        match self.take_current() {
            Some(cb) => {
                cb(error.map(str::to_owned));
                true
            }
            None => false,
        }
    }

    /// Loses the transport mid-load.
    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(cb) = self.take_current() {
            cb(Some("connection lost".into()));
        }
    }

    /// Forgets the current load without ever completing it.
    pub fn forget(&self) {
        drop(self.take_current());
    }

    /// Every later connectivity check panics.
    pub fn break_down(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn reject_uri(&self, uri: &str) {
        self.playing.lock().rejected_uris.insert(uri.to_owned());
    }

    pub fn reject_next(&self, count: usize) {
        self.playing.lock().reject_next = count;
    }

    /// Titles of every accepted input, silence shown as `~`.
    pub fn played(&self) -> Vec<String> {
        self.playing
            .lock()
            .played
            .iter()
            .map(|input| match input {
                AudioInput::Track(track) => track.title.clone(),
                AudioInput::Silence(_) => "~".to_owned(),
            })
            .collect()
    }

    pub fn emitting_silence(&self) -> bool {
        self.playing
            .lock()
            .current
            .as_ref()
            .is_some_and(|(input, _)| input.is_silence())
    }
}

#[async_trait]
impl VoiceSession for FakeVoice {
    fn destination(&self) -> DestinationId {
        self.destination.lock().clone()
    }

    fn play(&self, input: AudioInput, on_finished: FinishCallback) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }

        let previous = {
            let mut playing = self.playing.lock();
            let rejected = match &input {
                AudioInput::Track(track) => playing.rejected_uris.contains(&track.source_uri),
                AudioInput::Silence(_) => false,
            };
            if rejected || playing.reject_next > 0 {
                playing.reject_next = playing.reject_next.saturating_sub(1);
                self.rejections.fetch_add(1, Ordering::SeqCst);
                return Err(TransportError::Rejected("scripted rejection".into()));
            }
            playing.paused = false;
            playing.played.push(input.clone());
            playing.current.replace((input, on_finished))
        };

        if let Some((_, cb)) = previous {
            cb(None);
        }
        Ok(())
    }

    fn stop(&self) {
        if let Some(cb) = self.take_current() {
            cb(None);
        }
    }

    fn pause(&self) {
        let mut playing = self.playing.lock();
        if playing.current.is_some() {
            playing.paused = true;
        }
    }

    fn resume(&self) {
        self.playing.lock().paused = false;
    }

    fn is_playing(&self) -> bool {
        let playing = self.playing.lock();
        playing.current.is_some() && !playing.paused
    }

    fn is_paused(&self) -> bool {
        let playing = self.playing.lock();
        playing.current.is_some() && playing.paused
    }

    fn is_connected(&self) -> bool {
        if self.broken.load(Ordering::SeqCst) {
            panic!("voice backend crashed");
        }
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.stop();
    }

    async fn move_to(&self, destination: &DestinationId) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        *self.destination.lock() = destination.clone();
        Ok(())
    }
}

/// Resolves any query to `https://tracks.test/<query>.mp3`. Queries starting
/// with `missing` are not found. When gated, each resolution waits for a
/// permit from [`FakeResolver::release`].
#[derive(Default)]
pub struct FakeResolver {
    gate: Option<Semaphore>,
    pub entered: Notify,
}

impl FakeResolver {
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            entered: Notify::new(),
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn uri(query: &str) -> String {
        format!("https://tracks.test/{}.mp3", query)
    }
}

#[async_trait]
impl TrackResolver for FakeResolver {
    async fn resolve(&self, query: &str) -> Result<TrackRef, ResolutionError> {
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| ResolutionError::Lookup(e.to_string()))?
                .forget();
        }
        if query.starts_with("missing") {
            return Err(ResolutionError::NotFound(query.to_owned()));
        }
        Ok(TrackRef::new(Self::uri(query), query))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> AnyResult<()> {
        self.messages.lock().push(text.to_owned());
        Ok(())
    }
}

pub struct Harness {
    pub app: Arc<AppState>,
    pub connector: Arc<FakeConnector>,
    pub resolver: Arc<FakeResolver>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_resolver(FakeResolver::default())
    }

    pub fn with_resolver(resolver: FakeResolver) -> Self {
        let mut config = Config::default();
        config.player.connect_timeout_ms = 50;
        config.player.silence_segment_ms = 1_000;

        let connector = Arc::new(FakeConnector::default());
        let resolver = Arc::new(resolver);
        let app = AppState::new(config, connector.clone(), resolver.clone());
        Self {
            app,
            connector,
            resolver,
        }
    }

    pub fn voice(&self) -> Arc<FakeVoice> {
        self.connector.last_voice().expect("no voice session was opened")
    }

    /// Lets spawned notice deliveries run.
    pub async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }
}
