//! Fakes shared by the unit tests

use crate::actuator::{ActuatorError, Actuator, Level, PinDriver};
use crate::connection::LinkDriver;
use crate::delay::Delay;
use crate::transport::{Reply, ServerTransport, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Delay that records requested durations instead of waiting
#[derive(Default)]
pub struct RecordingDelay {
    sleeps: Mutex<Vec<Duration>>,
    never_wakes: bool,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// A delay that never completes, for cancellation tests
    pub fn blocking() -> Self {
        Self {
            sleeps: Mutex::new(Vec::new()),
            never_wakes: true,
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        if self.never_wakes {
            std::future::pending::<()>().await;
        }
    }
}

/// Pin driver that records successful writes and can fail on a level
#[derive(Default)]
pub struct RecordingPins {
    writes: Mutex<Vec<(u8, Level)>>,
    failing: Mutex<Option<Level>>,
}

impl RecordingPins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<(u8, Level)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.writes.lock().unwrap().clear();
    }

    /// Make every write of `level` fail
    pub fn fail_level(&self, level: Level) {
        *self.failing.lock().unwrap() = Some(level);
    }
}

impl PinDriver for RecordingPins {
    fn set_output(&self, _pin: u8) -> Result<(), ActuatorError> {
        Ok(())
    }

    fn write(&self, pin: u8, level: Level) -> Result<(), ActuatorError> {
        if *self.failing.lock().unwrap() == Some(level) {
            return Err(ActuatorError::Hardware {
                pin,
                reason: "relay stuck".into(),
            });
        }
        self.writes.lock().unwrap().push((pin, level));
        Ok(())
    }
}

/// Actuator that counts activations
pub struct CountingActuator {
    drawers: usize,
    activations: Mutex<Vec<usize>>,
    fail: AtomicBool,
}

impl CountingActuator {
    pub fn new(drawers: usize) -> Self {
        Self {
            drawers,
            activations: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing(drawers: usize) -> Self {
        let actuator = Self::new(drawers);
        actuator.fail.store(true, Ordering::SeqCst);
        actuator
    }

    pub fn activations(&self) -> Vec<usize> {
        self.activations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Actuator for CountingActuator {
    fn drawer_count(&self) -> usize {
        self.drawers
    }

    async fn activate(&self, index: usize) -> Result<(), ActuatorError> {
        self.activations.lock().unwrap().push(index);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ActuatorError::Hardware {
                pin: index as u8,
                reason: "no response".into(),
            });
        }
        Ok(())
    }
}

/// A request seen by [`ScriptedTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    pub method: &'static str,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<Bytes>,
}

/// Transport answering from a queue of canned replies
///
/// An exhausted queue answers every request with a transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Reply, TransportError>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, status: u16, body: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(Reply {
            status,
            body: Bytes::copy_from_slice(body.as_bytes()),
        }));
        self
    }

    pub fn unreachable(self) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(TransportError::Unreachable("connection refused".into())));
        self
    }

    pub fn push_reply(&self, status: u16, body: &str) {
        self.replies.lock().unwrap().push_back(Ok(Reply {
            status,
            body: Bytes::copy_from_slice(body.as_bytes()),
        }));
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Requests whose path starts with `prefix`
    pub fn seen_under(&self, prefix: &str) -> Vec<SeenRequest> {
        self.seen()
            .into_iter()
            .filter(|r| r.path.starts_with(prefix))
            .collect()
    }

    fn answer(
        &self,
        method: &'static str,
        path: &str,
        bearer: Option<&str>,
        body: Option<Bytes>,
    ) -> Result<Reply, TransportError> {
        self.seen.lock().unwrap().push(SeenRequest {
            method,
            path: path.to_string(),
            bearer: bearer.map(str::to_string),
            body,
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Unreachable("no scripted reply".into())))
    }
}

#[async_trait]
impl ServerTransport for ScriptedTransport {
    async fn get(&self, path: &str, bearer: Option<&str>) -> Result<Reply, TransportError> {
        self.answer("GET", path, bearer, None)
    }

    async fn post(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: Option<Bytes>,
    ) -> Result<Reply, TransportError> {
        self.answer("POST", path, bearer, body)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Link driver whose status follows a script of probe results
#[derive(Default)]
pub struct ScriptedLink {
    probes: Mutex<VecDeque<bool>>,
    begins: AtomicU32,
    drops: AtomicU32,
}

impl ScriptedLink {
    /// Probe results in order; once exhausted the link reports `last`
    pub fn new(probes: &[bool]) -> Self {
        Self {
            probes: Mutex::new(probes.iter().copied().collect()),
            ..Default::default()
        }
    }

    pub fn begins(&self) -> u32 {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn drops(&self) -> u32 {
        self.drops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkDriver for ScriptedLink {
    async fn begin(&self) {
        self.begins.fetch_add(1, Ordering::SeqCst);
    }

    async fn is_connected(&self) -> bool {
        let mut probes = self.probes.lock().unwrap();
        match probes.len() {
            0 => false,
            1 => probes[0],
            _ => probes.pop_front().unwrap_or(false),
        }
    }

    async fn drop_link(&self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
