//! Mock collaborators shared by the driver's unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use atvbridge_device::{
    Artwork, BoxFuture, DeviceClient, DeviceDescriptor, DeviceError, DeviceSession,
    DeviceState, OperatingSystem, PairingHandle, PlaybackSnapshot, PowerState, Protocol,
};
use atvbridge_hub::{
    CommandStatus, DeviceState as HubDeviceState, EntityAttributes, HubApi, HubError,
    MediaPlayerEntity, SetupField,
};

pub(crate) fn tv(identifier: &str, name: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        identifier: identifier.into(),
        name: name.into(),
        operating_system: OperatingSystem::TvOs,
        version: Some("17.2".into()),
    }
}

pub(crate) fn mac(identifier: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        identifier: identifier.into(),
        name: "MacBook".into(),
        operating_system: OperatingSystem::MacOs,
        version: Some("14.1".into()),
    }
}

pub(crate) fn playing(hash: &str, title: &str) -> PlaybackSnapshot {
    PlaybackSnapshot {
        device_state: DeviceState::Playing,
        position: Some(12),
        total_time: Some(300),
        title: Some(title.into()),
        artist: Some("Artist".into()),
        album: Some("Album".into()),
        content_hash: hash.into(),
    }
}

/// Whether an update carries any of the per-item metadata fields.
pub(crate) fn has_media_metadata(attrs: &EntityAttributes) -> bool {
    attrs.media_duration.is_some()
        || attrs.media_title.is_some()
        || attrs.media_artist.is_some()
        || attrs.media_album.is_some()
        || attrs.media_image_url.is_some()
}

// -- Device --

/// How a mocked pairing handshake behaves.
#[derive(Debug, Clone)]
pub(crate) struct PairPlan {
    pub device_provides_pin: bool,
    pub succeed: bool,
    pub credentials: String,
}

impl PairPlan {
    pub fn device_pin(credentials: &str) -> Self {
        Self {
            device_provides_pin: true,
            succeed: true,
            credentials: credentials.into(),
        }
    }

    pub fn driver_pin(credentials: &str) -> Self {
        Self {
            device_provides_pin: false,
            ..Self::device_pin(credentials)
        }
    }

    pub fn failing() -> Self {
        Self {
            succeed: false,
            ..Self::device_pin("")
        }
    }
}

/// What happened to one pairing handle.
#[derive(Debug, Clone, Default)]
pub(crate) struct PairingRecord {
    pub protocol: Option<Protocol>,
    pub session_name: String,
    pub began: bool,
    pub pins: Vec<u16>,
    pub finished: bool,
    pub closed: bool,
}

pub(crate) struct MockDeviceClient {
    pub devices: Mutex<Vec<DeviceDescriptor>>,
    pub scans: AtomicU32,
    pub pair_plans: Mutex<VecDeque<PairPlan>>,
    pub pairings: Arc<Mutex<Vec<PairingRecord>>>,
    pub session: Arc<MockSession>,
    pub connects: AtomicU32,
    /// Number of upcoming `connect` calls that fail with a timeout.
    pub connect_failures: AtomicU32,
}

impl MockDeviceClient {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            devices: Mutex::new(devices),
            scans: AtomicU32::new(0),
            pair_plans: Mutex::new(VecDeque::new()),
            pairings: Arc::new(Mutex::new(Vec::new())),
            session: Arc::new(MockSession::new()),
            connects: AtomicU32::new(0),
            connect_failures: AtomicU32::new(0),
        }
    }

    pub fn push_plan(&self, plan: PairPlan) {
        self.pair_plans.lock().unwrap().push_back(plan);
    }

    pub fn set_devices(&self, devices: Vec<DeviceDescriptor>) {
        *self.devices.lock().unwrap() = devices;
    }

    pub fn scan_count(&self) -> u32 {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn pairing_records(&self) -> Vec<PairingRecord> {
        self.pairings.lock().unwrap().clone()
    }
}

impl DeviceClient for MockDeviceClient {
    fn scan<'a>(
        &'a self,
        identifier: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<DeviceDescriptor>, DeviceError>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let devices = self.devices.lock().unwrap().clone();
        Box::pin(async move {
            Ok(match identifier {
                Some(id) => devices.into_iter().filter(|d| d.identifier == id).collect(),
                None => devices,
            })
        })
    }

    fn pair<'a>(
        &'a self,
        _device: &'a DeviceDescriptor,
        protocol: Protocol,
        session_name: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn PairingHandle>, DeviceError>> {
        let plan = self.pair_plans.lock().unwrap().pop_front();
        let log = self.pairings.clone();
        let index = {
            let mut records = log.lock().unwrap();
            records.push(PairingRecord {
                protocol: Some(protocol),
                session_name: session_name.to_string(),
                ..Default::default()
            });
            records.len() - 1
        };
        Box::pin(async move {
            let plan = plan.ok_or_else(|| DeviceError::Protocol("no pairing plan".into()))?;
            Ok(Box::new(MockPairingHandle {
                plan,
                log,
                index,
                paired: false,
            }) as Box<dyn PairingHandle>)
        })
    }

    fn connect<'a>(
        &'a self,
        _device: &'a DeviceDescriptor,
    ) -> BoxFuture<'a, Result<Arc<dyn DeviceSession>, DeviceError>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let session = self.session.clone();
        Box::pin(async move {
            if fail {
                return Err(DeviceError::Timeout);
            }
            session.closed.store(false, Ordering::SeqCst);
            Ok(session as Arc<dyn DeviceSession>)
        })
    }
}

pub(crate) struct MockPairingHandle {
    plan: PairPlan,
    log: Arc<Mutex<Vec<PairingRecord>>>,
    index: usize,
    paired: bool,
}

impl MockPairingHandle {
    fn record(&self, f: impl FnOnce(&mut PairingRecord)) {
        if let Some(r) = self.log.lock().unwrap().get_mut(self.index) {
            f(r);
        }
    }
}

impl PairingHandle for MockPairingHandle {
    fn begin_handshake(&mut self) -> BoxFuture<'_, Result<(), DeviceError>> {
        self.record(|r| r.began = true);
        Box::pin(async { Ok(()) })
    }

    fn submit_pin(&mut self, pin: u16) {
        self.record(|r| r.pins.push(pin));
    }

    fn device_provides_pin(&self) -> bool {
        self.plan.device_provides_pin
    }

    fn finish(&mut self) -> BoxFuture<'_, Result<(), DeviceError>> {
        self.record(|r| r.finished = true);
        self.paired = self.plan.succeed;
        Box::pin(async { Ok(()) })
    }

    fn is_paired(&self) -> bool {
        self.paired
    }

    fn credentials(&self) -> Option<String> {
        self.paired.then(|| self.plan.credentials.clone())
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), DeviceError>> {
        self.record(|r| r.closed = true);
        Box::pin(async { Ok(()) })
    }
}

pub(crate) struct MockSession {
    pub rejected: Mutex<HashSet<Protocol>>,
    pub applied: Mutex<Vec<(Protocol, String)>>,
    pub power: Mutex<PowerState>,
    pub playing: Mutex<PlaybackSnapshot>,
    /// Number of upcoming `currently_playing` calls that fail.
    pub playing_failures: AtomicU32,
    pub artwork: Mutex<Option<Artwork>>,
    pub artwork_fails: AtomicBool,
    pub artwork_requests: Mutex<Vec<(u32, Option<u32>)>>,
    pub samples: AtomicU32,
    pub commands: Mutex<Vec<&'static str>>,
    pub fail_commands: AtomicBool,
    pub closed: AtomicBool,
    pub close_count: AtomicU32,
}

impl MockSession {
    pub fn new() -> Self {
        Self {
            rejected: Mutex::new(HashSet::new()),
            applied: Mutex::new(Vec::new()),
            power: Mutex::new(PowerState::On),
            playing: Mutex::new(PlaybackSnapshot::idle("empty")),
            playing_failures: AtomicU32::new(0),
            artwork: Mutex::new(Some(Artwork {
                bytes: b"png".to_vec(),
                mime_type: "image/png".into(),
                width: Some(480),
                height: Some(480),
            })),
            artwork_fails: AtomicBool::new(false),
            artwork_requests: Mutex::new(Vec::new()),
            samples: AtomicU32::new(0),
            commands: Mutex::new(Vec::new()),
            fail_commands: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            close_count: AtomicU32::new(0),
        }
    }

    pub fn reject(&self, protocol: Protocol) {
        self.rejected.lock().unwrap().insert(protocol);
    }

    pub fn set_playing(&self, snapshot: PlaybackSnapshot) {
        *self.playing.lock().unwrap() = snapshot;
    }

    pub fn set_power(&self, power: PowerState) {
        *self.power.lock().unwrap() = power;
    }

    pub fn commands(&self) -> Vec<&'static str> {
        self.commands.lock().unwrap().clone()
    }

    pub fn sample_count(&self) -> u32 {
        self.samples.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn command(&self, name: &'static str) -> BoxFuture<'_, Result<(), DeviceError>> {
        self.commands.lock().unwrap().push(name);
        let fail = self.fail_commands.load(Ordering::SeqCst);
        Box::pin(async move {
            if fail {
                Err(DeviceError::Protocol(format!("{name} failed")))
            } else {
                Ok(())
            }
        })
    }
}

impl DeviceSession for MockSession {
    fn set_credential(&self, protocol: Protocol, credentials: &str) -> bool {
        self.applied
            .lock()
            .unwrap()
            .push((protocol, credentials.to_string()));
        !self.rejected.lock().unwrap().contains(&protocol)
    }

    fn play_pause(&self) -> BoxFuture<'_, Result<(), DeviceError>> {
        self.command("play_pause")
    }

    fn next(&self) -> BoxFuture<'_, Result<(), DeviceError>> {
        self.command("next")
    }

    fn previous(&self) -> BoxFuture<'_, Result<(), DeviceError>> {
        self.command("previous")
    }

    fn turn_on(&self) -> BoxFuture<'_, Result<(), DeviceError>> {
        self.command("turn_on")
    }

    fn turn_off(&self) -> BoxFuture<'_, Result<(), DeviceError>> {
        self.command("turn_off")
    }

    fn power_state(&self) -> PowerState {
        *self.power.lock().unwrap()
    }

    fn volume_up(&self) -> BoxFuture<'_, Result<(), DeviceError>> {
        self.command("volume_up")
    }

    fn volume_down(&self) -> BoxFuture<'_, Result<(), DeviceError>> {
        self.command("volume_down")
    }

    fn currently_playing(&self) -> BoxFuture<'_, Result<PlaybackSnapshot, DeviceError>> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .playing_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let snapshot = self.playing.lock().unwrap().clone();
        Box::pin(async move {
            if fail {
                Err(DeviceError::Timeout)
            } else {
                Ok(snapshot)
            }
        })
    }

    fn fetch_artwork(
        &self,
        width: u32,
        height: Option<u32>,
    ) -> BoxFuture<'_, Result<Option<Artwork>, DeviceError>> {
        self.artwork_requests.lock().unwrap().push((width, height));
        let fail = self.artwork_fails.load(Ordering::SeqCst);
        let artwork = self.artwork.lock().unwrap().clone();
        Box::pin(async move {
            if fail {
                Err(DeviceError::Protocol("artwork unavailable".into()))
            } else {
                Ok(artwork)
            }
        })
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }
}

// -- Hub --

/// One recorded outbound hub call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HubCall {
    Ack(String, CommandStatus),
    Progress,
    UserInput(String, Vec<SetupField>),
    Confirmation(String),
    SetupError(String),
    SetupComplete,
    DeviceState(HubDeviceState),
    Register(MediaPlayerEntity),
    Update(String, EntityAttributes),
}

#[derive(Default)]
pub(crate) struct MockHub {
    calls: Mutex<Vec<HubCall>>,
}

impl MockHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: HubCall) -> BoxFuture<'_, Result<(), HubError>> {
        self.calls.lock().unwrap().push(call);
        Box::pin(async { Ok(()) })
    }

    pub fn calls(&self) -> Vec<HubCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn updates(&self) -> Vec<EntityAttributes> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HubCall::Update(_, attrs) => Some(attrs),
                _ => None,
            })
            .collect()
    }

    pub fn registered(&self) -> Vec<MediaPlayerEntity> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HubCall::Register(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn setup_errors(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HubCall::SetupError(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn device_states(&self) -> Vec<HubDeviceState> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HubCall::DeviceState(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn acks(&self) -> Vec<(String, CommandStatus)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HubCall::Ack(id, status) => Some((id, status)),
                _ => None,
            })
            .collect()
    }

    pub fn last_prompt(&self) -> Option<HubCall> {
        self.calls()
            .into_iter()
            .rev()
            .find(|c| matches!(c, HubCall::UserInput(..) | HubCall::Confirmation(_)))
    }

    pub fn contains(&self, call: &HubCall) -> bool {
        self.calls.lock().unwrap().contains(call)
    }
}

impl HubApi for MockHub {
    fn acknowledge_command<'a>(
        &'a self,
        request_id: &'a str,
        status: CommandStatus,
    ) -> BoxFuture<'a, Result<(), HubError>> {
        self.push(HubCall::Ack(request_id.to_string(), status))
    }

    fn report_setup_progress(&self) -> BoxFuture<'_, Result<(), HubError>> {
        self.push(HubCall::Progress)
    }

    fn request_user_input<'a>(
        &'a self,
        title: &'a str,
        fields: Vec<SetupField>,
    ) -> BoxFuture<'a, Result<(), HubError>> {
        self.push(HubCall::UserInput(title.to_string(), fields))
    }

    fn request_user_confirmation<'a>(
        &'a self,
        title: &'a str,
    ) -> BoxFuture<'a, Result<(), HubError>> {
        self.push(HubCall::Confirmation(title.to_string()))
    }

    fn report_setup_error<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), HubError>> {
        self.push(HubCall::SetupError(message.to_string()))
    }

    fn report_setup_complete(&self) -> BoxFuture<'_, Result<(), HubError>> {
        self.push(HubCall::SetupComplete)
    }

    fn set_device_state(&self, state: HubDeviceState) -> BoxFuture<'_, Result<(), HubError>> {
        self.push(HubCall::DeviceState(state))
    }

    fn register_entity(&self, entity: MediaPlayerEntity) -> BoxFuture<'_, Result<(), HubError>> {
        self.push(HubCall::Register(entity))
    }

    fn update_entity_attributes<'a>(
        &'a self,
        entity_id: &'a str,
        attributes: EntityAttributes,
    ) -> BoxFuture<'a, Result<(), HubError>> {
        self.push(HubCall::Update(entity_id.to_string(), attributes))
    }
}
