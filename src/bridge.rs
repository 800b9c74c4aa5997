//! Thread-safe bridge between the control thread and the audio thread.
//!
//! This module wires one instrument instance into two handles.
//!
//! # Architecture
//!
//! - **Control thread** owns [`ControlHandle`] with the [`ProgramManager`],
//!   its bank store and the parameter ports
//! - **Audio thread** owns [`RealtimeHandle`] with the [`AudioEngine`]
//! - Control -> audio: scheduler slots (program selection, parameter
//!   recompute)
//! - Audio -> control: an SPSC queue of program requests, a coalescing
//!   notification and atomics for readback
//!
//! # Usage
//!
//! ```ignore
//! let (mut control, mut realtime) = create_instrument(EngineConfig::default(), engine)?;
//!
//! // Control thread: pick a program
//! control.programs_mut().set_current_bank(3);
//! control.programs_mut().set_current_program(7);
//!
//! // Audio thread: realize pending work and render
//! realtime.process(&inputs, &mut outputs, frames, &events);
//!
//! // Control thread: react to state changes
//! if control.wait_for_update(Duration::from_millis(50)) { /* refresh UI, save */ }
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::config::{ConfigError, EngineConfig};
use crate::engine::AudioEngine;
use crate::event::{ControlEvent, EventPayload};
use crate::notify::{NotifyObserver, Notifier, notify_channel};
use crate::params::{Params, ParamsRealtime, param_ports};
use crate::scheduler::{SchedPayload, SchedPoll, SchedTask, sched_pair};
use crate::splitter::{SplitReport, split_block};
use crate::state::{DocumentError, ProgramManager, ProgramRequest, ProgramSelection, StateDocument};

/// Readback word meaning "no program realized yet".
const NO_SELECTION: u64 = u64::MAX;

/// Lock-free shared state for audio -> control readback.
struct SharedReadback {
    /// Realized selection as a scheduler word, or `NO_SELECTION`.
    active: AtomicU64,
    dropped_requests: AtomicU64,
    clamped_events: AtomicU64,
    blocks: AtomicU64,
}

impl SharedReadback {
    fn new() -> Self {
        Self {
            active: AtomicU64::new(NO_SELECTION),
            dropped_requests: AtomicU64::new(0),
            clamped_events: AtomicU64::new(0),
            blocks: AtomicU64::new(0),
        }
    }

    fn active(&self) -> Option<ProgramSelection> {
        match self.active.load(Ordering::Acquire) {
            NO_SELECTION => None,
            word => Some(ProgramSelection::from_word(word)),
        }
    }
}

/// Handle for the control thread (UI, host automation, persistence).
///
/// Nothing here is real-time safe.
pub struct ControlHandle {
    config: EngineConfig,
    programs: ProgramManager,
    params: Params,
    requests: Consumer<ProgramRequest>,
    observer: NotifyObserver,
    readback: Arc<SharedReadback>,
}

/// Handle for the audio thread, owning the engine.
///
/// Every method is allocation-free and lock-free.
pub struct RealtimeHandle<E> {
    engine: E,
    channels: usize,
    max_block_frames: usize,
    program_poll: SchedPoll<ProgramSelection>,
    params: ParamsRealtime,
    requests: Producer<ProgramRequest>,
    notifier: Notifier,
    readback: Arc<SharedReadback>,
}

/// Create a linked pair of handles for one instrument instance.
///
/// All queues and ports are allocated here; an invalid config is rejected
/// before anything reaches the audio thread.
pub fn create_instrument<E: AudioEngine>(
    config: EngineConfig,
    engine: E,
) -> Result<(ControlHandle, RealtimeHandle<E>), ConfigError> {
    config.validate()?;

    let (program_sched, program_poll) = sched_pair();
    let (params, params_rt) = param_ports(config.param_count);
    let (producer, consumer) = RingBuffer::new(config.request_capacity);
    let (notifier, observer) = notify_channel();
    let readback = Arc::new(SharedReadback::new());

    log::info!(
        "instrument created: {} Hz, {} channels, {} params",
        config.sample_rate,
        config.channels,
        config.param_count
    );

    let realtime = RealtimeHandle {
        engine,
        channels: config.channels,
        max_block_frames: config.max_block_frames,
        program_poll,
        params: params_rt,
        requests: producer,
        notifier,
        readback: Arc::clone(&readback),
    };

    let control = ControlHandle {
        config,
        programs: ProgramManager::new(program_sched),
        params,
        requests: consumer,
        observer,
        readback,
    };

    Ok((control, realtime))
}

// ═══════════════════════════════════════════════════════════════════
// ControlHandle - control thread API
// ═══════════════════════════════════════════════════════════════════

impl ControlHandle {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn programs(&self) -> &ProgramManager {
        &self.programs
    }

    pub fn programs_mut(&mut self) -> &mut ProgramManager {
        &mut self.programs
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Set a parameter port and schedule a recompute on the audio thread.
    pub fn set_param(&self, index: usize, value: f32) -> bool {
        self.params.set(index, value)
    }

    /// Replay bank-select / program-change traffic forwarded by the audio
    /// thread. Returns the number of requests applied.
    pub fn process_requests(&mut self) -> usize {
        let mut count = 0;
        while let Ok(request) = self.requests.pop() {
            log::debug!("program request {:?}", request);
            self.programs.apply_request(request);
            count += 1;
        }
        count
    }

    /// Acknowledge a pending notification without blocking, then replay
    /// any forwarded requests. Returns whether a notification was pending.
    pub fn poll_update(&mut self) -> bool {
        let notified = self.observer.consume();
        self.process_requests();
        notified
    }

    /// Wait for the audio thread to report a state change, then replay
    /// any forwarded requests. Returns whether a notification arrived.
    pub fn wait_for_update(&mut self, timeout: Duration) -> bool {
        let notified = self.observer.wait(timeout);
        self.process_requests();
        notified
    }

    /// The selection most recently realized by the audio thread.
    pub fn active_selection(&self) -> Option<ProgramSelection> {
        self.readback.active()
    }

    /// Program requests lost because the queue was full.
    pub fn dropped_requests(&self) -> u64 {
        self.readback.dropped_requests.load(Ordering::Relaxed)
    }

    /// Events whose offsets had to be clamped, across all blocks.
    pub fn clamped_events(&self) -> u64 {
        self.readback.clamped_events.load(Ordering::Relaxed)
    }

    /// Audio blocks processed so far.
    pub fn blocks_processed(&self) -> u64 {
        self.readback.blocks.load(Ordering::Relaxed)
    }

    pub fn export_state(&self) -> StateDocument {
        let mut doc = StateDocument::export(&self.programs);
        doc.params = self.params.values();
        doc
    }

    /// Replace directory, selection and parameter values from a document.
    ///
    /// If the saved program no longer resolves, the control side ends up
    /// with no selection while the engine keeps its last realized program:
    /// the engine has no "unselected" state to fall back to, so
    /// `active_selection` goes on reporting that program until a new one is
    /// selected.
    pub fn import_state(
        &mut self,
        doc: &StateDocument,
    ) -> Result<Option<ProgramSelection>, DocumentError> {
        let selection = doc.apply_to(&mut self.programs)?;
        self.params.load(&doc.params);
        Ok(selection)
    }
}

// ═══════════════════════════════════════════════════════════════════
// RealtimeHandle - audio thread API
// ═══════════════════════════════════════════════════════════════════

/// Realizes the program task against the engine.
struct ProgramApply<'a, E: ?Sized> {
    engine: &'a mut E,
    readback: &'a SharedReadback,
}

impl<E: AudioEngine + ?Sized> SchedTask for ProgramApply<'_, E> {
    type Payload = ProgramSelection;

    #[inline]
    fn realize(&mut self, selection: ProgramSelection) {
        self.engine.select_program(selection);
        self.readback
            .active
            .store(selection.into_word(), Ordering::Release);
    }
}

/// Apply one event on the audio thread.
#[inline]
fn apply_event<E: AudioEngine + ?Sized>(
    engine: &mut E,
    event: &ControlEvent,
    requests: &mut Producer<ProgramRequest>,
    notifier: &Notifier,
    readback: &SharedReadback,
) {
    match &event.payload {
        EventPayload::Trigger(message) => engine.trigger(message),
        payload => {
            if let Some(request) = ProgramRequest::from_payload(payload) {
                if requests.push(request).is_ok() {
                    notifier.notify();
                } else {
                    readback.dropped_requests.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

impl<E: AudioEngine> RealtimeHandle<E> {
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Realize scheduled work: the program selection first, then
    /// parameter recompute.
    ///
    /// Called by `process` at the start of every block.
    #[inline]
    pub fn realize_pending(&mut self) {
        let mut apply = ProgramApply {
            engine: &mut self.engine,
            readback: &self.readback,
        };
        if self.program_poll.run(&mut apply) {
            self.notifier.notify();
        }
        self.params.realize(&mut self.engine);
    }

    /// Process one audio block.
    ///
    /// Realizes pending work, then renders `frames` frames with `events`
    /// applied at their offsets. Channels beyond the configured count are
    /// left untouched, and `frames` is capped at `max_block_frames`.
    pub fn process<'s>(
        &mut self,
        inputs: &[&'s [f32]],
        outputs: &mut [&'s mut [f32]],
        frames: usize,
        events: &[ControlEvent],
    ) -> SplitReport {
        self.realize_pending();

        let frames = frames.min(self.max_block_frames);

        let inputs = &inputs[..inputs.len().min(self.channels)];
        let out_channels = outputs.len().min(self.channels);
        let outputs = &mut outputs[..out_channels];

        let requests = &mut self.requests;
        let notifier = &self.notifier;
        let readback = &*self.readback;

        let report = split_block(
            &mut self.engine,
            inputs,
            outputs,
            frames,
            events,
            |engine, event| apply_event(engine, event, requests, notifier, readback),
        );

        if report.clamped > 0 {
            readback
                .clamped_events
                .fetch_add(report.clamped as u64, Ordering::Relaxed);
        }
        readback.blocks.fetch_add(1, Ordering::Relaxed);

        report
    }

    /// Reset engine state (host activate / deactivate).
    pub fn reset(&mut self) {
        self.engine.reset();
    }
}
