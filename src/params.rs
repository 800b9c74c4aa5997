// src/params.rs
//
// Lock-free parameter ports.
//
// The control side writes values and schedules a "controls changed" run;
// the audio thread realizes it by handing the engine a read-only view of
// the ports. Values are stored as f32 bits in atomics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::engine::AudioEngine;
use crate::scheduler::{SchedPoll, SchedTask, Scheduler, sched_pair};

struct ParamPorts {
    values: Box<[AtomicU32]>,
}

impl ParamPorts {
    fn new(count: usize) -> Self {
        let values = (0..count).map(|_| AtomicU32::new(0.0_f32.to_bits())).collect();
        Self { values }
    }

    #[inline]
    fn get(&self, index: usize) -> Option<f32> {
        self.values
            .get(index)
            .map(|v| f32::from_bits(v.load(Ordering::Relaxed)))
    }

    fn set(&self, index: usize, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self.values.get(index) {
            Some(port) => {
                port.store(value.to_bits(), Ordering::Relaxed);
                true
            }
            None => false,
        }
    }
}

/// Read-only view of the parameter ports, handed to the engine.
#[derive(Clone, Copy)]
pub struct ParamSnapshot<'a> {
    ports: &'a ParamPorts,
}

impl<'a> ParamSnapshot<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.ports.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ports.values.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<f32> {
        self.ports.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + use<'a> {
        let ports = self.ports;
        (0..ports.values.len()).filter_map(move |i| ports.get(i))
    }
}

/// Control-side parameter access.
pub struct Params {
    ports: Arc<ParamPorts>,
    sched: Scheduler<()>,
}

/// Audio-thread side of the parameter ports.
pub struct ParamsRealtime {
    ports: Arc<ParamPorts>,
    poll: SchedPoll<()>,
}

/// Allocate `count` ports. Call at setup time only.
pub fn param_ports(count: usize) -> (Params, ParamsRealtime) {
    let ports = Arc::new(ParamPorts::new(count));
    let (sched, poll) = sched_pair();
    (
        Params {
            ports: Arc::clone(&ports),
            sched,
        },
        ParamsRealtime { ports, poll },
    )
}

impl Params {
    pub fn len(&self) -> usize {
        self.ports.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.ports.get(index)
    }

    /// Store a value and schedule a recompute on the audio thread.
    ///
    /// Returns `false` for an unknown index or a non-finite value.
    pub fn set(&self, index: usize, value: f32) -> bool {
        if !self.ports.set(index, value) {
            log::warn!("ignoring parameter {} = {}", index, value);
            return false;
        }
        self.sched.schedule();
        true
    }

    pub fn values(&self) -> Vec<f32> {
        ParamSnapshot { ports: &self.ports }.iter().collect()
    }

    /// Restore values in port order. Extra values are ignored.
    pub fn load(&self, values: &[f32]) {
        let mut changed = false;
        for (index, value) in values.iter().enumerate().take(self.len()) {
            changed |= self.ports.set(index, *value);
        }
        if values.len() > self.len() {
            log::warn!(
                "dropping {} parameter values beyond port count {}",
                values.len() - self.len(),
                self.len()
            );
        }
        if changed {
            self.sched.schedule();
        }
    }
}

struct ParamUpdate<'a, E: ?Sized> {
    engine: &'a mut E,
    ports: &'a ParamPorts,
}

impl<E: AudioEngine + ?Sized> SchedTask for ParamUpdate<'_, E> {
    type Payload = ();

    #[inline]
    fn realize(&mut self, _payload: ()) {
        self.engine.update_params(&ParamSnapshot { ports: self.ports });
    }
}

impl ParamsRealtime {
    /// Hand the ports to the engine if a change is pending.
    #[inline]
    pub fn realize<E: AudioEngine + ?Sized>(&self, engine: &mut E) -> bool {
        let mut update = ParamUpdate {
            engine,
            ports: &self.ports,
        };
        self.poll.run(&mut update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_buffer::BlockIo;
    use crate::event::MidiMessage;
    use crate::state::ProgramSelection;

    #[derive(Default)]
    struct ParamSink {
        updates: usize,
        last: Vec<f32>,
    }

    impl AudioEngine for ParamSink {
        fn render(&mut self, _io: &mut BlockIo) {}
        fn trigger(&mut self, _message: &MidiMessage) {}
        fn select_program(&mut self, _selection: ProgramSelection) {}

        fn update_params(&mut self, params: &ParamSnapshot) {
            self.updates += 1;
            self.last = params.iter().collect();
        }
    }

    #[test]
    fn set_schedules_one_update() {
        let (params, realtime) = param_ports(3);
        let mut engine = ParamSink::default();

        assert!(!realtime.realize(&mut engine));

        assert!(params.set(0, 0.5));
        assert!(params.set(2, -1.0));
        assert!(realtime.realize(&mut engine));
        assert!(!realtime.realize(&mut engine));

        assert_eq!(engine.updates, 1);
        assert_eq!(engine.last, vec![0.5, 0.0, -1.0]);
    }

    #[test]
    fn rejects_unknown_index_and_nan() {
        let (params, realtime) = param_ports(2);
        let mut engine = ParamSink::default();

        assert!(!params.set(2, 1.0));
        assert!(!params.set(0, f32::NAN));
        assert!(!realtime.realize(&mut engine));
        assert_eq!(params.get(0), Some(0.0));
        assert_eq!(params.get(5), None);
    }

    #[test]
    fn load_restores_values_in_order() {
        let (params, realtime) = param_ports(2);
        let mut engine = ParamSink::default();

        params.load(&[0.25, 0.75, 9.0]);
        assert_eq!(params.values(), vec![0.25, 0.75]);
        assert!(realtime.realize(&mut engine));
        assert_eq!(engine.last, vec![0.25, 0.75]);
    }
}
