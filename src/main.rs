// src/main.rs
//
// Sanity run: a tiny tone engine driven through the full control/audio
// path, with program changes embedded in the event stream.

use std::f32::consts::TAU;
use std::process::ExitCode;

use kitsampler::{
    AudioEngine, BlockIo, ControlEvent, EngineConfig, MidiMessage, ProgramSelection,
    create_instrument,
};
use log::LevelFilter;
use simplelog::{Config, SimpleLogger};

/// ===============================
/// Demo engine
/// ===============================

/// One decaying sine whose pitch follows the program id.
struct ToneEngine {
    sample_rate: f32,
    phase: f32,
    freq: f32,
    level: f32,
    decay: f32,
}

impl ToneEngine {
    fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            phase: 0.0,
            freq: 110.0,
            level: 0.0,
            decay: 0.999,
        }
    }
}

impl AudioEngine for ToneEngine {
    fn render(&mut self, io: &mut BlockIo) {
        let step = self.freq / self.sample_rate;
        for i in 0..io.frames() {
            let sample = (self.phase * TAU).sin() * self.level;
            for ch in 0..io.output_channels() {
                io.output_mut(ch)[i] = sample;
            }
            self.phase = (self.phase + step).fract();
            self.level *= self.decay;
        }
    }

    fn trigger(&mut self, message: &MidiMessage) {
        if let [status, _key, velocity] = message.as_bytes() {
            if status & 0xF0 == 0x90 && *velocity > 0 {
                self.level = *velocity as f32 / 127.0;
            }
        }
    }

    fn select_program(&mut self, selection: ProgramSelection) {
        self.freq = 110.0 * (1.0 + selection.program as f32);
    }

    fn reset(&mut self) {
        self.phase = 0.0;
        self.level = 0.0;
    }
}

/// ===============================
/// Main
/// ===============================

fn main() -> ExitCode {
    let mut verbose = false;
    let mut config_path = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            path => config_path = Some(path.to_string()),
        }
    }

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = SimpleLogger::init(level, Config::default());

    let config = match config_path {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("cannot load {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };

    let engine = ToneEngine::new(config.sample_rate);
    let (mut control, mut realtime) = match create_instrument(config, engine) {
        Ok(handles) => handles,
        Err(e) => {
            log::error!("invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // --------------------------------
    // Bank/program directory
    // --------------------------------

    let store = control.programs_mut().store_mut();
    let factory = store.add_bank(0, "Factory");
    factory.add_program(0, "Kick");
    factory.add_program(1, "Snare");
    store.add_bank(1 << 7, "User").add_program(2, "Clap");

    control.programs_mut().set_current_bank(0);
    control.programs_mut().set_current_program(0);

    // --------------------------------
    // Run a few blocks
    // --------------------------------

    let block_frames = control.config().max_block_frames.min(256);
    let channels = control.config().channels;
    let input = vec![0.0f32; block_frames];
    let mut buffers = vec![vec![0.0f32; block_frames]; channels];

    let note = |offset| ControlEvent::from_midi(offset, &[0x99, 36, 110]);
    let blocks: [Vec<ControlEvent>; 4] = [
        note(0).into_iter().collect(),
        [
            ControlEvent::from_midi(64, &[0xC9, 1]),
            note(64),
        ]
        .into_iter()
        .flatten()
        .collect(),
        [
            ControlEvent::from_midi(0, &[0xB9, 0x00, 1]),
            ControlEvent::from_midi(0, &[0xB9, 0x20, 0]),
            ControlEvent::from_midi(1, &[0xC9, 2]),
        ]
        .into_iter()
        .flatten()
        .collect(),
        note(32).into_iter().collect(),
    ];

    for (index, events) in blocks.iter().enumerate() {
        let inputs: Vec<&[f32]> = (0..channels).map(|_| input.as_slice()).collect();
        let mut outputs: Vec<&mut [f32]> = buffers.iter_mut().map(|b| b.as_mut_slice()).collect();

        let report = realtime.process(&inputs, &mut outputs, block_frames, events);
        let peak = buffers[0].iter().fold(0.0f32, |acc, s| acc.max(s.abs()));

        // Control thread: replay forwarded program changes.
        control.poll_update();

        log::info!(
            "block {}: {} renders, {} events, peak {:.3}, active {:?}",
            index,
            report.renders,
            report.events,
            peak,
            control.active_selection()
        );
    }

    match control.export_state().to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("export failed: {}", e),
    }

    ExitCode::SUCCESS
}
