//! Integration tests driving the whole pipeline in software.
//!
//! Mock hardware stands in for the ADC/DMA engine, the output timer and the
//! DAC register. Interrupts are simulated by calling the pipeline's handler
//! entry points directly:
//!
//! ```text
//! on_block_complete() → SampleRing → tick() → Capture sink
//! on_timer()          → WaveformTable → Recorder register
//! ```

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use heapless::{String, Vec};

    use crate::config::{CodecRange, OutputChannel, PipelineConfig, TimerPeriod};
    use crate::control::{AcquisitionHardware, OutputRegister, SynthesisHardware};
    use crate::error::{ConfigError, Error, StartError};
    use crate::io::{AcquisitionSession, Faults, SynthesisState};
    use crate::pipeline::{Interrupt, Pipeline};
    use crate::platform::Platform;
    use crate::telemetry::{PlotFormat, TelemetrySink};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Setup,
        PlatformTick,
        AdcArm,
        AdcDisarm,
        TimerArm,
        TimerDisarm,
        Publish,
    }

    type Log = RefCell<Vec<Event, 64>>;

    fn record(log: &Log, event: Event) {
        log.borrow_mut().push(event).unwrap();
    }

    fn events(log: &Log) -> Vec<Event, 64> {
        log.borrow().clone()
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Rejected;

    struct MockAdc<'a> {
        log: &'a Log,
        fail: bool,
        session: Option<AcquisitionSession>,
    }

    impl<'a> MockAdc<'a> {
        fn new(log: &'a Log) -> Self {
            MockAdc {
                log,
                fail: false,
                session: None,
            }
        }
    }

    impl AcquisitionHardware for MockAdc<'_> {
        type Error = Rejected;

        fn arm(&mut self, session: &AcquisitionSession) -> Result<(), Rejected> {
            if self.fail {
                return Err(Rejected);
            }
            record(self.log, Event::AdcArm);
            self.session = Some(*session);
            Ok(())
        }

        fn disarm(&mut self) {
            record(self.log, Event::AdcDisarm);
            self.session = None;
        }
    }

    struct MockTimer<'a> {
        log: &'a Log,
        fail: bool,
        period: Option<TimerPeriod>,
    }

    impl<'a> MockTimer<'a> {
        fn new(log: &'a Log) -> Self {
            MockTimer {
                log,
                fail: false,
                period: None,
            }
        }
    }

    impl SynthesisHardware for MockTimer<'_> {
        type Error = Rejected;

        fn arm(&mut self, _channel: OutputChannel, period: TimerPeriod) -> Result<(), Rejected> {
            if self.fail {
                return Err(Rejected);
            }
            record(self.log, Event::TimerArm);
            self.period = Some(period);
            Ok(())
        }

        fn disarm(&mut self) {
            record(self.log, Event::TimerDisarm);
            self.period = None;
        }
    }

    /// Sink keeping every published sample.
    struct Capture<'a> {
        log: &'a Log,
        label: String<16>,
        format: Option<PlotFormat>,
        batches: Vec<usize, 16>,
        samples: Vec<u16, 2048>,
    }

    impl<'a> Capture<'a> {
        fn new(log: &'a Log) -> Self {
            Capture {
                log,
                label: String::new(),
                format: None,
                batches: Vec::new(),
                samples: Vec::new(),
            }
        }
    }

    impl TelemetrySink for Capture<'_> {
        fn publish(&mut self, label: &str, format: PlotFormat, samples: &[u16]) {
            record(self.log, Event::Publish);
            self.label.clear();
            self.label.push_str(label).unwrap();
            self.format = Some(format);
            self.batches.push(samples.len()).unwrap();
            self.samples.extend_from_slice(samples).unwrap();
        }
    }

    /// Sink that only checks arrival order, for long randomized runs.
    #[derive(Default)]
    struct Ordered {
        last: Option<u16>,
        received: usize,
        in_order: bool,
    }

    impl TelemetrySink for Ordered {
        fn publish(&mut self, _label: &str, _format: PlotFormat, samples: &[u16]) {
            for &s in samples {
                if let Some(last) = self.last {
                    self.in_order &= s > last;
                }
                self.last = Some(s);
            }
            self.received += samples.len();
        }
    }

    struct Board<'a> {
        log: &'a Log,
    }

    impl Platform for Board<'_> {
        fn setup(&mut self) {
            record(self.log, Event::Setup);
        }

        fn tick(&mut self) {
            record(self.log, Event::PlatformTick);
        }
    }

    #[derive(Default)]
    struct Recorder {
        codes: Vec<u16, 256>,
    }

    impl OutputRegister for Recorder {
        fn write(&mut self, code: u16) {
            self.codes.push(code).unwrap();
        }
    }

    type TestPipeline<'a> = Pipeline<MockAdc<'a>, MockTimer<'a>, Capture<'a>>;

    fn pipeline(log: &Log, config: PipelineConfig) -> TestPipeline<'_> {
        Pipeline::new(config, MockAdc::new(log), MockTimer::new(log), Capture::new(log)).unwrap()
    }

    fn ramp<const N: usize>(start: u16) -> [u16; N] {
        core::array::from_fn(|i| start + i as u16)
    }

    // ---------------------------------------------------------------
    // One acquisition block drained in bounded batches
    // ---------------------------------------------------------------
    #[test]
    fn block_is_drained_in_bounded_batches() {
        let log = Log::default();
        let mut p = pipeline(&log, PipelineConfig::default());
        p.start().unwrap();

        let block: [u16; 1000] = ramp(0);
        assert!(p.handlers().on_block_complete(&block));
        assert_eq!(p.ring().len(), 1000);

        let mut drained: Vec<usize, 8> = Vec::new();
        for _ in 0..5 {
            drained.push(p.tick().drained).unwrap();
        }

        assert_eq!(drained.as_slice(), &[256, 256, 256, 232, 0]);
        assert_eq!(p.sink().batches.as_slice(), &[256, 256, 256, 232]);
        assert_eq!(p.sink().samples.as_slice(), &block[..]);
        assert_eq!(p.sink().label.as_str(), "adcValue");
        assert_eq!(p.sink().format, Some(PlotFormat::Raw));
        assert_eq!(p.published(), 1000);
        assert!(p.ring().is_empty());
        assert_eq!(p.ring().overflow_count(), 0);
    }

    #[test]
    fn tick_on_empty_ring_publishes_nothing() {
        let log = Log::default();
        let mut p = pipeline(&log, PipelineConfig::default());
        p.start().unwrap();

        let report = p.tick();
        assert_eq!(report.drained, 0);
        assert!(report.faults.is_empty());
        assert!(!events(&log).contains(&Event::Publish));
    }

    // ---------------------------------------------------------------
    // Boot sequence and generated table
    // ---------------------------------------------------------------
    #[test]
    fn boot_sets_up_platform_then_starts_both_paths() {
        let log = Log::default();
        let mut p = pipeline(&log, PipelineConfig::default());
        let mut board = Board { log: &log };

        p.boot(&mut board).unwrap();

        assert_eq!(
            events(&log).as_slice(),
            &[Event::Setup, Event::AdcArm, Event::TimerArm]
        );
        assert!(p.is_running());
        assert_eq!(p.synthesis().state(), SynthesisState::Running);

        let session = p.acquisition().hardware().session.unwrap();
        assert_eq!(session.sample_rate_hz, 1_000);
        assert_eq!(session.block_size, 1_000);
        assert_eq!(session.channel.0, 6);

        let table = p.synthesis().table().unwrap();
        assert_eq!(table.len(), 100);
        assert_eq!(table.get(0), 100);
        assert_eq!(table.get(25), 170);
        assert_eq!(table.get(50), 100);
        assert_eq!(table.get(75), 30);
        assert!(table.as_slice().iter().all(|&c| CodecRange::BITS_8.contains(c)));
    }

    // ---------------------------------------------------------------
    // Synthesis: one full period at 166 µs
    // ---------------------------------------------------------------
    #[test]
    fn hundred_firings_complete_one_period() {
        let log = Log::default();
        let mut p = pipeline(&log, PipelineConfig::default());
        p.start().unwrap();
        assert_eq!(
            p.synthesis().hardware().period,
            Some(TimerPeriod::from_micros(166).unwrap())
        );

        let mut dac = Recorder::default();
        for _ in 0..100 {
            assert!(p.handlers().on_timer(&mut dac));
        }

        assert_eq!(p.synthesis().index(), 0);
        assert_eq!(dac.codes.as_slice(), p.synthesis().table().unwrap().as_slice());
        assert!(p.faults().is_empty());
    }

    #[test]
    fn dispatch_routes_to_handlers() {
        let log = Log::default();
        let mut config = PipelineConfig::default();
        config.block_size = 4;
        let mut p = pipeline(&log, config);
        p.start().unwrap();

        let mut dac = Recorder::default();
        assert!(p.handlers().dispatch(Interrupt::BlockComplete(&[7, 8, 9, 10]), &mut dac));
        assert!(dac.codes.is_empty());
        assert_eq!(p.ring().len(), 4);

        assert!(p.handlers().dispatch(Interrupt::TimerFired, &mut dac));
        assert_eq!(dac.codes.as_slice(), &[100]);
        assert_eq!(p.ring().len(), 4);
    }

    // ---------------------------------------------------------------
    // Randomized interleaving of callbacks and drains
    // ---------------------------------------------------------------
    #[test]
    fn interleaved_callbacks_and_drains() {
        const BLOCK: usize = 16;

        let log = Log::default();
        let mut config = PipelineConfig::default();
        config.block_size = BLOCK;
        config.drain_batch = 24;
        let mut p: Pipeline<_, _, _, 64> = Pipeline::new(
            config,
            MockAdc::new(&log),
            MockTimer::new(&log),
            Ordered {
                in_order: true,
                ..Ordered::default()
            },
        )
        .unwrap();
        p.start().unwrap();

        // Deterministic LCG so failures reproduce
        let mut seed: u32 = 0x2545_f491;
        let mut next = move || {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            seed >> 16
        };

        let mut pushed = 0u16;
        for _ in 0..2_000 {
            if next() % 3 == 0 {
                let block: [u16; BLOCK] = ramp(pushed);
                assert!(p.handlers().on_block_complete(&block));
                pushed += BLOCK as u16;
            } else {
                let report = p.tick();
                assert!(report.drained <= 24);
            }
            assert!(p.ring().len() <= 64);
        }

        while p.tick().drained > 0 {}

        let sink = p.sink();
        assert!(sink.in_order);
        assert_eq!(sink.received + p.ring().overflow_count(), pushed as usize);
        assert_eq!(p.ring().pushed(), pushed as usize);
        assert!(p.faults().is_empty());
    }

    #[test]
    fn overflow_drops_oldest_and_is_reported() {
        let log = Log::default();
        let mut p = pipeline(&log, PipelineConfig::default());
        p.start().unwrap();

        let first: [u16; 1000] = ramp(0);
        let second: [u16; 1000] = ramp(1000);
        p.handlers().on_block_complete(&first);
        p.handlers().on_block_complete(&second);

        let report = p.tick();
        assert_eq!(report.dropped, 976);
        assert_eq!(report.drained, 256);
        assert_eq!(p.sink().samples[0], 976);

        while p.tick().drained > 0 {}
        assert_eq!(p.published(), 1024);
        assert_eq!(p.sink().samples.last(), Some(&1999));
    }

    // ---------------------------------------------------------------
    // Faults
    // ---------------------------------------------------------------
    #[test]
    fn fault_is_reported_without_halting_by_default() {
        let log = Log::default();
        let mut p = pipeline(&log, PipelineConfig::default());
        p.start().unwrap();

        p.handlers().on_block_complete(&[1, 2, 3]);
        let report = p.tick();
        assert_eq!(report.faults, Faults::ACQUISITION_DESYNC);
        assert!(!report.halted);
        assert_eq!(report.drained, 3);
        assert!(p.is_running());

        assert_eq!(p.clear_faults(), Faults::ACQUISITION_DESYNC);
        assert!(p.tick().faults.is_empty());
    }

    #[test]
    fn halt_on_fault_stops_both_paths_and_keeps_draining() {
        let log = Log::default();
        let mut config = PipelineConfig::default();
        config.halt_on_fault = true;
        let mut p = pipeline(&log, config);
        p.start().unwrap();

        p.handlers().on_block_complete(&[5; 10]);
        let report = p.tick();
        assert!(report.halted);
        assert!(report.faults.contains(Faults::ACQUISITION_DESYNC));
        assert_eq!(report.drained, 10);
        assert!(!p.is_running());
        assert_eq!(
            &events(&log)[2..],
            &[Event::TimerDisarm, Event::AdcDisarm, Event::Publish]
        );

        // Handlers are inert once halted
        let mut dac = Recorder::default();
        assert!(!p.handlers().on_block_complete(&[0; 1000]));
        assert!(!p.handlers().on_timer(&mut dac));
        assert!(!p.tick().halted);
    }

    // ---------------------------------------------------------------
    // Start failures
    // ---------------------------------------------------------------
    #[test]
    fn synthesis_failure_rolls_back_acquisition() {
        let log = Log::default();
        let mut timer = MockTimer::new(&log);
        timer.fail = true;
        let mut p: TestPipeline<'_> = Pipeline::new(
            PipelineConfig::default(),
            MockAdc::new(&log),
            timer,
            Capture::new(&log),
        )
        .unwrap();

        assert_eq!(
            p.start(),
            Err(StartError::Synthesis(Error::Hardware(Rejected)))
        );
        assert!(!p.is_running());
        assert!(p.acquisition().hardware().session.is_none());
        assert_eq!(events(&log).as_slice(), &[Event::AdcArm, Event::AdcDisarm]);
        assert!(!p.handlers().on_block_complete(&[0; 1000]));
    }

    #[test]
    fn acquisition_failure_leaves_timer_untouched() {
        let log = Log::default();
        let mut adc = MockAdc::new(&log);
        adc.fail = true;
        let mut p: TestPipeline<'_> = Pipeline::new(
            PipelineConfig::default(),
            adc,
            MockTimer::new(&log),
            Capture::new(&log),
        )
        .unwrap();

        assert_eq!(
            p.start(),
            Err(StartError::Acquisition(Error::Hardware(Rejected)))
        );
        assert!(events(&log).is_empty());
        assert!(!p.is_running());
    }

    #[test]
    fn second_start_is_rejected() {
        let log = Log::default();
        let mut p = pipeline(&log, PipelineConfig::default());
        p.start().unwrap();
        assert_eq!(
            p.start(),
            Err(StartError::Config(ConfigError::SessionActive))
        );
        assert!(p.is_running());
    }

    #[test]
    fn invalid_configuration_rejected_at_construction() {
        let log = Log::default();
        let mut config = PipelineConfig::default();
        config.block_size = 2_000;
        let result: Result<TestPipeline<'_>, _> = Pipeline::new(
            config,
            MockAdc::new(&log),
            MockTimer::new(&log),
            Capture::new(&log),
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidBlockSize {
                requested: 2_000,
                max: 1024
            })
        ));
    }

    // ---------------------------------------------------------------
    // Cooperative loop
    // ---------------------------------------------------------------
    #[test]
    fn drain_interval_skips_ticks() {
        let log = Log::default();
        let mut config = PipelineConfig::default();
        config.drain_interval_ticks = 3;
        let mut p = pipeline(&log, config);
        p.start().unwrap();

        let block: [u16; 1000] = ramp(0);
        p.handlers().on_block_complete(&block);

        assert_eq!(p.tick().drained, 0);
        assert_eq!(p.tick().drained, 0);
        assert_eq!(p.tick().drained, 256);
        assert_eq!(p.tick().drained, 0);
    }

    #[test]
    fn run_once_ticks_pipeline_before_platform() {
        let log = Log::default();
        let mut p = pipeline(&log, PipelineConfig::default());
        let mut board = Board { log: &log };
        p.boot(&mut board).unwrap();

        p.handlers().on_block_complete(&ramp::<1000>(0));
        let report = p.run_once(&mut board);
        assert_eq!(report.drained, 256);
        assert_eq!(
            &events(&log)[3..],
            &[Event::Publish, Event::PlatformTick]
        );
    }

    #[test]
    fn shutdown_is_idempotent_and_synthesis_stops_first() {
        let log = Log::default();
        let mut p = pipeline(&log, PipelineConfig::default());
        p.start().unwrap();
        p.handlers().on_block_complete(&ramp::<1000>(0));

        p.shutdown();
        p.shutdown();
        assert_eq!(
            events(&log).as_slice(),
            &[
                Event::AdcArm,
                Event::TimerArm,
                Event::TimerDisarm,
                Event::AdcDisarm
            ]
        );
        assert_eq!(p.synthesis().state(), SynthesisState::Stopped);

        // Samples acquired before shutdown are still delivered
        assert_eq!(p.tick().drained, 256);
    }

    #[test]
    fn restart_after_shutdown() {
        let log = Log::default();
        let mut p = pipeline(&log, PipelineConfig::default());
        p.start().unwrap();
        p.shutdown();
        p.start().unwrap();

        assert!(p.is_running());
        assert_eq!(p.synthesis().index(), 0);
    }

    #[test]
    fn into_parts_stops_and_returns_components() {
        let log = Log::default();
        let mut p = pipeline(&log, PipelineConfig::default());
        p.start().unwrap();
        p.handlers().on_block_complete(&ramp::<1000>(0));
        p.tick();

        let (adc, timer, sink) = p.into_parts();
        assert!(adc.session.is_none());
        assert!(timer.period.is_none());
        assert_eq!(sink.samples.len(), 256);
    }

    // ---------------------------------------------------------------
    // Split operation
    // ---------------------------------------------------------------
    #[test]
    fn split_halves_run_independently() {
        let log = Log::default();
        let mut p = pipeline(&log, PipelineConfig::default());
        p.start().unwrap();

        let (handlers, mut coordinator) = p.split();
        let isr = handlers;
        let mut dac = Recorder::default();

        assert!(isr.on_block_complete(&ramp::<1000>(0)));
        assert_eq!(coordinator.tick().drained, 256);
        // Interrupts keep running between cooperative steps
        assert!(handlers.on_timer(&mut dac));
        assert!(isr.on_block_complete(&ramp::<1000>(1000)));
        assert_eq!(coordinator.tick().dropped, 720);
        assert_eq!(coordinator.published(), 512);
        assert_eq!(coordinator.sink().samples[256], 976);
        assert_eq!(dac.codes.as_slice(), &[100]);
    }

    #[test]
    fn split_halt_closes_gates_and_shutdown_disarms() {
        let log = Log::default();
        let mut config = PipelineConfig::default();
        config.halt_on_fault = true;
        let mut p = pipeline(&log, config);
        p.start().unwrap();

        let (handlers, mut coordinator) = p.split();
        handlers.on_block_complete(&[3; 7]);
        let report = coordinator.tick();
        assert!(report.halted);
        assert_eq!(report.drained, 7);
        assert!(!coordinator.is_live());

        let mut dac = Recorder::default();
        assert!(!handlers.on_block_complete(&[0; 1000]));
        assert!(!handlers.on_timer(&mut dac));
        assert!(!coordinator.tick().halted);

        // Gates are closed but the hardware waits for the owner
        assert_eq!(events(&log).as_slice(), &[Event::AdcArm, Event::TimerArm, Event::Publish]);
        assert!(p.is_running());
        p.shutdown();
        assert_eq!(
            &events(&log)[3..],
            &[Event::TimerDisarm, Event::AdcDisarm]
        );
        assert!(!p.is_running());
    }

    #[test]
    fn start_after_halt_clears_stale_faults() {
        let log = Log::default();
        let mut config = PipelineConfig::default();
        config.halt_on_fault = true;
        let mut p = pipeline(&log, config);
        p.start().unwrap();

        p.handlers().on_block_complete(&[1, 2, 3]);
        assert!(p.tick().halted);
        assert!(!p.is_running());

        p.start().unwrap();
        assert!(p.faults().is_empty());
        assert_eq!(p.telemetry.seen_faults, Faults::NONE);

        let report = p.tick();
        assert!(!report.halted);
        assert!(report.faults.is_empty());
        assert!(p.is_running());

        // A fresh fault after the restart still halts
        p.handlers().on_block_complete(&[1, 2, 3]);
        assert!(p.tick().halted);
    }

    #[test]
    fn published_counter_wraps() {
        let log = Log::default();
        let mut p = pipeline(&log, PipelineConfig::default());
        p.start().unwrap();
        p.telemetry.published = usize::MAX - 9;

        p.handlers().on_block_complete(&ramp::<1000>(0));
        assert_eq!(p.tick().drained, 256);
        assert_eq!(p.published(), 246);
    }
}
