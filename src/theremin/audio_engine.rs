use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::EngineConfig;
use crate::error::{EngineError, SinkError};
use crate::sink::{AudioSink, SinkConfig};
use crate::stats::RenderStats;
use crate::theremin::{
    ParameterRegion, ThereminControls, ThereminPlayhead, DEFAULT_BUFSIZE, NUM_CHANNELS,
};

pub type DefaultAudioEngine = AudioEngine<DEFAULT_BUFSIZE>;

/**
 * Runs a `ThereminPlayhead` on its own audio thread.
 *
 * Stopped until `begin` succeeds. The loop renders a buffer and hands
 * it to the sink; the sink's blocking write is the only thing pacing it.
 * `stop` lets the current buffer finish, then joins the thread and takes
 * the playhead back, so the engine can be started again.
 */
pub struct AudioEngine<const BUFSIZE: usize> {
    config: EngineConfig,
    controls: ThereminControls,
    params: Arc<Mutex<ParameterRegion>>,
    stats: Arc<RenderStats>,
    running: Arc<AtomicCell<bool>>,
    parked: Option<ThereminPlayhead<BUFSIZE>>,
    worker: Option<JoinHandle<(ThereminPlayhead<BUFSIZE>, Option<SinkError>)>>,
}

impl<const BUFSIZE: usize> AudioEngine<BUFSIZE> {
    pub fn new(config: &EngineConfig) -> Self {
        let (controls, playhead) = crate::theremin::init_theremin::<BUFSIZE>(config);
        let (params, stats) = playhead.shared_state();

        AudioEngine {
            config: config.sanitized(),
            controls,
            params,
            stats,
            running: Arc::new(AtomicCell::new(false)),
            parked: Some(playhead),
            worker: None,
        }
    }

    /// handle for the control path, clone it as needed
    pub fn controls(&self) -> &ThereminControls {
        &self.controls
    }

    pub fn is_running(&self) -> bool {
        self.running.load()
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            sample_rate: self.config.sample_rate,
            channels: NUM_CHANNELS,
            buffer_frames: BUFSIZE,
        }
    }

    /// Configure the sink and start the audio thread.
    ///
    /// If the sink can't be configured the engine stays stopped
    /// and nothing is spawned.
    pub fn begin(&mut self, mut sink: Box<dyn AudioSink>) -> Result<(), EngineError> {
        if self.is_running() {
            return Err(EngineError::AlreadyRunning);
        }
        // a loop that ended on its own (sink went away) still needs joining
        self.reclaim();

        let sink_config = self.sink_config();
        if let Err(e) = sink.configure(&sink_config) {
            log::error!("audio output setup failed, staying silent: {}", e);
            return Err(e.into());
        }

        let mut playhead = match self.parked.take() {
            Some(playhead) => playhead,
            None => ThereminPlayhead::new(&self.config, &self.params, &self.stats),
        };

        self.running.store(true);
        let running = Arc::clone(&self.running);

        let spawned = thread::Builder::new()
            .name("theremin-audio".to_string())
            .spawn(move || {
                // nothing in here logs, failures are reported on reclaim
                let mut failure = None;
                while running.load() {
                    let buffer = playhead.process();
                    if let Err(e) = sink.write(buffer) {
                        failure = Some(e);
                        running.store(false);
                    }
                }
                (playhead, failure)
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                log::info!(
                    "audio engine running: {} Hz, {} frames per buffer",
                    sink_config.sample_rate,
                    BUFSIZE
                );
                Ok(())
            }
            Err(e) => {
                self.running.store(false);
                log::error!("could not spawn audio thread: {}", e);
                Err(EngineError::Spawn(e.to_string()))
            }
        }
    }

    /// Clear the run flag and wait for the loop to finish its buffer.
    pub fn stop(&mut self) {
        let was_running = self.running.swap(false);
        self.reclaim();
        if was_running {
            log::info!("audio engine stopped");
        }
    }

    fn reclaim(&mut self) {
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok((playhead, failure)) => {
                    if let Some(e) = failure {
                        log::error!("audio output failed, loop stopped: {}", e);
                    }
                    self.parked = Some(playhead);
                }
                Err(_) => log::error!("audio thread panicked, starting fresh next time"),
            }
        }
    }
}

impl<const BUFSIZE: usize> Drop for AudioEngine<BUFSIZE> {
    fn drop(&mut self) {
        self.stop();
    }
}

// TEST TEST TEST
#[cfg(test)]
mod tests {
    use super::*;
    use crate::building_blocks::Waveform;
    use crate::error::SinkError;
    use crate::sink::{channel_sink, NullSink};
    use std::time::{Duration, Instant};

    fn init_logging() {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init();
    }

    fn loud_engine() -> AudioEngine<64> {
        let engine = AudioEngine::<64>::new(&EngineConfig {
            pitch_smoothing: 1.0,
            volume_smoothing: 1.0,
            ..EngineConfig::default()
        });
        engine.controls().set_frequency(440.0);
        engine.controls().set_oscillator_waveform(1, Waveform::Square);
        engine.controls().set_amplitude(100.0);
        engine
    }

    fn wait_for<F: Fn() -> bool>(cond: F) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    struct BrokenSink;

    impl AudioSink for BrokenSink {
        fn configure(&mut self, _config: &SinkConfig) -> Result<(), SinkError> {
            Err(SinkError::Device("no i2s peripheral".to_string()))
        }

        fn write(&mut self, _samples: &[i16]) -> Result<(), SinkError> {
            Ok(())
        }
    }

    #[test]
    fn test_begin_fails_quietly_on_bad_sink() {
        init_logging();
        let mut engine = loud_engine();

        let res = engine.begin(Box::new(BrokenSink));
        assert_eq!(
            res,
            Err(EngineError::Sink(SinkError::Device(
                "no i2s peripheral".to_string()
            )))
        );
        assert!(!engine.is_running());

        let (sink, rx) = channel_sink(2);
        drop(rx);
        assert_eq!(
            engine.begin(Box::new(sink)),
            Err(EngineError::Sink(SinkError::Disconnected))
        );
        assert!(!engine.is_running());
        assert_eq!(engine.controls().stats().buffers, 0);
    }

    #[test]
    fn test_runs_and_stops() {
        init_logging();
        let mut engine = loud_engine();
        let (sink, rx) = channel_sink(2);

        engine.begin(Box::new(sink)).unwrap();
        assert!(engine.is_running());
        assert_eq!(
            engine.begin(Box::new(NullSink::default())),
            Err(EngineError::AlreadyRunning)
        );

        let mut heard = false;
        for _ in 0..10 {
            let buf = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(buf.len(), 128);
            heard |= buf.iter().any(|s| *s != 0);
            rx.recycle(buf);
        }
        assert!(heard);

        // the loop blocks in the sink, keep draining while it shuts down
        let drain = thread::spawn(move || while rx.recv().is_some() {});
        engine.stop();
        assert!(!engine.is_running());
        drain.join().unwrap();
        assert!(engine.controls().stats().buffers >= 10);
    }

    #[test]
    fn test_parameter_changes_reach_running_audio() {
        let mut engine = loud_engine();
        let (sink, rx) = channel_sink(1);
        engine.begin(Box::new(sink)).unwrap();

        engine.controls().set_amplitude(0.0);
        let mut silent = false;
        for _ in 0..50 {
            let buf = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            if buf.iter().all(|s| *s == 0) {
                silent = true;
                break;
            }
        }
        assert!(silent);

        let drain = thread::spawn(move || while rx.recv().is_some() {});
        engine.stop();
        drain.join().unwrap();
    }

    #[test]
    fn test_loop_ends_when_sink_goes_away() {
        init_logging();
        let mut engine = loud_engine();
        let (sink, rx) = channel_sink(1);
        engine.begin(Box::new(sink)).unwrap();

        assert!(rx.recv_timeout(Duration::from_secs(2)).is_some());
        drop(rx);
        assert!(wait_for(|| !engine.is_running()));

        // and it comes back up with a fresh sink
        let (sink, rx) = channel_sink(1);
        engine.begin(Box::new(sink)).unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_some());
        let drain = thread::spawn(move || while rx.recv().is_some() {});
        engine.stop();
        drain.join().unwrap();
    }

    #[test]
    fn test_stop_returns_with_stalled_receiver() {
        init_logging();
        let mut engine = loud_engine();
        let (mut sink, rx) = channel_sink(1);
        sink.set_write_timeout(Duration::from_millis(100));
        engine.begin(Box::new(sink)).unwrap();

        // nobody drains, the loop ends itself once the write times out
        thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        engine.stop();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(!engine.is_running());
        assert!(rx.try_recv().is_some());
    }

    #[test]
    fn test_null_sink_paces_the_loop() {
        let mut engine = AudioEngine::<256>::new(&EngineConfig::default());
        engine.begin(Box::new(NullSink::default())).unwrap();
        thread::sleep(Duration::from_millis(200));
        engine.stop();

        // 200 ms is about 17 buffers of 11.6 ms
        let buffers = engine.controls().stats().buffers;
        assert!(buffers >= 5 && buffers <= 40, "{} buffers", buffers);
    }
}
