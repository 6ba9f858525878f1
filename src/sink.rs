use crossbeam::atomic::AtomicCell;
use crossbeam::channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};

use std::sync::Arc;
use std::time::Duration;

use crate::error::SinkError;

/// how long `ChannelSink::write` waits for room before giving up
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// What the engine will hand to the sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    pub sample_rate: u32,
    /// interleaved channels per frame
    pub channels: usize,
    pub buffer_frames: usize,
}

impl SinkConfig {
    /// how long one buffer lasts when played back
    pub fn buffer_period(&self) -> Duration {
        Duration::from_secs_f64(self.buffer_frames as f64 / self.sample_rate.max(1) as f64)
    }

    pub fn buffer_samples(&self) -> usize {
        self.buffer_frames * self.channels
    }
}

/// The hardware end of the engine.
///
/// `write` must block until the device has room for the buffer.
/// That wait is the only thing that paces the audio loop.
pub trait AudioSink: Send {
    fn configure(&mut self, config: &SinkConfig) -> Result<(), SinkError>;
    fn write(&mut self, samples: &[i16]) -> Result<(), SinkError>;
}

fn check_format(config: &SinkConfig) -> Result<(), SinkError> {
    if config.sample_rate == 0 || config.channels != 2 {
        return Err(SinkError::UnsupportedFormat {
            sample_rate: config.sample_rate,
            channels: config.channels,
        });
    }
    Ok(())
}

/// create a connected sink/receiver pair holding at most `depth` queued buffers
pub fn channel_sink(depth: usize) -> (ChannelSink, SinkReceiver) {
    let depth = depth.max(1);
    let (tx, rx) = crossbeam::channel::bounded(depth);
    // room for every buffer that can be in flight
    let (recycle_tx, recycle_rx) = crossbeam::channel::bounded(depth + 2);
    let alive = Arc::new(AtomicCell::new(true));

    (
        ChannelSink {
            tx,
            recycle_tx: recycle_tx.clone(),
            recycle_rx,
            alive: Arc::clone(&alive),
            depth,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        },
        SinkReceiver {
            rx,
            recycle_tx,
            alive,
        },
    )
}

/**
 * Sink that hands each buffer to another thread over a bounded channel.
 *
 * Works like a DMA ring: once `depth` buffers are queued, `write` blocks
 * until the consumer takes one. Consumed buffers can be handed back with
 * `SinkReceiver::recycle`, so a running engine doesn't allocate.
 * A consumer that stops taking buffers for longer than the write timeout
 * makes `write` fail with `SinkError::Timeout`, which ends the audio loop.
 */
pub struct ChannelSink {
    tx: Sender<Vec<i16>>,
    recycle_tx: Sender<Vec<i16>>,
    recycle_rx: Receiver<Vec<i16>>,
    alive: Arc<AtomicCell<bool>>,
    depth: usize,
    write_timeout: Duration,
}

impl ChannelSink {
    pub fn set_write_timeout(&mut self, timeout: Duration) {
        self.write_timeout = timeout;
    }
}

impl AudioSink for ChannelSink {
    fn configure(&mut self, config: &SinkConfig) -> Result<(), SinkError> {
        check_format(config)?;
        if !self.alive.load() {
            return Err(SinkError::Disconnected);
        }

        // prime the pool
        while self.recycle_rx.try_recv().is_ok() {}
        for _ in 0..self.depth + 1 {
            let _ = self
                .recycle_tx
                .try_send(Vec::with_capacity(config.buffer_samples()));
        }

        log::info!(
            "channel sink ready: {} Hz, {} channels, {} frames, depth {}",
            config.sample_rate,
            config.channels,
            config.buffer_frames,
            self.depth
        );
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> Result<(), SinkError> {
        let mut buf = self
            .recycle_rx
            .try_recv()
            .unwrap_or_else(|_| Vec::with_capacity(samples.len()));
        buf.clear();
        buf.extend_from_slice(samples);
        self.tx
            .send_timeout(buf, self.write_timeout)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => SinkError::Timeout,
                SendTimeoutError::Disconnected(_) => SinkError::Disconnected,
            })
    }
}

/// The consuming end of a `ChannelSink`.
///
/// Keep draining it while the engine runs. If it goes quiet for longer
/// than the sink's write timeout, the audio loop stops on its own.
pub struct SinkReceiver {
    rx: Receiver<Vec<i16>>,
    recycle_tx: Sender<Vec<i16>>,
    alive: Arc<AtomicCell<bool>>,
}

impl SinkReceiver {
    /// block until the next buffer arrives, None once the sink is gone
    pub fn recv(&self) -> Option<Vec<i16>> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Vec<i16>> {
        match self.rx.recv_timeout(timeout) {
            Ok(buf) => Some(buf),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<Vec<i16>> {
        self.rx.try_recv().ok()
    }

    /// hand a consumed buffer back to the sink for reuse
    pub fn recycle(&self, buf: Vec<i16>) {
        let _ = self.recycle_tx.try_send(buf);
    }
}

impl Drop for SinkReceiver {
    fn drop(&mut self) {
        self.alive.store(false);
    }
}

/// Sink that throws the audio away, paced by sleeping one buffer period.
#[derive(Default)]
pub struct NullSink {
    period: Duration,
}

impl AudioSink for NullSink {
    fn configure(&mut self, config: &SinkConfig) -> Result<(), SinkError> {
        check_format(config)?;
        self.period = config.buffer_period();
        Ok(())
    }

    fn write(&mut self, _samples: &[i16]) -> Result<(), SinkError> {
        std::thread::sleep(self.period);
        Ok(())
    }
}

// TEST TEST TEST
#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SinkConfig {
        SinkConfig {
            sample_rate: 22050,
            channels: 2,
            buffer_frames: 256,
        }
    }

    #[test]
    fn test_buffer_period() {
        let period = config().buffer_period();
        assert_approx_eq::assert_approx_eq!(period.as_secs_f64(), 256.0 / 22050.0, 0.000001);
        assert_eq!(config().buffer_samples(), 512);
    }

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (mut sink, rx) = channel_sink(4);
        sink.configure(&config()).unwrap();

        sink.write(&[1, 2, 3]).unwrap();
        sink.write(&[4, 5]).unwrap();

        let first = rx.recv().unwrap();
        assert_eq!(first, vec![1, 2, 3]);
        rx.recycle(first);
        assert_eq!(rx.recv().unwrap(), vec![4, 5]);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_channel_sink_blocks_when_full() {
        let (mut sink, rx) = channel_sink(1);
        sink.configure(&config()).unwrap();
        sink.write(&[1]).unwrap();

        let writer = std::thread::spawn(move || {
            // blocks until the consumer takes the first buffer
            sink.write(&[2]).unwrap();
        });

        std::thread::sleep(Duration::from_millis(50));
        assert!(!writer.is_finished());

        assert_eq!(rx.recv().unwrap(), vec![1]);
        writer.join().unwrap();
        assert_eq!(rx.recv().unwrap(), vec![2]);
    }

    #[test]
    fn test_channel_sink_write_times_out() {
        let (mut sink, rx) = channel_sink(1);
        sink.configure(&config()).unwrap();
        sink.set_write_timeout(Duration::from_millis(30));
        sink.write(&[1]).unwrap();

        assert_eq!(sink.write(&[2]), Err(SinkError::Timeout));
        assert_eq!(rx.recv().unwrap(), vec![1]);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_channel_sink_reports_disconnect() {
        let (mut sink, rx) = channel_sink(2);
        drop(rx);
        assert_eq!(sink.configure(&config()), Err(SinkError::Disconnected));
        assert_eq!(sink.write(&[0; 4]), Err(SinkError::Disconnected));
    }

    #[test]
    fn test_format_check() {
        let (mut sink, _rx) = channel_sink(2);
        let mono = SinkConfig {
            channels: 1,
            ..config()
        };
        assert_eq!(
            sink.configure(&mono),
            Err(SinkError::UnsupportedFormat {
                sample_rate: 22050,
                channels: 1
            })
        );

        let mut null = NullSink::default();
        assert!(null.configure(&config()).is_ok());
        assert!(null.write(&[0; 512]).is_ok());
    }
}
