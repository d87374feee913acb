use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::buffer::CircularBuffer;
use crate::error::{Result, ScopeError};
use crate::waveform::{Sine, WaveformFunction};

// floor(duration * rate) would turn 0.29 s at 100 Hz (28.999999999999996)
// into 28 samples; see `chunk_len_floors_with_tolerance`.
const CHUNK_LEN_EPSILON: f64 = 1e-9;

/// Produces waveform chunks on a background thread and writes them into a
/// shared [`CircularBuffer`].
///
/// The clock advances by exactly `duration` per cycle regardless of how long
/// the thread actually sleeps between cycles.
pub struct SampleGenerator {
    buffer: Arc<CircularBuffer>,
    sample_rate: f64,
    waveform: Arc<dyn WaveformFunction>,
    clock: Arc<Clock>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

/// Generator time in seconds, stored as `f64` bits so the UI can read it
/// while the loop runs.
struct Clock(AtomicU64);

impl Clock {
    fn new() -> Self {
        Self(AtomicU64::new(0.0_f64.to_bits()))
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

impl SampleGenerator {
    pub fn new(
        buffer: Arc<CircularBuffer>,
        sample_rate: f64,
        waveform: Arc<dyn WaveformFunction>,
    ) -> Result<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ScopeError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            buffer,
            sample_rate,
            waveform,
            clock: Arc::new(Clock::new()),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        })
    }

    /// Generator driving a 1 Hz unit sine.
    pub fn with_default_waveform(buffer: Arc<CircularBuffer>, sample_rate: f64) -> Result<Self> {
        Self::new(buffer, sample_rate, Arc::new(Sine::default()))
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn buffer(&self) -> &Arc<CircularBuffer> {
        &self.buffer
    }

    /// Start time of the next generation window.
    pub fn time_offset(&self) -> f64 {
        self.clock.get()
    }

    /// True while a generation thread is alive. A thread that died from a
    /// panic counts as stopped even before `stop` reaps it.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    pub fn set_waveform(&mut self, waveform: Arc<dyn WaveformFunction>) -> Result<()> {
        if self.is_running() {
            return Err(ScopeError::AlreadyRunning);
        }
        self.waveform = waveform;
        Ok(())
    }

    /// Runs one cycle on the calling thread: evaluates the waveform over the
    /// next `duration` seconds and advances the clock, without touching the
    /// buffer.
    pub fn generate_chunk(&mut self, duration: f64) -> Result<Vec<f64>> {
        if self.is_running() {
            return Err(ScopeError::AlreadyRunning);
        }
        Ok(run_cycle(
            self.waveform.as_ref(),
            &self.clock,
            self.sample_rate,
            duration,
        ))
    }

    /// Spawns the generation loop and returns immediately.
    ///
    /// `duration` sizes each chunk, `interval` paces the writes. The two are
    /// independent; keeping them consistent with wall-clock time is up to
    /// the caller.
    ///
    /// If the previous run panicked and was never stopped, that panic is
    /// returned instead and nothing is spawned.
    pub fn start(&mut self, duration: f64, interval: f64) -> Result<()> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !(valid(duration) && valid(interval)) {
            return Err(ScopeError::InvalidTiming { duration, interval });
        }
        if self.is_running() {
            log::warn!("start requested while the generator is already running");
            return Err(ScopeError::AlreadyRunning);
        }
        // A run that died unobserved is reported here; the next call starts.
        self.reap()?;

        let buffer = Arc::clone(&self.buffer);
        let waveform = Arc::clone(&self.waveform);
        let clock = Arc::clone(&self.clock);
        let running = Arc::clone(&self.running);
        let sample_rate = self.sample_rate;
        let pause = Duration::from_secs_f64(interval);

        log::info!(
            "starting generator: {sample_rate} Hz, {} samples every {interval}s from t={}",
            chunk_len(duration, sample_rate),
            clock.get()
        );

        self.running.store(true, Ordering::Release);
        let spawned = thread::Builder::new()
            .name("sample-generator".to_string())
            .spawn(move || {
                while running.load(Ordering::Acquire) {
                    let samples = run_cycle(waveform.as_ref(), &clock, sample_rate, duration);
                    buffer.write(&samples);
                    log::trace!("wrote {} samples, clock now {}", samples.len(), clock.get());
                    pause_until(Instant::now() + pause, &running);
                }
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.running.store(false, Ordering::Release);
                Err(ScopeError::Spawn(err.to_string()))
            }
        }
    }

    /// Signals the loop to finish and waits for the thread to exit.
    ///
    /// A cycle already past its running check completes its write first.
    /// Calling this with no active loop is a no-op. If the thread died from
    /// a panic, the join returns immediately and the panic is reported.
    pub fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::Release);
        let Some(worker) = self.worker.as_ref() else {
            return Ok(());
        };
        if worker.is_finished() {
            log::debug!("generator thread already exited before stop");
        } else {
            worker.thread().unpark();
        }
        self.reap()?;
        log::info!("generator stopped at t={}", self.clock.get());
        Ok(())
    }

    fn reap(&mut self) -> Result<()> {
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|payload| {
                let msg = panic_message(payload.as_ref());
                log::error!("generator thread panicked: {msg}");
                ScopeError::GeneratorPanicked(msg)
            }),
            None => Ok(()),
        }
    }
}

impl Drop for SampleGenerator {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::error!("generator dropped after failure: {err}");
        }
    }
}

fn chunk_len(duration: f64, sample_rate: f64) -> usize {
    (duration * sample_rate + CHUNK_LEN_EPSILON).floor().max(0.0) as usize
}

fn run_cycle(
    waveform: &dyn WaveformFunction,
    clock: &Clock,
    sample_rate: f64,
    duration: f64,
) -> Vec<f64> {
    let start = clock.get();
    let step = 1.0 / sample_rate;
    let times: Vec<f64> = (0..chunk_len(duration, sample_rate))
        .map(|k| start + k as f64 * step)
        .collect();
    let samples = waveform.evaluate(&times);
    clock.set(start + duration);
    samples
}

// Best-effort sleep that returns early once `running` is cleared.
fn pause_until(deadline: Instant, running: &AtomicBool) {
    while running.load(Ordering::Acquire) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::park_timeout(deadline - now);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
