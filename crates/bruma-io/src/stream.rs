//! Live output via cpal, with optional microphone capture.

use crate::{Error, Result};
use bruma_engine::{CapturePermission, CaptureSource, Director};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, Stream};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Extract device name via `description()` (cpal 0.17+).
pub(crate) fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Cap on buffered capture, in samples. Roughly four seconds at 48 kHz;
/// beyond that the oldest samples are dropped.
const CAPTURE_BUFFER_CAP: usize = 192_000;

/// Audio device information.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Whether the device supports audio input.
    pub is_input: bool,
    /// Whether the device supports audio output.
    pub is_output: bool,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

/// Live session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Output device name (uses default if `None`).
    pub output_device: Option<String>,
    /// Whether to open a microphone stream for the Memory engine.
    pub enable_capture: bool,
    /// Stop after this many seconds; run until stopped if `None`.
    pub duration_secs: Option<f64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_device: None,
            enable_capture: true,
            duration_secs: None,
        }
    }
}

/// List all available audio devices.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(inputs) = host.input_devices() {
        for device in inputs {
            if let Ok(name) = device_name(&device) {
                let sample_rate = device
                    .default_input_config()
                    .map(|c| c.sample_rate())
                    .unwrap_or(48000);
                let is_output = device.default_output_config().is_ok();
                devices.push(AudioDevice {
                    name,
                    is_input: true,
                    is_output,
                    default_sample_rate: sample_rate,
                });
            }
        }
    }

    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            if let Ok(name) = device_name(&device) {
                if devices.iter().any(|d| d.name == name) {
                    continue;
                }
                let sample_rate = device
                    .default_output_config()
                    .map(|c| c.sample_rate())
                    .unwrap_or(48000);
                devices.push(AudioDevice {
                    name,
                    is_input: false,
                    is_output: true,
                    default_sample_rate: sample_rate,
                });
            }
        }
    }

    Ok(devices)
}

/// Get the default input and output device info.
pub fn default_devices() -> Result<(Option<AudioDevice>, Option<AudioDevice>)> {
    let host = cpal::default_host();

    let input = host.default_input_device().and_then(|d| {
        device_name(&d).ok().map(|name| AudioDevice {
            name,
            is_input: true,
            is_output: false,
            default_sample_rate: d
                .default_input_config()
                .map(|c| c.sample_rate())
                .unwrap_or(48000),
        })
    });

    let output = host.default_output_device().and_then(|d| {
        device_name(&d).ok().map(|name| AudioDevice {
            name,
            is_input: false,
            is_output: true,
            default_sample_rate: d
                .default_output_config()
                .map(|c| c.sample_rate())
                .unwrap_or(48000),
        })
    });

    Ok((input, output))
}

fn find_output_device(host: &Host, name: &str) -> Result<Device> {
    let devices = host
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?;
    for device in devices {
        if let Ok(device_name) = device_name(&device) {
            if device_name == name || device_name.to_lowercase().contains(&name.to_lowercase()) {
                return Ok(device);
            }
        }
    }
    Err(Error::DeviceNotFound(name.to_string()))
}

type SharedCaptureBuffer = Arc<Mutex<VecDeque<f32>>>;

/// Microphone capture backed by a shared buffer the input callback
/// fills. Handed to Memory engines through the director's capture
/// factory.
pub struct MicCapture {
    buffer: SharedCaptureBuffer,
}

impl MicCapture {
    fn new(buffer: SharedCaptureBuffer) -> Self {
        Self { buffer }
    }
}

impl CaptureSource for MicCapture {
    fn request(&mut self) -> CapturePermission {
        // the stream was opened when the session was built; holding a
        // buffer handle is the grant
        CapturePermission::Granted
    }

    fn read(&mut self, out: &mut [f32]) -> usize {
        let Ok(mut buffer) = self.buffer.lock() else {
            return 0;
        };
        let n = out.len().min(buffer.len());
        for slot in out.iter_mut().take(n) {
            *slot = buffer.pop_front().unwrap_or(0.0);
        }
        n
    }
}

/// A live output session: the director rendered from a cpal callback.
pub struct OutputSession {
    output_device: Device,
    input_device: Option<Device>,
    capture_buffer: Option<SharedCaptureBuffer>,
    running: Arc<AtomicBool>,
    config: SessionConfig,
    _input_stream: Option<Stream>,
    _output_stream: Option<Stream>,
}

impl OutputSession {
    /// Resolve devices for the session. Capture being unavailable is not
    /// an error; the Memory engine degrades on its own.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let host = cpal::default_host();
        let output_device = match &config.output_device {
            Some(name) => find_output_device(&host, name)?,
            None => host.default_output_device().ok_or(Error::NoDevice)?,
        };

        let input_device = if config.enable_capture {
            let device = host.default_input_device();
            if device.is_none() {
                warn!("no input device; memory mode will run without capture");
            }
            device
        } else {
            None
        };
        let capture_buffer = input_device
            .as_ref()
            .map(|_| Arc::new(Mutex::new(VecDeque::new())));

        Ok(Self {
            output_device,
            input_device,
            capture_buffer,
            running: Arc::new(AtomicBool::new(false)),
            config,
            _input_stream: None,
            _output_stream: None,
        })
    }

    /// The output device's native sample rate; build the director with
    /// this.
    pub fn sample_rate(&self) -> Result<u32> {
        self.output_device
            .default_output_config()
            .map(|c| c.sample_rate())
            .map_err(|e| Error::Stream(e.to_string()))
    }

    /// Capture factory for [`Director::set_capture_factory`], if an
    /// input device was found.
    pub fn capture_factory(&self) -> Option<bruma_engine::CaptureFactory> {
        let buffer = self.capture_buffer.clone()?;
        Some(Box::new(move || {
            Box::new(MicCapture::new(Arc::clone(&buffer)))
        }))
    }

    /// Handle to stop a running session from another thread.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run the session. Blocks until the configured duration elapses or
    /// the stop flag clears.
    pub fn run(&mut self, director: Arc<Mutex<Director>>) -> Result<()> {
        let output_config = self
            .output_device
            .default_output_config()
            .map_err(|e| Error::Stream(e.to_string()))?;
        let channels = usize::from(output_config.channels());
        let sample_rate = output_config.sample_rate();

        self.running.store(true, Ordering::SeqCst);

        if let (Some(device), Some(buffer)) = (&self.input_device, &self.capture_buffer) {
            let input_config = device
                .default_input_config()
                .map_err(|e| Error::Stream(e.to_string()))?;
            let input_channels = usize::from(input_config.channels());
            let buffer = Arc::clone(buffer);
            let input_stream = device
                .build_input_stream(
                    &input_config.into(),
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let Ok(mut queue) = buffer.lock() else {
                            return;
                        };
                        // fold interleaved channels down to mono
                        for frame in data.chunks(input_channels) {
                            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
                            queue.push_back(mono);
                        }
                        while queue.len() > CAPTURE_BUFFER_CAP {
                            queue.pop_front();
                        }
                    },
                    |err| error!("input stream error: {err}"),
                    None,
                )
                .map_err(|e| Error::Stream(e.to_string()))?;
            input_stream
                .play()
                .map_err(|e| Error::Stream(e.to_string()))?;
            self._input_stream = Some(input_stream);
        }

        let render_director = Arc::clone(&director);
        let mut left: Vec<f32> = Vec::new();
        let mut right: Vec<f32> = Vec::new();
        let output_stream = self
            .output_device
            .build_output_stream(
                &output_config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels.max(1);
                    left.clear();
                    left.resize(frames, 0.0);
                    right.clear();
                    right.resize(frames, 0.0);
                    match render_director.lock() {
                        Ok(mut director) => director.process_block(&mut left, &mut right),
                        Err(_) => {
                            data.fill(0.0);
                            return;
                        }
                    }
                    for (frame, chunk) in data.chunks_mut(channels).enumerate() {
                        match chunk.len() {
                            0 => {}
                            1 => chunk[0] = 0.5 * (left[frame] + right[frame]),
                            _ => {
                                chunk[0] = left[frame];
                                chunk[1] = right[frame];
                                for extra in chunk.iter_mut().skip(2) {
                                    *extra = 0.0;
                                }
                            }
                        }
                    }
                },
                |err| error!("output stream error: {err}"),
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;
        output_stream
            .play()
            .map_err(|e| Error::Stream(e.to_string()))?;
        self._output_stream = Some(output_stream);

        info!(sample_rate, channels, "session running");

        let deadline = self
            .config
            .duration_secs
            .map(|secs| std::time::Instant::now() + std::time::Duration::from_secs_f64(secs));
        while self.running.load(Ordering::SeqCst) {
            if deadline.is_some_and(|d| std::time::Instant::now() >= d) {
                self.running.store(false, Ordering::SeqCst);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
        }

        self._input_stream = None;
        self._output_stream = None;
        Ok(())
    }
}
