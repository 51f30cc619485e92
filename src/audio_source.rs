//! `AudioSource`: the microphone capture backend interface, plus a real
//! implementation over `cpal` grounded on the teacher's stream-callback
//! pattern (downmix to mono in the callback, forward through a bounded
//! channel, never block the audio thread).

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Stream;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::warn;

use crate::error::AgcError;

/// Capacity of the PCM chunk queue, in chunks (not samples): the
/// concurrency model asks for headroom of at least a few windows' worth
/// of audio so the control loop can fall behind briefly without losing
/// data, only degrading to an explicit overflow event if it falls behind
/// further than this.
const QUEUE_CAPACITY: usize = 64;

/// One delivery from the capture boundary: either a block of
/// monotonically-ordered mono float32 samples, or an overflow signal
/// raised when the queue could not keep up.
#[derive(Debug, Clone)]
pub enum AudioEvent {
    Chunk(Vec<f32>),
    Overflow,
}

/// Microphone capture backend. Implementations own the capture device and
/// forward PCM blocks (or overflow signals) through `events()`.
pub trait AudioSource: Send {
    fn sample_rate(&self) -> u32;
    fn events(&self) -> Receiver<AudioEvent>;
}

/// Downmixes an interleaved multi-channel block to mono by averaging
/// channels. Pulled out of the stream callback so it can be tested
/// without real hardware.
pub fn downmix_to_mono(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

pub struct CpalAudioSource {
    // Kept alive for the duration of capture; dropping it stops the stream.
    #[allow(dead_code)]
    stream: Stream,
    sample_rate: u32,
    receiver: Receiver<AudioEvent>,
}

impl CpalAudioSource {
    pub fn open(device_index: Option<usize>, _mono: bool) -> Result<Self, AgcError> {
        let host = cpal::default_host();
        let device = match device_index {
            Some(idx) => host
                .input_devices()
                .map_err(|_| AgcError::AudioDeviceLost)?
                .nth(idx)
                .ok_or(AgcError::AudioDeviceLost)?,
            None => host
                .default_input_device()
                .ok_or(AgcError::AudioDeviceLost)?,
        };

        let config = device
            .default_input_config()
            .map_err(|_| AgcError::AudioDeviceLost)?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        let (sender, receiver): (Sender<AudioEvent>, Receiver<AudioEvent>) =
            bounded(QUEUE_CAPACITY);

        let stream = device
            .build_input_stream(
                &config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono = downmix_to_mono(data, channels);
                    match sender.try_send(AudioEvent::Chunk(mono)) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            let _ = sender.try_send(AudioEvent::Overflow);
                        }
                        Err(TrySendError::Disconnected(_)) => {}
                    }
                },
                |err| warn!("audio stream error: {err}"),
                None,
            )
            .map_err(|_| AgcError::AudioDeviceLost)?;

        stream.play().map_err(|_| AgcError::AudioDeviceLost)?;

        Ok(Self {
            stream,
            sample_rate,
            receiver,
        })
    }

    /// Enumerates available input device names, for `--list-devices`.
    pub fn list_devices() -> Result<Vec<String>, AgcError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|_| AgcError::AudioDeviceLost)?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

impl AudioSource for CpalAudioSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn events(&self) -> Receiver<AudioEvent> {
        self.receiver.clone()
    }
}
