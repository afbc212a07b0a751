// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{error::Error, fmt};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use crate::engine::{DspBackend, Renderer};

/// A small wrapper around a cpal::Device with the details needed to open a stream.
pub struct OutputDevice {
    /// The name of the device.
    name: String,
    /// The maximum number of output channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
}

/// A running output stream. Playback stops when this is dropped.
pub struct Playback {
    _stream: cpal::Stream,
}

impl fmt::Display for OutputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

impl OutputDevice {
    /// Lists output devices across all hosts, sorted by name.
    pub fn list() -> Result<Vec<OutputDevice>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<OutputDevice> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = output_configs
                    .map(|config| config.channels())
                    .max()
                    .unwrap_or(0);

                // The renderer is stereo.
                if max_channels >= 2 {
                    devices.push(OutputDevice {
                        name: device.name()?,
                        max_channels,
                        host_id,
                        device,
                    });
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the named device, or the default host's default output when `name` is `None`.
    pub fn get(name: Option<&str>) -> Result<OutputDevice, Box<dyn Error>> {
        match name {
            Some(name) => OutputDevice::list()?
                .into_iter()
                .find(|device| device.name.trim() == name)
                .ok_or_else(|| format!("no device found with name {}", name).into()),
            None => {
                let host = cpal::default_host();
                let device = host
                    .default_output_device()
                    .ok_or("no default output device")?;
                let max_channels = device.default_output_config()?.channels();
                if max_channels < 2 {
                    return Err("default output device is not stereo".into());
                }
                Ok(OutputDevice {
                    name: device.name()?,
                    max_channels,
                    host_id: host.id(),
                    device,
                })
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_channels(&self) -> u16 {
        self.max_channels
    }

    /// Opens a stream at `sample_rate` and drives `renderer` from its callback in blocks of
    /// at most `block_size` frames. Channels beyond the first two are filled with silence.
    pub fn start<B: DspBackend>(
        &self,
        renderer: Renderer<B>,
        sample_rate: u32,
        block_size: usize,
    ) -> Result<Playback, Box<dyn Error>> {
        let span = span!(Level::INFO, "start stream (cpal)");
        let _enter = span.enter();

        let sample_format = self.device.default_output_config()?.sample_format();
        let config = cpal::StreamConfig {
            channels: self.max_channels,
            sample_rate: sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };
        let channels = self.max_channels as usize;
        let block_size = block_size.max(1);

        let stream = match sample_format {
            cpal::SampleFormat::F32 => self.device.build_output_stream(
                &config,
                create_callback::<f32, B>(renderer, channels, block_size),
                |err| error!("CPAL output stream error: {}", err),
                None,
            )?,
            cpal::SampleFormat::I16 => self.device.build_output_stream(
                &config,
                create_callback::<i16, B>(renderer, channels, block_size),
                |err| error!("CPAL output stream error: {}", err),
                None,
            )?,
            cpal::SampleFormat::I32 => self.device.build_output_stream(
                &config,
                create_callback::<i32, B>(renderer, channels, block_size),
                |err| error!("CPAL output stream error: {}", err),
                None,
            )?,
            other => return Err(format!("unsupported sample format {}", other).into()),
        };
        stream.play()?;

        info!(
            device = self.name,
            sample_rate,
            channels,
            block_size,
            format = sample_format.to_string(),
            "Output stream started."
        );
        Ok(Playback { _stream: stream })
    }
}

/// Builds the stream callback. The scratch block is allocated once, up front.
fn create_callback<T, B>(
    mut renderer: Renderer<B>,
    channels: usize,
    block_size: usize,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
    B: DspBackend,
{
    let mut scratch = vec![0.0f32; block_size * 2];
    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        for chunk in data.chunks_mut(block_size * channels) {
            let frames = chunk.len() / channels;
            let stereo = &mut scratch[..frames * 2];
            renderer.render_interleaved(stereo);
            for (frame, lr) in chunk.chunks_exact_mut(channels).zip(stereo.chunks_exact(2)) {
                frame[0] = T::from_sample(lr[0]);
                frame[1] = T::from_sample(lr[1]);
                for extra in frame[2..].iter_mut() {
                    *extra = T::EQUILIBRIUM;
                }
            }
        }
    }
}
