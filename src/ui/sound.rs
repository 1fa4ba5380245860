/// Sound cues via rodio, synthesized once at startup.
///
///   step   short tick when the player moves into free space
///   shove  low scrape when the move pushed other blocks
///   thud   dull knock when a push is refused
///
/// Build without the "sound" feature to get a silent stub with the same API.

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;

    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_step: Vec<f32>,
        sfx_shove: Vec<f32>,
        sfx_thud: Vec<f32>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::info!("sound: no output device ({e}), running silent");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_step: gen_step(),
                sfx_shove: gen_shove(),
                sfx_thud: gen_thud(),
            })
        }

        fn play(&self, samples: &[f32]) {
            match Sink::try_new(&self.handle) {
                Ok(sink) => {
                    sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples.to_vec()));
                    sink.detach();
                }
                Err(e) => log::debug!("sound: sink unavailable: {e}"),
            }
        }

        pub fn play_step(&self) { self.play(&self.sfx_step); }
        pub fn play_shove(&self) { self.play(&self.sfx_shove); }
        pub fn play_thud(&self) { self.play(&self.sfx_thud); }
    }

    // ── Waveforms (mono f32) ──

    fn samples(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// 880 Hz sine, 25 ms, linear fade.
    fn gen_step() -> Vec<f32> {
        let n = samples(0.025);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - i as f32 / n as f32;
                (t * 880.0 * TAU).sin() * env * 0.15
            })
            .collect()
    }

    /// Falling square-ish tone with a little noise on top.
    fn gen_shove() -> Vec<f32> {
        let n = samples(0.08);
        let mut rng: u32 = 0x9e37_79b9;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let t = i as f32 / SAMPLE_RATE as f32;
                let freq = 220.0 - p * 90.0;
                let square = if (t * freq * TAU).sin() >= 0.0 { 1.0 } else { -1.0 };
                rng ^= rng << 13;
                rng ^= rng >> 17;
                rng ^= rng << 5;
                let noise = rng as f32 / u32::MAX as f32 * 2.0 - 1.0;
                (square * 0.6 + noise * 0.4) * (1.0 - p) * 0.18
            })
            .collect()
    }

    /// 90 Hz sine with a fast exponential decay.
    fn gen_thud() -> Vec<f32> {
        let n = samples(0.12);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                (t * 90.0 * TAU).sin() * (-t * 35.0).exp() * 0.35
            })
            .collect()
    }

}

// ── Public API: no-ops when the sound feature is off ──

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_step(&self) {}
    pub fn play_shove(&self) {}
    pub fn play_thud(&self) {}
}
