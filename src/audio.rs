//! Tone generators that can be plugged into the board.
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{definitions::sound, devices::Tone};

/// A tone that only remembers if it is on, used by headless boards.
#[derive(Debug, Default, Clone)]
pub struct Beeper {
    on: bool,
}

impl Beeper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tone for Beeper {
    fn start(&mut self) {
        if !self.on {
            log::trace!("beep on");
        }
        self.on = true;
    }

    fn stop(&mut self) {
        if self.on {
            log::trace!("beep off");
        }
        self.on = false;
    }

    fn reset(&mut self) {
        self.on = false;
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

/// A tone whose state is shared with a [`ToneListener`], so that an audio
/// callback running on another thread can render it.
#[derive(Debug, Default, Clone)]
pub struct SharedTone {
    state: Arc<Mutex<bool>>,
}

impl SharedTone {
    pub fn new() -> Self {
        Self::default()
    }

    /// Will create a read only handle onto the tone state.
    pub fn listener(&self) -> ToneListener {
        ToneListener {
            state: self.state.clone(),
        }
    }
}

impl Tone for SharedTone {
    fn start(&mut self) {
        *self.state.lock() = true;
    }

    fn stop(&mut self) {
        *self.state.lock() = false;
    }

    fn reset(&mut self) {
        self.stop();
    }

    fn is_on(&self) -> bool {
        *self.state.lock()
    }
}

/// The consumer side of a [`SharedTone`].
#[derive(Debug, Clone)]
pub struct ToneListener {
    state: Arc<Mutex<bool>>,
}

impl ToneListener {
    pub fn is_on(&self) -> bool {
        *self.state.lock()
    }

    /// Will fill the buffer with a square wave if the tone is on and with
    /// silence otherwise. The wave restarts with every buffer.
    ///
    /// # Example
    /// ```rust
    /// # use chip::{audio::SharedTone, devices::Tone};
    /// let mut tone = SharedTone::new();
    /// let listener = tone.listener();
    /// let mut buffer = [1u16; 4];
    ///
    /// listener.fill_square_wave(&mut buffer);
    /// assert_eq!(buffer, [0; 4]);
    ///
    /// tone.start();
    /// listener.fill_square_wave(&mut buffer);
    /// assert!(buffer.iter().all(|sample| *sample > 0));
    /// ```
    pub fn fill_square_wave(&self, out: &mut [u16]) {
        if !self.is_on() {
            out.fill(0);
            return;
        }

        for (index, sample) in out.iter_mut().enumerate() {
            *sample = if index % sound::PERIOD < sound::PERIOD / 2 {
                sound::AMPLITUDE
            } else {
                0
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beeper_idempotent() {
        let mut beeper = Beeper::new();
        assert!(!beeper.is_on());

        beeper.start();
        beeper.start();
        assert!(beeper.is_on());

        beeper.stop();
        beeper.stop();
        assert!(!beeper.is_on());

        beeper.start();
        beeper.reset();
        assert!(!beeper.is_on());
    }

    #[test]
    fn test_shared_tone() {
        let mut tone = SharedTone::new();
        let listener = tone.listener();
        assert!(!listener.is_on());

        tone.start();
        assert!(tone.is_on());
        assert!(listener.is_on());

        tone.reset();
        assert!(!listener.is_on());
    }

    #[test]
    fn test_square_wave() {
        let mut tone = SharedTone::new();
        let listener = tone.listener();
        tone.start();

        let mut buffer = vec![0; sound::PERIOD * 2];
        listener.fill_square_wave(&mut buffer);

        let half = sound::PERIOD / 2;
        assert!(buffer[..half].iter().all(|s| *s == sound::AMPLITUDE));
        assert!(buffer[half..sound::PERIOD].iter().all(|s| *s == 0));
        assert_eq!(buffer[sound::PERIOD], sound::AMPLITUDE);

        tone.stop();
        listener.fill_square_wave(&mut buffer);
        assert!(buffer.iter().all(|s| *s == 0));
    }
}
