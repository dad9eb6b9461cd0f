use crate::{definitions::keyboard, KeyError};

/// The character used by [`Screen::dump`] for a set pixel.
pub const PIXEL_ON: char = '*';
/// The character used by [`Screen::dump`] for an unset pixel.
pub const PIXEL_OFF: char = '_';

#[cfg_attr(test, mockall::automock)]
/// The traits responsible for the display based code
///
/// All addressing wraps around the screen edges, nothing here can fail.
pub trait Screen {
    /// Will restore the power on state of the screen.
    fn reset(&mut self);

    /// Will clear the display
    fn clear(&mut self);

    /// Will XOR a single pixel with `bit`, returns true if the pixel was set
    /// before and is unset afterwards.
    fn flip_bit(&mut self, x: usize, y: usize, bit: bool) -> bool;

    /// Will XOR the eight bits of `byte` onto the row `y` starting at column `x`,
    /// the most significant bit first. Returns true if any of the pixels was
    /// switched off.
    fn flip_sprite(&mut self, x: usize, y: usize, byte: u8) -> bool {
        let mut collision = false;
        for bit in 0..8 {
            let value = byte & (0x80 >> bit) != 0;
            collision |= self.flip_bit(x + bit, y, value);
        }
        collision
    }

    /// Will return the state of the given pixel.
    fn pixel(&self, x: usize, y: usize) -> bool;

    /// The amount of pixels per row.
    fn width(&self) -> usize;

    /// The amount of rows.
    fn height(&self) -> usize;

    /// Will render the screen one line per row.
    fn dump(&self) -> String {
        let mut res = String::with_capacity((self.width() + 1) * self.height());
        for y in 0..self.height() {
            for x in 0..self.width() {
                res.push(if self.pixel(x, y) { PIXEL_ON } else { PIXEL_OFF });
            }
            res.push('\n');
        }
        res
    }
}

#[cfg_attr(test, mockall::automock)]
/// The trait responsible for the beeper.
///
/// Both `start` and `stop` have to be idempotent.
pub trait Tone {
    /// Will switch the tone on.
    fn start(&mut self);
    /// Will switch the tone off.
    fn stop(&mut self);
    /// Will force the tone off.
    fn reset(&mut self);
    /// Returns if the tone is currently on.
    fn is_on(&self) -> bool;
}

/// Will store the state of the hex keypad
///
/// Input is done with a hex keyboard that has 16 keys ranging `0-F`. The `8`, `4`, `6`, and
/// `2` keys are typically used for directional input. Three opcodes are used to detect input.
/// One skips an instruction if a specific key is pressed, while another does the same if a
/// specific key is not pressed. The third waits for a key press, and then stores it in one of
/// the data registers.
#[derive(Default, Debug, Clone)]
pub struct Keypad {
    keys: [bool; keyboard::SIZE],
}

impl Keypad {
    pub fn new() -> Self {
        Keypad::default()
    }

    /// Releases all the keys.
    pub fn reset(&mut self) {
        self.keys = [false; keyboard::SIZE];
    }

    fn check(key: usize) -> Result<(), KeyError> {
        if key < keyboard::SIZE {
            Ok(())
        } else {
            Err(KeyError(key))
        }
    }

    pub fn set_key(&mut self, key: usize, down: bool) -> Result<(), KeyError> {
        Self::check(key)?;
        self.keys[key] = down;
        Ok(())
    }

    pub fn is_down(&self, key: usize) -> Result<bool, KeyError> {
        Self::check(key)?;
        Ok(self.keys[key])
    }

    pub fn get_keys(&self) -> &[bool] {
        &self.keys
    }
}
