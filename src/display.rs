//! The headless in memory display.
use crate::{
    definitions::display::{FADE_FULL, HEIGHT, WIDTH},
    devices::Screen,
};

/// The graphics of the Chip 8 are black and white and the screen has a total of `2048` pixels
/// `(64 x 32)`. Next to the pixel state the grid keeps a fade level per pixel, so that a renderer
/// can ease out switched off pixels instead of letting them flicker.
#[derive(Clone)]
pub struct PixelGrid {
    pixels: [[bool; WIDTH]; HEIGHT],
    fade: [[u8; WIDTH]; HEIGHT],
}

impl Default for PixelGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelGrid {
    pub fn new() -> Self {
        Self {
            pixels: [[false; WIDTH]; HEIGHT],
            fade: [[0; WIDTH]; HEIGHT],
        }
    }

    /// All the rows of the screen.
    pub fn rows(&self) -> &[[bool; WIDTH]; HEIGHT] {
        &self.pixels
    }

    /// The fade level of the given pixel, wraps like all other addressing.
    pub fn fade_level(&self, x: usize, y: usize) -> u8 {
        self.fade[y % HEIGHT][x % WIDTH]
    }

    /// Will decay the fade level of all pixels by `amount`.
    pub fn fade_step(&mut self, amount: u8) {
        for level in self.fade.iter_mut().flat_map(|row| row.iter_mut()) {
            *level = level.saturating_sub(amount);
        }
    }
}

impl Screen for PixelGrid {
    fn reset(&mut self) {
        self.clear();
    }

    fn clear(&mut self) {
        self.pixels = [[false; WIDTH]; HEIGHT];
        self.fade = [[0; WIDTH]; HEIGHT];
    }

    fn flip_bit(&mut self, x: usize, y: usize, bit: bool) -> bool {
        let (x, y) = (x % WIDTH, y % HEIGHT);
        let old = self.pixels[y][x];
        let new = old ^ bit;
        self.pixels[y][x] = new;

        let collision = old && !new;
        if collision {
            self.fade[y][x] = FADE_FULL;
        }
        collision
    }

    fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[y % HEIGHT][x % WIDTH]
    }

    fn width(&self) -> usize {
        WIDTH
    }

    fn height(&self) -> usize {
        HEIGHT
    }
}
