//! The host loop driving the board at its three independent rates.
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use hashbrown::HashSet;

use crate::{
    chip8::Board,
    definitions::{cpu, display, timer},
    devices::{Screen, Tone},
    ProcessError,
};

/// The rates the runner drives the board at, `0` hertz runs on every
/// loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    pub cpu_hz: u32,
    pub timer_hz: u32,
    pub refresh_hz: u32,
    /// Stop after this many instructions per run.
    pub step_limit: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cpu_hz: cpu::HERTZ,
            timer_hz: timer::HERTZ,
            refresh_hz: display::REFRESH_HERTZ,
            step_limit: None,
        }
    }
}

impl RunnerConfig {
    /// A config without any throttling.
    pub fn unthrottled() -> Self {
        Self {
            cpu_hz: 0,
            timer_hz: 0,
            refresh_hz: 0,
            step_limit: None,
        }
    }
}

/// Why the runner gave control back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// The interrupt handle was raised.
    Interrupted,
    /// The break flag of the board was set before the run.
    Break,
    /// The board requested a shutdown.
    Shutdown,
    /// The program counter reached a breakpoint.
    Breakpoint(u16),
    /// An instruction failed.
    Fault(ProcessError),
    /// The configured amount of instructions was executed.
    StepLimit,
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Halt::Interrupted => write!(f, "interrupted"),
            Halt::Break => write!(f, "break flag is set"),
            Halt::Shutdown => write!(f, "shutdown requested"),
            Halt::Breakpoint(pc) => write!(f, "breakpoint at {:#05X}", pc),
            Halt::Fault(err) => write!(f, "fault: {}", err),
            Halt::StepLimit => write!(f, "step limit reached"),
        }
    }
}

/// A key transition delivered by the host while the board runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: usize,
    pub down: bool,
}

impl KeyEvent {
    pub fn pressed(key: usize) -> Self {
        Self { key, down: true }
    }

    pub fn released(key: usize) -> Self {
        Self { key, down: false }
    }
}

/// A single rate of the runner.
struct Cadence {
    interval: Option<Duration>,
    next: Instant,
}

impl Cadence {
    fn new(hertz: u32, now: Instant) -> Self {
        Self {
            interval: (hertz > 0).then(|| Duration::from_secs(1) / hertz),
            next: now,
        }
    }

    /// Returns true if the cadence is due and schedules the next tick.
    fn due(&mut self, now: Instant) -> bool {
        let interval = match self.interval {
            Some(interval) => interval,
            None => return true,
        };
        if now < self.next {
            return false;
        }
        self.next += interval;
        // don't try to catch up after a stall
        if self.next < now {
            self.next = now + interval;
        }
        true
    }

    fn next_due(&self) -> Option<Instant> {
        self.interval.map(|_| self.next)
    }
}

/// Drives a board until something requires the attention of the host.
pub struct Runner {
    config: RunnerConfig,
    interrupt: Arc<AtomicBool>,
    /// the runner keeps a sender of its own, the channel never disconnects
    key_sender: Sender<KeyEvent>,
    keys: Receiver<KeyEvent>,
    breakpoints: HashSet<u16>,
    /// the breakpoint the last run stopped at, it is stepped over once
    resume_from: Option<u16>,
    steps: u64,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        let (key_sender, keys) = mpsc::channel();
        Self {
            config,
            interrupt: Arc::new(AtomicBool::new(false)),
            key_sender,
            keys,
            breakpoints: HashSet::new(),
            resume_from: None,
            steps: 0,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// A handle that can be raised from any thread to stop the current run.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    /// A sender for key events, they are handed to the board once per loop
    /// iteration before the timers tick.
    pub fn key_sender(&self) -> Sender<KeyEvent> {
        self.key_sender.clone()
    }

    /// Returns false if the breakpoint was already set.
    pub fn add_breakpoint(&mut self, pc: u16) -> bool {
        self.breakpoints.insert(pc)
    }

    pub fn remove_breakpoint(&mut self, pc: u16) -> bool {
        self.breakpoints.remove(&pc)
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = &u16> {
        self.breakpoints.iter()
    }

    /// The amount of instructions executed over all runs.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Will run the board until it halts. The refresh callback gets the
    /// screen at the refresh rate.
    pub fn run<S, T, F>(&mut self, board: &mut Board<S, T>, mut refresh: F) -> Halt
    where
        S: Screen,
        T: Tone,
        F: FnMut(&S),
    {
        let start = Instant::now();
        let mut cpu = Cadence::new(self.config.cpu_hz, start);
        let mut timer = Cadence::new(self.config.timer_hz, start);
        let mut display = Cadence::new(self.config.refresh_hz, start);
        let limit = self.config.step_limit.map(|limit| self.steps + limit);

        log::debug!("run from {:#05X}", board.cpu().program_counter());
        loop {
            if self.interrupt.swap(false, Ordering::SeqCst) {
                board.set_break(true);
                return Halt::Interrupted;
            }
            if board.is_break() {
                return Halt::Break;
            }
            if board.is_shutdown() {
                return Halt::Shutdown;
            }

            self.poll_keys(board);

            let now = Instant::now();
            if timer.due(now) {
                board.timer_step();
            }
            if display.due(now) {
                refresh(board.screen());
            }
            if cpu.due(now) {
                if let Some(halt) = self.cpu_step(board) {
                    return halt;
                }
                if limit.map_or(false, |limit| self.steps >= limit) {
                    return Halt::StepLimit;
                }
            }

            let wake = [cpu.next_due(), timer.next_due(), display.next_due()];
            if wake.iter().all(Option::is_some) {
                if let Some(next) = wake.iter().flatten().min() {
                    let now = Instant::now();
                    if *next > now {
                        thread::sleep(*next - now);
                    }
                }
            }
        }
    }

    /// Will hand every pending key event to the board.
    fn poll_keys<S, T>(&self, board: &mut Board<S, T>)
    where
        S: Screen,
        T: Tone,
    {
        while let Ok(event) = self.keys.try_recv() {
            if let Err(err) = board.handle_key(event.key, event.down) {
                log::warn!("dropped key event {:?}: {}", event, err);
            }
        }
    }

    fn cpu_step<S, T>(&mut self, board: &mut Board<S, T>) -> Option<Halt>
    where
        S: Screen,
        T: Tone,
    {
        let pc = board.cpu().program_counter();
        let resumed = self.resume_from.take() == Some(pc);
        if !resumed && self.breakpoints.contains(&pc) {
            log::debug!("breakpoint at {:#05X}", pc);
            self.resume_from = Some(pc);
            board.set_break(true);
            return Some(Halt::Breakpoint(pc));
        }

        if let Err(err) = board.step() {
            log::error!("halted at {:#05X}: {}", pc, err);
            return Some(Halt::Fault(err));
        }
        self.steps += 1;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, OpcodeError};

    fn board_with(program: &[u8]) -> Board<crate::display::PixelGrid, crate::audio::Beeper> {
        let mut board = Board::headless();
        board.load_program(program).unwrap();
        board
    }

    fn limited(steps: u64) -> Runner {
        Runner::new(RunnerConfig {
            step_limit: Some(steps),
            ..RunnerConfig::unthrottled()
        })
    }

    #[test]
    fn test_step_limit() {
        // 0x200: JP 0x200
        let mut board = board_with(&[0x12, 0x00]);
        let mut runner = limited(10);
        let mut refreshed = 0;

        assert_eq!(runner.run(&mut board, |_| refreshed += 1), Halt::StepLimit);
        assert_eq!(runner.steps(), 10);
        assert_eq!(refreshed, 10);

        // the limit is per run
        assert_eq!(runner.run(&mut board, |_| {}), Halt::StepLimit);
        assert_eq!(runner.steps(), 20);
    }

    #[test]
    fn test_breakpoint_resume() {
        // 0x200: LD V0, 0x01
        // 0x202: ADD V0, 0x01
        // 0x204: JP 0x202
        let mut board = board_with(&[0x60, 0x01, 0x70, 0x01, 0x12, 0x02]);
        let mut runner = limited(100);
        assert!(runner.add_breakpoint(0x204));
        assert!(!runner.add_breakpoint(0x204));

        assert_eq!(runner.run(&mut board, |_| {}), Halt::Breakpoint(0x204));
        assert!(board.is_break());
        assert_eq!(runner.steps(), 2);
        assert_eq!(board.cpu().register(0x0), Ok(0x02));

        // the break flag has to be cleared by the host
        assert_eq!(runner.run(&mut board, |_| {}), Halt::Break);

        board.set_break(false);
        assert_eq!(runner.run(&mut board, |_| {}), Halt::Breakpoint(0x204));
        assert_eq!(runner.steps(), 4);
        assert_eq!(board.cpu().register(0x0), Ok(0x03));

        assert!(runner.remove_breakpoint(0x204));
        board.set_break(false);
        assert_eq!(runner.run(&mut board, |_| {}), Halt::StepLimit);
    }

    #[test]
    fn test_interrupt() {
        let mut board = board_with(&[0x12, 0x00]);
        let mut runner = limited(10);
        let handle = runner.interrupt_handle();

        handle.store(true, Ordering::SeqCst);
        assert_eq!(runner.run(&mut board, |_| {}), Halt::Interrupted);
        assert!(board.is_break());
        assert!(!handle.load(Ordering::SeqCst));
        assert_eq!(runner.steps(), 0);
    }

    #[test]
    fn test_fault() {
        let mut board = board_with(&[0x51, 0x21]);
        let mut runner = limited(10);

        let halt = runner.run(&mut board, |_| {});
        assert_eq!(
            halt,
            Halt::Fault(ProcessError::Opcode(OpcodeError::InvalidOpcode(0x5121)))
        );
        assert!(board.is_break());
        assert_eq!(board.cpu().program_counter(), 0x200);

        // stack underflow
        let mut board = board_with(&[0x00, 0xEE]);
        match runner.run(&mut board, |_| {}) {
            Halt::Fault(err) => assert_eq!(err.kind(), ErrorKind::OutOfRange),
            halt => panic!("unexpected halt {}", halt),
        }
    }

    #[test]
    fn test_key_resolves_wait() {
        // 0x200: LD V1, K
        // 0x202: LD V0, 0x07
        // 0x204: JP 0x204
        let mut board = board_with(&[0xF1, 0x0A, 0x60, 0x07, 0x12, 0x04]);
        let mut runner = limited(10);
        let keys = runner.key_sender();
        let mut refreshed = 0;

        let halt = runner.run(&mut board, |_| {
            refreshed += 1;
            // the cpu has been parked for two iterations by now
            if refreshed == 3 {
                keys.send(KeyEvent::pressed(0x10)).unwrap();
                keys.send(KeyEvent::pressed(0xA)).unwrap();
            }
        });

        assert_eq!(halt, Halt::StepLimit);
        assert!(!board.cpu().is_awaiting_key());
        assert_eq!(board.cpu().register(0x1), Ok(0x0A));
        assert_eq!(board.cpu().register(0x0), Ok(0x07));
        assert_eq!(board.keypad().is_down(0xA), Ok(true));

        runner.key_sender().send(KeyEvent::released(0xA)).unwrap();
        assert_eq!(runner.run(&mut board, |_| {}), Halt::StepLimit);
        assert_eq!(board.keypad().is_down(0xA), Ok(false));
    }

    #[test]
    fn test_wait_without_key() {
        let mut board = board_with(&[0xF1, 0x0A, 0x60, 0x07]);
        let mut runner = limited(5);

        assert_eq!(runner.run(&mut board, |_| {}), Halt::StepLimit);
        assert!(board.cpu().is_awaiting_key());
        assert_eq!(board.cpu().program_counter(), 0x202);
        assert_eq!(board.cpu().register(0x0), Ok(0x00));
    }

    #[test]
    fn test_shutdown() {
        let mut board = board_with(&[0x12, 0x00]);
        let mut runner = limited(10);

        board.set_shutdown(true);
        assert_eq!(runner.run(&mut board, |_| {}), Halt::Shutdown);
    }

    #[test]
    fn test_timer_runs_with_cpu() {
        // 0x200: LD V0, 0x05
        // 0x202: LD ST, V0
        // 0x204: JP 0x204
        let mut board = board_with(&[0x60, 0x05, 0xF0, 0x18, 0x12, 0x04]);
        let mut runner = limited(3);

        assert_eq!(runner.run(&mut board, |_| {}), Halt::StepLimit);
        // the timer ticks before the instruction of the same iteration
        assert_eq!(board.cpu().sound_timer(), 4);
        assert!(board.tone().is_on());
    }

    #[test]
    fn test_throttled() {
        let mut board = board_with(&[0x12, 0x00]);
        let mut runner = Runner::new(RunnerConfig {
            cpu_hz: 1000,
            step_limit: Some(5),
            ..RunnerConfig::default()
        });

        let start = Instant::now();
        assert_eq!(runner.run(&mut board, |_| {}), Halt::StepLimit);
        assert!(start.elapsed() >= Duration::from_millis(4));
    }
}
