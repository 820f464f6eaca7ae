//! Runtime wiring
//!
//! Two periodic loops make up the daemon: the input loop (see
//! `InputMonitor::spawn`) and the render loop defined here. Button
//! callbacks never touch the scheduler. They post `Command`s on a bounded
//! channel, and the render loop applies them between ticks, so the
//! scheduler and the display have a single owner.

use crate::config::{ButtonConfig, ButtonKind, NavFunc};
use crate::display::{DisplayError, DisplaySink, Icon};
use crate::input::{Callbacks, InputSwitch, Pull, SwitchKind};
use crate::schedule::PageScheduler;

use std::io;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use tracing::{debug, error, info, warn};

pub const INPUT_PERIOD: Duration = Duration::from_millis(10);
pub const RENDER_PERIOD: Duration = Duration::from_millis(10);
/// Commands waiting for the render loop before new ones are dropped.
pub const COMMAND_QUEUE: usize = 16;

/// Shared "keep running" flag of the daemon loops.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> RunFlag {
        RunFlag(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for RunFlag {
    fn default() -> RunFlag {
        RunFlag::new()
    }
}

struct StopOnDrop(RunFlag);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.stop();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Poweroff,
    Reboot,
}

impl PowerAction {
    pub fn icon(&self) -> Icon {
        match self {
            PowerAction::Poweroff => Icon::Poweroff,
            PowerAction::Reboot => Icon::Reboot,
        }
    }

    /// Arguments to `sudo`.
    pub fn command(&self) -> &'static str {
        match self {
            PowerAction::Poweroff => "poweroff",
            PowerAction::Reboot => "reboot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    /// A power button is being held; show what releasing it will do.
    PowerPending(PowerAction),
    Power(PowerAction),
}

pub trait PowerControl: Send {
    fn execute(&mut self, action: PowerAction) -> io::Result<()>;
}

/// Runs `sudo poweroff` / `sudo reboot`.
#[derive(Debug, Default)]
pub struct SystemPower;

impl PowerControl for SystemPower {
    fn execute(&mut self, action: PowerAction) -> io::Result<()> {
        info!("executing {}", action.command());
        let status = process::Command::new("sudo")
            .arg(action.command())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "sudo {} exited with {}",
                action.command(),
                status
            )))
        }
    }
}

/// Switch for a configured button. Its callbacks post commands on `commands`.
///
/// `for_held` re-fires every poll past the hold threshold; the resulting
/// `PowerPending` is posted once per hold so it cannot crowd the final
/// `Power` out of the queue.
pub fn switch_for(button: &ButtonConfig, commands: Sender<Command>) -> InputSwitch {
    let nav = match button.func {
        NavFunc::Next => Command::Next,
        NavFunc::Previous => Command::Previous,
    };
    match button.kind {
        ButtonKind::Pressed => {
            let callbacks = Callbacks::new().pressed(move || {
                post(&commands, nav);
            });
            InputSwitch::new(button.gpio, Pull::Up, SwitchKind::Pressed, callbacks)
        }
        ButtonKind::Hold { hold_time, action } => {
            let pending = Arc::new(AtomicBool::new(false));
            let on_press = (commands.clone(), pending.clone());
            let on_hold = (commands.clone(), pending.clone());
            let callbacks = Callbacks::new()
                .pressed(move || {
                    on_press.1.store(false, Ordering::Relaxed);
                    post(&on_press.0, nav);
                })
                .for_held(move || {
                    if !on_hold.1.load(Ordering::Relaxed)
                        && post(&on_hold.0, Command::PowerPending(action))
                    {
                        on_hold.1.store(true, Ordering::Relaxed);
                    }
                })
                .held(move || {
                    pending.store(false, Ordering::Relaxed);
                    post(&commands, Command::Power(action));
                });
            InputSwitch::new(button.gpio, Pull::Up, SwitchKind::HeldAdvanced, callbacks)
                .with_hold(hold_time)
        }
    }
}

fn post(commands: &Sender<Command>, command: Command) -> bool {
    match commands.try_send(command) {
        Ok(()) => true,
        Err(TrySendError::Full(cmd)) => {
            debug!(?cmd, "command queue full, dropped");
            false
        }
        Err(TrySendError::Disconnected(cmd)) => {
            debug!(?cmd, "render loop gone, dropped");
            false
        }
    }
}

/// The render context: applies commands, then ticks the scheduler.
pub struct RenderLoop<D: DisplaySink> {
    scheduler: PageScheduler<D>,
    commands: Receiver<Command>,
    power: Box<dyn PowerControl>,
    period: Duration,
    running: RunFlag,
}

impl<D: DisplaySink> RenderLoop<D> {
    pub fn new(
        scheduler: PageScheduler<D>,
        commands: Receiver<Command>,
        power: Box<dyn PowerControl>,
        period: Duration,
        running: RunFlag,
    ) -> RenderLoop<D> {
        RenderLoop {
            scheduler,
            commands,
            power,
            period,
            running,
        }
    }

    pub fn scheduler(&self) -> &PageScheduler<D> {
        &self.scheduler
    }

    /// Apply every pending command, then run one scheduler tick.
    pub fn step(&mut self, now: Instant) -> Result<(), DisplayError> {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command, now)?;
        }
        self.scheduler.tick(now)
    }

    fn apply(&mut self, command: Command, now: Instant) -> Result<(), DisplayError> {
        debug!(?command, "command");
        match command {
            Command::Next => self.scheduler.next(now),
            Command::Previous => self.scheduler.previous(now),
            Command::PowerPending(action) => self.scheduler.show_overlay(action.icon(), now),
            Command::Power(action) => {
                self.scheduler.show_overlay(action.icon(), now)?;
                if let Err(err) = self.power.execute(action) {
                    error!("{} failed: {}", action.command(), err);
                }
                Ok(())
            }
        }
    }

    /// Run until the flag is cleared or the display is lost. The flag is
    /// cleared on the way out, however the loop ends.
    pub fn run(mut self) -> Result<(), DisplayError> {
        let _stop = StopOnDrop(self.running.clone());
        let ticker = channel::tick(self.period);
        info!("render loop started");
        while self.running.is_running() {
            let Ok(now) = ticker.recv() else {
                break;
            };
            match self.step(now) {
                Ok(()) => {}
                Err(err) if err.is_fatal() => {
                    error!("render loop stopped: {}", err);
                    return Err(err);
                }
                Err(err) => warn!("render tick failed: {}", err),
            }
        }
        info!("render loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{Frame, MemoryDisplay, LINE1};
    use crate::input::{Level, DEFAULT_DEBOUNCE};
    use crate::pages::{Page, PageError};
    use crate::schedule::{Mode, Screensaver};

    use std::sync::Mutex;

    struct Named(&'static str);

    impl Page for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn icon(&self) -> Icon {
            Icon::CpuMem
        }

        fn draw(&mut self, frame: &mut Frame) -> Result<(), PageError> {
            frame.left(LINE1, self.0);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<PowerAction>>>);

    impl PowerControl for Recorder {
        fn execute(&mut self, action: PowerAction) -> io::Result<()> {
            self.0.lock().unwrap().push(action);
            Ok(())
        }
    }

    /// Sink that fails every flush.
    struct Unplugged;

    impl DisplaySink for Unplugged {
        fn flush(&mut self, _: &Frame) -> Result<(), DisplayError> {
            Err(DisplayError::Disconnected)
        }

        fn show(&mut self) -> Result<(), DisplayError> {
            Ok(())
        }

        fn hide(&mut self) -> Result<(), DisplayError> {
            Ok(())
        }
    }

    fn pages() -> Vec<Box<dyn Page>> {
        let a: Box<dyn Page> = Box::new(Named("a"));
        let b: Box<dyn Page> = Box::new(Named("b"));
        vec![a, b]
    }

    fn manual(now: Instant) -> Mode {
        Mode::Manual(Screensaver::new(0, now))
    }

    #[test]
    fn commands_apply_before_tick() {
        let start = Instant::now();
        let scheduler = PageScheduler::new(pages(), manual(start), false, MemoryDisplay::new(), start);
        let (tx, rx) = channel::bounded(COMMAND_QUEUE);
        let power = Recorder::default();
        let mut render = RenderLoop::new(
            scheduler,
            rx,
            Box::new(power.clone()),
            RENDER_PERIOD,
            RunFlag::new(),
        );

        tx.send(Command::Next).unwrap();
        render.step(start).unwrap();
        assert_eq!(render.scheduler().current_index(), 1);
        let frame = render.scheduler().display().last_frame().unwrap();
        assert_eq!(frame.texts(), vec!["b"]);

        tx.send(Command::PowerPending(PowerAction::Reboot)).unwrap();
        tx.send(Command::PowerPending(PowerAction::Reboot)).unwrap();
        render.step(start + Duration::from_secs(2)).unwrap();
        assert_eq!(render.scheduler().display().frames().len(), 2);

        tx.send(Command::Power(PowerAction::Reboot)).unwrap();
        render.step(start + Duration::from_secs(3)).unwrap();
        assert_eq!(*power.0.lock().unwrap(), vec![PowerAction::Reboot]);
        let frame = render.scheduler().display().last_frame().unwrap();
        assert_eq!(frame.icons(), vec![Icon::Reboot]);
    }

    #[test]
    fn lost_display_stops_both_loops() {
        let start = Instant::now();
        let scheduler = PageScheduler::new(pages(), manual(start), false, Unplugged, start);
        let (_tx, rx) = channel::bounded(COMMAND_QUEUE);
        let running = RunFlag::new();
        let render = RenderLoop::new(
            scheduler,
            rx,
            Box::new(Recorder::default()),
            Duration::from_millis(1),
            running.clone(),
        );
        let err = render.run().unwrap_err();
        assert!(err.is_fatal());
        assert!(!running.is_running());
    }

    #[test]
    fn run_returns_once_stopped() {
        let start = Instant::now();
        let scheduler = PageScheduler::new(pages(), manual(start), false, MemoryDisplay::new(), start);
        let (_tx, rx) = channel::bounded(COMMAND_QUEUE);
        let running = RunFlag::new();
        running.stop();
        let render = RenderLoop::new(
            scheduler,
            rx,
            Box::new(Recorder::default()),
            RENDER_PERIOD,
            running,
        );
        render.run().unwrap();
    }

    #[test]
    fn hold_button_posts_commands() {
        let button = ButtonConfig {
            gpio: 27,
            func: NavFunc::Previous,
            kind: ButtonKind::Hold {
                hold_time: Duration::from_secs(2),
                action: PowerAction::Poweroff,
            },
        };
        let (tx, rx) = channel::bounded(COMMAND_QUEUE);
        let mut switch = switch_for(&button, tx);
        assert_eq!(switch.pin(), 27);
        assert_eq!(switch.kind(), SwitchKind::HeldAdvanced);

        let start = Instant::now();
        switch.check(Level::Low, start);
        switch.check(Level::High, start + Duration::from_millis(100));
        switch.check(Level::Low, start + Duration::from_secs(1));
        switch.check(Level::Low, start + Duration::from_secs(3));
        switch.check(Level::High, start + Duration::from_secs(4));
        let posted: Vec<Command> = rx.try_iter().collect();
        assert_eq!(
            posted,
            vec![
                Command::Previous,
                Command::PowerPending(PowerAction::Poweroff),
                Command::Power(PowerAction::Poweroff),
            ]
        );
    }

    #[test]
    fn long_hold_posts_power_after_one_pending() {
        let button = ButtonConfig {
            gpio: 22,
            func: NavFunc::Next,
            kind: ButtonKind::Hold {
                hold_time: Duration::from_secs(2),
                action: PowerAction::Reboot,
            },
        };
        let (tx, rx) = channel::bounded(COMMAND_QUEUE);
        let mut switch = switch_for(&button, tx);
        assert_eq!(switch.hold(), Duration::from_secs(2));
        assert_eq!(switch.debounce(), DEFAULT_DEBOUNCE);

        // Nobody drains the queue while the button stays down.
        let start = Instant::now();
        for hold in 0..2 {
            let t = start + Duration::from_secs(10 * hold);
            switch.check(Level::Low, t);
            for i in 0..(2 * COMMAND_QUEUE as u64) {
                switch.check(Level::Low, t + Duration::from_secs(2) + Duration::from_millis(10 * i));
            }
            switch.check(Level::High, t + Duration::from_secs(3));
            let posted: Vec<Command> = rx.try_iter().collect();
            assert_eq!(
                posted,
                vec![
                    Command::PowerPending(PowerAction::Reboot),
                    Command::Power(PowerAction::Reboot),
                ]
            );
        }
    }

    #[test]
    fn full_queue_drops_commands() {
        let button = ButtonConfig {
            gpio: 17,
            func: NavFunc::Next,
            kind: ButtonKind::Pressed,
        };
        let (tx, rx) = channel::bounded(1);
        let mut switch = switch_for(&button, tx);
        let start = Instant::now();
        for i in 0..3 {
            let t = start + Duration::from_secs(i);
            switch.check(Level::Low, t);
            switch.check(Level::High, t + Duration::from_millis(100));
        }
        assert_eq!(rx.try_iter().count(), 1);
    }
}
