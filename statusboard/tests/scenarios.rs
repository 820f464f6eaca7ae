use statusboard::config::{Config, ModeConfig};
use statusboard::display::{Frame, Icon, MemoryDisplay, LINE1};
use statusboard::input::Level;
use statusboard::metrics::{FixedContainers, FixedMetrics};
use statusboard::pages::{self, Page, PageError, Sources, StoragePage};
use statusboard::runtime::{self, PowerAction, PowerControl, RenderLoop, RunFlag};
use statusboard::schedule::{Mode, Screensaver};
use statusboard::PageScheduler;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel;

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

struct NoPower;

impl PowerControl for NoPower {
    fn execute(&mut self, _: PowerAction) -> io::Result<()> {
        Ok(())
    }
}

fn named(names: &[&'static str]) -> Vec<Box<dyn Page>> {
    names
        .iter()
        .map(|n| Box::new(Named(*n)) as Box<dyn Page>)
        .collect()
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

#[test]
fn navigation_cycles_back_to_start() {
    let start = Instant::now();
    let mode = Mode::Manual(Screensaver::new(5, start));
    let mut s = PageScheduler::new(named(&["a", "b", "c"]), mode, true, MemoryDisplay::new(), start);
    for _ in 0..3 {
        s.next(start).unwrap();
    }
    assert_eq!(s.current_index(), 0);
    for _ in 0..3 {
        s.previous(start).unwrap();
    }
    assert_eq!(s.current_index(), 0);
    s.previous(start).unwrap();
    assert_eq!(s.current_index(), 2);
}

#[test]
fn screensaver_blanks_idle_display() {
    let start = Instant::now();
    let mode = Mode::Manual(Screensaver::new(1, start));
    let mut s = PageScheduler::new(named(&["a"]), mode, false, MemoryDisplay::new(), start);

    s.tick(start).unwrap();
    assert_eq!(s.display().frames().len(), 1);
    s.tick(start + secs(61)).unwrap();
    assert!(!s.is_display_on());
    assert!(!s.display().is_visible());

    let painted = s.display().frames().len();
    for i in 0..50 {
        s.tick(start + secs(62 + i)).unwrap();
    }
    assert_eq!(s.display().frames().len(), painted);
    assert_eq!(s.display().hides(), 1);
}

#[test]
fn navigation_while_asleep_only_wakes() {
    let start = Instant::now();
    let mode = Mode::Manual(Screensaver::new(1, start));
    let mut s = PageScheduler::new(named(&["a", "b"]), mode, false, MemoryDisplay::new(), start);
    s.tick(start + secs(60)).unwrap();
    assert!(!s.is_display_on());

    s.next(start + secs(70)).unwrap();
    assert_eq!(s.current_index(), 0);
    assert!(s.is_display_on());
    assert!(s.display().is_visible());

    // Awake again, navigation moves and keeps the display on.
    s.next(start + secs(71)).unwrap();
    s.next(start + secs(71)).unwrap();
    assert_eq!(s.current_index(), 0);
    assert!(s.is_display_on());

    // Idle timer restarted at the last navigation.
    s.tick(start + secs(130)).unwrap();
    assert!(s.is_display_on());
    s.tick(start + secs(131)).unwrap();
    assert!(!s.is_display_on());
}

#[test]
fn auto_mode_advances_and_renders_on_the_same_tick() {
    let start = Instant::now();
    let mode = Mode::Auto { delay: secs(10) };
    let mut s = PageScheduler::new(named(&["a", "b", "c"]), mode, true, MemoryDisplay::new(), start);

    s.tick(start).unwrap();
    s.tick(start + Duration::from_millis(9_990)).unwrap();
    assert_eq!(s.current_index(), 0);
    let painted = s.display().frames().len();

    s.tick(start + secs(10)).unwrap();
    assert_eq!(s.current_index(), 1);
    assert_eq!(s.display().frames().len(), painted + 1);
    assert_eq!(s.display().last_frame().unwrap().icons(), vec![Icon::CpuMem]);

    s.tick(start + secs(20)).unwrap();
    s.tick(start + secs(30)).unwrap();
    assert_eq!(s.current_index(), 0);
}

#[test]
fn missing_mount_point_logs_once() {
    let start = Instant::now();
    let system = Arc::new(FixedMetrics::new());
    let page: Box<dyn Page> = Box::new(StoragePage::new(Icon::Hdd, "/mnt/usb", system));
    let mode = Mode::Manual(Screensaver::new(0, start));
    let mut s = PageScheduler::new(vec![page], mode, false, MemoryDisplay::new(), start);

    for i in 0..100 {
        s.tick(start + secs(i)).unwrap();
    }
    assert_eq!(s.errors_logged(0), Some(1));
    let frame = s.display().last_frame().unwrap();
    assert_eq!(
        frame.texts(),
        vec!["Path", "'/mnt/usb'", "is not a", "mount point!"]
    );

    // A navigation re-arms the report.
    s.next(start + secs(100)).unwrap();
    s.tick(start + secs(100)).unwrap();
    assert_eq!(s.errors_logged(0), Some(2));
}

#[test]
fn configured_buttons_drive_the_render_loop() {
    let config = Config::from_yaml(
        "
main:
  mode: manual
  showicons: no
  screensaver: 0
pages:
  - type: cpumem
  - type: storage
    icon: ssd
    value: /srv
buttons:
  - gpio: 5
    type: hold
    func: next
    holdtime: 2
    holdfunc: poweroff
",
    )
    .unwrap();
    let ModeConfig::Manual {
        screensaver_minutes,
    } = config.mode
    else {
        panic!("expected manual mode");
    };

    let sources = Sources {
        system: Arc::new(FixedMetrics::new()),
        containers: Arc::new(FixedContainers::default()),
    };
    let pages = config.pages.iter().map(|p| pages::build(p, &sources)).collect();
    let start = Instant::now();
    let mode = Mode::Manual(Screensaver::new(screensaver_minutes, start));
    let scheduler = PageScheduler::new(pages, mode, config.show_icons, MemoryDisplay::new(), start);

    let (tx, rx) = channel::bounded(runtime::COMMAND_QUEUE);
    let mut switch = runtime::switch_for(&config.buttons[0], tx);
    let mut render = RenderLoop::new(
        scheduler,
        rx,
        Box::new(NoPower),
        runtime::RENDER_PERIOD,
        RunFlag::new(),
    );

    render.step(start).unwrap();
    assert_eq!(render.scheduler().current_page(), Some("cpumem"));

    switch.check(Level::Low, start + secs(1));
    switch.check(Level::High, start + Duration::from_millis(1_200));
    render.step(start + Duration::from_millis(1_200)).unwrap();
    assert_eq!(render.scheduler().current_page(), Some("storage"));

    switch.check(Level::Low, start + secs(2));
    switch.check(Level::Low, start + secs(4));
    render.step(start + secs(4)).unwrap();
    assert_eq!(render.scheduler().overlay(), Some(Icon::Poweroff));
    assert_eq!(
        render.scheduler().display().last_frame().unwrap().icons(),
        vec![Icon::Poweroff]
    );
}
