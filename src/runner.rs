use std::io;
use std::time::Instant;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};

use crate::apps::quiz::{self, QuizApp};
use crate::apps::quiz_http::HttpQuestions;
use crate::apps::{AppEntry, AppFactory, AppKind};
use crate::config::{DesktopConfig, StoreLocation};
use crate::drivers::console::{ConsoleInputDriver, ConsoleOutputDriver};
use crate::drivers::{InputDriver, OutputDriver};
use crate::error::WmResult;
use crate::event_loop::{ControlFlow, EventLoop};
use crate::launcher::Launcher;
use crate::store::KvStore;
use crate::ui::UiFrame;
use crate::window::{PointerEvent, SpawnCascade, WindowId, WindowRegistry};

/// Launcher order for the built-in kinds; other registered kinds follow.
const LAUNCH_ORDER: [AppKind; 4] = [AppKind::QUIZ, AppKind::MEMORY, AppKind::CHAT, AppKind::TIMER];

/// The window registry plus the launcher bar, wired to terminal input.
#[derive(Debug)]
pub struct Desktop {
    registry: WindowRegistry,
    launcher: Launcher,
}

impl Desktop {
    pub fn new(factory: AppFactory, cascade: SpawnCascade) -> Self {
        let mut entries: Vec<AppKind> = LAUNCH_ORDER
            .iter()
            .filter(|kind| factory.contains(kind))
            .cloned()
            .collect();
        let mut extra: Vec<AppKind> = factory
            .kinds()
            .filter(|kind| !entries.contains(kind))
            .cloned()
            .collect();
        extra.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        entries.extend(extra);
        Self {
            registry: WindowRegistry::new(factory, cascade),
            launcher: Launcher::new(entries),
        }
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut WindowRegistry {
        &mut self.registry
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    pub fn open(&mut self, kind: impl Into<AppKind>) -> WmResult<WindowId> {
        self.registry.open(kind)
    }

    /// Route one terminal event. Returns [`ControlFlow::Quit`] on Ctrl+Q.
    pub fn handle_event(&mut self, event: &Event) -> ControlFlow {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(*key),
            Event::Mouse(mouse) => {
                if let MouseEventKind::Down(_) = mouse.kind
                    && let Some(kind) = self.launcher.hit(mouse.column, mouse.row)
                {
                    self.launch(kind);
                    return ControlFlow::Continue;
                }
                if let Some(pointer) = PointerEvent::from_mouse(mouse) {
                    self.registry.pointer(pointer);
                }
                ControlFlow::Continue
            }
            _ => ControlFlow::Continue,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> ControlFlow {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('q') => return ControlFlow::Quit,
                KeyCode::Char('w') => {
                    if let Some(id) = self.registry.focused() {
                        self.registry.close(id);
                    }
                    return ControlFlow::Continue;
                }
                _ => {}
            }
        }
        if let Some(kind) = self.launcher.kind_for_key(&key) {
            self.launch(kind);
            return ControlFlow::Continue;
        }
        self.registry.key(key);
        ControlFlow::Continue
    }

    fn launch(&mut self, kind: AppKind) {
        if let Err(err) = self.registry.open(kind.clone()) {
            tracing::warn!(%kind, %err, "launch failed");
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.registry.tick(now);
    }

    pub fn render(&mut self, frame: &mut UiFrame<'_>) {
        self.launcher.split_area(frame.area());
        self.registry.render(frame);
        // Drawn last so windows dragged over the bottom row never hide it.
        let open = self.registry.len();
        self.launcher.render(frame, open);
    }
}

/// Pump events into the desktop until it asks to quit.
pub fn run_desktop<I, O>(
    desktop: &mut Desktop,
    input: I,
    output: &mut O,
    config: &DesktopConfig,
) -> io::Result<()>
where
    I: InputDriver,
    O: OutputDriver,
{
    let mut event_loop = EventLoop::new(input, config.poll_interval);
    event_loop.driver().set_mouse_capture(true)?;
    event_loop.run(|_, event| match event {
        Some(event) => Ok(desktop.handle_event(&event)),
        None => {
            desktop.tick(Instant::now());
            output.draw(|mut frame| desktop.render(&mut frame))?;
            Ok(ControlFlow::Continue)
        }
    })
}

pub fn open_store(location: &StoreLocation) -> io::Result<KvStore> {
    match location {
        StoreLocation::Memory => Ok(KvStore::in_memory()),
        StoreLocation::File(path) => KvStore::open(path).map_err(io::Error::other),
    }
}

/// Built-in apps, with the quiz pointed at `quiz_url` when one is given.
pub fn build_factory(store: KvStore, quiz_url: Option<&str>) -> AppFactory {
    let mut factory = AppFactory::with_builtins(store);
    if let Some(url) = quiz_url {
        let url = url.to_string();
        tracing::info!(%url, "quiz questions from remote server");
        factory.register(
            AppKind::QUIZ,
            AppEntry::new(quiz::template, move |ctx| {
                Box::new(QuizApp::with_source(ctx, Box::new(HttpQuestions::new(url.clone()))))
            }),
        );
    }
    factory
}

/// Build the desktop described by `config` and run it on the console.
pub fn run(config: DesktopConfig) -> io::Result<()> {
    let store = open_store(&config.store)?;
    let factory = build_factory(store, config.quiz_url.as_deref());
    let mut desktop = Desktop::new(factory, config.cascade);
    for kind in &config.open {
        if let Err(err) = desktop.open(kind.clone()) {
            tracing::warn!(%kind, %err, "startup window skipped");
        }
    }
    tracing::info!(windows = desktop.registry().len(), "desktop starting");

    let mut output = ConsoleOutputDriver::new()?;
    output.enter()?;
    let result = run_desktop(&mut desktop, ConsoleInputDriver::new(), &mut output, &config);
    output.exit()?;
    tracing::info!("desktop stopped");
    result
}
