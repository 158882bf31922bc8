use anyhow::Result;
use clap::Parser;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers, MouseEventKind},
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use skyburst::config::Config;
use skyburst::launcher::Launcher;
use std::io::{stdout, BufWriter, Stdout, Write};
use std::time::{Duration, Instant};

mod cli;
mod display;

use cli::Cli;
use display::{Bell, Renderer, Starfield};

const FIXED_DT: f32 = 1.0 / 60.0;
const SPACE_BURST: u32 = 5;
const ENTER_BURST: u32 = 3;
/// Ticks between shells of a key-triggered burst.
const MANUAL_STAGGER: u64 = 8;

struct App {
    launcher: Launcher,
    renderer: Renderer,
    stars: Starfield,
}

impl App {
    fn new(cli: &Cli, config: Config, cols: u16, rows: u16) -> Self {
        let renderer = Renderer::new(cols as usize, rows as usize * 2, cli.bg_color.unwrap_or((0, 0, 0)));
        let sound = config.audio.sound_enabled;
        let volume = config.audio.volume;

        let mut launcher = match cli.seed {
            Some(seed) => Launcher::with_seed(config, renderer.stage(), seed),
            None => Launcher::new(config, renderer.stage()),
        };
        launcher.set_auto_launch(!cli.no_auto);
        if sound {
            launcher.add_listener(Box::new(Bell::new(stdout(), volume)));
        }
        let stars = Starfield::new(cli.seed.unwrap_or_else(|| fastrand::u64(..)));

        Self { launcher, renderer, stars }
    }

    /// Returns false once the user asks to quit.
    fn handle_event(&mut self, event: &Event) -> bool {
        match event {
            Event::Key(KeyEvent { code, modifiers, .. }) => match code {
                KeyCode::Char('q') | KeyCode::Esc => return false,
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return false,
                KeyCode::Char(' ') => {
                    self.launcher.launch_burst(SPACE_BURST, MANUAL_STAGGER);
                    self.stars.boost();
                }
                KeyCode::Enter => {
                    self.launcher.launch_burst(ENTER_BURST, MANUAL_STAGGER);
                    self.stars.boost();
                }
                KeyCode::Char('m') => {
                    if let Some(name) = self.launcher.cycle_mode() {
                        log::info!("switched to {} mode", name);
                    }
                }
                KeyCode::Char('a') => {
                    let enabled = !self.launcher.auto_launch();
                    self.launcher.set_auto_launch(enabled);
                    log::info!("auto launch {}", if enabled { "on" } else { "off" });
                }
                _ => {}
            },
            Event::Mouse(mouse) => {
                if let MouseEventKind::Down(_) = mouse.kind {
                    let at = self.renderer.cell_to_world(mouse.column, mouse.row);
                    self.launcher.explode_immediately_at(at);
                    self.stars.boost();
                }
            }
            Event::Resize(cols, rows) => {
                self.renderer.resize(*cols as usize, *rows as usize * 2);
                self.launcher.set_stage(self.renderer.stage());
            }
            _ => {}
        }
        true
    }

    fn update(&mut self) {
        self.launcher.tick();
        self.stars.update(FIXED_DT);
    }
}

fn run_show(show: &mut App, out: &mut BufWriter<Stdout>) -> Result<()> {
    let mut last_frame = Instant::now();
    let mut accumulator = 0.0f32;

    loop {
        if event::poll(Duration::from_millis(1))? {
            let event = event::read()?;
            if !show.handle_event(&event) {
                break;
            }
            if let Event::Resize(..) = event {
                execute!(out, Clear(ClearType::All))?;
            }
        }

        let now = Instant::now();
        accumulator += now.duration_since(last_frame).as_secs_f32();
        last_frame = now;
        if accumulator > FIXED_DT * 3.0 {
            accumulator = FIXED_DT * 3.0;
        }

        while accumulator >= FIXED_DT {
            show.update();
            accumulator -= FIXED_DT;
        }

        show.renderer.render(&show.launcher, &show.stars, out)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.log_file.as_deref())?;
    let config = cli.resolve_config()?;

    if cli.dump_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    let mut out = BufWriter::with_capacity(1024 * 64, stdout());
    terminal::enable_raw_mode()?;
    execute!(out, EnterAlternateScreen, Hide, Clear(ClearType::All), EnableMouseCapture)?;

    let (cols, rows) = terminal::size()?;
    let mut show = App::new(&cli, config, cols, rows);
    log::info!("show started on a {}x{} terminal", cols, rows);
    let result = run_show(&mut show, &mut out);

    execute!(out, Show, LeaveAlternateScreen, DisableMouseCapture)?;
    out.flush()?;
    terminal::disable_raw_mode()?;
    log::info!("show ended after {} ticks", show.launcher.ticks());

    result
}
