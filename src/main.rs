use std::io::{self, Stdout, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, DisableLineWrap, EnableLineWrap, EndSynchronizedUpdate,
        EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use rand::{rngs::StdRng, SeedableRng};

mod config;
mod field;
mod mode;
mod sim;

use config::Config;
use field::{Rgb, Surface};
use mode::{Mode, ModeController};
use sim::{Bounds, Tuning};

// One terminal cell covers a 2x4 pixel region: two stacked 2x2 lava blocks,
// composed with half-block glyphs. Radii and the width/16 population rule
// keep the proportions of the original desktop panel.
const CELL_W: i32 = 2;
const CELL_H: i32 = 4;

const TICK: Duration = Duration::from_millis(33);

const BG_GLOBAL: Rgb = Rgb::new(6, 7, 11);
const PANEL_BG: Rgb = Rgb::new(13, 10, 17);
const PLACEMENT_BG: Rgb = Rgb::new(168, 22, 48);
const OVERLAY_FG: Rgb = Rgb::new(240, 236, 232);

const PALETTE: [Rgb; 5] = [
    Rgb::new(245, 110, 30),  // classic orange
    Rgb::new(255, 115, 160), // pink
    Rgb::new(90, 200, 170),  // teal
    Rgb::new(170, 90, 230),  // violet
    Rgb::new(120, 210, 255), // ice blue
];

fn term_color(c: Rgb) -> Color {
    Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

#[derive(Clone, Copy, PartialEq)]
struct ScreenCell {
    ch: char,
    fg: Rgb,
    bg: Rgb,
}

impl ScreenCell {
    fn blank(bg: Rgb) -> Self {
        Self {
            ch: ' ',
            fg: OVERLAY_FG,
            bg,
        }
    }
}

/// Double-buffered cell grid; only cells that changed since the previous
/// frame are re-emitted.
struct Screen {
    w: u16,
    h: u16,
    prev: Vec<ScreenCell>,
    next: Vec<ScreenCell>,
    force: bool,
}

impl Screen {
    fn new(w: u16, h: u16) -> Self {
        let n = w as usize * h as usize;
        Self {
            w,
            h,
            prev: vec![ScreenCell::blank(BG_GLOBAL); n],
            next: vec![ScreenCell::blank(BG_GLOBAL); n],
            force: true,
        }
    }

    fn resize(&mut self, w: u16, h: u16) {
        if self.w != w || self.h != h {
            *self = Self::new(w, h);
        }
    }

    fn clear_next(&mut self, bg: Rgb) {
        for c in &mut self.next {
            *c = ScreenCell::blank(bg);
        }
    }

    fn set(&mut self, x: i32, y: i32, cell: ScreenCell) {
        if x < 0 || y < 0 || x >= self.w as i32 || y >= self.h as i32 {
            return;
        }
        self.next[y as usize * self.w as usize + x as usize] = cell;
    }

    fn flush(&mut self, out: &mut Stdout) -> io::Result<()> {
        let mut last_fg: Option<Rgb> = None;
        let mut last_bg: Option<Rgb> = None;
        for y in 0..self.h {
            for x in 0..self.w {
                let i = y as usize * self.w as usize + x as usize;
                let cell = self.next[i];
                if !self.force && cell == self.prev[i] {
                    continue;
                }
                queue!(out, cursor::MoveTo(x, y))?;
                if last_bg != Some(cell.bg) {
                    queue!(out, SetBackgroundColor(term_color(cell.bg)))?;
                    last_bg = Some(cell.bg);
                }
                if last_fg != Some(cell.fg) {
                    queue!(out, SetForegroundColor(term_color(cell.fg)))?;
                    last_fg = Some(cell.fg);
                }
                queue!(out, Print(cell.ch))?;
            }
        }
        self.force = false;
        std::mem::swap(&mut self.prev, &mut self.next);
        Ok(())
    }
}

/// One frame's paint target for the panel interior. Stores 2x2 pixel blocks
/// (two per cell row) plus the placement overlay lines; the host composes
/// both into half-block cells afterwards.
struct PanelCanvas {
    cols: i32,
    block_rows: i32,
    blocks: Vec<Option<Rgb>>,
    overlay: Vec<(usize, String)>,
}

impl PanelCanvas {
    fn new() -> Self {
        Self {
            cols: 0,
            block_rows: 0,
            blocks: Vec::new(),
            overlay: Vec::new(),
        }
    }

    fn reset(&mut self, cols: i32, rows: i32) {
        self.cols = cols.max(0);
        self.block_rows = rows.max(0) * 2;
        self.blocks.clear();
        self.blocks
            .resize(self.cols as usize * self.block_rows as usize, None);
        self.overlay.clear();
    }

    fn block(&self, bx: i32, by: i32) -> Option<Rgb> {
        self.blocks[by as usize * self.cols as usize + bx as usize]
    }
}

impl Surface for PanelCanvas {
    fn fill_block(&mut self, x: i32, y: i32, _size: i32, color: Rgb) {
        if x < 0 || y < 0 {
            return;
        }
        let bx = x / CELL_W;
        let by = y / (CELL_H / 2);
        if bx < self.cols && by < self.block_rows {
            self.blocks[by as usize * self.cols as usize + bx as usize] = Some(color);
        }
    }

    fn overlay_line(&mut self, row: usize, text: &str) {
        self.overlay.push((row, text.to_string()));
    }
}

/// The lava panel rectangle in pixel coordinates, kept snapped to the cell
/// grid so it always maps cleanly onto terminal cells.
#[derive(Clone, Copy)]
struct Panel {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

const MIN_PANEL_W: i32 = 32;
const MIN_PANEL_H: i32 = 16;

fn snap(v: i32, step: i32) -> i32 {
    v - v.rem_euclid(step)
}

impl Panel {
    /// Default setup panel: 300x48 px, centered, sitting just above the
    /// bottom edge like the taskbar strip it imitates.
    fn default_for(term_w: u16, term_h: u16) -> Self {
        let max_w = term_w as i32 * CELL_W;
        let max_h = term_h as i32 * CELL_H;
        let w = snap(max_w.min(300).max(MIN_PANEL_W), CELL_W);
        let h = snap(max_h.min(48).max(MIN_PANEL_H), CELL_H);
        let mut panel = Self {
            x: snap((max_w - w) / 2, CELL_W),
            y: snap((max_h - h - 2 * CELL_H).max(0), CELL_H),
            w,
            h,
        };
        panel.clamp_to(term_w, term_h);
        panel
    }

    fn from_config(cfg: &Config, term_w: u16, term_h: u16) -> Self {
        let mut panel = Self {
            x: snap(cfg.x.max(0), CELL_W),
            y: snap(cfg.y.max(0), CELL_H),
            w: snap(cfg.width.max(MIN_PANEL_W), CELL_W),
            h: snap(cfg.height.max(MIN_PANEL_H), CELL_H),
        };
        panel.clamp_to(term_w, term_h);
        panel
    }

    fn to_config(self, color: Rgb) -> Config {
        Config {
            x: self.x,
            y: self.y,
            width: self.w,
            height: self.h,
            lava_color_argb: color.to_argb(),
        }
    }

    fn clamp_to(&mut self, term_w: u16, term_h: u16) {
        let max_w = (term_w as i32 * CELL_W).max(MIN_PANEL_W);
        let max_h = (term_h as i32 * CELL_H).max(MIN_PANEL_H);
        self.w = self.w.clamp(MIN_PANEL_W, snap(max_w, CELL_W).max(MIN_PANEL_W));
        self.h = self.h.clamp(MIN_PANEL_H, snap(max_h, CELL_H).max(MIN_PANEL_H));
        self.x = self.x.clamp(0, (max_w - self.w).max(0));
        self.y = self.y.clamp(0, (max_h - self.h).max(0));
    }

    fn bounds(self) -> Bounds {
        Bounds::of_size(self.w as f32, self.h as f32)
    }

    fn col(self) -> i32 {
        self.x / CELL_W
    }
    fn row(self) -> i32 {
        self.y / CELL_H
    }
    fn cols(self) -> i32 {
        self.w / CELL_W
    }
    fn rows(self) -> i32 {
        self.h / CELL_H
    }
}

fn draw(
    out: &mut Stdout,
    screen: &mut Screen,
    canvas: &mut PanelCanvas,
    controller: &mut ModeController,
    panel: Panel,
) -> io::Result<()> {
    screen.clear_next(BG_GLOBAL);

    let panel_bg = match controller.mode() {
        Mode::Placement => PLACEMENT_BG,
        Mode::Animation => PANEL_BG,
    };

    canvas.reset(panel.cols(), panel.rows());
    controller.render(canvas, panel.bounds());

    let (col0, row0) = (panel.col(), panel.row());
    for cy in 0..panel.rows() {
        for cx in 0..panel.cols() {
            let top = canvas.block(cx, 2 * cy);
            let bottom = canvas.block(cx, 2 * cy + 1);
            let cell = match (top, bottom) {
                (None, None) => ScreenCell::blank(panel_bg),
                (Some(a), Some(b)) => ScreenCell {
                    ch: '▀',
                    fg: a,
                    bg: b,
                },
                (Some(a), None) => ScreenCell {
                    ch: '▀',
                    fg: a,
                    bg: panel_bg,
                },
                (None, Some(b)) => ScreenCell {
                    ch: '▄',
                    fg: b,
                    bg: panel_bg,
                },
            };
            screen.set(col0 + cx, row0 + cy, cell);
        }
    }

    for (row, text) in &canvas.overlay {
        for (i, ch) in text.chars().enumerate() {
            let x = col0 + 2 + i as i32;
            if x >= col0 + panel.cols() - 1 {
                break;
            }
            screen.set(
                x,
                row0 + 1 + *row as i32,
                ScreenCell {
                    ch,
                    fg: OVERLAY_FG,
                    bg: panel_bg,
                },
            );
        }
    }

    queue!(out, BeginSynchronizedUpdate)?;
    screen.flush(out)?;
    queue!(out, ResetColor, EndSynchronizedUpdate)?;
    out.flush()
}

fn run(out: &mut Stdout) -> io::Result<()> {
    let config_path = Path::new(config::CONFIG_FILE);
    let (mut term_w, mut term_h) = terminal::size()?;
    let mut screen = Screen::new(term_w, term_h);
    let mut canvas = PanelCanvas::new();

    let mut color = Rgb::from_argb(config::DEFAULT_COLOR_ARGB);
    let mut controller = ModeController::new(Tuning::default(), StdRng::from_entropy(), color);

    // Bootstrap: a valid saved panel goes straight to Animation, anything
    // else starts in Placement.
    let mut panel = match config::load(config_path) {
        Some(cfg) if cfg.is_valid() => {
            let panel = Panel::from_config(&cfg, term_w, term_h);
            color = cfg.color();
            controller.commit(panel.bounds(), color);
            panel
        }
        _ => Panel::default_for(term_w, term_h),
    };
    let mut palette_idx = PALETTE.iter().position(|&c| c == color).unwrap_or(0);

    let mut needs_redraw = true;
    let mut quit = false;
    let mut next_tick = Instant::now();

    while !quit {
        let timeout = next_tick.saturating_duration_since(Instant::now());
        if event::poll(timeout)? {
            while event::poll(Duration::from_millis(0))? {
                match event::read()? {
                    Event::Key(k) if k.kind == KeyEventKind::Press => match k.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => quit = true,
                        code => match controller.mode() {
                            Mode::Placement => {
                                let shift = k.modifiers.contains(KeyModifiers::SHIFT);
                                match code {
                                    KeyCode::Left if shift => panel.w -= CELL_W,
                                    KeyCode::Right if shift => panel.w += CELL_W,
                                    KeyCode::Up if shift => panel.h -= CELL_H,
                                    KeyCode::Down if shift => panel.h += CELL_H,
                                    KeyCode::Left => panel.x -= CELL_W,
                                    KeyCode::Right => panel.x += CELL_W,
                                    KeyCode::Up => panel.y -= CELL_H,
                                    KeyCode::Down => panel.y += CELL_H,
                                    KeyCode::Enter => {
                                        controller.commit(panel.bounds(), color);
                                        config::save(config_path, &panel.to_config(color))?;
                                    }
                                    _ => {}
                                }
                                panel.clamp_to(term_w, term_h);
                                needs_redraw = true;
                            }
                            Mode::Animation => match code {
                                KeyCode::Char('r') | KeyCode::Char('R') => {
                                    controller.reposition();
                                    needs_redraw = true;
                                }
                                KeyCode::Char('c') | KeyCode::Char('C') => {
                                    palette_idx = (palette_idx + 1) % PALETTE.len();
                                    color = PALETTE[palette_idx];
                                    controller.reload_color(color);
                                    config::save(config_path, &panel.to_config(color))?;
                                    needs_redraw = true;
                                }
                                _ => {}
                            },
                        },
                    },
                    Event::Resize(w, h) => {
                        term_w = w;
                        term_h = h;
                        screen.resize(w, h);
                        panel.clamp_to(w, h);
                        needs_redraw = true;
                    }
                    _ => {}
                }
            }
        }

        // At most one update pass per tick; the repaint for a tick runs only
        // after its update has fully completed.
        if Instant::now() >= next_tick {
            controller.on_tick(panel.bounds());
            if controller.frame_dirty() || needs_redraw {
                draw(out, &mut screen, &mut canvas, &mut controller, panel)?;
                needs_redraw = false;
            }
            next_tick = Instant::now() + TICK;
        }
    }
    Ok(())
}

fn main() -> io::Result<()> {
    let mut out = io::stdout();
    execute!(out, EnterAlternateScreen, DisableLineWrap, cursor::Hide)?;
    terminal::enable_raw_mode()?;

    let res = run(&mut out);

    terminal::disable_raw_mode()?;
    execute!(
        out,
        ResetColor,
        cursor::Show,
        EnableLineWrap,
        LeaveAlternateScreen
    )?;
    res
}
