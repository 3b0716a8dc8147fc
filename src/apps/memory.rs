//! Card-matching memory game.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;

use super::{AppContext, AppEvent, ButtonRow, HostedApp};
use crate::constants::MEMORY_UNFLIP_DELAY;
use crate::ui::{UiFrame, safe_set_string};
use crate::view::{Marker, SectionLayout, ViewNode, ViewTemplate};
use crate::window::{Point, Size};

const CARD_WIDTH: u16 = 4;

pub fn template() -> ViewTemplate {
    ViewTemplate::new(Size::new(32, 12))
        .child(ViewNode::header([
            ViewNode::title("Memory"),
            ViewNode::close_button("x"),
        ]))
        .child(ViewNode::section("board", Constraint::Min(5)))
        .child(ViewNode::section("status", Constraint::Length(2)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl GridSize {
    pub const ALL: [GridSize; 3] = [GridSize::Small, GridSize::Medium, GridSize::Large];

    /// Rows and columns of the board.
    pub fn dimensions(self) -> (usize, usize) {
        match self {
            GridSize::Small => (2, 2),
            GridSize::Medium => (2, 4),
            GridSize::Large => (4, 4),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GridSize::Small => "2x2",
            GridSize::Medium => "2x4",
            GridSize::Large => "4x4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    pub value: u8,
    pub face_up: bool,
    pub matched: bool,
}

#[derive(Debug, Clone)]
pub struct Board {
    rows: usize,
    cols: usize,
    cards: Vec<Card>,
    first: Option<usize>,
    second: Option<usize>,
    locked_until: Option<Instant>,
    attempts: u32,
    cursor: usize,
}

impl Board {
    /// Shuffled pairs for `size`.
    pub fn shuffled(size: GridSize, rng: &mut SmallRng) -> Self {
        let (rows, cols) = size.dimensions();
        let pairs = (rows * cols / 2) as u8;
        let mut values: Vec<u8> = (0..pairs).flat_map(|value| [value, value]).collect();
        values.shuffle(rng);
        Self::from_values(rows, cols, values)
    }

    pub fn from_values(rows: usize, cols: usize, values: Vec<u8>) -> Self {
        let cards = values
            .into_iter()
            .map(|value| Card {
                value,
                face_up: false,
                matched: false,
            })
            .collect();
        Self {
            rows,
            cols,
            cards,
            first: None,
            second: None,
            locked_until: None,
            attempts: 0,
            cursor: 0,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_locked(&self) -> bool {
        self.locked_until.is_some()
    }

    pub fn is_won(&self) -> bool {
        self.cards.iter().all(|card| card.matched)
    }

    /// Turn card `index` face up. Ignored while the board is locked, for the
    /// already flipped first card and for matched cards.
    pub fn flip(&mut self, index: usize, now: Instant) -> bool {
        if self.is_locked() || self.first == Some(index) {
            return false;
        }
        let Some(card) = self.cards.get_mut(index) else {
            return false;
        };
        if card.matched {
            return false;
        }
        card.face_up = true;
        let Some(first) = self.first else {
            self.first = Some(index);
            return true;
        };
        self.second = Some(index);
        if self.cards[first].value == self.cards[index].value {
            for idx in [first, index] {
                self.cards[idx].matched = true;
            }
            self.first = None;
            self.second = None;
            self.attempts += 1;
            self.cursor = self.cards.iter().position(|c| !c.matched).unwrap_or(0);
        } else {
            self.locked_until = Some(now + MEMORY_UNFLIP_DELAY);
        }
        true
    }

    /// Flip a mismatched pair back once the lock delay passed.
    pub fn settle(&mut self, now: Instant) {
        let Some(until) = self.locked_until else {
            return;
        };
        if now < until {
            return;
        }
        for idx in [self.first.take(), self.second.take()].into_iter().flatten() {
            if let Some(card) = self.cards.get_mut(idx) {
                card.face_up = false;
            }
        }
        self.locked_until = None;
        self.attempts += 1;
    }

    /// Walk from the cursor in direction (dx, dy) to the nearest unmatched
    /// card. The cursor stays put when none lies that way.
    pub fn move_cursor(&mut self, dx: isize, dy: isize) {
        let mut row = (self.cursor / self.cols) as isize;
        let mut col = (self.cursor % self.cols) as isize;
        loop {
            row += dy;
            col += dx;
            if row < 0 || col < 0 || row >= self.rows as isize || col >= self.cols as isize {
                return;
            }
            let index = row as usize * self.cols + col as usize;
            if !self.cards[index].matched {
                self.cursor = index;
                return;
            }
        }
    }

    fn cancel_lock(&mut self) {
        self.locked_until = None;
    }
}

#[derive(Debug)]
enum Phase {
    Selecting(GridSize),
    Playing(Board),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Choose(GridSize),
    Start,
    Restart,
}

#[derive(Debug)]
pub struct MemoryApp {
    ctx: AppContext,
    now: Instant,
    shown: bool,
    rng: SmallRng,
    phase: Phase,
    buttons: ButtonRow<Action>,
    card_hits: Vec<(Rect, usize)>,
}

impl MemoryApp {
    pub fn new(ctx: AppContext) -> Self {
        Self::with_rng(ctx, SmallRng::from_rng(&mut rand::rng()))
    }

    pub fn with_rng(ctx: AppContext, rng: SmallRng) -> Self {
        Self {
            ctx,
            now: Instant::now(),
            shown: false,
            rng,
            phase: Phase::Selecting(GridSize::default()),
            buttons: ButtonRow::default(),
            card_hits: Vec::new(),
        }
    }

    pub fn board(&self) -> Option<&Board> {
        match &self.phase {
            Phase::Playing(board) => Some(board),
            Phase::Selecting(_) => None,
        }
    }

    pub fn choose(&mut self, size: GridSize) {
        if let Phase::Selecting(choice) = &mut self.phase {
            *choice = size;
        }
    }

    pub fn start(&mut self) {
        let size = match self.phase {
            Phase::Selecting(size) => size,
            Phase::Playing(_) => return,
        };
        let board = Board::shuffled(size, &mut self.rng);
        tracing::debug!(window = %self.ctx.frame, grid = size.label(), "memory game started");
        self.phase = Phase::Playing(board);
    }

    /// Back to grid selection.
    pub fn restart(&mut self) {
        let size = match &self.phase {
            Phase::Playing(board) => match (board.rows, board.cols) {
                (2, 2) => GridSize::Small,
                (2, 4) => GridSize::Medium,
                _ => GridSize::Large,
            },
            Phase::Selecting(size) => *size,
        };
        self.phase = Phase::Selecting(size);
        self.card_hits.clear();
    }

    pub fn flip(&mut self, index: usize) -> bool {
        let now = self.now;
        match &mut self.phase {
            Phase::Playing(board) => board.flip(index, now),
            Phase::Selecting(_) => false,
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Choose(size) => self.choose(size),
            Action::Start => self.start(),
            Action::Restart => self.restart(),
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match &mut self.phase {
            Phase::Selecting(choice) => {
                let current = GridSize::ALL.iter().position(|s| s == choice).unwrap_or(1);
                match key.code {
                    KeyCode::Left => *choice = GridSize::ALL[current.saturating_sub(1)],
                    KeyCode::Right => *choice = GridSize::ALL[(current + 1).min(2)],
                    KeyCode::Char('1') => *choice = GridSize::Small,
                    KeyCode::Char('2') => *choice = GridSize::Medium,
                    KeyCode::Char('3') => *choice = GridSize::Large,
                    KeyCode::Enter => self.start(),
                    _ => return false,
                }
                true
            }
            Phase::Playing(board) => {
                match key.code {
                    KeyCode::Left => board.move_cursor(-1, 0),
                    KeyCode::Right => board.move_cursor(1, 0),
                    KeyCode::Up => board.move_cursor(0, -1),
                    KeyCode::Down => board.move_cursor(0, 1),
                    KeyCode::Enter => {
                        let cursor = board.cursor;
                        board.flip(cursor, self.now);
                    }
                    KeyCode::Char('r') => self.restart(),
                    _ => return false,
                }
                true
            }
        }
    }

    fn card_at(&self, at: Point) -> Option<usize> {
        let (Ok(x), Ok(y)) = (u16::try_from(at.x), u16::try_from(at.y)) else {
            return None;
        };
        self.card_hits
            .iter()
            .find(|(rect, _)| rect.contains((x, y).into()))
            .map(|(_, idx)| *idx)
    }

    fn render_selection(&mut self, frame: &mut UiFrame<'_>, board: Rect, choice: GridSize) {
        frame.render_widget(
            Paragraph::new(vec![
                Line::from("Choose a grid size"),
                Line::from(format!("Selected: {}", choice.label())),
            ]),
            board,
        );
        let row = Rect::new(board.x, board.y.saturating_add(3), board.width, 1);
        if row.y < board.bottom() {
            self.buttons.render(
                frame,
                row,
                &[
                    ("2x2", Action::Choose(GridSize::Small)),
                    ("2x4", Action::Choose(GridSize::Medium)),
                    ("4x4", Action::Choose(GridSize::Large)),
                    ("Start", Action::Start),
                ],
            );
        }
    }

    fn render_board(&mut self, frame: &mut UiFrame<'_>, area: Rect, focused: bool) {
        self.card_hits.clear();
        let Phase::Playing(board) = &self.phase else {
            return;
        };
        for (idx, card) in board.cards.iter().enumerate() {
            let row = (idx / board.cols) as u16;
            let col = (idx % board.cols) as u16;
            let x = area.x.saturating_add(col * CARD_WIDTH);
            let y = area.y.saturating_add(row);
            if y >= area.bottom() {
                break;
            }
            let text = if card.matched {
                "   ".to_string()
            } else if card.face_up {
                format!("[{}]", char::from(b'A' + card.value))
            } else {
                "[?]".to_string()
            };
            let mut style = Style::default();
            if focused && idx == board.cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            safe_set_string(frame.buffer_mut(), area, x, y, &text, style);
            self.card_hits.push((Rect::new(x, y, 3, 1), idx));
        }
    }

    fn render_status(&mut self, frame: &mut UiFrame<'_>, area: Rect) {
        let Phase::Playing(board) = &self.phase else {
            return;
        };
        let line = if board.is_won() {
            format!("Congratulations, you made it in {} attempts", board.attempts)
        } else {
            format!("Attempts: {}", board.attempts)
        };
        frame.render_widget(Paragraph::new(line), Rect::new(area.x, area.y, area.width, 1));
        let row = Rect::new(area.x, area.y.saturating_add(1), area.width, 1);
        if row.y < area.bottom() {
            self.buttons.render(frame, row, &[("Restart", Action::Restart)]);
        }
    }
}

impl HostedApp for MemoryApp {
    fn show(&mut self) {
        if !self.shown {
            self.shown = true;
            self.ctx.focus_self();
        }
    }

    fn dispose(&mut self) {
        if let Phase::Playing(board) = &mut self.phase {
            board.cancel_lock();
        }
    }

    fn handle_event(&mut self, event: &AppEvent) -> bool {
        match event {
            AppEvent::Activate {
                marker: Some(Marker::Close),
                ..
            } => {
                self.ctx.close_self();
                true
            }
            AppEvent::Activate { .. } => false,
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Click(at) => {
                if let Some(action) = self.buttons.hit(*at) {
                    self.apply(action);
                    return true;
                }
                match self.card_at(*at) {
                    Some(index) => {
                        if let Phase::Playing(board) = &mut self.phase {
                            board.cursor = index;
                        }
                        self.flip(index)
                    }
                    None => false,
                }
            }
        }
    }

    fn tick(&mut self, now: Instant) {
        self.now = now;
        if let Phase::Playing(board) = &mut self.phase {
            board.settle(now);
        }
    }

    fn render(&mut self, frame: &mut UiFrame<'_>, sections: &SectionLayout, focused: bool) {
        let board = sections.get("board");
        let status = sections.get("status");
        match self.phase {
            Phase::Selecting(choice) => self.render_selection(frame, board, choice),
            Phase::Playing(_) => {
                self.render_board(frame, board, focused);
                self.render_status(frame, status);
            }
        }
    }
}
