//! One-row launcher bar along the bottom edge.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};

use crate::apps::AppKind;
use crate::ui::{UiFrame, safe_set_string};

#[derive(Debug, Clone)]
struct LauncherHit {
    kind: AppKind,
    rect: Rect,
}

#[derive(Debug)]
pub struct Launcher {
    entries: Vec<AppKind>,
    area: Rect,
    hits: Vec<LauncherHit>,
}

impl Launcher {
    /// Entries are bound to F1, F2, ... in order.
    pub fn new(entries: impl IntoIterator<Item = AppKind>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            area: Rect::default(),
            hits: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[AppKind] {
        &self.entries
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    /// Reserve the bottom row of `area`; returns the remaining desktop area.
    pub fn split_area(&mut self, area: Rect) -> Rect {
        let bar_h = 1u16.min(area.height);
        self.area = Rect {
            x: area.x,
            y: area.y.saturating_add(area.height).saturating_sub(bar_h),
            width: area.width,
            height: bar_h,
        };
        Rect {
            height: area.height.saturating_sub(bar_h),
            ..area
        }
    }

    pub fn render(&mut self, frame: &mut UiFrame<'_>, open_windows: usize) {
        self.hits.clear();
        let area = self.area;
        if area.width == 0 || area.height == 0 {
            return;
        }
        let base = Style::default()
            .bg(crate::theme::launcher_bg())
            .fg(crate::theme::launcher_fg());
        let buffer = frame.buffer_mut();
        let bounds = area.intersection(buffer.area);
        for x in bounds.x..bounds.right() {
            if let Some(cell) = buffer.cell_mut((x, bounds.y)) {
                cell.set_symbol(" ");
                cell.set_style(base);
            }
        }
        let mut x = area.x.saturating_add(1);
        for (idx, kind) in self.entries.iter().enumerate() {
            let key = format!("F{}", idx + 1);
            let label = format!(" {} ", title_case(kind.as_str()));
            let width = (key.len() + label.len()) as u16;
            if x.saturating_add(width) > area.right() {
                break;
            }
            let key_style = base
                .fg(crate::theme::launcher_key_fg())
                .add_modifier(Modifier::BOLD);
            safe_set_string(buffer, area, x, area.y, &key, key_style);
            safe_set_string(buffer, area, x + key.len() as u16, area.y, &label, base);
            self.hits.push(LauncherHit {
                kind: kind.clone(),
                rect: Rect::new(x, area.y, width, 1),
            });
            x = x.saturating_add(width + 1);
        }
        let status = format!("windows: {open_windows}  ^Q quit ");
        let status_x = area.right().saturating_sub(status.len() as u16);
        if status_x >= x {
            safe_set_string(buffer, area, status_x, area.y, &status, base);
        }
    }

    /// Entry under the given screen cell.
    pub fn hit(&self, column: u16, row: u16) -> Option<AppKind> {
        self.hits
            .iter()
            .find(|hit| hit.rect.contains((column, row).into()))
            .map(|hit| hit.kind.clone())
    }

    /// Entry bound to a function key.
    pub fn kind_for_key(&self, key: &KeyEvent) -> Option<AppKind> {
        match key.code {
            KeyCode::F(n) if n >= 1 => self.entries.get(usize::from(n) - 1).cloned(),
            _ => None,
        }
    }
}

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
