use crossterm::event::{Event, KeyEventKind, MouseEventKind};

/// Filters raw terminal events down to what the desktop reacts to.
///
/// Key releases are dropped everywhere; Windows consoles also report
/// repeats, which are dropped there. Mouse motion without a pressed button
/// is dropped since only drags move windows.
#[derive(Debug, Default)]
pub struct InputNormalizer;

impl InputNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&mut self, evt: Event) -> Option<Event> {
        match evt {
            Event::Key(key) => match key.kind {
                KeyEventKind::Release => None,
                KeyEventKind::Repeat if cfg!(windows) => None,
                _ => Some(Event::Key(key)),
            },
            Event::Mouse(mouse) if mouse.kind == MouseEventKind::Moved => None,
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent};

    fn mouse(kind: MouseEventKind) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 1,
            row: 1,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn key_release_is_dropped() {
        let mut norm = InputNormalizer::new();
        let mut key = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert!(norm.normalize(Event::Key(key)).is_none());
        key.kind = KeyEventKind::Press;
        assert!(norm.normalize(Event::Key(key)).is_some());
    }

    #[test]
    fn hover_motion_is_dropped_but_drags_pass() {
        let mut norm = InputNormalizer::new();
        assert!(norm.normalize(mouse(MouseEventKind::Moved)).is_none());
        assert!(
            norm.normalize(mouse(MouseEventKind::Drag(MouseButton::Left)))
                .is_some()
        );
        assert!(norm.normalize(Event::Resize(10, 20)).is_some());
    }
}
