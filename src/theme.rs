use ratatui::style::Color;

// Desktop palette. Accent colors are given as RGB and degraded to the
// xterm-256 cube when the terminal does not advertise truecolor.

pub const ACCENT_RGB: (u8, u8, u8) = (200, 100, 0);
pub const ALERT_RGB: (u8, u8, u8) = (230, 60, 60);

pub fn rgb(value: (u8, u8, u8)) -> Color {
    let truecolor = std::env::var("COLORTERM")
        .map(|v| {
            let v = v.to_lowercase();
            v.contains("truecolor") || v.contains("24bit")
        })
        .unwrap_or(false);
    if truecolor {
        Color::Rgb(value.0, value.1, value.2)
    } else {
        Color::Indexed(cube_index(value))
    }
}

fn cube_index((r, g, b): (u8, u8, u8)) -> u8 {
    let level = |v: u8| ((u16::from(v) * 5 + 127) / 255) as u8;
    16 + 36 * level(r) + 6 * level(g) + level(b)
}

pub fn accent() -> Color {
    rgb(ACCENT_RGB)
}

pub fn alert_fg() -> Color {
    rgb(ALERT_RGB)
}

pub fn button_fg() -> Color {
    Color::Cyan
}

// Launcher bar
pub fn launcher_bg() -> Color {
    Color::DarkGray
}
pub fn launcher_fg() -> Color {
    Color::White
}
pub fn launcher_key_fg() -> Color {
    accent()
}

// Decorator
pub fn decorator_header_bg() -> Color {
    Color::Blue
}
pub fn decorator_header_inactive_bg() -> Color {
    Color::DarkGray
}
pub fn decorator_header_fg() -> Color {
    Color::White
}
pub fn decorator_border() -> Color {
    Color::DarkGray
}
pub fn close_fg() -> Color {
    Color::LightRed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_index_covers_corners() {
        assert_eq!(cube_index((0, 0, 0)), 16);
        assert_eq!(cube_index((255, 255, 255)), 231);
        assert_eq!(cube_index((255, 0, 0)), 196);
    }

    #[test]
    fn accent_is_rgb_or_indexed() {
        assert!(matches!(accent(), Color::Rgb(..) | Color::Indexed(_)));
    }
}
