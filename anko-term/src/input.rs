//! Keyboard, mouse and paste encoding.
//!
//! Translates UI-level input events into the byte sequences shells
//! expect, honoring application cursor mode, bracketed paste and the
//! active mouse reporting protocol. The modifier parameter follows the
//! xterm rule: 1 + shift + 2*alt + 4*ctrl.

/// A named key from the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F(u8),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    /// xterm modifier parameter; 1 means unmodified.
    pub fn code(&self) -> u8 {
        1 + u8::from(self.shift) + 2 * u8::from(self.alt) + 4 * u8::from(self.ctrl)
    }
}

/// Encode one key press. `app_cursor` reflects DECCKM.
pub fn encode_key(key: Key, mods: Modifiers, app_cursor: bool) -> Vec<u8> {
    match key {
        Key::Char(c) => encode_char(c, mods),
        Key::Enter => vec![b'\r'],
        Key::Tab => {
            if mods.shift {
                b"\x1b[Z".to_vec()
            } else {
                vec![b'\t']
            }
        }
        Key::Backspace => {
            if mods.ctrl {
                vec![0x08]
            } else if mods.alt {
                vec![0x1B, 0x7F]
            } else {
                vec![0x7F]
            }
        }
        Key::Escape => vec![0x1B],
        Key::Up => encode_cursor_key(b'A', mods, app_cursor),
        Key::Down => encode_cursor_key(b'B', mods, app_cursor),
        Key::Right => encode_cursor_key(b'C', mods, app_cursor),
        Key::Left => encode_cursor_key(b'D', mods, app_cursor),
        Key::Home => encode_cursor_key(b'H', mods, app_cursor),
        Key::End => encode_cursor_key(b'F', mods, app_cursor),
        Key::Insert => encode_tilde_key(2, mods),
        Key::Delete => encode_tilde_key(3, mods),
        Key::PageUp => encode_tilde_key(5, mods),
        Key::PageDown => encode_tilde_key(6, mods),
        Key::F(n) => encode_function_key(n, mods),
    }
}

fn encode_char(c: char, mods: Modifiers) -> Vec<u8> {
    if mods.ctrl {
        if c.is_ascii_alphabetic() {
            let ctrl = (c.to_ascii_uppercase() as u8) - b'A' + 1;
            if mods.alt {
                return vec![0x1B, ctrl];
            }
            return vec![ctrl];
        }
        match c {
            '@' => return vec![0x00],
            '[' => return vec![0x1B],
            '\\' => return vec![0x1C],
            ']' => return vec![0x1D],
            '^' => return vec![0x1E],
            '_' => return vec![0x1F],
            '?' => return vec![0x7F],
            _ => {}
        }
    }

    let mut buf = [0u8; 4];
    let encoded = c.encode_utf8(&mut buf).as_bytes();
    if mods.alt {
        let mut bytes = Vec::with_capacity(encoded.len() + 1);
        bytes.push(0x1B);
        bytes.extend_from_slice(encoded);
        bytes
    } else {
        encoded.to_vec()
    }
}

/// Arrows and Home/End: `ESC [ X`, `ESC O X` in application mode, or
/// `ESC [ 1 ; M X` when modified.
fn encode_cursor_key(final_byte: u8, mods: Modifiers, app_cursor: bool) -> Vec<u8> {
    let code = mods.code();
    if code > 1 {
        vec![0x1B, b'[', b'1', b';', b'0' + code, final_byte]
    } else if app_cursor {
        vec![0x1B, b'O', final_byte]
    } else {
        vec![0x1B, b'[', final_byte]
    }
}

/// Insert/Delete/PgUp/PgDn: `ESC [ n ~`, modified `ESC [ n ; M ~`.
fn encode_tilde_key(num: u8, mods: Modifiers) -> Vec<u8> {
    let code = mods.code();
    if code > 1 {
        format!("\x1b[{num};{code}~").into_bytes()
    } else {
        format!("\x1b[{num}~").into_bytes()
    }
}

/// F1-F4 are SS3 P/Q/R/S; F5-F12 use the tilde numbers.
fn encode_function_key(n: u8, mods: Modifiers) -> Vec<u8> {
    let code = mods.code();
    match n {
        1..=4 => {
            let final_byte = b'P' + (n - 1);
            if code > 1 {
                vec![0x1B, b'[', b'1', b';', b'0' + code, final_byte]
            } else {
                vec![0x1B, b'O', final_byte]
            }
        }
        5..=12 => {
            let num = match n {
                5 => 15,
                6 => 17,
                7 => 18,
                8 => 19,
                9 => 20,
                10 => 21,
                11 => 23,
                _ => 24,
            };
            if code > 1 {
                format!("\x1b[{num};{code}~").into_bytes()
            } else {
                format!("\x1b[{num}~").into_bytes()
            }
        }
        _ => Vec::new(),
    }
}

pub fn bracketed_paste_start() -> &'static [u8] {
    b"\x1b[200~"
}

pub fn bracketed_paste_end() -> &'static [u8] {
    b"\x1b[201~"
}

/// Wrap a paste when bracketed-paste mode is active; raw bytes otherwise.
pub fn encode_paste(text: &str, bracketed: bool) -> Vec<u8> {
    if bracketed {
        let mut bytes =
            Vec::with_capacity(text.len() + bracketed_paste_start().len() + bracketed_paste_end().len());
        bytes.extend_from_slice(bracketed_paste_start());
        bytes.extend_from_slice(text.as_bytes());
        bytes.extend_from_slice(bracketed_paste_end());
        bytes
    } else {
        text.as_bytes().to_vec()
    }
}

// ---------------------------------------------------------------------
// Mouse reporting
// ---------------------------------------------------------------------

/// Tracking mode selected by DECSET 9 / 1000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseMode {
    #[default]
    None,
    X10,
    Normal,
}

/// Wire encoding selected by DECSET 1006 / 1015.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseEncoding {
    #[default]
    Default,
    Sgr,
    Urxvt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEvent {
    Press(MouseButton),
    Release(MouseButton),
}

/// Serialize a mouse event at 0-based cell coordinates.
pub fn encode_mouse(
    event: MouseEvent,
    col: u16,
    row: u16,
    mode: MouseMode,
    encoding: MouseEncoding,
) -> Vec<u8> {
    if mode == MouseMode::None {
        return Vec::new();
    }
    // X10 tracking reports presses only.
    if mode == MouseMode::X10 && matches!(event, MouseEvent::Release(_)) {
        return Vec::new();
    }

    let x = col.saturating_add(1);
    let y = row.saturating_add(1);

    let button = match event {
        MouseEvent::Press(b) | MouseEvent::Release(b) => match b {
            MouseButton::Left => 0u16,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
            MouseButton::WheelUp => 64,
            MouseButton::WheelDown => 65,
        },
    };

    match encoding {
        MouseEncoding::Default => {
            let cb = match event {
                MouseEvent::Release(_) => 3 + 32,
                MouseEvent::Press(_) => (button + 32).min(255),
            } as u8;
            let cx = (x.min(223) + 32) as u8;
            let cy = (y.min(223) + 32) as u8;
            vec![0x1B, b'[', b'M', cb, cx, cy]
        }
        MouseEncoding::Sgr => {
            let final_byte = match event {
                MouseEvent::Release(_) => 'm',
                MouseEvent::Press(_) => 'M',
            };
            format!("\x1b[<{button};{x};{y}{final_byte}").into_bytes()
        }
        MouseEncoding::Urxvt => {
            let cb = match event {
                MouseEvent::Release(_) => 3 + 32,
                MouseEvent::Press(_) => button + 32,
            };
            format!("\x1b[{cb};{x};{y}M").into_bytes()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_characters_pass_through() {
        assert_eq!(encode_key(Key::Char('a'), Modifiers::NONE, false), b"a");
        assert_eq!(
            encode_key(Key::Char('é'), Modifiers::NONE, false),
            "é".as_bytes()
        );
    }

    #[test]
    fn enter_is_carriage_return() {
        assert_eq!(encode_key(Key::Enter, Modifiers::NONE, false), b"\r");
    }

    #[test]
    fn ctrl_letters_become_control_bytes() {
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        assert_eq!(encode_key(Key::Char('c'), ctrl, false), vec![0x03]);
        assert_eq!(encode_key(Key::Char('A'), ctrl, false), vec![0x01]);
        assert_eq!(encode_key(Key::Char('z'), ctrl, false), vec![0x1A]);
        assert_eq!(encode_key(Key::Char('['), ctrl, false), vec![0x1B]);
    }

    #[test]
    fn alt_prefixes_escape() {
        let alt = Modifiers {
            alt: true,
            ..Modifiers::NONE
        };
        assert_eq!(encode_key(Key::Char('x'), alt, false), vec![0x1B, b'x']);
    }

    #[test]
    fn arrows_respect_application_mode() {
        assert_eq!(encode_key(Key::Up, Modifiers::NONE, false), b"\x1b[A");
        assert_eq!(encode_key(Key::Up, Modifiers::NONE, true), b"\x1bOA");
    }

    #[test]
    fn modified_arrow_uses_xterm_parameter() {
        let mods = Modifiers {
            shift: true,
            ctrl: true,
            ..Modifiers::NONE
        };
        // 1 + shift(1) + ctrl(4) = 6
        assert_eq!(encode_key(Key::Up, mods, false), b"\x1b[1;6A");
        // Modifiers win over application mode.
        assert_eq!(encode_key(Key::Up, mods, true), b"\x1b[1;6A");
    }

    #[test]
    fn home_end_and_tilde_keys() {
        assert_eq!(encode_key(Key::Home, Modifiers::NONE, false), b"\x1b[H");
        assert_eq!(encode_key(Key::End, Modifiers::NONE, false), b"\x1b[F");
        assert_eq!(encode_key(Key::Insert, Modifiers::NONE, false), b"\x1b[2~");
        assert_eq!(encode_key(Key::Delete, Modifiers::NONE, false), b"\x1b[3~");
        assert_eq!(encode_key(Key::PageUp, Modifiers::NONE, false), b"\x1b[5~");
        assert_eq!(encode_key(Key::PageDown, Modifiers::NONE, false), b"\x1b[6~");
    }

    #[test]
    fn shift_tab_is_backtab() {
        let shift = Modifiers {
            shift: true,
            ..Modifiers::NONE
        };
        assert_eq!(encode_key(Key::Tab, shift, false), b"\x1b[Z");
        assert_eq!(encode_key(Key::Tab, Modifiers::NONE, false), b"\t");
    }

    #[test]
    fn function_keys() {
        assert_eq!(encode_key(Key::F(1), Modifiers::NONE, false), b"\x1bOP");
        assert_eq!(encode_key(Key::F(4), Modifiers::NONE, false), b"\x1bOS");
        assert_eq!(encode_key(Key::F(5), Modifiers::NONE, false), b"\x1b[15~");
        assert_eq!(encode_key(Key::F(12), Modifiers::NONE, false), b"\x1b[24~");
        let shift = Modifiers {
            shift: true,
            ..Modifiers::NONE
        };
        assert_eq!(encode_key(Key::F(5), shift, false), b"\x1b[15;2~");
    }

    #[test]
    fn paste_wrapping_follows_mode() {
        assert_eq!(encode_paste("hi", false), b"hi");
        assert_eq!(encode_paste("hi", true), b"\x1b[200~hi\x1b[201~");
    }

    #[test]
    fn mouse_default_encoding() {
        let bytes = encode_mouse(
            MouseEvent::Press(MouseButton::Left),
            0,
            0,
            MouseMode::Normal,
            MouseEncoding::Default,
        );
        assert_eq!(bytes, vec![0x1B, b'[', b'M', 32, 33, 33]);
    }

    #[test]
    fn mouse_sgr_encoding() {
        let press = encode_mouse(
            MouseEvent::Press(MouseButton::Left),
            10,
            20,
            MouseMode::Normal,
            MouseEncoding::Sgr,
        );
        assert_eq!(press, b"\x1b[<0;11;21M");
        let release = encode_mouse(
            MouseEvent::Release(MouseButton::Left),
            10,
            20,
            MouseMode::Normal,
            MouseEncoding::Sgr,
        );
        assert_eq!(release, b"\x1b[<0;11;21m");
    }

    #[test]
    fn wheel_buttons_are_64_65() {
        let up = encode_mouse(
            MouseEvent::Press(MouseButton::WheelUp),
            0,
            0,
            MouseMode::Normal,
            MouseEncoding::Sgr,
        );
        assert_eq!(up, b"\x1b[<64;1;1M");
        let down = encode_mouse(
            MouseEvent::Press(MouseButton::WheelDown),
            0,
            0,
            MouseMode::Normal,
            MouseEncoding::Sgr,
        );
        assert_eq!(down, b"\x1b[<65;1;1M");
    }

    #[test]
    fn no_reporting_when_mode_off() {
        let bytes = encode_mouse(
            MouseEvent::Press(MouseButton::Left),
            1,
            1,
            MouseMode::None,
            MouseEncoding::Sgr,
        );
        assert!(bytes.is_empty());
    }
}
