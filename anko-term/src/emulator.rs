//! VT interpretation: parser actions applied to screen state.
//!
//! The emulator owns the byte parser, the primary and alternate screens
//! and the terminal-global modes. It communicates outward exclusively
//! through the [`TermEvent`] queue: damage, cursor moves, property
//! snapshots, scrollback pushes and reply bytes, in emission order.
//! Unknown sequences are logged and dropped; they never reach the grid.

use anko_core::cell::UnderlineStyle;
use anko_core::{Cell, Color, Cursor, CursorStyle, Line, Rgb, Screen};
use anko_parser::{Action, Params, Parser};

use crate::event::{MouseProtocol, Rect, TermEvent, TermProps};
use crate::input::{self, Key, Modifiers, MouseEncoding, MouseEvent, MouseMode};

pub struct Emulator {
    parser: Parser,
    primary: Screen,
    alternate: Screen,
    alt_active: bool,

    app_cursor: bool,
    app_keypad: bool,
    bracketed_paste: bool,
    mouse_mode: MouseMode,
    mouse_encoding: MouseEncoding,

    title: String,
    icon_name: String,

    events: Vec<TermEvent>,
    pending_damage: Option<Rect>,
    published_props: TermProps,
    last_cursor: (usize, usize, bool),
}

impl Emulator {
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut emulator = Emulator {
            parser: Parser::new(),
            primary: Screen::new(rows, cols),
            alternate: Screen::new(rows, cols),
            alt_active: false,
            app_cursor: false,
            app_keypad: false,
            bracketed_paste: false,
            mouse_mode: MouseMode::None,
            mouse_encoding: MouseEncoding::Default,
            title: String::new(),
            icon_name: String::new(),
            events: Vec::new(),
            pending_damage: None,
            published_props: TermProps::default(),
            last_cursor: (0, 0, true),
        };
        emulator.damage(Rect::rows(0, rows, cols));
        emulator
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn screen(&self) -> &Screen {
        if self.alt_active {
            &self.alternate
        } else {
            &self.primary
        }
    }

    fn screen_mut(&mut self) -> &mut Screen {
        if self.alt_active {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    pub fn rows(&self) -> usize {
        self.screen().rows()
    }

    pub fn cols(&self) -> usize {
        self.screen().cols()
    }

    pub fn cursor(&self) -> &Cursor {
        &self.screen().cursor
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.screen().cell(row, col)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn alt_screen_active(&self) -> bool {
        self.alt_active
    }

    pub fn bracketed_paste(&self) -> bool {
        self.bracketed_paste
    }

    pub fn app_cursor_keys(&self) -> bool {
        self.app_cursor
    }

    pub fn app_keypad(&self) -> bool {
        self.app_keypad
    }

    pub fn mouse_state(&self) -> (MouseMode, MouseEncoding) {
        (self.mouse_mode, self.mouse_encoding)
    }

    pub fn props(&self) -> &TermProps {
        &self.published_props
    }

    // ------------------------------------------------------------------
    // Input API
    // ------------------------------------------------------------------

    /// Feed raw shell output. Always consumes the whole buffer.
    pub fn input_write(&mut self, bytes: &[u8]) -> usize {
        let mut actions = Vec::new();
        self.parser.parse(bytes, |action| actions.push(action));
        for action in actions {
            self.apply(action);
        }
        self.sync_cursor();
        bytes.len()
    }

    /// Encode a UI character with modifiers into reply bytes.
    pub fn keyboard_unichar(&mut self, ch: char, mods: Modifiers) {
        self.keyboard_key(Key::Char(ch), mods);
    }

    /// Encode a named key with modifiers into reply bytes.
    pub fn keyboard_key(&mut self, key: Key, mods: Modifiers) {
        let bytes = input::encode_key(key, mods, self.app_cursor);
        if !bytes.is_empty() {
            self.output(bytes);
        }
    }

    /// Encode a mouse event under the active reporting protocol.
    pub fn mouse_input(&mut self, event: MouseEvent, col: u16, row: u16) {
        let bytes = input::encode_mouse(event, col, row, self.mouse_mode, self.mouse_encoding);
        if !bytes.is_empty() {
            self.output(bytes);
        }
    }

    /// Encode a paste, honoring bracketed-paste mode.
    pub fn paste(&mut self, text: &str) {
        let bytes = input::encode_paste(text, self.bracketed_paste);
        self.output(bytes);
    }

    /// Resize both screens and acknowledge through the event queue.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        let rows = rows.max(1);
        let cols = cols.max(1);
        if rows == self.rows() && cols == self.cols() {
            return;
        }
        self.flush_damage();
        self.primary.resize(rows, cols);
        self.alternate.resize(rows, cols);
        self.events.push(TermEvent::Resize { rows, cols });
        self.damage(Rect::rows(0, rows, cols));
        self.sync_cursor();
    }

    /// RIS-grade reset: screens, parser, modes, properties.
    pub fn reset(&mut self) {
        self.flush_damage();
        self.parser.reset();
        self.primary.reset();
        self.alternate.reset();
        self.alt_active = false;
        self.app_cursor = false;
        self.app_keypad = false;
        self.bracketed_paste = false;
        self.mouse_mode = MouseMode::None;
        self.mouse_encoding = MouseEncoding::Default;
        self.title.clear();
        self.icon_name.clear();
        self.publish_props();
        self.damage(Rect::rows(0, self.rows(), self.cols()));
        self.sync_cursor();
    }

    /// Take the queued events, flushing coalesced damage first.
    pub fn drain_events(&mut self) -> Vec<TermEvent> {
        self.flush_damage();
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Event plumbing
    // ------------------------------------------------------------------

    /// Queue damage, coalescing with the pending rectangle when the
    /// union is still a rectangle of only-damaged cells.
    fn damage(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        if let Some(mut pending) = self.pending_damage.take() {
            let same_rows =
                pending.row_start == rect.row_start && pending.row_end == rect.row_end;
            let same_cols =
                pending.col_start == rect.col_start && pending.col_end == rect.col_end;
            if same_rows && rect.col_start <= pending.col_end && pending.col_start <= rect.col_end
            {
                pending.col_start = pending.col_start.min(rect.col_start);
                pending.col_end = pending.col_end.max(rect.col_end);
                self.pending_damage = Some(pending);
                return;
            }
            if same_cols && rect.row_start <= pending.row_end && pending.row_start <= rect.row_end
            {
                pending.row_start = pending.row_start.min(rect.row_start);
                pending.row_end = pending.row_end.max(rect.row_end);
                self.pending_damage = Some(pending);
                return;
            }
            self.events.push(TermEvent::Damage(pending));
        }
        self.pending_damage = Some(rect);
    }

    fn flush_damage(&mut self) {
        if let Some(rect) = self.pending_damage.take() {
            self.events.push(TermEvent::Damage(rect));
        }
    }

    fn output(&mut self, bytes: Vec<u8>) {
        self.flush_damage();
        self.events.push(TermEvent::Output(bytes));
    }

    fn sync_cursor(&mut self) {
        let cursor = &self.screen().cursor;
        let state = (cursor.row, cursor.col, cursor.visible);
        if state != self.last_cursor {
            self.last_cursor = state;
            self.flush_damage();
            self.events.push(TermEvent::MoveCursor {
                row: state.0,
                col: state.1,
                visible: state.2,
            });
        }
    }

    fn current_props(&self) -> TermProps {
        let cursor = &self.screen().cursor;
        let mouse = match (self.mouse_mode, self.mouse_encoding) {
            (MouseMode::None, _) => MouseProtocol::None,
            (MouseMode::X10, _) => MouseProtocol::X10,
            (MouseMode::Normal, MouseEncoding::Default) => MouseProtocol::Normal,
            (MouseMode::Normal, _) => MouseProtocol::Sgr,
        };
        TermProps {
            title: self.title.clone(),
            icon_name: self.icon_name.clone(),
            cursor_visible: cursor.visible,
            cursor_blink: cursor.blinking,
            cursor_shape: cursor.style,
            alt_screen: self.alt_active,
            mouse,
            bracketed_paste: self.bracketed_paste,
        }
    }

    fn publish_props(&mut self) {
        let props = self.current_props();
        if props != self.published_props {
            self.published_props = props.clone();
            self.flush_damage();
            self.events.push(TermEvent::SetProps(props));
        }
    }

    /// Route scroll fallout: history pushes first, then the move-rect
    /// hint, then damage for the rows that became blank.
    fn scrolled_up(&mut self, count: usize, evicted: Vec<Line>) {
        self.flush_damage();
        if !self.alt_active {
            for line in evicted {
                self.events.push(TermEvent::ScrollbackPush(line));
            }
        }
        let region = self.screen().scroll_region();
        let cols = self.cols();
        let count = count.min(region.bottom - region.top + 1);
        if region.top + count <= region.bottom {
            self.events.push(TermEvent::MoveRect {
                dest: Rect::rows(region.top, region.bottom + 1 - count, cols),
                src: Rect::rows(region.top + count, region.bottom + 1, cols),
            });
        }
        self.damage(Rect::rows(region.bottom + 1 - count, region.bottom + 1, cols));
    }

    fn scrolled_down(&mut self, count: usize) {
        self.flush_damage();
        let region = self.screen().scroll_region();
        let cols = self.cols();
        let count = count.min(region.bottom - region.top + 1);
        if region.top + count <= region.bottom {
            self.events.push(TermEvent::MoveRect {
                dest: Rect::rows(region.top + count, region.bottom + 1, cols),
                src: Rect::rows(region.top, region.bottom + 1 - count, cols),
            });
        }
        self.damage(Rect::rows(region.top, region.top + count, cols));
    }

    // ------------------------------------------------------------------
    // Action dispatch
    // ------------------------------------------------------------------

    fn apply(&mut self, action: Action) {
        match action {
            Action::Print(ch) => self.print(ch),
            Action::Execute(byte) => self.execute(byte),
            Action::CsiDispatch {
                params,
                intermediates,
                final_byte,
                private_marker,
            } => self.csi(&params, &intermediates, final_byte, private_marker),
            Action::EscDispatch {
                intermediates,
                final_byte,
            } => self.esc(&intermediates, final_byte),
            Action::OscDispatch { command, payload } => self.osc(command, payload),
            Action::DcsDispatch {
                intermediates,
                payload,
                ..
            } => self.dcs(&intermediates, &payload),
        }
    }

    fn print(&mut self, ch: char) {
        let result = self.screen_mut().put_char(ch);
        if let Some(evicted) = result.scrolled {
            self.scrolled_up(1, evicted);
        }
        self.damage(Rect {
            row_start: result.row,
            row_end: result.row + 1,
            col_start: result.col_start,
            col_end: result.col_end,
        });
    }

    fn execute(&mut self, byte: u8) {
        use anko_parser::c0;
        match byte {
            c0::BEL => {
                self.flush_damage();
                self.events.push(TermEvent::Bell);
            }
            c0::BS => self.screen_mut().backspace(),
            c0::HT => self.screen_mut().tab(),
            c0::LF | c0::VT | c0::FF => self.linefeed(),
            c0::CR => self.screen_mut().carriage_return(),
            _ => {}
        }
    }

    fn linefeed(&mut self) {
        if let Some(evicted) = self.screen_mut().linefeed() {
            self.scrolled_up(1, evicted);
        }
        let row = self.screen().cursor.row;
        let cols = self.cols();
        self.damage(Rect::rows(row, row + 1, cols));
    }

    fn esc(&mut self, intermediates: &[u8], final_byte: u8) {
        match (intermediates, final_byte) {
            ([], b'7') => self.screen_mut().save_cursor(),
            ([], b'8') => self.screen_mut().restore_cursor(),
            ([], b'D') => self.linefeed(),
            ([], b'E') => {
                self.screen_mut().carriage_return();
                self.linefeed();
            }
            ([], b'M') => {
                if self.screen_mut().reverse_index() {
                    self.scrolled_down(1);
                }
            }
            ([], b'H') => self.screen_mut().set_tab_stop(),
            ([], b'c') => self.reset(),
            ([], b'=') => self.app_keypad = true,
            ([], b'>') => self.app_keypad = false,
            // Charset designations; ASCII is all this terminal speaks.
            ([b'(' | b')' | b'*' | b'+'], _) => {}
            _ => {
                log::debug!(
                    "ignored ESC sequence: {:?} {:?}",
                    intermediates,
                    final_byte as char
                );
            }
        }
    }

    fn csi(
        &mut self,
        params: &Params,
        intermediates: &[u8],
        final_byte: u8,
        private_marker: Option<u8>,
    ) {
        match private_marker {
            Some(b'?') => return self.csi_private(params, final_byte),
            Some(b'>') => return self.csi_gt(params, final_byte),
            Some(marker) => {
                log::debug!("ignored CSI with marker {:?}", marker as char);
                return;
            }
            None => {}
        }

        if !intermediates.is_empty() {
            return self.csi_intermediate(params, intermediates, final_byte);
        }

        let count = params.get_nonzero_or(0, 1) as usize;
        match final_byte {
            b'@' => {
                self.screen_mut().insert_chars(count);
                self.damage_cursor_to_eol();
            }
            b'A' => self.screen_mut().move_cursor_up(count),
            b'B' => self.screen_mut().move_cursor_down(count),
            b'C' => self.screen_mut().move_cursor_forward(count),
            b'D' => self.screen_mut().move_cursor_backward(count),
            b'E' => {
                self.screen_mut().move_cursor_down(count);
                self.screen_mut().carriage_return();
            }
            b'F' => {
                self.screen_mut().move_cursor_up(count);
                self.screen_mut().carriage_return();
            }
            b'G' => {
                let col = params.get_nonzero_or(0, 1) as usize - 1;
                self.screen_mut().move_cursor_to_col(col);
            }
            b'H' | b'f' => {
                let row = params.get_nonzero_or(0, 1) as usize - 1;
                let col = params.get_nonzero_or(1, 1) as usize - 1;
                self.screen_mut().move_cursor_to(row, col);
            }
            b'J' => {
                let mode = params.get_or(0, 0);
                self.screen_mut().erase_in_display(mode);
                let (rows, cols) = (self.rows(), self.cols());
                let row = self.screen().cursor.row;
                match mode {
                    0 => self.damage(Rect::rows(row, rows, cols)),
                    1 => self.damage(Rect::rows(0, row + 1, cols)),
                    2 | 3 => self.damage(Rect::rows(0, rows, cols)),
                    _ => {}
                }
            }
            b'K' => {
                let mode = params.get_or(0, 0);
                self.screen_mut().erase_in_line(mode);
                let row = self.screen().cursor.row;
                let cols = self.cols();
                self.damage(Rect::rows(row, row + 1, cols));
            }
            b'L' => {
                self.screen_mut().insert_lines(count);
                self.damage_cursor_to_region_bottom();
            }
            b'M' => {
                self.screen_mut().delete_lines(count);
                self.damage_cursor_to_region_bottom();
            }
            b'P' => {
                self.screen_mut().delete_chars(count);
                self.damage_cursor_to_eol();
            }
            b'S' => {
                let evicted = self.screen_mut().scroll_up(count);
                self.scrolled_up(count, evicted);
            }
            b'T' => {
                self.screen_mut().scroll_down(count);
                self.scrolled_down(count);
            }
            b'X' => {
                self.screen_mut().erase_chars(count);
                let row = self.screen().cursor.row;
                let col = self.screen().cursor.col;
                let end = (col + count).min(self.cols());
                self.damage(Rect {
                    row_start: row,
                    row_end: row + 1,
                    col_start: col,
                    col_end: end,
                });
            }
            b'd' => {
                let row = params.get_nonzero_or(0, 1) as usize - 1;
                self.screen_mut().move_cursor_to_row(row);
            }
            b'g' => self.screen_mut().clear_tab_stops(params.get_or(0, 0)),
            b'h' | b'l' => {
                let enable = final_byte == b'h';
                for mode in params.iter() {
                    match mode {
                        4 => self.screen_mut().insert_mode = enable,
                        _ => log::debug!("ignored ANSI mode {mode} set={enable}"),
                    }
                }
            }
            b'm' => self.sgr(params),
            b'n' => match params.get_or(0, 0) {
                5 => self.output(b"\x1b[0n".to_vec()),
                6 => {
                    let row = self.screen().cursor.row + 1;
                    let col = self.screen().cursor.col + 1;
                    self.output(format!("\x1b[{row};{col}R").into_bytes());
                }
                mode => log::debug!("ignored DSR {mode}"),
            },
            b'r' => {
                let top = params.get_nonzero_or(0, 1) as usize - 1;
                let bottom = params.get_nonzero_or(1, self.rows() as u16) as usize - 1;
                self.screen_mut().set_scroll_region(top, bottom);
            }
            b's' => self.screen_mut().save_cursor(),
            b'u' => self.screen_mut().restore_cursor(),
            b'c' => self.output(b"\x1b[?62;22c".to_vec()),
            _ => {
                log::debug!(
                    "ignored CSI sequence: {:?} {:?}",
                    params,
                    final_byte as char
                );
            }
        }
    }

    fn damage_cursor_to_eol(&mut self) {
        let row = self.screen().cursor.row;
        let col = self.screen().cursor.col;
        let cols = self.cols();
        self.damage(Rect {
            row_start: row,
            row_end: row + 1,
            col_start: col,
            col_end: cols,
        });
    }

    fn damage_cursor_to_region_bottom(&mut self) {
        let row = self.screen().cursor.row;
        let bottom = self.screen().scroll_region().bottom;
        let cols = self.cols();
        if row <= bottom {
            self.damage(Rect::rows(row, bottom + 1, cols));
        }
    }

    fn csi_private(&mut self, params: &Params, final_byte: u8) {
        match final_byte {
            b'h' | b'l' => {
                let enable = final_byte == b'h';
                for mode in params.iter() {
                    self.dec_mode(mode, enable);
                }
            }
            b'n' => {
                if params.get_or(0, 0) == 6 {
                    let row = self.screen().cursor.row + 1;
                    let col = self.screen().cursor.col + 1;
                    self.output(format!("\x1b[?{row};{col}R").into_bytes());
                }
            }
            _ => {
                log::debug!("ignored private CSI ? {:?} {:?}", params, final_byte as char);
            }
        }
    }

    fn csi_gt(&mut self, params: &Params, final_byte: u8) {
        match final_byte {
            // Secondary DA: VT220-class, fixed firmware version.
            b'c' => self.output(b"\x1b[>1;10;0c".to_vec()),
            _ => {
                log::debug!("ignored CSI > {:?} {:?}", params, final_byte as char);
            }
        }
    }

    fn csi_intermediate(&mut self, params: &Params, intermediates: &[u8], final_byte: u8) {
        match (intermediates, final_byte) {
            ([b' '], b'q') => {
                let (style, blinking) = match params.get_or(0, 1) {
                    0 | 1 => (CursorStyle::Block, true),
                    2 => (CursorStyle::Block, false),
                    3 => (CursorStyle::Underline, true),
                    4 => (CursorStyle::Underline, false),
                    5 => (CursorStyle::Bar, true),
                    6 => (CursorStyle::Bar, false),
                    _ => return,
                };
                for screen in [&mut self.primary, &mut self.alternate] {
                    screen.cursor.style = style;
                    screen.cursor.blinking = blinking;
                }
                self.publish_props();
            }
            _ => {
                log::debug!(
                    "ignored CSI with intermediates {:?} {:?}",
                    intermediates,
                    final_byte as char
                );
            }
        }
    }

    fn dec_mode(&mut self, mode: u16, enable: bool) {
        match mode {
            1 => self.app_cursor = enable,
            6 => {
                self.screen_mut().origin_mode = enable;
                self.screen_mut().move_cursor_to(0, 0);
            }
            7 => self.screen_mut().autowrap = enable,
            9 => {
                self.mouse_mode = if enable { MouseMode::X10 } else { MouseMode::None };
                self.publish_props();
            }
            12 => {
                for screen in [&mut self.primary, &mut self.alternate] {
                    screen.cursor.blinking = enable;
                }
                self.publish_props();
            }
            25 => {
                for screen in [&mut self.primary, &mut self.alternate] {
                    screen.cursor.visible = enable;
                }
                self.publish_props();
            }
            47 => {
                if enable {
                    self.enter_alt_screen(false, false);
                } else {
                    self.leave_alt_screen(false);
                }
            }
            1000 | 1002 | 1003 => {
                self.mouse_mode = if enable {
                    MouseMode::Normal
                } else {
                    MouseMode::None
                };
                self.publish_props();
            }
            1006 => {
                self.mouse_encoding = if enable {
                    MouseEncoding::Sgr
                } else {
                    MouseEncoding::Default
                };
                self.publish_props();
            }
            1015 => {
                self.mouse_encoding = if enable {
                    MouseEncoding::Urxvt
                } else {
                    MouseEncoding::Default
                };
                self.publish_props();
            }
            1047 => {
                if enable {
                    self.enter_alt_screen(true, false);
                } else {
                    self.leave_alt_screen(false);
                }
            }
            1048 => {
                if enable {
                    self.screen_mut().save_cursor();
                } else {
                    self.screen_mut().restore_cursor();
                }
            }
            1049 => {
                if enable {
                    self.enter_alt_screen(true, true);
                } else {
                    self.leave_alt_screen(true);
                }
            }
            2004 => {
                self.bracketed_paste = enable;
                self.publish_props();
            }
            _ => log::debug!("ignored DEC private mode {mode} set={enable}"),
        }
    }

    fn enter_alt_screen(&mut self, clear: bool, save_cursor: bool) {
        if self.alt_active {
            return;
        }
        if save_cursor {
            self.primary.save_cursor();
        }
        self.alt_active = true;
        if clear {
            self.alternate.clear_all();
            self.alternate.cursor.row = 0;
            self.alternate.cursor.col = 0;
        }
        self.publish_props();
        self.damage(Rect::rows(0, self.rows(), self.cols()));
    }

    fn leave_alt_screen(&mut self, restore_cursor: bool) {
        if !self.alt_active {
            return;
        }
        self.alt_active = false;
        if restore_cursor {
            self.primary.restore_cursor();
        }
        self.publish_props();
        self.damage(Rect::rows(0, self.rows(), self.cols()));
    }

    fn sgr(&mut self, params: &Params) {
        if params.is_empty() {
            let screen = self.screen_mut();
            screen.attrs.reset();
            screen.fg = Color::Default;
            screen.bg = Color::Default;
            return;
        }

        let mut i = 0;
        while i < params.len() {
            let param = params.get_or(i, 0);
            match param {
                0 => {
                    let screen = self.screen_mut();
                    screen.attrs.reset();
                    screen.fg = Color::Default;
                    screen.bg = Color::Default;
                }
                1 => self.screen_mut().attrs.bold = true,
                3 => self.screen_mut().attrs.italic = true,
                4 => {
                    let style = match params.subparams(i).first().copied() {
                        Some(0) => UnderlineStyle::None,
                        Some(2) => UnderlineStyle::Double,
                        Some(3) => UnderlineStyle::Curly,
                        _ => UnderlineStyle::Single,
                    };
                    self.screen_mut().attrs.underline = style;
                }
                5 | 6 => self.screen_mut().attrs.blink = true,
                7 => self.screen_mut().attrs.reverse = true,
                8 => self.screen_mut().attrs.conceal = true,
                9 => self.screen_mut().attrs.strikethrough = true,
                21 => self.screen_mut().attrs.underline = UnderlineStyle::Double,
                22 => self.screen_mut().attrs.bold = false,
                23 => self.screen_mut().attrs.italic = false,
                24 => self.screen_mut().attrs.underline = UnderlineStyle::None,
                25 => self.screen_mut().attrs.blink = false,
                27 => self.screen_mut().attrs.reverse = false,
                28 => self.screen_mut().attrs.conceal = false,
                29 => self.screen_mut().attrs.strikethrough = false,
                30..=37 => self.screen_mut().fg = Color::Indexed((param - 30) as u8),
                38 => {
                    if let Some(color) = extended_color(params, &mut i) {
                        self.screen_mut().fg = color;
                    }
                }
                39 => self.screen_mut().fg = Color::Default,
                40..=47 => self.screen_mut().bg = Color::Indexed((param - 40) as u8),
                48 => {
                    if let Some(color) = extended_color(params, &mut i) {
                        self.screen_mut().bg = color;
                    }
                }
                49 => self.screen_mut().bg = Color::Default,
                90..=97 => self.screen_mut().fg = Color::Indexed((param - 90 + 8) as u8),
                100..=107 => self.screen_mut().bg = Color::Indexed((param - 100 + 8) as u8),
                _ => log::debug!("ignored SGR parameter {param}"),
            }
            i += 1;
        }
    }

    fn osc(&mut self, command: u16, payload: String) {
        match command {
            0 => {
                self.title = payload.clone();
                self.icon_name = payload;
                self.publish_props();
            }
            1 => {
                self.icon_name = payload;
                self.publish_props();
            }
            2 => {
                self.title = payload;
                self.publish_props();
            }
            _ => log::debug!("ignored OSC {command}"),
        }
    }

    /// DECRQSS status replies; everything else is swallowed.
    fn dcs(&mut self, intermediates: &[u8], payload: &[u8]) {
        if intermediates == [b'$'] && payload.first() == Some(&b'q') {
            let reply = match &payload[1..] {
                b"m" => "\x1bP1$r0m\x1b\\".to_string(),
                b" q" => {
                    let cursor = &self.screen().cursor;
                    let style = match (cursor.style, cursor.blinking) {
                        (CursorStyle::Block, true) => 1,
                        (CursorStyle::Block, false) => 2,
                        (CursorStyle::Underline, true) => 3,
                        (CursorStyle::Underline, false) => 4,
                        (CursorStyle::Bar, true) => 5,
                        (CursorStyle::Bar, false) => 6,
                    };
                    format!("\x1bP1$r{style} q\x1b\\")
                }
                b"r" => {
                    let region = self.screen().scroll_region();
                    format!("\x1bP1$r{};{}r\x1b\\", region.top + 1, region.bottom + 1)
                }
                _ => "\x1bP0$r\x1b\\".to_string(),
            };
            self.output(reply.into_bytes());
        } else {
            log::debug!("ignored DCS with intermediates {:?}", intermediates);
        }
    }
}

fn extended_color(params: &Params, i: &mut usize) -> Option<Color> {
    let subs = params.subparams(*i);
    if !subs.is_empty() {
        // Colon form: 38:5:n or 38:2:r:g:b.
        return match subs.first().copied() {
            Some(5) if subs.len() >= 2 => Some(Color::Indexed(subs[1].min(255) as u8)),
            Some(2) if subs.len() >= 4 => Some(Color::Rgb(Rgb::new(
                subs[1].min(255) as u8,
                subs[2].min(255) as u8,
                subs[3].min(255) as u8,
            ))),
            _ => None,
        };
    }
    // Semicolon form: 38;5;n or 38;2;r;g;b, consuming the extra params.
    match params.get(*i + 1) {
        Some(5) => {
            let index = params.get(*i + 2)?;
            *i += 2;
            Some(Color::Indexed(index.min(255) as u8))
        }
        Some(2) => {
            let r = params.get(*i + 2)?;
            let g = params.get(*i + 3)?;
            let b = params.get(*i + 4)?;
            *i += 4;
            Some(Color::Rgb(Rgb::new(
                r.min(255) as u8,
                g.min(255) as u8,
                b.min(255) as u8,
            )))
        }
        _ => None,
    }
}
