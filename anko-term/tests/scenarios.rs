//! End-to-end scenarios over the emulator, grid, ring and input layers.

use anko_core::{RingBuffer, TermGrid};
use anko_term::emulator::Emulator;
use anko_term::event::TermEvent;
use anko_term::input::{self, Key, Modifiers};
use anko_term::SessionConfig;

/// Apply emulator events to a grid the way the session pump does.
fn apply_events(emulator: &Emulator, grid: &mut TermGrid, events: &[TermEvent]) {
    for event in events {
        match event {
            TermEvent::Damage(rect) => {
                for row in rect.row_start..rect.row_end.min(grid.rows()) {
                    for col in rect.col_start..rect.col_end.min(grid.cols()) {
                        if let Some(cell) = emulator.cell(row, col) {
                            grid.set_cell(row, col, cell.clone());
                        }
                    }
                }
            }
            TermEvent::MoveRect { dest, src } => {
                for rect in [dest, src] {
                    for row in rect.row_start..rect.row_end.min(grid.rows()) {
                        for col in rect.col_start..rect.col_end.min(grid.cols()) {
                            if let Some(cell) = emulator.cell(row, col) {
                                grid.set_cell(row, col, cell.clone());
                            }
                        }
                    }
                }
            }
            TermEvent::ScrollbackPush(line) => grid.push_scrollback(line.clone()),
            _ => {}
        }
    }
}

fn feed(emulator: &mut Emulator, grid: &mut TermGrid, bytes: &[u8]) -> Vec<TermEvent> {
    emulator.input_write(bytes);
    let events = emulator.drain_events();
    apply_events(emulator, grid, &events);
    events
}

// ---------------------------------------------------------------------
// Scenario: plain text lands in the first row
// ---------------------------------------------------------------------

#[test]
fn hello_fills_row_zero_and_damages_both_rows() {
    let mut emulator = Emulator::new(25, 80);
    let mut grid = TermGrid::new(25, 80, 1000).unwrap();
    feed(&mut emulator, &mut grid, b"");

    let events = feed(&mut emulator, &mut grid, b"Hello\r\n");

    assert_eq!(grid.row_text(0), "Hello");
    for (i, ch) in "Hello".chars().enumerate() {
        assert_eq!(grid.cell(0, i).ch, ch);
    }
    assert_eq!(
        (emulator.cursor().row, emulator.cursor().col),
        (1, 0),
        "cursor should sit at the start of row 1"
    );

    let mut damaged = vec![];
    for event in &events {
        if let TermEvent::Damage(rect) = event {
            damaged.extend(rect.row_start..rect.row_end);
        }
    }
    assert!(damaged.contains(&0));
    assert!(damaged.contains(&1));
}

// ---------------------------------------------------------------------
// Scenario: scrolled lines accumulate as history
// ---------------------------------------------------------------------

#[test]
fn thirty_lines_on_ten_rows_push_twenty() {
    let mut emulator = Emulator::new(10, 20);
    let mut grid = TermGrid::new(10, 20, 1000).unwrap();
    feed(&mut emulator, &mut grid, b"");

    let mut pushes = 0;
    let mut bytes = Vec::new();
    for n in 0..30 {
        if n > 0 {
            bytes.extend_from_slice(b"\r\n");
        }
        bytes.extend_from_slice(format!("L{n}").as_bytes());
    }
    let events = feed(&mut emulator, &mut grid, &bytes);
    for event in &events {
        if matches!(event, TermEvent::ScrollbackPush(_)) {
            pushes += 1;
        }
    }

    assert_eq!(pushes, 20, "the first twenty lines left the screen");
    assert_eq!(grid.scrollback_len(), 20);
    for row in 0..10 {
        assert_eq!(grid.row_text(row), format!("L{}", row + 20));
    }
    // Most recent eviction first.
    assert_eq!(grid.scrollback_line(0).unwrap().text(), "L19");
    assert_eq!(grid.scrollback_line(19).unwrap().text(), "L0");
}

#[test]
fn scrollback_respects_its_cap() {
    let mut emulator = Emulator::new(10, 20);
    let mut grid = TermGrid::new(10, 20, 5).unwrap();
    feed(&mut emulator, &mut grid, b"");

    let mut bytes = Vec::new();
    for n in 0..30 {
        bytes.extend_from_slice(format!("L{n}\r\n").as_bytes());
    }
    feed(&mut emulator, &mut grid, &bytes);

    assert_eq!(grid.scrollback_len(), 5);
}

// ---------------------------------------------------------------------
// Scenario: SGR styling and reset
// ---------------------------------------------------------------------

#[test]
fn bold_red_then_plain() {
    use anko_core::Color;

    let mut emulator = Emulator::new(25, 80);
    let mut grid = TermGrid::new(25, 80, 100).unwrap();
    feed(&mut emulator, &mut grid, b"\x1b[1;31mX\x1b[0mY");

    let x = grid.cell(0, 0);
    assert!(x.attrs.bold);
    assert_eq!(x.fg, Color::Indexed(1));
    assert_eq!(x.ch, 'X');

    let y = grid.cell(0, 1);
    assert!(!y.attrs.bold);
    assert_eq!(y.fg, Color::Default);
    assert_eq!(y.ch, 'Y');
}

// ---------------------------------------------------------------------
// Scenario: East Asian wide characters
// ---------------------------------------------------------------------

#[test]
fn wide_character_occupies_cell_pair() {
    let mut emulator = Emulator::new(25, 80);
    let mut grid = TermGrid::new(25, 80, 100).unwrap();
    feed(&mut emulator, &mut grid, "\u{3042}".as_bytes());

    let base = grid.cell(0, 0);
    assert_eq!(base.ch, '\u{3042}');
    assert_eq!(base.width, 2);
    assert_eq!(grid.cell(0, 1).width, 0);
    assert_eq!(grid.row_text(0), "\u{3042}");
}

// ---------------------------------------------------------------------
// Scenario: alternate screen round trip
// ---------------------------------------------------------------------

#[test]
fn alt_screen_saves_and_restores() {
    let mut emulator = Emulator::new(10, 40);
    let mut grid = TermGrid::new(10, 40, 100).unwrap();
    feed(&mut emulator, &mut grid, b"primary content");
    let saved_col = emulator.cursor().col;

    let events = feed(&mut emulator, &mut grid, b"\x1b[?1049h");
    assert!(
        events
            .iter()
            .any(|e| matches!(e, TermEvent::SetProps(p) if p.alt_screen)),
        "entering the alt screen publishes the property"
    );

    let events = feed(&mut emulator, &mut grid, b"\x1b[2Jvisual app\x1b[?1049l");
    assert!(events
        .iter()
        .any(|e| matches!(e, TermEvent::SetProps(p) if !p.alt_screen)));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, TermEvent::ScrollbackPush(_))),
        "alt-screen output never becomes history"
    );

    assert_eq!(grid.row_text(0), "primary content");
    assert_eq!(emulator.cursor().col, saved_col);
    assert_eq!(grid.scrollback_len(), 0);
}

// ---------------------------------------------------------------------
// Scenario: key encoding
// ---------------------------------------------------------------------

#[test]
fn shift_ctrl_up_arrow_encoding() {
    let mods = Modifiers {
        shift: true,
        ctrl: true,
        alt: false,
    };
    assert_eq!(input::encode_key(Key::Up, mods, false), b"\x1b[1;6A");
}

#[test]
fn paste_depends_on_bracketed_mode() {
    let mut emulator = Emulator::new(25, 80);
    emulator.drain_events();

    emulator.paste("hi");
    let raw: Vec<_> = emulator
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            TermEvent::Output(b) => Some(b),
            _ => None,
        })
        .collect();
    assert_eq!(raw, vec![b"hi".to_vec()]);

    emulator.input_write(b"\x1b[?2004h");
    emulator.drain_events();
    emulator.paste("hi");
    let bracketed: Vec<_> = emulator
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            TermEvent::Output(b) => Some(b),
            _ => None,
        })
        .collect();
    assert_eq!(bracketed, vec![b"\x1b[200~hi\x1b[201~".to_vec()]);
}

// ---------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------

#[test]
fn ring_counts_are_consistent() {
    let ring = RingBuffer::with_capacity(4096);
    let capacity = ring.capacity() + 1;
    assert_eq!(ring.len() + ring.available() + 1, capacity);

    ring.write(b"some bytes");
    assert_eq!(ring.len() + ring.available() + 1, capacity);

    let mut out = [0u8; 4];
    ring.read(&mut out);
    assert_eq!(ring.len() + ring.available() + 1, capacity);
}

#[test]
fn ring_preserves_fifo_under_chunked_io() {
    let ring = RingBuffer::with_capacity(64);
    let mut expected = Vec::new();
    let mut received = Vec::new();
    let mut next = 0u8;

    for round in 0..200 {
        let write_len = (round % 13) + 1;
        let chunk: Vec<u8> = (0..write_len)
            .map(|_| {
                let b = next;
                next = next.wrapping_add(1);
                b
            })
            .collect();
        let accepted = ring.write(&chunk);
        expected.extend_from_slice(&chunk[..accepted]);
        // Unaccepted bytes are the producer's problem; drop them here.
        if accepted < chunk.len() {
            next = chunk[accepted];
        }

        let mut out = [0u8; 7];
        let n = ring.read(&mut out);
        received.extend_from_slice(&out[..n]);
    }
    let mut out = [0u8; 64];
    loop {
        let n = ring.read(&mut out);
        if n == 0 {
            break;
        }
        received.extend_from_slice(&out[..n]);
    }
    assert_eq!(received, expected);
}

#[test]
fn grid_resize_restores_shape_and_dirt() {
    let mut grid = TermGrid::new(10, 30, 100).unwrap();
    grid.clear_dirty();
    grid.resize(7, 44);

    assert_eq!(grid.rows(), 7);
    for row in 0..7 {
        assert_eq!(grid.row(row).unwrap().len(), 44);
        assert!(grid.is_dirty(row));
    }
    assert_eq!(grid.dirty_rows().len(), 7);
}

#[test]
fn cursor_never_escapes_screen_bounds() {
    let mut emulator = Emulator::new(6, 12);
    emulator.drain_events();

    // Deterministic pseudo-random byte soup with plenty of CSI noise.
    let mut soup = Vec::new();
    let mut state = 0x2545_F491u32;
    for _ in 0..8192 {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        soup.push((state >> 16) as u8);
    }
    emulator.input_write(&soup);
    emulator.drain_events();

    assert!(emulator.cursor().row < 6);
    assert!(emulator.cursor().col < 12);
}

#[test]
fn wide_companions_always_follow_wide_bases() {
    let mut emulator = Emulator::new(8, 11);
    let mut grid = TermGrid::new(8, 11, 100).unwrap();

    // Wide chars at awkward positions, including the last column.
    let bytes = "あいうえおかきくけこさしすせそ\r\nx\u{3042}\u{3042}\u{3042}\u{3042}\u{3042}"
        .as_bytes()
        .to_vec();
    feed(&mut emulator, &mut grid, &bytes);

    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            if grid.cell(row, col).width == 0 {
                assert!(col > 0, "companion cell in column 0 at row {row}");
                assert_eq!(
                    grid.cell(row, col - 1).width,
                    2,
                    "companion not preceded by wide base at {row},{col}"
                );
            }
        }
    }
    // No wide base may sit in the last column.
    for row in 0..grid.rows() {
        assert_ne!(grid.cell(row, grid.cols() - 1).width, 2);
    }
}

#[test]
fn session_config_roundtrips() {
    let config = SessionConfig {
        shell: "/usr/bin/fish".into(),
        args: "--login".into(),
        working_dir: "/home/user".into(),
        title: "shell".into(),
        profile_name: "fish".into(),
        rows: 42,
        cols: 120,
        scrollback_lines: 2000,
        tab_index: 3,
    };
    let json = config.to_json().unwrap();
    assert_eq!(SessionConfig::from_json(&json), config);
}
