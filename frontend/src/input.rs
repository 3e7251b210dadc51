use std::{io, time::Duration};

use chip8_vm_core::NUM_KEYS;
use crossterm::{
    event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers},
    terminal,
};
use log::debug;

/// Left-hand side of a qwerty keyboard mapped onto the COSMAC hex keypad
const CONVENTIONAL_KEYMAP: [(char, u8); NUM_KEYS] = [
    ('x', 0x0),
    ('1', 0x1),
    ('2', 0x2),
    ('3', 0x3),
    ('q', 0x4),
    ('w', 0x5),
    ('e', 0x6),
    ('a', 0x7),
    ('s', 0x8),
    ('d', 0x9),
    ('z', 0xA),
    ('c', 0xB),
    ('4', 0xC),
    ('r', 0xD),
    ('f', 0xE),
    ('v', 0xF),
];

/// Frames a key stays down after a press. Terminals only report presses
/// and auto-repeat, never releases.
pub const HOLD_FRAMES: u8 = 8;

pub fn map_key(c: char) -> Option<u8> {
    let c = c.to_ascii_lowercase();
    CONVENTIONAL_KEYMAP
        .iter()
        .find(|(k, _)| *k == c)
        .map(|&(_, key)| key)
}

/// Keeps the terminal in raw mode while alive
pub struct RawMode;

impl RawMode {
    pub fn enable() -> io::Result<RawMode> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Keypad state fed from terminal key events
pub struct Keyboard {
    /// Frames left for each recently pressed key
    held: [u8; NUM_KEYS],
    /// Keys down for the whole session
    fixed: [bool; NUM_KEYS],
}

impl Keyboard {
    pub fn new(hold_keys: &[u8]) -> Keyboard {
        let mut fixed = [false; NUM_KEYS];
        for &key in hold_keys {
            if let Some(slot) = fixed.get_mut(key as usize) {
                *slot = true;
            }
        }
        Keyboard {
            held: [0; NUM_KEYS],
            fixed,
        }
    }

    /// Apply one key event. Returns true when the user asked to quit.
    pub fn handle(&mut self, event: KeyEvent) -> bool {
        match event.code {
            KeyCode::Esc => true,
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => true,
            KeyCode::Char(c) => {
                match map_key(c) {
                    Some(key) => self.held[key as usize] = HOLD_FRAMES,
                    None => debug!("can't map {:?} to a keypad key", c),
                }
                false
            }
            _ => false,
        }
    }

    /// Drain pending terminal events without blocking. Returns true when
    /// the user asked to quit.
    pub fn poll(&mut self) -> io::Result<bool> {
        while poll(Duration::from_millis(0))? {
            if let Event::Key(event) = read()? {
                if self.handle(event) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Keypad for the coming frame; counts down the held keys.
    pub fn keypad(&mut self) -> [bool; NUM_KEYS] {
        let mut keypad = self.fixed;
        for (down, frames) in keypad.iter_mut().zip(self.held.iter_mut()) {
            if *frames > 0 {
                *down = true;
                *frames -= 1;
            }
        }
        keypad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn test_map_key() {
        assert_eq!(map_key('x'), Some(0x0));
        assert_eq!(map_key('4'), Some(0xC));
        assert_eq!(map_key('V'), Some(0xF));
        assert_eq!(map_key('p'), None);
    }

    #[test]
    fn test_keymap_covers_keypad() {
        let mut keys: Vec<u8> = CONVENTIONAL_KEYMAP.iter().map(|&(_, k)| k).collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..NUM_KEYS as u8).collect::<Vec<_>>());
    }

    #[test]
    fn test_press_held_for_frames() {
        let mut keyboard = Keyboard::new(&[]);

        assert!(!keyboard.handle(press('w')));

        for _ in 0..HOLD_FRAMES {
            let keypad = keyboard.keypad();
            assert!(keypad[0x5]);
            assert_eq!(keypad.iter().filter(|&&k| k).count(), 1);
        }
        assert!(keyboard.keypad().iter().all(|&k| !k));
    }

    #[test]
    fn test_hold_keys_always_down() {
        let mut keyboard = Keyboard::new(&[0x1, 0xA]);
        keyboard.handle(press('1'));

        for _ in 0..HOLD_FRAMES as usize + 2 {
            let keypad = keyboard.keypad();
            assert!(keypad[0x1]);
            assert!(keypad[0xA]);
            assert!(!keypad[0x0]);
        }
    }

    #[test]
    fn test_quit_keys() {
        let mut keyboard = Keyboard::new(&[]);

        assert!(keyboard.handle(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(keyboard.handle(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        )));
        assert!(!keyboard.handle(press('c')));
        assert!(keyboard.keypad()[0xB]);
    }
}
