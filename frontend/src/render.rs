use std::io::{self, Write};

use chip8_vm_core::SCREEN_WIDTH;
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};

use crate::color::Rgb;

/// Draws the framebuffer into the terminal, two characters per pixel.
pub struct TerminalRenderer {
    foreground: Rgb,
    background: Rgb,
    cleared: bool,
}

impl TerminalRenderer {
    pub fn new(foreground: Rgb, background: Rgb) -> TerminalRenderer {
        TerminalRenderer {
            foreground,
            background,
            cleared: false,
        }
    }

    fn queue_row(&self, out: &mut impl Write, row: &[u8]) -> io::Result<()> {
        let pixels: String = row
            .iter()
            .map(|&pxl| if pxl > 0 { "██" } else { "  " })
            .collect();
        queue!(
            out,
            SetForegroundColor(self.foreground.into()),
            SetBackgroundColor(self.background.into()),
            Print(pixels),
            ResetColor
        )
    }

    /// Print the frame below the cursor, one line per row.
    pub fn frame(&self, out: &mut impl Write, display: &[u8]) -> io::Result<()> {
        for row in display.chunks(SCREEN_WIDTH) {
            self.queue_row(out, row)?;
            queue!(out, Print("\n"))?;
        }
        out.flush()
    }

    /// Redraw the frame in place at the top left corner, clearing the
    /// terminal on the first call.
    pub fn draw(&mut self, out: &mut impl Write, display: &[u8]) -> io::Result<()> {
        if !self.cleared {
            queue!(out, Clear(ClearType::All))?;
            self.cleared = true;
        }
        for (y, row) in display.chunks(SCREEN_WIDTH).enumerate() {
            queue!(out, MoveTo(0, y as u16))?;
            self.queue_row(out, row)?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chip8_vm_core::SCREEN_HEIGHT;

    fn test_display() -> Vec<u8> {
        let mut display = vec![0u8; SCREEN_WIDTH * SCREEN_HEIGHT];
        display[0] = 1;
        display[SCREEN_WIDTH * 2 + 63] = 1;
        display
    }

    #[test]
    fn test_frame_layout() {
        let renderer = TerminalRenderer::new(Rgb::new(255, 255, 255), Rgb::new(0, 0, 0));
        let mut out = Vec::new();

        renderer.frame(&mut out, &test_display()).unwrap();

        let frame = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = frame.lines().collect();
        assert_eq!(lines.len(), SCREEN_HEIGHT);
        assert!(lines[0].contains("██    "));
        assert_eq!(lines[1].matches('█').count(), 0);
        assert_eq!(lines[2].matches('█').count(), 2);
        assert!(lines[2].contains(&format!("{}██", " ".repeat(2 * 63))));
    }

    #[test]
    fn test_draw_clears_once() {
        let mut renderer = TerminalRenderer::new(Rgb::new(255, 255, 255), Rgb::new(0, 0, 0));
        let display = test_display();
        let (mut first, mut second) = (Vec::new(), Vec::new());

        renderer.draw(&mut first, &display).unwrap();
        renderer.draw(&mut second, &display).unwrap();

        let first = String::from_utf8(first).unwrap();
        let second = String::from_utf8(second).unwrap();
        assert!(first.contains("\x1b[2J"));
        assert!(!second.contains("\x1b[2J"));
        assert_eq!(second.matches('█').count(), 4);
        assert!(!second.contains('\n'));
        // One cursor move per row
        assert_eq!(second.matches('H').count(), SCREEN_HEIGHT);
        assert!(second.starts_with("\x1b[1;1H"));
    }
}
