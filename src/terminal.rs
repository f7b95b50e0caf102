use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{poll, read, Event, KeyCode, KeyModifiers},
    execute,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{
        disable_raw_mode, enable_raw_mode, size, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use std::io::{self, stdout, Write};
use std::time::Duration;

/// Terminal abstraction for rendering
///
/// Draws into an in-memory cell buffer and flushes it with [`present`].
/// Created with [`with_size`] it never touches the real terminal, which is
/// how sink tests inspect what was drawn.
///
/// [`present`]: Terminal::present
/// [`with_size`]: Terminal::with_size
pub struct Terminal {
    width: u16,
    height: u16,
    buffer: Vec<Vec<Cell>>,
    alternate_screen: bool,
}

/// A single cell in the terminal buffer
#[derive(Clone, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub fg: Option<Color>,
    pub bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: None,
            bold: false,
        }
    }
}

impl Terminal {
    /// Initialize the terminal for drawing
    pub fn new(alternate_screen: bool) -> io::Result<Self> {
        let (width, height) = size()?;

        if alternate_screen {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide)?;
        }

        Ok(Self::buffer_only(width, height, alternate_screen))
    }

    /// Buffer-only terminal of a fixed size, for tests and offline drawing
    pub fn with_size(width: u16, height: u16) -> Self {
        Self::buffer_only(width, height, false)
    }

    fn buffer_only(width: u16, height: u16, alternate_screen: bool) -> Self {
        Self {
            width,
            height,
            buffer: vec![vec![Cell::default(); width as usize]; height as usize],
            alternate_screen,
        }
    }

    /// Get terminal dimensions
    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Resize the buffer, dropping previous contents
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.buffer = vec![vec![Cell::default(); width as usize]; height as usize];
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        for row in &mut self.buffer {
            for cell in row {
                *cell = Cell::default();
            }
        }
    }

    /// Clear the actual terminal
    pub fn clear_screen(&self) -> io::Result<()> {
        execute!(stdout(), Clear(ClearType::All))?;
        Ok(())
    }

    /// Set a character at position with optional color
    pub fn set(&mut self, x: i32, y: i32, ch: char, fg: Option<Color>, bold: bool) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            self.buffer[y as usize][x as usize] = Cell { ch, fg, bold };
        }
    }

    /// Set a string starting at position
    pub fn set_str(&mut self, x: i32, y: i32, s: &str, fg: Option<Color>, bold: bool) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i as i32, y, ch, fg, bold);
        }
    }

    /// Read back a cell, if in bounds
    pub fn cell(&self, x: i32, y: i32) -> Option<&Cell> {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            Some(&self.buffer[y as usize][x as usize])
        } else {
            None
        }
    }

    /// Render the entire buffer to screen
    pub fn present(&self) -> io::Result<()> {
        let mut stdout = stdout();

        for (y, row) in self.buffer.iter().enumerate() {
            execute!(stdout, MoveTo(0, y as u16))?;

            for cell in row {
                if cell.bold {
                    execute!(stdout, SetAttribute(Attribute::Bold))?;
                }

                if let Some(color) = cell.fg {
                    execute!(stdout, SetForegroundColor(color), Print(cell.ch), ResetColor)?;
                } else {
                    execute!(stdout, Print(cell.ch))?;
                }

                if cell.bold {
                    execute!(stdout, SetAttribute(Attribute::Reset))?;
                }
            }
        }

        stdout.flush()?;
        Ok(())
    }

    /// Check for keypress (non-blocking), returns (code, modifiers)
    pub fn check_key(&self) -> io::Result<Option<(KeyCode, KeyModifiers)>> {
        if poll(Duration::from_millis(0))? {
            if let Event::Key(key_event) = read()? {
                return Ok(Some((key_event.code, key_event.modifiers)));
            }
        }
        Ok(None)
    }

    /// Sleep for specified duration
    pub fn sleep(&self, seconds: f32) {
        std::thread::sleep(Duration::from_secs_f32(seconds.max(0.0)));
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.alternate_screen {
            let _ = execute!(stdout(), Show, LeaveAlternateScreen);
            let _ = disable_raw_mode();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_ignores_out_of_bounds_writes() {
        let mut term = Terminal::with_size(10, 4);
        term.set(-1, 0, 'x', None, false);
        term.set(10, 0, 'x', None, false);
        term.set(0, 4, 'x', None, false);
        term.set(3, 2, 'x', None, false);

        assert_eq!(term.cell(3, 2).unwrap().ch, 'x');
        assert!(term.cell(10, 0).is_none());
    }

    #[test]
    fn set_str_clips_at_the_edge() {
        let mut term = Terminal::with_size(5, 1);
        term.set_str(3, 0, "abcd", None, false);
        assert_eq!(term.cell(3, 0).unwrap().ch, 'a');
        assert_eq!(term.cell(4, 0).unwrap().ch, 'b');
    }

    #[test]
    fn resize_resets_contents() {
        let mut term = Terminal::with_size(4, 4);
        term.set(0, 0, 'x', None, false);
        term.resize(8, 2);
        assert_eq!(term.size(), (8, 2));
        assert_eq!(term.cell(0, 0).unwrap().ch, ' ');
    }
}
