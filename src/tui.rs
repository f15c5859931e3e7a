use std::io::{self, Stdout};

use anyhow::{Context, Result};
use crossterm::cursor::Show;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::app::{App, render_notice_overlay};
use crate::guard::CriticalDialog;
use crate::report::Notice;

/// Raw-mode alternate screen. Restored when dropped, including during unwind.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    pub fn enter(title: &str) -> Result<Self> {
        enable_raw_mode().context("enable raw mode")?;

        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen, SetTitle(title)) {
            restore();
            return Err(err).context("enter alternate screen");
        }

        match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(err) => {
                restore();
                Err(err).context("create terminal")
            }
        }
    }

    pub fn draw(&mut self, app: &App) -> Result<()> {
        self.terminal.draw(|frame| app.view(frame))?;
        Ok(())
    }

    /// Render `notice` full screen and block until a key is pressed.
    pub fn show_critical(&mut self, notice: &Notice) -> Result<()> {
        loop {
            self.terminal
                .draw(|frame| render_notice_overlay(frame, notice, "press any key to exit"))?;

            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(());
                }
            }
        }
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        restore();
    }
}

fn restore() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
}

/// Critical dialog on a fresh terminal session. Fails when no terminal can
/// be entered (not a tty), which the guard tolerates.
#[derive(Debug, Default)]
pub struct TerminalDialog;

impl CriticalDialog for TerminalDialog {
    fn show_critical(&mut self, notice: &Notice) -> Result<()> {
        let mut tui = Tui::enter(&notice.title)?;
        tui.show_critical(notice)
    }
}
