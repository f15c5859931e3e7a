use anyhow::Context;

use crate::app::App;
use crate::report::Notice;
use crate::tui::Tui;
use crate::update::UpdatePrompt;

/// The top-level visual container, as seen by the bootstrap sequence.
pub trait Shell {
    /// Make the shell visible. Called exactly once, before any update UI.
    fn show(&mut self) -> anyhow::Result<()>;

    /// Present a notice without blocking the caller.
    fn notify(&mut self, notice: Notice);

    /// Present an update offer; the shell resolves it on user input.
    fn offer_update(&mut self, prompt: UpdatePrompt);
}

/// The terminal shell. The screen is only taken over on [`Shell::show`].
pub struct TerminalShell {
    tui: Option<Tui>,
    pub app: App,
}

impl TerminalShell {
    pub fn new(app: App) -> Self {
        Self { tui: None, app }
    }

    pub fn draw(&mut self) -> anyhow::Result<()> {
        let Some(tui) = self.tui.as_mut() else {
            anyhow::bail!("terminal shell drawn before it was shown");
        };
        tui.draw(&self.app)
    }
}

impl Shell for TerminalShell {
    fn show(&mut self) -> anyhow::Result<()> {
        if self.tui.is_none() {
            let tui = Tui::enter(&self.app.title()).context("enter terminal")?;
            self.tui = Some(tui);
        }
        self.draw()
    }

    fn notify(&mut self, notice: Notice) {
        self.app.push_notice(notice);
    }

    fn offer_update(&mut self, prompt: UpdatePrompt) {
        self.app.offer_update(prompt);
    }
}
