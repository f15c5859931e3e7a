use crossterm::event::KeyEvent;

/// All possible messages that drive state transitions.
#[derive(Debug)]
pub enum Msg {
    // -- Input events (raw)
    Key(KeyEvent),
    Resize(u16, u16),

    // -- Updates
    CheckForUpdates,
    AcceptUpdate,
    DeclineUpdate,

    // -- Dialogs
    DismissNotice,

    // -- System
    Tick,
    Quit,
}
