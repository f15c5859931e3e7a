/// What the shell is currently waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Normal mode: plugin overview and global keys.
    #[default]
    Normal,
    /// A notice is open and any key dismisses it.
    Notice,
    /// An update offer awaits accept or decline.
    UpdateOffer,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Notice => "NOTICE",
            Mode::UpdateOffer => "UPDATE",
        }
    }
}
