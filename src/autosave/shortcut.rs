/// A key press with its modifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyChord {
    pub key: char,
    pub ctrl: bool,
    /// Cmd on macOS
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

impl KeyChord {
    pub fn new(key: char) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    pub fn ctrl(key: char) -> Self {
        Self {
            key,
            ctrl: true,
            ..Self::default()
        }
    }

    pub fn cmd(key: char) -> Self {
        Self {
            key,
            meta: true,
            ..Self::default()
        }
    }

    /// Ctrl+S or Cmd+S, with or without Shift
    pub fn is_save_shortcut(&self) -> bool {
        self.key.eq_ignore_ascii_case(&'s') && (self.ctrl || self.meta) && !self.alt
    }
}
