/// Nerd Font icons used by the users console
///
/// Every icon has a plain-text fallback for terminals without a patched font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NerdFont {
    Users,
    UserPlus,
    Search,
    Ban,
    Unlock,
    Trash,
    Shield,
    Refresh,
    Warning,
}

impl NerdFont {
    /// Get the Unicode character for this nerd font icon
    pub const fn unicode(&self) -> char {
        match self {
            Self::Users => '\u{f0c0}',          // fa-users
            Self::UserPlus => '\u{f234}',       // fa-user-plus
            Self::Search => '\u{f002}',         // fa-search
            Self::Ban => '\u{f05e}',            // fa-ban
            Self::Unlock => '\u{f09c}',         // fa-unlock
            Self::Trash => '\u{f1f8}',          // fa-trash
            Self::Shield => '\u{f132}',         // fa-shield
            Self::Refresh => '\u{f021}',        // fa-refresh
            Self::Warning => '\u{f071}',        // fa-exclamation-triangle
        }
    }

    /// Text shown instead of the glyph when icons are disabled
    pub const fn fallback(&self) -> &'static str {
        match self {
            Self::Users => "Users",
            Self::UserPlus => "+",
            Self::Search => "/",
            Self::Ban => "Suspend",
            Self::Unlock => "Unlock",
            Self::Trash => "Delete",
            Self::Shield => "*",
            Self::Refresh => "~",
            Self::Warning => "!",
        }
    }

    pub fn render(&self, use_glyphs: bool) -> String {
        if use_glyphs {
            self.unicode().to_string()
        } else {
            self.fallback().to_string()
        }
    }
}
