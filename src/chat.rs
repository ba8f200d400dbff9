//! Chat color palette and text styling flags
//!
//! The sixteen named colors carry both a foreground RGB and the darker
//! shadow RGB used for drop shadows. Legacy single-character codes
//! (`&c`, `&l`, ...) map onto the same palette.

/// The sixteen named palette colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    White,
}

/// (color, legacy code, markup name, foreground RGB, shadow RGB)
const PALETTE: [(ChatColor, char, &str, u32, u32); 16] = [
    (ChatColor::Black, '0', "BLACK", 0x000000, 0x000000),
    (ChatColor::DarkBlue, '1', "DARK_BLUE", 0x0000AA, 0x00002A),
    (ChatColor::DarkGreen, '2', "DARK_GREEN", 0x00AA00, 0x002A00),
    (ChatColor::DarkAqua, '3', "DARK_AQUA", 0x00AAAA, 0x002A2A),
    (ChatColor::DarkRed, '4', "DARK_RED", 0xAA0000, 0x2A0000),
    (ChatColor::DarkPurple, '5', "DARK_PURPLE", 0xAA00AA, 0x2A002A),
    (ChatColor::Gold, '6', "GOLD", 0xFFAA00, 0x2A2A00),
    (ChatColor::Gray, '7', "GRAY", 0xAAAAAA, 0x2A2A2A),
    (ChatColor::DarkGray, '8', "DARK_GRAY", 0x555555, 0x151515),
    (ChatColor::Blue, '9', "BLUE", 0x5555FF, 0x15153F),
    (ChatColor::Green, 'a', "GREEN", 0x55FF55, 0x153F15),
    (ChatColor::Aqua, 'b', "AQUA", 0x55FFFF, 0x153F3F),
    (ChatColor::Red, 'c', "RED", 0xFF5555, 0x3F1515),
    (ChatColor::LightPurple, 'd', "LIGHT_PURPLE", 0xFF55FF, 0x3F153F),
    (ChatColor::Yellow, 'e', "YELLOW", 0xFFFF55, 0x3F3F15),
    (ChatColor::White, 'f', "WHITE", 0xFFFFFF, 0x3F3F3F),
];

impl ChatColor {
    fn entry(self) -> &'static (ChatColor, char, &'static str, u32, u32) {
        PALETTE.iter().find(|e| e.0 == self).expect("palette covers all variants")
    }

    /// Legacy single-character code (`c` for red, etc).
    pub fn code(self) -> char {
        self.entry().1
    }

    /// Markup tag name (`RED`, `DARK_PURPLE`, ...).
    pub fn name(self) -> &'static str {
        self.entry().2
    }

    /// Foreground color.
    pub fn rgb(self) -> [u8; 3] {
        unpack(self.entry().3)
    }

    /// Drop-shadow color.
    pub fn shadow(self) -> [u8; 3] {
        unpack(self.entry().4)
    }

    /// Look up a color by its markup name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        PALETTE.iter().find(|e| e.2.eq_ignore_ascii_case(name)).map(|e| e.0)
    }

    /// Look up a color by its legacy code character.
    pub fn from_code(code: char) -> Option<Self> {
        let code = code.to_ascii_lowercase();
        PALETTE.iter().find(|e| e.1 == code).map(|e| e.0)
    }
}

fn unpack(rgb: u32) -> [u8; 3] {
    [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8]
}

/// Resolved foreground color of a styled run: either a palette color or a
/// literal RGB value from a `%%#RRGGBB%%` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextColor {
    Named(ChatColor),
    Rgb([u8; 3]),
}

impl TextColor {
    pub fn rgb(self) -> [u8; 3] {
        match self {
            TextColor::Named(c) => c.rgb(),
            TextColor::Rgb(rgb) => rgb,
        }
    }

    /// Shadow color: palette colors have a fixed shadow, literal colors use
    /// a quarter-brightness version of themselves.
    pub fn shadow(self) -> [u8; 3] {
        match self {
            TextColor::Named(c) => c.shadow(),
            TextColor::Rgb([r, g, b]) => [r / 4, g / 4, b / 4],
        }
    }
}

/// Boolean style flags carried by a styled run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub bold: bool,
    pub italic: bool,
    pub underlined: bool,
    pub strikethrough: bool,
    pub obfuscated: bool,
}

impl Style {
    pub fn is_plain(self) -> bool {
        self == Style::default()
    }

    /// Legacy code sequence (`&l&o`...) reproducing these flags, used when a
    /// tag substitution needs to restore the surrounding style.
    pub fn legacy_codes(self) -> String {
        let mut out = String::new();
        if self.bold {
            out.push_str("&l");
        }
        if self.italic {
            out.push_str("&o");
        }
        if self.strikethrough {
            out.push_str("&m");
        }
        if self.underlined {
            out.push_str("&n");
        }
        if self.obfuscated {
            out.push_str("&k");
        }
        out
    }
}
