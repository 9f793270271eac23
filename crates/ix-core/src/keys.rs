//! Key name redaction.
//!
//! Key events carry timing only. The key name survives capture only when it
//! belongs to a closed allow-list of navigation, editing and function keys.
//! Literal characters resolve to no key name at all, and modifier-only presses
//! are not recorded.

use serde::{Deserialize, Serialize};

/// Navigation, editing and function keys whose names may be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllowedKey {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    PageUp,
    PageDown,
    Tab,
    Enter,
    Escape,
    Backspace,
    Delete,
    Insert,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl AllowedKey {
    /// Every allow-listed key.
    pub const ALL: [Self; 26] = [
        Self::ArrowUp,
        Self::ArrowDown,
        Self::ArrowLeft,
        Self::ArrowRight,
        Self::Home,
        Self::End,
        Self::PageUp,
        Self::PageDown,
        Self::Tab,
        Self::Enter,
        Self::Escape,
        Self::Backspace,
        Self::Delete,
        Self::Insert,
        Self::F1,
        Self::F2,
        Self::F3,
        Self::F4,
        Self::F5,
        Self::F6,
        Self::F7,
        Self::F8,
        Self::F9,
        Self::F10,
        Self::F11,
        Self::F12,
    ];

    /// Key name as reported by the platform.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ArrowUp => "ArrowUp",
            Self::ArrowDown => "ArrowDown",
            Self::ArrowLeft => "ArrowLeft",
            Self::ArrowRight => "ArrowRight",
            Self::Home => "Home",
            Self::End => "End",
            Self::PageUp => "PageUp",
            Self::PageDown => "PageDown",
            Self::Tab => "Tab",
            Self::Enter => "Enter",
            Self::Escape => "Escape",
            Self::Backspace => "Backspace",
            Self::Delete => "Delete",
            Self::Insert => "Insert",
            Self::F1 => "F1",
            Self::F2 => "F2",
            Self::F3 => "F3",
            Self::F4 => "F4",
            Self::F5 => "F5",
            Self::F6 => "F6",
            Self::F7 => "F7",
            Self::F8 => "F8",
            Self::F9 => "F9",
            Self::F10 => "F10",
            Self::F11 => "F11",
            Self::F12 => "F12",
        }
    }

    fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

/// Platform names of keys that only modify other keys.
const MODIFIERS: &[&str] = &[
    "Shift",
    "Control",
    "Alt",
    "AltGraph",
    "Meta",
    "OS",
    "Super",
    "Hyper",
    "Fn",
    "FnLock",
    "CapsLock",
    "NumLock",
    "ScrollLock",
    "Symbol",
    "SymbolLock",
];

/// How a raw key name is treated by the key capturer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// Record timing and the key name.
    Allowed(AllowedKey),
    /// Record timing only; the name is content and is dropped.
    Content,
    /// Do not record the press at all.
    Modifier,
}

/// Classifies a raw platform key name.
///
/// Matching is exact: `"enter"` is not `"Enter"` and is treated as content.
pub fn classify(raw: &str) -> KeyClass {
    if MODIFIERS.contains(&raw) {
        return KeyClass::Modifier;
    }
    AllowedKey::lookup(raw).map_or(KeyClass::Content, KeyClass::Allowed)
}
