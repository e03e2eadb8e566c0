//! Key identifier to Linux key code mapping.
//!
//! Single characters map to the key producing them on a US layout, with
//! shift for uppercase letters and shifted symbols. Longer strings are key
//! names, matched case-insensitively with `_`, `-` and a leading `key_`
//! ignored, so `"Page_Up"`, `"pageup"` and `"KEY_PAGEUP"` are the same key.

use aiokey_core::KeyIdentifier;
use evdev::KeyCode;

/// Key code plus the modifier needed to produce a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chord {
    /// Key to press
    pub key: KeyCode,
    /// Hold left shift around the key
    pub shift: bool,
}

impl Chord {
    const fn plain(key: KeyCode) -> Self {
        Self { key, shift: false }
    }

    const fn shifted(key: KeyCode) -> Self {
        Self { key, shift: true }
    }

    fn holds_shift(self) -> bool {
        self.shift || self.key == KeyCode::KEY_LEFTSHIFT
    }
}

/// Left shift shared between shifted chords and explicit shift bindings.
///
/// Shift goes down with its first holder and up with its last, so releasing
/// `"A"` while a `"shift"` binding is still held leaves shift down.
#[derive(Debug, Default)]
pub struct ShiftState {
    holders: u32,
}

impl ShiftState {
    /// Key events for pressing `chord`, as `(key, down)`.
    pub fn press(&mut self, chord: Chord) -> Vec<(KeyCode, bool)> {
        let mut events = Vec::with_capacity(2);

        if chord.holds_shift() {
            self.holders += 1;
            if self.holders == 1 {
                events.push((KeyCode::KEY_LEFTSHIFT, true));
            }
        }
        if chord.key != KeyCode::KEY_LEFTSHIFT {
            events.push((chord.key, true));
        }

        events
    }

    /// Key events for releasing `chord`, as `(key, down)`.
    pub fn release(&mut self, chord: Chord) -> Vec<(KeyCode, bool)> {
        let mut events = Vec::with_capacity(2);

        if chord.key != KeyCode::KEY_LEFTSHIFT {
            events.push((chord.key, false));
        }
        if chord.holds_shift() {
            // A release with no holder still lifts shift.
            self.holders = self.holders.saturating_sub(1);
            if self.holders == 0 {
                events.push((KeyCode::KEY_LEFTSHIFT, false));
            }
        }

        events
    }
}

const LETTERS: [KeyCode; 26] = [
    KeyCode::KEY_A,
    KeyCode::KEY_B,
    KeyCode::KEY_C,
    KeyCode::KEY_D,
    KeyCode::KEY_E,
    KeyCode::KEY_F,
    KeyCode::KEY_G,
    KeyCode::KEY_H,
    KeyCode::KEY_I,
    KeyCode::KEY_J,
    KeyCode::KEY_K,
    KeyCode::KEY_L,
    KeyCode::KEY_M,
    KeyCode::KEY_N,
    KeyCode::KEY_O,
    KeyCode::KEY_P,
    KeyCode::KEY_Q,
    KeyCode::KEY_R,
    KeyCode::KEY_S,
    KeyCode::KEY_T,
    KeyCode::KEY_U,
    KeyCode::KEY_V,
    KeyCode::KEY_W,
    KeyCode::KEY_X,
    KeyCode::KEY_Y,
    KeyCode::KEY_Z,
];

const DIGITS: [KeyCode; 10] = [
    KeyCode::KEY_0,
    KeyCode::KEY_1,
    KeyCode::KEY_2,
    KeyCode::KEY_3,
    KeyCode::KEY_4,
    KeyCode::KEY_5,
    KeyCode::KEY_6,
    KeyCode::KEY_7,
    KeyCode::KEY_8,
    KeyCode::KEY_9,
];

const FUNCTION_KEYS: [KeyCode; 12] = [
    KeyCode::KEY_F1,
    KeyCode::KEY_F2,
    KeyCode::KEY_F3,
    KeyCode::KEY_F4,
    KeyCode::KEY_F5,
    KeyCode::KEY_F6,
    KeyCode::KEY_F7,
    KeyCode::KEY_F8,
    KeyCode::KEY_F9,
    KeyCode::KEY_F10,
    KeyCode::KEY_F11,
    KeyCode::KEY_F12,
];

/// Resolve a configured key to the chord that produces it.
///
/// Integer identifiers are raw key codes and pass through unchanged. Returns
/// `None` for names with no mapping and codes outside the `u16` range.
pub fn chord(key: &KeyIdentifier) -> Option<Chord> {
    match key {
        KeyIdentifier::Code(code) => {
            u16::try_from(*code).ok().map(|code| Chord::plain(KeyCode::new(code)))
        },
        KeyIdentifier::Named(name) => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => char_chord(c),
                _ => named(name),
            }
        },
    }
}

fn char_chord(c: char) -> Option<Chord> {
    let letter_index = |c: char| (c as u8 - b'a') as usize;

    let chord = match c {
        'a'..='z' => Chord::plain(LETTERS[letter_index(c)]),
        'A'..='Z' => Chord::shifted(LETTERS[letter_index(c.to_ascii_lowercase())]),
        '0'..='9' => Chord::plain(DIGITS[(c as u8 - b'0') as usize]),
        ' ' => Chord::plain(KeyCode::KEY_SPACE),
        '\t' => Chord::plain(KeyCode::KEY_TAB),
        '\n' => Chord::plain(KeyCode::KEY_ENTER),
        '-' => Chord::plain(KeyCode::KEY_MINUS),
        '=' => Chord::plain(KeyCode::KEY_EQUAL),
        '[' => Chord::plain(KeyCode::KEY_LEFTBRACE),
        ']' => Chord::plain(KeyCode::KEY_RIGHTBRACE),
        '\\' => Chord::plain(KeyCode::KEY_BACKSLASH),
        ';' => Chord::plain(KeyCode::KEY_SEMICOLON),
        '\'' => Chord::plain(KeyCode::KEY_APOSTROPHE),
        '`' => Chord::plain(KeyCode::KEY_GRAVE),
        ',' => Chord::plain(KeyCode::KEY_COMMA),
        '.' => Chord::plain(KeyCode::KEY_DOT),
        '/' => Chord::plain(KeyCode::KEY_SLASH),
        '!' => Chord::shifted(KeyCode::KEY_1),
        '@' => Chord::shifted(KeyCode::KEY_2),
        '#' => Chord::shifted(KeyCode::KEY_3),
        '$' => Chord::shifted(KeyCode::KEY_4),
        '%' => Chord::shifted(KeyCode::KEY_5),
        '^' => Chord::shifted(KeyCode::KEY_6),
        '&' => Chord::shifted(KeyCode::KEY_7),
        '*' => Chord::shifted(KeyCode::KEY_8),
        '(' => Chord::shifted(KeyCode::KEY_9),
        ')' => Chord::shifted(KeyCode::KEY_0),
        '_' => Chord::shifted(KeyCode::KEY_MINUS),
        '+' => Chord::shifted(KeyCode::KEY_EQUAL),
        '{' => Chord::shifted(KeyCode::KEY_LEFTBRACE),
        '}' => Chord::shifted(KeyCode::KEY_RIGHTBRACE),
        '|' => Chord::shifted(KeyCode::KEY_BACKSLASH),
        ':' => Chord::shifted(KeyCode::KEY_SEMICOLON),
        '"' => Chord::shifted(KeyCode::KEY_APOSTROPHE),
        '~' => Chord::shifted(KeyCode::KEY_GRAVE),
        '<' => Chord::shifted(KeyCode::KEY_COMMA),
        '>' => Chord::shifted(KeyCode::KEY_DOT),
        '?' => Chord::shifted(KeyCode::KEY_SLASH),
        _ => return None,
    };

    Some(chord)
}

fn named(name: &str) -> Option<Chord> {
    let lower = name.to_ascii_lowercase();
    let base = lower.strip_prefix("key_").unwrap_or(&lower);
    let normalized: String = base.chars().filter(|c| !matches!(c, '_' | '-')).collect();
    let normalized = normalized.as_str();

    if let Some(n) = normalized.strip_prefix('f')
        && let Ok(n) = n.parse::<usize>()
        && (1..=FUNCTION_KEYS.len()).contains(&n)
    {
        return Some(Chord::plain(FUNCTION_KEYS[n - 1]));
    }

    let key = match normalized {
        "space" => KeyCode::KEY_SPACE,
        "enter" | "return" => KeyCode::KEY_ENTER,
        "tab" => KeyCode::KEY_TAB,
        "esc" | "escape" => KeyCode::KEY_ESC,
        "backspace" => KeyCode::KEY_BACKSPACE,
        "delete" | "del" => KeyCode::KEY_DELETE,
        "insert" => KeyCode::KEY_INSERT,
        "home" => KeyCode::KEY_HOME,
        "end" => KeyCode::KEY_END,
        "pageup" => KeyCode::KEY_PAGEUP,
        "pagedown" => KeyCode::KEY_PAGEDOWN,
        "up" => KeyCode::KEY_UP,
        "down" => KeyCode::KEY_DOWN,
        "left" => KeyCode::KEY_LEFT,
        "right" => KeyCode::KEY_RIGHT,
        "shift" | "shiftl" | "leftshift" => KeyCode::KEY_LEFTSHIFT,
        "shiftr" | "rightshift" => KeyCode::KEY_RIGHTSHIFT,
        "ctrl" | "control" | "ctrll" | "leftctrl" => KeyCode::KEY_LEFTCTRL,
        "ctrlr" | "rightctrl" => KeyCode::KEY_RIGHTCTRL,
        "alt" | "altl" | "leftalt" => KeyCode::KEY_LEFTALT,
        "altr" | "altgr" | "rightalt" => KeyCode::KEY_RIGHTALT,
        "meta" | "super" | "cmd" | "cmdl" | "leftmeta" => KeyCode::KEY_LEFTMETA,
        "cmdr" | "rightmeta" => KeyCode::KEY_RIGHTMETA,
        "capslock" => KeyCode::KEY_CAPSLOCK,
        "numlock" => KeyCode::KEY_NUMLOCK,
        "scrolllock" => KeyCode::KEY_SCROLLLOCK,
        "printscreen" | "print" | "sysrq" => KeyCode::KEY_SYSRQ,
        "pause" => KeyCode::KEY_PAUSE,
        "menu" | "compose" => KeyCode::KEY_COMPOSE,
        "mediaplaypause" | "playpause" => KeyCode::KEY_PLAYPAUSE,
        "medianext" | "nextsong" => KeyCode::KEY_NEXTSONG,
        "mediaprevious" | "previoussong" => KeyCode::KEY_PREVIOUSSONG,
        "mediavolumeup" | "volumeup" => KeyCode::KEY_VOLUMEUP,
        "mediavolumedown" | "volumedown" => KeyCode::KEY_VOLUMEDOWN,
        "mediavolumemute" | "mute" => KeyCode::KEY_MUTE,
        _ => return None,
    };

    Some(Chord::plain(key))
}
