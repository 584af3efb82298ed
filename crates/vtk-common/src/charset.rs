/// A 7-bit graphics character set assignable into G0-G3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterSet {
    UsAscii,
    Uk,
    DecSpecialGraphics,
    DecSupplemental,
    Rom,
    RomSpecial,
    Vt52Graphics,
    Nrc(NrcSet),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NrcSet {
    Dutch,
    Finnish,
    French,
    FrenchCanadian,
    German,
    Italian,
    SwedishNorwegian,
    /// Spanish has no dedicated table in this implementation; it is
    /// treated as an alias of the nearest implemented NRC set.
    Spanish,
    /// Likewise Swiss aliases French.
    Swiss,
}

impl Default for CharacterSet {
    fn default() -> Self {
        CharacterSet::UsAscii
    }
}

/// DEC Special Graphics (VT100 line-drawing) maps 0x60-0x7e onto box-drawing
/// glyphs. Anything outside that range passes through unchanged.
fn translate_dec_special_graphics(ch: char) -> char {
    match ch {
        '`' => '\u{25C6}', // diamond
        'a' => '\u{2592}', // checkerboard
        'b' => '\u{2409}', // HT symbol
        'c' => '\u{240C}', // FF symbol
        'd' => '\u{240D}', // CR symbol
        'e' => '\u{240A}', // LF symbol
        'f' => '\u{00B0}', // degree
        'g' => '\u{00B1}', // plus/minus
        'h' => '\u{2424}', // NL symbol
        'i' => '\u{240B}', // VT symbol
        'j' => '\u{2518}', // lower-right corner
        'k' => '\u{2510}', // upper-right corner
        'l' => '\u{250C}', // upper-left corner
        'm' => '\u{2514}', // lower-left corner
        'n' => '\u{253C}', // crossing lines
        'o' => '\u{23BA}', // scan line 1
        'p' => '\u{23BB}', // scan line 3
        'q' => '\u{2500}', // horizontal line
        'r' => '\u{23BC}', // scan line 7
        's' => '\u{23BD}', // scan line 9
        't' => '\u{251C}', // left tee
        'u' => '\u{2524}', // right tee
        'v' => '\u{2534}', // bottom tee
        'w' => '\u{252C}', // top tee
        'x' => '\u{2502}', // vertical line
        'y' => '\u{2264}', // less-or-equal
        'z' => '\u{2265}', // greater-or-equal
        '{' => '\u{03C0}', // pi
        '|' => '\u{2260}', // not-equal
        '}' => '\u{00A3}', // UK pound
        '~' => '\u{00B7}', // centered dot
        other => other,
    }
}

/// UK National Replacement Character set: identical to US-ASCII except `#`
/// becomes the pound sign.
fn translate_uk(ch: char) -> char {
    if ch == '#' {
        '\u{00A3}'
    } else {
        ch
    }
}

fn translate_nrc(ch: char, set: NrcSet) -> char {
    use NrcSet::*;
    // Each NRC set replaces a handful of ASCII code points (typically
    // @[\]{|} plus one or two others) with the accented letters and
    // punctuation of the national keyboard it models.
    let table: &[(char, char)] = match set {
        Dutch => &[
            ('#', '\u{00A3}'), ('@', '\u{00BE}'), ('[', '\u{0133}'), ('\\', '\u{00BD}'),
            (']', '|'), ('{', '\u{00A8}'), ('|', 'f'), ('}', '\u{00BC}'), ('~', '\u{00B4}'),
        ],
        Finnish => &[
            ('[', '\u{00C4}'), ('\\', '\u{00D6}'), (']', '\u{00C5}'), ('^', '\u{00DC}'),
            ('`', '\u{00E9}'), ('{', '\u{00E4}'), ('|', '\u{00F6}'), ('}', '\u{00E5}'), ('~', '\u{00FC}'),
        ],
        French => &[
            ('#', '\u{00A3}'), ('@', '\u{00E0}'), ('[', '\u{00B0}'), ('\\', '\u{00E7}'),
            (']', '\u{00A7}'), ('{', '\u{00E9}'), ('|', '\u{00F9}'), ('}', '\u{00E8}'), ('~', '\u{00A8}'),
        ],
        FrenchCanadian => &[
            ('@', '\u{00E0}'), ('[', '\u{00E2}'), ('\\', '\u{00E7}'), (']', '\u{00EA}'),
            ('^', '\u{00EE}'), ('`', '\u{00F4}'), ('{', '\u{00E9}'), ('|', '\u{00F9}'), ('}', '\u{00E8}'), ('~', '\u{00FB}'),
        ],
        German => &[
            ('@', '\u{00A7}'), ('[', '\u{00C4}'), ('\\', '\u{00D6}'), (']', '\u{00DC}'),
            ('{', '\u{00E4}'), ('|', '\u{00F6}'), ('}', '\u{00FC}'), ('~', '\u{00DF}'),
        ],
        Italian => &[
            ('#', '\u{00A3}'), ('@', '\u{00A7}'), ('[', '\u{00B0}'), ('\\', '\u{00E7}'),
            (']', '\u{00E9}'), ('`', '\u{00F9}'), ('{', '\u{00E0}'), ('|', '\u{00F2}'), ('}', '\u{00E8}'), ('~', '\u{00EC}'),
        ],
        SwedishNorwegian => &[
            ('@', '\u{00C9}'), ('[', '\u{00C4}'), ('\\', '\u{00D6}'), (']', '\u{00C5}'),
            ('^', '\u{00DC}'), ('`', '\u{00E9}'), ('{', '\u{00E4}'), ('|', '\u{00F6}'), ('}', '\u{00E5}'), ('~', '\u{00FC}'),
        ],
        Spanish => return translate_nrc(ch, SwedishNorwegian),
        Swiss => return translate_nrc(ch, French),
    };
    table
        .iter()
        .find(|(from, _)| *from == ch)
        .map(|(_, to)| *to)
        .unwrap_or(ch)
}

/// Translate a 7-bit printable character through the given graphics set.
pub fn translate(ch: char, set: CharacterSet) -> char {
    match set {
        CharacterSet::UsAscii | CharacterSet::Rom | CharacterSet::RomSpecial | CharacterSet::Vt52Graphics => ch,
        CharacterSet::Uk => translate_uk(ch),
        CharacterSet::DecSpecialGraphics => translate_dec_special_graphics(ch),
        CharacterSet::DecSupplemental => ch,
        CharacterSet::Nrc(nrc) => translate_nrc(ch, nrc),
    }
}
