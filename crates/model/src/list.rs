/// Numbering scheme of a list, chosen by the first matching flag in the
/// order roman, greek, dingbats, dingbat-number, lettered, numbered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListKind {
    Roman,
    Greek,
    /// Every item shows the same ZapfDingbats glyph.
    Dingbat { glyph: u8 },
    /// Circled digits from ZapfDingbats, starting at `first`.
    DingbatNumber { first: u8 },
    Lettered,
    Numbered,
    /// Unnumbered list with a custom bullet string.
    Bulleted { symbol: String },
}

impl ListKind {
    /// Label for the 1-based `index`th item.
    ///
    /// Greek and dingbat labels are glyph codes for the Symbol and
    /// ZapfDingbats fonts rather than readable text.
    pub fn label(&self, index: usize, lowercase: bool) -> String {
        match self {
            ListKind::Roman => {
                let numeral = to_roman(index);
                if lowercase {
                    format!("{}.", numeral.to_lowercase())
                } else {
                    format!("{}.", numeral)
                }
            }
            ListKind::Greek => {
                // Symbol font maps latin letters to their greek counterparts.
                let letter = alphabetic(index);
                if lowercase {
                    format!("{}.", letter.to_lowercase())
                } else {
                    format!("{}.", letter)
                }
            }
            ListKind::Dingbat { glyph } => char::from(*glyph).to_string(),
            ListKind::DingbatNumber { first } => {
                // Each circled series has ten glyphs.
                let offset = ((index - 1) % 10) as u8;
                char::from(first.saturating_add(offset)).to_string()
            }
            ListKind::Lettered => {
                let letter = alphabetic(index);
                if lowercase {
                    format!("{}.", letter.to_lowercase())
                } else {
                    format!("{}.", letter)
                }
            }
            ListKind::Numbered => format!("{}.", index),
            ListKind::Bulleted { symbol } => symbol.clone(),
        }
    }
}

/// `1 -> A`, `26 -> Z`, `27 -> AA`.
fn alphabetic(mut index: usize) -> String {
    let mut out = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        out.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Upper-case roman numeral for `n`; zero yields an empty string.
pub fn to_roman(mut n: usize) -> String {
    const TABLE: [(usize, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for (value, numeral) in TABLE {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}
