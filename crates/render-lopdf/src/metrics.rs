use sheaf_style::{Font, FontFamily};
use sheaf_traits::TextMeasure;

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const FALLBACK_WIDTH: u16 = 556;

/// Width estimates for the standard 14 fonts.
///
/// Courier is exact; proportional families use Helvetica's table, widened
/// slightly for bold and narrowed for Times.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFontMetrics;

impl StandardFontMetrics {
    fn char_width(family: FontFamily, c: char) -> u16 {
        match family {
            FontFamily::Courier => 600,
            FontFamily::Symbol | FontFamily::ZapfDingbats => 600,
            FontFamily::Helvetica | FontFamily::TimesRoman => {
                let code = c as u32;
                if (32..=126).contains(&code) {
                    HELVETICA_WIDTHS[(code - 32) as usize]
                } else {
                    FALLBACK_WIDTH
                }
            }
        }
    }
}

impl TextMeasure for StandardFontMetrics {
    fn text_width(&self, text: &str, font: &Font) -> f32 {
        let units: u32 = text
            .chars()
            .map(|c| Self::char_width(font.family, c) as u32)
            .sum();
        let mut width = units as f32 / 1000.0 * font.size;
        if font.family == FontFamily::TimesRoman {
            width *= 0.9;
        }
        if font.style.is_bold() && font.family != FontFamily::Courier {
            width *= 1.05;
        }
        width
    }
}
