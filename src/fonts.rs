//! Process-wide system font registration.
//!
//! The font database is loaded at most once per process, however many builds
//! ask for it.

#[cfg(feature = "system-fonts")]
use std::sync::OnceLock;

#[cfg(feature = "system-fonts")]
static SYSTEM_FONTS: OnceLock<fontdb::Database> = OnceLock::new();

/// Loads the host's installed fonts unless that already happened, and returns
/// the number of font faces known.
#[cfg(feature = "system-fonts")]
pub fn register_system_fonts() -> usize {
    let db = SYSTEM_FONTS.get_or_init(|| {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        log::info!("Registered {} system font faces", db.len());
        db
    });
    db.len()
}

#[cfg(not(feature = "system-fonts"))]
pub fn register_system_fonts() -> usize {
    log::warn!("System font registration requested but the 'system-fonts' feature is disabled");
    0
}

pub fn system_fonts_registered() -> bool {
    #[cfg(feature = "system-fonts")]
    {
        SYSTEM_FONTS.get().is_some()
    }
    #[cfg(not(feature = "system-fonts"))]
    {
        false
    }
}

#[cfg(all(test, feature = "system-fonts"))]
mod tests {
    use super::*;

    #[test]
    fn registration_happens_once() {
        let first = register_system_fonts();
        assert!(system_fonts_registered());
        assert_eq!(register_system_fonts(), first);
    }
}
