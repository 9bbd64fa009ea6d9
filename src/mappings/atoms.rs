use crate::events::Atom;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Предопределённые атомы протокола X11 (core protocol, раздел "Predefined Atoms")
pub struct PredefinedAtoms;

pub const NONE: Atom = 0;
pub const ATOM: Atom = 4;
pub const STRING: Atom = 31;
pub const WM_NAME: Atom = 39;
pub const WM_NORMAL_HINTS: Atom = 40;
pub const WM_CLASS: Atom = 67;

static PREDEFINED: &[(&str, Atom)] = &[
    ("ANY", 0),
    ("PRIMARY", 1),
    ("SECONDARY", 2),
    ("ARC", 3),
    ("ATOM", 4),
    ("BITMAP", 5),
    ("CARDINAL", 6),
    ("COLORMAP", 7),
    ("CURSOR", 8),
    ("CUT_BUFFER0", 9),
    ("CUT_BUFFER1", 10),
    ("CUT_BUFFER2", 11),
    ("CUT_BUFFER3", 12),
    ("CUT_BUFFER4", 13),
    ("CUT_BUFFER5", 14),
    ("CUT_BUFFER6", 15),
    ("CUT_BUFFER7", 16),
    ("DRAWABLE", 17),
    ("FONT", 18),
    ("INTEGER", 19),
    ("PIXMAP", 20),
    ("POINT", 21),
    ("RECTANGLE", 22),
    ("RESOURCE_MANAGER", 23),
    ("RGB_COLOR_MAP", 24),
    ("RGB_BEST_MAP", 25),
    ("RGB_BLUE_MAP", 26),
    ("RGB_DEFAULT_MAP", 27),
    ("RGB_GRAY_MAP", 28),
    ("RGB_GREEN_MAP", 29),
    ("RGB_RED_MAP", 30),
    ("STRING", 31),
    ("VISUALID", 32),
    ("WINDOW", 33),
    ("WM_COMMAND", 34),
    ("WM_HINTS", 35),
    ("WM_CLIENT_MACHINE", 36),
    ("WM_ICON_NAME", 37),
    ("WM_ICON_SIZE", 38),
    ("WM_NAME", 39),
    ("WM_NORMAL_HINTS", 40),
    ("WM_SIZE_HINTS", 41),
    ("WM_ZOOM_HINTS", 42),
    ("MIN_SPACE", 43),
    ("NORM_SPACE", 44),
    ("MAX_SPACE", 45),
    ("END_SPACE", 46),
    ("SUPERSCRIPT_X", 47),
    ("SUPERSCRIPT_Y", 48),
    ("SUBSCRIPT_X", 49),
    ("SUBSCRIPT_Y", 50),
    ("UNDERLINE_POSITION", 51),
    ("UNDERLINE_THICKNESS", 52),
    ("STRIKEOUT_ASCENT", 53),
    ("STRIKEOUT_DESCENT", 54),
    ("ITALIC_ANGLE", 55),
    ("X_HEIGHT", 56),
    ("QUAD_WIDTH", 57),
    ("WEIGHT", 58),
    ("POINT_SIZE", 59),
    ("RESOLUTION", 60),
    ("COPYRIGHT", 61),
    ("NOTICE", 62),
    ("FONT_NAME", 63),
    ("FAMILY_NAME", 64),
    ("FULL_NAME", 65),
    ("CAP_HEIGHT", 66),
    ("WM_CLASS", 67),
    ("WM_TRANSIENT_FOR", 68),
];

static NAME_TO_ATOM: Lazy<HashMap<&'static str, Atom>> =
    Lazy::new(|| PREDEFINED.iter().copied().collect());

static ATOM_TO_NAME: Lazy<HashMap<Atom, &'static str>> =
    Lazy::new(|| PREDEFINED.iter().map(|&(name, atom)| (atom, name)).collect());

impl PredefinedAtoms {
    /// Получить атом по имени (регистр важен, как в протоколе)
    pub fn lookup(name: &str) -> Option<Atom> {
        NAME_TO_ATOM.get(name).copied()
    }

    /// Получить имя предопределённого атома
    pub fn name_of(atom: Atom) -> Option<&'static str> {
        ATOM_TO_NAME.get(&atom).copied()
    }

    /// Вся таблица в порядке номеров
    pub fn all() -> &'static [(&'static str, Atom)] {
        PREDEFINED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_matches_constants() {
        assert_eq!(PredefinedAtoms::lookup("ATOM"), Some(ATOM));
        assert_eq!(PredefinedAtoms::lookup("STRING"), Some(STRING));
        assert_eq!(PredefinedAtoms::lookup("WM_CLASS"), Some(WM_CLASS));
        assert_eq!(PredefinedAtoms::lookup("WM_NORMAL_HINTS"), Some(WM_NORMAL_HINTS));
        assert_eq!(PredefinedAtoms::lookup("wm_class"), None);
        assert_eq!(PredefinedAtoms::lookup("_NET_WM_STATE"), None);
    }

    #[test]
    fn test_table_is_dense_and_reversible() {
        let all = PredefinedAtoms::all();
        assert_eq!(all.len(), 69);
        for (index, &(name, atom)) in all.iter().enumerate() {
            assert_eq!(atom as usize, index);
            assert_eq!(PredefinedAtoms::name_of(atom), Some(name));
        }
        assert_eq!(PredefinedAtoms::name_of(69), None);
    }
}
