//! AASTeX journal macros
//!
//! ADS exports write journals as LaTeX commands (`journal = {\apj}`) that are
//! defined by the AASTeX class rather than in the `.bib` file. These can be
//! seeded into a [`MacroTable`](crate::MacroTable) or expanded in place.

use std::collections::HashMap;

use lazy_static::lazy_static;

const JOURNALS: &[(&str, &str)] = &[
    // Major astronomical journals
    ("aj", "Astronomical Journal"),
    ("apj", "Astrophysical Journal"),
    ("apjl", "Astrophysical Journal, Letters"),
    ("apjlett", "Astrophysical Journal, Letters"),
    ("apjs", "Astrophysical Journal, Supplement"),
    ("apjsupp", "Astrophysical Journal, Supplement"),
    ("mnras", "Monthly Notices of the Royal Astronomical Society"),
    ("aap", "Astronomy and Astrophysics"),
    ("astap", "Astronomy and Astrophysics"),
    ("aaps", "Astronomy and Astrophysics, Supplement"),
    ("pasp", "Publications of the Astronomical Society of the Pacific"),
    ("pasj", "Publications of the Astronomical Society of Japan"),
    ("pasa", "Publications of the Astronomical Society of Australia"),
    ("araa", "Annual Review of Astronomy and Astrophysics"),
    ("aapr", "Astronomy and Astrophysics Reviews"),
    ("baas", "Bulletin of the American Astronomical Society"),
    ("memras", "Memoirs of the Royal Astronomical Society"),
    ("qjras", "Quarterly Journal of the Royal Astronomical Society"),
    // Planetary and solar
    ("icarus", "Icarus"),
    ("psj", "Planetary Science Journal"),
    ("solphys", "Solar Physics"),
    ("jcap", "Journal of Cosmology and Astroparticle Physics"),
    ("planss", "Planetary and Space Science"),
    ("grl", "Geophysical Research Letters"),
    ("jgr", "Journal of Geophysical Research"),
    // Physics
    ("prl", "Physical Review Letters"),
    ("pra", "Physical Review A"),
    ("prb", "Physical Review B"),
    ("prc", "Physical Review C"),
    ("prd", "Physical Review D"),
    ("pre", "Physical Review E"),
    ("physrep", "Physics Reports"),
    ("physscr", "Physica Scripta"),
    ("nphysa", "Nuclear Physics A"),
    // General science
    ("nat", "Nature"),
    ("sci", "Science"),
    ("ssr", "Space Science Reviews"),
    ("apss", "Astrophysics and Space Science"),
    ("na", "New Astronomy"),
    ("nar", "New Astronomy Review"),
    ("skytel", "Sky & Telescope"),
    ("gca", "Geochimica et Cosmochimica Acta"),
    ("jcp", "Journal of Chemical Physics"),
];

lazy_static! {
    static ref MACROS: HashMap<&'static str, &'static str> = JOURNALS.iter().copied().collect();
}

/// Full journal name for `\apj`, `apj`, `APJ`, ...
pub fn expand_journal_macro(value: &str) -> Option<&'static str> {
    let trimmed = value.trim();
    let name = trimmed.strip_prefix('\\').unwrap_or(trimmed);
    MACROS.get(name.to_lowercase().as_str()).copied()
}

pub fn is_journal_macro(value: &str) -> bool {
    expand_journal_macro(value).is_some()
}

/// All known macro names, sorted
pub fn journal_macro_names() -> Vec<&'static str> {
    let mut names: Vec<_> = MACROS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Name/expansion pairs for seeding a macro table
pub(crate) fn journal_macros() -> impl Iterator<Item = (&'static str, &'static str)> {
    JOURNALS.iter().copied()
}
