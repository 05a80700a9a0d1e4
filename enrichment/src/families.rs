//! Product families: directory layout, input mode and price bands.

use std::path::{Path, PathBuf};

use crate::validator::PriceFilter;

/// How a family's input tables are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// One `input_<category>.tsv` per category in `inputs/`.
    PerCategory,
    /// A single `input_<category>.tsv` holding every category.
    Single(&'static str),
}

/// A product family with its own directories, ledger and price rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Family {
    /// Directory name under the catalogue root.
    pub name: &'static str,
    /// Input table layout.
    pub input: InputMode,
    bands: &'static [(&'static str, f64, f64)],
    catch_all: Option<(f64, f64)>,
}

/// Every built-in family, in processing order.
pub const FAMILIES: [Family; 8] = [
    Family {
        name: "Bass",
        input: InputMode::PerCategory,
        bands: &[
            ("Baffles Basse", 250.0, 5000.0),
            ("Contrebasse", 500.0, 5000.0),
            ("Tête Basse", 250.0, 5000.0),
            ("Combo Basse", 250.0, 5000.0),
            ("Pédales Basse", 25.0, 600.0),
            ("Basses Electriques", 400.0, 10000.0),
        ],
        catch_all: None,
    },
    Family {
        name: "DJ",
        input: InputMode::PerCategory,
        bands: &[
            ("Platine CD / CD player", 600.0, 3000.0),
            ("Platine vinyl / Vinyl", 600.0, 5000.0),
            ("Mixette", 100.0, 4000.0),
            ("Effets DJ / DJ FX", 100.0, 800.0),
        ],
        catch_all: None,
    },
    Family {
        name: "Drums",
        input: InputMode::PerCategory,
        bands: &[
            ("Batteries Électroniques", 300.0, 10000.0),
            ("Cymbales", 59.0, 1900.0),
            ("Percussions Classiques", 700.0, 25000.0),
            ("Percussions Latines", 15.0, 1300.0),
            ("Accessoires de Batterie", 40.0, 500.0),
            ("Batteries Acoust.", 300.0, 10000.0),
            ("Caisses Claires", 80.0, 3000.0),
        ],
        catch_all: None,
    },
    Family {
        name: "Guitars",
        input: InputMode::PerCategory,
        bands: &[
            ("Baffles Guitare", 250.0, 5000.0),
            ("Guitares Electriques", 400.0, 10000.0),
            ("Accessoires Guitare", 15.0, 300.0),
            ("Pédales Guitare", 25.0, 600.0),
            ("Guitares Acoustiques", 100.0, 10000.0),
            ("Tête Guitare", 250.0, 5000.0),
            ("Combo Guitare", 250.0, 5000.0),
        ],
        catch_all: None,
    },
    Family {
        name: "Keyboards",
        input: InputMode::PerCategory,
        bands: &[
            ("Piano numérique", 200.0, 20000.0),
            ("Clavier MIDI", 50.0, 1400.0),
            ("Piano electrique", 1500.0, 15000.0),
            ("Pédales Clavier", 90.0, 400.0),
            ("Amplis clavier", 300.0, 5000.0),
            ("Clavier de scene", 900.0, 15000.0),
            ("Workstation", 500.0, 5000.0),
            ("Synthétiseur", 150.0, 3500.0),
            ("Orgue", 400.0, 5000.0),
        ],
        catch_all: None,
    },
    Family {
        name: "Mics",
        input: InputMode::Single("Microphones"),
        bands: &[],
        catch_all: Some((80.0, 1900.0)),
    },
    Family {
        name: "Other",
        input: InputMode::Single("Accessoires"),
        bands: &[],
        catch_all: Some((15.0, 300.0)),
    },
    Family {
        name: "Sono",
        input: InputMode::PerCategory,
        bands: &[
            ("Tables de mixage", 100.0, 10000.0),
            ("Set de Sonorisation", 200.0, 5000.0),
            ("Enceintes de Sonorisation", 200.0, 5000.0),
        ],
        catch_all: None,
    },
];

impl Family {
    /// Looks a family up by name, ignoring case.
    #[must_use]
    pub fn by_name(name: &str) -> Option<&'static Self> {
        FAMILIES.iter().find(|family| family.name.eq_ignore_ascii_case(name))
    }

    /// Names of every built-in family.
    pub fn names() -> impl Iterator<Item = &'static str> {
        FAMILIES.iter().map(|family| family.name)
    }

    /// Price filter enforcing this family's bands.
    #[must_use]
    pub fn price_filter(&self) -> PriceFilter {
        let filter = self
            .bands
            .iter()
            .fold(PriceFilter::new(), |filter, (category, low, high)| {
                filter.with_band(*category, *low, *high)
            });
        match self.catch_all {
            Some((low, high)) => filter.with_catch_all(low, high),
            None => filter,
        }
    }

    /// Directory layout of this family under the catalogue `root`.
    #[must_use]
    pub fn layout(&self, root: &Path) -> FamilyLayout {
        FamilyLayout::new(root.join(self.name))
    }
}

/// Paths of one family directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyLayout {
    /// Family directory.
    pub dir: PathBuf,
}

impl FamilyLayout {
    /// Layout rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Ledger and agent prompt directory.
    #[must_use]
    pub fn src(&self) -> PathBuf {
        self.dir.join("src")
    }

    /// Context ledger document.
    #[must_use]
    pub fn ledger(&self) -> PathBuf {
        self.src().join("context.json")
    }

    /// Agent preamble sent as system prompt.
    #[must_use]
    pub fn agent_prompt(&self) -> PathBuf {
        self.src().join("prompt-agent.md")
    }

    /// Input tables.
    #[must_use]
    pub fn inputs(&self) -> PathBuf {
        self.dir.join("inputs")
    }

    /// Accepted-output tables.
    #[must_use]
    pub fn outputs(&self) -> PathBuf {
        self.dir.join("outputs")
    }

    /// Archived raw answers.
    #[must_use]
    pub fn answers(&self) -> PathBuf {
        self.dir.join("answers")
    }

    /// Shared error table of the family.
    #[must_use]
    pub fn errors(&self) -> PathBuf {
        self.dir.join("errors.csv")
    }

    /// Input table of `category`.
    #[must_use]
    pub fn input_table(&self, category: &str) -> PathBuf {
        self.inputs().join(format!("input_{category}.tsv"))
    }

    /// Output table of `category`.
    #[must_use]
    pub fn output_table(&self, category: &str) -> PathBuf {
        self.outputs().join(format!("output_{category}.csv"))
    }
}

/// Category encoded in an `input_<category>.tsv` file name.
#[must_use]
pub fn category_of(input: &Path) -> Option<String> {
    let stem = input.file_stem()?.to_str()?;
    Some(stem.strip_prefix("input_").unwrap_or(stem).to_string())
}
