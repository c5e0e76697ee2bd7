//! Stitch glossary: the symbol table mapping each abbreviation to its
//! stitch-count arithmetic. The expansion engine only ever needs the net
//! change per occurrence (`stitchesCreated - stitchesUsed`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GlossaryError;

/// Arithmetic definition of one abbreviation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GlossaryEntry {
    pub name: String,
    pub description: String,
    /// Stitches removed from the working needle per occurrence.
    pub stitches_used: u32,
    /// Stitches placed on the working needle per occurrence.
    pub stitches_created: u32,
}

impl GlossaryEntry {
    pub fn net_change(&self) -> i64 {
        i64::from(self.stitches_created) - i64::from(self.stitches_used)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Glossary {
    entries: BTreeMap<String, GlossaryEntry>,
}

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, abbrev: impl Into<String>, entry: GlossaryEntry) {
        self.entries.insert(abbrev.into(), entry);
    }

    pub fn get(&self, abbrev: &str) -> Option<&GlossaryEntry> {
        self.entries.get(abbrev)
    }

    pub fn contains(&self, abbrev: &str) -> bool {
        self.entries.contains_key(abbrev)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &GlossaryEntry)> {
        self.entries.iter()
    }

    /// Net stitch-count change for one occurrence of `abbrev`.
    pub fn delta(&self, abbrev: &str) -> Result<i64, GlossaryError> {
        self.entries
            .get(abbrev)
            .map(GlossaryEntry::net_change)
            .ok_or_else(|| GlossaryError::UnknownAbbreviation(abbrev.to_string()))
    }

    /// Stitches one occurrence of `abbrev` consumes from the left needle.
    pub fn stitches_used(&self, abbrev: &str) -> Result<u32, GlossaryError> {
        self.entries
            .get(abbrev)
            .map(|e| e.stitches_used)
            .ok_or_else(|| GlossaryError::UnknownAbbreviation(abbrev.to_string()))
    }

    /// The built-in knitting glossary. Used by the rule-based interpreter,
    /// which filters it down to the abbreviations a pattern actually uses.
    pub fn standard() -> Self {
        fn entry(name: &str, description: &str, used: u32, created: u32) -> GlossaryEntry {
            GlossaryEntry {
                name: name.to_string(),
                description: description.to_string(),
                stitches_used: used,
                stitches_created: created,
            }
        }

        let mut g = Glossary::new();
        g.insert("k", entry("Knit", "A standard knit stitch.", 1, 1));
        g.insert("p", entry("Purl", "A standard purl stitch.", 1, 1));
        g.insert("sl", entry("Slip", "Slip stitch purlwise.", 1, 1));
        g.insert(
            "sl knitwise",
            entry("Slip Knitwise", "Slip stitch as if to knit.", 1, 1),
        );
        g.insert(
            "kfb",
            entry(
                "Knit Front and Back",
                "Knit into front and back of the stitch (1 st increase).",
                1,
                2,
            ),
        );
        g.insert(
            "k2tog",
            entry("Knit 2 Together", "A right-leaning decrease.", 2, 1),
        );
        g.insert(
            "k2tog tbl",
            entry(
                "Knit 2 Together Through Back Loop",
                "A left-leaning decrease.",
                2,
                1,
            ),
        );
        g.insert(
            "k3tog",
            entry(
                "Knit 3 Together",
                "Knit 3 stitches together (2 st decrease).",
                3,
                1,
            ),
        );
        g.insert(
            "ssk",
            entry("Slip Slip Knit", "A left-leaning decrease.", 2, 1),
        );
        g.insert(
            "p2tog",
            entry("Purl 2 Together", "Purl two stitches together.", 2, 1),
        );
        g.insert(
            "yo",
            entry("Yarn Over", "An increase that creates a hole.", 0, 1),
        );
        g.insert(
            "m1",
            entry("Make One", "Lifted increase between stitches.", 0, 1),
        );
        g.insert(
            "wyib",
            entry(
                "With Yarn in Back",
                "Carry the yarn at the back of the work.",
                0,
                0,
            ),
        );
        g.insert(
            "wyif",
            entry(
                "With Yarn in Front",
                "Carry the yarn at the front of the work.",
                0,
                0,
            ),
        );
        g.insert("BO", entry("Bind Off", "Bind off stitches.", 1, 0));
        g
    }
}

impl FromIterator<(String, GlossaryEntry)> for Glossary {
    fn from_iter<T: IntoIterator<Item = (String, GlossaryEntry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
