//! Schema normalizer: maps free-form spreadsheet headers onto the trained vocabulary.
//!
//! Column names are folded (diacritics stripped, lowercased, separators
//! collapsed) and looked up in a rename map. Unknown columns pass through
//! untouched; missing ones are reported later, by the encoder and aligner.

use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;

use super::domain::{Cell, Table};

/// Canonical identifier column.
pub const ID_COLUMN: &str = "embryoId";
/// Canonical stage column.
pub const STAGE_COLUMN: &str = "Estágio";
/// Canonical morphology column.
pub const MORPHOLOGY_COLUMN: &str = "Morfo";
/// Canonical ground-truth column.
pub const LABEL_COLUMN: &str = "Ploidia";

const FIXED_ALIASES: &[(&str, &str)] = &[
    ("embryoid", ID_COLUMN),
    ("embryo id", ID_COLUMN),
    ("id embriao", ID_COLUMN),
    ("embriao", ID_COLUMN),
    ("id", ID_COLUMN),
    ("estagio", STAGE_COLUMN),
    ("stage", STAGE_COLUMN),
    ("dia", STAGE_COLUMN),
    ("morfo", MORPHOLOGY_COLUMN),
    ("morfologia", MORPHOLOGY_COLUMN),
    ("morphology", MORPHOLOGY_COLUMN),
    ("ploidia", LABEL_COLUMN),
    ("ploidy", LABEL_COLUMN),
    ("label", LABEL_COLUMN),
];

/// Fold a string for comparisons: strip diacritics, lowercase, collapse separators.
pub fn fold(input: &str) -> String {
    let stripped: String = input.nfd().filter(|c| !is_combining_mark(*c)).collect();
    stripped
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_combining_mark(c: char) -> bool {
    matches!(
        c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F
    )
}

/// Folded column name -> canonical name.
#[derive(Clone, Debug)]
pub struct ColumnVocabulary {
    renames: HashMap<String, String>,
    /// Folded trained name -> trained spelling.
    trained: HashMap<String, String>,
}

impl ColumnVocabulary {
    /// Fixed aliases, plus one entry per trained feature so that e.g.
    /// `ESTAGIO` or `t 2` resolve to the exact trained spelling. Alias
    /// targets that fold to a trained name take the trained spelling too.
    pub fn new<'a>(trained_features: impl IntoIterator<Item = &'a str>) -> Self {
        let trained: HashMap<String, String> = trained_features
            .into_iter()
            .map(|feature| (fold(feature), feature.to_string()))
            .collect();
        let mut vocabulary = Self {
            renames: trained.clone(),
            trained,
        };
        for (from, to) in FIXED_ALIASES {
            let target = vocabulary.spelling(to);
            vocabulary.renames.entry(from.to_string()).or_insert(target);
        }
        vocabulary
    }

    /// Merge configured aliases; keys are folded before insertion.
    pub fn with_aliases<'a>(mut self, aliases: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (from, to) in aliases {
            let target = self.spelling(to);
            self.renames.insert(fold(from), target);
        }
        self
    }

    fn spelling(&self, canonical: &str) -> String {
        self.trained
            .get(&fold(canonical))
            .cloned()
            .unwrap_or_else(|| canonical.to_string())
    }

    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.renames.get(&fold(name)).map(String::as_str)
    }
}

/// Rename columns on a copy of the upload and fold the label column's text values.
///
/// When two headers resolve to the same canonical name the first one wins and
/// the later one keeps its original header.
pub fn normalize(raw: &Table, vocabulary: &ColumnVocabulary) -> Table {
    let mut table = raw.clone();
    let mut taken: Vec<String> = Vec::new();

    for column in table.columns_mut() {
        if let Some(canonical) = vocabulary.canonical(&column.name) {
            if !taken.iter().any(|t| t == canonical) {
                column.name = canonical.to_string();
                taken.push(canonical.to_string());
            }
        }
    }

    if let Some(label) = table.column_mut(LABEL_COLUMN) {
        for cell in label.cells.iter_mut() {
            if let Cell::Text(text) = cell {
                *text = fold(text);
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::domain::Column;

    fn vocab() -> ColumnVocabulary {
        ColumnVocabulary::new(["Estágio", "Morfo", "t2", "Idade Materna"])
    }

    #[test]
    fn fold_strips_accents_case_and_separators() {
        assert_eq!(fold("Estágio"), "estagio");
        assert_eq!(fold("  ID_Embrião "), "id embriao");
        assert_eq!(fold("Idade-Materna"), "idade materna");
        assert_eq!(fold("Euplóide"), "euploide");
    }

    #[test]
    fn headers_map_onto_trained_names() {
        let v = vocab();
        assert_eq!(v.canonical("ESTAGIO"), Some(STAGE_COLUMN));
        assert_eq!(v.canonical("Stage"), Some(STAGE_COLUMN));
        assert_eq!(v.canonical("idade_materna"), Some("Idade Materna"));
        assert_eq!(v.canonical("Embryo ID"), Some(ID_COLUMN));
        assert_eq!(v.canonical("observacoes"), None);
    }

    #[test]
    fn aliases_follow_the_trained_spelling() {
        let v = ColumnVocabulary::new(["Estagio", "MORFO", "t2"]);
        assert_eq!(v.canonical("Estágio"), Some("Estagio"));
        assert_eq!(v.canonical("stage"), Some("Estagio"));
        assert_eq!(v.canonical("Morfologia"), Some("MORFO"));
        assert_eq!(v.canonical("id"), Some(ID_COLUMN));

        let aliases = [("grau".to_string(), MORPHOLOGY_COLUMN.to_string())];
        let v = v.with_aliases(aliases.iter().map(|(a, b)| (a, b)));
        assert_eq!(v.canonical("Grau"), Some("MORFO"));
    }

    #[test]
    fn configured_aliases_are_merged() {
        let aliases = [("Grau Morfológico".to_string(), "Morfo".to_string())];
        let v = vocab().with_aliases(aliases.iter().map(|(a, b)| (a, b)));
        assert_eq!(v.canonical("grau morfologico"), Some(MORPHOLOGY_COLUMN));
    }

    #[test]
    fn normalize_renames_copy_and_passes_unknown_through() {
        let raw = Table::new(vec![
            Column::new("ESTÁGIO", vec![Cell::Text("3D".into())]),
            Column::new("Observações", vec![Cell::Text("ok".into())]),
            Column::new("ploidia", vec![Cell::Text("Euplóide".into())]),
        ]);
        let table = normalize(&raw, &vocab());

        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec![STAGE_COLUMN, "Observações", LABEL_COLUMN]
        );
        assert_eq!(table.column(LABEL_COLUMN).unwrap().cells[0], Cell::Text("euploide".into()));
        // the upload itself is untouched
        assert_eq!(raw.columns()[0].name, "ESTÁGIO");
    }

    #[test]
    fn duplicate_canonical_names_keep_first() {
        let raw = Table::new(vec![
            Column::new("Stage", vec![Cell::Number(3.0)]),
            Column::new("Estagio", vec![Cell::Number(5.0)]),
        ]);
        let table = normalize(&raw, &vocab());
        assert_eq!(table.column(STAGE_COLUMN).unwrap().cells[0], Cell::Number(3.0));
        assert!(table.has_column("Estagio"));
    }
}
