//! Entity Legal Form record and its column schema
//!
//! The field list is declared once below. The struct, the column order used
//! by the parser, and the order used by the writer are all generated from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used inside the abbreviation list fields
pub const LIST_SEPARATOR: char = ';';

/// Number of columns in a new-form row of the supplementary file
/// (`country` through `local_abbreviations`)
pub const NEW_FORM_WIDTH: usize = 9;

macro_rules! elf_record {
    ($( $(#[$doc:meta])* $field:ident => $label:literal, )+) => {
        /// One localized legal-form entry of the ISO 20275 table
        ///
        /// Records are immutable. Reconciliation derives new records with
        /// [`Record::with_abbreviations`] instead of editing in place.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct Record {
            $( $field: String, )+
        }

        /// Column names in file order
        pub const FIELDS: &[&str] = &[$( $label ),+];

        impl Record {
            $(
                $(#[$doc])*
                pub fn $field(&self) -> &str {
                    &self.$field
                }
            )+

            /// Build a record from exactly [`FIELD_COUNT`] values in column order
            ///
            /// Returns `None` when the width does not match the schema.
            pub(crate) fn from_exact_fields<S: AsRef<str>>(fields: &[S]) -> Option<Self> {
                if fields.len() != FIELD_COUNT {
                    return None;
                }
                let mut values = fields.iter().map(|f| f.as_ref().to_string());
                Some(Self {
                    $( $field: values.next()?, )+
                })
            }

            /// All values in column order
            pub fn fields(&self) -> [&str; FIELD_COUNT] {
                [$( self.$field.as_str() ),+]
            }
        }
    };
}

elf_record! {
    /// ELF code, the join key
    code => "elf",
    /// Country name
    country => "country",
    /// ISO 3166-1 alpha-2 country code
    country_alpha2 => "alpha2",
    /// Jurisdiction name (subdivision), may be empty
    jurisdiction => "jurisdiction",
    /// ISO 3166-2 jurisdiction code, may be empty
    jurisdiction_alpha2 => "alpha2_2",
    /// Legal form name in the local language
    local_name => "local_name",
    /// Language name
    language => "language",
    /// ISO 639-1 language code
    language_code => "language_code",
    /// Transliterated legal form name
    transliterated_name => "transliterated_name",
    /// `;`-separated local abbreviations
    local_abbreviations => "local_abbreviations",
    /// `;`-separated transliterated abbreviations
    transliterated_abbreviations => "transliterated_abbreviations",
    /// Date the code was created
    creation_date => "creation_date",
    /// ACTV or INAC
    status => "status",
    /// Modification flag of the last revision
    modification_flag => "modification",
    /// Date of the last revision
    modification_date => "modification_date",
    /// Reason given for the last revision
    reason => "reason",
}

/// Number of columns in a canonical row
pub const FIELD_COUNT: usize = FIELDS.len();

impl Record {
    /// Build a record for a new legal form from its supplementary columns
    ///
    /// `fields` must hold [`NEW_FORM_WIDTH`] values. Columns after
    /// `local_abbreviations` are left empty.
    pub(crate) fn from_new_form<S: AsRef<str>>(code: &str, fields: &[S]) -> Option<Self> {
        if fields.len() != NEW_FORM_WIDTH {
            return None;
        }
        let mut full: Vec<&str> = Vec::with_capacity(FIELD_COUNT);
        full.push(code);
        full.extend(fields.iter().map(|f| f.as_ref()));
        full.resize(FIELD_COUNT, "");
        Self::from_exact_fields(&full)
    }

    /// Local abbreviations as a list (empty field gives an empty list)
    pub fn local_abbreviation_list(&self) -> Vec<&str> {
        split_list(&self.local_abbreviations)
    }

    /// Transliterated abbreviations as a list (empty field gives an empty list)
    pub fn transliterated_abbreviation_list(&self) -> Vec<&str> {
        split_list(&self.transliterated_abbreviations)
    }

    /// The tuple a completion row must share with a canonical row to be merged into it
    pub fn identity(&self) -> (&str, &str) {
        (&self.local_name, &self.language)
    }

    /// Key under which two rows are considered the same entry
    pub fn conflict_key(&self) -> (&str, &str) {
        (&self.code, &self.language)
    }

    /// Copy of this record with both abbreviation lists replaced
    pub fn with_abbreviations(
        &self,
        local: impl Into<String>,
        transliterated: impl Into<String>,
    ) -> Self {
        Self {
            local_abbreviations: local.into(),
            transliterated_abbreviations: transliterated.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.local_name)
    }
}

fn split_list(value: &str) -> Vec<&str> {
    if value.is_empty() {
        Vec::new()
    } else {
        value.split(LIST_SEPARATOR).collect()
    }
}

/// Union two `;`-separated lists
///
/// Entries of `extra` missing from `base` are appended in order. Stray
/// separators at either end of the result are stripped.
pub fn union_list(base: &str, extra: &str) -> String {
    let mut merged: Vec<&str> = base.split(LIST_SEPARATOR).collect();
    for item in extra.split(LIST_SEPARATOR) {
        if !merged.contains(&item) {
            merged.push(item);
        }
    }
    merged
        .join(&LIST_SEPARATOR.to_string())
        .trim_matches(LIST_SEPARATOR)
        .to_string()
}
