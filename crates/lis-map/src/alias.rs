//! Test-name standardization through an alias index.
//!
//! A [`TestAliasTable`] maps every declared alias (trimmed, case-insensitive)
//! to its canonical test code. Names that match no alias pass through
//! trimmed but otherwise unchanged, so filtering can decide what to drop.

use std::collections::{BTreeSet, HashMap};

use lis_common::{column_strings, has_column};
use lis_model::fields::{TEST_CODE, UNIT_STD};
use lis_model::{OrderedMap, Profile, ReferenceRange, TestDefinition};
use polars::prelude::*;
use tracing::warn;

use crate::error::{MappingError, Result};

/// An alias declared by more than one canonical code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasCollision {
    /// Normalized (trimmed, lowercased) alias.
    pub alias: String,
    /// Code that declared the alias first and lost it.
    pub previous: String,
    /// Code that declared it later and owns it.
    pub winner: String,
}

/// Frequency of one distinct raw test name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFrequency {
    pub test_name: String,
    pub count: usize,
    pub test_code: String,
}

/// Result of [`filter_selected`].
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub frame: DataFrame,
    /// Codes present in the data but absent from the selection.
    pub dropped_codes: BTreeSet<String>,
    pub dropped_rows: usize,
}

fn normalize_alias(alias: &str) -> String {
    alias.trim().to_lowercase()
}

/// Immutable alias index over canonical test definitions.
#[derive(Debug, Clone, Default)]
pub struct TestAliasTable {
    tests: OrderedMap<TestDefinition>,
    alias_index: HashMap<String, String>,
    collisions: Vec<AliasCollision>,
}

impl TestAliasTable {
    /// Builds the reverse index. Codes are indexed in declaration order and a
    /// later code declaring an existing alias takes it over; every takeover is
    /// logged and kept in [`collisions`](Self::collisions).
    pub fn new(tests: OrderedMap<TestDefinition>) -> Self {
        let mut alias_index: HashMap<String, String> = HashMap::new();
        let mut collisions = Vec::new();

        for (code, definition) in tests.iter() {
            for alias in &definition.aliases {
                let key = normalize_alias(alias);
                if key.is_empty() {
                    continue;
                }
                if let Some(previous) = alias_index.insert(key.clone(), code.to_string())
                    && previous != code
                {
                    warn!(
                        alias = %key,
                        previous = %previous,
                        winner = code,
                        "alias declared by more than one test code; the later code wins"
                    );
                    collisions.push(AliasCollision {
                        alias: key,
                        previous,
                        winner: code.to_string(),
                    });
                }
            }
        }

        Self {
            tests,
            alias_index,
            collisions,
        }
    }

    pub fn from_profile(profile: &Profile) -> Self {
        Self::new(profile.test_mapping.clone())
    }

    /// Creates a table with one entry per selected code.
    ///
    /// A code's aliases come from `aliases` when present, otherwise the code
    /// is its own only alias. Units and ranges are left unset.
    pub fn from_selected_tests<S: AsRef<str>>(
        selected: &[S],
        aliases: &HashMap<String, Vec<String>>,
    ) -> Self {
        let tests = selected
            .iter()
            .map(|code| {
                let code = code.as_ref();
                let definition = match aliases.get(code) {
                    Some(list) => TestDefinition::new(list.iter().cloned()),
                    None => TestDefinition::new([code]),
                };
                (code.to_string(), definition)
            })
            .collect();
        Self::new(tests)
    }

    pub fn builder() -> TestAliasTableBuilder {
        TestAliasTableBuilder::default()
    }

    /// Starts a builder from this table's definitions.
    pub fn to_builder(&self) -> TestAliasTableBuilder {
        TestAliasTableBuilder {
            tests: self.tests.clone(),
        }
    }

    /// Canonical code for a raw test name.
    ///
    /// # Examples
    ///
    /// ```
    /// use lis_map::TestAliasTable;
    /// use lis_model::{OrderedMap, TestDefinition};
    ///
    /// let mut tests = OrderedMap::new();
    /// tests.insert("CEA", TestDefinition::new(["CEA(CLIA)", "癌胚抗原"]));
    /// let table = TestAliasTable::new(tests);
    ///
    /// assert_eq!(table.standardize(" cea(clia) "), "CEA");
    /// assert_eq!(table.standardize(" Ferritin "), "Ferritin");
    /// ```
    pub fn standardize(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        self.alias_index
            .get(&trimmed.to_lowercase())
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }

    /// Like [`standardize`](Self::standardize); a missing cell becomes `""`.
    pub fn standardize_cell(&self, raw: Option<&str>) -> String {
        raw.map(|value| self.standardize(value)).unwrap_or_default()
    }

    pub fn get_unit(&self, code: &str) -> Option<&str> {
        self.tests.get(code)?.unit.as_deref()
    }

    pub fn get_range(&self, code: &str) -> Option<ReferenceRange> {
        self.tests.get(code)?.range
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.tests.contains_key(code)
    }

    /// Canonical codes in declaration order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.tests.keys()
    }

    pub fn tests(&self) -> &OrderedMap<TestDefinition> {
        &self.tests
    }

    pub fn collisions(&self) -> &[AliasCollision] {
        &self.collisions
    }

    /// Counts each distinct raw name in `test_name_col`, most frequent first.
    ///
    /// Ties keep first-appearance order. Null and blank cells are not counted.
    pub fn test_statistics(&self, df: &DataFrame, test_name_col: &str) -> Result<Vec<TestFrequency>> {
        require_column(df, test_name_col)?;

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut stats: Vec<TestFrequency> = Vec::new();
        for name in column_strings(df, test_name_col)?.into_iter().flatten() {
            match index.get(&name) {
                Some(&pos) => stats[pos].count += 1,
                None => {
                    index.insert(name.clone(), stats.len());
                    let test_code = self.standardize(&name);
                    stats.push(TestFrequency {
                        test_name: name,
                        count: 1,
                        test_code,
                    });
                }
            }
        }

        stats.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(stats)
    }

    /// Appends `test_code` (standardized name) and `unit_std` (the code's unit).
    pub fn standardize_column(&self, df: &mut DataFrame, test_name_col: &str) -> Result<()> {
        require_column(df, test_name_col)?;

        let codes: Vec<String> = column_strings(df, test_name_col)?
            .iter()
            .map(|name| self.standardize_cell(name.as_deref()))
            .collect();
        let units: Vec<Option<&str>> = codes.iter().map(|code| self.get_unit(code)).collect();
        let unit_series = Series::new(UNIT_STD.into(), units);

        df.with_column(Series::new(TEST_CODE.into(), codes))?;
        df.with_column(unit_series)?;
        Ok(())
    }
}

/// Builds a [`TestAliasTable`]; every change produces a fresh index on `build`.
#[derive(Debug, Clone, Default)]
pub struct TestAliasTableBuilder {
    tests: OrderedMap<TestDefinition>,
}

impl TestAliasTableBuilder {
    /// Adds a test, replacing any existing definition for the code in place.
    #[must_use]
    pub fn add_test(mut self, code: impl Into<String>, definition: TestDefinition) -> Self {
        self.tests.insert(code, definition);
        self
    }

    /// Edits an existing definition. Unknown codes are left untouched.
    #[must_use]
    pub fn update_test(mut self, code: &str, update: impl FnOnce(&mut TestDefinition)) -> Self {
        if let Some(definition) = self.tests.get_mut(code) {
            update(definition);
        }
        self
    }

    pub fn build(self) -> TestAliasTable {
        TestAliasTable::new(self.tests)
    }
}

fn require_column(df: &DataFrame, name: &str) -> Result<()> {
    if has_column(df, name) {
        Ok(())
    } else {
        Err(MappingError::ColumnNotFound {
            column: name.to_string(),
        })
    }
}

/// Keeps rows whose `test_code` is selected and reports the codes dropped.
pub fn filter_selected(df: &DataFrame, selected: &BTreeSet<String>) -> Result<FilterOutcome> {
    require_column(df, TEST_CODE)?;

    let codes = column_strings(df, TEST_CODE)?;
    let mut dropped_codes = BTreeSet::new();
    let keep: Vec<bool> = codes
        .iter()
        .map(|code| match code {
            Some(code) if selected.contains(code) => true,
            Some(code) => {
                dropped_codes.insert(code.clone());
                false
            }
            None => false,
        })
        .collect();

    let dropped_rows = keep.iter().filter(|keep| !**keep).count();
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let frame = df.filter(&mask)?;

    Ok(FilterOutcome {
        frame,
        dropped_codes,
        dropped_rows,
    })
}
