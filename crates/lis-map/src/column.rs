//! Mapping of source columns onto standard fields.

use lis_common::{any_to_string_non_empty, has_column};
use lis_model::fields::{
    DEPARTMENT, DIAGNOSIS, IGNORE, PATIENT_ID, REF_RANGE, REQUIRED_FIELDS, RESULT_FLAG,
    SAMPLE_DATETIME, SPECIMEN_TYPE, TEST_NAME, TEST_VALUE, UNIT, VISIT_ID, is_standard_field,
};
use lis_model::{OrderedMap, Profile};
use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::{MappingError, Result};

/// Maximum characters shown per example value.
pub const EXAMPLE_VALUE_MAX_CHARS: usize = 50;

/// Header keywords per standard field, matched case-insensitively as substrings.
const FIELD_KEYWORDS: [(&str, &[&str]); 11] = [
    (PATIENT_ID, &["病人", "患者", "patient", "pid", "病案号", "住院号"]),
    (VISIT_ID, &["就诊", "门诊", "visit"]),
    (SAMPLE_DATETIME, &["日期", "时间", "date", "time"]),
    (TEST_NAME, &["项目", "test", "item"]),
    (TEST_VALUE, &["结果", "value", "result"]),
    (UNIT, &["单位", "unit"]),
    (SPECIMEN_TYPE, &["标本", "specimen", "样本类型"]),
    (REF_RANGE, &["参考", "reference"]),
    (RESULT_FLAG, &["标志", "flag"]),
    (DEPARTMENT, &["科室", "department"]),
    (DIAGNOSIS, &["诊断", "diagnosis"]),
];

/// Renames source columns to standard field names.
///
/// The mapping is keyed by standard field (`test_value`) with the source
/// column as value (`检验结果`), the way profiles store it.
#[derive(Debug, Clone, Default)]
pub struct ColumnMapper {
    mapping: OrderedMap<String>,
}

impl ColumnMapper {
    pub fn new(mapping: OrderedMap<String>) -> Self {
        Self { mapping }
    }

    pub fn from_profile(profile: &Profile) -> Self {
        Self::new(profile.column_mapping.clone())
    }

    pub fn mapping(&self) -> &OrderedMap<String> {
        &self.mapping
    }

    /// Source column mapped to a standard field, if any.
    pub fn source_for(&self, field: &str) -> Option<&str> {
        self.mapping
            .get(field)
            .map(|source| source.trim())
            .filter(|source| !source.is_empty())
    }

    /// Required fields with no source column.
    pub fn validate(&self) -> Vec<&'static str> {
        REQUIRED_FIELDS
            .into_iter()
            .filter(|field| self.source_for(field).is_none())
            .collect()
    }

    /// Fails with [`MappingError::MissingColumns`] when a required field is
    /// unmapped or its source column is absent from `df`.
    pub fn require_columns(&self, df: &DataFrame) -> Result<()> {
        let missing: Vec<String> = REQUIRED_FIELDS
            .into_iter()
            .filter(|field| match self.source_for(field) {
                Some(source) => !has_column(df, source),
                None => true,
            })
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MappingError::MissingColumns { fields: missing })
        }
    }

    /// Keeps only mapped columns, renamed to their standard field names.
    ///
    /// `ignore` targets are dropped, as are targets that are neither a
    /// standard field nor an `ijwi_` passthrough. Mapped sources missing from
    /// the data are skipped; call [`require_columns`](Self::require_columns)
    /// first when required fields must be present.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut columns = Vec::new();

        for (field, source) in self.mapping.iter() {
            let source = source.trim();
            if field == IGNORE || source.is_empty() {
                continue;
            }
            if !is_standard_field(field) {
                warn!(field, source, "skipping mapping to unknown field");
                continue;
            }
            if !has_column(df, source) {
                debug!(field, source, "mapped column not present in data");
                continue;
            }
            columns.push(df.column(source)?.clone().with_name(field.into()));
        }

        Ok(DataFrame::new(columns)?)
    }
}

/// Suggests a source column per standard field from header keywords.
///
/// For each field the first column containing one of its keywords wins.
/// Fields without a match map to `None`.
pub fn suggest_mapping<S: AsRef<str>>(columns: &[S]) -> OrderedMap<Option<String>> {
    FIELD_KEYWORDS
        .iter()
        .map(|(field, keywords)| {
            let matched = columns.iter().find(|column| {
                let lowered = column.as_ref().to_lowercase();
                keywords.iter().any(|kw| lowered.contains(&kw.to_lowercase()))
            });
            (*field, matched.map(|column| column.as_ref().to_string()))
        })
        .collect()
}

/// First `n` non-empty values of every column, truncated for display.
pub fn example_values(df: &DataFrame, n: usize) -> Result<OrderedMap<Vec<String>>> {
    let mut examples = OrderedMap::new();
    for column in df.get_columns() {
        let mut values = Vec::with_capacity(n);
        for idx in 0..column.len() {
            if values.len() >= n {
                break;
            }
            if let Some(value) = any_to_string_non_empty(column.get(idx)?) {
                values.push(value.chars().take(EXAMPLE_VALUE_MAX_CHARS).collect());
            }
        }
        examples.insert(column.name().as_str(), values);
    }
    Ok(examples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> ColumnMapper {
        ColumnMapper::new(
            [
                ("patient_id", "病人ID"),
                ("sample_datetime", "检验日期"),
                ("test_name", "项目名称"),
                ("test_value", "结果"),
                ("ignore", "备注"),
                ("ijwi_batch", "批号"),
            ]
            .into_iter()
            .map(|(field, source)| (field, source.to_string()))
            .collect(),
        )
    }

    fn source_frame() -> DataFrame {
        df! {
            "病人ID" => ["P1"],
            "检验日期" => ["2024-01-01"],
            "项目名称" => ["CEA"],
            "结果" => ["3.2"],
            "备注" => ["x"],
            "批号" => ["B7"],
            "其他" => ["y"],
        }
        .unwrap()
    }

    #[test]
    fn validate_lists_unmapped_required_fields() {
        assert!(mapper().validate().is_empty());

        let partial = ColumnMapper::new([("patient_id", "ID".to_string())].into_iter().collect());
        assert_eq!(partial.validate(), ["sample_datetime", "test_name", "test_value"]);
    }

    #[test]
    fn apply_renames_and_drops_unmapped() {
        let mapped = mapper().apply(&source_frame()).unwrap();
        let names: Vec<&str> = mapped.get_column_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(
            names,
            ["patient_id", "sample_datetime", "test_name", "test_value", "ijwi_batch"]
        );
    }

    #[test]
    fn require_columns_reports_absent_sources() {
        let df = source_frame().drop("结果").unwrap();
        let err = mapper().require_columns(&df).unwrap_err();
        match err {
            MappingError::MissingColumns { fields } => assert_eq!(fields, ["test_value"]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(mapper().require_columns(&source_frame()).is_ok());
    }

    #[test]
    fn suggest_mapping_uses_first_match() {
        let columns = ["患者编号", "检验项目", "检验结果", "单位", "采样时间", "Result Flag"];
        let suggestions = suggest_mapping(&columns);

        assert_eq!(suggestions.get(PATIENT_ID), Some(&Some("患者编号".to_string())));
        assert_eq!(suggestions.get(TEST_NAME), Some(&Some("检验项目".to_string())));
        assert_eq!(suggestions.get(TEST_VALUE), Some(&Some("检验结果".to_string())));
        assert_eq!(suggestions.get(SAMPLE_DATETIME), Some(&Some("采样时间".to_string())));
        assert_eq!(suggestions.get(RESULT_FLAG), Some(&Some("Result Flag".to_string())));
        assert_eq!(suggestions.get(DIAGNOSIS), Some(&None));
    }

    #[test]
    fn example_values_skip_blanks_and_truncate() {
        let long = "x".repeat(80);
        let df = df! {
            "a" => [Some(""), Some("1"), None, Some("2"), Some("3")],
            "b" => [Some(long.as_str()), None, None, None, None],
        }
        .unwrap();

        let examples = example_values(&df, 2).unwrap();
        assert_eq!(examples.get("a"), Some(&vec!["1".to_string(), "2".to_string()]));
        assert_eq!(examples.get("b").unwrap()[0].chars().count(), EXAMPLE_VALUE_MAX_CHARS);
    }
}
