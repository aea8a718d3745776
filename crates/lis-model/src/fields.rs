//! Standard field names of the long-format output table.

pub const PATIENT_ID: &str = "patient_id";
pub const VISIT_ID: &str = "visit_id";
pub const SAMPLE_DATETIME: &str = "sample_datetime";
pub const TEST_NAME: &str = "test_name";
pub const TEST_VALUE: &str = "test_value";
pub const UNIT: &str = "unit";
pub const SPECIMEN_TYPE: &str = "specimen_type";
pub const REF_RANGE: &str = "ref_range";
pub const RESULT_FLAG: &str = "result_flag";
pub const DEPARTMENT: &str = "department";
pub const DIAGNOSIS: &str = "diagnosis";
/// Pseudo-field: the source column is deliberately dropped.
pub const IGNORE: &str = "ignore";

/// Columns appended by the extraction pipeline.
pub const TEST_CODE: &str = "test_code";
pub const UNIT_STD: &str = "unit_std";
pub const VALUE_NUMERIC: &str = "value_numeric";
pub const VALUE_FLAG: &str = "value_flag";
pub const PROFILE_ID: &str = "profile_id";
pub const RUN_ID: &str = "run_id";

/// Prefix for site-specific passthrough columns kept verbatim in the output.
pub const PASSTHROUGH_PREFIX: &str = "ijwi_";

pub const STANDARD_FIELDS: [&str; 12] = [
    PATIENT_ID,
    VISIT_ID,
    SAMPLE_DATETIME,
    TEST_NAME,
    TEST_VALUE,
    UNIT,
    SPECIMEN_TYPE,
    REF_RANGE,
    RESULT_FLAG,
    DEPARTMENT,
    DIAGNOSIS,
    IGNORE,
];

pub const REQUIRED_FIELDS: [&str; 4] = [PATIENT_ID, SAMPLE_DATETIME, TEST_NAME, TEST_VALUE];

/// Output column order of the long-format table, before passthrough columns.
pub const LABS_LONG_COLUMNS: [&str; 13] = [
    PATIENT_ID,
    VISIT_ID,
    SAMPLE_DATETIME,
    TEST_NAME,
    TEST_CODE,
    TEST_VALUE,
    VALUE_NUMERIC,
    VALUE_FLAG,
    UNIT,
    UNIT_STD,
    REF_RANGE,
    RESULT_FLAG,
    SPECIMEN_TYPE,
];

/// True for names accepted as a mapping target.
pub fn is_standard_field(name: &str) -> bool {
    STANDARD_FIELDS.contains(&name) || name.starts_with(PASSTHROUGH_PREFIX)
}
