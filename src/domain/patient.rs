//! Patient record types for heart disease risk prediction.
//!
//! The eleven clinical features follow the public heart failure prediction
//! dataset column naming (`Age`, `Sex`, `ChestPainType`, ..., `ST_Slope`).
//! Classifiers are fit against this exact schema and column order, so the
//! order of [`FEATURE_NAMES`] is load-bearing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical feature names, in the order the classifier expects them.
pub const FEATURE_NAMES: [&str; 11] = [
    "Age",
    "Sex",
    "ChestPainType",
    "RestingBP",
    "Cholesterol",
    "FastingBS",
    "RestingECG",
    "MaxHR",
    "ExerciseAngina",
    "Oldpeak",
    "ST_Slope",
];

/// Categorical feature names with their admissible labels.
pub const CATEGORICAL_FEATURES: [(&str, &[&str]); 5] = [
    ("Sex", Sex::LABELS),
    ("ChestPainType", ChestPainType::LABELS),
    ("RestingECG", RestingEcg::LABELS),
    ("ExerciseAngina", ExerciseAngina::LABELS),
    ("ST_Slope", StSlope::LABELS),
];

const AGE_RANGE: (i64, i64) = (20, 100);
const RESTING_BP_RANGE: (i64, i64) = (50, 250);
const CHOLESTEROL_RANGE: (i64, i64) = (0, 600);
const MAX_HR_RANGE: (i64, i64) = (60, 220);
const OLDPEAK_RANGE: (f64, f64) = (-2.0, 6.0);

/// Oldpeak is entered on a 0.1 grid.
const OLDPEAK_STEP: f64 = 0.1;
const OLDPEAK_STEP_TOLERANCE: f64 = 1e-6;

macro_rules! categorical {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Column name of this feature.
            pub const FIELD: &'static str = $field;

            /// Admissible labels, exactly as the classifier saw them.
            pub const LABELS: &'static [&'static str] = &[$($label),+];

            /// The label used on the wire and by the classifier.
            #[must_use]
            pub fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = FieldIssue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    other => Err(FieldIssue::UnknownLabel {
                        field: $field,
                        value: other.to_string(),
                        allowed: Self::LABELS,
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

categorical!(
    /// Biological sex.
    Sex, "Sex" { Male => "M", Female => "F" }
);

categorical!(
    /// Chest pain type: atypical angina, non-anginal pain, asymptomatic, typical angina.
    ChestPainType, "ChestPainType" {
        AtypicalAngina => "ATA",
        NonAnginalPain => "NAP",
        Asymptomatic => "ASY",
        TypicalAngina => "TA",
    }
);

categorical!(
    /// Resting electrocardiogram result.
    RestingEcg, "RestingECG" {
        Normal => "Normal",
        StTAbnormality => "ST",
        LeftVentricularHypertrophy => "LVH",
    }
);

categorical!(
    /// Exercise-induced angina.
    ExerciseAngina, "ExerciseAngina" { Yes => "Y", No => "N" }
);

categorical!(
    /// Slope of the peak exercise ST segment.
    StSlope, "ST_Slope" { Up => "Up", Flat => "Flat", Down => "Down" }
);

/// One problem found while validating raw patient input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldIssue {
    #[error("{field} {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: String,
        min: String,
        max: String,
    },

    #[error("{field} '{value}' must be one of {allowed:?}")]
    UnknownLabel {
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("{field} {value} must be 0 or 1")]
    NotAFlag { field: &'static str, value: i64 },

    #[error("{field} {value} is not a multiple of {step}")]
    OffStep {
        field: &'static str,
        value: f64,
        step: f64,
    },

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("{field} '{value}' is not a valid number")]
    Malformed { field: &'static str, value: String },

    #[error("missing field {0}")]
    Missing(&'static str),

    #[error("unknown field {0}")]
    Unknown(String),

    #[error("field {0} given more than once")]
    Duplicate(&'static str),
}

/// Raw input rejected by the record builder.
///
/// Carries every offending field, not only the first one.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    /// The individual problems, in feature order.
    #[must_use]
    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid patient input: ")?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Untrusted patient input, as collected from a form, a JSON body or a CSV row.
///
/// Nothing here is range-checked; [`PatientRecord::build`] does that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPatientInput {
    #[serde(rename = "Age")]
    pub age: i64,
    #[serde(rename = "Sex")]
    pub sex: String,
    #[serde(rename = "ChestPainType")]
    pub chest_pain_type: String,
    #[serde(rename = "RestingBP")]
    pub resting_bp: i64,
    #[serde(rename = "Cholesterol")]
    pub cholesterol: i64,
    #[serde(rename = "FastingBS")]
    pub fasting_bs: i64,
    #[serde(rename = "RestingECG")]
    pub resting_ecg: String,
    #[serde(rename = "MaxHR")]
    pub max_hr: i64,
    #[serde(rename = "ExerciseAngina")]
    pub exercise_angina: String,
    #[serde(rename = "Oldpeak")]
    pub oldpeak: f64,
    #[serde(rename = "ST_Slope")]
    pub st_slope: String,
}

impl RawPatientInput {
    /// Assemble raw input from `(name, value)` pairs given in any order.
    ///
    /// Names must match [`FEATURE_NAMES`] exactly. Unknown, duplicate,
    /// missing and unparsable entries are all reported together.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] listing every problem found.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut slots: [Option<String>; 11] = Default::default();
        let mut issues = Vec::new();

        for (name, value) in pairs {
            let name = name.as_ref();
            match FEATURE_NAMES.iter().position(|n| *n == name) {
                Some(idx) if slots[idx].is_some() => {
                    issues.push(FieldIssue::Duplicate(FEATURE_NAMES[idx]));
                }
                Some(idx) => slots[idx] = Some(value.as_ref().trim().to_string()),
                None => issues.push(FieldIssue::Unknown(name.to_string())),
            }
        }

        // Blank values count as missing.
        let mut take = |idx: usize| -> Option<String> {
            let value = slots[idx].take().filter(|v| !v.is_empty());
            if value.is_none() {
                issues.push(FieldIssue::Missing(FEATURE_NAMES[idx]));
            }
            value
        };

        let age = take(0);
        let sex = take(1);
        let chest_pain_type = take(2);
        let resting_bp = take(3);
        let cholesterol = take(4);
        let fasting_bs = take(5);
        let resting_ecg = take(6);
        let max_hr = take(7);
        let exercise_angina = take(8);
        let oldpeak = take(9);
        let st_slope = take(10);

        let raw = Self {
            age: parse_number(FEATURE_NAMES[0], age.as_deref(), &mut issues),
            sex: sex.unwrap_or_default(),
            chest_pain_type: chest_pain_type.unwrap_or_default(),
            resting_bp: parse_number(FEATURE_NAMES[3], resting_bp.as_deref(), &mut issues),
            cholesterol: parse_number(FEATURE_NAMES[4], cholesterol.as_deref(), &mut issues),
            fasting_bs: parse_number(FEATURE_NAMES[5], fasting_bs.as_deref(), &mut issues),
            resting_ecg: resting_ecg.unwrap_or_default(),
            max_hr: parse_number(FEATURE_NAMES[7], max_hr.as_deref(), &mut issues),
            exercise_angina: exercise_angina.unwrap_or_default(),
            oldpeak: parse_number(FEATURE_NAMES[9], oldpeak.as_deref(), &mut issues),
            st_slope: st_slope.unwrap_or_default(),
        };

        if issues.is_empty() {
            Ok(raw)
        } else {
            Err(ValidationError::new(issues))
        }
    }
}

/// Parse a numeric pair value. `None` was already reported as missing; any
/// present text, blank included, must parse.
fn parse_number<T>(field: &'static str, value: Option<&str>, issues: &mut Vec<FieldIssue>) -> T
where
    T: FromStr + Default,
{
    let Some(value) = value else {
        return T::default();
    };
    value.parse().unwrap_or_else(|_| {
        issues.push(FieldIssue::Malformed {
            field,
            value: value.to_string(),
        });
        T::default()
    })
}

fn check_range(
    field: &'static str,
    value: i64,
    (min, max): (i64, i64),
    issues: &mut Vec<FieldIssue>,
) -> Option<i64> {
    if (min..=max).contains(&value) {
        Some(value)
    } else {
        issues.push(FieldIssue::OutOfRange {
            field,
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
        None
    }
}

fn check_label<T>(raw: &str, issues: &mut Vec<FieldIssue>) -> Option<T>
where
    T: FromStr<Err = FieldIssue>,
{
    raw.parse().map_err(|issue| issues.push(issue)).ok()
}

fn check_oldpeak(value: f64, issues: &mut Vec<FieldIssue>) -> Option<f64> {
    const FIELD: &str = "Oldpeak";

    if !value.is_finite() {
        issues.push(FieldIssue::NotFinite { field: FIELD });
        return None;
    }
    let (min, max) = OLDPEAK_RANGE;
    if !(min..=max).contains(&value) {
        issues.push(FieldIssue::OutOfRange {
            field: FIELD,
            value: value.to_string(),
            min: format!("{min:.1}"),
            max: format!("{max:.1}"),
        });
        return None;
    }
    let steps = value / OLDPEAK_STEP;
    if (steps - steps.round()).abs() > OLDPEAK_STEP_TOLERANCE {
        issues.push(FieldIssue::OffStep {
            field: FIELD,
            value,
            step: OLDPEAK_STEP,
        });
        return None;
    }
    // Snap to the grid so 0.30000000000000004 and 0.3 are the same record.
    Some(steps.round() / 10.0)
}

/// A value of one feature, as handed to a classifier's encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Category(&'static str),
}

/// A validated, immutable patient record.
///
/// Fields are private: the only way in is [`PatientRecord::build`] (or
/// deserialization, which goes through the same checks).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPatientInput")]
pub struct PatientRecord {
    #[serde(rename = "Age")]
    age: u8,
    #[serde(rename = "Sex")]
    sex: Sex,
    #[serde(rename = "ChestPainType")]
    chest_pain_type: ChestPainType,
    #[serde(rename = "RestingBP")]
    resting_bp: u16,
    #[serde(rename = "Cholesterol")]
    cholesterol: u16,
    #[serde(rename = "FastingBS")]
    fasting_bs: u8,
    #[serde(rename = "RestingECG")]
    resting_ecg: RestingEcg,
    #[serde(rename = "MaxHR")]
    max_hr: u8,
    #[serde(rename = "ExerciseAngina")]
    exercise_angina: ExerciseAngina,
    #[serde(rename = "Oldpeak")]
    oldpeak: f64,
    #[serde(rename = "ST_Slope")]
    st_slope: StSlope,
}

impl PatientRecord {
    /// Validate raw input against the feature domains and build a record.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] naming every field outside its domain.
    pub fn build(raw: &RawPatientInput) -> Result<Self, ValidationError> {
        let mut issues = Vec::new();

        let age = check_range("Age", raw.age, AGE_RANGE, &mut issues);
        let sex = check_label::<Sex>(&raw.sex, &mut issues);
        let chest_pain_type = check_label::<ChestPainType>(&raw.chest_pain_type, &mut issues);
        let resting_bp = check_range("RestingBP", raw.resting_bp, RESTING_BP_RANGE, &mut issues);
        let cholesterol =
            check_range("Cholesterol", raw.cholesterol, CHOLESTEROL_RANGE, &mut issues);
        let fasting_bs = match raw.fasting_bs {
            0 | 1 => Some(raw.fasting_bs),
            other => {
                issues.push(FieldIssue::NotAFlag {
                    field: "FastingBS",
                    value: other,
                });
                None
            }
        };
        let resting_ecg = check_label::<RestingEcg>(&raw.resting_ecg, &mut issues);
        let max_hr = check_range("MaxHR", raw.max_hr, MAX_HR_RANGE, &mut issues);
        let exercise_angina = check_label::<ExerciseAngina>(&raw.exercise_angina, &mut issues);
        let oldpeak = check_oldpeak(raw.oldpeak, &mut issues);
        let st_slope = check_label::<StSlope>(&raw.st_slope, &mut issues);

        match (
            age,
            sex,
            chest_pain_type,
            resting_bp,
            cholesterol,
            fasting_bs,
            resting_ecg,
            max_hr,
            exercise_angina,
            oldpeak,
            st_slope,
        ) {
            (
                Some(age),
                Some(sex),
                Some(chest_pain_type),
                Some(resting_bp),
                Some(cholesterol),
                Some(fasting_bs),
                Some(resting_ecg),
                Some(max_hr),
                Some(exercise_angina),
                Some(oldpeak),
                Some(st_slope),
            ) if issues.is_empty() => Ok(Self {
                // Ranges above keep every narrowing cast lossless.
                age: age as u8,
                sex,
                chest_pain_type,
                resting_bp: resting_bp as u16,
                cholesterol: cholesterol as u16,
                fasting_bs: fasting_bs as u8,
                resting_ecg,
                max_hr: max_hr as u8,
                exercise_angina,
                oldpeak,
                st_slope,
            }),
            _ => Err(ValidationError::new(issues)),
        }
    }

    #[must_use]
    pub fn age(&self) -> u8 {
        self.age
    }

    #[must_use]
    pub fn sex(&self) -> Sex {
        self.sex
    }

    #[must_use]
    pub fn chest_pain_type(&self) -> ChestPainType {
        self.chest_pain_type
    }

    #[must_use]
    pub fn resting_bp(&self) -> u16 {
        self.resting_bp
    }

    #[must_use]
    pub fn cholesterol(&self) -> u16 {
        self.cholesterol
    }

    #[must_use]
    pub fn fasting_bs(&self) -> u8 {
        self.fasting_bs
    }

    #[must_use]
    pub fn resting_ecg(&self) -> RestingEcg {
        self.resting_ecg
    }

    #[must_use]
    pub fn max_hr(&self) -> u8 {
        self.max_hr
    }

    #[must_use]
    pub fn exercise_angina(&self) -> ExerciseAngina {
        self.exercise_angina
    }

    #[must_use]
    pub fn oldpeak(&self) -> f64 {
        self.oldpeak
    }

    #[must_use]
    pub fn st_slope(&self) -> StSlope {
        self.st_slope
    }

    /// All features as `(name, value)` pairs, in [`FEATURE_NAMES`] order.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, FieldValue); 11] {
        use FieldValue::{Category, Number};
        [
            (FEATURE_NAMES[0], Number(f64::from(self.age))),
            (FEATURE_NAMES[1], Category(self.sex.label())),
            (FEATURE_NAMES[2], Category(self.chest_pain_type.label())),
            (FEATURE_NAMES[3], Number(f64::from(self.resting_bp))),
            (FEATURE_NAMES[4], Number(f64::from(self.cholesterol))),
            (FEATURE_NAMES[5], Number(f64::from(self.fasting_bs))),
            (FEATURE_NAMES[6], Category(self.resting_ecg.label())),
            (FEATURE_NAMES[7], Number(f64::from(self.max_hr))),
            (FEATURE_NAMES[8], Category(self.exercise_angina.label())),
            (FEATURE_NAMES[9], Number(self.oldpeak)),
            (FEATURE_NAMES[10], Category(self.st_slope.label())),
        ]
    }

    /// Look up one feature by its canonical name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }
}

impl TryFrom<RawPatientInput> for PatientRecord {
    type Error = ValidationError;

    fn try_from(raw: RawPatientInput) -> Result<Self, Self::Error> {
        Self::build(&raw)
    }
}

impl From<&PatientRecord> for RawPatientInput {
    fn from(record: &PatientRecord) -> Self {
        Self {
            age: i64::from(record.age),
            sex: record.sex.label().to_string(),
            chest_pain_type: record.chest_pain_type.label().to_string(),
            resting_bp: i64::from(record.resting_bp),
            cholesterol: i64::from(record.cholesterol),
            fasting_bs: i64::from(record.fasting_bs),
            resting_ecg: record.resting_ecg.label().to_string(),
            max_hr: i64::from(record.max_hr),
            exercise_angina: record.exercise_angina.label().to_string(),
            oldpeak: record.oldpeak,
            st_slope: record.st_slope.label().to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_input() -> RawPatientInput {
    RawPatientInput {
        age: 45,
        sex: "M".into(),
        chest_pain_type: "ATA".into(),
        resting_bp: 120,
        cholesterol: 200,
        fasting_bs: 0,
        resting_ecg: "Normal".into(),
        max_hr: 150,
        exercise_angina: "N".into(),
        oldpeak: 1.0,
        st_slope: "Up".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_scenario_record() {
        let record = PatientRecord::build(&sample_input()).expect("Should build");

        assert_eq!(record.age(), 45);
        assert_eq!(record.sex(), Sex::Male);
        assert_eq!(record.chest_pain_type(), ChestPainType::AtypicalAngina);
        assert_eq!(record.resting_bp(), 120);
        assert_eq!(record.cholesterol(), 200);
        assert_eq!(record.fasting_bs(), 0);
        assert_eq!(record.resting_ecg(), RestingEcg::Normal);
        assert_eq!(record.max_hr(), 150);
        assert_eq!(record.exercise_angina(), ExerciseAngina::No);
        assert!((record.oldpeak() - 1.0).abs() < f64::EPSILON);
        assert_eq!(record.st_slope(), StSlope::Up);
    }

    #[test]
    fn test_fields_follow_schema_order() {
        let record = PatientRecord::build(&sample_input()).expect("Should build");
        let names: Vec<&str> = record.fields().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, FEATURE_NAMES);
    }

    #[test]
    fn test_serialized_keys_follow_schema_order() {
        let record = PatientRecord::build(&sample_input()).expect("Should build");
        let json = serde_json::to_string(&record).expect("Should serialize");

        let mut last = 0;
        for name in FEATURE_NAMES {
            let needle = format!("\"{name}\":");
            let pos = json.find(&needle).unwrap_or_else(|| panic!("{name} missing"));
            assert!(pos >= last, "{name} out of order in {json}");
            last = pos;
        }
        assert!(json.contains("\"Sex\":\"M\""));
        assert!(json.contains("\"ST_Slope\":\"Up\""));
    }

    #[test]
    fn test_pairs_in_any_order_build_same_record() {
        let forward = FEATURE_NAMES.iter().copied().zip([
            "45", "M", "ATA", "120", "200", "0", "Normal", "150", "N", "1.0", "Up",
        ]);
        let mut reversed: Vec<(&str, &str)> = forward.clone().collect();
        reversed.reverse();

        let a = PatientRecord::build(&RawPatientInput::from_pairs(forward).expect("forward"))
            .expect("Should build");
        let b = PatientRecord::build(&RawPatientInput::from_pairs(reversed).expect("reversed"))
            .expect("Should build");

        assert_eq!(a, b);
        assert_eq!(a, PatientRecord::build(&sample_input()).expect("Should build"));
    }

    #[test]
    fn test_pairs_report_missing_unknown_and_duplicate() {
        let pairs = [
            ("Age", "45"),
            ("Age", "46"),
            ("Weight", "80"),
            ("Sex", "M"),
            ("RestingBP", "abc"),
        ];
        let err = RawPatientInput::from_pairs(pairs).expect_err("Should fail");
        let issues = err.issues();

        assert!(issues.contains(&FieldIssue::Duplicate("Age")));
        assert!(issues.contains(&FieldIssue::Unknown("Weight".into())));
        assert!(issues.contains(&FieldIssue::Missing("ST_Slope")));
        assert!(issues.contains(&FieldIssue::Malformed {
            field: "RestingBP",
            value: "abc".into()
        }));
    }

    #[test]
    fn test_pairs_with_blank_values_are_missing() {
        let pairs = FEATURE_NAMES.iter().copied().zip([
            "45", "M", "ATA", "120", "", "  ", "Normal", "150", "N", "", "\t",
        ]);
        let err = RawPatientInput::from_pairs(pairs).expect_err("blank values must not default");
        assert_eq!(
            err.issues(),
            &[
                FieldIssue::Missing("Cholesterol"),
                FieldIssue::Missing("FastingBS"),
                FieldIssue::Missing("Oldpeak"),
                FieldIssue::Missing("ST_Slope"),
            ]
        );
    }

    #[test]
    fn test_record_round_trips_through_raw_input() {
        let mut raw = sample_input();
        raw.oldpeak = 0.1 + 0.2;
        let record = PatientRecord::build(&raw).expect("Should build");

        let back = RawPatientInput::from(&record);
        assert_eq!(back.oldpeak, 0.3);
        assert_eq!(PatientRecord::build(&back).expect("Should rebuild"), record);
    }

    #[test]
    fn test_field_lookup_by_name() {
        let record = PatientRecord::build(&sample_input()).expect("Should build");
        assert_eq!(record.field("MaxHR"), Some(FieldValue::Number(150.0)));
        assert_eq!(record.field("ST_Slope"), Some(FieldValue::Category("Up")));
        assert_eq!(record.field("max_hr"), None);
    }

    #[test]
    fn test_domain_bounds_are_inclusive() {
        let mut raw = sample_input();
        raw.age = 20;
        raw.resting_bp = 250;
        raw.cholesterol = 0;
        raw.max_hr = 220;
        raw.oldpeak = -2.0;
        assert!(PatientRecord::build(&raw).is_ok());

        raw.age = 100;
        raw.resting_bp = 50;
        raw.cholesterol = 600;
        raw.max_hr = 60;
        raw.oldpeak = 6.0;
        assert!(PatientRecord::build(&raw).is_ok());
    }

    #[test]
    fn test_collects_every_violation() {
        let mut raw = sample_input();
        raw.age = 19;
        raw.sex = "X".into();
        raw.fasting_bs = 2;
        raw.max_hr = 221;
        raw.st_slope = "up".into();

        let err = PatientRecord::build(&raw).expect_err("Should fail");
        assert_eq!(err.issues().len(), 5);

        let msg = err.to_string();
        assert!(msg.contains("Age 19 out of range [20, 100]"));
        assert!(msg.contains("FastingBS 2 must be 0 or 1"));
        assert!(msg.contains("ST_Slope 'up'"));
    }

    #[test]
    fn test_oldpeak_grid_and_finiteness() {
        let mut raw = sample_input();

        raw.oldpeak = 0.1 + 0.2;
        let record = PatientRecord::build(&raw).expect("0.3 is on the grid");
        assert_eq!(record.oldpeak(), 0.3);

        raw.oldpeak = 1.05;
        assert!(matches!(
            PatientRecord::build(&raw).expect_err("off grid").issues()[0],
            FieldIssue::OffStep { .. }
        ));

        raw.oldpeak = f64::NAN;
        assert!(matches!(
            PatientRecord::build(&raw).expect_err("nan").issues()[0],
            FieldIssue::NotFinite { .. }
        ));

        raw.oldpeak = 6.1;
        assert!(matches!(
            PatientRecord::build(&raw).expect_err("too high").issues()[0],
            FieldIssue::OutOfRange { .. }
        ));
    }

    #[test]
    fn test_deserialize_goes_through_validation() {
        let ok = r#"{"ST_Slope":"Flat","Age":61,"Sex":"F","ChestPainType":"ASY",
            "RestingBP":140,"Cholesterol":0,"FastingBS":1,"RestingECG":"LVH",
            "MaxHR":110,"ExerciseAngina":"Y","Oldpeak":2.5}"#;
        let record: PatientRecord = serde_json::from_str(ok).expect("Should parse");
        assert_eq!(record.st_slope(), StSlope::Flat);
        assert_eq!(record.fasting_bs(), 1);

        let bad = ok.replace("\"MaxHR\":110", "\"MaxHR\":300");
        assert!(serde_json::from_str::<PatientRecord>(&bad).is_err());
    }

    #[test]
    fn test_labels_are_case_sensitive() {
        assert_eq!("LVH".parse::<RestingEcg>(), Ok(RestingEcg::LeftVentricularHypertrophy));
        assert!("lvh".parse::<RestingEcg>().is_err());
        assert_eq!(ChestPainType::LABELS, &["ATA", "NAP", "ASY", "TA"]);
    }
}
