//! # Prescription Value Domains
//!
//! Every optometric field of the OS form only accepts a fixed set of discrete
//! values. Labs downstream match on the exact option labels, so input is
//! parsed, checked against its domain and stored in canonical form.
//!
//! ## Domains (internally in hundredths)
//! ```text
//! ┌──────────────┬───────────┬───────────┬────────┬─────────────┐
//! │ Measure      │ Min       │ Max       │ Step   │ Label       │
//! ├──────────────┼───────────┼───────────┼────────┼─────────────┤
//! │ esfera       │ -6.00     │ +6.00     │ 0.25   │ "+1.25"     │
//! │ cilindro     │ -6.00     │  0.00     │ 0.25   │ "-0.75"     │
//! │ eixo         │ 0         │ 180       │ 1      │ "90"        │
//! │ adicao       │ +0.75     │ +3.50     │ 0.25   │ "+2.00"     │
//! │ dnp          │ 24.0      │ 40.0      │ 0.5    │ "31.5"      │
//! │ altura       │ 16.0      │ 35.0      │ 0.5    │ "18.0"      │
//! └──────────────┴───────────┴───────────┴────────┴─────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Measures
// =============================================================================

/// One kind of optometric measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    Sphere,
    Cylinder,
    Axis,
    Addition,
    Dnp,
    Height,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelStyle {
    /// Signed, two decimals: `+1.25`, `0.00`, `-0.50`.
    Diopter,
    /// Whole number: `90`.
    Degrees,
    /// One decimal: `31.5`.
    Millimeters,
}

/// Inclusive range with a fixed step, all in hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueDomain {
    pub min: i32,
    pub max: i32,
    pub step: i32,
}

impl ValueDomain {
    pub fn contains(&self, hundredths: i32) -> bool {
        hundredths >= self.min
            && hundredths <= self.max
            && (hundredths - self.min) % self.step == 0
    }

    pub fn len(&self) -> usize {
        ((self.max - self.min) / self.step + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.max < self.min
    }

    pub fn values(&self) -> impl Iterator<Item = i32> {
        let ValueDomain { min, step, .. } = *self;
        (0..self.len() as i32).map(move |i| min + i * step)
    }
}

impl Measure {
    /// Document field name.
    pub const fn field(&self) -> &'static str {
        match self {
            Measure::Sphere => "esfera",
            Measure::Cylinder => "cilindro",
            Measure::Axis => "eixo",
            Measure::Addition => "adicao",
            Measure::Dnp => "distancia_interpupilar",
            Measure::Height => "altura",
        }
    }

    pub const fn domain(&self) -> ValueDomain {
        match self {
            Measure::Sphere => ValueDomain { min: -600, max: 600, step: 25 },
            Measure::Cylinder => ValueDomain { min: -600, max: 0, step: 25 },
            Measure::Axis => ValueDomain { min: 0, max: 18_000, step: 100 },
            Measure::Addition => ValueDomain { min: 75, max: 350, step: 25 },
            Measure::Dnp => ValueDomain { min: 2_400, max: 4_000, step: 50 },
            Measure::Height => ValueDomain { min: 1_600, max: 3_500, step: 50 },
        }
    }

    fn style(&self) -> LabelStyle {
        match self {
            Measure::Sphere | Measure::Cylinder | Measure::Addition => LabelStyle::Diopter,
            Measure::Axis => LabelStyle::Degrees,
            Measure::Dnp | Measure::Height => LabelStyle::Millimeters,
        }
    }

    /// Canonical label for a value in hundredths.
    pub fn label(&self, hundredths: i32) -> String {
        let sign = if hundredths < 0 { "-" } else { "" };
        let abs = hundredths.abs();
        match self.style() {
            LabelStyle::Diopter => {
                let sign = if hundredths > 0 { "+" } else { sign };
                format!("{}{}.{:02}", sign, abs / 100, abs % 100)
            }
            LabelStyle::Degrees => format!("{}{}", sign, abs / 100),
            LabelStyle::Millimeters => format!("{}{}.{}", sign, abs / 100, (abs % 100) / 10),
        }
    }

    /// Every accepted label, in ascending order. Feeds the form selects.
    pub fn options(&self) -> Vec<String> {
        self.domain().values().map(|v| self.label(v)).collect()
    }

    /// Parses operator input into hundredths and checks the domain.
    pub fn parse(&self, raw: &str) -> Result<i32, ValidationError> {
        let not_in_domain = || ValidationError::NotInDomain {
            field: self.field().to_string(),
            value: raw.trim().to_string(),
        };
        let value = parse_hundredths(raw).ok_or_else(not_in_domain)?;
        if !self.domain().contains(value) {
            return Err(not_in_domain());
        }
        Ok(value)
    }

    /// Parses and re-labels. `"1,5"` → `"+1.50"` for sphere.
    pub fn canonical(&self, raw: &str) -> Result<String, ValidationError> {
        self.parse(raw).map(|v| self.label(v))
    }
}

/// Decimal text to hundredths without going through floats.
///
/// Accepts an optional sign, `.` or `,` as separator and up to two
/// significant fraction digits.
fn parse_hundredths(raw: &str) -> Option<i32> {
    let text = raw.trim().replace(',', ".");
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(&text)),
    };

    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let frac_trimmed = frac_part.trim_end_matches('0');
    if frac_trimmed.len() > 2 || int_part.len() > 6 {
        return None;
    }

    let whole: i32 = int_part.parse().ok()?;
    let frac: i32 = match frac_trimmed.len() {
        0 => 0,
        1 => frac_trimmed.parse::<i32>().ok()? * 10,
        _ => frac_trimmed.parse().ok()?,
    };

    let magnitude = whole * 100 + frac;
    Some(if negative { -magnitude } else { magnitude })
}

// =============================================================================
// Prescription
// =============================================================================

/// Readings for one eye. Values are canonical labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EyeReading {
    #[serde(rename = "esfera")]
    pub sphere: Option<String>,
    #[serde(rename = "cilindro")]
    pub cylinder: Option<String>,
    #[serde(rename = "eixo")]
    pub axis: Option<String>,
    #[serde(rename = "adicao")]
    pub addition: Option<String>,
}

/// A measurement taken per eye.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PerEye {
    #[serde(rename = "direito")]
    pub right: Option<String>,
    #[serde(rename = "esquerdo")]
    pub left: Option<String>,
}

/// The `receita` block of an OS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Prescription {
    #[serde(rename = "olho_direito")]
    pub right_eye: EyeReading,
    #[serde(rename = "olho_esquerdo")]
    pub left_eye: EyeReading,
    #[serde(rename = "distancia_interpupilar")]
    pub pupillary_distance: PerEye,
    #[serde(rename = "altura")]
    pub height: PerEye,
}

fn normalize_field(measure: Measure, value: &Option<String>) -> Result<Option<String>, ValidationError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => measure.canonical(raw).map(Some),
    }
}

impl EyeReading {
    fn normalized(&self, eye: &str) -> Result<EyeReading, ValidationError> {
        let reading = EyeReading {
            sphere: normalize_field(Measure::Sphere, &self.sphere)?,
            cylinder: normalize_field(Measure::Cylinder, &self.cylinder)?,
            axis: normalize_field(Measure::Axis, &self.axis)?,
            addition: normalize_field(Measure::Addition, &self.addition)?,
        };

        let has_cylinder = reading
            .cylinder
            .as_deref()
            .is_some_and(|c| c != "0.00");
        if has_cylinder && reading.axis.is_none() {
            return Err(ValidationError::required(format!("{}.eixo", eye)));
        }

        Ok(reading)
    }

    pub fn is_empty(&self) -> bool {
        self.sphere.is_none()
            && self.cylinder.is_none()
            && self.axis.is_none()
            && self.addition.is_none()
    }
}

impl PerEye {
    fn normalized(&self, measure: Measure) -> Result<PerEye, ValidationError> {
        Ok(PerEye {
            right: normalize_field(measure, &self.right)?,
            left: normalize_field(measure, &self.left)?,
        })
    }
}

impl Prescription {
    /// Validates every field against its domain and returns canonical labels.
    ///
    /// Blank fields become `None`. A non-zero cylinder requires an axis on
    /// the same eye.
    pub fn normalized(&self) -> Result<Prescription, ValidationError> {
        Ok(Prescription {
            right_eye: self.right_eye.normalized("olho_direito")?,
            left_eye: self.left_eye.normalized("olho_esquerdo")?,
            pupillary_distance: self.pupillary_distance.normalized(Measure::Dnp)?,
            height: self.height.normalized(Measure::Height)?,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
