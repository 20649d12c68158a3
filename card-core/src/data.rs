//! Daily health log data shown on the card.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{CardError, CardResult};

/// Default daily calorie target when the payload carries none.
pub const DEFAULT_CALORIE_TARGET: f64 = 2100.0;
/// Protein target in grams.
pub const PROTEIN_TARGET_G: f64 = 160.0;
/// Fat target in grams.
pub const FAT_TARGET_G: f64 = 65.0;
/// Carbohydrate target in grams.
pub const CARBS_TARGET_G: f64 = 240.0;

/// Body weight reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightReading {
    /// Current weight in kilograms.
    pub current: f64,
    /// Change since the previous reading.
    pub diff: f64,
}

/// Calorie intake against target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalorieIntake {
    /// Calories eaten today.
    pub current: f64,
    /// Daily target.
    pub target: f64,
}

/// One macronutrient against its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroAmount {
    /// Amount eaten.
    pub current: f64,
    /// Daily target.
    pub target: f64,
    /// Unit label.
    pub unit: String,
}

impl MacroAmount {
    /// Grams against a gram target.
    #[must_use]
    pub fn grams(current: f64, target: f64) -> Self {
        Self {
            current,
            target,
            unit: "g".to_string(),
        }
    }

    /// Progress toward the target in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.target > 0.0 && self.current.is_finite() {
            (self.current / self.target).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Protein / fat / carbohydrate balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroBalance {
    /// Protein.
    pub p: MacroAmount,
    /// Fat.
    pub f: MacroAmount,
    /// Carbohydrates.
    pub c: MacroAmount,
}

/// Exercise summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSummary {
    /// Minutes exercised.
    pub minutes: f64,
    /// Calories burned.
    pub calories_burned: f64,
}

/// Everything the card displays for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLogData {
    /// Day the log refers to.
    pub date: NaiveDate,
    /// Weight reading.
    pub weight: WeightReading,
    /// Calorie intake.
    pub calories: CalorieIntake,
    /// Macro balance.
    pub pfc: MacroBalance,
    /// Exercise summary.
    pub exercise: ExerciseSummary,
    /// Overall achievement in percent.
    pub achievement_rate: f64,
}

impl DailyLogData {
    /// Built-in sample log used when no valid payload is available.
    #[must_use]
    pub fn sample(today: NaiveDate) -> Self {
        Self {
            date: today,
            weight: WeightReading {
                current: 72.4,
                diff: -0.4,
            },
            calories: CalorieIntake {
                current: 1850.0,
                target: DEFAULT_CALORIE_TARGET,
            },
            pfc: MacroBalance {
                p: MacroAmount::grams(145.0, PROTEIN_TARGET_G),
                f: MacroAmount::grams(48.0, FAT_TARGET_G),
                c: MacroAmount::grams(210.0, CARBS_TARGET_G),
            },
            exercise: ExerciseSummary {
                minutes: 45.0,
                calories_burned: 320.0,
            },
            achievement_rate: 88.0,
        }
    }

    /// Build a log from the flat payload shape shared by the legacy and
    /// secure query formats.
    ///
    /// Missing or non-numeric fields become zero; the calorie target falls
    /// back to [`DEFAULT_CALORIE_TARGET`] and the date to `today`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a JSON object.
    pub fn from_payload(payload: &serde_json::Value, today: NaiveDate) -> CardResult<Self> {
        let object = payload
            .as_object()
            .ok_or_else(|| CardError::Decode("payload is not an object".to_string()))?;

        let number = |key: &str| object.get(key).map_or(0.0, coerce_number);
        let calorie_target = match number("caloriesTarget") {
            t if t.abs() < f64::EPSILON => DEFAULT_CALORIE_TARGET,
            t => t,
        };

        Ok(Self {
            date: object.get("date").and_then(parse_date).unwrap_or(today),
            weight: WeightReading {
                current: number("weight"),
                diff: number("weightDiff"),
            },
            calories: CalorieIntake {
                current: number("calories"),
                target: calorie_target,
            },
            pfc: MacroBalance {
                p: MacroAmount::grams(number("protein"), PROTEIN_TARGET_G),
                f: MacroAmount::grams(number("fat"), FAT_TARGET_G),
                c: MacroAmount::grams(number("carbs"), CARBS_TARGET_G),
            },
            exercise: ExerciseSummary {
                minutes: number("exerciseTime"),
                calories_burned: number("exerciseBurned"),
            },
            achievement_rate: number("achievementRate"),
        })
    }
}

/// Numeric coercion matching loosely typed payload producers: numbers pass
/// through, numeric strings parse, booleans map to 0/1, everything else is 0.
fn coerce_number(value: &serde_json::Value) -> f64 {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        serde_json::Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and epoch milliseconds.
fn parse_date(value: &serde_json::Value) -> Option<NaiveDate> {
    match value {
        serde_json::Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.date_naive())
                .ok()
                .or_else(|| NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok())
        }
        serde_json::Value::Number(n) => {
            DateTime::from_timestamp_millis(n.as_i64()?).map(|dt| dt.date_naive())
        }
        _ => None,
    }
}
