//! Lifestyle points for one insured member

use crate::input::Lifestyle;
use crate::preprocess::{loose_number, value_key};
use crate::rules::LifestyleRules;
use serde::Serialize;

/// Weekly activity minutes at or above which full points are given
pub const ACTIVITY_FULL_MINUTES: f64 = 150.0;
/// Weekly activity minutes at or above which partial points are given
pub const ACTIVITY_PARTIAL_MINUTES: f64 = 75.0;

/// Points per lifestyle subcomponent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LifestyleBreakdown {
    pub smoking: i64,
    pub alcohol: i64,
    pub physical_activity: i64,
    pub diet: i64,
    pub sleep: i64,
}

impl LifestyleBreakdown {
    pub fn total(&self) -> i64 {
        self.smoking + self.alcohol + self.physical_activity + self.diet + self.sleep
    }
}

/// 10 points for 150+ minutes a week, 6 for 75-149, otherwise (or unknown) 2
pub fn activity_points(minutes: Option<f64>) -> i64 {
    match minutes {
        Some(m) if m >= ACTIVITY_FULL_MINUTES => 10,
        Some(m) if m >= ACTIVITY_PARTIAL_MINUTES => 6,
        _ => 2,
    }
}

/// 6 points for 7-9h with quality other than poor, 3 for 6-7h or 9-10h, else 0
pub fn sleep_points(hours: Option<f64>, quality: Option<&str>) -> i64 {
    let Some(h) = hours else {
        return 0;
    };
    if (7.0..=9.0).contains(&h) && quality != Some("POOR") {
        6
    } else if (6.0..7.0).contains(&h) || (h > 9.0 && h <= 10.0) {
        3
    } else {
        0
    }
}

/// Score a member's lifestyle answers. A missing questionnaire scores as all-unknown.
pub fn lifestyle_points(lifestyle: Option<&Lifestyle>, rules: &LifestyleRules) -> LifestyleBreakdown {
    let empty = Lifestyle::default();
    let answers = lifestyle.unwrap_or(&empty);

    let smoking = value_key(answers.smoking_status.as_ref());
    let alcohol = value_key(answers.alcohol_consumption.as_ref());
    let diet = value_key(answers.diet.as_ref());
    let sleep_quality = value_key(answers.sleep_quality.as_ref());

    LifestyleBreakdown {
        smoking: rules.smoking.points(smoking.as_deref()),
        alcohol: rules.alcohol.points(alcohol.as_deref()),
        physical_activity: activity_points(loose_number(answers.physical_activity.as_ref())),
        diet: rules.diet.points(diet.as_deref()),
        sleep: sleep_points(
            loose_number(answers.sleep_hours.as_ref()),
            sleep_quality.as_deref(),
        ),
    }
}
