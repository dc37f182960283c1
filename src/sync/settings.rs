//! Account settings and their partial, null-means-unchanged wire form.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{GradeScale, ScheduleWeek};

/// How final grades are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpaOptions {
    /// GPA on a grade scale.
    #[default]
    Normal,
    /// Plain percentages, as schools in Mexico report them.
    UsePercents,
}

/// Settings changes. `None` leaves the receiver's value untouched; it never clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SyncedSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpa_option: Option<GpaOptions>,
    /// Only the date matters: week one starts that day, week two seven days later.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_one_starts_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_semester_id: Option<Uuid>,
    /// IANA zone name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_time_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_grade_scale: Option<Vec<GradeScale>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_does_round_grades_up: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_does_average_grade_totals: Option<bool>,
}

impl SyncedSettings {
    pub fn is_empty(&self) -> bool {
        self == &SyncedSettings::default()
    }

    /// Folds `newer` into `self`, keeping fields `newer` leaves unset.
    pub fn merge(&mut self, newer: &SyncedSettings) {
        overlay(&mut self.gpa_option, &newer.gpa_option);
        overlay(&mut self.week_one_starts_on, &newer.week_one_starts_on);
        overlay(&mut self.selected_semester_id, &newer.selected_semester_id);
        overlay(&mut self.school_time_zone, &newer.school_time_zone);
        overlay(&mut self.default_grade_scale, &newer.default_grade_scale);
        overlay(
            &mut self.default_does_round_grades_up,
            &newer.default_does_round_grades_up,
        );
        overlay(
            &mut self.default_does_average_grade_totals,
            &newer.default_does_average_grade_totals,
        );
    }
}

fn overlay<T: Clone>(current: &mut Option<T>, newer: &Option<T>) {
    if let Some(value) = newer {
        *current = Some(value.clone());
    }
}

/// Resolved settings as a device or the server holds them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Settings {
    pub gpa_option: GpaOptions,
    pub week_one_starts_on: Option<NaiveDate>,
    pub selected_semester_id: Option<Uuid>,
    pub school_time_zone: Option<String>,
    pub default_grade_scale: Vec<GradeScale>,
    pub default_does_round_grades_up: bool,
    pub default_does_average_grade_totals: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gpa_option: GpaOptions::Normal,
            week_one_starts_on: None,
            selected_semester_id: None,
            school_time_zone: None,
            default_grade_scale: GradeScale::default_scale(),
            default_does_round_grades_up: true,
            default_does_average_grade_totals: false,
        }
    }
}

impl Settings {
    /// Applies the fields `changes` carries. Returns whether the default grade scale
    /// changed, which bumps its version on the server.
    pub fn apply(&mut self, changes: &SyncedSettings) -> bool {
        if let Some(gpa_option) = changes.gpa_option {
            self.gpa_option = gpa_option;
        }
        if let Some(week_one_starts_on) = changes.week_one_starts_on {
            self.week_one_starts_on = Some(week_one_starts_on);
        }
        if let Some(selected_semester_id) = changes.selected_semester_id {
            self.selected_semester_id = Some(selected_semester_id);
        }
        if let Some(school_time_zone) = &changes.school_time_zone {
            self.school_time_zone = Some(school_time_zone.clone());
        }
        if let Some(round_up) = changes.default_does_round_grades_up {
            self.default_does_round_grades_up = round_up;
        }
        if let Some(average) = changes.default_does_average_grade_totals {
            self.default_does_average_grade_totals = average;
        }

        match &changes.default_grade_scale {
            Some(scale) if *scale != self.default_grade_scale => {
                self.default_grade_scale = scale.clone();
                true
            }
            _ => false,
        }
    }

    /// Every field set, for sending the complete state.
    pub fn to_synced(&self) -> SyncedSettings {
        SyncedSettings {
            gpa_option: Some(self.gpa_option),
            week_one_starts_on: self.week_one_starts_on,
            selected_semester_id: self.selected_semester_id,
            school_time_zone: self.school_time_zone.clone(),
            default_grade_scale: Some(self.default_grade_scale.clone()),
            default_does_round_grades_up: Some(self.default_does_round_grades_up),
            default_does_average_grade_totals: Some(self.default_does_average_grade_totals),
        }
    }

    /// Week of the two-week rotation `date` falls in, if the rotation is anchored.
    pub fn week_for(&self, date: NaiveDate) -> Option<ScheduleWeek> {
        self.week_one_starts_on
            .map(|anchor| ScheduleWeek::for_date(anchor, date))
    }
}
