use serde::{Deserialize, Serialize};

/// A coaching plan: day-wise workouts plus a meal schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Plan {
    pub name: String,
    pub title: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default)]
    pub workouts: Vec<Workout>,
    #[serde(default)]
    pub meals: Vec<Meal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Workout {
    pub day: Option<String>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Exercise {
    pub exercise_name: String,
    pub sets: Option<u32>,
    pub reps: Option<String>,
    pub rest_seconds: Option<u32>,
    /// Demonstration image URL; may be relative to the API host.
    pub image: Option<String>,
    /// Demonstration video URL; may be relative to the API host.
    pub video: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Meal {
    pub day: Option<String>,
    pub meal_type: Option<String>,
    #[serde(default)]
    pub items: Vec<MealItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct MealItem {
    pub food: String,
    pub quantity: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
}

impl Plan {
    /// Display title, falling back to the record id.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }
}
