use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Forearms,
    Abs,
    Quads,
    Hamstrings,
    Glutes,
    Calves,
}

impl MuscleGroup {
    pub const ALL: [MuscleGroup; 11] = [
        MuscleGroup::Chest,
        MuscleGroup::Back,
        MuscleGroup::Shoulders,
        MuscleGroup::Biceps,
        MuscleGroup::Triceps,
        MuscleGroup::Forearms,
        MuscleGroup::Abs,
        MuscleGroup::Quads,
        MuscleGroup::Hamstrings,
        MuscleGroup::Glutes,
        MuscleGroup::Calves,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Back => "back",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Biceps => "biceps",
            MuscleGroup::Triceps => "triceps",
            MuscleGroup::Forearms => "forearms",
            MuscleGroup::Abs => "abs",
            MuscleGroup::Quads => "quads",
            MuscleGroup::Hamstrings => "hamstrings",
            MuscleGroup::Glutes => "glutes",
            MuscleGroup::Calves => "calves",
        }
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MuscleGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        MuscleGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| format!("Unknown muscle group: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(rename = "muscleGroups", default)]
    pub muscle_groups: Vec<MuscleGroup>,
}

impl Exercise {
    /// Build an exercise, keeping the muscle groups sorted and unique.
    pub fn new(id: impl Into<String>, name: impl Into<String>, groups: impl IntoIterator<Item = MuscleGroup>) -> Self {
        let mut muscle_groups: Vec<MuscleGroup> = groups.into_iter().collect();
        muscle_groups.sort();
        muscle_groups.dedup();
        Self {
            id: id.into(),
            name: name.into(),
            muscle_groups,
        }
    }

    pub fn trains(&self, group: MuscleGroup) -> bool {
        self.muscle_groups.contains(&group)
    }

    /// Comma-joined tags, the form the history database stores.
    pub fn muscle_groups_csv(&self) -> String {
        self.muscle_groups
            .iter()
            .map(MuscleGroup::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse the comma-joined form, skipping unknown tags.
    pub fn parse_muscle_groups(csv: &str) -> Vec<MuscleGroup> {
        csv.split(',')
            .filter(|s| !s.trim().is_empty())
            .filter_map(|s| s.parse().ok())
            .collect()
    }
}
