//! Hard per-skill minimum-level gate. Fails closed.

use crate::model::{Employee, Task};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Eligibility {
    Eligible,
    /// Task declares no requirements.
    NoRequirements,
    /// Employee has no usable skill entries.
    NoSkills,
    MissingSkill { skill: String },
    BelowLevel { skill: String, level: i64, required: i64 },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }

    pub fn reason(&self) -> String {
        match self {
            Eligibility::Eligible => "eligible".into(),
            Eligibility::NoRequirements => "task declares no skill requirements".into(),
            Eligibility::NoSkills => "employee has no skills".into(),
            Eligibility::MissingSkill { skill } => format!("missing skill {skill}"),
            Eligibility::BelowLevel {
                skill,
                level,
                required,
            } => format!("{skill} level {level} below required {required}"),
        }
    }
}

/// Levels compare as integers after truncation: 4.9 does not satisfy 5.
pub fn check(task: &Task, employee: &Employee) -> Eligibility {
    if task.requirements.is_empty() {
        return Eligibility::NoRequirements;
    }
    if employee.skills.is_empty() {
        return Eligibility::NoSkills;
    }
    for req in &task.requirements {
        let Some(record) = employee.skill(&req.name) else {
            return Eligibility::MissingSkill {
                skill: req.name.clone(),
            };
        };
        let level = record.level.trunc() as i64;
        let required = req.required_level.trunc() as i64;
        if level < required {
            return Eligibility::BelowLevel {
                skill: req.name.clone(),
                level,
                required,
            };
        }
    }
    Eligibility::Eligible
}

pub fn eligible(task: &Task, employee: &Employee) -> bool {
    check(task, employee).is_eligible()
}
