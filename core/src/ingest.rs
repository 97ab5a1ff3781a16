//! Ingestion boundary: raw tracker records → normalized entities.
//!
//! Skill entries arrive in three shapes (positional tuple, keyed object,
//! or a string such as `"(API,4.2,2024-06-01)"`). They are normalized here,
//! once. A malformed entry is dropped and reported; the owning record is kept.

use crate::{
    error::MatchError,
    model::{Employee, SkillRecord, SkillRequirement, Task},
    types::{EmployeeId, TaskId},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A skill entry exactly as a source delivered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSkillEntry {
    Tuple(Vec<Value>),
    Encoded(String),
    Keyed(KeyedSkill),
    Unrecognized(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedSkill {
    #[serde(default, alias = "habilidad", alias = "skill")]
    pub name: Option<String>,
    #[serde(
        default,
        alias = "level",
        alias = "nivel_actual",
        alias = "required_level",
        alias = "experiencia"
    )]
    pub value: Option<Value>,
    #[serde(default, alias = "fecha_modificacion")]
    pub updated_at: Option<String>,
}

impl From<&SkillRecord> for RawSkillEntry {
    fn from(s: &SkillRecord) -> Self {
        RawSkillEntry::Keyed(KeyedSkill {
            name: Some(s.name.clone()),
            value: serde_json::Number::from_f64(s.level).map(Value::Number),
            updated_at: s.updated_at.map(|d| d.format("%Y-%m-%d").to_string()),
        })
    }
}

impl From<&SkillRequirement> for RawSkillEntry {
    fn from(r: &SkillRequirement) -> Self {
        RawSkillEntry::Keyed(KeyedSkill {
            name: Some(r.name.clone()),
            value: serde_json::Number::from_f64(r.required_level).map(Value::Number),
            updated_at: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub key: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub skills: Vec<RawSkillEntry>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub actual_hours: Option<f64>,
    #[serde(default)]
    pub assignee: Option<EmployeeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: EmployeeId,
    #[serde(default)]
    pub skills: Vec<RawSkillEntry>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub tenure_days: Option<i64>,
}

fn default_active() -> bool {
    true
}

/// A parsed but not yet range-checked skill entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSkill {
    pub name: String,
    pub value: f64,
    pub updated_at: Option<NaiveDate>,
}

/// Parse one raw entry. Anything that does not yield a non-empty name and a
/// finite number is malformed.
pub fn parse_skill_entry(owner: &str, entry: &RawSkillEntry) -> Result<ParsedSkill, MatchError> {
    let malformed = || MatchError::MalformedRecord {
        owner: owner.to_string(),
        raw: serde_json::to_string(entry).unwrap_or_else(|_| format!("{entry:?}")),
    };

    let (name, value, date) = match entry {
        RawSkillEntry::Tuple(parts) => {
            if parts.len() < 2 {
                return Err(malformed());
            }
            let name = parts[0].as_str().map(str::to_string);
            let value = value_as_f64(&parts[1]);
            let date = parts.get(2).and_then(|v| v.as_str()).and_then(parse_date);
            (name, value, date)
        }
        RawSkillEntry::Encoded(raw) => {
            let inner = raw.trim().trim_start_matches('(').trim_end_matches(')');
            let parts: Vec<&str> = inner
                .split(',')
                .map(|p| p.trim().trim_matches(|c| c == '\'' || c == '"'))
                .collect();
            if parts.len() < 2 {
                return Err(malformed());
            }
            let value = parts[1].parse::<f64>().ok();
            let date = parts.get(2).and_then(|d| parse_date(d));
            (Some(parts[0].to_string()), value, date)
        }
        RawSkillEntry::Keyed(k) => (
            k.name.clone(),
            k.value.as_ref().and_then(value_as_f64),
            k.updated_at.as_deref().and_then(parse_date),
        ),
        RawSkillEntry::Unrecognized(_) => return Err(malformed()),
    };

    match (name.map(|n| n.trim().to_string()), value) {
        (Some(name), Some(value)) if !name.is_empty() && value.is_finite() => Ok(ParsedSkill {
            name,
            value,
            updated_at: date,
        }),
        _ => Err(malformed()),
    }
}

fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_datetime(raw).map(|dt| dt.date())
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, ISO `T` separated, RFC 3339, or a bare date.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Insert keeping first-seen position; a later duplicate name overwrites the value.
fn upsert<T>(items: &mut Vec<T>, item: T, name_of: impl Fn(&T) -> &str) {
    match items.iter().position(|x| name_of(x) == name_of(&item)) {
        Some(i) => items[i] = item,
        None => items.push(item),
    }
}

/// Normalize an employee's raw skill list. Entries outside [1, 10] are malformed.
pub fn normalize_employee(record: &EmployeeRecord) -> (Employee, Vec<MatchError>) {
    let owner = format!("employee {}", record.id);
    let mut issues = Vec::new();
    let mut skills: Vec<SkillRecord> = Vec::new();

    for entry in &record.skills {
        match parse_skill_entry(&owner, entry) {
            Ok(p) if (1.0..=10.0).contains(&p.value) => upsert(
                &mut skills,
                SkillRecord {
                    name: p.name,
                    level: p.value,
                    updated_at: p.updated_at,
                },
                |s| s.name.as_str(),
            ),
            Ok(p) => issues.push(MatchError::MalformedRecord {
                owner: owner.clone(),
                raw: format!("{} level {} outside [1, 10]", p.name, p.value),
            }),
            Err(e) => issues.push(e),
        }
    }

    let employee = Employee {
        id: record.id.clone(),
        skills,
        tenure_days: record.tenure_days.unwrap_or(0).max(0),
        active: record.active,
    };
    (employee, issues)
}

/// Normalize a task. An unparsable date becomes a data gap and the task is
/// kept undated (the selector will skip it).
pub fn normalize_task(record: &TaskRecord) -> (Task, Vec<MatchError>) {
    let owner = format!("task {}", record.key);
    let mut issues = Vec::new();
    let mut requirements: Vec<SkillRequirement> = Vec::new();

    for entry in &record.skills {
        match parse_skill_entry(&owner, entry) {
            Ok(p) if p.value >= 0.0 => upsert(
                &mut requirements,
                SkillRequirement {
                    name: p.name,
                    required_level: p.value,
                },
                |r| r.name.as_str(),
            ),
            Ok(p) => issues.push(MatchError::MalformedRecord {
                owner: owner.clone(),
                raw: format!("{} negative requirement {}", p.name, p.value),
            }),
            Err(e) => issues.push(e),
        }
    }

    let date = match record.date.as_deref() {
        None => None,
        Some(raw) => {
            let parsed = parse_datetime(raw);
            if parsed.is_none() {
                issues.push(MatchError::DataGap {
                    entity: "task",
                    id: record.key.clone(),
                    detail: format!("unparsable date '{raw}'"),
                });
            }
            parsed
        }
    };

    let task = Task {
        id: record.id,
        key: record.key.clone(),
        project: record.project.clone().filter(|p| !p.trim().is_empty()),
        requirements,
        text: record.text.clone().unwrap_or_default(),
        status: record.status.clone().unwrap_or_default(),
        issue_type: record.issue_type.clone().unwrap_or_default(),
        date,
        estimated_hours: record.estimated_hours.filter(|h| h.is_finite()),
        actual_hours: record.actual_hours.filter(|h| h.is_finite() && *h >= 0.0),
        assignee: record.assignee.clone().filter(|a| !a.trim().is_empty()),
    };
    (task, issues)
}
