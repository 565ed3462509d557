use super::super::domain::{
    AdmissionPolicy, Dbn, RankingStrategy, School, SelectionStrategy, Student, StudentId,
};
use super::super::lottery::LotteryNumber;
use super::ImportError;
use serde::{Deserialize, Deserializer};
use std::io::Read;

pub(crate) fn parse_students<R: Read>(reader: R) -> Result<Vec<Student>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut students = Vec::new();

    for record in csv_reader.deserialize::<StudentRow>() {
        let row = record?;
        students.push(row.into_student()?);
    }

    Ok(students)
}

pub(crate) fn parse_schools<R: Read>(reader: R) -> Result<Vec<School>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut schools = Vec::new();

    for record in csv_reader.deserialize::<SchoolRow>() {
        let row = record?;
        schools.push(School {
            dbn: Dbn(row.dbn),
            policy: row.policy,
            popularity: row.popularity,
            likeability: row.likeability,
            name: row.name,
        });
    }

    Ok(schools)
}

#[derive(Debug, Deserialize)]
struct StudentRow {
    id: String,
    lottery: String,
    gpa: f64,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    selection: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    ranking: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    list_length: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    preferences: Option<String>,
}

impl StudentRow {
    fn into_student(self) -> Result<Student, ImportError> {
        let lottery = LotteryNumber::parse(&self.lottery)?;
        let selection = self
            .selection
            .as_deref()
            .map(|raw| parse_selection(&self.id, raw))
            .transpose()?;
        let ranking = self
            .ranking
            .as_deref()
            .map(|raw| parse_ranking(&self.id, raw))
            .transpose()?;
        let preferences: Vec<Dbn> = self
            .preferences
            .as_deref()
            .map(split_preferences)
            .unwrap_or_default();
        let list_length = match self.list_length.as_deref() {
            Some(raw) => raw.parse::<usize>().map_err(|_| ImportError::InvalidField {
                record: self.id.clone(),
                field: "list_length",
                value: raw.to_string(),
            })?,
            None => preferences.len(),
        };

        Ok(Student {
            id: StudentId(self.id),
            lottery,
            gpa: self.gpa,
            selection,
            ranking,
            list_length,
            preferences,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SchoolRow {
    dbn: String,
    #[serde(deserialize_with = "policy_from_label")]
    policy: AdmissionPolicy,
    popularity: f64,
    likeability: f64,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
}

fn split_preferences(raw: &str) -> Vec<Dbn> {
    raw.split(';')
        .map(str::trim)
        .filter(|dbn| !dbn.is_empty())
        .map(|dbn| Dbn(dbn.to_string()))
        .collect()
}

/// Missing strategies mirror the simulation's "not defined" sentinel.
fn parse_selection(record: &str, raw: &str) -> Result<SelectionStrategy, ImportError> {
    match normalize_label(raw).as_str() {
        "random" | "1" => Ok(SelectionStrategy::Random),
        "popularity" | "popularity-based" | "2" => Ok(SelectionStrategy::Popularity),
        _ => Err(ImportError::InvalidField {
            record: record.to_string(),
            field: "selection",
            value: raw.to_string(),
        }),
    }
}

fn parse_ranking(record: &str, raw: &str) -> Result<RankingStrategy, ImportError> {
    match normalize_label(raw).as_str() {
        "random" | "1" => Ok(RankingStrategy::Random),
        "likeability" | "likeability-based" | "2" => Ok(RankingStrategy::Likeability),
        _ => Err(ImportError::InvalidField {
            record: record.to_string(),
            field: "ranking",
            value: raw.to_string(),
        }),
    }
}

fn parse_policy(raw: &str) -> Option<AdmissionPolicy> {
    match normalize_label(raw).as_str() {
        "open" | "1" => Some(AdmissionPolicy::Open),
        "edopt" | "ed_opt" | "ed-opt" | "2" => Some(AdmissionPolicy::EdOpt),
        "screen" | "screened" | "3" => Some(AdmissionPolicy::Screen),
        _ => None,
    }
}

fn normalize_label(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

fn policy_from_label<'de, D>(deserializer: D) -> Result<AdmissionPolicy, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_policy(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown admission policy '{raw}'")))
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
