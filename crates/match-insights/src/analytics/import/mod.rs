mod parser;

use super::domain::{DataIntegrityError, Dbn, ResultSnapshot, School, Student, StudentId};
use std::collections::BTreeMap;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read result data: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("snapshot failed validation: {0}")]
    Integrity(#[from] DataIntegrityError),
    #[error("record '{record}' has an invalid {field}: '{value}'")]
    InvalidField {
        record: String,
        field: &'static str,
        value: String,
    },
    #[error("duplicate record '{0}'")]
    DuplicateRecord(String),
}

/// Loads the simulation's result set. Every snapshot leaving the importer has
/// passed [`ResultSnapshot::validate`].
pub struct SnapshotImporter;

impl SnapshotImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ResultSnapshot, ImportError> {
        let file = std::fs::File::open(path.as_ref())?;
        let snapshot = Self::from_reader(BufReader::new(file))?;
        info!(
            path = %path.as_ref().display(),
            students = snapshot.students.len(),
            schools = snapshot.schools.len(),
            "loaded result snapshot"
        );
        Ok(snapshot)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<ResultSnapshot, ImportError> {
        let snapshot: ResultSnapshot = serde_json::from_reader(reader)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn students_from_csv<R: Read>(reader: R) -> Result<Vec<Student>, ImportError> {
        parser::parse_students(reader)
    }

    pub fn schools_from_csv<R: Read>(reader: R) -> Result<Vec<School>, ImportError> {
        parser::parse_schools(reader)
    }

    /// Replaces the snapshot's student records with a CSV table.
    pub fn with_student_table<R: Read>(
        mut snapshot: ResultSnapshot,
        reader: R,
    ) -> Result<ResultSnapshot, ImportError> {
        let mut students: BTreeMap<StudentId, Student> = BTreeMap::new();
        for student in Self::students_from_csv(reader)? {
            if students.contains_key(&student.id) {
                return Err(ImportError::DuplicateRecord(student.id.0));
            }
            students.insert(student.id.clone(), student);
        }
        snapshot.students = students;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Replaces the snapshot's school records with a CSV table.
    pub fn with_school_table<R: Read>(
        mut snapshot: ResultSnapshot,
        reader: R,
    ) -> Result<ResultSnapshot, ImportError> {
        let mut schools: BTreeMap<Dbn, School> = BTreeMap::new();
        for school in Self::schools_from_csv(reader)? {
            if schools.contains_key(&school.dbn) {
                return Err(ImportError::DuplicateRecord(school.dbn.0));
            }
            schools.insert(school.dbn.clone(), school);
        }
        snapshot.schools = schools;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
