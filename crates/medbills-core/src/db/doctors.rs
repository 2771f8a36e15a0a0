//! Doctor database operations.

use super::{constraint_or, Database, StoreResult};
use crate::models::{Doctor, NewDoctor, RecordId};

impl Database {
    /// Insert a doctor. Duplicate names are a constraint violation.
    pub fn insert_doctor(&self, doctor: &NewDoctor) -> StoreResult<Doctor> {
        let id = RecordId::generate();
        self.conn
            .execute(
                "INSERT INTO doctors (id, name) VALUES (?1, ?2)",
                [id.as_str(), doctor.name.as_str()],
            )
            .map_err(|e| constraint_or(e, &format!("doctor '{}' already exists", doctor.name)))?;

        Ok(Doctor {
            id,
            name: doctor.name.clone(),
        })
    }

    /// List all doctors, ordered by name.
    pub fn list_doctors(&self) -> StoreResult<Vec<Doctor>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM doctors ORDER BY name ASC")?;

        let rows = stmt.query_map([], |row| {
            Ok(Doctor {
                id: RecordId::new(row.get::<_, String>(0)?),
                name: row.get(1)?,
            })
        })?;

        let mut doctors = Vec::new();
        for row in rows {
            doctors.push(row?);
        }
        Ok(doctors)
    }

    /// Delete a doctor.
    pub fn delete_doctor(&self, id: &RecordId) -> StoreResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM doctors WHERE id = ?", [id.as_str()])?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;

    #[test]
    fn test_insert_and_list_sorted() {
        let db = Database::open_in_memory().unwrap();
        db.insert_doctor(&NewDoctor::new("Dr. Smith")).unwrap();
        db.insert_doctor(&NewDoctor::new("Dr. Adams")).unwrap();
        db.insert_doctor(&NewDoctor::new("Dr. Mehta")).unwrap();

        let names: Vec<String> = db.list_doctors().unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Dr. Adams", "Dr. Mehta", "Dr. Smith"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.insert_doctor(&NewDoctor::new("Dr. Smith")).unwrap();

        let err = db.insert_doctor(&NewDoctor::new("Dr. Smith")).unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));

        // Case differs, so this is a different doctor
        assert!(db.insert_doctor(&NewDoctor::new("dr. smith")).is_ok());
    }

    #[test]
    fn test_delete_doctor() {
        let db = Database::open_in_memory().unwrap();
        let doctor = db.insert_doctor(&NewDoctor::new("Dr. Smith")).unwrap();

        assert!(db.delete_doctor(&doctor.id).unwrap());
        assert!(!db.delete_doctor(&doctor.id).unwrap());
        assert!(db.list_doctors().unwrap().is_empty());
    }
}
