//! Credential store operations: accounts and role assignments.

use rusqlite::{params, OptionalExtension};

use super::{unique_or_sqlite, Database, DbError, DbResult};
use crate::models::{Account, NewAccount, Role};

/// Raw joined row; the role stays a string until validated.
struct AccountRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    patient_id: Option<i64>,
    doctor_id: Option<i64>,
    role: Option<String>,
    created_at: String,
}

impl TryFrom<AccountRow> for Account {
    type Error = DbError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .map(|r| r.parse::<Role>())
            .transpose()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        Ok(Account {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            role,
            created_at: row.created_at,
        })
    }
}

impl Database {
    /// Insert an account row, returning its id.
    pub fn insert_account(&self, account: &NewAccount) -> DbResult<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO accounts (username, email, password_hash, patient_id, doctor_id)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    account.username,
                    account.email,
                    account.password_hash,
                    account.patient_id,
                    account.doctor_id,
                ],
            )
            .map_err(|e| unique_or_sqlite(e, "accounts.username/email"))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Assign the account's single role.
    pub fn assign_role(&self, account_id: i64, role: Role) -> DbResult<()> {
        self.conn
            .execute(
                "INSERT INTO role_assignments (account_id, role) VALUES (?1, ?2)",
                params![account_id, role.as_str()],
            )
            .map_err(|e| unique_or_sqlite(e, "role_assignments.account_id"))?;
        Ok(())
    }

    /// Whether any account already uses this username or email.
    pub fn account_exists(&self, username: &str, email: &str) -> DbResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = ?1 OR email = ?2)",
            params![username, email],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Look up an account with its role (if any) by username.
    pub fn get_account_by_username(&self, username: &str) -> DbResult<Option<Account>> {
        self.conn
            .query_row(
                r#"
                SELECT a.id, a.username, a.email, a.password_hash,
                       a.patient_id, a.doctor_id, r.role, a.created_at
                FROM accounts a
                LEFT JOIN role_assignments r ON a.id = r.account_id
                WHERE a.username = ?
                "#,
                [username],
                |row| {
                    Ok(AccountRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        password_hash: row.get(3)?,
                        patient_id: row.get(4)?,
                        doctor_id: row.get(5)?,
                        role: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                },
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Count accounts (used to verify registration atomicity).
    pub fn count_accounts(&self) -> DbResult<u32> {
        let count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Count role assignments.
    pub fn count_role_assignments(&self) -> DbResult<u32> {
        let count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM role_assignments", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(username: &str, email: &str) -> NewAccount {
        NewAccount {
            username: username.into(),
            email: email.into(),
            password_hash: "$2b$10$notarealhash".into(),
            patient_id: None,
            doctor_id: None,
        }
    }

    #[test]
    fn test_insert_and_lookup_with_role() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_account(&new_account("nurse", "nurse@example.com")).unwrap();
        db.assign_role(id, Role::Staff).unwrap();

        let account = db.get_account_by_username("nurse").unwrap().unwrap();
        assert_eq!(account.id, id);
        assert_eq!(account.role, Some(Role::Staff));
        assert_eq!(account.patient_id, None);
    }

    #[test]
    fn test_missing_role_is_none() {
        let db = Database::open_in_memory().unwrap();
        db.insert_account(&new_account("ghost", "ghost@example.com")).unwrap();

        let account = db.get_account_by_username("ghost").unwrap().unwrap();
        assert_eq!(account.role, None);
    }

    #[test]
    fn test_unknown_username() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_account_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn test_account_exists_by_username_or_email() {
        let db = Database::open_in_memory().unwrap();
        db.insert_account(&new_account("jane", "jane@example.com")).unwrap();

        assert!(db.account_exists("jane", "other@example.com").unwrap());
        assert!(db.account_exists("other", "jane@example.com").unwrap());
        assert!(!db.account_exists("other", "other@example.com").unwrap());
    }

    #[test]
    fn test_duplicate_username_is_constraint() {
        let db = Database::open_in_memory().unwrap();
        db.insert_account(&new_account("jane", "jane@example.com")).unwrap();
        let err = db
            .insert_account(&new_account("jane", "jane2@example.com"))
            .unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }

    #[test]
    fn test_second_role_rejected() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_account(&new_account("jane", "jane@example.com")).unwrap();
        db.assign_role(id, Role::Patient).unwrap();
        assert!(db.assign_role(id, Role::Admin).is_err());
    }
}
