//! User database operations

use confman_common::db::{Profile, Role, User};
use confman_common::{time, uuid_utils, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Fields for a new user record
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub role: Role,
    /// Create with both channels verified (admin-created accounts)
    pub verified: bool,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, phone, role, \
    is_email_verified, is_phone_verified, affiliation, bio, social_links, created_at";

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let id: String = row.get("id");
    let role: String = row.get("role");
    let social_links: String = row.get("social_links");
    let created_at: String = row.get("created_at");

    Ok(User {
        id: uuid_utils::parse_stored(&id)?,
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        phone: row.get("phone"),
        role: role
            .parse()
            .map_err(|_| Error::Internal(format!("Corrupt role '{}'", role)))?,
        is_email_verified: row.get("is_email_verified"),
        is_phone_verified: row.get("is_phone_verified"),
        profile: Profile {
            affiliation: row.get("affiliation"),
            bio: row.get("bio"),
            social_links: serde_json::from_str(&social_links)
                .map_err(|e| Error::Internal(format!("Corrupt social_links: {}", e)))?,
        },
        created_at: time::parse_timestamp(&created_at)?,
    })
}

/// Insert a user; a taken username or email surfaces as `Error::Conflict`
pub async fn insert_user(pool: &SqlitePool, new_user: &NewUser) -> Result<User> {
    let id = uuid_utils::generate();
    let now = time::to_storage(time::now());

    sqlx::query(
        r#"
        INSERT INTO users (
            id, username, email, password_hash, phone, role,
            is_email_verified, is_phone_verified, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&new_user.username)
    .bind(new_user.email.to_lowercase())
    .bind(&new_user.password_hash)
    .bind(&new_user.phone)
    .bind(new_user.role.as_str())
    .bind(new_user.verified)
    .bind(new_user.verified)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_user(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("User {} vanished after insert", id)))
}

/// Load user by id
pub async fn get_user(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Load user by username or (case-insensitively) email
pub async fn find_by_login(pool: &SqlitePool, login: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE username = ? OR email = ?",
        USER_COLUMNS
    ))
    .bind(login)
    .bind(login.to_lowercase())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Page through users, optionally filtered by role
pub async fn list_users(
    pool: &SqlitePool,
    role: Option<Role>,
    limit: i64,
    offset: i64,
) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM users WHERE (?1 IS NULL OR role = ?1) \
         ORDER BY created_at, username LIMIT ?2 OFFSET ?3",
        USER_COLUMNS
    ))
    .bind(role.map(|r| r.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter().map(user_from_row).collect()
}

pub async fn count_users(pool: &SqlitePool, role: Option<Role>) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE (?1 IS NULL OR role = ?1)")
        .bind(role.map(|r| r.as_str()))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// All users holding `role`, by username
pub async fn list_by_role(pool: &SqlitePool, role: Role) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM users WHERE role = ? ORDER BY username",
        USER_COLUMNS
    ))
    .bind(role.as_str())
    .fetch_all(pool)
    .await?;

    rows.iter().map(user_from_row).collect()
}

/// Set a user's role; `false` if the user does not exist
pub async fn set_role(pool: &SqlitePool, id: Uuid, role: Role) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(time::to_storage(time::now()))
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Promote Attendee → Author; no-op for any other role
///
/// Runs on the caller's connection so it can share the submission's
/// transaction. Returns whether a promotion happened.
pub async fn promote_to_author(conn: &mut SqliteConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE users SET role = 'Author', updated_at = ? WHERE id = ? AND role = 'Attendee'",
    )
    .bind(time::to_storage(time::now()))
    .bind(id.to_string())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Set verification flags that are `true` in the arguments; never clears one
pub async fn mark_verified(
    conn: &mut SqliteConnection,
    id: Uuid,
    email: bool,
    phone: bool,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users SET
            is_email_verified = is_email_verified OR ?,
            is_phone_verified = is_phone_verified OR ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(email)
    .bind(phone)
    .bind(time::to_storage(time::now()))
    .bind(id.to_string())
    .execute(conn)
    .await?;
    Ok(())
}

/// Replace profile fields and, when given, the phone number
///
/// A changed phone number must be verified again.
pub async fn update_profile(
    pool: &SqlitePool,
    id: Uuid,
    phone: Option<&str>,
    profile: &Profile,
) -> Result<()> {
    let social_links = serde_json::to_string(&profile.social_links)
        .map_err(|e| Error::Internal(format!("Serialize social_links failed: {}", e)))?;

    sqlx::query(
        r#"
        UPDATE users SET
            is_phone_verified = CASE WHEN ?1 IS NOT NULL AND ?1 <> phone THEN 0 ELSE is_phone_verified END,
            phone = COALESCE(?1, phone),
            affiliation = ?2,
            bio = ?3,
            social_links = ?4,
            updated_at = ?5
        WHERE id = ?6
        "#,
    )
    .bind(phone)
    .bind(&profile.affiliation)
    .bind(&profile.bio)
    .bind(social_links)
    .bind(time::to_storage(time::now()))
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Conferences still created by this user
pub async fn count_owned_conferences(pool: &SqlitePool, id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM conferences WHERE created_by = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Delete a user; dependents cascade in the schema
pub async fn delete_user(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use confman_common::db::init_memory_database;

    fn new_user(username: &str, email: &str, role: Role) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            phone: "+1555".to_string(),
            role,
            verified: false,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_by_login() {
        let pool = init_memory_database().await.unwrap();
        let user = insert_user(&pool, &new_user("alice", "Alice@X.com", Role::Attendee))
            .await
            .unwrap();

        assert_eq!(user.email, "alice@x.com");
        assert!(!user.is_email_verified);

        let by_name = find_by_login(&pool, "alice").await.unwrap().unwrap();
        let by_email = find_by_login(&pool, "ALICE@x.com").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_email.id, user.id);
        assert!(find_by_login(&pool, "bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_promotion_only_from_attendee() {
        let pool = init_memory_database().await.unwrap();
        let attendee = insert_user(&pool, &new_user("a", "a@x.com", Role::Attendee)).await.unwrap();
        let reviewer = insert_user(&pool, &new_user("r", "r@x.com", Role::Reviewer)).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        assert!(promote_to_author(&mut conn, attendee.id).await.unwrap());
        assert!(!promote_to_author(&mut conn, attendee.id).await.unwrap());
        assert!(!promote_to_author(&mut conn, reviewer.id).await.unwrap());
        drop(conn);

        assert_eq!(get_user(&pool, attendee.id).await.unwrap().unwrap().role, Role::Author);
        assert_eq!(get_user(&pool, reviewer.id).await.unwrap().unwrap().role, Role::Reviewer);
    }

    #[tokio::test]
    async fn test_phone_change_resets_phone_verification() {
        let pool = init_memory_database().await.unwrap();
        let mut nu = new_user("alice", "alice@x.com", Role::Attendee);
        nu.verified = true;
        let user = insert_user(&pool, &nu).await.unwrap();

        let profile = Profile {
            affiliation: Some("Uni".to_string()),
            ..Profile::default()
        };

        // Same number keeps the flag
        update_profile(&pool, user.id, Some("+1555"), &profile).await.unwrap();
        assert!(get_user(&pool, user.id).await.unwrap().unwrap().is_phone_verified);

        update_profile(&pool, user.id, Some("+1666"), &profile).await.unwrap();
        let updated = get_user(&pool, user.id).await.unwrap().unwrap();
        assert!(!updated.is_phone_verified);
        assert!(updated.is_email_verified);
        assert_eq!(updated.phone, "+1666");
        assert_eq!(updated.profile.affiliation.as_deref(), Some("Uni"));
    }

    #[tokio::test]
    async fn test_deleting_conference_owner_is_refused_by_schema() {
        let pool = init_memory_database().await.unwrap();
        let chair = insert_user(&pool, &new_user("c", "c@x.com", Role::Chair)).await.unwrap();
        let draft: confman_common::db::ConferenceDraft = serde_json::from_value(serde_json::json!({
            "title": "Owned",
            "startDate": "2026-03-01",
            "endDate": "2026-03-02",
            "mode": "Online"
        }))
        .unwrap();
        crate::db::conferences::insert_conference(&pool, &draft, chair.id)
            .await
            .unwrap();

        let err = delete_user(&pool, chair.id).await.unwrap_err();
        assert!(matches!(err, Error::Validation { field, .. } if field == "reference"));
        assert!(get_user(&pool, chair.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_users_filter_and_count() {
        let pool = init_memory_database().await.unwrap();
        insert_user(&pool, &new_user("a", "a@x.com", Role::Attendee)).await.unwrap();
        insert_user(&pool, &new_user("r1", "r1@x.com", Role::Reviewer)).await.unwrap();
        insert_user(&pool, &new_user("r2", "r2@x.com", Role::Reviewer)).await.unwrap();

        assert_eq!(count_users(&pool, None).await.unwrap(), 3);
        assert_eq!(count_users(&pool, Some(Role::Reviewer)).await.unwrap(), 2);

        let reviewers = list_users(&pool, Some(Role::Reviewer), 10, 0).await.unwrap();
        assert_eq!(reviewers.len(), 2);
        assert_eq!(list_users(&pool, None, 1, 1).await.unwrap().len(), 1);
        assert_eq!(list_by_role(&pool, Role::Reviewer).await.unwrap()[0].username, "r1");
    }
}
