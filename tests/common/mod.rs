use facility_reservation::auth::identity::AuthenticatedUser;
use facility_reservation::config::PoolConfig;
use facility_reservation::store::PgTokenStore;
use uuid::Uuid;

/// Database URL for integration tests, if one is configured.
#[allow(dead_code)]
pub fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok()
}

/// Skip test with message if no test database is configured.
#[macro_export]
macro_rules! require_database {
    () => {
        match crate::common::database_url() {
            Some(url) => url,
            None => {
                eprintln!("Skipping: TEST_DATABASE_URL not set");
                return;
            }
        }
    };
}

/// Connect to the test database and apply the schema.
#[allow(dead_code)]
pub async fn test_store(url: &str) -> PgTokenStore {
    let pool = PoolConfig {
        max_connections: 20,
        min_connections: 1,
        acquire_timeout_secs: 10,
    };
    let store = PgTokenStore::connect(url, &pool)
        .await
        .expect("Failed to connect to test database");
    store.migrate().await.expect("Failed to apply migrations");
    store
}

/// Username that will not collide with rows left by earlier runs.
#[allow(dead_code)]
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7())
}

#[allow(dead_code)]
pub fn staff_actor() -> AuthenticatedUser {
    AuthenticatedUser {
        id: Uuid::now_v7(),
        username: "staff-user".into(),
        is_staff: true,
    }
}

/// Usernames starting with this prefix cannot receive tokens once
/// [`install_token_reject_trigger`] has run.
#[allow(dead_code)]
pub const REJECTED_TOKEN_PREFIX: &str = "reject-token";

/// Install a trigger that fails token inserts for users named with
/// [`REJECTED_TOKEN_PREFIX`]. Other rows are untouched, so it can stay in place.
#[allow(dead_code)]
pub async fn install_token_reject_trigger(store: &PgTokenStore) {
    sqlx::query(
        r#"
        CREATE OR REPLACE FUNCTION reject_marked_tokens() RETURNS trigger AS $$
        BEGIN
            IF EXISTS (
                SELECT 1 FROM users
                WHERE id = NEW.user_id AND username LIKE 'reject-token-%'
            ) THEN
                RAISE EXCEPTION 'token insert rejected for user %', NEW.user_id;
            END IF;
            RETURN NEW;
        END;
        $$ LANGUAGE plpgsql
        "#,
    )
    .execute(store.pool())
    .await
    .expect("Failed to create trigger function");

    sqlx::query(
        r#"
        DO $$
        BEGIN
            IF NOT EXISTS (SELECT 1 FROM pg_trigger WHERE tgname = 'reject_marked_tokens') THEN
                CREATE TRIGGER reject_marked_tokens
                    BEFORE INSERT ON user_tokens
                    FOR EACH ROW EXECUTE FUNCTION reject_marked_tokens();
            END IF;
        END
        $$
        "#,
    )
    .execute(store.pool())
    .await
    .expect("Failed to install trigger");
}
