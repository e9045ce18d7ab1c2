//! Login and per-request authentication
//!
//! Tokens are stateless. Every authenticated request verifies the token and
//! re-reads the account, so a deleted account loses access immediately even
//! while its token is still signed and unexpired.

use crate::auth::jwt::{IssuedToken, TokenIssuer};
use crate::auth::password::PasswordHasher;
use crate::core::error::{AuthError, RegistryError, Result};
use crate::db::models::{Account, Credential, Role};
use crate::db::repository::{StudentRepository, TeacherRepository};

/// Successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: IssuedToken,
    pub account: Account,
}

#[derive(Clone)]
pub struct AuthGateway {
    students: StudentRepository,
    teachers: TeacherRepository,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AuthGateway {
    pub fn new(
        students: StudentRepository,
        teachers: TeacherRepository,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            students,
            teachers,
            hasher,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Hash on the blocking pool
    pub async fn hash_password(&self, password: &str) -> Result<String> {
        let hasher = self.hasher;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| RegistryError::TaskError(format!("Hashing task panicked: {}", e)))?
    }

    async fn verify_password(&self, password: &str, digest: &str) -> Result<bool> {
        let hasher = self.hasher;
        let password = password.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| RegistryError::TaskError(format!("Verification task panicked: {}", e)))
    }

    /// Look up an account by role and username
    pub async fn find_account(&self, role: Role, username: &str) -> Result<Option<Account>> {
        Ok(match role {
            Role::Student => self
                .students
                .find_by_username(username)
                .await?
                .map(Account::Student),
            Role::Teacher => self
                .teachers
                .find_by_username(username)
                .await?
                .map(Account::Teacher),
        })
    }

    /// Students are consulted before teachers when no role is given
    async fn locate(&self, username: &str, role: Option<Role>) -> Result<Option<Account>> {
        match role {
            Some(role) => self.find_account(role, username).await,
            None => match self.find_account(Role::Student, username).await? {
                Some(account) => Ok(Some(account)),
                None => self.find_account(Role::Teacher, username).await,
            },
        }
    }

    /// Check credentials and issue a token
    pub async fn login(&self, username: &str, password: &str, role: Option<Role>) -> Result<LoginOutcome> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(RegistryError::ValidationError(
                "Username and password are required".to_string(),
            ));
        }

        let mut account = match self.locate(username, role).await? {
            Some(account) => account,
            None => {
                tracing::warn!(username = %username, "Login for unknown account");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if let Credential::LegacyPlaintext(plain) = account.credential().clone() {
            self.migrate_legacy_password(&mut account, &plain).await?;
        }

        let digest = match account.credential() {
            Credential::Hashed(digest) => digest.clone(),
            _ => {
                tracing::warn!(username = %username, "Account has no stored password");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !self.verify_password(password, &digest).await? {
            tracing::warn!(username = %username, role = %account.role(), "Invalid password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let token = self.tokens.issue(account.username(), account.role())?;
        tracing::info!(username = %username, role = %account.role(), "Login successful");

        Ok(LoginOutcome { token, account })
    }

    /// Replace a stored plaintext password with its hash in one document update
    async fn migrate_legacy_password(&self, account: &mut Account, plain: &str) -> Result<()> {
        let digest = self.hash_password(plain).await?;
        self.store_hash(account, &digest).await?;
        account.set_credential(Credential::Hashed(digest));
        tracing::info!(
            username = %account.username(),
            role = %account.role(),
            "Migrated legacy plaintext password"
        );
        Ok(())
    }

    async fn store_hash(&self, account: &Account, digest: &str) -> Result<()> {
        let result = match account.role() {
            Role::Student => self.students.set_password_hash(account.username(), digest).await?,
            Role::Teacher => self.teachers.set_password_hash(account.username(), digest).await?,
        };
        if result.matched == 0 {
            return Err(AuthError::InvalidCredentials.into());
        }
        Ok(())
    }

    /// Check and hash a replacement password without storing it
    pub async fn digest_new_password(&self, new_password: &str) -> Result<String> {
        if new_password.is_empty() {
            return Err(RegistryError::ValidationError("Password cannot be empty".to_string()));
        }
        self.hash_password(new_password).await
    }

    /// Verify a bearer token and re-fetch the account it names
    pub async fn authenticate(&self, token: &str) -> Result<Account> {
        let claims = self.tokens.verify(token)?;

        match self.find_account(claims.role, &claims.sub).await? {
            Some(account) => Ok(account),
            None => {
                tracing::warn!(username = %claims.sub, role = %claims.role, "Token names a missing account");
                Err(AuthError::InvalidCredentials.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::manager::DatabaseManager;
    use crate::db::models::{Student, Teacher};
    use crate::db::repository::Repository;
    use crate::db::store::DocumentStore;
    use std::sync::Arc;

    struct Fixture {
        gateway: AuthGateway,
        students: StudentRepository,
        teachers: TeacherRepository,
    }

    fn fixture() -> Fixture {
        let store = DocumentStore::new(Arc::new(DatabaseManager::new_in_memory().unwrap()));
        let students = StudentRepository::new(store.clone());
        let teachers = TeacherRepository::new(store);
        let gateway = AuthGateway::new(
            students.clone(),
            teachers.clone(),
            PasswordHasher::new(4),
            TokenIssuer::new("gateway-test-secret-value", chrono::Duration::minutes(30)),
        );
        Fixture {
            gateway,
            students,
            teachers,
        }
    }

    fn student(username: &str, credential: Credential) -> Student {
        Student {
            id: String::new(),
            username: username.to_string(),
            credential,
            full_name: Some("Alice A".to_string()),
            email: format!("{}@example.com", username),
            age: Some(15),
            year: None,
            teacher_id: None,
            addresses: Vec::new(),
            created_at: None,
        }
    }

    fn teacher(username: &str, credential: Credential) -> Teacher {
        Teacher {
            id: String::new(),
            username: username.to_string(),
            credential,
            name: "Mrs Kolade".to_string(),
            email: format!("{}@school.test", username),
            subject: "Biology".to_string(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_login_then_authenticate_returns_same_account() {
        let f = fixture();
        let digest = f.gateway.hash_password("secret123").await.unwrap();
        f.students
            .create(&student("alice", Credential::Hashed(digest)))
            .await
            .unwrap();

        let outcome = f.gateway.login("alice", "secret123", None).await.unwrap();
        assert_eq!(outcome.account.role(), Role::Student);

        let account = f.gateway.authenticate(&outcome.token.token).await.unwrap();
        assert_eq!(account, outcome.account);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let f = fixture();
        let digest = f.gateway.hash_password("secret123").await.unwrap();
        f.students
            .create(&student("alice", Credential::Hashed(digest)))
            .await
            .unwrap();

        let wrong = f.gateway.login("alice", "nope", None).await.unwrap_err();
        let unknown = f.gateway.login("bob", "secret123", None).await.unwrap_err();
        assert!(matches!(wrong, RegistryError::Auth(AuthError::InvalidCredentials)));
        assert!(matches!(unknown, RegistryError::Auth(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_role_selects_collection() {
        let f = fixture();
        let digest = f.gateway.hash_password("teach").await.unwrap();
        f.teachers
            .create(&teacher("sam", Credential::Hashed(digest)))
            .await
            .unwrap();

        let outcome = f.gateway.login("sam", "teach", None).await.unwrap();
        assert_eq!(outcome.account.role(), Role::Teacher);

        let err = f
            .gateway
            .login("sam", "teach", Some(Role::Student))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Auth(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_legacy_password_migrated_on_login() {
        let f = fixture();
        f.students
            .create(&student("old", Credential::LegacyPlaintext("plain-pw".to_string())))
            .await
            .unwrap();

        f.gateway.login("old", "plain-pw", None).await.unwrap();

        let stored = f.students.find_by_username("old").await.unwrap().unwrap();
        match stored.credential {
            Credential::Hashed(digest) => assert!(digest.starts_with("$2")),
            other => panic!("expected hashed credential, got {:?}", other),
        }

        // Second login goes through the stored hash
        f.gateway.login("old", "plain-pw", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_account_without_password_cannot_login() {
        let f = fixture();
        f.students
            .create(&student("nopw", Credential::Missing))
            .await
            .unwrap();

        let err = f.gateway.login("nopw", "", None).await.unwrap_err();
        assert!(matches!(err, RegistryError::ValidationError(_)));

        let err = f.gateway.login("nopw", "anything", None).await.unwrap_err();
        assert!(matches!(err, RegistryError::Auth(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_deleted_account_token_rejected() {
        let f = fixture();
        let digest = f.gateway.hash_password("secret123").await.unwrap();
        f.students
            .create(&student("alice", Credential::Hashed(digest)))
            .await
            .unwrap();
        let outcome = f.gateway.login("alice", "secret123", None).await.unwrap();

        f.students.delete_by_username("alice").await.unwrap();

        let err = f.gateway.authenticate(&outcome.token.token).await.unwrap_err();
        assert!(matches!(err, RegistryError::Auth(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_replacement_password() {
        let f = fixture();
        let digest = f.gateway.hash_password("first").await.unwrap();
        f.students
            .create(&student("alice", Credential::Hashed(digest)))
            .await
            .unwrap();

        let err = f.gateway.digest_new_password("").await.unwrap_err();
        assert!(matches!(err, RegistryError::ValidationError(_)));

        let digest = f.gateway.digest_new_password("second").await.unwrap();
        f.students.set_password_hash("alice", &digest).await.unwrap();

        assert!(f.gateway.login("alice", "first", None).await.is_err());
        assert!(f.gateway.login("alice", "second", None).await.is_ok());
    }
}
