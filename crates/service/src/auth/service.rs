use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use rand::rngs::OsRng;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use models::user::{PublicUser, Role, User};
use models::validate::{validate_email, validate_name, validate_password, validate_phone};
use models::{from_record, to_record, Record};

use super::domain::{AuthSession, Claims, LoginInput, RegisterInput};
use super::errors::AuthError;
use crate::storage::document::USERS;
use crate::storage::filter::{by_id, field_eq_ignore_case};
use crate::storage::DocumentStore;

/// Auth service configuration
#[derive(Clone, Debug)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Lowercased emails promoted to super admin on registration.
    pub super_admin_emails: Vec<String>,
}

impl From<&configs::AuthConfig> for AuthSettings {
    fn from(cfg: &configs::AuthConfig) -> Self {
        Self {
            jwt_secret: cfg.secret_key.clone(),
            token_ttl_hours: cfg.token_ttl_hours,
            super_admin_emails: cfg.super_admin_emails.iter().map(|e| e.trim().to_lowercase()).collect(),
        }
    }
}

/// Account registration, login and token checks over the `users` collection.
pub struct AuthService {
    store: Arc<DocumentStore>,
    cfg: AuthSettings,
}

impl AuthService {
    pub fn new(store: Arc<DocumentStore>, cfg: AuthSettings) -> Self {
        Self { store, cfg }
    }

    /// Register a new user with a hashed password.
    ///
    /// Emails are unique case-insensitively; the check and the insert happen
    /// under one store lock.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub fn register(&self, input: RegisterInput) -> Result<PublicUser, AuthError> {
        validate_email(&input.email)?;
        validate_name(&input.name)?;
        validate_phone(&input.phone)?;
        validate_password(&input.password)?;

        let email = input.email.trim().to_lowercase();
        let role = if self.cfg.super_admin_emails.contains(&email) { Role::SuperAdmin } else { Role::User };
        let user = User::new(&email, &input.name, &input.phone, role, hash_password(&input.password)?);

        let stored = self
            .store
            .insert_unless(USERS, field_eq_ignore_case("email", &email), to_record(&user)?)?
            .ok_or_else(|| {
                debug!("user exists: {}", email);
                AuthError::Conflict
            })?;
        let user: User = from_record(stored)?;
        info!(user_id = %user.id, email = %user.email, role = user.role.as_str(), "user_registered");
        Ok(user.to_public())
    }

    /// Authenticate a user, stamp `last_login` and issue a token.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let user = self.find_by_email(&input.email)?.ok_or(AuthError::Unauthorized)?;
        if !verify_password(&input.password, &user.password_hash) {
            return Err(AuthError::Unauthorized);
        }
        if !user.is_active {
            warn!(user_id = %user.id, "login attempt on disabled account");
            return Err(AuthError::Inactive);
        }

        let now = common::time::now_iso();
        let mut patch = Record::new();
        patch.insert("last_login".into(), Value::from(now.clone()));
        self.store.update_one(USERS, by_id(&user.id), patch)?;

        let token = self.issue_token(&user)?;
        let mut user = user;
        user.last_login = Some(now);
        info!(user_id = %user.id, "user_logged_in");
        Ok(AuthSession { user: user.to_public(), token })
    }

    /// Decode and check a token's signature and expiry.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.cfg.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "token rejected");
            AuthError::Unauthorized
        })
    }

    /// The active account a token belongs to. Disabled or deleted accounts are rejected.
    pub fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.verify_token(token)?;
        let user = self.find_by_id(&claims.uid)?.ok_or(AuthError::Unauthorized)?;
        if !user.is_active {
            return Err(AuthError::Inactive);
        }
        Ok(user)
    }

    #[instrument(skip(self, current, new))]
    pub fn change_password(&self, user_id: &str, current: &str, new: &str) -> Result<(), AuthError> {
        let user = self.find_by_id(user_id)?.ok_or(AuthError::NotFound)?;
        if !verify_password(current, &user.password_hash) {
            return Err(AuthError::Unauthorized);
        }
        validate_password(new)?;
        let mut patch = Record::new();
        patch.insert("password_hash".into(), Value::from(hash_password(new)?));
        if !self.store.update_one(USERS, by_id(user_id), patch)? {
            return Err(AuthError::NotFound);
        }
        info!(user_id, "password_changed");
        Ok(())
    }

    fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(self.cfg.token_ttl_hours)).timestamp() as usize;
        let claims = Claims { sub: user.email.clone(), uid: user.id.clone(), role: user.role.as_str().to_string(), exp };
        encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(self.cfg.jwt_secret.as_bytes()))
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        self.store
            .find_one(USERS, field_eq_ignore_case("email", email))
            .map(from_record)
            .transpose()
            .map_err(AuthError::from)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<User>, AuthError> {
        self.store.find_one(USERS, by_id(id)).map(from_record).transpose().map_err(AuthError::from)
    }
}

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::HashError(e.to_string()))
}

/// False for wrong passwords and for hashes that do not parse.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreOptions;

    fn service(dir: &std::path::Path) -> AuthService {
        let store = DocumentStore::open(dir.join("data.json"), StoreOptions::default()).unwrap();
        AuthService::new(
            store,
            AuthSettings {
                jwt_secret: "test-secret".into(),
                token_ttl_hours: 1,
                super_admin_emails: vec!["boss@360ev.com".into()],
            },
        )
    }

    fn input(email: &str) -> RegisterInput {
        RegisterInput { email: email.into(), name: "Ayşe Demir".into(), phone: String::new(), password: "gizli123".into() }
    }

    #[test]
    fn register_login_and_verify() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path());
        let user = svc.register(input("Ayse@360ev.com")).unwrap();
        assert_eq!(user.email, "ayse@360ev.com");
        assert_eq!(user.role, Role::User);

        let session = svc.login(LoginInput { email: "AYSE@360ev.com".into(), password: "gizli123".into() }).unwrap();
        assert!(session.user.last_login.is_some());
        let claims = svc.verify_token(&session.token).unwrap();
        assert_eq!(claims.uid, user.id);
        assert_eq!(claims.role, "user");
        assert_eq!(svc.authenticate(&session.token).unwrap().id, user.id);
    }

    #[test]
    fn duplicate_email_conflicts() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path());
        svc.register(input("a@360ev.com")).unwrap();
        let err = svc.register(input(" A@360EV.com")).unwrap_err();
        assert!(matches!(err, AuthError::Conflict));
        assert_eq!(err.code(), 1002);
    }

    #[test]
    fn wrong_password_and_bad_token_are_unauthorized() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path());
        svc.register(input("a@360ev.com")).unwrap();
        let err = svc.login(LoginInput { email: "a@360ev.com".into(), password: "nope".into() }).unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
        assert!(matches!(svc.verify_token("not.a.jwt"), Err(AuthError::Unauthorized)));
    }

    #[test]
    fn configured_email_becomes_super_admin() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path());
        let user = svc.register(input("boss@360ev.com")).unwrap();
        assert_eq!(user.role, Role::SuperAdmin);
    }

    #[test]
    fn invalid_input_is_rejected_before_hashing() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path());
        let mut bad = input("a@360ev.com");
        bad.password = "123".into();
        assert!(matches!(svc.register(bad), Err(AuthError::Validation(_))));
        assert!(matches!(svc.register(input("not-an-email")), Err(AuthError::Validation(_))));
    }

    #[test]
    fn change_password_requires_current() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(tmp.path());
        let user = svc.register(input("a@360ev.com")).unwrap();
        assert!(matches!(svc.change_password(&user.id, "wrong", "yenisifre"), Err(AuthError::Unauthorized)));
        svc.change_password(&user.id, "gizli123", "yenisifre").unwrap();
        assert!(svc.login(LoginInput { email: "a@360ev.com".into(), password: "yenisifre".into() }).is_ok());
    }
}
