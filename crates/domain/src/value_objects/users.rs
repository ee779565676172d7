use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entities::users::UserEntity, errors::ValidationError};

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 50;
const PASSWORD_MIN_CHARS: usize = 6;

/// Public profile. The password hash never leaves the repository layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserModel {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserEntity> for UserModel {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            email: entity.email,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpModel {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignUpModel {
    /// Returns the model with name and email normalized.
    pub fn normalized(&self) -> Result<SignUpModel, ValidationError> {
        Ok(SignUpModel {
            name: normalize_name(&self.name)?,
            email: normalize_email(&self.email)?,
            password: check_password(&self.password)?.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInModel {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserModel {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UpdateUserModel {
    pub fn normalized(&self) -> Result<UpdateUserModel, ValidationError> {
        Ok(UpdateUserModel {
            name: self.name.as_deref().map(normalize_name).transpose()?,
            email: self.email.as_deref().map(normalize_email).transpose()?,
            password: self
                .password
                .as_deref()
                .map(|password| check_password(password).map(str::to_string))
                .transpose()?,
        })
    }
}

pub fn normalize_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        return Err(ValidationError::UserNameLength);
    }
    Ok(name.to_string())
}

pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();

    let (local, domain) = email.split_once('@').ok_or(ValidationError::InvalidEmail)?;
    let domain_ok = domain
        .split_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty());

    if local.is_empty() || !domain_ok || domain.contains('@') || email.contains(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email)
}

fn check_password(password: &str) -> Result<&str, ValidationError> {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(password)
}
