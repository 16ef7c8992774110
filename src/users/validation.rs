//! Field validators for registration and profile updates. Each validator
//! returns the normalized value or the message to report for that field.

use std::path::{Component, Path};

use lazy_static::lazy_static;
use regex::Regex;

use super::dto::{RegisterRequest, UpdateProfileRequest};
use crate::error::FieldErrors;

pub const USERNAME_MAX: usize = 150;
pub const EMAIL_MAX: usize = 254;
pub const BIO_MAX: usize = 500;
pub const PICTURE_MAX: usize = 100;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
}

fn too_long(max: usize) -> String {
    format!("Ensure this field has no more than {max} characters.")
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn username(raw: &str) -> Result<String, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(BLANK.into());
    }
    if value.chars().count() > USERNAME_MAX {
        return Err(too_long(USERNAME_MAX));
    }
    if !USERNAME_RE.is_match(value) {
        return Err("Enter a valid username. This value may contain only letters, \
                    numbers, and @/./+/-/_ characters."
            .into());
    }
    Ok(value.to_string())
}

pub fn email(raw: &str) -> Result<String, String> {
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return Err(BLANK.into());
    }
    if value.chars().count() > EMAIL_MAX {
        return Err(too_long(EMAIL_MAX));
    }
    if !is_valid_email(&value) {
        return Err("Enter a valid email address.".into());
    }
    Ok(value)
}

/// Passwords are taken verbatim; only emptiness is rejected.
pub fn password(raw: &str) -> Result<String, String> {
    if raw.is_empty() {
        return Err(BLANK.into());
    }
    Ok(raw.to_string())
}

pub fn bio(raw: &str) -> Result<String, String> {
    let value = raw.trim();
    if value.chars().count() > BIO_MAX {
        return Err(too_long(BIO_MAX));
    }
    Ok(value.to_string())
}

/// A blank key means "no picture".
pub fn profile_picture(raw: &str) -> Result<Option<String>, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.chars().count() > PICTURE_MAX {
        return Err(too_long(PICTURE_MAX));
    }
    let relative = Path::new(value)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !relative {
        return Err("Enter a relative storage path.".into());
    }
    Ok(Some(value.to_string()))
}

fn check<T>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    validate: impl Fn(&str) -> Result<T, String>,
) -> Option<T> {
    match validate(value?) {
        Ok(v) => Some(v),
        Err(msg) => {
            errors.add(field, msg);
            None
        }
    }
}

fn required<T>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    validate: impl Fn(&str) -> Result<T, String>,
) -> Option<T> {
    if value.is_none() {
        errors.add(field, REQUIRED);
        return None;
    }
    check(errors, field, value, validate)
}

/// Registration input after validation and normalization.
#[derive(Debug, Clone)]
pub struct ValidRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub bio: String,
    pub profile_picture: Option<String>,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<ValidRegistration, FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = required(&mut errors, "username", self.username.as_deref(), username);
        let email = required(&mut errors, "email", self.email.as_deref(), email);
        let password = required(&mut errors, "password", self.password.as_deref(), password);
        let bio = check(&mut errors, "bio", self.bio.as_deref(), bio);
        let picture = check(
            &mut errors,
            "profile_picture",
            self.profile_picture.as_deref(),
            profile_picture,
        );

        match (username, email, password) {
            (Some(username), Some(email), Some(password)) if errors.is_empty() => {
                Ok(ValidRegistration {
                    username,
                    email,
                    password,
                    bio: bio.unwrap_or_default(),
                    profile_picture: picture.flatten(),
                })
            }
            _ => Err(errors),
        }
    }
}

/// Profile changes after validation; `None` leaves a column alone.
#[derive(Debug, Clone, Default)]
pub struct ValidChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<Option<String>>,
}

impl UpdateProfileRequest {
    pub fn validate(self) -> Result<ValidChanges, FieldErrors> {
        let mut errors = FieldErrors::new();
        let changes = ValidChanges {
            username: check(&mut errors, "username", self.username.as_deref(), username),
            email: check(&mut errors, "email", self.email.as_deref(), email),
            password: check(&mut errors, "password", self.password.as_deref(), password),
            bio: check(&mut errors, "bio", self.bio.as_deref(), bio),
            profile_picture: match self.profile_picture {
                None => None,
                Some(None) => Some(None),
                Some(Some(raw)) => check(&mut errors, "profile_picture", Some(raw.as_str()), profile_picture),
            },
        };
        errors.into_result(changes)
    }
}
