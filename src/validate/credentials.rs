use serde::Deserialize;
use serde_json::json;

use super::{char_len, Rejection, MIN_PASSWORD_CHARS};

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "confirmPassword")]
    pub confirm_password: String,
}

/// Locally acceptable credentials; the provider still has the final say.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("email", &self.email).finish_non_exhaustive()
    }
}

fn reject(message: &str, email: &str) -> Rejection {
    // never echo passwords
    Rejection::new(message).with_values(json!({ "email": email }))
}

/// Deliberately minimal: anything containing `@` passes.
fn check_email(email: &str) -> Result<(), Rejection> {
    if email.is_empty() || !email.contains('@') {
        return Err(reject("Please enter a valid email address", email));
    }
    Ok(())
}

fn check_password(password: &str, email: &str) -> Result<(), Rejection> {
    if char_len(password) < MIN_PASSWORD_CHARS {
        return Err(reject("Password must be at least 6 characters", email));
    }
    Ok(())
}

pub fn validate_login(form: &LoginForm) -> Result<Credentials, Rejection> {
    check_email(&form.email)?;
    check_password(&form.password, &form.email)?;
    Ok(Credentials {
        email: form.email.clone(),
        password: form.password.clone(),
    })
}

pub fn validate_signup(form: &SignupForm) -> Result<Credentials, Rejection> {
    check_email(&form.email)?;
    check_password(&form.password, &form.email)?;
    if form.password != form.confirm_password {
        return Err(reject("Passwords do not match", &form.email));
    }
    Ok(Credentials {
        email: form.email.clone(),
        password: form.password.clone(),
    })
}
