/*
 * Responsibility
 * - form bodies for register / login / change-password
 * - validate() does the format checks that run before any store access
 *
 * No Debug derive: these carry plaintext passwords.
 */
use serde::Deserialize;

pub const MIN_USERNAME_CHARS: usize = 3;
pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.username.chars().count() < MIN_USERNAME_CHARS {
            return Err("Username must be at least 3 characters long");
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err("Password must be at least 6 characters long");
        }
        Ok(())
    }
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordForm {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl ChangePasswordForm {
    /// Checks that run once the current password is known to match.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.new_password.chars().count() < MIN_PASSWORD_CHARS {
            return Err("New password must be at least 6 characters long");
        }
        if self.new_password != self.confirm_password {
            return Err("New passwords do not match");
        }
        if self.old_password == self.new_password {
            return Err("New password must be different from current password");
        }
        Ok(())
    }
}
