//! Onboarding of new users. Registration is a single step: the profile and
//! the password credential are stored together and the new user is logged in.
use super::sessions;
use crate::{
    constants::passwords::{PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH},
    db::{
        self,
        models::{
            appuser::{AppUser, AppUserInsert, AppUserRole},
            password::PasswordInsert,
        },
    },
    services::sessions::GenericAuthenticatedSession,
    utils::{email::EmailAddress, mobile::MobileNumber},
};
use serde::Deserialize;
use tracing::info;

/// The details a new user signs up with.
#[derive(Deserialize)]
pub struct Registration {
    pub name: String,
    pub mobile_number: String,
    pub email: String,
    pub address: String,
    pub password: String,
    pub confirm_password: String,
}

/// Check a candidate password against the password policy.
pub fn check_password_policy(password: &str) -> Result<(), errors::PasswordPolicyViolation> {
    let length = password.chars().count();
    if length < PASSWORD_MIN_LENGTH {
        Err(errors::PasswordPolicyViolation::TooShort)
    } else if length > PASSWORD_MAX_LENGTH {
        Err(errors::PasswordPolicyViolation::TooLong)
    } else {
        Ok(())
    }
}

/// Validate a registration form, producing the INSERT model on success.
fn validate(registration: &Registration) -> Result<AppUserInsert, errors::RegistrationError> {
    if registration.password != registration.confirm_password {
        return Err(errors::RegistrationError::PasswordMismatch);
    }
    if registration.name.trim().is_empty() {
        return Err(errors::RegistrationError::NameMissing);
    }
    let mobile = MobileNumber::try_from(registration.mobile_number.as_str())
        .map_err(|_invalid| errors::RegistrationError::InvalidMobile)?;
    let email = EmailAddress::try_from(registration.email.as_str())
        .map_err(|_invalid| errors::RegistrationError::InvalidEmail)?;
    check_password_policy(&registration.password)?;
    Ok(AppUserInsert::new(
        mobile,
        &registration.name,
        email,
        &registration.address,
    ))
}

/// Register a new customer and open a session for them.
pub async fn register(
    registration: Registration,
    db_conn: &db::ConnectionPool,
    session_store_conn: &mut sessions::store::Connection,
) -> Result<(AppUser, GenericAuthenticatedSession), errors::RegistrationError> {
    let user_data = validate(&registration)?;
    if AppUser::select_by_mobile(user_data.mobile(), db_conn)
        .await
        .map_err(errors::StorageError::from)?
        .is_some()
    {
        return Err(errors::RegistrationError::DuplicateMobile);
    }
    let mut tx = db_conn
        .begin()
        .await
        .map_err(|err| errors::StorageError::from(db::errors::DatabaseError::from(err)))?;
    let stored_user = match user_data.store(AppUserRole::Customer, &mut *tx).await {
        Ok(user) => user,
        // Lost a race with a concurrent registration for the same number.
        Err(err) if err.is_unique_violation() => {
            return Err(errors::RegistrationError::DuplicateMobile)
        }
        Err(err) => return Err(errors::StorageError::from(err).into()),
    };
    PasswordInsert::new(stored_user.id(), &registration.password)
        .store(&mut *tx)
        .await
        .map_err(errors::StorageError::from)?;
    tx.commit()
        .await
        .map_err(|err| errors::StorageError::from(db::errors::DatabaseError::from(err)))?;
    info!(user_id = %stored_user.id(), "New user registered");
    let session = GenericAuthenticatedSession::create(
        stored_user.id(),
        stored_user.role,
        session_store_conn,
    )
    .await
    .map_err(errors::StorageError::from)?;
    Ok((stored_user, session))
}

pub mod errors {
    pub use super::super::errors::StorageError;
    use thiserror::Error;

    #[derive(Error, Debug, PartialEq, Eq)]
    pub enum PasswordPolicyViolation {
        #[error("Password is too short")]
        TooShort,
        #[error("Password is too long")]
        TooLong,
    }

    #[derive(Error, Debug)]
    pub enum RegistrationError {
        #[error(transparent)]
        StorageError(#[from] StorageError),
        #[error("Passwords do not match")]
        PasswordMismatch,
        #[error("Name is required")]
        NameMissing,
        #[error("Invalid mobile number")]
        InvalidMobile,
        #[error("Invalid email address")]
        InvalidEmail,
        #[error(transparent)]
        WeakPassword(#[from] PasswordPolicyViolation),
        #[error("Mobile already registered")]
        DuplicateMobile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            name: String::from(" Buddy "),
            mobile_number: String::from("98765 43210"),
            email: String::from("buddy@bite.me"),
            address: String::from("12 Curry Lane"),
            password: String::from("tandoori-nights"),
            confirm_password: String::from("tandoori-nights"),
        }
    }

    #[test]
    fn valid_registration_is_normalised() {
        let insert = validate(&registration()).unwrap();
        assert_eq!(insert.mobile().as_str(), "9876543210");
        assert_eq!(insert.name, "Buddy");
    }

    #[test]
    fn mismatched_passwords_are_rejected_first() {
        let mut form = registration();
        form.confirm_password = String::from("something else");
        form.email = String::from("broken");
        assert!(matches!(
            validate(&form),
            Err(errors::RegistrationError::PasswordMismatch)
        ));
    }

    #[test]
    fn invalid_fields_are_reported() {
        let mut form = registration();
        form.mobile_number = String::from("call me");
        assert!(matches!(validate(&form), Err(errors::RegistrationError::InvalidMobile)));

        let mut form = registration();
        form.email = String::from("buddy-at-bite.me");
        assert!(matches!(validate(&form), Err(errors::RegistrationError::InvalidEmail)));

        let mut form = registration();
        form.name = String::from("   ");
        assert!(matches!(validate(&form), Err(errors::RegistrationError::NameMissing)));
    }

    #[test]
    fn password_policy_bounds() {
        assert_eq!(
            check_password_policy("short"),
            Err(errors::PasswordPolicyViolation::TooShort)
        );
        assert_eq!(check_password_policy("exactly8"), Ok(()));
        assert_eq!(
            check_password_policy(&"x".repeat(PASSWORD_MAX_LENGTH + 1)),
            Err(errors::PasswordPolicyViolation::TooLong)
        );
    }
}
