mod guard;
mod password;
mod session;

pub use guard::{
    Admin, AdminUser, AuthenticatedUserId, Employee, EmployeeUser, RequireRole, RequiredRole,
};
pub use password::{hash_password, verify_password, PasswordError, MIN_PASSWORD_LENGTH};
pub use session::{setup_session, TrainingAuthSession, SESSION_COOKIE_NAME};
