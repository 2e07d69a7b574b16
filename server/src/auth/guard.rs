use std::{marker::PhantomData, ops::Deref};

use rocket::{
    http::Status,
    outcome::try_outcome,
    request::{FromRequest, Outcome},
};
use rocket_flex_session::Session;
use rocket_okapi::{
    gen::OpenApiGenerator,
    okapi::openapi3,
    request::{OpenApiFromRequest, RequestHeaderInput},
};
use uuid::Uuid;

use crate::{
    auth::{session::SESSION_COOKIE_NAME, TrainingAuthSession},
    db::{
        models::{TrainingUser, TrainingUserRole},
        services::UserDbService,
        DbConnection,
    },
};

/// User ID request guard to ensure a logged-in user.
pub struct AuthenticatedUserId(pub(super) Uuid);

impl Deref for AuthenticatedUserId {
    type Target = Uuid;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUserId {
    type Error = &'r str;

    async fn from_request(req: &'r rocket::Request<'_>) -> Outcome<Self, Self::Error> {
        let session = try_outcome!(req.guard::<Session<TrainingAuthSession>>().await);
        match session.tap(|data| data.and_then(|auth_session| auth_session.user_id())) {
            Some(user_id) => Outcome::Success(AuthenticatedUserId(user_id)),
            None => Outcome::Error((Status::Unauthorized, "Unauthorized")),
        }
    }
}

/// Request guard / middleware to get the current user data from the database.
/// A session pointing to a deleted user is treated as signed out.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for TrainingUser {
    type Error = &'r str;

    async fn from_request(req: &'r rocket::Request<'_>) -> Outcome<Self, Self::Error> {
        let user_id = try_outcome!(req.guard::<AuthenticatedUserId>().await);
        let mut db = try_outcome!(req
            .guard::<DbConnection>()
            .await
            .map_error(|(status, _)| (status, "Database error")));

        match UserDbService::new(&mut db).find_by_id(&user_id).await {
            Ok(Some(user)) => Outcome::Success(user),
            Ok(None) => Outcome::Error((Status::Unauthorized, "Unauthorized")),
            Err(e) => {
                rocket::error!("User guard: database error: {}", e);
                Outcome::Error((Status::InternalServerError, "Database error"))
            }
        }
    }
}

/// Marker for the minimum role a route requires
pub trait RequiredRole: Send + Sync + 'static {
    const ROLE: TrainingUserRole;
}

pub struct Employee;
impl RequiredRole for Employee {
    const ROLE: TrainingUserRole = TrainingUserRole::Employee;
}

pub struct Admin;
impl RequiredRole for Admin {
    const ROLE: TrainingUserRole = TrainingUserRole::Admin;
}

/// Request guard for a signed-in user with at least the role `R`. Fails with
/// 401 when signed out and 403 when the role is insufficient.
pub struct RequireRole<R: RequiredRole> {
    user: TrainingUser,
    _role: PhantomData<R>,
}

impl<R: RequiredRole> RequireRole<R> {
    pub fn into_inner(self) -> TrainingUser {
        self.user
    }
}

impl<R: RequiredRole> Deref for RequireRole<R> {
    type Target = TrainingUser;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

/// Any signed-in user
pub type EmployeeUser = RequireRole<Employee>;
/// A signed-in administrator
pub type AdminUser = RequireRole<Admin>;

#[rocket::async_trait]
impl<'r, R: RequiredRole> FromRequest<'r> for RequireRole<R> {
    type Error = &'r str;

    async fn from_request(req: &'r rocket::Request<'_>) -> Outcome<Self, Self::Error> {
        let user = try_outcome!(req.guard::<TrainingUser>().await);
        if !user.role.satisfies(R::ROLE) {
            rocket::warn!("User {} denied: requires {:?} role", user.id, R::ROLE);
            return Outcome::Error((Status::Forbidden, "Forbidden"));
        }
        Outcome::Success(RequireRole {
            user,
            _role: PhantomData,
        })
    }
}

/// All session-based guards document the same cookie security scheme
macro_rules! session_cookie_openapi {
    ($($guard:ty $(where $param:ident: $bound:path)?),+ $(,)?) => {$(
        impl<'a $(, $param: $bound)?> OpenApiFromRequest<'a> for $guard {
            fn from_request_input(
                _gen: &mut OpenApiGenerator,
                _name: String,
                _required: bool,
            ) -> rocket_okapi::Result<RequestHeaderInput> {
                session_cookie_docs()
            }
        }
    )+};
}

session_cookie_openapi!(
    AuthenticatedUserId,
    TrainingUser,
    RequireRole<R> where R: RequiredRole,
);

const SESSION_SCHEME: &str = "Session";

fn session_cookie_docs() -> rocket_okapi::Result<RequestHeaderInput> {
    let scheme = openapi3::SecurityScheme {
        description: Some("Signed-in session cookie, set by the login route.".to_owned()),
        data: openapi3::SecuritySchemeData::ApiKey {
            name: SESSION_COOKIE_NAME.to_owned(),
            location: "cookie".to_owned(),
        },
        extensions: Default::default(),
    };
    let requirement = [(SESSION_SCHEME.to_owned(), Vec::new())].into_iter().collect();
    Ok(RequestHeaderInput::Security(
        SESSION_SCHEME.to_owned(),
        scheme,
        requirement,
    ))
}
