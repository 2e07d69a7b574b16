pub mod models;
pub mod schema;
pub mod services;

use std::ops::{Deref, DerefMut};

use diesel_async::{
    pooled_connection::{
        deadpool::{BuildError, Object, Pool, PoolError},
        AsyncDieselConnectionManager,
    },
    scoped_futures::ScopedBoxFuture,
    AsyncConnection, AsyncPgConnection,
};
use diesel_async_migrations::{embed_migrations, EmbeddedMigrations};
use rocket::{
    fairing::AdHoc,
    http::Status,
    outcome::IntoOutcome,
    request::{FromRequest, Outcome},
    Request,
};
use rocket_okapi::OpenApiFromRequest;

use crate::config::get_app_config;

static MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Default maximum number of pooled Postgres connections
const DEFAULT_POOL_SIZE: usize = 8;

/** The database pool stored in Rocket's managed state */
pub type DbPool = Pool<AsyncPgConnection>;

/// A pooled Postgres connection, available as a request guard
#[derive(OpenApiFromRequest)]
pub struct DbConnection(Object<AsyncPgConnection>);

impl Deref for DbConnection {
    type Target = AsyncPgConnection;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DbConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl DbConnection {
    /// Check out a connection from the pool. It returns to the pool when dropped.
    pub async fn get(pool: &DbPool) -> Result<Self, PoolError> {
        pool.get().await.map(DbConnection)
    }

    /// Run the callback inside a single transaction. All writes are committed together
    /// if the callback returns `Ok`, and rolled back if it returns `Err`.
    pub async fn in_transaction<'a, R, E, F>(&mut self, callback: F) -> Result<R, E>
    where
        F: for<'r> FnOnce(&'r mut DbConnection) -> ScopedBoxFuture<'a, 'r, Result<R, E>>
            + Send
            + 'a,
        E: From<diesel::result::Error> + Send + 'a,
        R: Send + 'a,
    {
        self.transaction(callback).await
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for DbConnection {
    type Error = String;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(pool) = req.rocket().state::<DbPool>() else {
            return Outcome::Error((
                Status::InternalServerError,
                "Database not initialized".to_owned(),
            ));
        };
        DbConnection::get(pool)
            .await
            .map_err(|e| {
                rocket::error!("Database pool: couldn't get connection: {}", e);
                e.to_string()
            })
            .or_error(Status::InternalServerError)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DbSetupError {
    #[error("failed to build pool: {0}")]
    Pool(#[from] BuildError),
    #[error("failed to connect: {0}")]
    Connection(#[from] PoolError),
    #[error("failed to run migrations: {0}")]
    Migration(String),
}

/// Build the Postgres pool and bring the schema up to date
pub async fn init_pool(database_url: &str, max_size: usize) -> Result<DbPool, DbSetupError> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool: DbPool = Pool::builder(manager).max_size(max_size).build()?;

    let mut conn = pool.get().await?;
    MIGRATIONS
        .run_pending_migrations(&mut conn)
        .await
        .map_err(|e| DbSetupError::Migration(e.to_string()))?;
    rocket::info!("Migrations completed successfully");

    Ok(pool)
}

/// Fairing that sets up the Postgres pool, runs migrations, and closes the pool on shutdown
pub fn setup_db() -> AdHoc {
    AdHoc::try_on_ignite("Database setup", |rocket| async {
        let app_config = get_app_config(&rocket);
        let pool_size = app_config.database_pool.unwrap_or(DEFAULT_POOL_SIZE);
        let pool = match init_pool(&app_config.database_url, pool_size).await {
            Ok(pool) => pool,
            Err(e) => {
                rocket::error!("Database setup: {}", e);
                return Err(rocket);
            }
        };

        Ok(rocket
            .manage(pool)
            .attach(AdHoc::on_shutdown("Close database pool", |rocket| {
                Box::pin(async {
                    if let Some(pool) = rocket.state::<DbPool>() {
                        rocket::info!("Closing database pool");
                        pool.close();
                    }
                })
            })))
    })
}
