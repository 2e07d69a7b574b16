use std::time::Duration;

use chrono::{DateTime, Utc};
use fred::types::{Key, Map, Value};
use rocket::{fairing::AdHoc, Build, Rocket};
use rocket_flex_session::{
    storage::redis::{RedisFredStorage, RedisType},
    RocketFlexSession,
};
use uuid::Uuid;

use crate::config::{get_app_config, AppConfig};

pub const SESSION_COOKIE_NAME: &str = "training_chat_session";
/// Sessions expire after a day without activity
const SESSION_TTL_SECS: u32 = 60 * 60 * 24;
const REDIS_KEY_PREFIX: &str = "training_sess:";
const DEFAULT_REDIS_POOL_SIZE: usize = 2;

const USER_ID_FIELD: &str = "uid";
const LOGGED_IN_AT_FIELD: &str = "logged_in_at";

/// Server-side data of a signed-in user, stored as a Redis hash
#[derive(Debug, Clone)]
pub struct TrainingAuthSession(Map);

impl TrainingAuthSession {
    pub fn new(user_id: Uuid) -> Self {
        let mut fields = Map::new();
        fields.insert(USER_ID_FIELD.into(), user_id.as_bytes().as_slice().into());
        fields.insert(LOGGED_IN_AT_FIELD.into(), Utc::now().to_rfc3339().into());
        TrainingAuthSession(fields)
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.0
            .get(&Key::from_static_str(USER_ID_FIELD))
            .and_then(Value::as_bytes)
            .and_then(|bytes| Uuid::from_slice(bytes).ok())
    }

    pub fn logged_in_at(&self) -> Option<DateTime<Utc>> {
        self.0
            .get(&Key::from_static_str(LOGGED_IN_AT_FIELD))
            .and_then(Value::as_str)
            .and_then(|time| DateTime::parse_from_rfc3339(&time).ok())
            .map(|time| time.with_timezone(&Utc))
    }
}

#[derive(thiserror::Error, Debug)]
#[error("Session data is not a hash")]
pub struct SessionParseError;

impl TryFrom<Value> for TrainingAuthSession {
    type Error = SessionParseError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value
            .into_map()
            .map(TrainingAuthSession)
            .map_err(|_| SessionParseError)
    }
}

impl From<TrainingAuthSession> for Value {
    fn from(session: TrainingAuthSession) -> Self {
        Value::Map(session.0)
    }
}

fn build_session_storage(app_config: &AppConfig) -> Result<RedisFredStorage, fred::error::Error> {
    let config = fred::prelude::Config::from_url(&app_config.redis_url)?;
    let pool = fred::prelude::Builder::from_config(config)
        .with_connection_config(|config| {
            config.connection_timeout = Duration::from_secs(4);
            config.tcp = fred::prelude::TcpConfig {
                nodelay: Some(true),
                ..Default::default()
            };
        })
        .build_pool(app_config.redis_pool.unwrap_or(DEFAULT_REDIS_POOL_SIZE))?;

    Ok(RedisFredStorage::new(pool, RedisType::Hash, REDIS_KEY_PREFIX))
}

/// Fairing that sets up rolling login sessions stored in Redis
pub fn setup_session() -> AdHoc {
    AdHoc::try_on_ignite("Session setup", |rocket: Rocket<Build>| async {
        let storage = match build_session_storage(get_app_config(&rocket)) {
            Ok(storage) => storage,
            Err(e) => {
                rocket::error!("Invalid Redis session configuration: {}", e);
                return Err(rocket);
            }
        };
        let session_fairing: RocketFlexSession<TrainingAuthSession> = RocketFlexSession::builder()
            .with_options(|opt| {
                opt.cookie_name = SESSION_COOKIE_NAME.to_string();
                opt.ttl = Some(SESSION_TTL_SECS);
                opt.rolling = true;
            })
            .storage(storage)
            .build();

        Ok(rocket.attach(session_fairing))
    })
}
