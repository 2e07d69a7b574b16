use rocket::launch;
use tracing_subscriber::filter::LevelFilter;
use training_chat_api::{build_rocket, utils::setup_json_logging};

#[launch]
pub fn rocket() -> _ {
    if cfg!(not(debug_assertions)) {
        setup_json_logging(LevelFilter::WARN);
    }

    build_rocket()
}
