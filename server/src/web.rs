use std::path::{Path, PathBuf};

use rocket::{
    fairing::{AdHoc, Fairing, Info, Kind},
    fs::{FileServer, NamedFile},
    get,
    http::Header,
    routes, Request, Responder, Response, Route, State,
};
use rocket_okapi::{
    rapidoc::{make_rapidoc, GeneralConfig, Layout, LayoutConfig, RapiDocConfig, RenderStyle},
    settings::UrlObject,
};

use crate::config::get_app_config;

/// Directory of the static frontend bundle, managed when configured
struct StaticPath(PathBuf);

/// Fairing that serves the frontend bundle if `static_path` is configured
pub fn setup_static_files() -> AdHoc {
    AdHoc::on_ignite("Static files", |rocket| async {
        let Some(static_path) = get_app_config(&rocket).static_path.clone() else {
            rocket::info!("No static path configured: serving the API only");
            return rocket;
        };

        rocket
            .mount("/", FileServer::from(&static_path).rank(1))
            .mount("/", routes![wildcard])
            .manage(StaticPath(static_path.into()))
    })
}

#[derive(Responder)]
struct WildcardResponse {
    inner: NamedFile,
    cache_control: Header<'static>,
}

/// Wildcard route handler for client-side routing.
#[get("/<_..>", rank = 10)]
async fn wildcard(static_path: &State<StaticPath>) -> Option<WildcardResponse> {
    let index_html_path = Path::new(&static_path.0).join("index.html");

    Some(WildcardResponse {
        inner: NamedFile::open(index_html_path).await.ok()?,
        cache_control: Header::new("Cache-Control", "public, max-age=0, must-revalidate"),
    })
}

/// RapiDoc viewer for the merged OpenAPI document
pub fn api_docs_routes() -> Vec<Route> {
    let config = RapiDocConfig {
        title: Some("Training Chat API".to_owned()),
        general: GeneralConfig {
            spec_urls: vec![UrlObject::new("Training Chat", "/api/openapi.json")],
            ..Default::default()
        },
        layout: LayoutConfig {
            layout: Layout::Row,
            render_style: RenderStyle::Focused,
            ..Default::default()
        },
        ..Default::default()
    };
    make_rapidoc(&config).into()
}

/// Response fairing that disables caching of API responses
pub struct NoCacheApi;

#[rocket::async_trait]
impl Fairing for NoCacheApi {
    fn info(&self) -> Info {
        Info {
            name: "No-cache API responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        if req.uri().path().starts_with("/api") {
            res.set_raw_header("Cache-Control", "no-cache, no-store, must-revalidate");
            res.set_raw_header("Pragma", "no-cache");
            res.set_raw_header("Expires", "0");
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::{http::Status, local::blocking::Client};

    use super::*;

    #[get("/api/ping")]
    fn ping() -> &'static str {
        "pong"
    }

    #[get("/about")]
    fn about() -> &'static str {
        "about"
    }

    #[test]
    fn api_responses_are_not_cached() {
        let rocket = rocket::build()
            .mount("/", routes![ping, about])
            .attach(NoCacheApi);
        let client = Client::tracked(rocket).unwrap();

        let res = client.get("/api/ping").dispatch();
        assert_eq!(res.status(), Status::Ok);
        assert_eq!(
            res.headers().get_one("Cache-Control"),
            Some("no-cache, no-store, must-revalidate")
        );
        assert_eq!(res.headers().get_one("Pragma"), Some("no-cache"));
        assert_eq!(res.headers().get_one("Expires"), Some("0"));

        let res = client.get("/about").dispatch();
        assert_eq!(res.headers().get_one("Pragma"), None);
    }
}
