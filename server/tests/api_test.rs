//! End-to-end API tests. They need a Postgres database and a Redis server given by
//! `TEST_DATABASE_URL` and `TEST_REDIS_URL`, and are skipped when those are unset.

use rocket::{
    figment::Figment,
    http::{ContentType, Status},
    local::asynchronous::{Client, LocalResponse},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::{json, Value};
use training_chat_api::{
    build_rocket_with,
    config::get_config_provider,
    db::{init_pool, models::TrainingQuestionStat, schema::question_analytics},
};
use uuid::Uuid;

struct TestEnv {
    figment: Figment,
    database_url: String,
    admin_email: String,
    upload_dir: tempfile::TempDir,
}

fn test_env() -> Option<TestEnv> {
    let (Ok(database_url), Ok(redis_url)) = (
        std::env::var("TEST_DATABASE_URL"),
        std::env::var("TEST_REDIS_URL"),
    ) else {
        eprintln!("TEST_DATABASE_URL / TEST_REDIS_URL not set, skipping");
        return None;
    };
    let upload_dir = tempfile::tempdir().ok()?;
    let admin_email = format!("admin-{}@example.com", Uuid::new_v4().simple());
    let figment = get_config_provider()
        .merge(("database_url", database_url.clone()))
        .merge(("redis_url", redis_url))
        .merge(("upload_dir", upload_dir.path().to_string_lossy().to_string()))
        .merge(("admin_email", admin_email.clone()))
        .merge(("llm_provider", "lorem"));

    Some(TestEnv {
        figment,
        database_url,
        admin_email,
        upload_dir,
    })
}

fn stored_files(env: &TestEnv) -> usize {
    std::fs::read_dir(env.upload_dir.path())
        .map(|entries| entries.count())
        .unwrap_or_default()
}

async fn question_stat(env: &TestEnv, normalized: &str) -> Option<TrainingQuestionStat> {
    let pool = init_pool(&env.database_url, 1).await.expect("database pool");
    let mut conn = pool.get().await.expect("database connection");
    question_analytics::table
        .filter(question_analytics::normalized_question.eq(normalized))
        .select(TrainingQuestionStat::as_select())
        .first(&mut conn)
        .await
        .optional()
        .expect("analytics query")
}

async fn client(env: &TestEnv) -> Client {
    Client::tracked(build_rocket_with(env.figment.clone()))
        .await
        .expect("valid rocket instance")
}

async fn json_body(res: LocalResponse<'_>) -> Value {
    res.into_json::<Value>().await.expect("JSON body")
}

async fn register_and_login(client: &Client, email: &str) -> Value {
    let password = "correct-horse-battery";
    let res = client
        .post("/api/auth/register")
        .json(&json!({
            "email": email,
            "password": password,
            "confirm_password": password,
            "first_name": "Test",
        }))
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::Created);

    let res = client
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": password }))
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::Ok);
    json_body(res).await
}

fn multipart_file(name: &str, content: &str) -> (ContentType, String) {
    let boundary = "----training-chat-boundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n{content}\r\n--{boundary}--\r\n"
    );
    let content_type = ContentType::new("multipart", "form-data").with_params(("boundary", boundary));
    (content_type, body)
}

#[rocket::async_test]
async fn auth_flow() {
    let Some(env) = test_env() else { return };
    let client = client(&env).await;
    let email = format!("Employee-{}@Example.com", Uuid::new_v4().simple());

    let res = client.get("/api/health").dispatch().await;
    assert_eq!(res.status(), Status::Ok);
    let health = json_body(res).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["llm_configured"], true);

    let res = client.get("/api/chat/history").dispatch().await;
    assert_eq!(res.status(), Status::Unauthorized);

    let res = client
        .post("/api/auth/register")
        .json(&json!({ "email": email, "password": "short", "confirm_password": "short" }))
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::BadRequest);

    let user = register_and_login(&client, &email).await;
    assert_eq!(user["email"], email.to_lowercase());
    assert_eq!(user["role"], "employee");
    assert!(user.get("password_hash").is_none());

    let res = client
        .post("/api/auth/register")
        .json(&json!({
            "email": email.to_lowercase(),
            "password": "another-password",
            "confirm_password": "another-password",
        }))
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::Conflict);

    let res = client.get("/api/auth/profile").dispatch().await;
    assert_eq!(res.status(), Status::Ok);
    let profile = json_body(res).await;
    assert_eq!(profile["question_count"], 0);
    assert!(profile["logged_in_at"].is_string());

    let res = client.get("/api/admin/dashboard").dispatch().await;
    assert_eq!(res.status(), Status::Forbidden);

    let res = client.post("/api/auth/logout").dispatch().await;
    assert_eq!(res.status(), Status::Ok);
    let res = client.get("/api/auth/profile").dispatch().await;
    assert_eq!(res.status(), Status::Unauthorized);

    let res = client
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": "wrong-password" }))
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::Unauthorized);
    assert_eq!(json_body(res).await["message"], "Invalid email or password.");
}

#[rocket::async_test]
async fn chat_records_messages_and_analytics() {
    let Some(env) = test_env() else { return };
    let employee = client(&env).await;
    register_and_login(&employee, &format!("chat-{}@example.com", Uuid::new_v4())).await;

    let res = employee
        .post("/api/chat")
        .json(&json!({ "message": "   " }))
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::BadRequest);
    assert_eq!(json_body(res).await["message"], "Message is required");

    let marker = Uuid::new_v4().simple().to_string();
    for question in [
        format!("Where is the HR office {marker}?"),
        format!("  where is   the hr OFFICE {marker}?"),
    ] {
        let res = employee
            .post("/api/chat")
            .json(&json!({ "message": question }))
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::Ok);
        assert_eq!(res.headers().get_one("Pragma"), Some("no-cache"));
        let body = json_body(res).await;
        assert!(body["response"].as_str().unwrap().starts_with("You asked:"));
        assert!(Uuid::parse_str(body["message_id"].as_str().unwrap()).is_ok());
    }

    let res = employee.get("/api/chat/history").dispatch().await;
    let history = json_body(res).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(
        history[0]["message"],
        format!("Where is the HR office {marker}?")
    );

    let admin = client(&env).await;
    register_and_login(&admin, &env.admin_email).await;
    let res = admin.get("/api/admin/dashboard").dispatch().await;
    assert_eq!(res.status(), Status::Ok);
    let dashboard = json_body(res).await;
    assert!(dashboard["total_questions"].as_i64().unwrap() >= 2);

    let res = admin.get("/api/admin/users").dispatch().await;
    let users = json_body(res).await;
    let asked: i64 = users
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|u| u["question_count"].as_i64())
        .sum();
    assert!(asked >= 2);

    let stat = question_stat(&env, &format!("where is the hr office {marker}?"))
        .await
        .expect("question recorded in analytics");
    assert_eq!(stat.count, 2);
    assert_eq!(stat.question_text, format!("Where is the HR office {marker}?"));
}

#[rocket::async_test]
async fn admin_manages_documents_and_roles() {
    let Some(env) = test_env() else { return };
    let admin = client(&env).await;
    let admin_user = register_and_login(&admin, &env.admin_email).await;
    assert_eq!(admin_user["role"], "admin");

    let employee = client(&env).await;
    let employee_user =
        register_and_login(&employee, &format!("staff-{}@example.com", Uuid::new_v4())).await;

    let (content_type, body) = multipart_file("welcome.txt", "Hello\nWorld");
    let res = employee
        .post("/api/document")
        .header(content_type.clone())
        .body(body.clone())
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::Forbidden);

    let res = admin
        .post("/api/document")
        .header(content_type)
        .body(body)
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::Created);
    let uploaded = json_body(res).await;
    assert_eq!(
        uploaded["message"],
        "Document \"welcome.txt\" uploaded successfully!"
    );
    assert_eq!(uploaded["document"]["has_content"], true);
    assert_eq!(uploaded["document"]["file_size"], 11);
    let document_id = uploaded["document"]["id"].as_i64().unwrap();
    assert_eq!(stored_files(&env), 1);

    let res = employee.get("/api/document").dispatch().await;
    let documents = json_body(res).await;
    let documents = documents.as_array().unwrap();
    assert!(documents.iter().any(|d| d["id"] == document_id));
    let listed = documents.len();

    let (content_type, body) = multipart_file("virus.exe", "MZ");
    let res = admin
        .post("/api/document")
        .header(content_type)
        .body(body)
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::BadRequest);
    assert_eq!(stored_files(&env), 1);
    let res = employee.get("/api/document").dispatch().await;
    assert_eq!(json_body(res).await.as_array().unwrap().len(), listed);

    let res = admin
        .delete(format!("/api/document/{document_id}"))
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::Ok);
    assert_eq!(json_body(res).await["message"], "Document \"welcome.txt\" deleted.");
    assert_eq!(stored_files(&env), 0);
    let res = admin
        .delete(format!("/api/document/{document_id}"))
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::NotFound);

    let admin_id = admin_user["id"].as_str().unwrap();
    let res = admin
        .post(format!("/api/admin/users/{admin_id}/toggle-admin"))
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::BadRequest);

    let employee_id = employee_user["id"].as_str().unwrap();
    let res = admin
        .post(format!("/api/admin/users/{employee_id}/toggle-admin"))
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::Ok);
    assert_eq!(json_body(res).await["role"], "admin");

    // the promoted user can't demote the primary admin
    let res = employee
        .post(format!("/api/admin/users/{admin_id}/toggle-admin"))
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::BadRequest);
    assert_eq!(
        json_body(res).await["message"],
        "Cannot change admin status of the primary admin account."
    );
}

#[rocket::async_test]
async fn slow_answers_do_not_hold_database_connections() {
    use std::time::{Duration, Instant};
    use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

    let Some(env) = test_env() else { return };
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(json!({ "choices": [{ "message": { "content": "Later." } }] })),
        )
        .mount(&llm)
        .await;

    // a single pooled connection, shared by every request
    let figment = env
        .figment
        .clone()
        .merge(("database_pool", 1))
        .merge(("llm_provider", "openai"))
        .merge(("groq_api_key", "test-key"))
        .merge(("llm_base_url", llm.uri()));
    let client = Client::tracked(build_rocket_with(figment))
        .await
        .expect("valid rocket instance");
    register_and_login(&client, &format!("slow-{}@example.com", Uuid::new_v4())).await;

    let chat = async {
        let res = client
            .post("/api/chat")
            .json(&json!({ "message": "Anything new?" }))
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::Ok);
        assert_eq!(json_body(res).await["response"], "Later.");
        Instant::now()
    };
    let profile = async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let res = client.get("/api/auth/profile").dispatch().await;
        assert_eq!(res.status(), Status::Ok);
        Instant::now()
    };
    let (chat_done, profile_done) = tokio::join!(chat, profile);
    assert!(profile_done < chat_done);
}
