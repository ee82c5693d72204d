// tests/placement_flow_tests.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use placement_engine::{
    config::Config,
    models::{
        learning_path::LearningPath,
        placement::{PlacementRecord, SkillProfile},
        question::{Difficulty, QuestionItem},
    },
    placement::completion::{CompletionError, TextCompletion},
    repository::{
        PlacementOutcome, PlacementRepository, RepositoryError,
        memory::{MemoryCatalog, MemoryStore},
    },
    routes,
    state::AppState,
};

fn test_config() -> Config {
    Config {
        rust_log: "error".to_string(),
        completion_timeout_ms: 200,
        ..Config::default()
    }
}

fn build_state(
    placements: Arc<dyn PlacementRepository>,
    completion: Option<Arc<dyn TextCompletion>>,
) -> AppState {
    let config = test_config();
    let catalog = MemoryCatalog::from_file(&config.course_catalog_path)
        .expect("Failed to load bundled course catalog");
    AppState::new(config, Arc::new(catalog), placements, completion)
}

/// Spawns the app for `state` on a random port and returns its base URL.
async fn spawn_app(state: AppState) -> String {
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn item(id: &str, topic: &str) -> QuestionItem {
    QuestionItem {
        id: id.to_string(),
        prompt: format!("Question about {}", topic),
        options: vec![
            "right".to_string(),
            "wrong 1".to_string(),
            "wrong 2".to_string(),
            "wrong 3".to_string(),
        ],
        correct_answer: "right".to_string(),
        topic: topic.to_string(),
        difficulty: Difficulty::Beginner,
        language: "python".to_string(),
    }
}

/// loops x3, functions x2
fn loops_and_functions() -> Vec<QuestionItem> {
    vec![
        item("l1", "loops"),
        item("l2", "loops"),
        item("l3", "loops"),
        item("f1", "functions"),
        item("f2", "functions"),
    ]
}

fn loops_right_functions_wrong(batch_id: &str, user_id: i64) -> serde_json::Value {
    serde_json::json!({
        "batch_id": batch_id,
        "user_id": user_id,
        "answers": [
            { "question_id": "l1", "value": "right" },
            { "question_id": "l2", "value": " RIGHT " },
            { "question_id": "l3", "value": "right" },
            { "question_id": "f1", "value": "wrong 1" },
            { "question_id": "f2", "value": "wrong 2" },
            { "question_id": "not-in-batch", "value": "right" }
        ]
    })
}

async fn grade(
    client: &reqwest::Client,
    address: &str,
    body: &serde_json::Value,
) -> reqwest::Response {
    client
        .post(&format!("{}/api/quiz/grade", address))
        .json(body)
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn grading_scenario_persists_placement() {
    // Arrange
    let state = build_state(Arc::new(MemoryStore::new()), None);
    let batch = state
        .sessions
        .issue(11, "python", Difficulty::Beginner, loops_and_functions());
    let address = spawn_app(state).await;
    let client = reqwest::Client::new();

    // Act
    let response = grade(&client, &address, &loops_right_functions_wrong(&batch.batch_id, 11)).await;

    // Assert: grading result
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["score"], 30);
    assert_eq!(body["correct_count"], 3);
    assert_eq!(body["total_questions"], 5);
    assert_eq!(body["weak_topics"], serde_json::json!(["functions"]));
    assert_eq!(body["strong_topics"], serde_json::json!(["loops"]));
    assert_eq!(body["topic_tally"]["loops"]["correct"], 3);
    assert_eq!(body["topic_tally"]["functions"]["incorrect"], 2);
    assert!(body["placement_id"].as_i64().is_some());

    let probabilities = body["level_probabilities"].as_object().unwrap();
    assert_eq!(probabilities.len(), 3);
    let total: f64 = probabilities.values().map(|p| p.as_f64().unwrap()).sum();
    assert!((total - 1.0).abs() < 1e-6);

    assert_eq!(body["recommended_courses"].as_array().unwrap().len(), 5);
    let path = body["learning_path"].as_array().unwrap();
    assert!(path.len() >= 6 && path.len() <= 12);
    assert_eq!(path[0]["title"], "Week 1: functions");
    assert!(path[0]["description"].as_str().unwrap().contains("loops"));

    // Assert: history
    let history: serde_json::Value = client
        .get(&format!("{}/api/history?user_id=11", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["history"].as_array().unwrap().len(), 1);
    assert_eq!(history["summary"]["latest_score"], 30);
    assert_eq!(history["summary"]["avg_score"], 30.0);
    assert_eq!(history["summary"]["last_topic"], "functions");
    assert_eq!(history["summary"]["last_level"], body["level"]);

    // Assert: learning path and latest result
    let learning_path: serde_json::Value = client
        .get(&format!("{}/api/learning-path/11", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(learning_path["skill_profile"]["level"], body["level"]);
    assert_eq!(learning_path["skill_profile"]["weaknesses"], serde_json::json!(["functions"]));
    assert_eq!(
        learning_path["skill_profile"]["recommended_courses"],
        body["recommended_courses"]
    );
    assert_eq!(learning_path["timeline"], body["learning_path"]);

    let result: serde_json::Value = client
        .get(&format!("{}/api/placement/result/11", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["placement"]["id"], body["placement_id"]);
    assert_eq!(result["skill_profile"]["placement_id"], body["placement_id"]);
}

#[tokio::test]
async fn batch_cannot_be_graded_twice() {
    // Arrange
    let state = build_state(Arc::new(MemoryStore::new()), None);
    let batch = state
        .sessions
        .issue(12, "python", Difficulty::Beginner, loops_and_functions());
    let address = spawn_app(state).await;
    let client = reqwest::Client::new();
    let body = loops_right_functions_wrong(&batch.batch_id, 12);

    // Act
    let first = grade(&client, &address, &body).await;
    let second = grade(&client, &address, &body).await;

    // Assert
    assert_eq!(first.status().as_u16(), 200);
    assert_eq!(second.status().as_u16(), 404);

    let history: serde_json::Value = client
        .get(&format!("{}/api/history?user_id=12", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn batch_of_another_user_is_not_found() {
    // Arrange
    let state = build_state(Arc::new(MemoryStore::new()), None);
    let batch = state
        .sessions
        .issue(13, "python", Difficulty::Beginner, loops_and_functions());
    let address = spawn_app(state).await;
    let client = reqwest::Client::new();

    // Act
    let stolen = grade(&client, &address, &loops_right_functions_wrong(&batch.batch_id, 99)).await;
    let own = grade(&client, &address, &loops_right_functions_wrong(&batch.batch_id, 13)).await;

    // Assert
    assert_eq!(stolen.status().as_u16(), 404);
    assert_eq!(own.status().as_u16(), 200);
}

#[tokio::test]
async fn issued_quiz_can_be_graded_without_answers() {
    // Arrange
    let state = build_state(Arc::new(MemoryStore::new()), None);
    let address = spawn_app(state).await;
    let client = reqwest::Client::new();

    let quiz: serde_json::Value = client
        .post(&format!("{}/api/quiz", address))
        .json(&serde_json::json!({ "user_id": 14, "language": "go", "goal": "get hired" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(quiz["difficulty"], "intermediate");

    // Act
    let response = grade(
        &client,
        &address,
        &serde_json::json!({ "batch_id": quiz["batch_id"], "user_id": 14, "answers": [] }),
    )
    .await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["score"], 0);
    assert_eq!(body["total_questions"], 10);
    assert_eq!(body["level"], "beginner");
    assert_eq!(body["learning_path"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn history_drives_next_difficulty_and_focus() {
    // Arrange: a perfect first placement
    let state = build_state(Arc::new(MemoryStore::new()), None);
    let batch = state
        .sessions
        .issue(15, "python", Difficulty::Beginner, loops_and_functions());
    let address = spawn_app(state).await;
    let client = reqwest::Client::new();

    let answers: Vec<serde_json::Value> = loops_and_functions()
        .iter()
        .map(|q| serde_json::json!({ "question_id": q.id, "value": "right" }))
        .collect();
    let graded = grade(
        &client,
        &address,
        &serde_json::json!({ "batch_id": batch.batch_id, "user_id": 15, "answers": answers }),
    )
    .await;
    assert_eq!(graded.status().as_u16(), 200);

    // Act: the goal alone would ask for beginner questions
    let quiz: serde_json::Value = client
        .post(&format!("{}/api/quiz", address))
        .json(&serde_json::json!({ "user_id": 15, "language": "python", "goal": "beginner" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(quiz["difficulty"], "advanced");
    assert!(quiz["focus_topic"].is_null());

    // An explicit difficulty still wins over history.
    let explicit: serde_json::Value = client
        .post(&format!("{}/api/quiz", address))
        .json(&serde_json::json!({ "user_id": 15, "difficulty": "easy" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(explicit["difficulty"], "beginner");
}

#[tokio::test]
async fn weak_topic_becomes_next_focus() {
    // Arrange
    let state = build_state(Arc::new(MemoryStore::new()), None);
    let batch = state
        .sessions
        .issue(16, "python", Difficulty::Beginner, loops_and_functions());
    let address = spawn_app(state).await;
    let client = reqwest::Client::new();
    let graded = grade(&client, &address, &loops_right_functions_wrong(&batch.batch_id, 16)).await;
    assert_eq!(graded.status().as_u16(), 200);

    // Act
    let quiz: serde_json::Value = client
        .post(&format!("{}/api/quiz", address))
        .json(&serde_json::json!({ "user_id": 16, "language": "python" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert: 30/50 is 3.0 on the 5-point scale
    assert_eq!(quiz["focus_topic"], "functions");
    assert_eq!(quiz["difficulty"], "intermediate");
    let questions = quiz["questions"].as_array().unwrap();
    assert!(questions.iter().any(|q| q["topic"] == "functions"));
}

/// Placement store whose writes always fail.
struct BrokenStore;

#[async_trait]
impl PlacementRepository for BrokenStore {
    async fn recent_placements(
        &self,
        _user_id: i64,
        _limit: usize,
    ) -> Result<Vec<PlacementRecord>, RepositoryError> {
        Err(RepositoryError::Database("connection reset".to_string()))
    }

    async fn save_placement(&self, _outcome: PlacementOutcome) -> Result<i64, RepositoryError> {
        Err(RepositoryError::Database("connection reset".to_string()))
    }

    async fn skill_profile(&self, _user_id: i64) -> Result<Option<SkillProfile>, RepositoryError> {
        Err(RepositoryError::Database("connection reset".to_string()))
    }

    async fn learning_path(&self, _user_id: i64) -> Result<Option<LearningPath>, RepositoryError> {
        Err(RepositoryError::Database("connection reset".to_string()))
    }
}

#[tokio::test]
async fn persistence_failure_still_returns_result() {
    // Arrange
    let state = build_state(Arc::new(BrokenStore), None);
    let batch = state
        .sessions
        .issue(17, "python", Difficulty::Beginner, loops_and_functions());
    let address = spawn_app(state).await;
    let client = reqwest::Client::new();

    // Act
    let response = grade(&client, &address, &loops_right_functions_wrong(&batch.batch_id, 17)).await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["score"], 30);
    assert!(body["placement_id"].is_null());
    assert!(!body["learning_path"].as_array().unwrap().is_empty());

    // Reads surface the storage failure.
    let history = client
        .get(&format!("{}/api/history?user_id=17", address))
        .send()
        .await
        .unwrap();
    assert_eq!(history.status().as_u16(), 500);
}

struct CannedCompletion;

#[async_trait]
impl TextCompletion for CannedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        assert!(prompt.contains("functions"));
        Ok("```\nA focused week on functions, backed by your loops skills.\n```".to_string())
    }
}

struct HangingCompletion;

#[async_trait]
impl TextCompletion for HangingCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("never".to_string())
    }
}

#[tokio::test]
async fn completion_text_enriches_learning_path() {
    // Arrange
    let state = build_state(Arc::new(MemoryStore::new()), Some(Arc::new(CannedCompletion)));
    let batch = state
        .sessions
        .issue(18, "python", Difficulty::Beginner, loops_and_functions());
    let address = spawn_app(state).await;
    let client = reqwest::Client::new();

    // Act
    let response = grade(&client, &address, &loops_right_functions_wrong(&batch.batch_id, 18)).await;

    // Assert: fences are stripped
    let body: serde_json::Value = response.json().await.unwrap();
    for week in body["learning_path"].as_array().unwrap() {
        assert_eq!(
            week["description"],
            "A focused week on functions, backed by your loops skills."
        );
    }
}

#[tokio::test]
async fn hanging_completion_falls_back_to_templates() {
    // Arrange
    let state = build_state(Arc::new(MemoryStore::new()), Some(Arc::new(HangingCompletion)));
    let batch = state
        .sessions
        .issue(19, "python", Difficulty::Beginner, loops_and_functions());
    let address = spawn_app(state).await;
    let client = reqwest::Client::new();
    let started = std::time::Instant::now();

    // Act
    let response = grade(&client, &address, &loops_right_functions_wrong(&batch.batch_id, 19)).await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    assert!(started.elapsed() < Duration::from_secs(5));
    let body: serde_json::Value = response.json().await.unwrap();
    let first = body["learning_path"][0]["description"].as_str().unwrap();
    assert!(first.starts_with("Week 1:"));
    assert!(first.contains("functions") && first.contains("loops"));
}
