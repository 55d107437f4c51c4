use super::*;
use crate::error::IndexError;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FixedRetriever {
    results: Vec<SearchResult>,
}

#[async_trait]
impl Retriever for FixedRetriever {
    async fn retrieve(
        &self,
        _question: &str,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>, IndexError> {
        Ok(self
            .results
            .iter()
            .filter(|r| r.score >= min_score)
            .take(limit)
            .cloned()
            .collect())
    }
}

struct BrokenRetriever;

#[async_trait]
impl Retriever for BrokenRetriever {
    async fn retrieve(&self, _: &str, _: usize, _: f32) -> Result<Vec<SearchResult>, IndexError> {
        Err(IndexError::Store("table is gone".to_string()))
    }
}

fn chunk(path: &str, content: &str, score: f32) -> SearchResult {
    SearchResult {
        file_path: path.to_string(),
        content: content.to_string(),
        score,
        start_line: 1,
        end_line: 3,
        language: "Python".to_string(),
    }
}

fn engine(server: &MockServer, api_key: Option<&str>) -> ChatQueryEngine {
    let llm = LlmConfig {
        api_base: format!("{}/v1/", server.uri()),
        model: "test-model".to_string(),
        ..LlmConfig::default()
    };
    let search = SearchConfig {
        limit: 2,
        min_score: 0.0,
    };
    ChatQueryEngine::new(
        &llm,
        &search,
        api_key.map(str::to_string),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }
        ]
    })
}

#[tokio::test]
async fn test_answer_sends_context_and_question() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("It parses TOML.")))
        .expect(1)
        .mount(&server)
        .await;

    let retriever = FixedRetriever {
        results: vec![
            chunk("src/config.py", "def load():\n    return toml.load(path)", 0.9),
            chunk("README.md", "A config loader", 0.5),
            chunk("setup.py", "setup()", 0.1),
        ],
    };
    let engine = engine(&server, Some("sk-test"));

    let answer = engine
        .answer(&retriever, "What does load() do?")
        .await
        .unwrap();
    assert_eq!(answer.text, "It parses TOML.");
    assert_eq!(answer.sources.len(), 2);
    assert_eq!(answer.sources[0].file_path, "src/config.py");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = requests[0].body_json::<serde_json::Value>().unwrap();
    assert_eq!(body["model"], "test-model");

    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1]["role"], "user");

    let user = messages[1]["content"].as_str().unwrap();
    assert!(user.contains("### src/config.py:1-3\n```python\ndef load():"));
    assert!(user.contains("### README.md:1-3"));
    assert!(!user.contains("setup.py"));
    assert!(user.ends_with("Question: What does load() do?"));
}

#[tokio::test]
async fn test_answer_respects_context_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .mount(&server)
        .await;

    let llm = LlmConfig {
        api_base: format!("{}/v1", server.uri()),
        max_context_chars: 50,
        ..LlmConfig::default()
    };
    let engine = ChatQueryEngine::new(
        &llm,
        &SearchConfig::default(),
        Some("sk-test".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();
    let retriever = FixedRetriever {
        results: vec![
            chunk("a.py", &"a".repeat(30), 0.9),
            chunk("b.py", &"b".repeat(30), 0.8),
        ],
    };

    let answer = engine.answer(&retriever, "q").await.unwrap();
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].file_path, "a.py");
}

#[tokio::test]
async fn test_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let err = engine(&server, Some("sk-wrong"))
        .answer(&FixedRetriever { results: vec![] }, "q")
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Unauthorized));
}

#[tokio::test]
async fn test_api_error_extracts_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "model does not exist" }
        })))
        .mount(&server)
        .await;

    let err = engine(&server, Some("sk-test"))
        .answer(&FixedRetriever { results: vec![] }, "q")
        .await
        .unwrap_err();
    match err {
        LlmError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "model does not exist");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_api_error_with_plain_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
        .mount(&server)
        .await;

    let err = engine(&server, Some("sk-test"))
        .answer(&FixedRetriever { results: vec![] }, "q")
        .await
        .unwrap_err();
    assert!(
        matches!(err, LlmError::Api { status: 503, ref message } if message == "upstream overloaded")
    );
}

#[tokio::test]
async fn test_empty_choices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = engine(&server, Some("sk-test"))
        .answer(&FixedRetriever { results: vec![] }, "q")
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse));
}

#[tokio::test]
async fn test_null_content_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "role": "assistant", "content": null } } ]
        })))
        .mount(&server)
        .await;

    let err = engine(&server, Some("sk-test"))
        .answer(&FixedRetriever { results: vec![] }, "q")
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse));
}

#[tokio::test]
async fn test_undecodable_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let err = engine(&server, Some("sk-test"))
        .answer(&FixedRetriever { results: vec![] }, "q")
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Decode(_)));
}

#[tokio::test]
async fn test_network_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let llm = LlmConfig {
        api_base: format!("http://{}", addr),
        ..LlmConfig::default()
    };
    let engine = ChatQueryEngine::new(
        &llm,
        &SearchConfig::default(),
        Some("sk-test".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();

    let err = engine
        .answer(&FixedRetriever { results: vec![] }, "q")
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Network(_)));
}

#[tokio::test]
async fn test_retrieval_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let err = engine(&server, Some("sk-test"))
        .answer(&BrokenRetriever, "q")
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Retrieval(ref m) if m.contains("table is gone")));
}

#[tokio::test]
async fn test_check_credentials() {
    let server = MockServer::start().await;

    let with_key = engine(&server, Some("sk-test"));
    assert!(QueryEngine::<FixedRetriever>::check_credentials(&with_key).is_ok());

    let blank = engine(&server, Some("   "));
    let err = QueryEngine::<FixedRetriever>::check_credentials(&blank).unwrap_err();
    assert_eq!(
        err,
        CredentialsError::Missing {
            var: "OPENAI_API_KEY".to_string()
        }
    );
}

#[test]
fn test_debug_hides_api_key() {
    let engine = ChatQueryEngine::new(
        &LlmConfig::default(),
        &SearchConfig::default(),
        Some("sk-secret".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();
    let debug = format!("{:?}", engine);
    assert!(!debug.contains("sk-secret"));
    assert!(debug.contains("has_api_key: true"));
}
