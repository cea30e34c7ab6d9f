use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn llm_for(server: &MockServer) -> OllamaLlm {
    let address = server.address();
    let mut config = Config::default();
    config.ollama.host = address.ip().to_string();
    config.ollama.port = address.port();
    OllamaLlm::new(&config).expect("Failed to create llm")
}

#[test]
fn uses_configured_generation_settings() {
    let mut config = Config::default();
    config.llm.model = "llama2:13b-chat".to_string();
    config.llm.max_new_tokens = 256;

    let llm = OllamaLlm::new(&config).expect("Failed to create llm");

    assert_eq!(llm.model(), "llama2:13b-chat");
    assert_eq!(llm.max_new_tokens, 256);
    assert!((llm.temperature - 0.8).abs() < f32::EPSILON);
}

#[tokio::test]
async fn generate_sends_prompt_and_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "llama2:7b-chat-q4_0",
            "prompt": "Question: what is a fever?",
            "stream": false,
            "options": {"num_predict": 512}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama2:7b-chat-q4_0",
            "response": " A raised body temperature. ",
            "done": true,
            "eval_count": 7
        })))
        .expect(1)
        .mount(&server)
        .await;

    let llm = llm_for(&server);
    let answer = tokio::task::spawn_blocking(move || llm.generate("Question: what is a fever?"))
        .await
        .expect("task should not panic")
        .expect("generation should succeed");

    assert_eq!(answer, " A raised body temperature. ");
}

#[tokio::test]
async fn missing_model_is_an_llm_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"error": "model 'llama2:7b-chat-q4_0' not found"})),
        )
        .mount(&server)
        .await;

    let llm = llm_for(&server);
    let result = tokio::task::spawn_blocking(move || llm.generate("hello"))
        .await
        .expect("task should not panic");

    match result {
        Err(BotError::Llm(message)) => assert!(message.contains("not found"), "{}", message),
        other => panic!("expected llm error, got {:?}", other),
    }
}
