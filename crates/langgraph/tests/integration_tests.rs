//! Integration tests for the agent runtime client, against `wiremock`.
//!
//!   cargo test -p langgraph --test integration_tests

use langgraph::{
    AssistantConfig, AssistantSearch, AssistantUpdate, LangGraphClient, LangGraphConfig,
    LangGraphError, NewAssistant, RunRequest, ThreadMetadata, NO_RESPONSE,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod config_tests {
    use super::*;

    #[test]
    fn test_urls() {
        let config = LangGraphConfig::new("https://agent.example/", "key", "asst-default");
        assert_eq!(config.threads_url(), "https://agent.example/threads");
        assert_eq!(
            config.run_wait_url("t-1"),
            "https://agent.example/threads/t-1/runs/wait"
        );
        assert_eq!(config.assistant_url("a-1"), "https://agent.example/assistants/a-1");
        assert_eq!(
            config.assistant_search_url(),
            "https://agent.example/assistants/search"
        );
        assert_eq!(config.graph_id, "chatbot_agent");
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = LangGraphConfig::new("https://agent.example", "lsv2-secret", "a");
        assert!(!format!("{:?}", config).contains("lsv2-secret"));
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = LangGraphClient::new(LangGraphConfig::new("https://agent.example", "", "a"));
        assert!(matches!(result, Err(LangGraphError::Config(_))));
    }
}

fn client_for(server: &MockServer) -> LangGraphClient {
    LangGraphClient::new(LangGraphConfig::new(server.uri(), "test-key", "asst-default")).unwrap()
}

#[tokio::test]
async fn test_create_thread() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .and(header("x-api-key", "test-key"))
        .and(body_json(json!({ "metadata": { "user_id": "u1", "source": "whatsapp" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "thread_id": "t-123" })))
        .expect(1)
        .mount(&server)
        .await;

    let thread_id = client_for(&server)
        .create_thread(&ThreadMetadata::whatsapp("u1"))
        .await
        .unwrap();
    assert_eq!(thread_id, "t-123");
}

#[tokio::test]
async fn test_run_wait_returns_last_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads/t-1/runs/wait"))
        .and(body_partial_json(json!({
            "assistant_id": "asst-default",
            "config": { "configurable": { "source": "whatsapp" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                { "type": "human", "content": "goedkope melk?" },
                { "type": "ai", "content": "Dirk heeft de goedkoopste melk." }
            ]
        })))
        .mount(&server)
        .await;

    let request = RunRequest::user_message("asst-default", "goedkope melk?")
        .with_configurable("source", "whatsapp");
    let reply = client_for(&server).run_wait("t-1", &request).await.unwrap();
    assert_eq!(reply, "Dirk heeft de goedkoopste melk.");
}

#[tokio::test]
async fn test_run_wait_without_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads/t-2/runs/wait"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "messages": [] })))
        .mount(&server)
        .await;

    let reply = client_for(&server)
        .run_wait("t-2", &RunRequest::user_message("asst-default", "hoi"))
        .await
        .unwrap();
    assert_eq!(reply, NO_RESPONSE);
}

#[tokio::test]
async fn test_api_error_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistants/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Assistant not found"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_assistant("missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, LangGraphError::Api { ref body, .. } if body == "Assistant not found"));
}

#[tokio::test]
async fn test_assistant_lifecycle() {
    let server = MockServer::start().await;
    let assistant = json!({
        "assistant_id": "a-1",
        "graph_id": "chatbot_agent",
        "config": { "tags": ["bargainb"] },
        "metadata": { "conversation_id": "c-1" },
        "name": "BargainB Assistant for Sanne",
        "version": 1
    });

    Mock::given(method("POST"))
        .and(path("/assistants"))
        .and(body_partial_json(json!({ "graph_id": "chatbot_agent", "name": "BargainB Assistant for Sanne" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(assistant.clone()))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/assistants/a-1"))
        .and(body_partial_json(json!({ "config": { "recursion_limit": 25 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(assistant.clone()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/assistants/search"))
        .and(body_json(json!({ "metadata": {}, "limit": 10, "offset": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([assistant])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/assistants/a-1"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let created = client
        .create_assistant(&NewAssistant {
            graph_id: "chatbot_agent".to_string(),
            config: AssistantConfig::for_user(None, None),
            metadata: json!({ "conversation_id": "c-1" }),
            name: "BargainB Assistant for Sanne".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(created.assistant_id, "a-1");
    assert_eq!(created.metadata["conversation_id"], "c-1");

    let updated = client
        .update_assistant(
            "a-1",
            &AssistantUpdate {
                config: Some(AssistantConfig::default_for_bargainb()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name.as_deref(), Some("BargainB Assistant for Sanne"));

    let found = client
        .search_assistants(&AssistantSearch::default())
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    client.delete_assistant("a-1").await.unwrap();
}
