// Drives OpenAIAssistantClient against a local mock of the Assistants API.

use mockito::{Matcher, Server, ServerGuard};
use repotalk_assistant::{
    AssistantApi, AssistantConfig, AssistantError, AssistantId, AssistantService, ClientConfig,
    FileId, OpenAIAssistantClient, RunPoller, ThreadId,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn client_for(server: &ServerGuard) -> OpenAIAssistantClient {
    OpenAIAssistantClient::new(ClientConfig::new("sk-test").with_base_url(server.url())).unwrap()
}

#[tokio::test]
async fn test_requests_carry_auth_and_beta_headers() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/assistants")
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer sk-test")
        .match_header("openai-beta", "assistants=v2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "object": "list",
                "data": [{"id": "asst_1", "name": "repo_talk_01", "model": "gpt-4o-mini"}],
                "has_more": false
            })
            .to_string(),
        )
        .create_async()
        .await;

    let assistants = client_for(&server).list_assistants().await.unwrap();

    mock.assert_async().await;
    assert_eq!(assistants.len(), 1);
    assert_eq!(assistants[0].id, AssistantId::new("asst_1"));
}

#[tokio::test]
async fn test_create_assistant_enables_file_search() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/assistants")
        .match_body(Matcher::PartialJson(json!({
            "name": "repo_talk_01",
            "model": "gpt-4o-mini",
            "tools": [{"type": "file_search"}]
        })))
        .with_status(200)
        .with_body(json!({"id": "asst_9", "name": "repo_talk_01", "model": "gpt-4o-mini"}).to_string())
        .create_async()
        .await;

    let created = client_for(&server)
        .create_assistant(&AssistantConfig::new("repo_talk_01", "gpt-4o-mini"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(created.id.as_str(), "asst_9");
}

#[tokio::test]
async fn test_missing_thread_is_not_found() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/threads/thread_gone")
        .with_status(404)
        .with_body(json!({"error": {"message": "No thread found"}}).to_string())
        .create_async()
        .await;

    let client = Arc::new(client_for(&server));
    let err = client.retrieve_thread(&ThreadId::new("thread_gone")).await.unwrap_err();
    assert!(err.is_not_found());

    let service = AssistantService::new(client, RunPoller::default());
    assert!(service.get_thread(&ThreadId::new("thread_gone")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/threads")
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let err = client_for(&server).create_thread().await.unwrap_err();
    match err {
        AssistantError::Api { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_attach_links_vector_store_on_first_use() {
    let mut server = Server::new_async().await;
    let get_assistant = server
        .mock("GET", "/assistants/asst_1")
        .with_status(200)
        .with_body(json!({"id": "asst_1", "name": "repo_talk_01", "model": "gpt-4o-mini"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let create_store = server
        .mock("POST", "/vector_stores")
        .match_body(Matcher::PartialJson(json!({"name": "repo_talk_01-files"})))
        .with_status(200)
        .with_body(json!({"id": "vs_1"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let link_store = server
        .mock("POST", "/assistants/asst_1")
        .match_body(Matcher::PartialJson(json!({
            "tool_resources": {"file_search": {"vector_store_ids": ["vs_1"]}}
        })))
        .with_status(200)
        .with_body(json!({"id": "asst_1", "model": "gpt-4o-mini"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let attach = server
        .mock("POST", "/vector_stores/vs_1/files")
        .match_body(Matcher::PartialJson(json!({"file_id": "file-1"})))
        .with_status(200)
        .with_body(json!({"id": "file-1"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let list = server
        .mock("GET", "/vector_stores/vs_1/files")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({"data": [{"id": "file-1"}]}).to_string())
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let assistant = AssistantId::new("asst_1");
    client.attach_file(&assistant, &FileId::new("file-1")).await.unwrap();
    // Store id is cached; no second assistant lookup
    let attached = client.list_assistant_files(&assistant).await.unwrap();

    get_assistant.assert_async().await;
    create_store.assert_async().await;
    link_store.assert_async().await;
    attach.assert_async().await;
    list.assert_async().await;
    assert_eq!(attached, vec![FileId::new("file-1")]);
}

#[tokio::test]
async fn test_upload_sends_multipart_with_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("alice-bob-bundle.txt");
    std::fs::write(&bundle, "// ==== file path: main.go\npackage main\n").unwrap();

    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/files")
        .match_header("content-type", Matcher::Regex("multipart/form-data".to_string()))
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("alice-bob-bundle.txt".to_string()),
            Matcher::Regex("assistants".to_string()),
            Matcher::Regex("package main".to_string()),
        ]))
        .with_status(200)
        .with_body(
            json!({"id": "file-7", "filename": "alice-bob-bundle.txt", "bytes": 40, "purpose": "assistants"})
                .to_string(),
        )
        .create_async()
        .await;

    let uploaded = client_for(&server).upload_file(&bundle).await.unwrap();

    mock.assert_async().await;
    assert_eq!(uploaded.id, FileId::new("file-7"));
    assert_eq!(uploaded.filename, "alice-bob-bundle.txt");
}

#[tokio::test]
async fn test_upload_of_missing_file_is_io_error() {
    let server = Server::new_async().await;
    let err = client_for(&server)
        .upload_file(std::path::Path::new("/definitely/not/here.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err, AssistantError::Io { .. }));
}

#[tokio::test]
async fn test_run_message_over_http() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/threads/thread_1/messages")
        .match_body(Matcher::PartialJson(json!({"role": "user", "content": "What does it do?"})))
        .with_status(200)
        .with_body(
            json!({
                "id": "msg_1",
                "role": "user",
                "content": [{"type": "text", "text": {"value": "What does it do?", "annotations": []}}]
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("POST", "/threads/thread_1/runs")
        .match_body(Matcher::PartialJson(json!({"assistant_id": "asst_1"})))
        .with_status(200)
        .with_body(json!({"id": "run_1", "thread_id": "thread_1", "status": "queued"}).to_string())
        .create_async()
        .await;
    let poll = server
        .mock("GET", "/threads/thread_1/runs/run_1")
        .with_status(200)
        .with_body(json!({"id": "run_1", "thread_id": "thread_1", "status": "completed"}).to_string())
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/threads/thread_1/messages")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("limit".into(), "1".into()),
            Matcher::UrlEncoded("order".into(), "desc".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "data": [{
                    "id": "msg_2",
                    "role": "assistant",
                    "content": [{"type": "text", "text": {"value": "It serves HTTP.", "annotations": []}}]
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let service = AssistantService::new(
        Arc::new(client_for(&server)),
        RunPoller::new(Duration::from_millis(10), Duration::from_secs(5)),
    );
    let reply = service
        .run_message(
            &AssistantId::new("asst_1"),
            &ThreadId::new("thread_1"),
            "What does it do?",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    poll.assert_async().await;
    assert_eq!(reply, "It serves HTTP.");
}

#[tokio::test]
async fn test_failed_run_status_surfaces() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/threads/thread_1/messages")
        .with_status(200)
        .with_body(json!({"id": "msg_1", "role": "user", "content": []}).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/threads/thread_1/runs")
        .with_status(200)
        .with_body(json!({"id": "run_1", "thread_id": "thread_1", "status": "queued"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/threads/thread_1/runs/run_1")
        .with_status(200)
        .with_body(json!({"id": "run_1", "thread_id": "thread_1", "status": "failed"}).to_string())
        .create_async()
        .await;

    let service = AssistantService::new(Arc::new(client_for(&server)), RunPoller::default());
    let err = service
        .run_message(
            &AssistantId::new("asst_1"),
            &ThreadId::new("thread_1"),
            "hi",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AssistantError::RunFailed { ref status, .. } if status == "failed"));
}

#[tokio::test]
async fn test_existing_bundle_found_on_later_page() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/assistants/asst_1")
        .with_status(200)
        .with_body(
            json!({
                "id": "asst_1",
                "name": "repo_talk_01",
                "model": "gpt-4o-mini",
                "tool_resources": {"file_search": {"vector_store_ids": ["vs_1"]}}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let first_page: Vec<_> = (0..100).map(|i| json!({"id": format!("file-{:03}", i)})).collect();
    let page_one = server
        .mock("GET", "/vector_stores/vs_1/files")
        .match_query(Matcher::Regex("^limit=100$".to_string()))
        .with_status(200)
        .with_body(json!({"data": first_page, "has_more": true}).to_string())
        .expect(1)
        .create_async()
        .await;
    let page_two = server
        .mock("GET", "/vector_stores/vs_1/files")
        .match_query(Matcher::UrlEncoded("after".into(), "file-099".into()))
        .with_status(200)
        .with_body(json!({"data": [{"id": "file-100"}], "has_more": false}).to_string())
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/files")
        .match_query(Matcher::UrlEncoded("purpose".into(), "assistants".into()))
        .with_status(200)
        .with_body(
            json!({
                "data": [
                    {"id": "file-007", "filename": "carol-dave-bundle.txt"},
                    {"id": "file-100", "filename": "alice-bob-bundle.txt"}
                ],
                "has_more": false
            })
            .to_string(),
        )
        .create_async()
        .await;
    let upload = server
        .mock("POST", "/files")
        .with_status(200)
        .with_body(json!({"id": "file-new", "filename": "alice-bob-bundle.txt"}).to_string())
        .expect(0)
        .create_async()
        .await;

    let service = AssistantService::new(Arc::new(client_for(&server)), RunPoller::default());
    let outcome = service
        .upload_file_if_absent(
            &AssistantId::new("asst_1"),
            std::path::Path::new("bundles/alice/bob/alice-bob-bundle.txt"),
            false,
        )
        .await
        .unwrap();

    page_one.assert_async().await;
    page_two.assert_async().await;
    upload.assert_async().await;
    assert!(!outcome.uploaded);
    assert_eq!(outcome.file_id, FileId::new("file-100"));
}

#[tokio::test]
async fn test_assistant_found_on_later_page() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/assistants")
        .match_query(Matcher::Regex("^order=desc&limit=100$".to_string()))
        .with_status(200)
        .with_body(
            json!({
                "data": [{"id": "asst_1", "name": "someone_else", "model": "gpt-4o"}],
                "has_more": true
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/assistants")
        .match_query(Matcher::UrlEncoded("after".into(), "asst_1".into()))
        .with_status(200)
        .with_body(
            json!({
                "data": [{"id": "asst_2", "name": "repo_talk_01", "model": "gpt-4o-mini"}],
                "has_more": false
            })
            .to_string(),
        )
        .create_async()
        .await;
    let create = server
        .mock("POST", "/assistants")
        .with_status(200)
        .with_body(json!({"id": "asst_9", "name": "repo_talk_01", "model": "gpt-4o-mini"}).to_string())
        .expect(0)
        .create_async()
        .await;

    let service = AssistantService::new(Arc::new(client_for(&server)), RunPoller::default());
    let id = service
        .load_or_create_assistant(&AssistantConfig::new("repo_talk_01", "gpt-4o-mini"), false)
        .await
        .unwrap();

    create.assert_async().await;
    assert_eq!(id, AssistantId::new("asst_2"));
}

#[tokio::test]
async fn test_concurrent_first_use_creates_one_vector_store() {
    let mut server = Server::new_async().await;
    let get_assistant = server
        .mock("GET", "/assistants/asst_1")
        .with_status(200)
        .with_body(json!({"id": "asst_1", "name": "repo_talk_01", "model": "gpt-4o-mini"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let create_store = server
        .mock("POST", "/vector_stores")
        .with_status(200)
        .with_body(json!({"id": "vs_1"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let link_store = server
        .mock("POST", "/assistants/asst_1")
        .with_status(200)
        .with_body(json!({"id": "asst_1", "model": "gpt-4o-mini"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let attach = server
        .mock("POST", "/vector_stores/vs_1/files")
        .with_status(200)
        .with_body(json!({"id": "file-1"}).to_string())
        .expect(2)
        .create_async()
        .await;

    let client = client_for(&server);
    let assistant = AssistantId::new("asst_1");
    let file_1 = FileId::new("file-1");
    let file_2 = FileId::new("file-2");
    let (a, b) = tokio::join!(
        client.attach_file(&assistant, &file_1),
        client.attach_file(&assistant, &file_2),
    );
    a.unwrap();
    b.unwrap();

    get_assistant.assert_async().await;
    create_store.assert_async().await;
    link_store.assert_async().await;
    attach.assert_async().await;
}
