//! HTTP clients against a local mock server: providers, photo search and the mail relay.

use autoscribe::comments::FrozenContext;
use autoscribe::content::GeneratedItem;
use autoscribe::error::AutomationError;
use autoscribe::media::compose::OverlayCompositor;
use autoscribe::media::photo::{Orientation, PhotoSearch, PixabayClient};
use autoscribe::media::{ImageEngine, ServerImageEngine};
use autoscribe::notify::{Notification, Notifier, RelayNotifier};
use autoscribe::provider::{
    ChatMessage, CompletionOptions, GeminiClient, ModelProviderClient, OpenAIClient,
    ProviderGateway, ProviderMode, ProviderResult,
};
use base64::Engine;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn messages() -> Vec<ChatMessage> {
    vec![ChatMessage::system("Be brief."), ChatMessage::user("Say hi.")]
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(16, 12, image::Rgb([200, 120, 40]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn openai(server: &MockServer) -> OpenAIClient {
    OpenAIClient::new(
        "gpt-test".to_string(),
        "sk-test".to_string(),
        None,
        Some(server.uri()),
    )
    .unwrap()
}

fn gemini(server: &MockServer) -> GeminiClient {
    GeminiClient::new(
        "gemini-test".to_string(),
        "g-test".to_string(),
        Some("gemini-image".to_string()),
        Some(server.uri()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_openai_completion_sends_bearer_and_reads_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-test"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-test-2024",
            "choices": [{"message": {"role": "assistant", "content": "hi there"}, "finish_reason": "stop"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = openai(&server)
        .complete(messages(), CompletionOptions::short_text(20, 0.5))
        .await
        .unwrap();
    assert_eq!(response.content, "hi there");
    assert_eq!(response.model, "gpt-test-2024");
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn test_openai_rate_limit_is_provider_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = openai(&server)
        .complete(messages(), CompletionOptions::short_text(20, 0.5))
        .await
        .unwrap_err();
    let AutomationError::ProviderFailure(reason) = err else {
        panic!("expected provider failure");
    };
    assert!(reason.contains("Rate limit"));
}

#[tokio::test]
async fn test_openai_image_decodes_base64_payload() {
    let server = MockServer::start().await;
    let png = png_bytes();
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"b64_json": base64::engine::general_purpose::STANDARD.encode(&png)}]
        })))
        .mount(&server)
        .await;

    let blob = openai(&server).generate_image("a lighthouse").await.unwrap().unwrap();
    assert_eq!(blob.bytes, png);
    assert_eq!(blob.mime, "image/png");
}

#[tokio::test]
async fn test_gemini_completion_joins_text_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .and(header("x-goog-api-key", "g-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "hello "}, {"text": "world"}]},
                "finishReason": "STOP"
            }]
        })))
        .mount(&server)
        .await;

    let response = gemini(&server)
        .complete(messages(), CompletionOptions::short_text(20, 0.5))
        .await
        .unwrap();
    assert_eq!(response.content, "hello world");
    assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
}

#[tokio::test]
async fn test_gemini_image_reads_inline_data() {
    let server = MockServer::start().await;
    let png = png_bytes();
    Mock::given(method("POST"))
        .and(path("/models/gemini-image:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "here you go"},
                    {"inlineData": {"mimeType": "image/png", "data": base64::engine::general_purpose::STANDARD.encode(&png)}}
                ]}
            }]
        })))
        .mount(&server)
        .await;

    let blob = gemini(&server).generate_image("a lighthouse").await.unwrap().unwrap();
    assert_eq!(blob.bytes, png);
}

#[tokio::test]
async fn test_gateway_falls_back_from_failing_http_provider() {
    let primary = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&primary)
        .await;
    let secondary = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Lovely write-up, thanks!"}]}}]
        })))
        .expect(1)
        .mount(&secondary)
        .await;

    let a: Arc<dyn ModelProviderClient> = Arc::new(openai(&primary));
    let b: Arc<dyn ModelProviderClient> = Arc::new(gemini(&secondary));
    let gateway = ProviderGateway::new(Some(a), Some(b), ProviderMode::Auto, Duration::from_secs(15));

    let context = FrozenContext {
        title: "Title".to_string(),
        excerpt: "Excerpt".to_string(),
        summary: String::new(),
    };
    assert_eq!(
        gateway.generate_comment(&context).await,
        ProviderResult::Success("Lovely write-up, thanks!".to_string())
    );
}

#[tokio::test]
async fn test_gateway_times_out_slow_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"model": "m", "choices": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let a: Arc<dyn ModelProviderClient> = Arc::new(openai(&server));
    let gateway = ProviderGateway::new(Some(a), None, ProviderMode::Primary, Duration::from_millis(200));
    let context = FrozenContext {
        title: "Title".to_string(),
        excerpt: String::new(),
        summary: String::new(),
    };
    let ProviderResult::Failure(reason) = gateway.generate_comment(&context).await else {
        panic!("expected timeout failure");
    };
    assert!(reason.contains("timed out"));
}

#[tokio::test]
async fn test_pixabay_search_sends_query_and_orientation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .and(query_param("key", "px-key"))
        .and(query_param("q", "coffee beans"))
        .and(query_param("orientation", "vertical"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": [
                {"largeImageURL": "https://cdn.example/large.jpg", "webformatURL": "https://cdn.example/web.jpg"},
                {"webformatURL": "https://cdn.example/only-web.jpg"}
            ]
        })))
        .mount(&server)
        .await;

    let client =
        PixabayClient::new(
            "px-key".to_string(),
            Some(format!("{}/api/", server.uri())),
            Duration::from_secs(15),
        )
        .unwrap();
    let urls = client.search("coffee beans", Orientation::Vertical).await.unwrap();
    assert_eq!(
        urls,
        vec!["https://cdn.example/large.jpg", "https://cdn.example/only-web.jpg"]
    );
}

#[tokio::test]
async fn test_pixabay_search_gives_up_at_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"hits": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = PixabayClient::new(
        "px-key".to_string(),
        Some(format!("{}/api/", server.uri())),
        Duration::from_millis(200),
    )
    .unwrap();
    let started = std::time::Instant::now();
    let result = client.search("coffee", Orientation::Horizontal).await;
    assert!(result.is_err());
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_server_engine_bounds_photo_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": [{"largeImageURL": format!("{}/slow.png", server.uri())}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(png_bytes())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let timeout = Duration::from_millis(200);
    let search: Arc<dyn PhotoSearch> = Arc::new(
        PixabayClient::new("px-key".to_string(), Some(format!("{}/api/", server.uri())), timeout)
            .unwrap(),
    );
    let engine = ServerImageEngine::new(
        search,
        OverlayCompositor::from_hex("1b1f3b").unwrap(),
        "coffee".to_string(),
        Orientation::Horizontal,
        timeout,
    )
    .unwrap();

    let started = std::time::Instant::now();
    let err = engine
        .build(&GeneratedItem::new("Coffee", "<p>Body</p>"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "side_effect_failure");
    assert!(err.to_string().contains("photo download"), "{}", err);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_server_engine_downloads_and_composites() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .and(query_param("q", "Rust Ownership Basics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": [{"largeImageURL": format!("{}/photo.png", server.uri())}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/photo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png_bytes()),
        )
        .mount(&server)
        .await;

    let search: Arc<dyn PhotoSearch> = Arc::new(
        PixabayClient::new(
            "px-key".to_string(),
            Some(format!("{}/api/", server.uri())),
            Duration::from_secs(15),
        )
        .unwrap(),
    );
    let engine = ServerImageEngine::new(
        search,
        OverlayCompositor::from_hex("1b1f3b").unwrap(),
        String::new(),
        Orientation::Horizontal,
        Duration::from_secs(15),
    )
    .unwrap();

    let item = GeneratedItem::new("Rust Ownership Basics Explained", "<p>Body</p>");
    let blob = engine.build(&item).await.unwrap();
    assert_eq!(blob.mime, "image/jpeg");
    let decoded = image::load_from_memory(&blob.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (16, 12));
}

#[tokio::test]
async fn test_relay_notifier_posts_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(body_partial_json(json!({
            "to": "ops@example.org",
            "subject": "autoscribe: persistence_failure"
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let notifier =
        RelayNotifier::new(format!("{}/send", server.uri()), "ops@example.org".to_string())
            .unwrap();
    let notification =
        Notification::for_error(&AutomationError::PersistenceFailure("disk full".to_string()));
    notifier.notify(&notification).await.unwrap();
}

#[tokio::test]
async fn test_relay_notifier_reports_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let notifier = RelayNotifier::new(server.uri(), "ops@example.org".to_string()).unwrap();
    let err = notifier
        .notify(&Notification {
            subject: "s".to_string(),
            body: "b".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "side_effect_failure");
}
