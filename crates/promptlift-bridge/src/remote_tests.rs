use super::*;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> RewriteRequest {
    RewriteRequest {
        prompt: "make a website".to_string(),
        style: "detailed".to_string(),
        platform: "chatgpt".to_string(),
        intent_hint: "coding".to_string(),
    }
}

#[test]
fn test_decoder_joins_split_lines() {
    let mut decoder = LineDecoder::default();
    assert!(decoder.push(b"{\"chu").is_empty());
    let messages = decoder.push(b"nk\":\"Hel\"}\n{\"chunk\":\"lo\"}\n");
    assert_eq!(
        messages,
        vec![StreamMessage::chunk("Hel"), StreamMessage::chunk("lo")]
    );
}

#[test]
fn test_decoder_sse_prefix_and_done() {
    let mut decoder = LineDecoder::default();
    let messages = decoder.push(b"data: {\"chunk\":\"a\"}\n\ndata: [DONE]\n");
    assert_eq!(messages, vec![StreamMessage::chunk("a"), StreamMessage::complete()]);
}

#[test]
fn test_decoder_finish_flushes_tail() {
    let mut decoder = LineDecoder::default();
    assert!(decoder.push(b"{\"complete\":true}").is_empty());
    assert_eq!(decoder.finish(), vec![StreamMessage::complete()]);
}

#[test]
fn test_decoder_skips_garbage() {
    let mut decoder = LineDecoder::default();
    let messages = decoder.push(b"garbage\n{\"error\":\"busy\"}\n");
    assert_eq!(messages, vec![StreamMessage::error("busy")]);
}

#[tokio::test]
async fn test_decode_stream_transport_error_becomes_message() {
    let body = futures::stream::iter(vec![
        Ok::<_, String>(b"{\"chunk\":\"x\"}\n".to_vec()),
        Err("connection reset".to_string()),
    ]);
    let messages: Vec<_> = decode_stream(body).collect().await;
    assert_eq!(messages[0], StreamMessage::chunk("x"));
    assert_eq!(messages[1], StreamMessage::error("connection reset"));
}

#[tokio::test]
async fn test_rewrite_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/enhance"))
        .and(body_partial_json(serde_json::json!({
            "prompt": "make a website",
            "intentHint": "coding",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "enhancedText": "Build a responsive website with..."
        })))
        .mount(&server)
        .await;

    let client = RewriteClient::new(format!("{}/v1/enhance", server.uri()));
    let response = client.rewrite(&request()).await.unwrap();
    assert!(response.success);
    assert_eq!(
        response.enhanced_text.as_deref(),
        Some("Build a responsive website with...")
    );
}

#[tokio::test]
async fn test_rewrite_sends_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "error": "quota"
        })))
        .mount(&server)
        .await;

    let client = RewriteClient::new(server.uri()).with_api_key(Some("secret".to_string()));
    let response = client.rewrite(&request()).await.unwrap();
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("quota"));
}

#[tokio::test]
async fn test_rewrite_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = RewriteClient::new(server.uri());
    let err = client.rewrite(&request()).await.unwrap_err();
    assert!(matches!(err, BridgeError::Remote(ref m) if m.contains("503")));
}

#[tokio::test]
async fn test_rewrite_stream_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "{\"chunk\":\"Hel\"}\n{\"chunk\":\"lo \"}\n{\"chunk\":\" world\"}\n{\"complete\":true}\n",
        ))
        .mount(&server)
        .await;

    let client = RewriteClient::new(server.uri());
    let stream = client.rewrite_stream(&request()).await.unwrap();
    let messages: Vec<_> = stream.collect().await;
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[3], StreamMessage::complete());
}
