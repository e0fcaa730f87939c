//! GET and POST against the mock transport.

mod common;

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use flate2::read::{DeflateDecoder, GzDecoder};
use pulith_rest::{
    CallOptions, ContentEncoding, Error, HeaderValue, JsonSerializerConfig, ReadMode,
    RestClient, TransferConfig, TransferResult,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use common::{Reply, TestHttpClient};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Widget {
    widget_id: u32,
    display_name: String,
    tags: Vec<String>,
}

fn widget() -> Widget {
    Widget {
        widget_id: 7,
        display_name: "sprocket".into(),
        tags: vec!["metal".into(), "small".into()],
    }
}

const WIDGET_JSON: &str = r#"{"widgetId":7,"displayName":"sprocket","tags":["metal","small"]}"#;

#[tokio::test]
async fn test_get_success_decodes_payload() {
    let client = TestHttpClient::new(Reply::json(200, WIDGET_JSON));
    let rest = RestClient::new(client.clone());

    let envelope = rest.get::<Widget>("/widgets/7", CallOptions::default()).await;

    assert_eq!(envelope.result(), TransferResult::Success);
    assert_eq!(envelope.status_code(), 200);
    assert!(envelope.error().is_none());
    assert_eq!(envelope.payload(), Some(&widget()));

    let sent = client.last();
    assert_eq!(sent.method.as_str(), "GET");
    assert_eq!(sent.path, "/widgets/7");
    assert_eq!(sent.mode, ReadMode::Buffered);
    assert!(sent.body.is_empty());
}

#[tokio::test]
async fn test_non_success_status_is_http_error_without_parsing() {
    let rest = RestClient::new(TestHttpClient::new(Reply::new(404, "<html>not found</html>")));

    let envelope = rest.get::<Widget>("/widgets/8", CallOptions::default()).await;

    assert_eq!(envelope.result(), TransferResult::HttpError);
    assert_eq!(envelope.status_code(), 404);
    assert!(envelope.payload().is_none());
    assert!(envelope.error().is_none());
}

#[tokio::test]
async fn test_undecodable_body_keeps_status() {
    let rest = RestClient::new(TestHttpClient::new(Reply::json(200, "{\"widgetId\":")));

    let envelope = rest.get::<Widget>("/widgets/7", CallOptions::default()).await;

    assert_eq!(envelope.result(), TransferResult::SerializeError);
    assert_eq!(envelope.status_code(), 200);
    assert!(matches!(
        envelope.error(),
        Some(Error::Serialize { status: 200, .. })
    ));
    assert!(envelope.payload().is_none());
}

#[tokio::test]
async fn test_transport_failure_is_request_error() {
    let rest = RestClient::new(TestHttpClient::refusing());

    let envelope = rest.get::<Widget>("/widgets/7", CallOptions::default()).await;

    assert_eq!(envelope.result(), TransferResult::RequestError);
    assert_eq!(envelope.status_code(), 0);
    assert!(matches!(envelope.error(), Some(Error::Request(_))));
}

#[tokio::test]
async fn test_cancelled_before_send() {
    let client = TestHttpClient::new(Reply::json(200, WIDGET_JSON));
    let rest = RestClient::new(client.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let envelope = rest
        .get::<Widget>("/widgets/7", CallOptions::default().cancel(cancel))
        .await;

    assert_eq!(envelope.result(), TransferResult::Cancelled);
    assert_eq!(envelope.status_code(), 0);
    assert!(client.recorded().is_empty());
}

#[tokio::test]
async fn test_cancelled_while_waiting_for_response() {
    let client = TestHttpClient::stalled();
    let rest = RestClient::new(client.clone());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let envelope = tokio::time::timeout(
        Duration::from_secs(5),
        rest.get::<Widget>("/widgets/7", CallOptions::default().cancel(cancel)),
    )
    .await
    .expect("cancellation ends the call");

    assert_eq!(envelope.result(), TransferResult::Cancelled);
    assert_eq!(envelope.status_code(), 0);
    assert!(matches!(envelope.error(), Some(Error::Cancelled)));
    assert_eq!(client.last().path, "/widgets/7");
}

#[tokio::test]
async fn test_headers_are_sent_in_order_with_repeats() {
    let client = TestHttpClient::new(Reply::json(200, WIDGET_JSON));
    let rest = RestClient::new(client.clone());

    let options = CallOptions::default()
        .header("Authorization", "Bearer abc")
        .header("Accept", vec!["application/json", "text/plain"])
        .header("X-Attempt", HeaderValue::display(3));
    rest.get::<Widget>("/widgets/7", options).await;

    assert_eq!(
        client.last().headers,
        vec![
            ("Authorization".to_string(), "Bearer abc".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "text/plain".to_string()),
            ("X-Attempt".to_string(), "3".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_post_sends_serialized_body() {
    let client = TestHttpClient::new(Reply::new(201, ""));
    let rest = RestClient::new(client.clone());

    let envelope = rest.post("/widgets", &widget(), CallOptions::default()).await;

    assert_eq!(envelope.result(), TransferResult::Success);
    assert_eq!(envelope.status_code(), 201);
    assert!(envelope.payload().is_none());

    let sent = client.last();
    assert_eq!(sent.method.as_str(), "POST");
    assert_eq!(sent.body_header("Content-Type"), Some("application/json"));
    assert_eq!(sent.body_header("Content-Encoding"), None);
    assert_eq!(sent.content_length, Some(sent.body.len() as u64));
    assert_eq!(serde_json::from_slice::<Widget>(&sent.body).unwrap(), widget());
}

#[tokio::test]
async fn test_post_for_decodes_response() {
    let rest = RestClient::new(TestHttpClient::new(Reply::json(200, WIDGET_JSON)));

    let envelope = rest
        .post_for::<_, Widget>("/widgets/search", &["sprocket"], CallOptions::default())
        .await;

    assert!(envelope.is_success());
    assert_eq!(envelope.into_payload(), Some(widget()));
}

#[tokio::test]
async fn test_post_http_error() {
    let rest = RestClient::new(TestHttpClient::new(Reply::new(409, "conflict")));

    let envelope = rest
        .post_for::<_, Widget>("/widgets", &widget(), CallOptions::default())
        .await;

    let (result, status, error, payload) = envelope.into_parts();
    assert_eq!(result, TransferResult::HttpError);
    assert_eq!(status, 409);
    assert!(error.is_none());
    assert!(payload.is_none());
}

#[tokio::test]
async fn test_unserializable_body_is_never_sent() {
    let client = TestHttpClient::new(Reply::new(200, ""));
    let rest = RestClient::new(client.clone());
    let mut body = HashMap::new();
    body.insert((1u8, 2u8), "tuple keys are not JSON object keys");

    let envelope = rest.post("/widgets", &body, CallOptions::default()).await;

    assert_eq!(envelope.result(), TransferResult::SerializeError);
    assert_eq!(envelope.status_code(), 0);
    assert!(client.recorded().is_empty());
}

#[tokio::test]
async fn test_compressed_post_gzip() {
    let client = TestHttpClient::new(Reply::new(200, ""));
    let rest = RestClient::new(client.clone());

    let envelope = rest
        .post("/widgets", &widget(), CallOptions::default().compress(true))
        .await;
    assert!(envelope.is_success());

    let sent = client.last();
    assert_eq!(sent.body_header("Content-Type"), Some("application/json"));
    assert_eq!(sent.body_header("Content-Encoding"), Some("gzip"));
    assert_eq!(sent.content_length, None);

    let mut decoded = String::new();
    GzDecoder::new(&sent.body[..])
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, WIDGET_JSON);
}

#[tokio::test]
async fn test_compressed_post_deflate_from_config() {
    let client = TestHttpClient::new(Reply::new(200, ""));
    let config = Arc::new(TransferConfig::default().with_encoding(ContentEncoding::Deflate));
    let rest = RestClient::with_config(client.clone(), config);

    rest.post("/widgets", &widget(), CallOptions::default().compress(true))
        .await;

    let sent = client.last();
    assert_eq!(sent.body_header("Content-Encoding"), Some("deflate"));
    let mut decoded = String::new();
    DeflateDecoder::new(&sent.body[..])
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, WIDGET_JSON);
}

#[tokio::test]
async fn test_encoding_none_ignores_compress_flag() {
    let client = TestHttpClient::new(Reply::new(200, ""));
    let config = Arc::new(TransferConfig::default().with_encoding(ContentEncoding::None));
    let rest = RestClient::with_config(client.clone(), config);

    rest.post("/widgets", &widget(), CallOptions::default().compress(true))
        .await;

    let sent = client.last();
    assert_eq!(sent.body_header("Content-Encoding"), None);
    assert_eq!(sent.body, WIDGET_JSON.as_bytes());
}

#[tokio::test]
async fn test_configured_serializer_sets_content_type() {
    let client = TestHttpClient::new(Reply::new(200, ""));
    let rest = RestClient::new(client.clone());
    let config = Arc::new(TransferConfig::default().use_json_serializer(
        JsonSerializerConfig::default()
            .content_type("application/vnd.widget+json")
            .pretty(true),
    ));

    rest.configured(config)
        .post("/widgets", &widget(), CallOptions::default())
        .await;

    let sent = client.last();
    assert_eq!(
        sent.body_header("Content-Type"),
        Some("application/vnd.widget+json")
    );
    assert!(String::from_utf8(sent.body).unwrap().contains('\n'));
}

#[tokio::test]
async fn test_classification_is_stable() {
    let rest = RestClient::new(TestHttpClient::refusing());
    let envelope = rest.get::<Widget>("/", CallOptions::default()).await;

    let error = envelope.error().unwrap();
    assert_eq!(error.classify(), error.classify());
    assert_eq!(error.classify(), envelope.result());
}
