use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};

use crate::error::TransportError;
use crate::image::DEFAULT_IMAGE_MIME;
use crate::models::{ChatReply, OutboundRequest};

const CHAT_PATH: &str = "/api/chat";

/// One request/response exchange with the assistant backend.
///
/// Implementations issue exactly one call per `send`; retrying is left to the user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<ChatReply, TransportError>;
}

/// Posts chat turns as multipart forms to `{base_url}/api/chat`.
pub struct HttpChatTransport {
    client: Client,
    endpoint: String,
}

impl HttpChatTransport {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{CHAT_PATH}", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn build_form(&self, request: &OutboundRequest) -> Result<Form, TransportError> {
        let mut form = Form::new().text("message", request.message.clone());

        if let Some(image) = &request.image {
            let path = image.local_path();
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| TransportError::Image {
                    path: path.display().to_string(),
                    source,
                })?;

            let part = Part::bytes(bytes).file_name(image.file_name().to_string());
            let mime = image.mime_type();
            // "image" alone is not a valid MIME type, so it goes in as a raw header.
            let part = if mime == DEFAULT_IMAGE_MIME {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_IMAGE_MIME));
                part.headers(headers)
            } else {
                part.mime_str(&mime)
                    .map_err(|source| TransportError::Request {
                        url: self.endpoint.clone(),
                        source,
                    })?
            };
            form = form.part("image", part);
        }

        Ok(form)
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<ChatReply, TransportError> {
        tracing::info!(
            endpoint = %self.endpoint,
            has_image = request.image.is_some(),
            "Sending chat message"
        );

        let form = self.build_form(request).await?;

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|source| {
                tracing::error!("Chat request to {} failed: {}", self.endpoint, source);
                TransportError::Request {
                    url: self.endpoint.clone(),
                    source,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Chat backend returned {}: {}", status, body);
            return Err(TransportError::Status { status, body });
        }

        response.json::<ChatReply>().await.map_err(|e| {
            tracing::error!("Failed to decode chat reply: {}", e);
            TransportError::Decode(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageReference;
    use axum::Router;
    use axum::extract::Multipart;
    use axum::http::StatusCode;
    use axum::routing::post;

    async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    // Echoes the received form fields back in the `response` text.
    async fn echo(mut multipart: Multipart) -> axum::Json<serde_json::Value> {
        let mut message = String::new();
        let mut image = String::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "message" => message = field.text().await.unwrap(),
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    let len = field.bytes().await.unwrap().len();
                    image = format!(" | image={file_name} type={content_type} bytes={len}");
                }
                _ => {}
            }
        }
        axum::Json(serde_json::json!({ "response": format!("echo: {message}{image}") }))
    }

    fn request(message: &str, image: Option<ImageReference>) -> OutboundRequest {
        OutboundRequest {
            message: message.to_string(),
            image,
        }
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let transport = HttpChatTransport::new("http://localhost:8000/");
        assert_eq!(transport.endpoint(), "http://localhost:8000/api/chat");
    }

    #[tokio::test]
    async fn test_send_text_only() {
        let base = spawn_backend(Router::new().route("/api/chat", post(echo))).await;
        let transport = HttpChatTransport::new(&base);

        let reply = transport.send(&request("hello", None)).await.unwrap();
        assert_eq!(reply.response, "echo: hello");
    }

    #[tokio::test]
    async fn test_send_with_image() {
        let base = spawn_backend(Router::new().route("/api/chat", post(echo))).await;
        let transport = HttpChatTransport::new(&base);

        let dir = std::env::temp_dir().join(format!("greenie-transport-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let photo = dir.join("leaf.png");
        std::fs::write(&photo, b"\x89PNG").unwrap();
        let image = ImageReference::new(format!("file://{}", photo.display()));

        let reply = transport
            .send(&request("what plant?", Some(image)))
            .await
            .unwrap();
        assert_eq!(
            reply.response,
            "echo: what plant? | image=leaf.png type=image/png bytes=4"
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    // Returns the raw multipart body, lower-cased, as the reply text.
    async fn raw_body(body: axum::body::Bytes) -> axum::Json<serde_json::Value> {
        let text = String::from_utf8_lossy(&body).to_lowercase();
        axum::Json(serde_json::json!({ "response": text }))
    }

    #[tokio::test]
    async fn test_unknown_extension_sent_as_bare_image_type() {
        let base = spawn_backend(Router::new().route("/api/chat", post(raw_body))).await;
        let transport = HttpChatTransport::new(&base);

        let dir = std::env::temp_dir().join(format!("greenie-transport-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let scan = dir.join("scan.tiff");
        std::fs::write(&scan, b"tiffdata").unwrap();
        let image = ImageReference::new(format!("file://{}", scan.display()));

        let reply = transport
            .send(&request("what is this?", Some(image)))
            .await
            .unwrap();
        assert!(reply.response.contains("filename=\"scan.tiff\""));
        assert!(reply.response.contains("content-type: image\r\n"));
        assert!(!reply.response.contains("content-type: image/"));
        assert!(reply.response.contains("tiffdata"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let router = Router::new().route(
            "/api/chat",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let transport = HttpChatTransport::new(&spawn_backend(router).await);

        match transport.send(&request("hi", None)).await {
            Err(TransportError::Status { status, body }) => {
                assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let router = Router::new().route("/api/chat", post(|| async { "not json" }));
        let transport = HttpChatTransport::new(&spawn_backend(router).await);

        let result = transport.send(&request("hi", None)).await;
        assert!(matches!(result, Err(TransportError::Decode(_))));
    }

    #[tokio::test]
    async fn test_wrong_reply_shape() {
        let router = Router::new().route(
            "/api/chat",
            post(|| async { axum::Json(serde_json::json!({ "answer": "hi" })) }),
        );
        let transport = HttpChatTransport::new(&spawn_backend(router).await);

        let result = transport.send(&request("hi", None)).await;
        assert!(matches!(result, Err(TransportError::Decode(_))));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpChatTransport::new(&format!("http://{addr}"));
        let result = transport.send(&request("hi", None)).await;
        assert!(matches!(result, Err(TransportError::Request { .. })));
    }

    #[tokio::test]
    async fn test_missing_image_file() {
        let transport = HttpChatTransport::new("http://127.0.0.1:9");
        let image = ImageReference::new("file:///definitely/not/here.jpg");

        let result = transport.send(&request("hi", Some(image))).await;
        assert!(matches!(result, Err(TransportError::Image { .. })));
    }
}
