use std::env;
use std::time::Duration;

use futures::stream::{Stream, StreamExt};
use reqwest::Client as ReqwestClient;
use reqwest::header::{self, HeaderMap, HeaderValue};
use url::Url;

use crate::error::{Error, Result};
use crate::hooks::ExchangeHooks;
use crate::observability::{CLIENT_EXCHANGES, CLIENT_EXCHANGE_FAILURES};
use crate::sse::{StreamEvent, process_sse};
use crate::types::{CompletionRequest, Message};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";

/// Bound on the connect/response-headers phase of an exchange.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline spanning the whole exchange, streaming included. The
/// original bounded only the header phase and could hang forever on a
/// stalled body; here one deadline covers every read.
const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(300);

/// The result of one streaming exchange.
///
/// Failures are part of the outcome rather than an `Err` return: the
/// engine performs exactly one exchange attempt per call, reports the
/// failure through the error hook, and hands the caller the tagged
/// outcome to act on. History is only ever committed from `Completed`.
#[derive(Debug, Clone)]
pub enum ExchangeOutcome {
    /// The stream ended cleanly; carries the accumulated assistant reply.
    Completed(Message),

    /// The exchange did not complete; carries the failure.
    Failed(Error),
}

impl ExchangeOutcome {
    /// Returns true if the exchange completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, ExchangeOutcome::Completed(_))
    }

    /// The assistant reply, if the exchange completed.
    pub fn message(&self) -> Option<&Message> {
        match self {
            ExchangeOutcome::Completed(message) => Some(message),
            ExchangeOutcome::Failed(_) => None,
        }
    }

    /// The failure, if the exchange did not complete.
    pub fn error(&self) -> Option<&Error> {
        match self {
            ExchangeOutcome::Completed(_) => None,
            ExchangeOutcome::Failed(error) => Some(error),
        }
    }
}

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAi {
    credential: String,
    client: ReqwestClient,
    base_url: String,
}

impl OpenAi {
    /// Create a new client.
    ///
    /// The credential can be provided directly or read from the
    /// PARLEY_API_KEY environment variable.
    pub fn new(credential: Option<String>) -> Result<Self> {
        Self::with_options(credential, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        credential: Option<String>,
        base_url: Option<String>,
        exchange_timeout: Option<Duration>,
    ) -> Result<Self> {
        let credential = match credential {
            Some(credential) => credential,
            None => env::var("PARLEY_API_KEY").map_err(|_| {
                Error::validation(
                    "credential not provided and PARLEY_API_KEY environment variable not set",
                    Some("credential".to_string()),
                )
            })?,
        };

        let client = ReqwestClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(exchange_timeout.unwrap_or(DEFAULT_EXCHANGE_TIMEOUT))
            .build()
            .map_err(|e| {
                Error::transport(
                    format!("failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            credential,
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    /// Perform one streaming exchange.
    ///
    /// Constructs the request, transmits it, validates the status, and
    /// stream-parses the response, delivering role announcements and
    /// content fragments through `hooks` as they arrive. On any failure
    /// the error hook fires exactly once and the outcome carries the same
    /// failure; nothing is retried and no caller state is touched.
    pub async fn execute(
        &self,
        request: CompletionRequest,
        hooks: &mut dyn ExchangeHooks,
    ) -> ExchangeOutcome {
        CLIENT_EXCHANGES.click();
        match self.try_execute(request, hooks).await {
            Ok(message) => ExchangeOutcome::Completed(message),
            Err(error) => {
                CLIENT_EXCHANGE_FAILURES.click();
                hooks.on_error(&error);
                ExchangeOutcome::Failed(error)
            }
        }
    }

    async fn try_execute(
        &self,
        request: CompletionRequest,
        hooks: &mut dyn ExchangeHooks,
    ) -> Result<Message> {
        // Construct
        let url = self.endpoint()?;
        let headers = self.headers()?;
        let body = serde_json::to_vec(&request)
            .map_err(|e| Error::construction(format!("failed to encode request body: {e}")))?;

        // Transmit
        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::transport(format!("request timed out: {e}"), Some(Box::new(e)))
                } else if e.is_connect() {
                    Error::transport(format!("connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::transport(format!("request failed: {e}"), Some(Box::new(e)))
                }
            })?;

        // Validate status; the body is not read on this path
        let status = response.status();
        if !status.is_success() {
            let reason = status
                .canonical_reason()
                .map(String::from)
                .unwrap_or_else(|| status.as_str().to_string());
            return Err(Error::http_status(status.as_u16(), reason));
        }

        // Stream-parse
        let events = process_sse(response.bytes_stream());
        drain_events(events, hooks).await
    }

    fn endpoint(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .and_then(|base| base.join("chat/completions"))
            .map_err(|e| Error::construction(format!("invalid endpoint URL: {e}")))
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.credential))
            .map_err(|_| Error::construction("credential is not a valid header value"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }
}

/// Consume the event stream, delivering deltas through the hooks and
/// accumulating the assistant reply.
///
/// The first error item aborts the drain: no further lines are read and
/// any accumulated content is discarded with the `Err` return. Role
/// announcements fire the role hook once per observed role value.
async fn drain_events<S>(events: S, hooks: &mut dyn ExchangeHooks) -> Result<Message>
where
    S: Stream<Item = Result<StreamEvent>>,
{
    let mut events = std::pin::pin!(events);
    let mut content = String::new();
    let mut last_role: Option<String> = None;

    while let Some(event) = events.next().await {
        match event? {
            StreamEvent::Done => break,
            StreamEvent::Chunk(chunk) => {
                let Some(payload) = chunk.first_payload() else {
                    continue;
                };
                if let Some(role) = payload.role.as_deref() {
                    if !role.is_empty() && last_role.as_deref() != Some(role) {
                        hooks.on_role_changed(role);
                        last_role = Some(role.to_string());
                    }
                }
                if let Some(fragment) = payload.content.as_deref() {
                    hooks.on_token(fragment);
                    content.push_str(fragment);
                }
            }
        }
    }

    // The accumulated reply is a single logical line
    content.retain(|c| c != '\n' && c != '\r');
    Ok(Message::assistant(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookFns;
    use bytes::Bytes;
    use futures::stream;

    fn byte_stream(
        data: &'static [u8],
    ) -> impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static {
        Box::pin(stream::once(async move { Ok(Bytes::from(data)) }))
    }

    #[test]
    fn client_creation() {
        let client = OpenAi::new(Some("test-key".to_string())).unwrap();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);

        let client = OpenAi::with_options(
            Some("test-key".to_string()),
            Some("https://example.com/v1/".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://example.com/v1/");
    }

    #[test]
    fn endpoint_joins_base_url() {
        let client = OpenAi::with_options(
            Some("k".to_string()),
            Some("https://example.com/v1/".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "https://example.com/v1/chat/completions"
        );
    }

    #[test]
    fn bad_base_url_is_a_construction_error() {
        let client = OpenAi::with_options(
            Some("k".to_string()),
            Some("not a url".to_string()),
            None,
        )
        .unwrap();
        assert!(client.endpoint().unwrap_err().is_construction());
    }

    #[test]
    fn credential_with_newline_is_a_construction_error() {
        let client = OpenAi::new(Some("bad\nkey".to_string())).unwrap();
        assert!(client.headers().unwrap_err().is_construction());
    }

    #[tokio::test]
    async fn drain_accumulates_tokens_in_order() {
        let mut roles = Vec::new();
        let mut tokens = Vec::new();
        let mut hooks = HookFns::new(
            |role: &str| roles.push(role.to_string()),
            |token: &str| tokens.push(token.to_string()),
            |_: &Error| {},
        );

        let events = process_sse(byte_stream(
            b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\
              data: [DONE]\n",
        ));
        let message = drain_events(events, &mut hooks).await.unwrap();

        assert_eq!(message.content, "Hello");
        assert_eq!(message.role, crate::types::Role::Assistant);
        assert_eq!(roles, vec!["assistant"]);
        assert_eq!(tokens, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn drain_dedupes_repeated_role_announcements() {
        let mut roles = Vec::new();
        let mut hooks = HookFns::new(
            |role: &str| roles.push(role.to_string()),
            |_: &str| {},
            |_: &Error| {},
        );

        let events = process_sse(byte_stream(
            b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"a\"}}]}\n\
              data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"b\"}}]}\n\
              data: [DONE]\n",
        ));
        drain_events(events, &mut hooks).await.unwrap();

        assert_eq!(roles, vec!["assistant"]);
    }

    #[tokio::test]
    async fn drain_discards_partial_content_on_parse_failure() {
        let mut tokens = Vec::new();
        let mut hooks = HookFns::new(
            |_: &str| {},
            |token: &str| tokens.push(token.to_string()),
            |_: &Error| {},
        );

        let events = process_sse(byte_stream(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\
              data: {garbage}\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
        ));
        let result = drain_events(events, &mut hooks).await;

        // The valid token was delivered before the failure, but the
        // outcome carries no partial reply.
        assert_eq!(tokens, vec!["Hel"]);
        assert!(result.unwrap_err().is_stream_parse());
    }

    #[tokio::test]
    async fn drain_strips_line_endings_from_final_content() {
        let mut hooks = crate::hooks::NullHooks;
        let events = process_sse(byte_stream(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"one\\ntwo\\r\\n\"}}]}\n\
              data: [DONE]\n",
        ));
        let message = drain_events(events, &mut hooks).await.unwrap();
        assert_eq!(message.content, "onetwo");
    }

    #[tokio::test]
    async fn drain_handles_end_of_stream_without_sentinel() {
        let mut hooks = crate::hooks::NullHooks;
        let events = process_sse(byte_stream(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"done\"}}]}\n",
        ));
        let message = drain_events(events, &mut hooks).await.unwrap();
        assert_eq!(message.content, "done");
    }

    #[test]
    fn outcome_accessors() {
        let completed = ExchangeOutcome::Completed(Message::assistant("hi"));
        assert!(completed.is_completed());
        assert_eq!(completed.message().unwrap().content, "hi");
        assert!(completed.error().is_none());

        let failed = ExchangeOutcome::Failed(Error::http_status(401, "Unauthorized"));
        assert!(!failed.is_completed());
        assert!(failed.message().is_none());
        assert_eq!(failed.error().unwrap().status_code(), Some(401));
    }
}
