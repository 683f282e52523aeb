use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::common::{ChatMessage, ChatSummary, OutgoingMessage, User};
use crate::error::{ClientError, ClientResult};

const CURRENT_USER_PATH: &str = "/bittalk-mes/current_user";
const CHATS_PATH: &str = "/bittalk-mes/";
const MESSAGES_PATH: &str = "/bittalk-mes/messages/";
const SEARCH_PATH: &str = "/auth/search/";

#[derive(Deserialize)]
struct CurrentUserEnvelope {
    user: User,
}

/// Stateless wrapper over the backend's REST endpoints. One call in, one result out.
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base: String,
    authenticated_search: bool,
}

impl RestClient {
    pub fn new(base: &str, authenticated_search: bool) -> Self {
        Self {
            http: Client::new(),
            base: base.trim_end_matches('/').to_string(),
            authenticated_search,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn authorize(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => builder.bearer_auth(token),
            None => {
                log::debug!("No bearer token stored; sending request without Authorization");
                builder
            }
        }
    }

    pub async fn current_user(&self, token: Option<&str>) -> ClientResult<User> {
        let request = Self::authorize(self.http.get(self.url(CURRENT_USER_PATH)), token);
        let envelope: CurrentUserEnvelope = decode(CURRENT_USER_PATH, request.send().await?).await?;
        Ok(envelope.user)
    }

    pub async fn chats(&self, token: Option<&str>) -> ClientResult<Vec<ChatSummary>> {
        let request = Self::authorize(self.http.get(self.url(CHATS_PATH)), token);
        decode(CHATS_PATH, request.send().await?).await
    }

    /// History of one chat, in the order the server returns it.
    pub async fn messages(
        &self,
        token: Option<&str>,
        chat_id: i64,
    ) -> ClientResult<Vec<ChatMessage>> {
        let path = format!("{MESSAGES_PATH}{chat_id}");
        let request = Self::authorize(self.http.get(self.url(&path)), token);
        decode(&path, request.send().await?).await
    }

    pub async fn send_message(
        &self,
        token: Option<&str>,
        message: &OutgoingMessage,
    ) -> ClientResult<ChatMessage> {
        let request = Self::authorize(self.http.post(self.url(MESSAGES_PATH)), token).json(message);
        decode(MESSAGES_PATH, request.send().await?).await
    }

    /// The token is only attached when `authenticated_search` is enabled.
    pub async fn search_users(&self, token: Option<&str>, query: &str) -> ClientResult<Vec<User>> {
        let mut request = self.http.get(self.url(SEARCH_PATH)).query(&[("query", query)]);
        if self.authenticated_search {
            request = Self::authorize(request, token);
        }
        decode(SEARCH_PATH, request.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> ClientResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status {
            endpoint: endpoint.to_string(),
            status,
        });
    }
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn current_user_unwraps_envelope_and_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CURRENT_USER_PATH))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"user": {"id": 3, "name": "Bob", "email": "b@x.io"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = RestClient::new(&server.uri(), false);
        let user = client.current_user(Some("secret")).await.unwrap();

        assert_eq!(user.id, 3);
        assert_eq!(user.email.as_deref(), Some("b@x.io"));
    }

    #[tokio::test]
    async fn non_ok_status_names_the_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bittalk-mes/messages/9"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = RestClient::new(&server.uri(), false);
        let err = client.messages(Some("t"), 9).await.unwrap_err();

        match err {
            ClientError::Status { endpoint, status } => {
                assert_eq!(endpoint, "/bittalk-mes/messages/9");
                assert_eq!(status.as_u16(), 401);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CHATS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = RestClient::new(&server.uri(), false);
        let err = client.chats(Some("t")).await.unwrap_err();

        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn send_posts_the_outgoing_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MESSAGES_PATH))
            .and(header("Authorization", "Bearer t"))
            .and(body_json(json!({
                "content": "hi",
                "chat_id": 2,
                "sender_id": 3,
                "recipient_id": 2
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 11, "chat_id": 2, "sender_id": 3, "recipient_id": 2, "content": "hi"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RestClient::new(&server.uri(), false);
        let outgoing = OutgoingMessage {
            content: "hi".into(),
            chat_id: 2,
            sender_id: 3,
            recipient_id: 2,
        };
        let stored = client.send_message(Some("t"), &outgoing).await.unwrap();

        assert_eq!(stored.id, 11);
    }

    #[tokio::test]
    async fn search_is_unauthenticated_unless_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .and(query_param("query", "ali"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": 4, "name": "Alice"}])),
            )
            .mount(&server)
            .await;

        let anonymous = RestClient::new(&server.uri(), false);
        anonymous.search_users(Some("t"), "ali").await.unwrap();
        let authenticated = RestClient::new(&server.uri(), true);
        let hits = authenticated.search_users(Some("t"), "ali").await.unwrap();
        assert_eq!(hits.len(), 1);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(!requests[0].headers.contains_key("authorization"));
        assert_eq!(requests[1].headers.get("authorization").unwrap(), "Bearer t");
    }

    #[tokio::test]
    async fn search_query_is_sent_as_typed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .and(query_param("query", " al "))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = RestClient::new(&server.uri(), false);
        let hits = client.search_users(None, " al ").await.unwrap();

        assert!(hits.is_empty());
    }
}
