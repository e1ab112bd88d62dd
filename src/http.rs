use bytes::Bytes;
use http::header::{HeaderValue, USER_AGENT};
use http::{Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper_rustls::{ConfigBuilderExt, HttpsConnector};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use rustls::ClientConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to load native root certificates: {0}")]
    NativeCerts(#[from] std::io::Error),
    #[error("Failed to make HTTP(S) request: {0}")]
    CallRequest(#[from] hyper_util::client::legacy::Error),
    #[error("Failed to read response body: {0}")]
    ReadIncoming(#[from] hyper::Error),
    #[error("Failed to build HTTP request: {0}")]
    BuildRequest(#[from] http::Error),
}

/// A plain HTTPS-capable client. The underlying connection pool is
/// shared by clones and lives for the whole process.
#[derive(Clone)]
pub struct HttpClient {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    user_agent: HeaderValue,
}

impl HttpClient {
    pub fn new() -> Result<Self, HttpError> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);

        let config = ClientConfig::builder()
            .with_native_roots()?
            .with_no_client_auth();
        let https = HttpsConnector::from((http, config));

        let client = Client::builder(TokioExecutor::new()).build(https);
        let user_agent = HeaderValue::from_str(&format!("remna-sd/{}", crate::get_version()))
            .expect("Invalid header value for version!");

        Ok(HttpClient { client, user_agent })
    }

    pub async fn send(
        &self,
        mut req: Request<Full<Bytes>>,
    ) -> Result<Response<Incoming>, HttpError> {
        if !req.headers().contains_key(USER_AGENT) {
            req.headers_mut()
                .insert(USER_AGENT, self.user_agent.clone());
        }

        self.client.request(req).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use http::Method;
    use http_body_util::BodyExt;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper_util::rt::TokioIo;
    use tokio::net::TcpListener;

    // echo the user agent back so the client side can assert on it
    async fn handle(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let agent = req
            .headers()
            .get(USER_AGENT)
            .cloned()
            .unwrap_or(HeaderValue::from_static(""));

        Ok(Response::new(Full::from(agent.as_bytes().to_vec())))
    }

    #[tokio::test]
    async fn user_agent_is_set() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (conn, _peer) = listener.accept().await.unwrap();

            http1::Builder::new()
                .serve_connection(TokioIo::new(conn), service_fn(handle))
                .await
                .unwrap()
        });

        let client = HttpClient::new().unwrap();
        let req = Request::builder()
            .method(Method::GET)
            .uri(format!("http://{}", addr))
            .body(Full::default())
            .unwrap();

        let resp = client.send(req).await.unwrap();
        assert!(resp.status().is_success());

        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, format!("remna-sd/{}", crate::get_version()));
    }

    #[tokio::test]
    async fn connect_error() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        // nothing is listening on addr anymore
        let client = HttpClient::new().unwrap();
        let req = Request::builder()
            .method(Method::GET)
            .uri(format!("http://{}", addr))
            .body(Full::default())
            .unwrap();

        assert!(matches!(
            client.send(req).await,
            Err(HttpError::CallRequest(_))
        ));
    }
}
