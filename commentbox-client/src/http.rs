use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::api::{ApiResponse, Backend, Comment, CommentId, Error, NewComment, COMMENTS_PATH};

/// Talks to a comments server over its REST API
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    host: String,
}

impl HttpBackend {
    /// `host` is the server root, eg. `http://localhost:3001`
    pub fn new(host: impl Into<String>) -> HttpBackend {
        HttpBackend::with_client(reqwest::Client::new(), host)
    }

    pub fn with_client(client: reqwest::Client, host: impl Into<String>) -> HttpBackend {
        let mut host = host.into();
        while host.ends_with('/') {
            host.pop();
        }
        HttpBackend { client, host }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `{host}/api/comments`, followed by `last` as one escaped segment if any
    fn url(&self, last: Option<&str>) -> Result<reqwest::Url, Error> {
        let mut url = reqwest::Url::parse(&self.host)
            .map_err(|e| Error::transport(&format!("parsing host {:?}", self.host), e))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::new(format!("host {:?} cannot be a base url", self.host)))?;
            segments
                .pop_if_empty()
                .extend(COMMENTS_PATH.split('/').filter(|s| !s.is_empty()));
            if let Some(last) = last {
                segments.push(last);
            }
        }
        Ok(url)
    }

    async fn call<T>(&self, what: &str, req: reqwest::RequestBuilder) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
    {
        let resp = req
            .send()
            .await
            .map_err(|e| Error::transport(&format!("{what}: sending request"), e))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::transport(&format!("{what}: reading response"), e))?;
        match serde_json::from_slice::<ApiResponse<T>>(&body) {
            Ok(r) => r.into_result(),
            Err(_) if !status.is_success() => {
                Err(Error::new(format!("{what}: server answered {status}")))
            }
            Err(e) => Err(Error::transport(&format!("{what}: parsing response"), e)),
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list(&self) -> Result<Vec<Comment>, Error> {
        let req = self.client.get(self.url(Some(""))?);
        self.call("listing comments", req)
            .await?
            .ok_or_else(|| Error::new("listing comments: response carries no data"))
    }

    async fn create(&self, c: &NewComment) -> Result<Option<Comment>, Error> {
        let req = self
            .client
            .post(self.url(None)?)
            .json(c);
        self.call("creating comment", req).await
    }

    async fn update(&self, id: &CommentId, c: &NewComment) -> Result<Option<Comment>, Error> {
        let req = self
            .client
            .put(self.url(Some(id.as_str()))?)
            .json(c);
        self.call("updating comment", req).await
    }

    async fn delete(&self, id: &CommentId) -> Result<(), Error> {
        let req = self.client.delete(self.url(Some(id.as_str()))?);
        self.call::<serde_json::Value>("deleting comment", req)
            .await
            .map(|_| ())
    }
}
