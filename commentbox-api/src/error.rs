use anyhow::Context;

/// Failure of a single operation, with the message the user gets to see
///
/// Server-side refusals and transport failures both end up here: the widget
/// has nothing to do with the distinction besides showing the message.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    message: String,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Error {
        Error {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_message(self) -> String {
        self.message
    }

    /// Wrap a transport-level failure, keeping its error chain in the message
    pub fn transport(context: &str, err: impl std::fmt::Display) -> Error {
        Error::new(format!("{context}: {err}"))
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&crate::ApiResponse::<()>::failed(self)).expect("serializing error")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let resp: crate::ApiResponse<serde_json::Value> =
            serde_json::from_slice(body).context("parsing error contents")?;
        match resp.into_result() {
            Ok(_) => Err(anyhow::anyhow!("error contents is a success response")),
            Err(e) => Ok(e),
        }
    }
}
