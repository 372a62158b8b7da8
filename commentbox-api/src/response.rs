use crate::Error;

/// Envelope every endpoint answers with
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

/// The `error` field is either a bare message or an object carrying one
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum ErrorPayload {
    Message(String),
    Structured { message: String },
    Other(serde_json::Value),
}

impl ErrorPayload {
    pub fn message(&self) -> String {
        match self {
            ErrorPayload::Message(m) => m.clone(),
            ErrorPayload::Structured { message } => message.clone(),
            ErrorPayload::Other(v) => v.to_string(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn ok(data: Option<T>) -> ApiResponse<T> {
        ApiResponse {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failed(err: &Error) -> ApiResponse<T> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ErrorPayload::Message(String::from(err.message()))),
        }
    }

    pub fn into_result(self) -> Result<Option<T>, Error> {
        match (self.success, self.error) {
            (true, _) => Ok(self.data),
            (false, Some(e)) => Err(Error::new(e.message())),
            (false, None) => Err(Error::new("server reported a failure without a message")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Comment;

    fn parse(s: &str) -> Result<Option<serde_json::Value>, Error> {
        serde_json::from_str::<ApiResponse<serde_json::Value>>(s)
            .expect("parsing response")
            .into_result()
    }

    #[test]
    fn error_message_shapes() {
        assert_eq!(
            parse(r#"{"success": false, "error": "not found"}"#),
            Err(Error::new("not found")),
        );
        assert_eq!(
            parse(r#"{"success": false, "error": {"name": "ValidationError", "message": "bad author"}}"#),
            Err(Error::new("bad author")),
        );
        assert_eq!(
            parse(r#"{"success": false, "error": {"code": 11000}}"#),
            Err(Error::new(r#"{"code":11000}"#)),
        );
        assert!(parse(r#"{"success": false}"#).is_err());
    }

    #[test]
    fn success_without_data() {
        assert_eq!(parse(r#"{"success": true}"#), Ok(None));
    }

    #[test]
    fn success_without_record() {
        let resp: ApiResponse<Comment> =
            serde_json::from_str(r#"{"success":true}"#).expect("parsing bare success");
        assert_eq!(resp.into_result(), Ok(None));
    }

    #[test]
    fn list_payload() {
        let resp: ApiResponse<Vec<Comment>> = serde_json::from_str(
            r#"{"success": true, "data": [
                {"_id": "1", "author": "Bo", "text": "hi",
                 "createdAt": "2018-02-23T10:00:00Z", "updatedAt": "2018-02-23T10:00:00Z"}
            ]}"#,
        )
        .expect("parsing list");
        let list = resp.into_result().unwrap().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].author, "Bo");
    }
}
