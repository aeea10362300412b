//! Response envelopes
//!
//! Every response carries a numeric result code and an info string; callers
//! branch on the code. `code / 1000` is the HTTP status class the transport
//! layer answers with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-checkable result code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum ResultCode {
    ExecuteSuccess,
    NoNeedUpdate,
    InvalidParameter,
    InvalidRuleVersion,
    VersionNotEditable,
    BatchSizeOverLimit,
    EmptyRequest,
    Unauthorized,
    NotFoundResource,
    NotFoundService,
    RequestTimeout,
    ExistedResource,
    ReleaseInUse,
    ExecuteException,
}

impl ResultCode {
    pub const fn code(self) -> u32 {
        match self {
            ResultCode::ExecuteSuccess => 200000,
            ResultCode::NoNeedUpdate => 200001,
            ResultCode::InvalidParameter => 400000,
            ResultCode::InvalidRuleVersion => 400001,
            ResultCode::VersionNotEditable => 400002,
            ResultCode::BatchSizeOverLimit => 400003,
            ResultCode::EmptyRequest => 400004,
            ResultCode::Unauthorized => 401000,
            ResultCode::NotFoundResource => 404000,
            ResultCode::NotFoundService => 404001,
            ResultCode::RequestTimeout => 408000,
            ResultCode::ExistedResource => 409000,
            ResultCode::ReleaseInUse => 409001,
            ResultCode::ExecuteException => 500000,
        }
    }

    /// HTTP status the transport should answer with
    pub const fn http_status(self) -> u16 {
        (self.code() / 1000) as u16
    }

    pub const fn is_success(self) -> bool {
        self.code() / 1000 == 200
    }

    /// Default info string
    pub fn info(self) -> &'static str {
        match self {
            ResultCode::ExecuteSuccess => "execute success",
            ResultCode::NoNeedUpdate => "no need to update",
            ResultCode::InvalidParameter => "invalid parameter",
            ResultCode::InvalidRuleVersion => "invalid circuit breaker version",
            ResultCode::VersionNotEditable => "only the master version may be edited",
            ResultCode::BatchSizeOverLimit => "batch size over the limit",
            ResultCode::EmptyRequest => "empty request",
            ResultCode::Unauthorized => "token does not match",
            ResultCode::NotFoundResource => "not found resource",
            ResultCode::NotFoundService => "not found service",
            ResultCode::RequestTimeout => "request timeout",
            ResultCode::ExistedResource => "existed resource",
            ResultCode::ReleaseInUse => "circuit breaker version is released",
            ResultCode::ExecuteException => "execute exception",
        }
    }

    const ALL: [ResultCode; 14] = [
        ResultCode::ExecuteSuccess,
        ResultCode::NoNeedUpdate,
        ResultCode::InvalidParameter,
        ResultCode::InvalidRuleVersion,
        ResultCode::VersionNotEditable,
        ResultCode::BatchSizeOverLimit,
        ResultCode::EmptyRequest,
        ResultCode::Unauthorized,
        ResultCode::NotFoundResource,
        ResultCode::NotFoundService,
        ResultCode::RequestTimeout,
        ResultCode::ExistedResource,
        ResultCode::ReleaseInUse,
        ResultCode::ExecuteException,
    ];
}

impl From<ResultCode> for u32 {
    fn from(code: ResultCode) -> Self {
        code.code()
    }
}

impl TryFrom<u32> for ResultCode {
    type Error = String;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        ResultCode::ALL
            .into_iter()
            .find(|code| code.code() == raw)
            .ok_or_else(|| format!("unknown result code {}", raw))
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Single-item response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: ResultCode,
    pub info: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn new(code: ResultCode, data: Option<T>) -> Self {
        Self {
            code,
            info: code.info().to_string(),
            data,
        }
    }

    pub fn success(data: T) -> Self {
        Self::new(ResultCode::ExecuteSuccess, Some(data))
    }

    pub fn error(code: ResultCode, info: impl Into<String>) -> Self {
        Self {
            code,
            info: info.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

/// Response to a batch write
///
/// `code` is the first failing item's code, or success when every item
/// succeeded (`NoNeedUpdate` when every item was a no-op update).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse<T> {
    pub code: ResultCode,
    pub info: String,
    pub size: usize,
    pub responses: Vec<ApiResponse<T>>,
}

impl<T> BatchResponse<T> {
    /// Fold item responses into a batch envelope
    pub fn from_items(responses: Vec<ApiResponse<T>>) -> Self {
        let code = responses
            .iter()
            .map(|item| item.code)
            .find(|code| !code.is_success())
            .unwrap_or_else(|| {
                if !responses.is_empty()
                    && responses
                        .iter()
                        .all(|item| item.code == ResultCode::NoNeedUpdate)
                {
                    ResultCode::NoNeedUpdate
                } else {
                    ResultCode::ExecuteSuccess
                }
            });

        Self {
            code,
            info: code.info().to_string(),
            size: responses.len(),
            responses,
        }
    }

    /// Reject the whole batch without touching any item
    pub fn rejected(code: ResultCode, info: impl Into<String>) -> Self {
        Self {
            code,
            info: info.into(),
            size: 0,
            responses: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

/// Response to a read query
///
/// `amount` is the total number of matches, `size` the length of `items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse<T> {
    pub code: ResultCode,
    pub info: String,
    pub amount: usize,
    pub size: usize,
    pub items: Vec<T>,
}

impl<T> QueryResponse<T> {
    pub fn page(amount: usize, items: Vec<T>) -> Self {
        Self {
            code: ResultCode::ExecuteSuccess,
            info: ResultCode::ExecuteSuccess.info().to_string(),
            amount,
            size: items.len(),
            items,
        }
    }

    pub fn error(code: ResultCode, info: impl Into<String>) -> Self {
        Self {
            code,
            info: info.into(),
            amount: 0,
            size: 0,
            items: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for code in ResultCode::ALL {
            assert_eq!(ResultCode::try_from(code.code()), Ok(code));
        }
        assert!(ResultCode::try_from(123).is_err());
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ResultCode::ExecuteSuccess.http_status(), 200);
        assert_eq!(ResultCode::NoNeedUpdate.http_status(), 200);
        assert_eq!(ResultCode::Unauthorized.http_status(), 401);
        assert_eq!(ResultCode::ReleaseInUse.http_status(), 409);
        assert_eq!(ResultCode::ExecuteException.http_status(), 500);
    }

    #[test]
    fn test_serializes_as_number() {
        let response: ApiResponse<()> = ApiResponse::error(ResultCode::NotFoundResource, "missing");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["code"], 404000);
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_batch_code_is_first_failure() {
        let batch = BatchResponse::<u8>::from_items(vec![
            ApiResponse::success(1),
            ApiResponse::error(ResultCode::Unauthorized, "bad token"),
            ApiResponse::error(ResultCode::NotFoundResource, "missing"),
        ]);
        assert_eq!(batch.code, ResultCode::Unauthorized);
        assert_eq!(batch.size, 3);
    }

    #[test]
    fn test_batch_all_no_change() {
        let batch = BatchResponse::<u8>::from_items(vec![
            ApiResponse::new(ResultCode::NoNeedUpdate, None),
            ApiResponse::new(ResultCode::NoNeedUpdate, None),
        ]);
        assert_eq!(batch.code, ResultCode::NoNeedUpdate);

        let mixed = BatchResponse::<u8>::from_items(vec![
            ApiResponse::new(ResultCode::NoNeedUpdate, None),
            ApiResponse::success(1),
        ]);
        assert_eq!(mixed.code, ResultCode::ExecuteSuccess);
    }

    #[test]
    fn test_batch_decodes_payload_without_default() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Key {
            id: String,
        }

        let json = r#"{
            "code": 400000,
            "info": "invalid parameter",
            "size": 2,
            "responses": [
                { "code": 200000, "info": "execute success", "data": { "id": "a" } },
                { "code": 400000, "info": "invalid parameter" }
            ]
        }"#;
        let batch: BatchResponse<Key> = serde_json::from_str(json).unwrap();

        assert_eq!(batch.code, ResultCode::InvalidParameter);
        assert_eq!(batch.responses[0].data, Some(Key { id: "a".to_string() }));
        assert_eq!(batch.responses[1].data, None);
    }
}
