use serde::{Deserialize, Serialize};

/// Separator the index cannot store inside field values / 会话 ID 分隔符
pub const SESSION_SEPARATOR: char = '-';

/// Width every stored or compared time string is padded to
pub const TIME_WIDTH: usize = 13;

/// A message owned by the host client / 消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Epoch milliseconds / 毫秒时间戳
    pub time: u64,
    pub session_id: String,
}

impl Message {
    pub fn new(
        id_client: impl Into<String>,
        text: impl Into<String>,
        time: u64,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            id_client: Some(id_client.into()),
            text: Some(text.into()),
            time,
            session_id: session_id.into(),
        }
    }

    /// Identifier, when the host assigned a non-empty one
    pub fn id(&self) -> Option<&str> {
        self.id_client.as_deref().filter(|id| !id.is_empty())
    }

    /// Both a non-empty text and an identifier are needed to index
    pub fn is_indexable(&self) -> bool {
        self.id().is_some() && self.text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// One (message, token) pair stored in the index / 索引条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEntry {
    pub id: String,
    pub token: String,
    /// Padded to `TIME_WIDTH` digits
    pub time: String,
    /// Normalized with `normalize_session_id`
    pub session_id: String,
}

impl TokenEntry {
    pub fn new(id: &str, token: String, time: u64, session_id: &str) -> Self {
        Self {
            id: id.to_string(),
            token,
            time: pad_time(time),
            session_id: normalize_session_id(session_id),
        }
    }
}

/// Drops the first separator only, e.g. `p2p-alice` -> `p2palice`.
///
/// Ids with several separators keep all but the first one. Indexing and
/// querying share this function, so scoping still matches.
pub fn normalize_session_id(session_id: &str) -> String {
    session_id.replacen(SESSION_SEPARATOR, "", 1)
}

/// Left-pads with zeros so lexicographic order equals numeric order.
/// Values longer than the width are kept as they are.
pub fn pad_time(time: u64) -> String {
    format!("{:0width$}", time, width = TIME_WIDTH)
}

/// Sort direction on the time field / 时间排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "ascend")]
    Ascending,
    #[serde(alias = "descend")]
    Descending,
}

/// How multiple terms of one kind combine / 逻辑关系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logic {
    And,
    Or,
}

fn default_limit() -> usize {
    100
}

fn default_text_logic() -> Logic {
    Logic::And
}

fn default_session_logic() -> Logic {
    Logic::Or
}

/// Structured query / 查询参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    pub text: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
    #[serde(default = "default_text_logic")]
    pub text_logic: Logic,
    /// AND across distinct sessions can never match: a message has one session
    #[serde(default = "default_session_logic")]
    pub session_id_logic: Logic,
}

impl QueryParams {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: default_limit(),
            session_ids: None,
            time_direction: None,
            start: None,
            end: None,
            text_logic: default_text_logic(),
            session_id_logic: default_session_logic(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_sessions<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.session_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.time_direction = Some(direction);
        self
    }

    pub fn with_start(mut self, start: u64) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: u64) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_text_logic(mut self, logic: Logic) -> Self {
        self.text_logic = logic;
        self
    }

    pub fn with_session_logic(mut self, logic: Logic) -> Self {
        self.session_id_logic = logic;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_time_is_monotonic() {
        let samples = [
            0u64,
            1,
            9,
            10,
            99,
            12_345,
            999_999_999,
            1_000_000_000,
            1_620_000_000_000,
            1_620_000_005_000,
            9_999_999_999_999,
        ];
        for pair in samples.windows(2) {
            let (a, b) = (pad_time(pair[0]), pad_time(pair[1]));
            assert_eq!(a.len(), TIME_WIDTH);
            assert!(a < b, "{} should sort before {}", a, b);
        }
        assert_eq!(pad_time(42), "0000000000042");
    }

    #[test]
    fn test_normalize_session_id() {
        assert_eq!(normalize_session_id("p2p-alice"), "p2palice");
        assert_eq!(normalize_session_id("p2palice"), "p2palice");
        // only the first separator goes
        assert_eq!(normalize_session_id("team-a-b"), "teama-b");
    }

    #[test]
    fn test_indexable() {
        assert!(Message::new("m1", "hi", 1, "p2p-a").is_indexable());

        let mut no_text = Message::new("m1", "", 1, "p2p-a");
        assert!(!no_text.is_indexable());
        no_text.text = None;
        assert!(!no_text.is_indexable());

        let mut no_id = Message::new("", "hi", 1, "p2p-a");
        assert!(!no_id.is_indexable());
        no_id.id_client = None;
        assert!(!no_id.is_indexable());
    }

    #[test]
    fn test_query_params_defaults() {
        let params: QueryParams = serde_json::from_str(r#"{"text":"hello"}"#).unwrap();
        assert_eq!(params, QueryParams::new("hello"));
        assert_eq!(params.limit, 100);
        assert_eq!(params.text_logic, Logic::And);
        assert_eq!(params.session_id_logic, Logic::Or);

        let params: QueryParams =
            serde_json::from_str(r#"{"text":"x","timeDirection":"descend","sessionIdLogic":"and"}"#)
                .unwrap();
        assert_eq!(params.time_direction, Some(Direction::Descending));
        assert_eq!(params.session_id_logic, Logic::And);
    }
}
