//! Query translation / 查询转换
//!
//! Turns `QueryParams` into the clause list + paging/sort options that index
//! stores evaluate. Clauses are conjunctive; `Any` is a disjunction.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::tokenizer::Tokenizer;
use crate::models::{normalize_session_id, pad_time, Direction, Logic, QueryParams};

/// Indexed field / 索引字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "idx")]
    Token,
    #[serde(rename = "sessionId")]
    SessionId,
    #[serde(rename = "time")]
    Time,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Token => "idx",
            Field::SessionId => "sessionId",
            Field::Time => "time",
        }
    }
}

/// Exact match of one field value, rendered as `field:value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub field: Field,
    pub value: String,
}

impl FieldMatch {
    pub fn token(value: impl Into<String>) -> Self {
        Self {
            field: Field::Token,
            value: value.into(),
        }
    }

    pub fn session(value: impl Into<String>) -> Self {
        Self {
            field: Field::SessionId,
            value: value.into(),
        }
    }
}

impl fmt::Display for FieldMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field.as_str(), self.value)
    }
}

/// Inclusive bounds, compared as padded strings / 范围条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeClause {
    pub field: Field,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
}

impl RangeClause {
    pub fn contains(&self, value: &str) -> bool {
        self.gte.as_deref().map_or(true, |low| value >= low)
            && self.lte.as_deref().map_or(true, |high| value <= high)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Clause {
    /// Mandatory match
    Match(FieldMatch),
    /// At least one must match; empty never matches
    Any(Vec<FieldMatch>),
    Range(RangeClause),
}

impl Clause {
    pub fn nothing() -> Self {
        Clause::Any(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

impl Page {
    pub fn offset(&self) -> usize {
        self.number.saturating_mul(self.size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub direction: Direction,
    pub field: Field,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub page: Page,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
}

/// Translated query / 转换后的查询
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub search: Vec<Clause>,
    pub options: QueryOptions,
}

/// Translate structured parameters / 转换查询参数
pub fn translate(params: &QueryParams, tokenizer: &Tokenizer) -> Query {
    let tokens = tokenizer.tokenize(&params.text);

    let mut search = Vec::new();
    if tokens.is_empty() {
        search.push(Clause::nothing());
    } else {
        match params.text_logic {
            Logic::And => {
                search.extend(tokens.into_iter().map(|t| Clause::Match(FieldMatch::token(t))))
            }
            Logic::Or => {
                let any = tokens.into_iter().map(FieldMatch::token).collect();
                search.push(Clause::Any(any));
            }
        }
    }

    if let Some(ids) = params.session_ids.as_ref().filter(|ids| !ids.is_empty()) {
        let sessions = ids.iter().map(|id| FieldMatch::session(normalize_session_id(id)));
        match params.session_id_logic {
            Logic::Or => search.push(Clause::Any(sessions.collect())),
            Logic::And => search.extend(sessions.map(Clause::Match)),
        }
    }

    let mut sort = None;
    if params.start.is_some() || params.end.is_some() || params.time_direction.is_some() {
        search.push(Clause::Range(RangeClause {
            field: Field::Time,
            gte: params.start.map(pad_time),
            lte: params.end.map(pad_time),
        }));
        sort = params.time_direction.map(|direction| Sort {
            direction,
            field: Field::Time,
        });
    }

    Query {
        search,
        options: QueryOptions {
            page: Page {
                number: 0,
                size: params.limit,
            },
            sort,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_IGNORE_CHARS;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new(DEFAULT_IGNORE_CHARS)
    }

    #[test]
    fn test_text_and() {
        let query = translate(&QueryParams::new("hello world"), &tokenizer());
        assert_eq!(
            query.search,
            vec![
                Clause::Match(FieldMatch::token("hello")),
                Clause::Match(FieldMatch::token("world")),
            ]
        );
        assert_eq!(
            query.options.page,
            Page {
                number: 0,
                size: 100
            }
        );
        assert_eq!(query.options.sort, None);
    }

    #[test]
    fn test_text_or() {
        let params = QueryParams::new("hello world").with_text_logic(Logic::Or);
        let query = translate(&params, &tokenizer());
        assert_eq!(
            query.search,
            vec![Clause::Any(vec![FieldMatch::token("hello"), FieldMatch::token("world")])]
        );
    }

    #[test]
    fn test_ignorable_text_matches_nothing() {
        let query = translate(&QueryParams::new("，。 "), &tokenizer());
        assert_eq!(query.search, vec![Clause::nothing()]);
    }

    #[test]
    fn test_sessions_are_normalized() {
        let params = QueryParams::new("hello").with_sessions(["p2p-alice", "team-42"]);
        let query = translate(&params, &tokenizer());
        assert_eq!(
            query.search[1],
            Clause::Any(vec![FieldMatch::session("p2palice"), FieldMatch::session("team42")])
        );

        let params = params.with_session_logic(Logic::And);
        let query = translate(&params, &tokenizer());
        assert_eq!(query.search[1], Clause::Match(FieldMatch::session("p2palice")));
        assert_eq!(query.search[2], Clause::Match(FieldMatch::session("team42")));
    }

    #[test]
    fn test_empty_session_list_is_ignored() {
        let params = QueryParams::new("hello").with_sessions(Vec::<String>::new());
        assert_eq!(translate(&params, &tokenizer()).search.len(), 1);
    }

    #[test]
    fn test_time_range_and_sort() {
        let params = QueryParams::new("hello")
            .with_start(1_620_000_003_000)
            .with_direction(Direction::Descending)
            .with_limit(20);
        let query = translate(&params, &tokenizer());
        assert_eq!(
            query.search.last(),
            Some(&Clause::Range(RangeClause {
                field: Field::Time,
                gte: Some("1620000003000".to_string()),
                lte: None,
            }))
        );
        assert_eq!(
            query.options.sort,
            Some(Sort {
                direction: Direction::Descending,
                field: Field::Time
            })
        );
        assert_eq!(query.options.page.size, 20);
    }

    #[test]
    fn test_direction_alone_adds_open_range() {
        let params = QueryParams::new("hello").with_direction(Direction::Ascending);
        let query = translate(&params, &tokenizer());
        assert_eq!(
            query.search.last(),
            Some(&Clause::Range(RangeClause {
                field: Field::Time,
                gte: None,
                lte: None
            }))
        );
    }

    #[test]
    fn test_small_bounds_are_padded() {
        let params = QueryParams::new("hello").with_start(5).with_end(42);
        let query = translate(&params, &tokenizer());
        let Some(Clause::Range(range)) = query.search.last() else {
            panic!("expected range clause");
        };
        assert_eq!(range.gte.as_deref(), Some("0000000000005"));
        assert_eq!(range.lte.as_deref(), Some("0000000000042"));
        assert!(range.contains(&pad_time(10)));
        assert!(!range.contains(&pad_time(100)));
    }

    #[test]
    fn test_rendering() {
        assert_eq!(FieldMatch::token("hello").to_string(), "idx:hello");
        assert_eq!(FieldMatch::session("p2pa").to_string(), "sessionId:p2pa");
        let query = translate(&QueryParams::new("hello"), &tokenizer());
        let json = serde_json::to_value(query).unwrap();
        assert_eq!(json["search"][0]["MATCH"]["field"], "idx");
        assert_eq!(json["options"]["page"]["size"], 100);
    }
}
