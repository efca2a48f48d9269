//! `:name` parameters in hand-written SQL.
//!
//! ```rust
//! use rel::named::NamedQuery;
//! use rel::types::{Dialect, RowValues};
//!
//! let query = NamedQuery::parse("select * from spec where weight > :weight order by weight").unwrap();
//! let (sql, params) = query.bind(Dialect::Postgres, &[("weight", RowValues::Int(1))]).unwrap();
//! assert_eq!(sql, "select * from spec where weight > $1 order by weight");
//! assert_eq!(params, vec![RowValues::Int(1)]);
//! ```

mod scanner;

use scanner::{
    State, is_block_comment_end, is_block_comment_start, is_line_comment_start, matches_tag,
    scan_name, try_start_dollar_quote,
};

use crate::error::RelError;
use crate::types::{Dialect, RowValues};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Sql(String),
    /// Index into `NamedQuery::names`.
    Param(usize),
}

/// SQL with `:name` parameters, split once and bound per dialect.
///
/// Parameters are not recognized inside string literals, quoted identifiers, comments or
/// dollar-quoted bodies, and `::type` casts are left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedQuery {
    segments: Vec<Segment>,
    names: Vec<String>,
}

impl NamedQuery {
    /// Split `sql` into literal text and parameter references.
    ///
    /// # Errors
    /// Returns `RelError::NamedParameter` when a quote, comment or dollar-quoted body is
    /// left open.
    pub fn parse(sql: &str) -> Result<Self, RelError> {
        let bytes = sql.as_bytes();
        let mut segments = Vec::new();
        let mut names: Vec<String> = Vec::new();
        let mut state = State::Normal;
        let mut literal_start = 0;
        let mut idx = 0;

        while idx < bytes.len() {
            let b = bytes[idx];
            match state {
                State::Normal => match b {
                    b'\'' => state = State::SingleQuoted,
                    b'"' => state = State::DoubleQuoted,
                    _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                    _ if is_block_comment_start(bytes, idx) => {
                        state = State::BlockComment(1);
                        idx += 1;
                    }
                    b'$' => {
                        if let Some((tag, close)) = try_start_dollar_quote(bytes, idx) {
                            state = State::DollarQuoted(tag);
                            idx = close;
                        }
                    }
                    b':' if bytes.get(idx + 1) == Some(&b':') => idx += 1,
                    b':' => {
                        if let Some(end) = scan_name(bytes, idx + 1) {
                            if literal_start < idx {
                                segments.push(Segment::Sql(sql[literal_start..idx].to_string()));
                            }
                            let name = &sql[idx + 1..end];
                            let position = match names.iter().position(|n| n == name) {
                                Some(pos) => pos,
                                None => {
                                    names.push(name.to_string());
                                    names.len() - 1
                                }
                            };
                            segments.push(Segment::Param(position));
                            literal_start = end;
                            idx = end - 1;
                        }
                    }
                    _ => {}
                },
                State::SingleQuoted => {
                    if b == b'\'' {
                        if bytes.get(idx + 1) == Some(&b'\'') {
                            idx += 1;
                        } else {
                            state = State::Normal;
                        }
                    }
                }
                State::DoubleQuoted => {
                    if b == b'"' {
                        if bytes.get(idx + 1) == Some(&b'"') {
                            idx += 1;
                        } else {
                            state = State::Normal;
                        }
                    }
                }
                State::LineComment => {
                    if b == b'\n' {
                        state = State::Normal;
                    }
                }
                State::BlockComment(depth) => {
                    if is_block_comment_start(bytes, idx) {
                        state = State::BlockComment(depth + 1);
                        idx += 1;
                    } else if is_block_comment_end(bytes, idx) {
                        state = if depth == 1 {
                            State::Normal
                        } else {
                            State::BlockComment(depth - 1)
                        };
                        idx += 1;
                    }
                }
                State::DollarQuoted(ref tag) => {
                    if b == b'$' && matches_tag(bytes, idx, tag) {
                        idx += tag.len() + 1;
                        state = State::Normal;
                    }
                }
            }
            idx += 1;
        }

        match state {
            State::Normal | State::LineComment => {}
            State::SingleQuoted | State::DoubleQuoted => {
                return Err(RelError::NamedParameter("unterminated quote".into()));
            }
            State::BlockComment(_) => {
                return Err(RelError::NamedParameter("unterminated block comment".into()));
            }
            State::DollarQuoted(tag) => {
                return Err(RelError::NamedParameter(format!(
                    "unterminated dollar-quoted body ${tag}$"
                )));
            }
        }

        if literal_start < sql.len() {
            segments.push(Segment::Sql(sql[literal_start..].to_string()));
        }

        Ok(Self { segments, names })
    }

    /// Distinct parameter names in order of first appearance.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Rewrite to positional placeholders for `dialect` and order the values to match.
    ///
    /// A name used several times binds one position. Values for names the query does not
    /// use are ignored.
    ///
    /// # Errors
    /// Returns `RelError::NamedParameter` if a referenced name has no value.
    pub fn bind(
        &self,
        dialect: Dialect,
        values: &[(&str, RowValues)],
    ) -> Result<(String, Vec<RowValues>), RelError> {
        let params = self
            .names
            .iter()
            .map(|name| {
                values
                    .iter()
                    .find(|(candidate, _)| candidate == name)
                    .map(|(_, value)| value.clone())
                    .ok_or_else(|| RelError::NamedParameter(format!("no value for :{name}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut sql = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Sql(text) => sql.push_str(text),
                Segment::Param(position) => sql.push_str(&dialect.placeholder(position + 1)),
            }
        }

        Ok((sql, params))
    }
}
