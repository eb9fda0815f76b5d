//! SQL 语句构造
//!
//! 由表名、列名和值描述生成带占位符的参数化语句。构造时不接触连接，
//! 失败只可能来自调用方传入的描述本身不完整；执行由调用方提供 executor。

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use domain::{ChatId, NewMessage, RepositoryError, UserId};
use sqlx::postgres::{PgQueryResult, PgRow};
use sqlx::{Executor, FromRow, Postgres, QueryBuilder};

pub const CHAT_TABLE: &str = "chat";
pub const CHAT_USERS_TABLE: &str = "chat_users";
pub const MESSAGES_TABLE: &str = "messages";

pub const ID_COLUMN: &str = "id";
pub const NAME_COLUMN: &str = "name";
pub const CHAT_ID_COLUMN: &str = "chat_id";
pub const USER_ID_COLUMN: &str = "user_id";
pub const MESSAGE_COLUMN: &str = "message";
pub const CREATED_AT_COLUMN: &str = "created_at";

/// 可绑定到语句上的参数值
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    BigInt(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::BigInt(v) => write!(f, "{v}"),
            SqlValue::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            SqlValue::Timestamp(v) => {
                write!(f, "'{}'", v.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::BigInt(value)
    }
}

impl From<ChatId> for SqlValue {
    fn from(value: ChatId) -> Self {
        SqlValue::BigInt(value.value())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_owned())
    }
}

impl From<&UserId> for SqlValue {
    fn from(value: &UserId) -> Self {
        SqlValue::Text(value.as_str().to_owned())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

fn push_bind(builder: &mut QueryBuilder<'static, Postgres>, value: SqlValue) {
    match value {
        SqlValue::BigInt(v) => builder.push_bind(v),
        SqlValue::Text(v) => builder.push_bind(v),
        SqlValue::Timestamp(v) => builder.push_bind(v),
    };
}

/// 一条已构造好的命名语句。
///
/// 名称只用于日志；`execute`/`fetch_scalar` 按值接收语句，每条语句只能执行一次。
pub struct Statement {
    name: &'static str,
    builder: QueryBuilder<'static, Postgres>,
    args: Vec<SqlValue>,
}

impl Statement {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn sql(&self) -> &str {
        self.builder.sql()
    }

    pub fn args(&self) -> &[SqlValue] {
        &self.args
    }

    /// 参数内联后的 SQL，仅用于调试日志
    pub fn pretty(&self) -> String {
        prettify(self.sql(), &self.args)
    }

    /// 执行语句并返回受影响行数等结果。语句随之被消耗。
    ///
    /// ```compile_fail
    /// # async fn run(pool: sqlx::PgPool) -> Result<(), sqlx::Error> {
    /// let statement = infrastructure::query::delete_chat(domain::ChatId::new(1)).unwrap();
    /// statement.execute(&pool).await?;
    /// statement.execute(&pool).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute<'c, E>(mut self, executor: E) -> Result<PgQueryResult, sqlx::Error>
    where
        E: Executor<'c, Database = Postgres>,
    {
        self.builder.build().execute(executor).await
    }

    /// 执行语句并取第一行的单列值（用于 `RETURNING id`）。语句随之被消耗。
    pub async fn fetch_scalar<'c, T, E>(mut self, executor: E) -> Result<T, sqlx::Error>
    where
        E: Executor<'c, Database = Postgres>,
        T: Send + Unpin,
        (T,): for<'r> FromRow<'r, PgRow>,
    {
        self.builder.build_query_scalar::<T>().fetch_one(executor).await
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("name", &self.name)
            .field("sql", &self.sql())
            .field("args", &self.args)
            .finish()
    }
}

/// 把 `$n` 占位符替换为对应参数的字面量形式
pub fn prettify(sql: &str, args: &[SqlValue]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.char_indices().peekable();

    while let Some((_, ch)) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }

        let mut digits = String::new();
        while let Some(&(_, next)) = chars.peek() {
            if !next.is_ascii_digit() {
                break;
            }
            digits.push(next);
            chars.next();
        }

        let arg = digits
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| args.get(idx));
        match arg {
            Some(value) => out.push_str(&value.to_string()),
            None => {
                out.push('$');
                out.push_str(&digits);
            }
        }
    }

    out
}

#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: &'static str,
    columns: Vec<&'static str>,
    rows: Vec<Vec<SqlValue>>,
    returning: Option<&'static str>,
}

pub fn insert(table: &'static str) -> InsertBuilder {
    InsertBuilder {
        table,
        columns: Vec::new(),
        rows: Vec::new(),
        returning: None,
    }
}

impl InsertBuilder {
    pub fn columns(mut self, columns: &[&'static str]) -> Self {
        self.columns.extend_from_slice(columns);
        self
    }

    pub fn values<I>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = SqlValue>,
    {
        self.rows.push(row.into_iter().collect());
        self
    }

    pub fn returning(mut self, column: &'static str) -> Self {
        self.returning = Some(column);
        self
    }

    pub fn build(self, name: &'static str) -> Result<Statement, RepositoryError> {
        if self.columns.is_empty() {
            return Err(RepositoryError::statement(name, "no columns given"));
        }
        if self.rows.is_empty() {
            return Err(RepositoryError::statement(name, "at least one row is required"));
        }
        if let Some(row) = self.rows.iter().find(|row| row.len() != self.columns.len()) {
            return Err(RepositoryError::statement(
                name,
                format!(
                    "row has {} values but {} columns were given",
                    row.len(),
                    self.columns.len()
                ),
            ));
        }

        let mut builder = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) ",
            self.table,
            self.columns.join(", ")
        ));
        let mut args = Vec::with_capacity(self.rows.len() * self.columns.len());

        builder.push_values(self.rows, |mut tuple, row| {
            for value in row {
                args.push(value.clone());
                match value {
                    SqlValue::BigInt(v) => tuple.push_bind(v),
                    SqlValue::Text(v) => tuple.push_bind(v),
                    SqlValue::Timestamp(v) => tuple.push_bind(v),
                };
            }
        });

        if let Some(column) = self.returning {
            builder.push(" RETURNING ").push(column);
        }

        Ok(Statement {
            name,
            builder,
            args,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    table: &'static str,
    filter: Option<(&'static str, SqlValue)>,
}

pub fn delete(table: &'static str) -> DeleteBuilder {
    DeleteBuilder {
        table,
        filter: None,
    }
}

impl DeleteBuilder {
    pub fn where_eq(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.filter = Some((column, value.into()));
        self
    }

    /// 不带条件的 DELETE 会清空整张表，直接拒绝
    pub fn build(self, name: &'static str) -> Result<Statement, RepositoryError> {
        let (column, value) = self
            .filter
            .ok_or_else(|| RepositoryError::statement(name, "delete without a filter"))?;

        let mut builder = QueryBuilder::new(format!("DELETE FROM {} WHERE {} = ", self.table, column));
        push_bind(&mut builder, value.clone());

        Ok(Statement {
            name,
            builder,
            args: vec![value],
        })
    }
}

pub fn insert_chat(name: &str) -> Result<Statement, RepositoryError> {
    insert(CHAT_TABLE)
        .columns(&[NAME_COLUMN])
        .values([SqlValue::from(name)])
        .returning(ID_COLUMN)
        .build("insert_chat")
}

/// 一条语句插入全部成员行；成员列表为空时构造失败
pub fn insert_chat_members(
    chat_id: ChatId,
    user_ids: &[UserId],
) -> Result<Statement, RepositoryError> {
    user_ids
        .iter()
        .fold(
            insert(CHAT_USERS_TABLE).columns(&[CHAT_ID_COLUMN, USER_ID_COLUMN]),
            |builder, user_id| builder.values([SqlValue::from(chat_id), SqlValue::from(user_id)]),
        )
        .build("insert_chat_members")
}

pub fn delete_chat_members(chat_id: ChatId) -> Result<Statement, RepositoryError> {
    delete(CHAT_USERS_TABLE)
        .where_eq(CHAT_ID_COLUMN, chat_id)
        .build("delete_chat_members")
}

pub fn delete_chat(chat_id: ChatId) -> Result<Statement, RepositoryError> {
    delete(CHAT_TABLE)
        .where_eq(ID_COLUMN, chat_id)
        .build("delete_chat")
}

pub fn insert_message(message: &NewMessage) -> Result<Statement, RepositoryError> {
    insert(MESSAGES_TABLE)
        .columns(&[USER_ID_COLUMN, MESSAGE_COLUMN, CREATED_AT_COLUMN])
        .values([
            SqlValue::from(&message.sender_id),
            SqlValue::from(message.text.as_str()),
            SqlValue::from(message.created_at),
        ])
        .returning(ID_COLUMN)
        .build("insert_message")
}
