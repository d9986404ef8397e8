//! JSON-to-Postgres bind bridging.
//!
//! Every value binds as text (or NULL) and the query's explicit casts
//! restore the column type server-side. This keeps one encode path for all
//! seven field types.

use serde_json::Value;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo};
use sqlx::{Encode, Postgres, Type};

#[derive(Clone, Debug)]
pub enum BindValue {
    Null,
    Text(String),
}

impl BindValue {
    pub fn from_json(value: &Value) -> BindValue {
        match value {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Text(b.to_string()),
            Value::Number(n) => BindValue::Text(n.to_string()),
            Value::String(s) => BindValue::Text(s.clone()),
            other => BindValue::Text(other.to_string()),
        }
    }
}

impl Type<Postgres> for BindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

impl<'q> Encode<'q, Postgres> for BindValue {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        match self {
            BindValue::Null => Ok(IsNull::Yes),
            BindValue::Text(s) => <&str as Encode<Postgres>>::encode_by_ref(&s.as_str(), buf),
        }
    }
}
