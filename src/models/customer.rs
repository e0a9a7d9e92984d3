use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[sqlx(rename = "createTS")]
    pub created_at: NaiveDateTime,
}

/// Validated customer fields, used for both create and update.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
}
