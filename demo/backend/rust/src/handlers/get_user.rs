/* demo/backend/rust/src/handlers/get_user.rs */

use serde::Serialize;
use sever_server::{FetchEvent, Handler, Payload, SeverError, ServerFnError, create_handler};

/// Route the compiler assigns to `export const getUser = fetch$(...)` in `app/users.js`.
pub const ROUTE: &str = "/_m/app/users/0/getUser";

#[derive(Debug, Serialize)]
pub struct User {
  pub id: u32,
  pub name: String,
  pub email: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub avatar: Option<String>,
}

struct UserData {
  id: u32,
  name: &'static str,
  email: &'static str,
  avatar: Option<&'static str>,
}

const USERS: &[UserData] = &[
  UserData {
    id: 1,
    name: "Alice",
    email: "alice@example.com",
    avatar: Some("https://example.com/alice.png"),
  },
  UserData { id: 2, name: "Bob", email: "bob@example.com", avatar: None },
  UserData { id: 3, name: "Charlie", email: "charlie@example.com", avatar: None },
];

pub async fn get_user(payload: Payload, _event: FetchEvent) -> Result<serde_json::Value, ServerFnError> {
  let id: u32 = payload.arg(0)?;
  let user = USERS
    .iter()
    .find(|u| u.id == id)
    .ok_or_else(|| SeverError::not_found(format!("User {id} not found")))?;

  let user = User {
    id: user.id,
    name: user.name.to_string(),
    email: user.email.to_string(),
    avatar: user.avatar.map(ToString::to_string),
  };
  Ok(serde_json::to_value(user)?)
}

pub fn get_user_handler() -> Handler {
  create_handler(get_user, ROUTE, None)
}

#[cfg(test)]
mod tests {
  use serde_json::{Value, json};

  use super::*;

  #[tokio::test]
  async fn finds_a_known_user() {
    let user: Value = get_user_handler().call_json(vec![json!(2)]).await.unwrap();
    assert_eq!(user, json!({ "id": 2, "name": "Bob", "email": "bob@example.com" }));
  }

  #[tokio::test]
  async fn unknown_user_is_not_found() {
    let err = get_user_handler().call_json::<Value>(vec![json!(9)]).await.unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.message, "User 9 not found");
  }
}
