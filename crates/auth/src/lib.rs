//! DigiTradeX Auth client for Rust
//!
//! This crate provides authentication functionality for the DigiTradeX
//! backend: login, token verification, session management, and the
//! development login bypass.

use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::RwLock;
use thiserror::Error;

/// エラー型
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing session")]
    MissingSession,
}

/// ユーザー情報
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            email: String::new(),
            role: String::new(),
        }
    }
}

/// セッション情報
///
/// バックエンドが発行したベアラートークンと、ログインレスポンスに
/// 含まれていた場合のユーザープロファイルを保持する。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: Option<User>,
}

/// セッションストア
///
/// 認証が必要なコンポーネントへ明示的に渡して共有するセッション
/// コンテキスト。`init` / `clear` でライフサイクルを管理する。
#[derive(Clone, Default)]
pub struct SessionStore {
    current: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
    /// 空のセッションストアを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// セッションを保存
    pub fn init(&self, session: Session) {
        let mut write_guard = self.current.write().unwrap();
        *write_guard = Some(session);
    }

    /// セッションを破棄
    pub fn clear(&self) {
        let mut write_guard = self.current.write().unwrap();
        *write_guard = None;
    }

    /// 現在のセッションを取得
    pub fn get(&self) -> Option<Session> {
        let read_guard = self.current.read().unwrap();
        read_guard.clone()
    }

    /// 現在のトークンを取得
    pub fn token(&self) -> Option<String> {
        self.get().map(|session| session.token)
    }

    /// 認証済みかどうか
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// 認証必須の呼び出しで使うトークンを取得
    pub fn require_token(&self) -> Result<String, AuthError> {
        self.token().ok_or(AuthError::MissingSession)
    }
}

/// ログインレスポンス
#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
    user: Option<User>,
    message: Option<String>,
}

/// トークン検証レスポンス
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    valid: bool,
}

/// Auth クライアント
pub struct AuthClient {
    base_url: String,
    http_client: Client,
    session: SessionStore,
}

impl AuthClient {
    /// 新しい Auth クライアントを作成
    pub fn new(base_url: &str, http_client: Client, session: SessionStore) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
        }
    }

    /// セッションストアへの参照を取得
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// メール・パスワードでログイン
    ///
    /// 成功時はセッションストアへ保存したうえでセッションを返す。
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::ValidationError(
                "メールアドレスとパスワードを入力してください".to_string(),
            ));
        }

        let url = format!("{}/api/auth/login", self.base_url);

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });

        debug!("signing in: {}", email);

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = backend_message(&body);

            if status == StatusCode::UNAUTHORIZED {
                return Err(AuthError::AuthenticationError(message.unwrap_or_else(
                    || "メールアドレスとパスワードを確認してください".to_string(),
                )));
            }

            return Err(AuthError::ApiError(
                message.unwrap_or_else(|| "ログインに失敗しました".to_string()),
            ));
        }

        let login: LoginResponse = response.json().await?;

        let token = match login.token {
            Some(token) if !token.is_empty() => token,
            _ => {
                return Err(AuthError::ApiError(
                    login
                        .message
                        .unwrap_or_else(|| "トークンが見つかりません".to_string()),
                ))
            }
        };

        let session = Session {
            token,
            user: login.user,
        };

        self.session.init(session.clone());

        Ok(session)
    }

    /// 保存済みトークンを検証
    ///
    /// 無効なトークンはストアから削除する。
    pub async fn verify(&self) -> Result<bool, AuthError> {
        let token = self.session.require_token()?;

        let url = format!("{}/api/auth/verify", self.base_url);

        let response = match self
            .http_client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                // 検証できないトークンは残さない
                warn!("token verification failed: {}", err);
                self.session.clear();
                return Err(AuthError::NetworkError(err));
            }
        };

        if !response.status().is_success() {
            self.session.clear();
            return Ok(false);
        }

        let verify: VerifyResponse = response.json().await.unwrap_or(VerifyResponse {
            valid: false,
        });

        if !verify.valid {
            self.session.clear();
        }

        Ok(verify.valid)
    }

    /// 開発用自動ログイン
    ///
    /// ネットワークを介さずダミーのトークンとユーザーを保存する。
    /// 開発環境でのみ使用すること。
    pub fn sign_in_dev(&self) -> Session {
        let session = Session {
            token: "dummy-dev-token".to_string(),
            user: Some(User {
                id: 1,
                name: "テストユーザー".to_string(),
                email: "test@example.com".to_string(),
                role: "admin".to_string(),
            }),
        };

        self.session.init(session.clone());

        session
    }

    /// サインアウト
    ///
    /// バックエンドにログアウトAPIは存在しないため、ローカルの
    /// セッションを破棄するのみ。
    pub fn sign_out(&self) {
        self.session.clear();
    }
}

/// バックエンドのエラーレスポンスからメッセージを抽出
///
/// `message` を優先し、`detail`（文字列または `{msg}` の配列）に
/// フォールバックする。
pub fn backend_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    if let Some(message) = value.get("message").and_then(|v| v.as_str()) {
        if !message.is_empty() {
            return Some(message.to_string());
        }
    }

    match value.get("detail") {
        Some(serde_json::Value::String(detail)) if !detail.is_empty() => Some(detail.clone()),
        Some(serde_json::Value::Array(items)) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| {
                    item.get("msg")
                        .and_then(|m| m.as_str())
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| item.to_string())
                })
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}
