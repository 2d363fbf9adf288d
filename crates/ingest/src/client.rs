//! OCRパイプラインのAPIクライアント
//!
//! アップロード、ジョブステータスの確認、抽出結果の取得、PO登録の
//! 各エンドポイントを呼び出す。ステータスのポーリングは上限付きで、
//! `PollHandle` によりいつでも中断できる。

use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use digitradex_auth::{backend_message, SessionStore};

use crate::draft::PurchaseOrderDraft;
use crate::error::IngestError;

/// アップロードを受け付けるMIMEタイプ
const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/jpg",
];

/// ジョブIDが格納されうるキー（優先順）
const JOB_ID_KEYS: &[&str] = &["ocrId", "id", "job_id", "ocr_id"];

/// クライアントオプション
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// 正規化時に通貨が見つからなかった場合の既定値
    pub default_currency: String,
    /// ステータス確認の間隔
    pub poll_interval: Duration,
    /// ステータス確認の最大回数
    pub poll_max_attempts: u32,
    /// アップロードのタイムアウト
    pub upload_timeout: Option<Duration>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            default_currency: "USD".to_string(),
            poll_interval: Duration::from_secs(1),
            poll_max_attempts: 120,
            upload_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl IngestOptions {
    /// 既定の通貨を設定
    pub fn with_default_currency(mut self, value: &str) -> Self {
        self.default_currency = value.to_string();
        self
    }

    /// ポーリング間隔を設定
    pub fn with_poll_interval(mut self, value: Duration) -> Self {
        self.poll_interval = value;
        self
    }

    /// ポーリング回数の上限を設定
    pub fn with_poll_max_attempts(mut self, value: u32) -> Self {
        self.poll_max_attempts = value;
        self
    }

    /// アップロードのタイムアウトを設定
    pub fn with_upload_timeout(mut self, value: Option<Duration>) -> Self {
        self.upload_timeout = value;
        self
    }
}

/// OCRジョブのステータス
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed(String),
}

/// ポーリングの中断ハンドル
///
/// ワークフローのライフタイムに紐づけて保持し、`cancel` で進行中の
/// ポーリングを止める。
#[derive(Clone, Default)]
pub struct PollHandle {
    cancelled: Arc<AtomicBool>,
}

impl PollHandle {
    /// 新しいハンドルを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ポーリングを中断する
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// 中断済みかどうか
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// OCR取込クライアント
pub struct IngestClient {
    base_url: String,
    http_client: Client,
    session: SessionStore,
    options: IngestOptions,
}

impl IngestClient {
    /// 新しい取込クライアントを作成
    pub fn new(
        base_url: &str,
        http_client: Client,
        session: SessionStore,
        options: IngestOptions,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
            options,
        }
    }

    /// オプションへの参照を取得
    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// コンテンツタイプがアップロード可能か検証する
    pub fn check_content_type(content_type: &str) -> Result<(), IngestError> {
        let mime: mime::Mime = content_type
            .parse()
            .map_err(|_| IngestError::UnsupportedFileType(content_type.to_string()))?;

        if !ALLOWED_CONTENT_TYPES.contains(&mime.essence_str()) {
            return Err(IngestError::UnsupportedFileType(content_type.to_string()));
        }

        Ok(())
    }

    /// ドキュメントをアップロードしてジョブIDを得る
    ///
    /// PDF/PNG/JPEG以外はI/Oせずに拒否する。レスポンスが成功して
    /// いてもジョブIDが見つからなければAPIエラーとする。
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, IngestError> {
        Self::check_content_type(content_type)?;

        let token = self.session.require_token()?;

        info!("uploading {} ({} bytes)", file_name, bytes.len());

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;

        // APIが期待するlocal_kwはクエリとフォームの両方に付ける
        let form = Form::new().part("file", part).text("local_kw", "true");

        let url = format!("{}/api/ocr/upload", self.base_url);

        let mut request = self
            .http_client
            .post(&url)
            .query(&[("local_kw", "true")])
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/json")
            .multipart(form);

        if let Some(timeout) = self.options.upload_timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = backend_message(&body).unwrap_or(body);
            return Err(IngestError::ApiError(format!("[{}] {}", status, message)));
        }

        let value: Value = serde_json::from_str(&body)?;

        for key in JOB_ID_KEYS {
            if let Some(job_id) = value.get(key) {
                let job_id = match job_id {
                    Value::String(text) if !text.is_empty() => text.clone(),
                    Value::Number(number) => number.to_string(),
                    _ => continue,
                };
                debug!("upload accepted, job id {}", job_id);
                return Ok(job_id);
            }
        }

        // 旧フロントエンドはここでモックデータにフォールバックして
        // いたが、IDなしの成功は異常としてエラーにする。
        warn!("upload response carried no job id: {}", body);
        Err(IngestError::ApiError(
            backend_message(&body)
                .unwrap_or_else(|| "OCR処理の開始に失敗しました".to_string()),
        ))
    }

    /// ジョブステータスを1回確認する
    pub async fn status(&self, job_id: &str) -> Result<JobStatus, IngestError> {
        let token = self.session.require_token()?;

        let url = format!("{}/api/ocr/status/{}", self.base_url, job_id);

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::ApiError(
                backend_message(&body)
                    .unwrap_or_else(|| "OCR処理のステータス確認に失敗しました".to_string()),
            ));
        }

        let value: Value = response.json().await?;
        let status = value.get("status").and_then(|v| v.as_str()).unwrap_or("");

        let status = match status {
            "completed" | "success" => JobStatus::Completed,
            "failed" | "error" => {
                let reason = value
                    .get("reason")
                    .and_then(|v| v.as_str())
                    .unwrap_or("OCR処理に失敗しました。")
                    .to_string();
                JobStatus::Failed(reason)
            }
            "pending" => JobStatus::Pending,
            // 未知のステータスは処理中として扱う
            _ => JobStatus::Processing,
        };

        debug!("job {} status: {:?}", job_id, status);
        Ok(status)
    }

    /// 完了したジョブの抽出結果を取得する
    pub async fn extract(&self, job_id: &str) -> Result<Value, IngestError> {
        let token = self.session.require_token()?;

        let url = format!("{}/api/ocr/extract/{}", self.base_url, job_id);

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::ApiError(
                backend_message(&body)
                    .unwrap_or_else(|| "OCR結果の取得に失敗しました".to_string()),
            ));
        }

        let payload = response.json().await?;
        Ok(payload)
    }

    /// ジョブが終端ステータスになるまでポーリングする
    ///
    /// 間隔・回数上限はオプションから取り、ハンドルの中断を確認
    /// しながら待つ。
    pub async fn poll_until_terminal(
        &self,
        job_id: &str,
        handle: &PollHandle,
    ) -> Result<(), IngestError> {
        let max_attempts = self.options.poll_max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if handle.is_cancelled() {
                return Err(IngestError::Cancelled);
            }

            match self.status(job_id).await? {
                JobStatus::Completed => return Ok(()),
                JobStatus::Failed(reason) => return Err(IngestError::JobFailed(reason)),
                JobStatus::Pending | JobStatus::Processing => {
                    if attempt == max_attempts {
                        break;
                    }
                    debug!(
                        "job {} still in progress, retrying ({}/{})",
                        job_id, attempt, max_attempts
                    );
                    sleep(self.options.poll_interval).await;
                }
            }
        }

        Err(IngestError::PollTimeout(max_attempts))
    }

    /// レビュー済みドラフトを登録する
    pub async fn register(&self, draft: &PurchaseOrderDraft) -> Result<(), IngestError> {
        draft.validate_for_registration()?;

        let token = self.session.require_token()?;

        let url = format!("{}/api/po/register", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .json(&draft.registration_payload())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = backend_message(&body).unwrap_or(body);
            return Err(IngestError::ApiError(format!("[{}] {}", status, message)));
        }

        let value: Value = serde_json::from_str(&body)?;

        if value.get("success").and_then(|v| v.as_bool()) != Some(true) {
            return Err(IngestError::ApiError(
                backend_message(&body).unwrap_or_else(|| "登録に失敗しました".to_string()),
            ));
        }

        info!("registered PO {}", draft.po_number);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_content_type() {
        assert!(IngestClient::check_content_type("application/pdf").is_ok());
        assert!(IngestClient::check_content_type("image/png").is_ok());
        assert!(IngestClient::check_content_type("image/jpeg").is_ok());
        assert!(IngestClient::check_content_type("image/gif").is_err());
        assert!(IngestClient::check_content_type("text/plain").is_err());
        assert!(IngestClient::check_content_type("not a mime").is_err());
    }

    #[test]
    fn test_poll_handle_cancel() {
        let handle = PollHandle::new();
        assert!(!handle.is_cancelled());

        let shared = handle.clone();
        shared.cancel();
        assert!(handle.is_cancelled());
    }
}
