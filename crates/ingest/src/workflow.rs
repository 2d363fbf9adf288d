//! 取込ワークフローのステートマシン
//!
//! upload → poll → normalize → review → confirm → register の流れを
//! 状態遷移として管理する。失敗時は安全な状態へ戻る: アップロード
//! や解析の失敗は `Idle` へ、登録の失敗は入力を保持したまま
//! `Reviewing` へ。

use log::{info, warn};

use crate::client::{IngestClient, PollHandle};
use crate::draft::PurchaseOrderDraft;
use crate::error::IngestError;
use crate::normalize::normalize_extraction;

/// ワークフローの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Uploading,
    Polling,
    Normalizing,
    Reviewing,
    Confirming,
    Registering,
    Done,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Polling => "polling",
            Self::Normalizing => "normalizing",
            Self::Reviewing => "reviewing",
            Self::Confirming => "confirming",
            Self::Registering => "registering",
            Self::Done => "done",
        }
    }
}

/// アップロードされたドキュメント
///
/// レビュー画面のプレビュー用に元ファイルを保持する。
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// 取込ワークフロー
pub struct IngestWorkflow {
    client: IngestClient,
    state: WorkflowState,
    draft: PurchaseOrderDraft,
    document: Option<UploadedDocument>,
    job_id: Option<String>,
    poll_handle: PollHandle,
    last_error: Option<String>,
}

impl IngestWorkflow {
    /// 新しいワークフローを作成
    pub fn new(client: IngestClient) -> Self {
        let draft = PurchaseOrderDraft::new(&client.options().default_currency);
        Self {
            client,
            state: WorkflowState::Idle,
            draft,
            document: None,
            job_id: None,
            poll_handle: PollHandle::new(),
            last_error: None,
        }
    }

    /// 現在の状態
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// 現在のドラフト
    pub fn draft(&self) -> &PurchaseOrderDraft {
        &self.draft
    }

    /// ドラフトの編集用参照
    ///
    /// レビュー中のユーザー編集を想定している。
    pub fn draft_mut(&mut self) -> &mut PurchaseOrderDraft {
        &mut self.draft
    }

    /// 保持中のアップロードファイル
    pub fn document(&self) -> Option<&UploadedDocument> {
        self.document.as_ref()
    }

    /// 進行中ジョブのID
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    /// 直近のエラーメッセージ
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// ポーリングの中断ハンドル
    ///
    /// クローンを保持しておけばワークフローの外からも中断できる。
    pub fn poll_handle(&self) -> PollHandle {
        self.poll_handle.clone()
    }

    /// ドキュメントを取り込み、レビュー可能な状態まで進める
    ///
    /// `Idle` からのみ開始できる。非対応のファイル形式は遷移せずに
    /// バリデーションエラーとなる。途中で失敗した場合は `Idle` へ
    /// 戻り、エラーメッセージが `last_error` に残る。
    pub async fn ingest(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), IngestError> {
        if self.state != WorkflowState::Idle {
            return Err(IngestError::InvalidTransition {
                from: self.state.as_str(),
                to: "uploading",
            });
        }

        // ファイル形式の検証はIdleのまま行う
        if let Err(err) = IngestClient::check_content_type(content_type) {
            self.last_error =
                Some("PDF、PNG、JPEGファイルのみアップロード可能です".to_string());
            return Err(err);
        }

        self.last_error = None;
        self.document = Some(UploadedDocument {
            file_name: file_name.to_string(),
            bytes: bytes.clone(),
            content_type: content_type.to_string(),
        });

        self.state = WorkflowState::Uploading;
        let job_id = match self.client.upload(file_name, bytes, content_type).await {
            Ok(job_id) => job_id,
            Err(err) => return Err(self.fail_to_idle(err)),
        };
        self.job_id = Some(job_id.clone());

        self.state = WorkflowState::Polling;
        self.poll_handle = PollHandle::new();
        let handle = self.poll_handle.clone();
        if let Err(err) = self.client.poll_until_terminal(&job_id, &handle).await {
            return Err(self.fail_to_idle(err));
        }

        self.state = WorkflowState::Normalizing;
        let payload = match self.client.extract(&job_id).await {
            Ok(payload) => payload,
            Err(err) => return Err(self.fail_to_idle(err)),
        };

        let default_currency = self.client.options().default_currency.clone();
        self.draft = match normalize_extraction(&payload, &default_currency) {
            Ok(draft) => draft,
            Err(err) => return Err(self.fail_to_idle(err)),
        };

        self.state = WorkflowState::Reviewing;
        info!("document {} ready for review", file_name);
        Ok(())
    }

    /// 登録を要求し、確認ダイアログ相当の状態へ進める
    ///
    /// 必須項目が欠けている場合は `Reviewing` のまま失敗する。
    pub fn request_registration(&mut self) -> Result<(), IngestError> {
        if self.state != WorkflowState::Reviewing {
            return Err(IngestError::InvalidTransition {
                from: self.state.as_str(),
                to: "confirming",
            });
        }

        if let Err(err) = self.draft.validate_for_registration() {
            self.last_error = Some(err.to_string());
            return Err(err);
        }

        self.last_error = None;
        self.state = WorkflowState::Confirming;
        Ok(())
    }

    /// 確認をキャンセルしてレビューに戻る
    pub fn cancel_confirmation(&mut self) -> Result<(), IngestError> {
        if self.state != WorkflowState::Confirming {
            return Err(IngestError::InvalidTransition {
                from: self.state.as_str(),
                to: "reviewing",
            });
        }

        self.state = WorkflowState::Reviewing;
        Ok(())
    }

    /// 登録を確定する
    ///
    /// 失敗した場合はドラフトを保持したまま `Reviewing` へ戻り、
    /// 再試行できる。
    pub async fn confirm_registration(&mut self) -> Result<(), IngestError> {
        if self.state != WorkflowState::Confirming {
            return Err(IngestError::InvalidTransition {
                from: self.state.as_str(),
                to: "registering",
            });
        }

        self.state = WorkflowState::Registering;

        match self.client.register(&self.draft).await {
            Ok(()) => {
                self.state = WorkflowState::Done;
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                warn!("registration failed: {}", err);
                self.state = WorkflowState::Reviewing;
                self.last_error = Some(registration_error_message(&err));
                Err(err)
            }
        }
    }

    /// ワークフローを初期状態に戻す
    ///
    /// 「別のPOを登録する」操作に相当する。どの状態からでも呼べ、
    /// 進行中のポーリングは中断される。
    pub fn reset(&mut self) {
        self.poll_handle.cancel();
        self.poll_handle = PollHandle::new();
        self.state = WorkflowState::Idle;
        self.draft.reset(&self.client.options().default_currency);
        self.document = None;
        self.job_id = None;
        self.last_error = None;
    }

    fn fail_to_idle(&mut self, err: IngestError) -> IngestError {
        warn!("ingestion failed, returning to idle: {}", err);
        self.state = WorkflowState::Idle;
        self.draft.reset(&self.client.options().default_currency);
        self.document = None;
        self.job_id = None;
        self.last_error = Some(ingest_error_message(&err));
        err
    }
}

/// 取込中エラーのユーザー向けメッセージ
fn ingest_error_message(err: &IngestError) -> String {
    match err {
        IngestError::JobFailed(reason) => reason.clone(),
        IngestError::PollTimeout(_) => "OCR処理がタイムアウトしました".to_string(),
        IngestError::Cancelled => "OCR処理がキャンセルされました".to_string(),
        IngestError::UnrecognizedShape => {
            "OCR結果から有効なデータを抽出できませんでした".to_string()
        }
        IngestError::ApiError(message) => message.clone(),
        other => format!("アップロードエラー: {}", other),
    }
}

/// 登録エラーのユーザー向けメッセージ
fn registration_error_message(err: &IngestError) -> String {
    match err {
        IngestError::ApiError(message) => message.clone(),
        _ => "PO情報の登録に失敗しました。もう一度お試しください。".to_string(),
    }
}
