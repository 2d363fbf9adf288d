//! PO一覧APIのクライアント

use std::collections::HashMap;

use futures_util::{stream, StreamExt};
use log::warn;
use serde::Deserialize;
use serde_json::json;

use digitradex_auth::{backend_message, SessionStore};

use crate::error::OrdersError;
use crate::model::{expand_purchase_order, DisplayRow, Product, PurchaseOrder};

const SHAPE_ERROR: &str = "サーバーから正しいデータ形式が返されませんでした";

/// 一覧取得のオプション
#[derive(Debug, Clone)]
pub struct OrdersOptions {
    /// 製品明細を並行取得する最大数
    pub detail_concurrency: usize,
    /// 1ページあたりの表示行数
    pub page_size: usize,
}

impl Default for OrdersOptions {
    fn default() -> Self {
        Self {
            detail_concurrency: 4,
            page_size: crate::view::PAGE_SIZE,
        }
    }
}

impl OrdersOptions {
    pub fn with_detail_concurrency(mut self, concurrency: usize) -> Self {
        self.detail_concurrency = concurrency.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// 一覧ロードの結果
///
/// 明細取得に失敗したPOはヘッダーからの再構成行で残し、
/// 失敗自体は `failures` に集約する。
#[derive(Debug)]
pub struct LoadReport {
    pub rows: Vec<DisplayRow>,
    pub failures: Vec<(i64, OrdersError)>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    po_list: Vec<PurchaseOrder>,
}

#[derive(Debug, Deserialize)]
struct ProductsResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    #[serde(default)]
    success: bool,
}

/// PO一覧のAPIクライアント
#[derive(Clone)]
pub struct OrdersClient {
    base_url: String,
    http_client: reqwest::Client,
    session: SessionStore,
    options: OrdersOptions,
}

impl OrdersClient {
    pub fn new(
        base_url: &str,
        http_client: reqwest::Client,
        session: SessionStore,
        options: OrdersOptions,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
            options,
        }
    }

    /// オプションへの参照を取得
    pub fn options(&self) -> &OrdersOptions {
        &self.options
    }

    /// POヘッダー一覧を取得する
    pub async fn list(&self) -> Result<Vec<PurchaseOrder>, OrdersError> {
        let token = self.session.require_token()?;
        let response = self
            .http_client
            .get(format!("{}/api/po/list", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = backend_message(&body)
                .unwrap_or_else(|| "PO一覧の取得に失敗しました".to_string());
            return Err(OrdersError::ApiError(format!("[{}] {}", status, message)));
        }

        let parsed: ListResponse = response.json().await?;
        if !parsed.success {
            return Err(OrdersError::ApiError(SHAPE_ERROR.to_string()));
        }
        Ok(parsed.po_list)
    }

    /// 指定POの製品明細を取得する
    pub async fn products(&self, po_id: i64) -> Result<Vec<Product>, OrdersError> {
        let token = self.session.require_token()?;
        let response = self
            .http_client
            .get(format!("{}/api/po/{}/products", self.base_url, po_id))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = backend_message(&body)
                .unwrap_or_else(|| "製品明細の取得に失敗しました".to_string());
            return Err(OrdersError::ApiError(format!("[{}] {}", status, message)));
        }

        let parsed: ProductsResponse = response.json().await?;
        if !parsed.success {
            return Err(OrdersError::ApiError(SHAPE_ERROR.to_string()));
        }
        Ok(parsed.products)
    }

    /// 一覧と明細をまとめてロードし、表示行へ展開する
    ///
    /// 明細は `detail_concurrency` 本まで並行で取得する。個々の失敗は
    /// 全体を落とさず、そのPOだけヘッダー再構成にフォールバックする。
    pub async fn load(&self) -> Result<LoadReport, OrdersError> {
        let headers = self.list().await?;

        let results: Vec<(usize, PurchaseOrder, Result<Vec<Product>, OrdersError>)> =
            stream::iter(headers.into_iter().enumerate().map(|(index, po)| {
                let client = self.clone();
                async move {
                    let result = client.products(po.id).await;
                    (index, po, result)
                }
            }))
            .buffer_unordered(self.options.detail_concurrency)
            .collect()
            .await;

        let mut by_id: HashMap<i64, Vec<Product>> = HashMap::new();
        let mut ordered: Vec<(usize, PurchaseOrder)> = Vec::new();
        let mut failures = Vec::new();
        for (index, po, result) in results {
            match result {
                Ok(products) => {
                    by_id.insert(po.id, products);
                }
                Err(err) => {
                    warn!("PO {} の製品明細取得に失敗: {}", po.id, err);
                    failures.push((po.id, err));
                }
            }
            ordered.push((index, po));
        }
        ordered.sort_by_key(|(index, _)| *index);

        let mut rows = Vec::new();
        for (_, po) in &ordered {
            let products = by_id.get(&po.id).map(Vec::as_slice).unwrap_or(&[]);
            rows.extend(expand_purchase_order(po, products));
        }

        Ok(LoadReport { rows, failures })
    }

    /// POのステータスを更新する
    pub async fn update_status(&self, po_id: i64, status: &str) -> Result<(), OrdersError> {
        let token = self.session.require_token()?;
        let response = self
            .http_client
            .patch(format!("{}/api/po/{}/status", self.base_url, po_id))
            .bearer_auth(token)
            .json(&json!({ "status": status }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status_code = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = backend_message(&body)
                .unwrap_or_else(|| "ステータスの更新に失敗しました".to_string());
            return Err(OrdersError::ApiError(format!(
                "[{}] {}",
                status_code, message
            )));
        }
        Ok(())
    }

    /// POのメモを更新する
    pub async fn update_memo(&self, po_id: i64, memo: &str) -> Result<(), OrdersError> {
        let token = self.session.require_token()?;
        let response = self
            .http_client
            .put(format!("{}/api/po/{}/memo", self.base_url, po_id))
            .bearer_auth(token)
            .json(&json!({ "memo": memo }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = backend_message(&body)
                .unwrap_or_else(|| "メモの更新に失敗しました".to_string());
            return Err(OrdersError::ApiError(format!("[{}] {}", status, message)));
        }

        let parsed: AckResponse = response.json().await?;
        if !parsed.success {
            return Err(OrdersError::ApiError(
                "メモの更新に失敗しました".to_string(),
            ));
        }
        Ok(())
    }

    /// 複数POを一括削除する
    pub async fn delete(&self, ids: &[i64]) -> Result<(), OrdersError> {
        if ids.is_empty() {
            return Err(OrdersError::ValidationError(
                "削除するPOを選択してください".to_string(),
            ));
        }

        let token = self.session.require_token()?;
        let response = self
            .http_client
            .delete(format!("{}/api/po/delete", self.base_url))
            .bearer_auth(token)
            .json(&json!({ "ids": ids }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = backend_message(&body)
                .unwrap_or_else(|| "POの削除に失敗しました".to_string());
            return Err(OrdersError::ApiError(format!("[{}] {}", status, message)));
        }
        Ok(())
    }
}
