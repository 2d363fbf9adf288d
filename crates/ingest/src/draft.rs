//! 取込中のPOドラフトモデル
//!
//! OCRの抽出値はすべて文字列で届くため、フィールドは文字列のまま
//! 保持し、計算が必要な箇所でのみ数値として解釈する。

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// 1つのPOに登録できる製品数の上限
pub const MAX_LINE_ITEMS: usize = 6;

/// 出荷手配の初期値
pub const ARRANGEMENT_BEFORE: &str = "手配前";

/// 製品明細
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LineItem {
    pub product_name: String,
    pub quantity: String,
    pub unit_price: String,
    pub amount: String,
}

impl LineItem {
    /// 空の明細を作成
    pub fn empty() -> Self {
        Self::default()
    }
}

/// 明細の編集対象フィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    ProductName,
    Quantity,
    UnitPrice,
    Amount,
}

/// 取込中のPOドラフト
///
/// 合計金額は明細金額の合計から自動計算されるが、`set_total_amount`
/// で直接編集すると手動編集フラグが立ち、`reset` までは明細を変更
/// しても合計が再計算されなくなる。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderDraft {
    pub customer_name: String,
    pub po_number: String,
    pub currency: String,
    pub total_amount: String,
    pub payment_terms: String,
    pub shipping_terms: String,
    pub destination: String,
    pub status: String,

    pub products: Vec<LineItem>,

    // Inputテーブル側のフィールド（画面には出さないが保持する）
    pub shipment_arrangement: String,
    pub po_acquisition_date: String,
    pub organization: String,
    pub invoice_number: String,
    pub payment_status: String,
    pub memo: String,

    // OCRの生データ（監査用にそのまま保持）
    pub ocr_raw_text: String,

    #[serde(skip)]
    manual_total: bool,
}

impl PurchaseOrderDraft {
    /// 通貨を指定して空のドラフトを作成
    pub fn new(default_currency: &str) -> Self {
        Self {
            customer_name: String::new(),
            po_number: String::new(),
            currency: default_currency.to_string(),
            total_amount: "0.00".to_string(),
            payment_terms: String::new(),
            shipping_terms: String::new(),
            destination: String::new(),
            status: "pending".to_string(),
            products: vec![LineItem::empty()],
            shipment_arrangement: ARRANGEMENT_BEFORE.to_string(),
            po_acquisition_date: today(),
            organization: String::new(),
            invoice_number: String::new(),
            payment_status: String::new(),
            memo: String::new(),
            ocr_raw_text: String::new(),
            manual_total: false,
        }
    }

    /// 合計金額が手動編集されているか
    pub fn manual_total(&self) -> bool {
        self.manual_total
    }

    /// 合計金額を直接設定する
    ///
    /// 以後 `reset` まで自動計算は行われない。
    pub fn set_total_amount(&mut self, value: &str) {
        self.manual_total = true;
        self.total_amount = value.to_string();
    }

    /// 明細を置き換える
    ///
    /// 空のリストは許可せず、1件の空明細に差し替える。
    pub fn set_products(&mut self, products: Vec<LineItem>) {
        self.products = if products.is_empty() {
            vec![LineItem::empty()]
        } else {
            products
        };
        self.recompute_total();
    }

    /// 明細を追加する
    pub fn add_item(&mut self) -> Result<(), IngestError> {
        if self.products.len() >= MAX_LINE_ITEMS {
            return Err(IngestError::ValidationError(format!(
                "製品は{}件まで登録できます",
                MAX_LINE_ITEMS
            )));
        }
        self.products.push(LineItem::empty());
        Ok(())
    }

    /// 明細を削除する
    ///
    /// 最低1件は残す。
    pub fn remove_item(&mut self, index: usize) -> Result<(), IngestError> {
        if self.products.len() <= 1 {
            return Err(IngestError::ValidationError(
                "製品は最低1件必要です".to_string(),
            ));
        }
        if index >= self.products.len() {
            return Err(IngestError::ValidationError(format!(
                "製品 {} は存在しません",
                index + 1
            )));
        }
        self.products.remove(index);
        self.recompute_total();
        Ok(())
    }

    /// 明細フィールドを編集する
    ///
    /// 数量・単価の変更時は金額を再計算する。
    pub fn set_item_field(
        &mut self,
        index: usize,
        field: ItemField,
        value: &str,
    ) -> Result<(), IngestError> {
        let item = self.products.get_mut(index).ok_or_else(|| {
            IngestError::ValidationError(format!("製品 {} は存在しません", index + 1))
        })?;

        match field {
            ItemField::ProductName => item.product_name = value.to_string(),
            ItemField::Quantity => {
                item.quantity = value.to_string();
                item.amount = multiply_loose(&item.quantity, &item.unit_price);
            }
            ItemField::UnitPrice => {
                item.unit_price = value.to_string();
                item.amount = multiply_loose(&item.quantity, &item.unit_price);
            }
            ItemField::Amount => item.amount = value.to_string(),
        }

        self.recompute_total();
        Ok(())
    }

    /// 明細金額の合計を数値で返す
    pub fn items_total(&self) -> f64 {
        self.products
            .iter()
            .map(|item| item.amount.parse::<f64>().unwrap_or(0.0))
            .sum()
    }

    /// 合計金額を再計算する（手動編集フラグが立っている間は何もしない）
    pub fn recompute_total(&mut self) {
        if self.manual_total {
            return;
        }
        self.total_amount = format!("{:.2}", self.items_total());
    }

    /// 登録前のバリデーション
    pub fn validate_for_registration(&self) -> Result<(), IngestError> {
        if self.customer_name.is_empty() || self.po_number.is_empty() {
            return Err(IngestError::ValidationError(
                "必須項目（顧客名、PO番号など）を入力してください。".to_string(),
            ));
        }
        Ok(())
    }

    /// 空のドラフトに戻す
    ///
    /// 手動編集フラグもここで解除される。
    pub fn reset(&mut self, default_currency: &str) {
        *self = Self::new(default_currency);
    }

    /// 登録APIへ送るリクエストボディを組み立てる
    ///
    /// バックエンドが期待するcamelCaseへ変換する。Inputテーブル側の
    /// フィールドはsnake_caseのまま送る。
    pub fn registration_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "customer": self.customer_name,
            "poNumber": self.po_number,
            "currency": self.currency,
            "totalAmount": self.total_amount,
            "paymentTerms": self.payment_terms,
            "terms": self.shipping_terms,
            "destination": self.destination,

            "products": self.products.iter().map(|item| serde_json::json!({
                "name": item.product_name,
                "quantity": item.quantity,
                "unitPrice": item.unit_price,
                "amount": item.amount,
            })).collect::<Vec<_>>(),

            "shipment_arrangement": self.shipment_arrangement,
            "po_acquisition_date": self.po_acquisition_date,
            "organization": self.organization,
            "invoice_number": self.invoice_number,
            "payment_status": self.payment_status,
            "memo": self.memo,

            "ocr_raw_text": self.ocr_raw_text,
        })
    }
}

/// 数量×単価を文字列で計算する
///
/// 解釈できない値は0として扱う。
pub(crate) fn multiply_loose(quantity: &str, unit_price: &str) -> String {
    let quantity = quantity.parse::<f64>().unwrap_or(0.0);
    let unit_price = unit_price.parse::<f64>().unwrap_or(0.0);
    format_number(quantity * unit_price)
}

/// 数値を余分な末尾ゼロなしの文字列にする（25.0 -> "25"）
pub(crate) fn format_number(value: f64) -> String {
    value.to_string()
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}
