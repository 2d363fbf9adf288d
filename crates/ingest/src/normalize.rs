//! OCR抽出結果の正規化
//!
//! バックエンドの抽出APIはフィールド名が安定しないため、候補キーを
//! 優先順に並べた固定のエイリアス表で決定的に解決する。どの形にも
//! 当てはまらないペイロードは `UnrecognizedShape` として明示的に
//! 失敗させる。

use log::debug;
use serde_json::Value;

use crate::draft::{multiply_loose, LineItem, PurchaseOrderDraft};
use crate::error::IngestError;

/// 抽出データ本体が格納されうるトップレベルキー（優先順）
const DATA_KEYS: &[&str] = &["data", "result", "poData"];

/// 明細配列が格納されうるキー（優先順）
const ITEM_ARRAY_KEYS: &[&str] = &["products", "items"];

const NAME_KEYS: &[&str] = &["product_name", "name", "productName", "description"];
const QUANTITY_KEYS: &[&str] = &["quantity", "qty"];
const UNIT_PRICE_KEYS: &[&str] = &["unit_price", "unitPrice", "price"];
const AMOUNT_KEYS: &[&str] = &["amount", "subtotal"];

const CUSTOMER_KEYS: &[&str] = &["customer_name", "customer", "customerName", "client"];
const PO_NUMBER_KEYS: &[&str] = &["po_number", "poNumber", "po"];
const CURRENCY_KEYS: &[&str] = &["currency", "currencyCode"];
const PAYMENT_TERMS_KEYS: &[&str] = &["payment_terms", "paymentTerms", "payment"];
const SHIPPING_TERMS_KEYS: &[&str] = &["shipping_terms", "terms", "incoterms"];
const DESTINATION_KEYS: &[&str] = &["destination", "port"];
const ORGANIZATION_KEYS: &[&str] = &["organization"];
const INVOICE_KEYS: &[&str] = &["invoice_number", "invoiceNumber", "invoice"];
const PAYMENT_STATUS_KEYS: &[&str] = &["payment_status", "paymentStatus"];

/// 正規化直後の出荷手配ステータス
const ARRANGEMENT_IN_PROGRESS: &str = "手配中";

/// 抽出ペイロードをドラフトへ正規化する
///
/// ペイロード全体は `ocr_raw_text` として文字列のまま保持する。
pub fn normalize_extraction(
    payload: &Value,
    default_currency: &str,
) -> Result<PurchaseOrderDraft, IngestError> {
    let data = locate_data(payload).ok_or(IngestError::UnrecognizedShape)?;

    let mut draft = PurchaseOrderDraft::new(default_currency);

    draft.customer_name = text_alias(data, CUSTOMER_KEYS).unwrap_or_default();
    draft.po_number = text_alias(data, PO_NUMBER_KEYS).unwrap_or_default();
    draft.currency =
        text_alias(data, CURRENCY_KEYS).unwrap_or_else(|| default_currency.to_string());
    draft.payment_terms = text_alias(data, PAYMENT_TERMS_KEYS).unwrap_or_default();
    draft.shipping_terms = text_alias(data, SHIPPING_TERMS_KEYS).unwrap_or_default();
    draft.destination = text_alias(data, DESTINATION_KEYS).unwrap_or_default();
    draft.organization = text_alias(data, ORGANIZATION_KEYS).unwrap_or_default();
    draft.invoice_number = text_alias(data, INVOICE_KEYS).unwrap_or_default();
    draft.payment_status = text_alias(data, PAYMENT_STATUS_KEYS).unwrap_or_default();

    draft.status = "pending".to_string();
    draft.shipment_arrangement = ARRANGEMENT_IN_PROGRESS.to_string();
    draft.ocr_raw_text = serde_json::to_string(data)?;

    let items = normalize_items(data);
    debug!("normalized {} line item(s)", items.len());
    draft.set_products(items);

    Ok(draft)
}

/// 抽出データ本体を特定する
///
/// 既知のキー配下を優先し、なければオブジェクトのルート自体を
/// データとみなす。`error` キーを持つルートはデータではない。
fn locate_data(payload: &Value) -> Option<&Value> {
    for key in DATA_KEYS {
        if let Some(value) = payload.get(key) {
            if value.is_object() || value.is_array() {
                return Some(value);
            }
        }
    }

    if payload.is_object() && payload.get("error").is_none() {
        return Some(payload);
    }

    None
}

/// 明細配列を解決する
///
/// 既知のキー配下に空でない配列がなければ、トップレベルの
/// フィールドから1件の明細を合成する。
fn normalize_items(data: &Value) -> Vec<LineItem> {
    for key in ITEM_ARRAY_KEYS {
        if let Some(items) = data.get(key).and_then(|v| v.as_array()) {
            if !items.is_empty() {
                return items.iter().map(normalize_item).collect();
            }
        }
    }

    vec![normalize_item(data)]
}

fn normalize_item(item: &Value) -> LineItem {
    let quantity = text_alias(item, QUANTITY_KEYS).unwrap_or_default();
    let unit_price = text_alias(item, UNIT_PRICE_KEYS).unwrap_or_default();

    let amount = match text_alias(item, AMOUNT_KEYS) {
        Some(amount) => amount,
        // 金額が無ければ数量×単価で補完する
        None if !quantity.is_empty() && !unit_price.is_empty() => {
            multiply_loose(&quantity, &unit_price)
        }
        None => String::new(),
    };

    LineItem {
        product_name: text_alias(item, NAME_KEYS).unwrap_or_default(),
        quantity,
        unit_price,
        amount,
    }
}

/// エイリアス表から最初の空でない値をテキストとして取り出す
fn text_alias(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(text) = value.get(key).and_then(value_to_text) {
            return Some(text);
        }
    }
    None
}

/// JSON値をテキストにする（空文字列・null・複合値は不採用）
fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
