//! PO一覧のモデルと行展開
//!
//! バックエンドのヘッダー行はcamelCaseで届き、数値と文字列が混在
//! するため、緩い文字列デシリアライズで受ける。

use serde::{Deserialize, Deserializer, Serialize};

/// 登録済みPOのヘッダー行
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PurchaseOrder {
    pub id: i64,
    pub status: String,
    pub manager: String,
    pub organization: String,
    #[serde(deserialize_with = "loose_string")]
    pub invoice_number: String,
    #[serde(deserialize_with = "loose_string")]
    pub po_number: String,
    pub customer: String,
    pub product_name: String,
    #[serde(deserialize_with = "loose_string")]
    pub quantity: String,
    #[serde(deserialize_with = "loose_string")]
    pub unit_price: String,
    #[serde(deserialize_with = "loose_string")]
    pub amount: String,
    pub etd: String,
    pub destination: String,
    pub currency: String,
    pub payment_terms: String,
    pub terms: String,
    pub transit_point: String,
    pub eta: String,
    pub acquisition_date: String,
    pub invoice: String,
    pub payment: String,
    pub booking: String,
    pub booking_number: String,
    pub vessel_name: String,
    pub voyage_number: String,
    pub container_info: String,
    pub memo: String,
}

/// POの製品明細
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub id: i64,
    pub po_id: i64,
    pub product_name: String,
    #[serde(deserialize_with = "loose_string")]
    pub quantity: String,
    #[serde(deserialize_with = "loose_string")]
    pub unit_price: String,
    #[serde(deserialize_with = "loose_string")]
    pub subtotal: String,
}

/// 一覧の表示行
///
/// 1つのPOは製品ごとに1行へ展開される。先頭行のみ `is_main_row` が
/// 立ち、チェックボックスや展開ボタンなどの行操作を担う。
#[derive(Debug, Clone)]
pub struct DisplayRow {
    pub po: PurchaseOrder,
    pub is_main_row: bool,
    pub product_name: String,
    pub quantity: String,
    pub unit_price: String,
    pub amount: String,
}

impl DisplayRow {
    /// 行が属するPOのID
    pub fn id(&self) -> i64 {
        self.po.id
    }
}

/// POを表示行へ展開する
///
/// 製品明細が空の場合はヘッダーからの再構成にフォールバックする。
pub fn expand_purchase_order(po: &PurchaseOrder, products: &[Product]) -> Vec<DisplayRow> {
    if products.is_empty() {
        return fallback_rows(po);
    }

    products
        .iter()
        .enumerate()
        .map(|(index, product)| DisplayRow {
            po: po.clone(),
            is_main_row: index == 0,
            product_name: product.product_name.clone(),
            quantity: product.quantity.clone(),
            unit_price: product.unit_price.clone(),
            amount: product.subtotal.clone(),
        })
        .collect()
}

/// ヘッダー項目からのベストエフォート再構成
///
/// 製品名がカンマ区切りで入っている場合は分割し、数量と金額を
/// 均等に按分する。分割できなければヘッダーの値そのままの1行。
fn fallback_rows(po: &PurchaseOrder) -> Vec<DisplayRow> {
    let names: Vec<&str> = po
        .product_name
        .split(", ")
        .filter(|name| !name.is_empty())
        .collect();

    if names.len() <= 1 {
        return vec![DisplayRow {
            po: po.clone(),
            is_main_row: true,
            product_name: po.product_name.clone(),
            quantity: po.quantity.clone(),
            unit_price: po.unit_price.clone(),
            amount: po.amount.clone(),
        }];
    }

    let count = names.len() as f64;
    names
        .iter()
        .enumerate()
        .map(|(index, name)| DisplayRow {
            po: po.clone(),
            is_main_row: index == 0,
            product_name: name.to_string(),
            quantity: divide_loose(&po.quantity, count),
            unit_price: if po.unit_price.is_empty() {
                "0".to_string()
            } else {
                po.unit_price.clone()
            },
            amount: divide_loose(&po.amount, count),
        })
        .collect()
}

fn divide_loose(value: &str, divisor: f64) -> String {
    match value.parse::<f64>() {
        Ok(parsed) => (parsed / divisor).to_string(),
        Err(_) => "0".to_string(),
    }
}

/// 文字列・数値・nullのいずれで届いても文字列として受ける
fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Number(number) => number.to_string(),
        serde_json::Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(id: i64, product_name: &str) -> PurchaseOrder {
        PurchaseOrder {
            id,
            product_name: product_name.to_string(),
            quantity: "9000".to_string(),
            unit_price: "2.5".to_string(),
            amount: "22500".to_string(),
            ..Default::default()
        }
    }

    fn product(name: &str, subtotal: &str) -> Product {
        Product {
            product_name: name.to_string(),
            subtotal: subtotal.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_expand_marks_first_row_main() {
        let po = header(1, "A, B");
        let products = vec![product("A", "100"), product("B", "200")];

        let rows = expand_purchase_order(&po, &products);

        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_main_row);
        assert!(!rows[1].is_main_row);
        assert_eq!(rows[0].product_name, "A");
        assert_eq!(rows[1].amount, "200");
        assert_eq!(rows[1].id(), 1);
    }

    #[test]
    fn test_fallback_splits_comma_joined_names() {
        let po = header(2, "A, B, C");

        let rows = expand_purchase_order(&po, &[]);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].product_name, "A");
        assert_eq!(rows[2].product_name, "C");
        // 数量と金額は均等按分
        assert_eq!(rows[0].quantity, "3000");
        assert_eq!(rows[0].amount, "7500");
        assert_eq!(rows[0].unit_price, "2.5");
        assert!(rows[0].is_main_row);
        assert!(!rows[1].is_main_row);
    }

    #[test]
    fn test_fallback_single_row_without_split() {
        let po = header(3, "Widget");

        let rows = expand_purchase_order(&po, &[]);

        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_main_row);
        assert_eq!(rows[0].product_name, "Widget");
        assert_eq!(rows[0].quantity, "9000");
    }

    #[test]
    fn test_fallback_empty_header() {
        let po = PurchaseOrder {
            id: 4,
            ..Default::default()
        };

        let rows = expand_purchase_order(&po, &[]);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_name, "");
    }

    #[test]
    fn test_loose_deserialization_accepts_numbers() {
        let json = serde_json::json!({
            "id": 9,
            "poNumber": 76890,
            "customer": "Acme",
            "quantity": 1000,
            "unitPrice": "2.5",
            "amount": 2500.5
        });

        let po: PurchaseOrder = serde_json::from_value(json).unwrap();
        assert_eq!(po.po_number, "76890");
        assert_eq!(po.quantity, "1000");
        assert_eq!(po.amount, "2500.5");
    }
}
