//! 一覧のフィルタ・ページング・選択の状態管理

use std::collections::HashSet;

use crate::client::{LoadReport, OrdersClient};
use crate::error::OrdersError;
use crate::model::DisplayRow;

/// 1ページあたりの表示行数の既定値
pub const PAGE_SIZE: usize = 10;

/// ページ番号ボタンの最大表示数
pub const MAX_PAGE_BUTTONS: usize = 5;

/// ステータスの選択肢
pub const STATUS_CHOICES: [&str; 4] = ["手配前", "手配中", "手配済", "計上済"];

/// ステータスに応じた行の強調区分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTone {
    Default,
    Attention,
    Arranged,
    Recorded,
}

impl RowTone {
    /// ステータス文字列から区分を決める
    pub fn from_status(status: &str) -> Self {
        match status {
            "手配中" => RowTone::Attention,
            "手配済" => RowTone::Arranged,
            "計上済" => RowTone::Recorded,
            _ => RowTone::Default,
        }
    }
}

/// 一覧の絞り込み条件
///
/// ステータスは完全一致、その他は大文字小文字を無視した部分一致。
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub status: String,
    pub customer_name: String,
    pub po_number: String,
    pub manager: String,
    pub organization: String,
}

impl FilterCriteria {
    pub fn matches(&self, row: &DisplayRow) -> bool {
        if !self.status.is_empty() && row.po.status != self.status {
            return false;
        }
        contains_ci(&row.po.customer, &self.customer_name)
            && contains_ci(&row.po.po_number, &self.po_number)
            && contains_ci(&row.po.manager, &self.manager)
            && contains_ci(&row.po.organization, &self.organization)
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// 一覧の表示状態
///
/// 全行を保持し、フィルタ適用後の行に対してページングする。
/// ページ番号は1始まり。
#[derive(Debug)]
pub struct ListView {
    all_rows: Vec<DisplayRow>,
    rows: Vec<DisplayRow>,
    filters: FilterCriteria,
    page: usize,
    page_size: usize,
    expanded: HashSet<i64>,
    selected: HashSet<i64>,
}

impl Default for ListView {
    fn default() -> Self {
        Self::new()
    }
}

impl ListView {
    pub fn new() -> Self {
        Self {
            all_rows: Vec::new(),
            rows: Vec::new(),
            filters: FilterCriteria::default(),
            page: 1,
            page_size: PAGE_SIZE,
            expanded: HashSet::new(),
            selected: HashSet::new(),
        }
    }

    /// ページサイズを設定する
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// 行を差し替える。ページは1に戻り、選択は解除される
    pub fn set_rows(&mut self, rows: Vec<DisplayRow>) {
        self.all_rows = rows;
        self.selected.clear();
        self.apply();
        self.page = 1;
    }

    pub fn filters(&self) -> &FilterCriteria {
        &self.filters
    }

    /// フィルタを適用し、1ページ目へ戻る
    pub fn apply_filters(&mut self, filters: FilterCriteria) {
        self.filters = filters;
        self.apply();
        self.page = 1;
    }

    /// フィルタを全解除する
    pub fn reset_filters(&mut self) {
        self.apply_filters(FilterCriteria::default());
    }

    fn apply(&mut self) {
        self.rows = self
            .all_rows
            .iter()
            .filter(|row| self.filters.matches(row))
            .cloned()
            .collect();
    }

    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total_pages(&self) -> usize {
        let pages = self.rows.len().div_ceil(self.page_size);
        pages.max(1)
    }

    /// ページを移動する。範囲外は端へ丸める
    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages());
    }

    /// 現在のページに載る行
    pub fn current_rows(&self) -> &[DisplayRow] {
        let start = (self.page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.rows.len());
        if start >= self.rows.len() {
            return &[];
        }
        &self.rows[start..end]
    }

    /// 表示するページ番号の範囲
    ///
    /// 最大5個、現在ページを中心に置き、端では詰める。
    pub fn page_window(&self) -> std::ops::RangeInclusive<usize> {
        let total = self.total_pages();
        if total <= MAX_PAGE_BUTTONS {
            return 1..=total;
        }
        if self.page <= 2 {
            return 1..=MAX_PAGE_BUTTONS;
        }
        if self.page + 2 >= total {
            return (total - MAX_PAGE_BUTTONS + 1)..=total;
        }
        (self.page - 2)..=(self.page + 2)
    }

    pub fn toggle_expand(&mut self, id: i64) {
        if !self.expanded.insert(id) {
            self.expanded.remove(&id);
        }
    }

    pub fn is_expanded(&self, id: i64) -> bool {
        self.expanded.contains(&id)
    }

    pub fn toggle_select(&mut self, id: i64) {
        if !self.selected.insert(id) {
            self.selected.remove(&id);
        }
    }

    pub fn selected_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.selected.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// ローカルの行のステータスを書き換え、元の値を返す
    ///
    /// 同じPOに属する全行を更新する。IDが見つからなければNone。
    pub fn set_status_local(&mut self, id: i64, status: &str) -> Option<String> {
        let mut previous = None;
        for row in self.all_rows.iter_mut().chain(self.rows.iter_mut()) {
            if row.po.id == id {
                if previous.is_none() {
                    previous = Some(row.po.status.clone());
                }
                row.po.status = status.to_string();
            }
        }
        previous
    }

    /// ローカルの行のメモを書き換え、元の値を返す
    pub fn set_memo_local(&mut self, id: i64, memo: &str) -> Option<String> {
        let mut previous = None;
        for row in self.all_rows.iter_mut().chain(self.rows.iter_mut()) {
            if row.po.id == id {
                if previous.is_none() {
                    previous = Some(row.po.memo.clone());
                }
                row.po.memo = memo.to_string();
            }
        }
        previous
    }
}

/// 一覧ビューとAPIクライアントをまとめた操作窓口
///
/// ステータスとメモの編集は先にローカルへ反映し、API呼び出しが
/// 失敗したら元の値へ戻す。
pub struct ListBrowser {
    client: OrdersClient,
    view: ListView,
}

impl ListBrowser {
    pub fn new(client: OrdersClient) -> Self {
        let view = ListView::new().with_page_size(client.options().page_size);
        Self { client, view }
    }

    pub fn view(&self) -> &ListView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ListView {
        &mut self.view
    }

    /// サーバーから一覧を取り直す
    pub async fn refresh(&mut self) -> Result<LoadReport, OrdersError> {
        let report = self.client.load().await?;
        self.view.set_rows(report.rows.clone());
        Ok(report)
    }

    /// ステータスを変更する
    pub async fn change_status(&mut self, id: i64, status: &str) -> Result<(), OrdersError> {
        let previous = self
            .view
            .set_status_local(id, status)
            .ok_or(OrdersError::UnknownId(id))?;

        if let Err(err) = self.client.update_status(id, status).await {
            self.view.set_status_local(id, &previous);
            return Err(err);
        }
        Ok(())
    }

    /// メモを編集する
    pub async fn edit_memo(&mut self, id: i64, memo: &str) -> Result<(), OrdersError> {
        let previous = self
            .view
            .set_memo_local(id, memo)
            .ok_or(OrdersError::UnknownId(id))?;

        if let Err(err) = self.client.update_memo(id, memo).await {
            self.view.set_memo_local(id, &previous);
            return Err(err);
        }
        Ok(())
    }

    /// 選択中のPOを一括削除し、一覧を取り直す
    pub async fn delete_selected(&mut self) -> Result<usize, OrdersError> {
        let ids = self.view.selected_ids();
        if ids.is_empty() {
            return Err(OrdersError::ValidationError(
                "削除するPOを選択してください".to_string(),
            ));
        }

        self.client.delete(&ids).await?;
        let count = ids.len();
        self.refresh().await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PurchaseOrder;

    fn row(id: i64, status: &str, customer: &str) -> DisplayRow {
        DisplayRow {
            po: PurchaseOrder {
                id,
                status: status.to_string(),
                customer: customer.to_string(),
                ..Default::default()
            },
            is_main_row: true,
            product_name: String::new(),
            quantity: String::new(),
            unit_price: String::new(),
            amount: String::new(),
        }
    }

    fn rows(count: usize) -> Vec<DisplayRow> {
        (1..=count as i64)
            .map(|id| row(id, "手配前", "Acme"))
            .collect()
    }

    #[test]
    fn test_filter_status_exact_match() {
        let mut view = ListView::new();
        view.set_rows(vec![
            row(1, "手配前", "Acme"),
            row(2, "手配中", "Beta"),
            row(3, "手配中", "Gamma"),
        ]);

        view.apply_filters(FilterCriteria {
            status: "手配中".to_string(),
            ..Default::default()
        });
        assert_eq!(view.rows().len(), 2);

        view.reset_filters();
        assert_eq!(view.rows().len(), 3);
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn test_filter_customer_substring_case_insensitive() {
        let mut view = ListView::new();
        view.set_rows(vec![row(1, "手配前", "Acme Corp"), row(2, "手配前", "Beta")]);

        view.apply_filters(FilterCriteria {
            customer_name: "acme".to_string(),
            ..Default::default()
        });
        assert_eq!(view.rows().len(), 1);
        assert_eq!(view.rows()[0].id(), 1);
    }

    #[test]
    fn test_pagination_slices_ten_per_page() {
        let mut view = ListView::new();
        view.set_rows(rows(23));

        assert_eq!(view.total_pages(), 3);
        assert_eq!(view.current_rows().len(), 10);

        view.set_page(3);
        assert_eq!(view.current_rows().len(), 3);

        // 範囲外は端へ丸める
        view.set_page(99);
        assert_eq!(view.page(), 3);
        view.set_page(0);
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn test_page_window_centers_on_current_page() {
        let mut view = ListView::new();
        view.set_rows(rows(95)); // 10ページ

        assert_eq!(view.page_window(), 1..=5);
        view.set_page(6);
        assert_eq!(view.page_window(), 4..=8);
        view.set_page(10);
        assert_eq!(view.page_window(), 6..=10);
    }

    #[test]
    fn test_custom_page_size() {
        let mut view = ListView::new().with_page_size(3);
        view.set_rows(rows(12));

        assert_eq!(view.page_size(), 3);
        assert_eq!(view.total_pages(), 4);
        assert_eq!(view.current_rows().len(), 3);

        view.set_page(4);
        assert_eq!(view.current_rows().len(), 3);
        assert_eq!(view.current_rows()[0].id(), 10);
    }

    #[test]
    fn test_page_size_floor_is_one() {
        let mut view = ListView::new().with_page_size(0);
        view.set_rows(rows(2));
        assert_eq!(view.page_size(), 1);
        assert_eq!(view.total_pages(), 2);
    }

    #[test]
    fn test_page_window_few_pages() {
        let mut view = ListView::new();
        view.set_rows(rows(25));
        assert_eq!(view.page_window(), 1..=3);
    }

    #[test]
    fn test_expand_and_select_toggle() {
        let mut view = ListView::new();
        view.set_rows(rows(3));

        view.toggle_expand(2);
        assert!(view.is_expanded(2));
        view.toggle_expand(2);
        assert!(!view.is_expanded(2));

        view.toggle_select(1);
        view.toggle_select(3);
        assert_eq!(view.selected_ids(), vec![1, 3]);
        assert_eq!(view.selected_count(), 2);

        view.toggle_select(1);
        assert_eq!(view.selected_ids(), vec![3]);

        // 行の差し替えで選択は解除される
        view.set_rows(rows(3));
        assert_eq!(view.selected_count(), 0);
    }

    #[test]
    fn test_local_status_edit_returns_previous() {
        let mut view = ListView::new();
        view.set_rows(vec![row(1, "手配前", "Acme")]);

        let previous = view.set_status_local(1, "手配済");
        assert_eq!(previous.as_deref(), Some("手配前"));
        assert_eq!(view.rows()[0].po.status, "手配済");

        assert!(view.set_status_local(99, "手配済").is_none());
    }

    #[test]
    fn test_row_tone_mapping() {
        assert_eq!(RowTone::from_status("手配中"), RowTone::Attention);
        assert_eq!(RowTone::from_status("手配済"), RowTone::Arranged);
        assert_eq!(RowTone::from_status("計上済"), RowTone::Recorded);
        assert_eq!(RowTone::from_status("手配前"), RowTone::Default);
        assert_eq!(RowTone::from_status(""), RowTone::Default);
    }
}
