use dotenv::dotenv;
use std::env;

use digitradex_rust::orders::{FilterCriteria, RowTone};
use digitradex_rust::DigiTradeX;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::init();

    let base_url = env::var("DIGITRADEX_API_URL").expect("DIGITRADEX_API_URL must be set");
    let email = env::var("DIGITRADEX_EMAIL").expect("DIGITRADEX_EMAIL must be set");
    let password = env::var("DIGITRADEX_PASSWORD").expect("DIGITRADEX_PASSWORD must be set");

    let client = DigiTradeX::new(&base_url);
    client.auth().sign_in(&email, &password).await?;

    println!("Starting orders demo");

    let mut browser = client.browser();
    let report = browser.refresh().await?;
    if !report.failures.is_empty() {
        for (id, err) in &report.failures {
            println!("PO {}: detail fetch failed: {}", id, err);
        }
    }

    println!(
        "{} rows over {} pages",
        browser.view().rows().len(),
        browser.view().total_pages()
    );

    // Show the first page
    for row in browser.view().current_rows() {
        let marker = match RowTone::from_status(&row.po.status) {
            RowTone::Attention => "*",
            _ => " ",
        };
        println!(
            "{} [{}] {} {} | {} x{} = {}",
            marker,
            row.po.status,
            row.po.po_number,
            row.po.customer,
            row.product_name,
            row.quantity,
            row.amount
        );
    }

    // Filter to in-progress orders only
    browser.view_mut().apply_filters(FilterCriteria {
        status: "手配中".to_string(),
        ..Default::default()
    });
    println!("手配中: {} rows", browser.view().rows().len());
    browser.view_mut().reset_filters();

    Ok(())
}
