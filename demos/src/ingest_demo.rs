use dotenv::dotenv;
use std::env;
use std::fs;

use digitradex_rust::ingest::WorkflowState;
use digitradex_rust::DigiTradeX;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::init();

    let base_url = env::var("DIGITRADEX_API_URL").expect("DIGITRADEX_API_URL must be set");
    let email = env::var("DIGITRADEX_EMAIL").expect("DIGITRADEX_EMAIL must be set");
    let password = env::var("DIGITRADEX_PASSWORD").expect("DIGITRADEX_PASSWORD must be set");
    let file_path = env::var("DIGITRADEX_PO_FILE").unwrap_or_else(|_| "po.pdf".to_string());

    let client = DigiTradeX::new(&base_url);
    client.auth().sign_in(&email, &password).await?;

    println!("Starting ingest demo with {}", file_path);

    let bytes = fs::read(&file_path)?;
    let content_type = if file_path.ends_with(".png") {
        "image/png"
    } else if file_path.ends_with(".jpg") || file_path.ends_with(".jpeg") {
        "image/jpeg"
    } else {
        "application/pdf"
    };

    let mut workflow = client.workflow();
    workflow.ingest(&file_path, bytes, content_type).await?;

    if workflow.state() != WorkflowState::Reviewing {
        println!("Ingestion did not reach review: {:?}", workflow.last_error());
        return Ok(());
    }

    let draft = workflow.draft();
    println!("Customer:  {}", draft.customer_name);
    println!("PO number: {}", draft.po_number);
    println!("Currency:  {}", draft.currency);
    println!("Total:     {}", draft.total_amount);
    for item in &draft.products {
        println!(
            "  {} x{} @ {} = {}",
            item.product_name, item.quantity, item.unit_price, item.amount
        );
    }

    // Two-step confirmation before registering
    workflow.request_registration()?;
    workflow.confirm_registration().await?;
    println!("Registered, state: {:?}", workflow.state());

    Ok(())
}
