use dotenv::dotenv;
use std::env;

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

    println!("Starting login demo");

    let session = client.auth().sign_in(&email, &password).await?;
    println!("Signed in, token: {}...", &session.token[..12.min(session.token.len())]);
    if let Some(user) = &session.user {
        println!("User: {} <{}> role={}", user.name, user.email, user.role);
    }

    // Verify the stored session against the backend
    let valid = client.auth().verify().await?;
    println!("Session valid: {}", valid);

    client.auth().sign_out();
    println!("Signed out, authenticated: {}", client.session().is_authenticated());

    Ok(())
}
