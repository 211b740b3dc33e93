use subak_session::{ApiClient, Config, Session};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional: enable basic logging for the example
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    // SUBAK_API_URL, optionally SUBAK_STORAGE_DIR / SUBAK_SESSION_COOKIE
    let cfg = Config::from_env()?;
    let client = ApiClient::new(cfg)?;
    if let Some(landing) = std::env::args().nth(1) {
        let cleaned = client.bootstrap(&landing)?;
        println!("landing url: {cleaned}");
    }

    let session = Session::new(client.clone());
    match session.refresh().await? {
        Some(profile) => println!("signed in as {} (coins: {:?})", profile.name, profile.coin),
        None => println!("no active session"),
    }

    let lockers: serde_json::Value = client.get_json("/v4/lockers").await?;
    println!("{lockers:#}");
    Ok(())
}
