//! Bandipur House site backend - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    if let Err(e) = bandipur_house::run().await {
        eprintln!("bandipur-house: {e}");
        std::process::exit(1);
    }
}
