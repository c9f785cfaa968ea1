#[tokio::main]
async fn main() -> anyhow::Result<()> {
    payment_otp_service::start_web_server().await
}
