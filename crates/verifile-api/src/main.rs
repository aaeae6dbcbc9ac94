use verifile_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Storage, passcode store, services, routes
    let (_state, router) = verifile_api::setup::initialize_app(config.clone()).await?;

    verifile_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
