use anyhow::Result;
use psc_tutor::utils::logging;
use psc_tutor::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init(Config::from_env().verbose_logging);

    // 加载配置
    let config = Config::load()?;

    // 初始化并运行应用
    App::initialize(config)?.run().await?;

    Ok(())
}
