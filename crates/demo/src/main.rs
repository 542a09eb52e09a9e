use anyhow::Result;
use dgpr_demo::config::DemoConfig;

fn main() -> Result<()> {
    dgpr_demo::init_logger();
    let reports = dgpr_demo::run(DemoConfig::default())?;
    log::info!("{} models trained", reports.len());
    Ok(())
}
