use anyhow::{anyhow, Result};
use dirforge::{Artifact, Config, Intent};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_init();

    let mut args = std::env::args().take(3);
    let program_name = args.next().unwrap_or("dirforge".to_string());
    let (Some(config_file), Some(intent_file)) = (args.next(), args.next()) else {
        return Err(anyhow!(
            "usage: {program_name} /path/to/config.json /path/to/intent.json"
        ));
    };

    let config = Config::try_from_file(&config_file)?;
    tracing::debug!("loaded config from {config_file}");

    let intent: Intent =
        serde_json::from_reader(std::io::BufReader::new(std::fs::File::open(&intent_file)?))?;
    tracing::debug!("loaded intent from {intent_file}");

    match dirforge::translate(&config, intent)? {
        Artifact::Record(record) => print!("{}", record.render()),
        Artifact::Phrase(phrase) => println!("{}", serde_json::to_string(&phrase)?),
        Artifact::Config(change) => print!("{}", change.text()),
    }
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dirforge=info".into()),
        )
        .init();
}
