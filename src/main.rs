use people_counter::{config::CONFIG_FILE, prompt, Config, Error, YoloDetector};

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = Config::load_or_default(CONFIG_FILE)?;
    let detector = YoloDetector::from_config(&cfg)?;

    let stdin = std::io::stdin();
    let (input, output) = prompt::ask_paths(&mut stdin.lock(), &mut std::io::stdout())?;

    let summary = people_counter::process_video(&input, &output, detector, &cfg)?;
    println!(
        "wrote {} frames to {} (last frame: {} people)",
        summary.frames,
        output.display(),
        summary.last_count
    );

    Ok(())
}
