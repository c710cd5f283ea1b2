use qyk_app::app::{run, AppConfig, Command, USAGE};

fn main() {
    tracing_subscriber::fmt::init();
    let config = AppConfig::from_env().unwrap_or_default();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err}\n\n{USAGE}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(config, command) {
        eprintln!("qyk failed: {err:#}");
        std::process::exit(1);
    }
}
