use clap::Parser;

use magnifier::cli::{self, Args, Command};
use magnifier::config::Config;
use magnifier::engine::ExitReason;
use magnifier::launcher;
use magnifier::logging;
use magnifier::worker::Worker;

fn load_config(args: &Args) -> Result<Config, String> {
    let mut config = Config::load(args.config.as_deref()).map_err(|e| e.to_string())?;
    if let Some(deployment) = args.deployment {
        config.appliance.deployment = deployment.into();
    }
    Ok(config)
}

fn run_worker(args: &cli::WorkerArgs, config: &Config) -> Result<ExitReason, String> {
    let options = cli::worker_options(args, config)?;
    let worker = Worker::new(options);
    if let Err(e) = worker.install_signal_handler() {
        log::warn!("Failed to install termination handler: {}", e);
    }
    worker.run().map_err(|e| e.to_string())
}

fn run(args: Args) -> Result<(), String> {
    let mut config = load_config(&args)?;

    match args.command {
        None => launcher::run_launcher(&config, args.config.clone(), args.verbose)
            .map_err(|e| e.to_string()),
        Some(Command::Launcher(ref launcher_args)) => {
            cli::apply_launcher_args(launcher_args, &mut config);
            launcher::run_launcher(&config, args.config.clone(), args.verbose)
                .map_err(|e| e.to_string())
        }
        Some(Command::Worker(ref worker_args)) => {
            let reason = run_worker(worker_args, &config)?;
            log::info!("Worker exiting: {:?}", reason);
            Ok(())
        }
        Some(Command::Cameras) => cli::list_cameras(),
        Some(Command::Profiles) => {
            cli::list_profiles(&config);
            Ok(())
        }
        Some(Command::Config { ref action }) => {
            cli::handle_config_action(action.clone(), args.config.as_deref(), &config)
        }
    }
}

fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magnifier::camera::Resolution;
    use magnifier::cli::LauncherArgs;
    use magnifier::input::InputMode;
    use magnifier::supervisor::WorkerCommand;

    #[test]
    fn test_deployment_flag_overrides_file() {
        let args = Args::parse_from(["magnifier", "--deployment", "production", "profiles"]);
        let config = load_config(&args).unwrap();
        assert!(config.deployment().is_production());
        assert!(config.monitoring_enabled());
    }

    #[test]
    fn test_launcher_overrides_reach_worker() {
        let args = Args::parse_from(["magnifier", "--deployment", "production", "-v", "launcher"]);
        let launcher_config = load_config(&args).unwrap();
        assert_eq!(launcher_config.input_mode(), InputMode::Physical);

        let command = launcher::forward_settings(
            WorkerCommand::new("magnifier").arg("worker"),
            &launcher_config,
            args.verbose,
        );
        let worker_argv = std::iter::once("magnifier".to_string())
            .chain(command.args_for(Resolution::HIGH));
        let worker_args = Args::parse_from(worker_argv);
        assert!(worker_args.verbose);

        let worker_config = load_config(&worker_args).unwrap();
        let Some(Command::Worker(ref flags)) = worker_args.command else {
            panic!("expected worker subcommand");
        };
        let options = cli::worker_options(flags, &worker_config).unwrap();
        assert_eq!(options.resolution, Resolution::HIGH);
        assert_eq!(options.input_mode, InputMode::Physical);
        assert_eq!(options.device, launcher_config.input.device);
        assert!(options.surface.fullscreen);
    }

    #[test]
    fn test_launcher_input_flag_reaches_worker() {
        let args = Args::parse_from([
            "magnifier",
            "--deployment",
            "production",
            "launcher",
            "--input",
            "local",
        ]);
        let mut config = load_config(&args).unwrap();
        let Some(Command::Launcher(ref launcher_args)) = args.command else {
            panic!("expected launcher subcommand");
        };
        cli::apply_launcher_args(launcher_args, &mut config);

        let argv = launcher::forward_settings(WorkerCommand::new("magnifier"), &config, false)
            .args_for(Resolution::LOW);
        assert!(argv.windows(2).any(|w| w == ["--input", "local"]));
        assert!(argv.windows(2).any(|w| w == ["--deployment", "production"]));
        assert!(!argv.iter().any(|a| a == "--verbose"));
    }

    #[test]
    fn test_default_launcher_args() {
        let mut config = Config::default();
        cli::apply_launcher_args(&LauncherArgs::default(), &mut config);
        assert_eq!(config, Config::default());
    }
}
