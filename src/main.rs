use turtlebot::{arguments, config, logger, paths, run, scheduler};

use turtlebot::logger::LogTag;
use turtlebot::scheduler::CronSchedule;

#[tokio::main]
async fn main() {
    arguments::set_cmd_args(std::env::args().skip(1).collect());

    if arguments::is_help_requested() {
        arguments::print_help();
        return;
    }

    // Credentials live in .env next to the binary's working directory
    dotenv::dotenv().ok();

    if let Err(e) = paths::ensure_all_directories() {
        eprintln!("Failed to create working directories: {}", e);
        std::process::exit(1);
    }

    logger::init();

    if let Err(e) = config::load_config() {
        logger::error(LogTag::Config, &format!("Failed to load config: {}", e));
        logger::flush();
        std::process::exit(1);
    }

    let result = if arguments::is_schedule_enabled() {
        run_schedule_loop().await
    } else {
        run::run_once().await
    };

    logger::flush();

    if let Err(e) = result {
        eprintln!("turtlebot exited with error: {}", e);
        std::process::exit(1);
    }
}

/// Long-running mode: hold the lock once and fire cycles on the cron schedule
async fn run_schedule_loop() -> Result<(), String> {
    let expression = config::get_config().scheduler.cron.clone();
    let schedule: CronSchedule = expression
        .parse()
        .map_err(|e| format!("Invalid schedule '{}': {}", expression, e))?;

    let _lock = match turtlebot::process_lock::ProcessLock::try_acquire()? {
        Some(lock) => lock,
        None => {
            logger::warning(
                LogTag::System,
                "Another instance is already running, exiting",
            );
            return Ok(());
        }
    };

    logger::info(
        LogTag::Scheduler,
        &format!("Scheduler started with expression '{}'", expression),
    );
    scheduler::run_scheduled(&schedule, run::run_cycle_inner).await
}
