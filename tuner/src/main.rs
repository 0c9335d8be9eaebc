use crate::app::App;

use eframe::egui::ViewportBuilder;
use std::process::ExitCode;

mod app;
mod error;

pub(crate) type Result<T> = std::result::Result<T, error::Error>;

const MIN_SIZE: [f32; 2] = [650.0, 650.0];

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = eframe::NativeOptions {
        viewport: ViewportBuilder::default().with_min_inner_size(MIN_SIZE),
        ..Default::default()
    };

    match eframe::run_native("Vision Tuner", options, Box::new(|cc| Box::new(App::new(cc)))) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("tuner exited: {err}");
            ExitCode::FAILURE
        }
    }
}
